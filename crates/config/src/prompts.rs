//! System prompt loading.
//!
//! Each agent variant may have a prompt file at
//! `~/.config/tablepilot/prompts/<variant>.toml` with a `system_prompt` key.
//! Missing files fall back to the built-in analyst prompt. Loaded prompts are
//! cached for the lifetime of the manager.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Built-in system prompt for the analyst agent.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert data analyst agent. Your goal is to help users analyze CSV data.

Key capabilities:
1. Inspect the structure and quality of a loaded dataset
2. Perform data wrangling and cleaning
3. Generate insights and analysis
4. Write and execute small analysis scripts safely

Guidelines:
- Always start by understanding the data structure and quality
- Ask clarifying questions if the user's request is ambiguous
- Provide clear explanations for your analysis steps
- Show the code you are running for transparency
- Handle errors gracefully and suggest alternatives
- Focus on actionable insights

Available tools:
- run_script: Execute a Lua snippet against the dataset. The working table is
  bound to the global `tbl` and an untouched copy to `orig`. The table API:
  tbl:num_rows(), tbl:num_cols(), tbl:columns(), tbl:get(row, column),
  tbl:set(row, column, value), tbl:column(name), tbl:add_column(name, values),
  tbl:drop_column(name), tbl:filter(function(row) ... end),
  tbl:sort_by(column, descending), tbl:head(n). Rows are 1-indexed.
  Use print(...) for any output you want to see.
- inspect_table: Get a comprehensive summary of the dataset
- suggest_steps: Get suggested analysis steps for the dataset and question

Always use the tools to perform actual data operations. Never assume or make up analysis results."#;

#[derive(serde::Deserialize)]
struct PromptFile {
    system_prompt: String,
}

/// Loads and caches per-variant system prompts.
pub struct PromptManager {
    prompts_dir: PathBuf,
    cache: HashMap<String, String>,
}

impl PromptManager {
    /// Use the default prompts directory (~/.config/tablepilot/prompts).
    pub fn new() -> Self {
        let dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tablepilot")
            .join("prompts");
        Self::with_dir(dir)
    }

    pub fn with_dir(prompts_dir: PathBuf) -> Self {
        Self {
            prompts_dir,
            cache: HashMap::new(),
        }
    }

    /// System prompt for an agent variant. Falls back to the built-in
    /// analyst prompt when no file exists; fails only on unreadable TOML.
    pub fn system_prompt(&mut self, variant: &str) -> Result<String, String> {
        if let Some(cached) = self.cache.get(variant) {
            return Ok(cached.clone());
        }

        let path = self.prompts_dir.join(format!("{}.toml", variant));
        let prompt = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            let parsed: PromptFile = toml::from_str(&content)
                .map_err(|e| format!("invalid prompt file {}: {}", path.display(), e))?;
            parsed.system_prompt
        } else {
            DEFAULT_SYSTEM_PROMPT.to_string()
        };

        self.cache.insert(variant.to_string(), prompt.clone());
        Ok(prompt)
    }

    /// Variants that have a prompt file on disk.
    pub fn list_variants(&self) -> Vec<String> {
        let mut variants = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.prompts_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "toml").unwrap_or(false) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        variants.push(stem.to_string());
                    }
                }
            }
        }
        variants.sort();
        variants
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = PromptManager::with_dir(dir.path().to_path_buf());

        let prompt = manager.system_prompt("analyst").unwrap();
        assert!(prompt.contains("data analyst"));
        assert!(prompt.contains("run_script"));
    }

    #[test]
    fn test_file_overrides_builtin_and_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "system_prompt = \"You are a test prompt.\"\n").unwrap();

        let mut manager = PromptManager::with_dir(dir.path().to_path_buf());
        assert_eq!(
            manager.system_prompt("custom").unwrap(),
            "You are a test prompt."
        );

        // Cached: deleting the file does not affect subsequent reads
        fs::remove_file(&path).unwrap();
        assert_eq!(
            manager.system_prompt("custom").unwrap(),
            "You are a test prompt."
        );

        // Until the cache is cleared, at which point the builtin returns
        manager.clear_cache();
        assert!(manager.system_prompt("custom").unwrap().contains("data analyst"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.toml"), "not valid {{{{").unwrap();

        let mut manager = PromptManager::with_dir(dir.path().to_path_buf());
        assert!(manager.system_prompt("bad").is_err());
    }

    #[test]
    fn test_list_variants() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.toml"), "system_prompt = \"b\"").unwrap();
        fs::write(dir.path().join("a.toml"), "system_prompt = \"a\"").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let manager = PromptManager::with_dir(dir.path().to_path_buf());
        assert_eq!(manager.list_variants(), vec!["a", "b"]);
    }
}
