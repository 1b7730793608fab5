// Application settings
// Loaded from ~/.config/tablepilot/settings.json

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which model/parameter set a planner call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// General reasoning and conversation
    Default,
    /// Cheap auxiliary calls
    Fast,
    /// Script-writing turns
    Code,
}

/// Resolved parameters for one planner call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Primary model identifier
    #[serde(rename = "model.default")]
    pub model: String,

    /// Smaller model for cheap auxiliary calls
    #[serde(rename = "model.fast")]
    pub fast_model: String,

    /// Sampling temperature for planner calls
    #[serde(rename = "model.temperature")]
    pub temperature: f32,

    /// API base URL (override for self-hosted gateways and tests)
    #[serde(rename = "model.apiBase")]
    pub api_base: String,

    /// Hard cap on reasoning/tool cycles per run
    #[serde(rename = "agent.maxIterations")]
    pub max_iterations: usize,

    /// Size warning threshold for dataset files
    #[serde(rename = "data.maxCsvSizeMb")]
    pub max_csv_size_mb: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "mistral-medium-latest".to_string(),
            fast_model: "mistral-small-latest".to_string(),
            temperature: 0.5,
            api_base: "https://api.mistral.ai".to_string(),
            max_iterations: 10,
            max_csv_size_mb: 100,
        }
    }
}

impl Settings {
    /// Settings file path (~/.config/tablepilot/settings.json)
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tablepilot")
            .join("settings.json")
    }

    /// Load settings, falling back to defaults when the file is missing
    /// or unparseable.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &PathBuf) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, content).map_err(|e| e.to_string())
    }

    /// Model parameters for a task kind.
    pub fn model_params(&self, task: TaskKind) -> ModelParams {
        match task {
            TaskKind::Default => ModelParams {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: 2000,
            },
            TaskKind::Fast => ModelParams {
                model: self.fast_model.clone(),
                temperature: self.temperature,
                max_tokens: 1000,
            },
            TaskKind::Code => ModelParams {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: 1500,
            },
        }
    }
}
