// TablePilot CLI - natural-language data analysis, headless

mod exit_codes;
mod repl;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tablepilot_agent::{AgentError, Analyst, PlannerError, SessionStore};
use tablepilot_config::Settings;

use exit_codes::{
    EXIT_AI_CALL_FAILED, EXIT_AI_MISSING_KEY, EXIT_ERROR, EXIT_IO_ERROR, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "tpilot")]
#[command(about = "Ask natural-language questions about CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the analyst agent one question
    #[command(after_help = "\
Examples:
  tpilot ask 'What are the column names?' --data sales.csv
  tpilot ask 'Which category sells best?' --data sales.csv --thread sales
  tpilot ask 'And by channel?' --thread sales")]
    Ask {
        /// The question or instruction
        question: String,

        /// CSV file to analyze
        #[arg(long)]
        data: Option<PathBuf>,

        /// Thread id for conversation continuity
        #[arg(long, default_value = "default")]
        thread: String,

        /// Session database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Emit the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive shell
    #[command(after_help = "\
Commands inside the shell:
  load <path>   switch to another CSV file
  clear         start a fresh conversation
  help          show help
  quit          exit")]
    Repl {
        /// CSV file to analyze
        #[arg(long)]
        data: Option<PathBuf>,

        /// Session database path
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print a summary of a CSV file
    Inspect {
        /// CSV file
        file: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print suggested analysis steps for a CSV file and question
    Suggest {
        /// CSV file
        file: PathBuf,

        /// The analysis question
        question: String,
    },

    /// Write a demo sales dataset
    Sample {
        /// Output CSV path
        output: PathBuf,

        /// Number of rows
        #[arg(long, default_value_t = 1000)]
        rows: usize,
    },

    /// Print the message history of a thread
    History {
        /// Thread id
        thread: String,

        /// Session database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask {
            question,
            data,
            thread,
            db,
            json,
        } => cmd_ask(question, data, thread, db, json),
        Commands::Repl { data, db } => repl::cmd_repl(data, db),
        Commands::Inspect { file, json } => cmd_inspect(file, json),
        Commands::Suggest { file, question } => cmd_suggest(file, question),
        Commands::Sample { output, rows } => cmd_sample(output, rows),
        Commands::History { thread, db, json } => cmd_history(thread, db, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Error type
// ============================================================================

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_IO_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    /// Create error from agent construction error with proper exit code.
    pub fn agent(err: AgentError) -> Self {
        let (code, hint) = match &err {
            AgentError::Planner(PlannerError::MissingKey) => (
                EXIT_AI_MISSING_KEY,
                Some("export TABLEPILOT_MISTRAL_KEY or MISTRAL_API_KEY".to_string()),
            ),
            AgentError::Planner(_) => (EXIT_AI_CALL_FAILED, None),
            AgentError::Config(_) => (EXIT_ERROR, None),
        };
        Self {
            code,
            message: err.to_string(),
            hint,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn open_store(db: Option<PathBuf>) -> Result<SessionStore, CliError> {
    let path = db.unwrap_or_else(SessionStore::default_path);
    SessionStore::open(&path).map_err(CliError::io)
}

pub fn build_analyst(db: Option<PathBuf>) -> Result<Analyst, CliError> {
    let settings = Settings::load();
    let store = open_store(db)?;
    Analyst::new(settings, store).map_err(CliError::agent)
}

/// Validate a dataset path before handing it to the agent.
pub fn validate_dataset(path: &PathBuf) -> Result<(), CliError> {
    if !path.exists() {
        return Err(CliError::io(format!("file not found: {}", path.display()))
            .with_hint("generate demo data with `tpilot sample demo.csv`"));
    }

    if path.extension().map(|e| e != "csv").unwrap_or(true) {
        eprintln!(
            "warning: {} does not have a .csv extension",
            path.display()
        );
    }

    let max_mb = Settings::load().max_csv_size_mb;
    if let Ok(meta) = std::fs::metadata(path) {
        let size_mb = meta.len() / (1024 * 1024);
        if size_mb > max_mb {
            eprintln!(
                "warning: file is {}MB, above the recommended maximum of {}MB",
                size_mb, max_mb
            );
        }
    }

    Ok(())
}

// ============================================================================
// ask
// ============================================================================

fn cmd_ask(
    question: String,
    data: Option<PathBuf>,
    thread: String,
    db: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    if let Some(path) = &data {
        validate_dataset(path)?;
    }

    let mut agent = build_analyst(db)?;
    let dataset = data.as_ref().map(|p| p.to_string_lossy().to_string());

    let outcome = agent.run(&question, dataset.as_deref(), &thread);

    if json {
        let output = serde_json::json!({
            "response": outcome.response,
            "success": outcome.success,
            "error": outcome.error,
            "generated_code": outcome.state.generated_code,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("{}", outcome.response);
    }

    if outcome.success {
        Ok(())
    } else {
        // The explanation already went to stdout
        Err(CliError {
            code: EXIT_AI_CALL_FAILED,
            message: String::new(),
            hint: None,
        })
    }
}

// ============================================================================
// inspect
// ============================================================================

fn cmd_inspect(file: PathBuf, json: bool) -> Result<(), CliError> {
    validate_dataset(&file)?;

    let table = tablepilot_io::csv::import(&file).map_err(CliError::io)?;
    let summary = tablepilot_table::inspect(&table);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_default()
        );
    } else {
        print!("{}", summary.to_context_text());
    }

    Ok(())
}

// ============================================================================
// suggest
// ============================================================================

fn cmd_suggest(file: PathBuf, question: String) -> Result<(), CliError> {
    validate_dataset(&file)?;

    let table = tablepilot_io::csv::import(&file).map_err(CliError::io)?;
    for step in tablepilot_table::suggest_steps(&table, &question) {
        println!("{}", step);
    }

    Ok(())
}

// ============================================================================
// sample
// ============================================================================

fn cmd_sample(output: PathBuf, rows: usize) -> Result<(), CliError> {
    if rows == 0 {
        return Err(CliError::args("--rows must be at least 1"));
    }

    let table = tablepilot_io::sample::sales_table(rows);
    tablepilot_io::csv::export(&table, &output).map_err(CliError::io)?;

    println!(
        "Wrote {} rows x {} columns to {}",
        table.n_rows(),
        table.n_cols(),
        output.display()
    );
    Ok(())
}

// ============================================================================
// history
// ============================================================================

fn cmd_history(thread: String, db: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let store = open_store(db)?;
    let messages = store
        .load(&thread)
        .map_err(CliError::io)?
        .map(|state| state.messages)
        .unwrap_or_default();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&messages).unwrap_or_default()
        );
        return Ok(());
    }

    if messages.is_empty() {
        println!("No history for thread {:?}.", thread);
        return Ok(());
    }

    for message in &messages {
        let role = match message.role {
            tablepilot_agent::Role::User => "you",
            tablepilot_agent::Role::Assistant => "agent",
            tablepilot_agent::Role::System => "system",
            tablepilot_agent::Role::ToolResult => "tool",
        };
        println!("[{}] {}", role, message.content);
        for request in &message.tool_requests {
            println!("    -> {} {}", request.name, request.arguments);
        }
    }

    Ok(())
}
