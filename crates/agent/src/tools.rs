//! Tool dispatch: the three operations a planner may request.
//!
//! Dispatch is a closed enum — unknown tool names and malformed arguments
//! become failed results, never faults. Every dispatch reloads the dataset
//! from its locator; mutations do not carry over between dispatches.

use std::path::Path;

use serde::Deserialize;

use tablepilot_table::{inspect, suggest_steps};

use crate::sandbox;

pub const TOOL_RUN_SCRIPT: &str = "run_script";
pub const TOOL_INSPECT_TABLE: &str = "inspect_table";
pub const TOOL_SUGGEST_STEPS: &str = "suggest_steps";

/// Outcome of one dispatch, before correlation with its request.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub success: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
    /// (rows, cols) of the dataset as last seen, when a load succeeded.
    pub shape: Option<(usize, usize)>,
}

impl ToolOutcome {
    fn ok(payload: serde_json::Value, shape: Option<(usize, usize)>) -> Self {
        Self {
            success: true,
            payload,
            error: None,
            shape,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: serde_json::Value::Null,
            error: Some(error.into()),
            shape: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunScriptArgs {
    code: String,
    #[serde(default)]
    dataset_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InspectTableArgs {
    #[serde(default)]
    dataset_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestStepsArgs {
    #[serde(default)]
    dataset_path: Option<String>,
    #[serde(default)]
    question: String,
}

/// One fully parsed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    RunScript { code: String, dataset_path: Option<String> },
    InspectTable { dataset_path: Option<String> },
    SuggestSteps { dataset_path: Option<String>, question: String },
}

impl ToolInvocation {
    /// Parse a named request. `session_dataset` fills in a missing
    /// dataset_path argument.
    pub fn parse(
        name: &str,
        arguments: &serde_json::Value,
        session_dataset: Option<&str>,
    ) -> Result<Self, String> {
        let fallback = |path: Option<String>| {
            path.or_else(|| session_dataset.map(|s| s.to_string()))
        };

        match name {
            TOOL_RUN_SCRIPT => {
                let args: RunScriptArgs = parse_args(arguments)?;
                Ok(ToolInvocation::RunScript {
                    code: args.code,
                    dataset_path: fallback(args.dataset_path),
                })
            }
            TOOL_INSPECT_TABLE => {
                let args: InspectTableArgs = parse_args(arguments)?;
                Ok(ToolInvocation::InspectTable {
                    dataset_path: fallback(args.dataset_path),
                })
            }
            TOOL_SUGGEST_STEPS => {
                let args: SuggestStepsArgs = parse_args(arguments)?;
                Ok(ToolInvocation::SuggestSteps {
                    dataset_path: fallback(args.dataset_path),
                    question: args.question,
                })
            }
            other => Err(format!("unknown tool {:?}", other)),
        }
    }

    /// The script text, when this invocation carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ToolInvocation::RunScript { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Execute the invocation. Load failures and execution faults come back
    /// as failed outcomes; this function never panics or raises.
    pub fn dispatch(&self) -> ToolOutcome {
        match self {
            ToolInvocation::RunScript { code, dataset_path } => {
                let table = match load_dataset(dataset_path.as_deref()) {
                    Ok(table) => table,
                    Err(e) => return ToolOutcome::failed(e),
                };
                let shape = (table.n_rows(), table.n_cols());

                let result = sandbox::execute(code, &table);
                log::debug!(
                    "run_script: success={} stdout_len={}",
                    result.success,
                    result.stdout.len()
                );

                let new_shape = (result.table.n_rows(), result.table.n_cols());
                let payload = serde_json::json!({
                    "output": result.stdout,
                    "stderr": result.stderr,
                    "variables": result.variables,
                    "table_shape": [new_shape.0, new_shape.1],
                });

                if result.success {
                    ToolOutcome::ok(payload, Some(new_shape))
                } else {
                    ToolOutcome {
                        success: false,
                        payload,
                        error: result.error,
                        shape: Some(shape),
                    }
                }
            }

            ToolInvocation::InspectTable { dataset_path } => {
                let table = match load_dataset(dataset_path.as_deref()) {
                    Ok(table) => table,
                    Err(e) => return ToolOutcome::failed(e),
                };
                let shape = (table.n_rows(), table.n_cols());

                let summary = inspect(&table);
                let payload = serde_json::json!({
                    "summary": summary,
                    "message": format!(
                        "Table info retrieved for {} rows and {} columns",
                        shape.0, shape.1
                    ),
                });
                ToolOutcome::ok(payload, Some(shape))
            }

            ToolInvocation::SuggestSteps { dataset_path, question } => {
                let table = match load_dataset(dataset_path.as_deref()) {
                    Ok(table) => table,
                    Err(e) => return ToolOutcome::failed(e),
                };
                let shape = (table.n_rows(), table.n_cols());

                let suggestions = suggest_steps(&table, question);
                let payload = serde_json::json!({
                    "suggestions": suggestions,
                    "message": "Analysis steps suggested based on data and question",
                });
                ToolOutcome::ok(payload, Some(shape))
            }
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: &serde_json::Value) -> Result<T, String> {
    serde_json::from_value(arguments.clone()).map_err(|e| format!("invalid tool arguments: {}", e))
}

fn load_dataset(path: Option<&str>) -> Result<tablepilot_table::Table, String> {
    let path = path.ok_or_else(|| {
        "No dataset specified. Provide a dataset_path or load a CSV file first.".to_string()
    })?;
    tablepilot_io::csv::import(Path::new(path))
        .map_err(|e| format!("Failed to load CSV file: {}", e))
}
