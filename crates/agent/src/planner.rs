//! Planner collaborator: the language model behind the reasoning loop.
//!
//! The loop only sees the `Planner` trait — one blocking call that takes the
//! system context plus the full message history and returns the next
//! assistant message, possibly carrying tool requests.

use serde::{Deserialize, Serialize};

use tablepilot_config::{get_api_key, ModelParams, Settings, TaskKind};

use crate::message::{Message, Role, ToolRequest};
use crate::tools::{TOOL_INSPECT_TABLE, TOOL_RUN_SCRIPT, TOOL_SUGGEST_STEPS};

/// Provider name used for key lookup.
const PROVIDER: &str = "mistral";

/// Error from a planner call.
#[derive(Debug, Clone)]
pub enum PlannerError {
    /// API key not configured
    MissingKey,
    /// Network error
    Network(String),
    /// API error response
    Api { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Provider returned unexpected format
    InvalidResponse(String),
}

impl std::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannerError::MissingKey => write!(
                f,
                "API key not configured — set TABLEPILOT_MISTRAL_KEY or MISTRAL_API_KEY"
            ),
            PlannerError::Network(msg) => write!(f, "Network error: {}", msg),
            PlannerError::Api { status, message } => {
                write!(f, "API error ({}): {}", status, message)
            }
            PlannerError::Parse(msg) => write!(f, "Failed to parse response: {}", msg),
            PlannerError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for PlannerError {}

/// The loop's seam to the model. Implementations must be deterministic given
/// deterministic inputs for the loop itself to be testable.
pub trait Planner {
    fn invoke(&self, system_context: &str, messages: &[Message]) -> Result<Message, PlannerError>;
}

// ============================================================================
// Wire types (chat-completions API)
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    tools: Vec<ToolDef>,
    tool_choice: String,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    #[allow(dead_code)]
    call_type: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument string on the wire; some gateways inline an object.
    arguments: serde_json::Value,
}

#[derive(Serialize)]
struct ToolDef {
    #[serde(rename = "type")]
    def_type: String,
    function: FunctionDef,
}

#[derive(Serialize)]
struct FunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Definitions of the three tools, sent on every planner call.
fn tool_definitions() -> Vec<ToolDef> {
    let function = |name: &str, description: &str, parameters: serde_json::Value| ToolDef {
        def_type: "function".to_string(),
        function: FunctionDef {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    };

    vec![
        function(
            TOOL_RUN_SCRIPT,
            "Execute a Lua snippet against the dataset. The working table is bound to `tbl`, an untouched copy to `orig`. Use print(...) for output.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {"type": "string", "description": "Lua code to execute"},
                    "dataset_path": {"type": "string", "description": "Path of the CSV file to load"}
                },
                "required": ["code"]
            }),
        ),
        function(
            TOOL_INSPECT_TABLE,
            "Get a comprehensive summary of the dataset: shape, column types, null counts, statistics, samples.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "dataset_path": {"type": "string", "description": "Path of the CSV file to load"}
                }
            }),
        ),
        function(
            TOOL_SUGGEST_STEPS,
            "Get suggested analysis steps for the dataset and the user's question.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "dataset_path": {"type": "string", "description": "Path of the CSV file to load"},
                    "question": {"type": "string", "description": "The user's analysis question"}
                }
            }),
        ),
    ]
}

// ============================================================================
// Mistral client
// ============================================================================

/// Blocking chat-completions client (no async runtime required).
pub struct MistralPlanner {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    params: ModelParams,
}

impl MistralPlanner {
    /// Build from settings; fails fast when no API key is configured.
    pub fn new(settings: &Settings) -> Result<Self, PlannerError> {
        let lookup = get_api_key(PROVIDER);
        let key = lookup.key.ok_or(PlannerError::MissingKey)?;
        log::debug!("planner key source: {}", lookup.source.as_str());
        Ok(Self::with_key(
            settings.model_params(TaskKind::Default),
            settings.api_base.clone(),
            key,
        ))
    }

    /// Build with explicit parameters (tests point api_base at a mock).
    pub fn with_key(params: ModelParams, api_base: String, api_key: String) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("tpilot/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_base,
            api_key,
            params,
        }
    }

    fn to_wire(system_context: &str, messages: &[Message]) -> Vec<WireMessage> {
        let mut wire = vec![WireMessage {
            role: "system".to_string(),
            content: system_context.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }];

        for message in messages {
            let (role, tool_call_id) = match message.role {
                Role::User => ("user", None),
                Role::Assistant => ("assistant", None),
                Role::System => ("system", None),
                Role::ToolResult => ("tool", message.request_id.clone()),
            };

            let tool_calls = if message.tool_requests.is_empty() {
                None
            } else {
                Some(
                    message
                        .tool_requests
                        .iter()
                        .map(|req| WireToolCall {
                            id: req.id.clone(),
                            call_type: "function".to_string(),
                            function: WireFunctionCall {
                                name: req.name.clone(),
                                // Arguments travel as a JSON-encoded string
                                arguments: serde_json::Value::String(
                                    req.arguments.to_string(),
                                ),
                            },
                        })
                        .collect(),
                )
            };

            wire.push(WireMessage {
                role: role.to_string(),
                content: message.content.clone(),
                tool_calls,
                tool_call_id,
            });
        }

        wire
    }

    fn from_wire(message: WireResponseMessage) -> Message {
        let requests = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                // Arguments may be a JSON-encoded string or an inline object
                let arguments = match &call.function.arguments {
                    serde_json::Value::String(s) => serde_json::from_str(s)
                        .unwrap_or(serde_json::Value::String(s.clone())),
                    other => other.clone(),
                };
                let id = if call.id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    call.id
                };
                ToolRequest {
                    id,
                    name: call.function.name,
                    arguments,
                }
            })
            .collect();

        Message::assistant_with_tools(message.content.unwrap_or_default(), requests)
    }
}

impl Planner for MistralPlanner {
    fn invoke(&self, system_context: &str, messages: &[Message]) -> Result<Message, PlannerError> {
        let request = ChatRequest {
            model: self.params.model.clone(),
            messages: Self::to_wire(system_context, messages),
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            tools: tool_definitions(),
            tool_choice: "auto".to_string(),
        };

        let url = format!("{}/v1/chat/completions", self.api_base);
        log::debug!("planner call: {} model={}", url, self.params.model);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .map_err(|e| PlannerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            return Err(PlannerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| PlannerError::Parse(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::InvalidResponse("no choices in response".to_string()))?;

        Ok(Self::from_wire(choice.message))
    }
}
