//! Conversation records: messages, tool requests and tool results.
//!
//! Messages are append-only and chronological; field names are part of the
//! persisted state format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
    System,
    ToolResult,
}

/// A planner's request to invoke one tool, correlated to its result by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The outcome of one tool dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub request_id: String,
    pub success: bool,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            payload,
            error: None,
        }
    }

    pub fn failed(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            payload: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }

    /// Render as the tool-result message fed back to the planner.
    pub fn into_message(self) -> Message {
        let body = serde_json::json!({
            "success": self.success,
            "result": self.payload,
            "error": self.error,
        });
        Message {
            role: Role::ToolResult,
            content: body.to_string(),
            tool_requests: Vec::new(),
            request_id: Some(self.request_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Present only on assistant messages that want tool use.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_requests: Vec<ToolRequest>,
    /// Present only on tool-result messages; correlates to a ToolRequest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_requests: Vec::new(),
            request_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_requests: Vec::new(),
            request_id: None,
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, requests: Vec<ToolRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_requests: requests,
            request_id: None,
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_kebab_case() {
        let json = serde_json::to_string(&Role::ToolResult).unwrap();
        assert_eq!(json, "\"tool-result\"");
    }

    #[test]
    fn test_message_roundtrip() {
        let message = Message::assistant_with_tools(
            "checking",
            vec![ToolRequest {
                id: "call_1".into(),
                name: "inspect_table".into(),
                arguments: serde_json::json!({"dataset_path": "x.csv"}),
            }],
        );
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, back);
        assert!(back.wants_tools());
    }

    #[test]
    fn test_plain_message_omits_empty_fields() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(!json.contains("tool_requests"));
        assert!(!json.contains("request_id"));
    }

    #[test]
    fn test_tool_result_into_message() {
        let message = ToolResult::failed("call_9", "boom").into_message();
        assert_eq!(message.role, Role::ToolResult);
        assert_eq!(message.request_id.as_deref(), Some("call_9"));

        let body: serde_json::Value = serde_json::from_str(&message.content).unwrap();
        assert_eq!(body["success"], serde_json::json!(false));
        assert_eq!(body["error"], serde_json::json!("boom"));
    }
}
