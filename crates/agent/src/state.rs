//! Per-thread conversation state, persisted between runs.

use serde::{Deserialize, Serialize};

use crate::message::Message;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationState {
    /// Message history, append-only, chronological.
    pub messages: Vec<Message>,

    /// Current task/instruction text.
    pub current_task: String,

    /// Dataset locator (a path, never the data itself).
    pub dataset_path: Option<String>,

    /// Cached (rows, cols), filled in once a tool has seen the dataset.
    pub dataset_shape: Option<(usize, usize)>,

    /// Last error seen, cleared on each new planner turn.
    pub error: Option<String>,

    /// Every script the sandbox has executed, for audit/transparency.
    pub generated_code: Vec<String>,

    /// Whether a dataset is associated with this session.
    pub dataset_loaded: bool,
}

impl ConversationState {
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn record_code(&mut self, code: impl Into<String>) {
        self.generated_code.push(code.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_empty() {
        let state = ConversationState::default();
        assert!(state.messages.is_empty());
        assert!(!state.dataset_loaded);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_state_roundtrips_through_json() {
        let mut state = ConversationState::default();
        state.push_message(Message::user("hello"));
        state.dataset_path = Some("data.csv".into());
        state.dataset_shape = Some((3, 2));
        state.dataset_loaded = true;
        state.record_code("print(1)");

        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn test_forward_tolerant_deserialization() {
        // Unknown fields are ignored, missing fields take defaults
        let state: ConversationState =
            serde_json::from_str(r#"{"current_task": "t", "future_field": 1}"#).unwrap();
        assert_eq!(state.current_task, "t");
        assert!(state.messages.is_empty());
    }
}
