//! The reasoning loop: a two-state cycle between planner calls and tool
//! execution, bounded by a configured iteration cap, persisting conversation
//! state per thread.

use tablepilot_config::{PromptManager, Settings};

use crate::message::{Message, ToolRequest, ToolResult};
use crate::planner::{MistralPlanner, Planner, PlannerError};
use crate::state::ConversationState;
use crate::store::SessionStore;
use crate::tools::ToolInvocation;

/// Error building an `Analyst`.
#[derive(Debug)]
pub enum AgentError {
    /// Missing or invalid configuration (prompt files, credentials)
    Config(String),
    /// Planner client could not be constructed
    Planner(PlannerError),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AgentError::Planner(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AgentError {}

/// Result of one `run` call.
#[derive(Debug)]
pub struct RunOutcome {
    pub response: String,
    pub success: bool,
    pub error: Option<String>,
    pub state: ConversationState,
}

/// The loop's states. Transitions out of `Reasoning` depend only on whether
/// the newest assistant message carries tool requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Reasoning,
    ToolExecution,
    Terminal,
}

/// The data analyst agent: planner + tools + session store.
pub struct Analyst {
    settings: Settings,
    planner: Box<dyn Planner>,
    store: SessionStore,
    system_prompt: String,
}

impl Analyst {
    /// Build with the real planner client. Fails fast on missing credentials
    /// or unreadable prompt configuration.
    pub fn new(settings: Settings, store: SessionStore) -> Result<Self, AgentError> {
        let planner = MistralPlanner::new(&settings).map_err(AgentError::Planner)?;
        let mut prompts = PromptManager::new();
        let system_prompt = prompts
            .system_prompt("analyst")
            .map_err(AgentError::Config)?;
        Ok(Self::with_planner(
            settings,
            Box::new(planner),
            store,
            system_prompt,
        ))
    }

    /// Build with an explicit planner (tests use a scripted one).
    pub fn with_planner(
        settings: Settings,
        planner: Box<dyn Planner>,
        store: SessionStore,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            planner,
            store,
            system_prompt: system_prompt.into(),
        }
    }

    /// Run the loop for one user input, resuming the thread's history.
    pub fn run(&mut self, user_input: &str, dataset: Option<&str>, thread_id: &str) -> RunOutcome {
        let mut state = self
            .store
            .load(thread_id)
            .ok()
            .flatten()
            .unwrap_or_default();
        state.current_task = user_input.to_string();

        // A dataset locator is folded into the user message so the planner
        // has the path in its context.
        let content = match dataset {
            Some(path) => {
                state.dataset_path = Some(path.to_string());
                state.dataset_shape = None;
                state.dataset_loaded = true;
                format!("I have a CSV file at {}. {}", path, user_input)
            }
            None => user_input.to_string(),
        };
        state.push_message(Message::user(content));

        let mut loop_state = LoopState::Reasoning;
        let mut cycles = 0usize;

        loop {
            match loop_state {
                LoopState::Reasoning => {
                    let context = self.system_context(&state);
                    let reply = match self.planner.invoke(&context, &state.messages) {
                        Ok(reply) => reply,
                        Err(e) => {
                            // Planner faults abort the run; no retry
                            let error = e.to_string();
                            log::warn!("planner call failed: {}", error);
                            self.persist(thread_id, &state);
                            return RunOutcome {
                                response: format!("Error occurred: {}", error),
                                success: false,
                                error: Some(error),
                                state,
                            };
                        }
                    };
                    state.error = None;
                    loop_state = Self::next_state(&reply);
                    state.push_message(reply);
                }

                LoopState::ToolExecution => {
                    cycles += 1;
                    if cycles > self.settings.max_iterations {
                        let error = format!(
                            "iteration limit reached ({} tool cycles)",
                            self.settings.max_iterations
                        );
                        log::warn!("{}", error);
                        self.persist(thread_id, &state);
                        return RunOutcome {
                            response: format!(
                                "Stopped: {}. Ask again to continue the analysis.",
                                error
                            ),
                            success: false,
                            error: Some(error),
                            state,
                        };
                    }

                    let requests: Vec<ToolRequest> = state
                        .last_message()
                        .map(|m| m.tool_requests.clone())
                        .unwrap_or_default();
                    // Sequential, in request order: later requests may depend
                    // on the effects of earlier ones
                    for request in requests {
                        let result = self.dispatch(&request, &mut state);
                        state.push_message(result.into_message());
                    }
                    loop_state = LoopState::Reasoning;
                }

                LoopState::Terminal => break,
            }
        }

        let response = state
            .last_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.persist(thread_id, &state);

        RunOutcome {
            response,
            success: true,
            error: None,
            state,
        }
    }

    /// Message history for a thread; empty when the thread is unknown.
    pub fn history(&self, thread_id: &str) -> Vec<Message> {
        self.store
            .load(thread_id)
            .ok()
            .flatten()
            .map(|state| state.messages)
            .unwrap_or_default()
    }

    /// Dispatch one tool request, capturing every failure as a failed result.
    fn dispatch(&self, request: &ToolRequest, state: &mut ConversationState) -> ToolResult {
        log::debug!("dispatching tool {:?}", request.name);
        match ToolInvocation::parse(
            &request.name,
            &request.arguments,
            state.dataset_path.as_deref(),
        ) {
            Ok(invocation) => {
                if let Some(code) = invocation.code() {
                    state.record_code(code);
                }
                let outcome = invocation.dispatch();
                if let Some(shape) = outcome.shape {
                    state.dataset_shape = Some(shape);
                }
                if let Some(error) = &outcome.error {
                    state.error = Some(error.clone());
                }
                ToolResult {
                    request_id: request.id.clone(),
                    success: outcome.success,
                    payload: outcome.payload,
                    error: outcome.error,
                }
            }
            Err(e) => {
                state.error = Some(e.clone());
                ToolResult::failed(request.id.clone(), e)
            }
        }
    }

    /// Exhaustive transition out of Reasoning: tool requests present or not.
    fn next_state(reply: &Message) -> LoopState {
        if reply.wants_tools() {
            LoopState::ToolExecution
        } else {
            LoopState::Terminal
        }
    }

    /// Fixed instruction block plus the dataset path/shape and last error.
    fn system_context(&self, state: &ConversationState) -> String {
        let mut context = self.system_prompt.clone();

        if state.dataset_loaded {
            if let Some(path) = &state.dataset_path {
                context.push_str(&format!("\n\nCurrent CSV file: {}", path));
                if let Some((rows, cols)) = state.dataset_shape {
                    context.push_str(&format!(
                        "\nDataset shape: {} rows x {} columns",
                        rows, cols
                    ));
                }
            }
        }

        if let Some(error) = &state.error {
            context.push_str(&format!("\n\nPrevious error: {}", error));
        }

        context
    }

    fn persist(&self, thread_id: &str, state: &ConversationState) {
        if let Err(e) = self.store.save(thread_id, state) {
            log::warn!("failed to persist session {:?}: {}", thread_id, e);
        }
    }
}
