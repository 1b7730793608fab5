pub mod keys;
pub mod prompts;
pub mod settings;

pub use keys::{get_api_key, KeyLookup, KeySource};
pub use prompts::PromptManager;
pub use settings::{ModelParams, Settings, TaskKind};
