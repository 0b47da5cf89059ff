//! Prompt construction and model response handling

pub mod assessment;
pub mod prompt;

pub use assessment::parse_assessment;
pub use prompt::PromptBuilder;
