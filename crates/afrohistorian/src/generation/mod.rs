//! Answer generation with retrieved context

mod cancellation;
mod engine;
mod prompt;

pub use cancellation::CancellationToken;
pub use engine::{Answer, AnswerEngine};
pub use prompt::PromptBuilder;
