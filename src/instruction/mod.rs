//! Instruction parsing
//!
//! Turns natural-language test instructions into ordered [`Action`]
//! sequences. Two parsers implement the same trait: [`RuleParser`] matches
//! keyword rules locally and [`LlmParser`] asks a completion service,
//! falling back to the rules when the service is unavailable or answers
//! badly. Parsing never fails; text that matches nothing yields an empty
//! sequence and the runner reports that as its own outcome.

mod action;
mod llm;
mod rules;

pub use action::{Action, ActionDecodeError, ActionKind};
pub use llm::{LlmConfig, LlmError, LlmParser, LlmProvider};
pub use rules::RuleParser;

/// A strategy for turning instruction text into actions.
///
/// Implementations must be infallible: when nothing in the text is
/// recognizable they return an empty vector, never an error.
#[async_trait::async_trait]
pub trait InstructionParser: Send + Sync {
    async fn parse(&self, instruction: &str) -> Vec<Action>;
}
