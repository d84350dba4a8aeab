//! Idea analysis over an OpenAI-compatible chat-completion API.
//!
//! The pipeline is: build a prompt, call the model once, pull the JSON
//! object out of the reply, and check it against the expected shape.
//! [`IdeaAnalyzer`] provides the pipeline on top of a single `complete`
//! call, so alternative backends only implement transport.

pub mod analyzer;
pub mod error;
pub mod extract;
pub mod models;
pub mod prompt;
pub mod providers;

pub use analyzer::{AnalysisOutcome, CompletionRequest, IdeaAnalyzer, Purpose, ReportContext};
pub use error::{AiError, Result};
pub use providers::openai::OpenAiProvider;
