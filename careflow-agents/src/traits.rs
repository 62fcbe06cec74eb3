//! Common types for workflow agents

use careflow_core::TemplateError;
use thiserror::Error;

use crate::LlmError;

/// Errors from agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("missing required input: {}", .0.join(", "))]
    MissingInput(Vec<&'static str>),

    #[error("no persona loaded for role {0}")]
    NoPersona(careflow_core::Role),

    #[error("prompt error: {0}")]
    Template(#[from] TemplateError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}
