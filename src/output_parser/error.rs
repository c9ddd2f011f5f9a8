//! Error types for LLM output cleanup.

/// Errors returned by output parsers.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The LLM response was empty or whitespace-only after cleanup.
    #[error("empty LLM response")]
    EmptyResponse,
}
