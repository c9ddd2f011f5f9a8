//! Core payload trait and output types.
//!
//! Payloads are the execution unit of a pipeline. Each payload takes a
//! `serde_json::Value` input, does some work (typically an LLM call), and
//! returns a [`PayloadOutput`]. For the story pipeline every stage passes
//! a `Value::String` along.

use crate::diagnostics::CallDiagnostics;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::PipelineError;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// A boxed, pinned, Send future -- the return type of [`Payload::invoke`].
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe trait for executable payloads.
///
/// The trait is object-safe so payloads can be stored as `Box<dyn Payload>`
/// and composed in chains without generic constraints.
pub trait Payload: Send + Sync {
    /// Stable identifier for the payload type (e.g. `"llm-call"`, `"chain"`).
    fn kind(&self) -> &'static str;

    /// Instance name (for logging/events).
    fn name(&self) -> &str;

    /// Execute the payload.
    fn invoke<'a>(&'a self, ctx: &'a ExecCtx, input: Value) -> BoxFut<'a, Result<PayloadOutput>>;
}

/// Output from a payload invocation.
#[derive(Debug, Clone)]
pub struct PayloadOutput {
    /// Output value handed to the next payload.
    pub value: Value,
    /// Raw response text from the LLM (before cleanup).
    pub raw_response: String,
    /// Extracted thinking/reasoning, if the model emitted a think block.
    pub thinking: Option<String>,
    /// Model that produced this output (if applicable).
    pub model: Option<String>,
    /// Call diagnostics. `None` for outputs not produced by an LLM call.
    pub diagnostics: Option<CallDiagnostics>,
}

impl PayloadOutput {
    /// Create an output wrapping a pre-existing `Value`.
    pub fn from_value(value: Value) -> Self {
        let raw = value.to_string();
        Self {
            value,
            raw_response: raw,
            thinking: None,
            model: None,
            diagnostics: None,
        }
    }

    /// The output as text, if the value is a JSON string.
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// The output as owned text, failing if the value is not a string.
    pub fn into_text(self) -> Result<String> {
        match self.value {
            Value::String(s) => Ok(s),
            other => Err(PipelineError::Other(format!(
                "expected text output, got {}",
                truncate(&other.to_string(), 200)
            ))),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
