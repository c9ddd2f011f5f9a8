//! Per-call diagnostics.
//!
//! [`CallDiagnostics`] records what happened while a stage talked to its
//! provider: how many transport retries it took, how long it spent backing
//! off, and what the text cleanup had to remove.

/// Records what happened during one LLM call.
///
/// Attached to every [`PayloadOutput`](crate::payload::PayloadOutput) produced
/// by [`LlmCall`](crate::llm_call::LlmCall).
///
/// # Example
///
/// ```
/// use story_pipeline::diagnostics::CallDiagnostics;
///
/// let diag = CallDiagnostics::default();
/// assert!(diag.first_try());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallDiagnostics {
    /// Backend that served the call (`"openai"`, `"gemini"`, `"mock"`).
    pub backend: Option<&'static str>,

    /// Number of transport retries (429, 5xx) before the request succeeded.
    pub transport_retries: u32,

    /// Total time spent in backoff delays (milliseconds).
    pub backoff_total_ms: u64,

    /// Whether a `<think>` block was removed from the response.
    pub thinking_stripped: bool,

    /// Bytes removed by text cleanup (think blocks, fences, boilerplate, whitespace).
    pub trimmed_bytes: usize,
}

impl CallDiagnostics {
    /// Quick check: did the first attempt succeed?
    pub fn first_try(&self) -> bool {
        self.transport_retries == 0
    }
}
