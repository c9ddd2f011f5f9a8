//! Sequential chain of payloads.
//!
//! [`Chain`] runs its steps in order, handing each step's output `value` to
//! the next as input. [`Chain::execute_all`] keeps every step's output in a
//! [`ChainRun`], addressable by step name, so a caller can assemble a record
//! from the intermediate results and not just the last one.

use crate::{
    error::Result,
    exec_ctx::ExecCtx,
    payload::{BoxFut, Payload, PayloadOutput},
    PipelineError,
};
use serde_json::Value;
use std::time::{Duration, Instant};

/// A sequential chain of payloads.
///
/// `Chain` itself implements [`Payload`], so chains can be nested.
///
/// # Example
///
/// ```ignore
/// use story_pipeline::{Chain, LlmCall};
/// use story_pipeline::backend::Provider;
/// use serde_json::json;
///
/// let chain = Chain::new("draft-then-tag")
///     .push(Box::new(LlmCall::new("draft", "Write about: {input}", Provider::Gemini)))
///     .push(Box::new(LlmCall::new("tags", "Hashtags for: {input}", Provider::OpenAi)));
///
/// let run = chain.execute_all(&ctx, json!("a lighthouse")).await?;
/// println!("{}\n{}", run.text("draft")?, run.text("tags")?);
/// ```
pub struct Chain {
    name: String,
    payloads: Vec<Box<dyn Payload>>,
}

/// One finished step of a [`ChainRun`].
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Name of the payload that produced this output.
    pub name: String,
    pub output: PayloadOutput,
    /// Wall time spent in the step.
    pub elapsed: Duration,
}

/// Every step output of one chain execution, in order.
#[derive(Debug, Clone, Default)]
pub struct ChainRun {
    steps: Vec<StepOutput>,
}

impl ChainRun {
    /// Output of the step called `name`.
    pub fn get(&self, name: &str) -> Option<&PayloadOutput> {
        self.steps
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.output)
    }

    /// Text output of the step called `name`.
    ///
    /// Fails if no such step ran or its value is not a string.
    pub fn text(&self, name: &str) -> Result<String> {
        self.get(name)
            .and_then(PayloadOutput::as_text)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Other(format!("chain step '{name}' produced no text")))
    }

    /// Every step, in execution order.
    pub fn steps(&self) -> &[StepOutput] {
        &self.steps
    }

    /// Number of steps that ran.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when no step ran.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total wall time across all steps.
    pub fn elapsed(&self) -> Duration {
        self.steps.iter().map(|s| s.elapsed).sum()
    }

    /// The final step's output.
    pub fn into_last(self) -> Option<PayloadOutput> {
        self.steps.into_iter().last().map(|s| s.output)
    }
}

impl Chain {
    /// Create a new empty chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payloads: Vec::new(),
        }
    }

    /// Add a payload to the end of the chain (builder style).
    pub fn push(mut self, payload: Box<dyn Payload>) -> Self {
        self.payloads.push(payload);
        self
    }

    /// Number of payloads in the chain.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// True when the chain has no payloads.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Execute all payloads sequentially, keeping every step's output.
    ///
    /// The first payload receives `input`. Stops at the first failing step.
    pub async fn execute_all(&self, ctx: &ExecCtx, input: Value) -> Result<ChainRun> {
        if self.payloads.is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "chain '{}' has no payloads",
                self.name
            )));
        }

        let mut run = ChainRun {
            steps: Vec::with_capacity(self.payloads.len()),
        };
        let mut current = input;

        for payload in &self.payloads {
            let started = Instant::now();
            let output = payload.invoke(ctx, current).await?;
            let elapsed = started.elapsed();
            tracing::debug!(
                chain = %self.name,
                step = payload.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                "chain step finished"
            );
            current = output.value.clone();
            run.steps.push(StepOutput {
                name: payload.name().to_string(),
                output,
                elapsed,
            });
        }

        Ok(run)
    }

    /// Execute all payloads and return only the final output.
    pub async fn execute(&self, ctx: &ExecCtx, input: Value) -> Result<PayloadOutput> {
        self.execute_all(ctx, input)
            .await?
            .into_last()
            .ok_or_else(|| PipelineError::Other(format!("chain '{}' produced no output", self.name)))
    }
}

impl Payload for Chain {
    fn kind(&self) -> &'static str {
        "chain"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn invoke<'a>(&'a self, ctx: &'a ExecCtx, input: Value) -> BoxFut<'a, Result<PayloadOutput>> {
        Box::pin(self.execute(ctx, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Appends its tag to the incoming text.
    struct Append(&'static str);

    impl Payload for Append {
        fn kind(&self) -> &'static str {
            "append"
        }
        fn name(&self) -> &str {
            self.0
        }
        fn invoke<'a>(
            &'a self,
            _ctx: &'a ExecCtx,
            input: Value,
        ) -> BoxFut<'a, Result<PayloadOutput>> {
            Box::pin(async move {
                let text = format!("{} > {}", input.as_str().unwrap_or_default(), self.0);
                Ok(PayloadOutput::from_value(Value::String(text)))
            })
        }
    }

    struct Fail;

    impl Payload for Fail {
        fn kind(&self) -> &'static str {
            "fail"
        }
        fn name(&self) -> &str {
            "fail"
        }
        fn invoke<'a>(
            &'a self,
            _ctx: &'a ExecCtx,
            _input: Value,
        ) -> BoxFut<'a, Result<PayloadOutput>> {
            Box::pin(async {
                Err(PipelineError::StageFailed {
                    stage: "fail".into(),
                    message: "boom".into(),
                })
            })
        }
    }

    fn test_ctx() -> ExecCtx {
        ExecCtx::builder().build().unwrap()
    }

    #[tokio::test]
    async fn test_each_step_sees_previous_output() {
        let chain = Chain::new("test")
            .push(Box::new(Append("outline")))
            .push(Box::new(Append("story")));

        let out = chain.execute(&test_ctx(), json!("topic")).await.unwrap();
        assert_eq!(out.as_text(), Some("topic > outline > story"));
    }

    #[tokio::test]
    async fn test_execute_all_keeps_steps_by_name() {
        let chain = Chain::new("test")
            .push(Box::new(Append("outline")))
            .push(Box::new(Append("story")))
            .push(Box::new(Append("hashtags")));

        let run = chain.execute_all(&test_ctx(), json!("t")).await.unwrap();
        assert_eq!(run.len(), 3);
        assert_eq!(run.text("outline").unwrap(), "t > outline");
        assert_eq!(run.text("hashtags").unwrap(), "t > outline > story > hashtags");
        assert_eq!(
            run.steps().iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["outline", "story", "hashtags"]
        );
        assert!(run.text("epilogue").is_err());
    }

    #[tokio::test]
    async fn test_empty_chain_is_config_error() {
        let result = Chain::new("empty").execute(&test_ctx(), json!(null)).await;
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_failure() {
        let chain = Chain::new("test")
            .push(Box::new(Append("a")))
            .push(Box::new(Fail))
            .push(Box::new(Append("never")));

        let result = chain.execute_all(&test_ctx(), json!("x")).await;
        assert!(matches!(result, Err(PipelineError::StageFailed { .. })));
    }

    #[tokio::test]
    async fn test_nested_chain() {
        let inner = Chain::new("inner").push(Box::new(Append("inner")));
        let outer = Chain::new("outer")
            .push(Box::new(inner))
            .push(Box::new(Append("outer")));

        let out = outer.execute(&test_ctx(), json!("x")).await.unwrap();
        assert_eq!(out.as_text(), Some("x > inner > outer"));
    }
}
