//! LLM call payload: one stage of the pipeline.
//!
//! [`LlmCall`] renders its prompt templates, dispatches one request to the
//! backend registered for its [`Provider`], and cleans the reply into plain
//! text. An empty reply is a stage failure: every stage hands non-empty text
//! to the next.

use crate::{
    backend::{self, LlmRequest, LlmResponse, Provider},
    client::LlmConfig,
    diagnostics::CallDiagnostics,
    error::Result,
    events::{emit, Event},
    exec_ctx::ExecCtx,
    output_parser,
    payload::{BoxFut, Payload, PayloadOutput},
    prompt, PipelineError,
};
use serde_json::Value;
use std::time::Duration;

/// A single prompt-in, text-out call against one provider.
///
/// # Example
///
/// ```ignore
/// use story_pipeline::{LlmCall, LlmConfig};
/// use story_pipeline::backend::Provider;
/// use story_pipeline::payload::Payload;
/// use serde_json::json;
///
/// let call = LlmCall::new("outline", "Topic: {input}\nGenre: {genre}", Provider::OpenAi)
///     .with_system("You are a creative story outline writer.")
///     .with_config(LlmConfig::default().with_temperature(0.8));
///
/// let output = call.invoke(&ctx, json!("A mysterious island")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LlmCall {
    /// Instance name (for logging/events).
    name: String,
    /// Prompt template with `{input}` and `{key}` placeholders.
    prompt_template: String,
    /// Optional system prompt template.
    system_template: Option<String>,
    /// Which registered endpoint serves this call.
    provider: Provider,
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    model: String,
    /// Sampling configuration.
    config: LlmConfig,
    /// Drop chatty openers ("Sure! ", "Here's your outline:") from the reply.
    strip_boilerplate: bool,
}

impl LlmCall {
    /// Create a new call with a prompt template, using the provider's default model.
    pub fn new(
        name: impl Into<String>,
        prompt_template: impl Into<String>,
        provider: Provider,
    ) -> Self {
        Self {
            name: name.into(),
            prompt_template: prompt_template.into(),
            system_template: None,
            provider,
            model: provider.default_model().to_string(),
            config: LlmConfig::default(),
            strip_boilerplate: true,
        }
    }

    /// Returns the prompt template.
    pub fn prompt_template(&self) -> &str {
        &self.prompt_template
    }

    /// Returns the system template, if any.
    pub fn system_template(&self) -> Option<&str> {
        self.system_template.as_deref()
    }

    /// Returns the provider this call runs on.
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the sampling config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Set a system prompt template. `{key}` placeholders are rendered from context vars.
    pub fn with_system(mut self, template: impl Into<String>) -> Self {
        self.system_template = Some(template.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling configuration.
    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Toggle boilerplate stripping (on by default). Turn it off for stages
    /// whose reply is prose, where "Of course, " may be the first line.
    pub fn with_strip_boilerplate(mut self, strip: bool) -> Self {
        self.strip_boilerplate = strip;
        self
    }

    /// Whether chatty openers are removed from the reply.
    pub fn strips_boilerplate(&self) -> bool {
        self.strip_boilerplate
    }

    /// Convert a `Value` input to a string for template substitution.
    fn input_to_string(input: &Value) -> String {
        match input {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Render both templates into a normalized request.
    fn build_request(&self, ctx: &ExecCtx, input: &Value) -> LlmRequest {
        let input_str = Self::input_to_string(input);
        LlmRequest {
            model: self.model.clone(),
            system_prompt: self
                .system_template
                .as_ref()
                .map(|t| prompt::render(t, &input_str, &ctx.vars)),
            prompt: prompt::render(&self.prompt_template, &input_str, &ctx.vars),
            config: self.config.clone(),
        }
    }

    /// Execute via the provider's backend, tracking transport retries.
    async fn call_backend(
        &self,
        ctx: &ExecCtx,
        request: &LlmRequest,
    ) -> Result<(LlmResponse, CallDiagnostics)> {
        let endpoint = ctx.endpoint(self.provider)?;
        let mut diag = CallDiagnostics {
            backend: Some(endpoint.backend.name()),
            ..Default::default()
        };
        let name = self.name.clone();
        let event_handler = ctx.event_handler.clone();

        let mut on_retry = |attempt: u32, delay: Duration, reason: &str| {
            diag.transport_retries = attempt;
            diag.backoff_total_ms += delay.as_millis() as u64;
            emit(
                &event_handler,
                Event::TransportRetry {
                    name: name.clone(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    reason: reason.to_string(),
                },
            );
        };

        let response = backend::with_backoff(
            &endpoint.backend,
            &ctx.client,
            &endpoint.base_url,
            request,
            &ctx.backoff,
            Some(&mut on_retry),
        )
        .await?;

        Ok((response, diag))
    }

    /// Clean the raw reply into the stage's text output.
    fn build_output(&self, raw_text: String, mut diag: CallDiagnostics) -> Result<PayloadOutput> {
        let thinking = output_parser::extract_thinking(&raw_text);
        diag.thinking_stripped = thinking.is_some();

        let cleaned = if self.strip_boilerplate {
            output_parser::parse_text(&raw_text)
        } else {
            output_parser::parse_plain(&raw_text)
        };
        let text = cleaned.map_err(|e| PipelineError::StageFailed {
            stage: self.name.clone(),
            message: format!("{} returned no usable text: {}", self.provider, e),
        })?;
        diag.trimmed_bytes = raw_text.len().saturating_sub(text.len());

        Ok(PayloadOutput {
            value: Value::String(text),
            raw_response: raw_text,
            thinking,
            model: Some(self.model.clone()),
            diagnostics: Some(diag),
        })
    }

    async fn run(&self, ctx: &ExecCtx, input: Value) -> Result<PayloadOutput> {
        let request = self.build_request(ctx, &input);
        tracing::info!(
            stage = %self.name,
            provider = %self.provider,
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "calling LLM"
        );

        let (response, diag) =
            self.call_backend(ctx, &request)
                .await
                .map_err(|e| match e {
                    PipelineError::InvalidConfig(_) | PipelineError::StageFailed { .. } => e,
                    other => PipelineError::StageFailed {
                        stage: self.name.clone(),
                        message: format!("{} call failed: {}", self.provider, other),
                    },
                })?;

        let output = self.build_output(response.text, diag)?;
        tracing::debug!(
            stage = %self.name,
            status = response.status,
            metadata = ?response.metadata,
            "LLM call complete"
        );
        Ok(output)
    }
}

impl Payload for LlmCall {
    fn kind(&self) -> &'static str {
        "llm-call"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn invoke<'a>(&'a self, ctx: &'a ExecCtx, input: Value) -> BoxFut<'a, Result<PayloadOutput>> {
        Box::pin(async move {
            emit(
                &ctx.event_handler,
                Event::PayloadStart {
                    name: self.name.clone(),
                    kind: self.kind(),
                },
            );

            let result = self.run(ctx, input).await;

            if let Ok(ref output) = result {
                if let Some(text) = output.as_text() {
                    emit(
                        &ctx.event_handler,
                        Event::Output {
                            name: self.name.clone(),
                            provider: self.provider,
                            text: text.to_string(),
                        },
                    );
                }
            }
            emit(
                &ctx.event_handler,
                Event::PayloadEnd {
                    name: self.name.clone(),
                    ok: result.is_ok(),
                },
            );

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackoffConfig, MockBackend, MockReply};
    use crate::events::FnEventHandler;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn ctx_with(mock: Arc<MockBackend>) -> ExecCtx {
        ExecCtx::builder()
            .provider(Provider::OpenAi, mock, "http://unused")
            .var("genre", "mystery")
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_uses_provider_default_model() {
        assert_eq!(LlmCall::new("a", "p", Provider::OpenAi).model(), "gpt-4o-mini");
        assert_eq!(LlmCall::new("b", "p", Provider::Gemini).model(), "gemini-2.5-flash");
        assert_eq!(
            LlmCall::new("c", "p", Provider::Gemini).with_model("gemini-2.5-pro").model(),
            "gemini-2.5-pro"
        );
    }

    #[tokio::test]
    async fn test_invoke_renders_prompts_and_returns_text() {
        let mock = Arc::new(MockBackend::fixed("Sure! 1. Setting: a fogbound harbor"));
        let call = LlmCall::new("outline", "Topic: {input}\nGenre: {genre}", Provider::OpenAi)
            .with_system("You outline {genre} stories.")
            .with_config(LlmConfig::default().with_temperature(0.5));

        let out = call
            .invoke(&ctx_with(mock.clone()), json!("a missing keeper"))
            .await
            .unwrap();

        assert_eq!(out.as_text(), Some("1. Setting: a fogbound harbor"));
        assert_eq!(out.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(out.diagnostics.as_ref().unwrap().backend, Some("mock"));

        let sent = mock.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].prompt, "Topic: a missing keeper\nGenre: mystery");
        assert_eq!(sent[0].system_prompt.as_deref(), Some("You outline mystery stories."));
        assert_eq!(sent[0].config.temperature, 0.5);
    }

    #[tokio::test]
    async fn test_boilerplate_kept_when_stripping_disabled() {
        let reply = "Of course, the island was never on any map.";
        let mock = Arc::new(MockBackend::fixed(reply));
        let ctx = ctx_with(mock);

        let prose = LlmCall::new("story", "{input}", Provider::OpenAi).with_strip_boilerplate(false);
        assert!(!prose.strips_boilerplate());
        let out = prose.invoke(&ctx, json!("x")).await.unwrap();
        assert_eq!(out.as_text(), Some(reply));
        assert_eq!(out.diagnostics.unwrap().trimmed_bytes, 0);

        let chatty = LlmCall::new("outline", "{input}", Provider::OpenAi);
        let out = chatty.invoke(&ctx, json!("x")).await.unwrap();
        assert_eq!(out.as_text(), Some("the island was never on any map."));
    }

    #[tokio::test]
    async fn test_empty_reply_is_stage_failure() {
        let mock = Arc::new(MockBackend::fixed("<think>hmm</think>  "));
        let call = LlmCall::new("story", "{input}", Provider::OpenAi);

        let err = call.invoke(&ctx_with(mock), json!("x")).await.unwrap_err();
        match err {
            PipelineError::StageFailed { stage, .. } => assert_eq!(stage, "story"),
            other => panic!("expected StageFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_error_is_wrapped_with_stage() {
        let mock = Arc::new(MockBackend::failing(500, "upstream exploded"));
        let call = LlmCall::new("hashtags", "{input}", Provider::OpenAi);

        let err = call.invoke(&ctx_with(mock), json!("x")).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("hashtags"), "{msg}");
        assert!(msg.contains("upstream exploded"), "{msg}");
    }

    #[tokio::test]
    async fn test_unregistered_provider_is_config_error() {
        let mock = Arc::new(MockBackend::fixed("x"));
        let call = LlmCall::new("story", "{input}", Provider::Gemini);
        let err = call.invoke(&ctx_with(mock), json!("x")).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_thinking_kept_and_events_emitted() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mock = Arc::new(MockBackend::fixed("<think>draft first</think>#Island #Mystery"));
        let ctx = ExecCtx::builder()
            .provider(Provider::OpenAi, mock, "http://unused")
            .event_handler(Arc::new(FnEventHandler(move |e: Event| {
                let label = match e {
                    Event::PayloadStart { .. } => "start".to_string(),
                    Event::Output { text, .. } => format!("output:{text}"),
                    Event::PayloadEnd { ok, .. } => format!("end:{ok}"),
                    Event::TransportRetry { .. } => "retry".to_string(),
                };
                sink.lock().unwrap().push(label);
            })))
            .build()
            .unwrap();

        let out = LlmCall::new("hashtags", "{input}", Provider::OpenAi)
            .invoke(&ctx, json!("story"))
            .await
            .unwrap();

        assert_eq!(out.thinking.as_deref(), Some("draft first"));
        assert!(out.diagnostics.unwrap().thinking_stripped);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["start", "output:#Island #Mystery", "end:true"]
        );
    }

    #[tokio::test]
    async fn test_transport_retry_recorded_in_diagnostics() {
        let mock = Arc::new(MockBackend::scripted(vec![
            MockReply::fail(503, "busy"),
            MockReply::text("an outline"),
        ]));
        let ctx = ExecCtx::builder()
            .provider(Provider::OpenAi, mock.clone(), "http://unused")
            .backoff(BackoffConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                ..BackoffConfig::with_max_retries(1)
            })
            .build()
            .unwrap();

        let out = LlmCall::new("outline", "{input}", Provider::OpenAi)
            .invoke(&ctx, json!("x"))
            .await
            .unwrap();

        assert_eq!(out.as_text(), Some("an outline"));
        assert_eq!(out.diagnostics.unwrap().transport_retries, 1);
        assert_eq!(mock.call_count(), 2);
    }
}
