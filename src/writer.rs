//! The story pipeline: outline, story, hashtags.
//!
//! [`StoryWriter`] owns one [`LlmCall`] per stage and the [`ExecCtx`] they
//! share. The outline and hashtag stages run on OpenAI, the story stage on
//! Gemini. Each stage can be called on its own; [`StoryWriter::try_create_story`]
//! runs all three as a [`Chain`] and assembles the [`StoryPackage`].

use crate::{
    backend::{Backend, GeminiBackend, OpenAiBackend, Provider},
    chain::Chain,
    config::{Credentials, StoryConfig},
    error::Result,
    events::EventHandler,
    exec_ctx::ExecCtx,
    llm_call::LlmCall,
    payload::Payload,
    templates,
    types::{word_count, StoryPackage, StoryRequest},
};
use serde_json::Value;
use std::sync::Arc;

/// Stage name of the outline call.
pub const STAGE_OUTLINE: &str = "outline";
/// Stage name of the story call.
pub const STAGE_STORY: &str = "story";
/// Stage name of the hashtag call.
pub const STAGE_HASHTAGS: &str = "hashtags";

/// Runs the three-stage story pipeline.
///
/// # Example
///
/// ```no_run
/// use story_pipeline::{Credentials, StoryConfig, StoryRequest, StoryWriter};
///
/// # async fn run() -> story_pipeline::Result<()> {
/// let config = StoryConfig::default();
/// let writer = StoryWriter::new(&config, &Credentials::from_env()?)?;
///
/// let request = StoryRequest::new("A lighthouse that moves").with_genre("mystery");
/// if let Some(package) = writer.create_story(&request).await {
///     println!("{}", package.hashtags);
/// }
/// # Ok(())
/// # }
/// ```
pub struct StoryWriter {
    ctx: ExecCtx,
    outline: LlmCall,
    story: LlmCall,
    hashtags: LlmCall,
    word_target: usize,
}

impl StoryWriter {
    /// Build a writer talking to the real provider APIs.
    pub fn new(config: &StoryConfig, credentials: &Credentials) -> Result<Self> {
        let openai = OpenAiBackend::new().with_api_key(credentials.key(Provider::OpenAi));
        let gemini = GeminiBackend::new().with_api_key(credentials.key(Provider::Gemini));
        Self::with_backends(config, Arc::new(openai), Arc::new(gemini))
    }

    /// Build a writer from `config`, reading both API keys from the environment.
    ///
    /// Fails with [`PipelineError::MissingCredential`](crate::PipelineError::MissingCredential) before anything is sent.
    pub fn from_env(config: &StoryConfig) -> Result<Self> {
        let credentials = Credentials::from_env()?;
        Self::new(config, &credentials)
    }

    /// Like [`from_env`](Self::from_env), with keys resolved through `lookup`
    /// (variable name in, value out).
    pub fn from_lookup(
        config: &StoryConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let credentials = Credentials::from_lookup(lookup)?;
        Self::new(config, &credentials)
    }

    /// Build a writer over arbitrary backends (e.g. [`MockBackend`](crate::backend::MockBackend)).
    pub fn with_backends(
        config: &StoryConfig,
        openai: Arc<dyn Backend>,
        gemini: Arc<dyn Backend>,
    ) -> Result<Self> {
        config.validate()?;
        let ctx = ExecCtx::builder()
            .provider(Provider::OpenAi, openai, config.openai.base_url.as_str())
            .provider(Provider::Gemini, gemini, config.gemini.base_url.as_str())
            .backoff(config.backoff())
            .timeout(config.timeout())
            .var("word_target", config.word_target.to_string())
            .build()?;
        Ok(Self::from_ctx(ctx, config))
    }

    /// Build a writer over a prepared context.
    ///
    /// `ctx` must have endpoints for both providers; a missing one surfaces
    /// as [`PipelineError::InvalidConfig`](crate::PipelineError::InvalidConfig) when its stage runs.
    pub fn from_ctx(mut ctx: ExecCtx, config: &StoryConfig) -> Self {
        ctx.vars
            .entry("word_target".to_string())
            .or_insert_with(|| config.word_target.to_string());
        let stage = |name: &str, system: &str, user: &str, provider: Provider| {
            let settings = config.provider(provider);
            LlmCall::new(name, user, provider)
                .with_system(system)
                .with_model(settings.model.as_str())
                .with_config(settings.llm_config())
        };
        Self {
            outline: stage(
                STAGE_OUTLINE,
                templates::OUTLINE_SYSTEM,
                templates::OUTLINE_USER,
                Provider::OpenAi,
            ),
            story: stage(
                STAGE_STORY,
                templates::STORY_SYSTEM,
                templates::STORY_USER,
                Provider::Gemini,
            )
            .with_strip_boilerplate(false),
            hashtags: stage(
                STAGE_HASHTAGS,
                templates::HASHTAGS_SYSTEM,
                templates::HASHTAGS_USER,
                Provider::OpenAi,
            ),
            ctx,
            word_target: config.word_target,
        }
    }

    /// Attach an event handler (e.g. [`ConsoleReporter`](crate::report::ConsoleReporter)).
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.ctx.event_handler = Some(handler);
        self
    }

    /// The shared execution context.
    pub fn ctx(&self) -> &ExecCtx {
        &self.ctx
    }

    /// Stage 1: outline for `topic` in `genre` (OpenAI).
    pub async fn create_outline(&self, topic: &str, genre: &str) -> Result<String> {
        let ctx = self.ctx.with_vars([("genre", genre)]);
        self.outline
            .invoke(&ctx, Value::String(topic.to_string()))
            .await?
            .into_text()
    }

    /// Stage 2: story from `outline` (Gemini).
    pub async fn write_story(&self, outline: &str) -> Result<String> {
        let story = self
            .story
            .invoke(&self.ctx, Value::String(outline.to_string()))
            .await?
            .into_text()?;
        self.check_length(&story);
        Ok(story)
    }

    /// Stage 3: a line of hashtags for `story` (OpenAI).
    pub async fn generate_hashtags(&self, story: &str) -> Result<String> {
        self.hashtags
            .invoke(&self.ctx, Value::String(story.to_string()))
            .await?
            .into_text()
    }

    /// Run all three stages and assemble the package.
    pub async fn try_create_story(&self, request: &StoryRequest) -> Result<StoryPackage> {
        tracing::info!(topic = %request.topic, genre = %request.genre, "creating story");
        let ctx = self.ctx.with_vars([("genre", request.genre.as_str())]);
        let chain = Chain::new("story-pipeline")
            .push(Box::new(self.outline.clone()))
            .push(Box::new(self.story.clone()))
            .push(Box::new(self.hashtags.clone()));

        let run = chain
            .execute_all(&ctx, Value::String(request.topic.clone()))
            .await?;
        for step in run.steps() {
            if let Some(diag) = &step.output.diagnostics {
                tracing::debug!(
                    stage = %step.name,
                    backend = diag.backend.unwrap_or("unknown"),
                    retries = diag.transport_retries,
                    backoff_ms = diag.backoff_total_ms,
                    trimmed_bytes = diag.trimmed_bytes,
                    elapsed_ms = step.elapsed.as_millis() as u64,
                    "stage finished"
                );
            }
        }

        let package = StoryPackage {
            topic: request.topic.clone(),
            genre: request.genre.clone(),
            outline: run.text(STAGE_OUTLINE)?,
            story: run.text(STAGE_STORY)?,
            hashtags: run.text(STAGE_HASHTAGS)?,
        };
        self.check_length(&package.story);
        tracing::info!(
            words = package.story_words(),
            hashtags = package.hashtag_list().len(),
            "story complete"
        );
        Ok(package)
    }

    /// Run the pipeline; any failure is logged and yields `None`.
    pub async fn create_story(&self, request: &StoryRequest) -> Option<StoryPackage> {
        match self.try_create_story(request).await {
            Ok(package) => Some(package),
            Err(e) => {
                tracing::error!(topic = %request.topic, error = %e, "error in story creation pipeline");
                None
            }
        }
    }

    /// Warn when the story drifts more than 25% from the word target.
    fn check_length(&self, story: &str) {
        let words = word_count(story);
        if words.abs_diff(self.word_target) * 4 > self.word_target {
            tracing::warn!(
                words,
                target = self.word_target,
                "story length is far from the word target"
            );
        }
    }
}

impl std::fmt::Debug for StoryWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryWriter")
            .field("ctx", &self.ctx)
            .field("outline_model", &self.outline.model())
            .field("story_model", &self.story.model())
            .field("hashtags_model", &self.hashtags.model())
            .field("word_target", &self.word_target)
            .finish()
    }
}
