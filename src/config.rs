//! Run configuration and credentials.
//!
//! [`StoryConfig`] holds everything tunable about a run (models, endpoints,
//! sampling, timeouts) and may be loaded from a TOML file; every field has a
//! default. API keys are never part of the file: [`Credentials`] reads them
//! from the environment.

use crate::backend::{BackoffConfig, Provider};
use crate::client::LlmConfig;
use crate::error::Result;
use crate::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Word count the story stage is asked to hit.
pub const DEFAULT_WORD_TARGET: usize = 300;

/// Settings for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSettings {
    /// Model identifier sent with each request.
    pub model: String,
    /// API root; backends append their own paths.
    pub base_url: String,
    /// Sampling temperature, `0.0..=2.0`.
    pub temperature: f64,
    /// Cap on generated tokens per call.
    pub max_tokens: u32,
}

impl ProviderSettings {
    /// Defaults for `provider`.
    pub fn for_provider(provider: Provider) -> Self {
        let (temperature, max_tokens) = match provider {
            Provider::OpenAi => (0.7, 1024),
            Provider::Gemini => (0.9, 2048),
        };
        Self {
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            temperature,
            max_tokens,
        }
    }

    /// Sampling parameters as an [`LlmConfig`].
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig::default()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    fn merged(provider: Provider, overrides: ProviderOverrides) -> Self {
        let defaults = Self::for_provider(provider);
        Self {
            model: overrides.model.unwrap_or(defaults.model),
            base_url: overrides.base_url.unwrap_or(defaults.base_url),
            temperature: overrides.temperature.unwrap_or(defaults.temperature),
            max_tokens: overrides.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }
}

/// A provider table as written in the file; absent keys keep that provider's defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderOverrides {
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

/// The config file as written.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StoryFile {
    openai: ProviderOverrides,
    gemini: ProviderOverrides,
    word_target: Option<usize>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

impl From<StoryFile> for StoryConfig {
    fn from(file: StoryFile) -> Self {
        let defaults = StoryConfig::default();
        Self {
            openai: ProviderSettings::merged(Provider::OpenAi, file.openai),
            gemini: ProviderSettings::merged(Provider::Gemini, file.gemini),
            word_target: file.word_target.unwrap_or(defaults.word_target),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_retries: file.max_retries.unwrap_or(defaults.max_retries),
        }
    }
}

/// Top-level run configuration.
///
/// ```
/// use story_pipeline::StoryConfig;
///
/// let config: StoryConfig = toml::from_str("word_target = 150\n[gemini]\nmodel = \"gemini-2.5-pro\"").unwrap();
/// assert_eq!(config.word_target, 150);
/// assert_eq!(config.gemini.model, "gemini-2.5-pro");
/// assert_eq!(config.gemini.temperature, 0.9);
/// assert_eq!(config.openai.model, "gpt-4o-mini");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoryFile")]
pub struct StoryConfig {
    /// Provider for the outline and hashtag stages.
    pub openai: ProviderSettings,
    /// Provider for the story stage.
    pub gemini: ProviderSettings,
    /// Words the story stage is asked for. Not enforced.
    pub word_target: usize,
    /// Per-request HTTP timeout, in seconds.
    pub timeout_secs: u64,
    /// Transport retries per call. 0 means a single attempt.
    pub max_retries: u32,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            openai: ProviderSettings::for_provider(Provider::OpenAi),
            gemini: ProviderSettings::for_provider(Provider::Gemini),
            word_target: DEFAULT_WORD_TARGET,
            timeout_secs: 60,
            max_retries: 0,
        }
    }
}

impl StoryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.word_target == 0 {
            return Err(PipelineError::InvalidConfig(
                "word_target must be greater than zero".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        for (name, settings) in [("openai", &self.openai), ("gemini", &self.gemini)] {
            if settings.model.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(format!("{name}.model is empty")));
            }
            if settings.base_url.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name}.base_url is empty"
                )));
            }
            settings
                .llm_config()
                .validate()
                .map_err(|e| PipelineError::InvalidConfig(format!("{name}: {e}")))?;
        }
        Ok(())
    }

    /// Settings for `provider`.
    pub fn provider(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Gemini => &self.gemini,
        }
    }

    /// Per-request HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Transport retry policy built from `max_retries`.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig::with_max_retries(self.max_retries)
    }
}

/// API keys for both providers.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub google_api_key: String,
}

impl Credentials {
    /// Read `OPENAI_API_KEY` and `GOOGLE_API_KEY` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve both keys through `lookup`. OpenAI is checked first; a
    /// missing or blank value fails with [`PipelineError::MissingCredential`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let fetch = |provider: Provider| {
            let var = provider.key_var();
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(PipelineError::MissingCredential { var })
        };
        Ok(Self {
            openai_api_key: fetch(Provider::OpenAi)?,
            google_api_key: fetch(Provider::Gemini)?,
        })
    }

    /// Key for `provider`.
    pub fn key(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.openai_api_key,
            Provider::Gemini => &self.google_api_key,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("google_api_key", &redact(&self.google_api_key))
            .finish()
    }
}

/// Show at most the first six characters of a secret.
pub(crate) fn redact(secret: &str) -> String {
    match secret.char_indices().nth(6) {
        Some((idx, _)) => format!("{}***", &secret[..idx]),
        None => "***".to_string(),
    }
}
