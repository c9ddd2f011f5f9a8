//! Execution context shared across payload invocations.
//!
//! [`ExecCtx`] carries the HTTP client, one [`Endpoint`] per [`Provider`],
//! the transport backoff policy, template variables, and an optional event
//! handler. It is constructed once per run and shared by every stage.

use crate::backend::{Backend, BackoffConfig, Provider};
use crate::client::http_client;
use crate::error::Result;
use crate::events::EventHandler;
use crate::PipelineError;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A provider's backend paired with the base URL it is reached at.
#[derive(Clone)]
pub struct Endpoint {
    /// Adapter that speaks the provider's HTTP dialect.
    pub backend: Arc<dyn Backend>,
    /// Base URL, without the API path (e.g. `https://api.openai.com`).
    pub base_url: String,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("backend", &self.backend.name())
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Shared execution context for payload invocations.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use story_pipeline::backend::{MockBackend, Provider};
/// use story_pipeline::ExecCtx;
///
/// let ctx = ExecCtx::builder()
///     .provider(Provider::OpenAi, Arc::new(MockBackend::fixed("ok")), "http://unused")
///     .var("genre", "mystery")
///     .build()
///     .unwrap();
/// assert!(ctx.endpoint(Provider::OpenAi).is_ok());
/// ```
pub struct ExecCtx {
    /// HTTP client (cheap to clone -- uses `Arc` internally).
    pub client: Client,
    /// Registered providers.
    pub endpoints: HashMap<Provider, Endpoint>,
    /// Transport retry configuration. Default: [`BackoffConfig::none()`].
    pub backoff: BackoffConfig,
    /// Template variables substituted into prompt `{key}` placeholders.
    pub vars: HashMap<String, String>,
    /// Optional event handler for lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtx {
    /// Create a new builder.
    pub fn builder() -> ExecCtxBuilder {
        ExecCtxBuilder {
            client: None,
            endpoints: HashMap::new(),
            backoff: None,
            vars: HashMap::new(),
            event_handler: None,
            timeout: None,
        }
    }

    /// Look up the endpoint registered for `provider`.
    pub fn endpoint(&self, provider: Provider) -> Result<&Endpoint> {
        self.endpoints.get(&provider).ok_or_else(|| {
            PipelineError::InvalidConfig(format!("no backend registered for {}", provider))
        })
    }

    /// A copy of this context with extra template variables layered on top.
    pub fn with_vars<I, K, V>(&self, extra: I) -> ExecCtx
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut vars = self.vars.clone();
        vars.extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        ExecCtx {
            client: self.client.clone(),
            endpoints: self.endpoints.clone(),
            backoff: self.backoff.clone(),
            vars,
            event_handler: self.event_handler.clone(),
        }
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("endpoints", &self.endpoints)
            .field("backoff", &self.backoff)
            .field("vars_count", &self.vars.len())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    client: Option<Client>,
    endpoints: HashMap<Provider, Endpoint>,
    backoff: Option<BackoffConfig>,
    vars: HashMap<String, String>,
    event_handler: Option<Arc<dyn EventHandler>>,
    timeout: Option<Duration>,
}

impl ExecCtxBuilder {
    /// Set the HTTP client. If not set, a default client is created.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Register the backend and base URL used for `provider`.
    pub fn provider(
        mut self,
        provider: Provider,
        backend: Arc<dyn Backend>,
        base_url: impl Into<String>,
    ) -> Self {
        self.endpoints.insert(
            provider,
            Endpoint {
                backend,
                base_url: normalize_base_url(&base_url.into()),
            },
        );
        self
    }

    /// Set the transport retry configuration. Default: [`BackoffConfig::none()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Insert a single template variable.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Set the request timeout. Default: 60 seconds.
    ///
    /// Ignored when a custom `Client` is provided via `.client()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the execution context.
    pub fn build(self) -> Result<ExecCtx> {
        let client = match self.client {
            Some(client) => client,
            None => http_client(self.timeout.unwrap_or(Duration::from_secs(60)))?,
        };
        Ok(ExecCtx {
            client,
            endpoints: self.endpoints,
            backoff: self.backoff.unwrap_or_else(BackoffConfig::none),
            vars: self.vars,
            event_handler: self.event_handler,
        })
    }
}

/// Strip known provider path suffixes from a base URL.
/// Backends append their own paths, so
/// "https://api.openai.com/v1" becomes "https://api.openai.com".
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    // longest first
    for suffix in &["/v1/chat/completions", "/v1beta", "/v1"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}
