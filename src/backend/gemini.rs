//! Backend for the Google Gemini `generateContent` API.
//!
//! Endpoint: `/v1beta/models/{model}:generateContent`, authenticated with the
//! `x-goog-api-key` header. System instructions travel in `systemInstruction`;
//! the reply text is the concatenation of `candidates[0].content.parts[*].text`.

use super::{http_error, Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const API_VERSION: &str = "v1beta";

/// Backend for Google's Gemini models.
///
/// # Example
///
/// ```
/// use story_pipeline::backend::GeminiBackend;
///
/// let backend = GeminiBackend::new().with_api_key("AIza...");
/// assert!(backend.has_api_key());
/// ```
#[derive(Clone, Default)]
pub struct GeminiBackend {
    api_key: Option<String>,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_key", &self.api_key.as_deref().map(crate::config::redact))
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<Value>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiBackend {
    /// Create a new backend without authentication.
    pub fn new() -> Self {
        Self { api_key: None }
    }

    /// Set the API key sent as `x-goog-api-key`.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns `true` if an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(base_url: &str, model: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            API_VERSION,
            model
        )
    }

    fn build_body(request: &LlmRequest) -> GenerateContentRequest<'_> {
        let system_instruction = request
            .system_prompt
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            });

        GenerateContentRequest {
            system_instruction,
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.config.temperature,
                max_output_tokens: request.config.max_tokens,
            },
        }
    }

    /// Join the visible text parts of the first candidate.
    fn extract_text(resp: &GenerateContentResponse) -> Result<String> {
        let Some(candidate) = resp.candidates.first() else {
            let reason = resp
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
                .unwrap_or("no candidates returned");
            return Err(PipelineError::Other(format!(
                "Gemini returned no content: {}",
                reason
            )));
        };

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.is_empty() {
            if let Some(reason) = candidate.finish_reason.as_deref() {
                tracing::warn!(finish_reason = reason, "Gemini candidate carried no text");
            }
        }

        Ok(text)
    }

    fn extract_metadata(resp: &GenerateContentResponse) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        if let Some(ref usage) = resp.usage_metadata {
            meta.insert("usage".into(), usage.clone());
        }
        if let Some(ref model) = resp.model_version {
            meta.insert("model".into(), Value::String(model.clone()));
        }
        if let Some(reason) = resp.candidates.first().and_then(|c| c.finish_reason.clone()) {
            meta.insert("finish_reason".into(), Value::String(reason));
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let url = Self::endpoint(base_url, &request.model);
        let body = Self::build_body(request);

        tracing::debug!(%url, model = %request.model, "sending Gemini generateContent");

        let mut req = client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("x-goog-api-key", key.as_str());
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let text = Self::extract_text(&parsed)?;

        Ok(LlmResponse {
            text,
            status,
            metadata: Self::extract_metadata(&parsed),
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_request() -> LlmRequest {
        LlmRequest {
            model: "gemini-2.5-flash".into(),
            system_prompt: Some("You are a skilled creative writer.".into()),
            prompt: "Story Outline:\n1. A cliff".into(),
            config: LlmConfig::default().with_temperature(0.9).with_max_tokens(1500),
        }
    }

    #[test]
    fn test_body_shape() {
        let request = test_request();
        let body = serde_json::to_value(GeminiBackend::build_body(&request)).unwrap();

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a skilled creative writer."
        );
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Story Outline:\n1. A cliff");
        assert_eq!(body["generationConfig"]["temperature"], 0.9);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1500);
    }

    #[test]
    fn test_body_without_system() {
        let mut request = test_request();
        request.system_prompt = None;
        let body = serde_json::to_value(GeminiBackend::build_body(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        assert_eq!(
            GeminiBackend::endpoint("https://generativelanguage.googleapis.com/", "gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_extract_text_skips_thoughts() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "planning...", "thought": true},
                    {"text": "Once upon "},
                    {"text": "a tide."}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(GeminiBackend::extract_text(&resp).unwrap(), "Once upon a tide.");
        assert_eq!(
            GeminiBackend::extract_metadata(&resp).unwrap()["finish_reason"],
            "STOP"
        );
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let err = GeminiBackend::extract_text(&resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = GeminiBackend::new().with_api_key("AIzaSyVerySecretValue");
        let debug_output = format!("{:?}", backend);
        assert!(!debug_output.contains("VerySecretValue"));
    }

    #[tokio::test]
    async fn test_complete_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "The island hummed."}]}}],
                "usageMetadata": {"totalTokenCount": 12},
                "modelVersion": "gemini-2.5-flash"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = GeminiBackend::new()
            .with_api_key("AIza-test")
            .complete(&Client::new(), &server.uri(), &test_request())
            .await
            .unwrap();

        assert_eq!(resp.text, "The island hummed.");
        assert_eq!(resp.metadata.unwrap()["model"], "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_complete_maps_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = GeminiBackend::new()
            .complete(&Client::new(), &server.uri(), &test_request())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::HttpError { status: 503, .. }));
    }
}
