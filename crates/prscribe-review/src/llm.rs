use async_trait::async_trait;
use prscribe_core::{GatewayError, GeneratedReview, InferenceConfig, ReviewError, Upstream};
use serde::Serialize;

use crate::upstream::{first_text_field, status_error, transport_error};

/// Response fields that may hold the generated text, in lookup order.
///
/// Backends disagree on the name; when none is present the whole body is
/// taken as the text.
pub const RESPONSE_TEXT_FIELDS: [&str; 2] = ["response", "text"];

const ERROR_FIELDS: [&str; 2] = ["error", "message"];

/// A text-generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Inference: Send + Sync {
    /// Generate text for `prompt`, waiting for the complete response.
    async fn generate(&self, prompt: &str) -> Result<GeneratedReview, GatewayError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Extract generated text from a backend response body.
///
/// # Examples
///
/// ```
/// use prscribe_review::llm::extract_generated_text;
///
/// assert_eq!(extract_generated_text(r#"{"response":"ok"}"#), "ok");
/// assert_eq!(extract_generated_text(r#"{"text":"ok"}"#), "ok");
/// assert_eq!(extract_generated_text(r#"{"other":"x"}"#), r#"{"other":"x"}"#);
/// ```
pub fn extract_generated_text(body: &str) -> String {
    first_text_field(body, &RESPONSE_TEXT_FIELDS).unwrap_or_else(|| body.to_string())
}

/// Non-streaming client for an Ollama-style `/api/generate` endpoint.
///
/// # Examples
///
/// ```
/// use prscribe_core::InferenceConfig;
/// use prscribe_review::llm::InferenceClient;
///
/// let client = InferenceClient::new(&InferenceConfig::default()).unwrap();
/// assert_eq!(client.model(), "openchat:latest");
/// ```
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
    model: String,
}

impl InferenceClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &InferenceConfig) -> Result<Self, ReviewError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ReviewError::Configuration(format!("failed to create inference HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_token: config.api_token().map(str::to_string),
            model: config.model.clone(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn upstream(&self) -> Upstream {
        Upstream::Inference {
            model: self.model.clone(),
        }
    }
}

#[async_trait]
impl Inference for InferenceClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedReview, GatewayError> {
        let operation = "generating review".to_string();
        tracing::debug!(
            model = %self.model,
            url = %self.api_url,
            prompt_bytes = prompt.len(),
            "sending generation request"
        );

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let mut request = self.http.post(&self.api_url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(self.upstream(), operation.clone(), &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(self.upstream(), operation.clone(), &e))?;

        if status.as_u16() >= 300 {
            return Err(status_error(
                self.upstream(),
                operation,
                status,
                &text,
                &ERROR_FIELDS,
            ));
        }

        Ok(GeneratedReview::new(extract_generated_text(&text)))
    }
}
