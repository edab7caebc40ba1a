//! Backend for Google's Gemini generateContent API.
//!
//! [`GeminiBackend`] translates normalized [`CompletionRequest`]s into
//! `POST /v1beta/models/{model}:generateContent?key={key}`. Gemini carries
//! the credential in the query string rather than a header, and returns
//! text split across `candidates[0].content.parts`.

use super::{Backend, CompletionRequest, ProviderError, ProviderKind, ProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default Gemini API base URL.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Backend for the Gemini generateContent API.
///
/// # Example
///
/// ```
/// use rag_agent::backend::GeminiBackend;
///
/// let backend = GeminiBackend::new("gemini-2.5-flash");
/// ```
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    model: String,
    base_url: String,
}

impl GeminiBackend {
    /// Create a backend targeting the official Gemini endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    /// Override the base URL (for test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the generateContent request body.
    fn build_body(request: &CompletionRequest) -> Value {
        let mut body = json!({
            "contents": [{"parts": [{"text": request.prompt}]}],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
        });
        if let Some(ref sys) = request.system {
            if !sys.is_empty() {
                body["systemInstruction"] = json!({"parts": [{"text": sys}]});
            }
        }
        body
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(body: &Value) -> Option<String> {
        let parts = body
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn complete(
        &self,
        client: &Client,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            credential
        );

        let body = Self::build_body(request);
        let resp = client.post(&url).json(&body).send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &text));
        }

        let json_resp: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("invalid JSON body: {}", e)))?;

        let text = Self::extract_text(&json_resp).ok_or_else(|| {
            ProviderError::malformed("response missing candidates[0].content.parts text")
        })?;

        Ok(ProviderResponse {
            text,
            status,
            metadata: json_resp.get("usageMetadata").cloned(),
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }
}
