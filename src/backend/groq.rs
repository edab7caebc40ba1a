//! Backend for Groq's OpenAI-compatible chat completions API.
//!
//! [`GroqBackend`] translates normalized [`CompletionRequest`]s into
//! `POST /openai/v1/chat/completions` with `Authorization: Bearer {key}`.

use super::{Backend, CompletionRequest, ProviderError, ProviderKind, ProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default Groq chat completions endpoint.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Backend for Groq's OpenAI-compatible API.
///
/// # Example
///
/// ```
/// use rag_agent::backend::GroqBackend;
///
/// let backend = GroqBackend::new("llama-3.1-8b-instant");
/// ```
#[derive(Debug, Clone)]
pub struct GroqBackend {
    model: String,
    endpoint: String,
}

impl GroqBackend {
    /// Create a backend targeting the official Groq endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            endpoint: GROQ_API_URL.to_string(),
        }
    }

    /// Override the endpoint (for OpenAI-compatible self-hosted gateways).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the messages array for the chat completions request.
    fn build_messages(request: &CompletionRequest) -> Vec<Value> {
        let mut messages = Vec::new();
        if let Some(ref sys) = request.system {
            if !sys.is_empty() {
                messages.push(json!({"role": "system", "content": sys}));
            }
        }
        messages.push(json!({"role": "user", "content": request.prompt}));
        messages
    }

    /// Build the request body for `/openai/v1/chat/completions`.
    fn build_body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": Self::build_messages(request),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    /// Pull the assistant text out of a chat completions response.
    fn extract_text(body: &Value) -> Option<String> {
        body.get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()
            .map(str::to_string)
    }
}

#[async_trait]
impl Backend for GroqBackend {
    async fn complete(
        &self,
        client: &Client,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let body = self.build_body(request);
        let resp = client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", credential))
            .json(&body)
            .send()
            .await?;

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
            ProviderError::malformed("response missing choices[0].message.content")
        })?;

        Ok(ProviderResponse {
            text,
            status,
            metadata: json_resp.get("usage").cloned(),
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }
}
