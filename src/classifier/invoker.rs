//! HTTP implementation of the model-invoker seam against OpenAI-compatible
//! chat-completions endpoints.

use async_trait::async_trait;
use tracing::debug;

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::classifier::{ModelInvoker, ModelSettings};

pub struct HttpModelInvoker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpModelInvoker {
    /// `api_key` may be empty for local endpoints that skip authentication.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ModelInvoker for HttpModelInvoker {
    async fn invoke(&self, prompt: &str, settings: &ModelSettings) -> Result<String, String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            temperature: Some(settings.temperature),
            max_tokens: Some(settings.max_tokens),
        };

        let url = construct_api_url(&self.base_url, "chat/completions");
        debug!(%url, model = %self.model, "sending classification request");

        let mut http_request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            http_request = http_request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = http_request
            .json(&request)
            .send()
            .await
            .map_err(|err| format!("request failed: {err}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(format!(
                "API error ({status}): {}",
                summarize_error_body(&body)
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| format!("invalid response body: {err}"))?;

        parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| "response contained no content".to_string())
    }
}

fn construct_api_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Pulls the human-readable message out of a JSON error body when one exists,
/// so transport errors stay one line in the diagnostics.
fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()));
        if let Some(summary) = summary {
            let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
            if !collapsed.is_empty() {
                return collapsed;
            }
        }
    }

    trimmed.to_string()
}
