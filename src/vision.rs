//! Vision model collaborator: one image URL in, analysis text out.
//!
//! [`VisionModel`] is deliberately narrow — the dispatcher only ever needs
//! "describe this image given this prompt". Treating the provider as a
//! black box with variable latency and occasional failure keeps all retry,
//! timeout, and placeholder logic in the pipeline, where it belongs.
//!
//! [`OpenAiVision`] is the production implementation: a thin client for an
//! OpenAI-compatible chat-completions endpoint, sending one user message
//! whose content array carries the prompt and the image URL. Image URLs
//! may be HTTPS links (store renderings) or inline `data:` URIs (the
//! single-image short-circuit).

use crate::error::VisionError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// External vision/analysis model consumed by the batch dispatcher.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Analyse one image with the given prompt, returning the model's text.
    async fn analyze(
        &self,
        image_url: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, VisionError>;
}

/// OpenAI-compatible chat-completions [`VisionModel`].
pub struct OpenAiVision {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiVision {
    /// Default vision-capable model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";

    /// Transport-level timeout. Generous by design: the pipeline enforces
    /// its own per-task timeout, and this only backstops hung connections.
    const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.openai.com".to_string(),
            client: reqwest::Client::builder()
                .timeout(Self::HTTP_TIMEOUT)
                .build()
                .expect("reqwest client with static configuration"),
        }
    }

    /// Build from `OPENAI_API_KEY`, with the model optionally overridden by
    /// `PAGELENS_MODEL`.
    pub fn from_env() -> Result<Self, VisionError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| VisionError::MissingConfig("OPENAI_API_KEY"))?;
        let model =
            std::env::var("PAGELENS_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    /// Override the API host (tests point this at a local mock server).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        self.api_base = base;
        self
    }

    /// The model id this client submits.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn analyze(
        &self,
        image_url: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, VisionError> {
        let url = format!("{}/v1/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image_url } },
                ],
            }],
            "max_completion_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(VisionError::EmptyResponse)?;

        debug!("Vision response: {} chars", content.len());
        Ok(content)
    }
}
