//! Image captioning: the vision-service capability and its fallback wrapper.
//!
//! The external vision call is modeled as the [`CaptionProvider`] trait with
//! a single method, so tests substitute a stub and the pipeline never depends
//! on a specific inference backend. [`OpenAiCaptioner`] is the production
//! implementation, speaking the OpenAI-compatible `chat/completions` wire
//! format (which Ollama, vLLM, LiteLLM, and Azure-compatible gateways also
//! accept).
//!
//! [`CaptionGenerator`] wraps a provider with the shared rate limiter and the
//! degradation policy: a caption failure becomes the original alt text (or
//! the literal `"Image"`), never an error. One bad caption must not cost a
//! document.

use crate::error::CaptionError;
use crate::limiter::RateLimiter;
use crate::prompts::{caption_prompt, ALT_TEXT_BYPASS_LEN};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default OpenAI-compatible completions endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Maximum tokens requested per caption. Captions are one short paragraph;
/// 300 covers the verbose end without letting a rambling model run away.
const CAPTION_MAX_TOKENS: u32 = 300;

/// A vision service that can describe an image.
///
/// Implementations must be `Send + Sync`: captions are requested concurrently
/// from multiple file workers.
#[async_trait]
pub trait CaptionProvider: Send + Sync + std::fmt::Debug {
    /// Describe the image (base64-encoded JPEG) guided by `prompt`.
    async fn caption(&self, prompt: &str, image_base64: &str) -> Result<String, CaptionError>;
}

/// Production captioner backed by an OpenAI-compatible vision endpoint.
#[derive(Debug)]
pub struct OpenAiCaptioner {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiCaptioner {
    /// Create a captioner for the given API key and vision model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }

    /// Point the captioner at a different OpenAI-compatible endpoint
    /// (Ollama, vLLM, LiteLLM, a corporate gateway, …).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CaptionProvider for OpenAiCaptioner {
    async fn caption(&self, prompt: &str, image_base64: &str) -> Result<String, CaptionError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/jpeg;base64,{image_base64}")
                        }
                    }
                ]
            }],
            "max_tokens": CAPTION_MAX_TOKENS,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CaptionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CaptionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CaptionError::Request(e.to_string()))?;

        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(CaptionError::EmptyResponse)?;

        Ok(text.to_string())
    }
}

/// The captioning front-end used by the per-file pipeline.
///
/// Owns the degradation policy and the shared rate limiter; cheap to clone
/// behind `Arc`s.
pub struct CaptionGenerator {
    provider: Arc<dyn CaptionProvider>,
    limiter: Arc<RateLimiter>,
}

impl CaptionGenerator {
    pub fn new(provider: Arc<dyn CaptionProvider>, limiter: Arc<RateLimiter>) -> Self {
        Self { provider, limiter }
    }

    /// Produce a description for an image, degrading on any failure.
    ///
    /// Bypass: alt text longer than [`ALT_TEXT_BYPASS_LEN`] characters is
    /// already descriptive enough and is returned verbatim with zero external
    /// calls. Otherwise one rate-limited captioning request is made; every
    /// failure mode (network, API error, empty response) falls back to the
    /// alt text, or `"Image"` when no alt text exists. This method never
    /// returns an error.
    pub async fn describe(&self, alt_text: &str, image_bytes: &[u8]) -> String {
        if alt_text.chars().count() > ALT_TEXT_BYPASS_LEN {
            debug!("Alt text already descriptive ({} chars), skipping caption call",
                alt_text.chars().count());
            return alt_text.to_string();
        }

        self.limiter.throttle().await;

        let image_base64 = STANDARD.encode(image_bytes);
        let prompt = caption_prompt(alt_text);

        match self.provider.caption(&prompt, &image_base64).await {
            Ok(description) => description,
            Err(e) => {
                warn!("Caption call failed, falling back to alt text: {e}");
                fallback_text(alt_text)
            }
        }
    }
}

/// The degraded description: the author's alt text when present, otherwise
/// the literal word "Image".
fn fallback_text(alt_text: &str) -> String {
    if alt_text.is_empty() {
        "Image".to_string()
    } else {
        alt_text.to_string()
    }
}
