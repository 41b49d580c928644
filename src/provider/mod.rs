//! Generative-AI provider boundary
//!
//! A flow hands the provider one rendered prompt and a declared output shape
//! and gets back one response. The provider does not validate the response
//! against the shape; the flow does that afterwards.

use crate::error::WanderError;
use crate::prompt::RenderedPrompt;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod gemini;
pub use gemini::GeminiClient;

/// Which configured model a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Text,
    Speech,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputSpec {
    /// JSON matching the given provider response schema
    Json(Value),
    /// Synthesized speech in the given prebuilt voice
    Speech { voice: String },
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub flow: &'static str,
    pub model: ModelRole,
    pub prompt: RenderedPrompt,
    pub output: OutputSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateResponse {
    Json(Value),
    /// Inline media; `data` is base64
    Media { mime_type: String, data: String },
}

/// Trait for the external inference service
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;
}

/// Scripted provider for local development & testing.
/// Replays queued responses in order and records what it was asked.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<GenerateResponse>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_json(value: Value) -> Self {
        let provider = Self::new();
        provider.push(Ok(GenerateResponse::Json(value)));
        provider
    }

    pub fn push(&self, response: Result<GenerateResponse>) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(WanderError::provider("no scripted response left")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> GenerateRequest {
        GenerateRequest {
            flow: "test",
            model: ModelRole::Text,
            prompt: RenderedPrompt::text("hello"),
            output: OutputSpec::Json(json!({ "type": "OBJECT" })),
        }
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::with_json(json!({ "n": 1 }));
        provider.push(Ok(GenerateResponse::Json(json!({ "n": 2 }))));

        assert_eq!(
            provider.generate(request()).await.unwrap(),
            GenerateResponse::Json(json!({ "n": 1 }))
        );
        assert_eq!(
            provider.generate(request()).await.unwrap(),
            GenerateResponse::Json(json!({ "n": 2 }))
        );
        assert!(matches!(
            provider.generate(request()).await,
            Err(WanderError::Provider(_))
        ));
        assert_eq!(provider.requests().len(), 3);
    }
}
