//! Gemini API client
//!
//! Calls `generateContent` with a declared response schema (JSON output) or
//! with the audio response modality (speech output).
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::GeminiConfig;
use crate::error::WanderError;
use crate::media::DataUri;
use crate::prompt::{PromptPart, RenderedPrompt};
use crate::provider::{GenerateRequest, GenerateResponse, ModelRole, OutputSpec, Provider};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Text => &self.config.text_model,
            ModelRole::Speech => &self.config.speech_model,
        }
    }

    fn build_body(request: &GenerateRequest) -> GeminiRequest {
        let generation_config = match &request.output {
            OutputSpec::Json(schema) => GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.clone()),
                response_modalities: None,
                speech_config: None,
            },
            OutputSpec::Speech { voice } => GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.clone(),
                        },
                    },
                }),
            },
        };

        GeminiRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: to_parts(&request.prompt),
            }],
            generation_config,
        }
    }
}

#[async_trait]
impl Provider for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| WanderError::config("GEMINI_API_KEY not configured"))?;

        let model = self.model_for(request.model);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );
        let body = Self::build_body(&request);

        info!(flow = request.flow, model = %model, "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                WanderError::Network(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(WanderError::provider(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            WanderError::provider(format!("Gemini parse error: {}", e))
        })?;

        if let Some(usage) = &gemini_response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        match request.output {
            OutputSpec::Json(_) => extract_json(gemini_response).map(GenerateResponse::Json),
            OutputSpec::Speech { .. } => extract_media(gemini_response),
        }
    }
}

fn to_parts(prompt: &RenderedPrompt) -> Vec<Part> {
    prompt
        .parts
        .iter()
        .map(|part| match part {
            PromptPart::Text { text } => Part::text(text.clone()),
            PromptPart::Media { url } => match DataUri::parse(url) {
                Ok(uri) => Part {
                    inline_data: Some(Blob {
                        mime_type: uri.mime_type.clone(),
                        data: uri.base64_payload(),
                    }),
                    ..Part::default()
                },
                Err(_) => Part {
                    file_data: Some(FileData {
                        file_uri: url.clone(),
                    }),
                    ..Part::default()
                },
            },
        })
        .collect()
}

fn first_candidate(response: GeminiResponse) -> Result<Candidate> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(WanderError::provider(format!("Prompt blocked: {}", reason)));
    }

    response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| WanderError::provider("No response from Gemini API"))
}

fn extract_json(response: GeminiResponse) -> Result<Value> {
    let candidate = first_candidate(response)?;
    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(WanderError::provider(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    parse_json_text(&text)
}

fn extract_media(response: GeminiResponse) -> Result<GenerateResponse> {
    let candidate = first_candidate(response)?;
    candidate
        .content
        .parts
        .into_iter()
        .find_map(|part| part.inline_data)
        .map(|blob| GenerateResponse::Media {
            mime_type: blob.mime_type,
            data: blob.data,
        })
        .ok_or_else(|| WanderError::provider("No media returned by Gemini"))
}

/// Parse model text as JSON, tolerating a markdown code fence
fn parse_json_text(response: &str) -> Result<Value> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).map_err(|e| {
        WanderError::provider(format!(
            "Failed to parse Gemini JSON response: {} | raw={}",
            e, response
        ))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i32,
    #[serde(default)]
    candidates_token_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String, api_key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.map(str::to_string),
            base_url,
            text_model: "gemini-test".to_string(),
            speech_model: "gemini-test-tts".to_string(),
            voice: "Algenib".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn json_request(prompt: RenderedPrompt) -> GenerateRequest {
        GenerateRequest {
            flow: "test",
            model: ModelRole::Text,
            prompt,
            output: OutputSpec::Json(json!({ "type": "OBJECT" })),
        }
    }

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 30 }
        }))
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            flow: "test",
            model: ModelRole::Text,
            prompt: RenderedPrompt {
                parts: vec![
                    PromptPart::Text {
                        text: "Transcribe:".to_string(),
                    },
                    PromptPart::Media {
                        url: "data:audio/webm;base64,aGVsbG8=".to_string(),
                    },
                    PromptPart::Media {
                        url: "https://example.com/clip.mp3".to_string(),
                    },
                ],
            },
            output: OutputSpec::Json(json!({ "type": "OBJECT" })),
        };

        let body = serde_json::to_value(GeminiClient::build_body(&request)).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "Transcribe:");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "audio/webm");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[2]["fileData"]["fileUri"], "https://example.com/clip.mp3");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["generationConfig"].get("speechConfig").is_none());
    }

    #[test]
    fn test_parse_fenced_json() {
        let value = parse_json_text("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value, json!({ "a": 1 }));
        assert!(parse_json_text("Sure! Here you go").is_err());
    }

    #[tokio::test]
    async fn test_generate_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseSchema": { "type": "OBJECT" } }
            })))
            .respond_with(text_reply("{\"summary\": \"Sunny beaches.\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(server.uri(), Some("test-key"))).unwrap();
        let response = client
            .generate(json_request(RenderedPrompt::text("Summarize")))
            .await
            .unwrap();

        assert_eq!(
            response,
            GenerateResponse::Json(json!({ "summary": "Sunny beaches." }))
        );
    }

    #[tokio::test]
    async fn test_generate_speech() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test-tts:generateContent"))
            .and(body_partial_json(json!({
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": { "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Algenib" } } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{
                        "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAAA" }
                    }] }
                }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(server.uri(), Some("test-key"))).unwrap();
        let response = client
            .generate(GenerateRequest {
                flow: "test",
                model: ModelRole::Speech,
                prompt: RenderedPrompt::text("Hello"),
                output: OutputSpec::Speech {
                    voice: "Algenib".to_string(),
                },
            })
            .await
            .unwrap();

        assert_eq!(
            response,
            GenerateResponse::Media {
                mime_type: "audio/L16;codec=pcm;rate=24000".to_string(),
                data: "AAAA".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_error_status_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(server.uri(), Some("test-key"))).unwrap();
        let err = client
            .generate(json_request(RenderedPrompt::text("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, WanderError::Provider(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_no_candidates_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(server.uri(), Some("test-key"))).unwrap();
        let err = client
            .generate(json_request(RenderedPrompt::text("x")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(server.uri(), None)).unwrap();
        let err = client
            .generate(json_request(RenderedPrompt::text("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, WanderError::Config(_)));
    }
}
