//! Text-to-speech
//!
//! The speech model answers with headerless PCM. The flow wraps it in a WAV
//! container so browsers can play the returned data URI directly.

use super::{Flow, FlowStage, FlowTrace};
use crate::error::WanderError;
use crate::media::{pcm_to_wav, sample_rate_from_mime, DataUri};
use crate::models::{SpeechOutput, SpeechRequest};
use crate::prompt::{sanitize_field, PromptRenderer, PromptTemplate};
use crate::provider::{GenerateRequest, GenerateResponse, ModelRole, OutputSpec};
use crate::schema::{Field, Schema};
use crate::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const SPEECH_PROMPT: PromptTemplate = PromptTemplate::new("textToSpeechPrompt", "{{{text}}}");

pub struct TextToSpeechFlow {
    renderer: Arc<PromptRenderer>,
    voice: String,
    input_schema: Schema,
    output_schema: Schema,
}

impl TextToSpeechFlow {
    pub const NAME: &'static str = "textToSpeech";

    pub fn new<S: Into<String>>(renderer: Arc<PromptRenderer>, voice: S) -> Self {
        Self {
            renderer,
            voice: voice.into(),
            input_schema: Schema::object(vec![Field::required(
                "text",
                Schema::non_blank_text(),
                "The text to convert to speech.",
            )]),
            output_schema: Schema::object(vec![Field::required(
                "audio",
                Schema::data_uri(),
                "The synthesized speech as a 'data:audio/wav;base64,...' URI.",
            )]),
        }
    }
}

#[async_trait]
impl Flow for TextToSpeechFlow {
    type Input = SpeechRequest;
    type Output = SpeechOutput;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    async fn build_request(&self, input: &SpeechRequest, trace: &mut FlowTrace) -> Result<GenerateRequest> {
        trace.enter(FlowStage::RenderingPrompt);
        let context = json!({ "text": sanitize_field(&input.text) });

        Ok(GenerateRequest {
            flow: Self::NAME,
            model: ModelRole::Speech,
            prompt: self.renderer.render(&SPEECH_PROMPT, &context)?,
            output: OutputSpec::Speech {
                voice: self.voice.clone(),
            },
        })
    }

    fn decode(&self, response: GenerateResponse) -> Result<Value> {
        let (mime_type, data) = match response {
            GenerateResponse::Media { mime_type, data } => (mime_type, data),
            GenerateResponse::Json(_) => {
                return Err(WanderError::provider("expected audio output, received JSON"));
            }
        };

        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| WanderError::provider(format!("invalid audio payload: {}", e)))?;
        if bytes.is_empty() {
            return Err(WanderError::provider("provider returned no audio"));
        }

        let wav = if mime_type.starts_with("audio/wav") || mime_type.starts_with("audio/x-wav") {
            bytes
        } else {
            let sample_rate = sample_rate_from_mime(&mime_type);
            debug!(%mime_type, sample_rate, bytes = bytes.len(), "Wrapping PCM in WAV");
            pcm_to_wav(&bytes, sample_rate, 1)
        };

        Ok(json!({ "audio": DataUri::new("audio/wav", wav).to_uri() }))
    }
}
