//! Audio transcription and English translation

use super::{Flow, FlowStage, FlowTrace};
use crate::models::{AudioTranslationOutput, AudioTranslationRequest};
use crate::prompt::{sanitize_field, PromptRenderer, PromptTemplate};
use crate::provider::{GenerateRequest, ModelRole, OutputSpec};
use crate::schema::{Field, Schema};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const TRANSLATE_PROMPT: PromptTemplate = PromptTemplate::new(
    "translateAudioPrompt",
    r#"You are a language expert. You will be given an audio recording. Your task is to:
1. Transcribe the audio into text.
2. Translate the transcribed text into English.

Do not add any explanation. Return only the transcription and translation in the requested JSON format.

Audio input: {{media url=audio}}"#,
);

pub struct TranslateAudioFlow {
    renderer: Arc<PromptRenderer>,
    input_schema: Schema,
    output_schema: Schema,
}

impl TranslateAudioFlow {
    pub const NAME: &'static str = "translateAudio";

    pub fn new(renderer: Arc<PromptRenderer>) -> Self {
        Self {
            renderer,
            input_schema: Schema::object(vec![Field::required(
                "audio",
                Schema::data_uri(),
                "A Base64-encoded audio data URI. Expected format: 'data:audio/webm;base64,...'",
            )]),
            output_schema: Schema::object(vec![
                Field::required("transcription", Schema::text(), "The transcribed text from the audio."),
                Field::required(
                    "translation",
                    Schema::text(),
                    "The English translation of the transcribed text.",
                ),
            ]),
        }
    }
}

#[async_trait]
impl Flow for TranslateAudioFlow {
    type Input = AudioTranslationRequest;
    type Output = AudioTranslationOutput;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    async fn build_request(
        &self,
        input: &AudioTranslationRequest,
        trace: &mut FlowTrace,
    ) -> Result<GenerateRequest> {
        trace.enter(FlowStage::RenderingPrompt);
        let context = json!({ "audio": sanitize_field(&input.audio) });

        Ok(GenerateRequest {
            flow: Self::NAME,
            model: ModelRole::Text,
            prompt: self.renderer.render(&TRANSLATE_PROMPT, &context)?,
            output: OutputSpec::Json(self.output_schema.to_provider_schema()),
        })
    }
}
