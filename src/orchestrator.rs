//! Flow facade
//!
//! Owns the provider, the geocoder and one instance of every flow. Typed
//! entry points serve library callers; the registry serves callers that only
//! know a flow by name (HTTP, the dev runner).

use crate::config::AppConfig;
use crate::flows::{
    execute, CoordinateRecommendationsFlow, Flow, FlowRegistry, FlowRun, ItineraryFlow,
    RecommendationsFlow, SummarizeRecommendationsFlow, TextToSpeechFlow, TranslateAudioFlow,
};
use crate::models::{
    parse_coordinates, AudioTranslationOutput, AudioTranslationRequest, CoordinateRecommendationRequest,
    ItineraryOutput, ItineraryRequest, RecommendationRequest, RecommendationsOutput, SpeechOutput,
    SpeechRequest, SummaryOutput, SummaryRequest,
};
use crate::prompt::PromptRenderer;
use crate::provider::{GeminiClient, Provider};
use crate::tools::{AddressTool, ReverseGeocoder};
use crate::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Flows {
    provider: Arc<dyn Provider>,
    recommendations: Arc<RecommendationsFlow>,
    coordinates: Arc<CoordinateRecommendationsFlow>,
    itinerary: Arc<ItineraryFlow>,
    translate: Arc<TranslateAudioFlow>,
    speech: Arc<TextToSpeechFlow>,
    summary: Arc<SummarizeRecommendationsFlow>,
    registry: FlowRegistry,
}

impl Flows {
    pub fn new<S: Into<String>>(provider: Arc<dyn Provider>, geocoder: Arc<AddressTool>, voice: S) -> Self {
        let renderer = Arc::new(PromptRenderer::new());

        let recommendations = Arc::new(RecommendationsFlow::new(renderer.clone()));
        let coordinates = Arc::new(CoordinateRecommendationsFlow::new(renderer.clone(), geocoder));
        let itinerary = Arc::new(ItineraryFlow::new(renderer.clone()));
        let translate = Arc::new(TranslateAudioFlow::new(renderer.clone()));
        let speech = Arc::new(TextToSpeechFlow::new(renderer.clone(), voice));
        let summary = Arc::new(SummarizeRecommendationsFlow::new(renderer));

        let mut registry = FlowRegistry::new();
        registry.register(recommendations.clone());
        registry.register(coordinates.clone());
        registry.register(itinerary.clone());
        registry.register(translate.clone());
        registry.register(speech.clone());
        registry.register(summary.clone());

        Self {
            provider,
            recommendations,
            coordinates,
            itinerary,
            translate,
            speech,
            summary,
            registry,
        }
    }

    /// Gemini provider and Google geocoder, configured from the environment
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = Arc::new(GeminiClient::new(config.gemini.clone())?);
        let geocoder = Arc::new(ReverseGeocoder::new(config.geocoding.clone())?);
        info!(
            text_model = %config.gemini.text_model,
            speech_model = %config.gemini.speech_model,
            "Flows configured"
        );
        Ok(Self::new(provider, geocoder, config.gemini.voice.clone()))
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Run any registered flow by name
    pub async fn run(&self, name: &str, input: Value) -> Result<FlowRun<Value>> {
        self.registry.invoke(self.provider.as_ref(), name, input).await
    }

    /// Run the recommendations flow for a free-text location. A location that
    /// reads as `"lat, lon"` goes through the coordinate flow instead.
    pub async fn run_recommendations(&self, input: Value) -> Result<FlowRun<Value>> {
        let coordinates = input
            .get("location")
            .and_then(Value::as_str)
            .and_then(parse_coordinates);

        match coordinates {
            Some(coords) => {
                debug!(%coords, "Location looks like coordinates");
                let routed = json!({
                    "latitude": coords.latitude,
                    "longitude": coords.longitude,
                    "interests": input.get("interests").cloned().unwrap_or(Value::Null),
                });
                self.run(CoordinateRecommendationsFlow::NAME, routed).await
            }
            None => self.run(RecommendationsFlow::NAME, input).await,
        }
    }

    async fn typed<F, I>(&self, flow: &F, input: I) -> Result<F::Output>
    where
        F: Flow,
        I: Serialize,
    {
        let input = serde_json::to_value(input)?;
        Ok(execute(flow, self.provider.as_ref(), input).await?.output)
    }

    pub async fn generate_recommendations(&self, request: RecommendationRequest) -> Result<RecommendationsOutput> {
        self.typed(self.recommendations.as_ref(), request).await
    }

    pub async fn generate_recommendations_from_coordinates(
        &self,
        request: CoordinateRecommendationRequest,
    ) -> Result<RecommendationsOutput> {
        self.typed(self.coordinates.as_ref(), request).await
    }

    pub async fn generate_itinerary(&self, request: ItineraryRequest) -> Result<ItineraryOutput> {
        self.typed(self.itinerary.as_ref(), request).await
    }

    pub async fn translate_audio(&self, request: AudioTranslationRequest) -> Result<AudioTranslationOutput> {
        self.typed(self.translate.as_ref(), request).await
    }

    pub async fn text_to_speech(&self, request: SpeechRequest) -> Result<SpeechOutput> {
        self.typed(self.speech.as_ref(), request).await
    }

    pub async fn summarize_recommendations(&self, request: SummaryRequest) -> Result<SummaryOutput> {
        self.typed(self.summary.as_ref(), request).await
    }
}
