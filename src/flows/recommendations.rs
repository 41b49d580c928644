//! Place recommendations, by location name or by coordinates

use super::{Flow, FlowStage, FlowTrace};
use crate::models::{CoordinateRecommendationRequest, RecommendationRequest, RecommendationsOutput};
use crate::prompt::{sanitize_field, PromptRenderer, PromptTemplate};
use crate::provider::{GenerateRequest, ModelRole, OutputSpec};
use crate::schema::{Field, Schema, ValidationError};
use crate::tools::{AddressTool, Tool};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

const RECOMMENDATIONS_PROMPT: PromptTemplate = PromptTemplate::new(
    "generateRecommendationsPrompt",
    r#"You are a travel expert. Given a location and the traveller's interests, recommend restaurants, hotels, attractions, shops and nightlife. For every recommendation, include a publicly accessible, high-quality photo URL.

Location: {{{location}}}
Interests: {{{interests}}}

Provide 3-5 recommendations for each category. Respond with a single valid JSON object and no additional explanation.
"#,
);

fn recommendation_schema() -> Schema {
    Schema::object(vec![
        Field::required("name", Schema::text(), "The name of the place."),
        Field::required("description", Schema::text(), "A short description of the place."),
        Field::required("address", Schema::text(), "The address of the place."),
        Field::required("photoUrl", Schema::url(), "A URL for a photo of the place."),
    ])
}

/// Output shape shared by both recommendation flows
pub fn recommendations_output_schema() -> Schema {
    let category =
        |name, description| Field::optional(name, Schema::array_of(recommendation_schema()), description);
    Schema::object(vec![
        category("restaurants", "Recommended restaurants."),
        category("hotels", "Recommended hotels."),
        category("attractions", "Recommended local attractions."),
        category("shops", "Recommended local shops."),
        category("nightlife", "Recommended nightlife spots."),
    ])
}

fn recommendations_request(
    flow: &'static str,
    renderer: &PromptRenderer,
    output_schema: &Schema,
    location: &str,
    interests: &str,
    trace: &mut FlowTrace,
) -> Result<GenerateRequest> {
    trace.enter(FlowStage::RenderingPrompt);
    let context = json!({
        "location": sanitize_field(location),
        "interests": sanitize_field(interests),
    });

    Ok(GenerateRequest {
        flow,
        model: ModelRole::Text,
        prompt: renderer.render(&RECOMMENDATIONS_PROMPT, &context)?,
        output: OutputSpec::Json(output_schema.to_provider_schema()),
    })
}

pub struct RecommendationsFlow {
    renderer: Arc<PromptRenderer>,
    input_schema: Schema,
    output_schema: Schema,
}

impl RecommendationsFlow {
    pub const NAME: &'static str = "generateRecommendations";

    pub fn new(renderer: Arc<PromptRenderer>) -> Self {
        Self {
            renderer,
            input_schema: Schema::object(vec![
                Field::required(
                    "location",
                    Schema::non_blank_text(),
                    "The location for which to generate recommendations.",
                ),
                Field::required(
                    "interests",
                    Schema::non_blank_text(),
                    "The user interests (e.g., food, art, beaches).",
                ),
            ]),
            output_schema: recommendations_output_schema(),
        }
    }
}

#[async_trait]
impl Flow for RecommendationsFlow {
    type Input = RecommendationRequest;
    type Output = RecommendationsOutput;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    async fn build_request(&self, input: &RecommendationRequest, trace: &mut FlowTrace) -> Result<GenerateRequest> {
        recommendations_request(
            Self::NAME,
            &self.renderer,
            &self.output_schema,
            &input.location,
            &input.interests,
            trace,
        )
    }

    fn verify(
        &self,
        _input: &RecommendationRequest,
        output: &RecommendationsOutput,
    ) -> std::result::Result<(), ValidationError> {
        output.warn_on_unusual_counts();
        Ok(())
    }
}

/// Resolves coordinates to a place name first, then recommends as above
pub struct CoordinateRecommendationsFlow {
    renderer: Arc<PromptRenderer>,
    geocoder: Arc<AddressTool>,
    input_schema: Schema,
    output_schema: Schema,
}

impl CoordinateRecommendationsFlow {
    pub const NAME: &'static str = "generateRecommendationsFromCoordinates";

    pub fn new(renderer: Arc<PromptRenderer>, geocoder: Arc<AddressTool>) -> Self {
        Self {
            renderer,
            geocoder,
            input_schema: Schema::object(vec![
                Field::required(
                    "latitude",
                    Schema::number_in(-90.0, 90.0),
                    "The latitude of the location.",
                ),
                Field::required(
                    "longitude",
                    Schema::number_in(-180.0, 180.0),
                    "The longitude of the location.",
                ),
                Field::required(
                    "interests",
                    Schema::non_blank_text(),
                    "The user interests (e.g., food, art, beaches).",
                ),
            ]),
            output_schema: recommendations_output_schema(),
        }
    }
}

#[async_trait]
impl Flow for CoordinateRecommendationsFlow {
    type Input = CoordinateRecommendationRequest;
    type Output = RecommendationsOutput;

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
        input: &CoordinateRecommendationRequest,
        trace: &mut FlowTrace,
    ) -> Result<GenerateRequest> {
        trace.enter(FlowStage::ResolvingTool);
        let location = self.geocoder.call(input.coordinates()).await;
        debug!(tool = self.geocoder.name(), %location, "Tool resolved location");

        recommendations_request(
            Self::NAME,
            &self.renderer,
            &self.output_schema,
            &location,
            &input.interests,
            trace,
        )
    }

    fn verify(
        &self,
        _input: &CoordinateRecommendationRequest,
        output: &RecommendationsOutput,
    ) -> std::result::Result<(), ValidationError> {
        output.warn_on_unusual_counts();
        Ok(())
    }
}
