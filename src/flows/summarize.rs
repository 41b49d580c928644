//! Two-sentence summary of a recommendations result

use super::{Flow, FlowStage, FlowTrace};
use crate::models::{SummaryOutput, SummaryRequest};
use crate::prompt::{sanitize_field, PromptRenderer, PromptTemplate};
use crate::provider::{GenerateRequest, ModelRole, OutputSpec};
use crate::schema::{Field, Schema};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const SUMMARY_PROMPT: PromptTemplate = PromptTemplate::new(
    "summarizeRecommendationsPrompt",
    r#"You are a travel expert summarizing recommendations for a traveller.

Location: {{{location}}}
Interests: {{{interests}}}
Restaurant recommendations:
{{#each restaurantRecommendations}}- {{{this}}}
{{/each}}Hotel recommendations:
{{#each hotelRecommendations}}- {{{this}}}
{{/each}}Attraction recommendations:
{{#each attractionRecommendations}}- {{{this}}}
{{/each}}Shop recommendations:
{{#each shopRecommendations}}- {{{this}}}
{{/each}}
Based on the location, interests and recommendations above, write a concise summary of what is available to the traveller. Use no more than two sentences.
"#,
);

fn name_list(description: &'static str, name: &'static str) -> Field {
    Field::required(name, Schema::array_of(Schema::text()), description)
}

pub struct SummarizeRecommendationsFlow {
    renderer: Arc<PromptRenderer>,
    input_schema: Schema,
    output_schema: Schema,
}

impl SummarizeRecommendationsFlow {
    pub const NAME: &'static str = "summarizeRecommendations";

    pub fn new(renderer: Arc<PromptRenderer>) -> Self {
        Self {
            renderer,
            input_schema: Schema::object(vec![
                Field::required(
                    "location",
                    Schema::non_blank_text(),
                    "The location for which recommendations were generated.",
                ),
                Field::required(
                    "interests",
                    Schema::non_blank_text(),
                    "The interests of the user, such as food, art, or beaches.",
                ),
                name_list("A list of restaurant recommendations.", "restaurantRecommendations"),
                name_list("A list of hotel recommendations.", "hotelRecommendations"),
                name_list("A list of attraction recommendations.", "attractionRecommendations"),
                name_list("A list of shop recommendations.", "shopRecommendations"),
            ]),
            output_schema: Schema::object(vec![Field::required(
                "summary",
                Schema::non_blank_text(),
                "A brief summary of the recommendations.",
            )]),
        }
    }
}

#[async_trait]
impl Flow for SummarizeRecommendationsFlow {
    type Input = SummaryRequest;
    type Output = SummaryOutput;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    async fn build_request(&self, input: &SummaryRequest, trace: &mut FlowTrace) -> Result<GenerateRequest> {
        trace.enter(FlowStage::RenderingPrompt);
        let clean = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|item| sanitize_field(item))
                .filter(|item| !item.is_empty())
                .collect()
        };
        let context = json!({
            "location": sanitize_field(&input.location),
            "interests": sanitize_field(&input.interests),
            "restaurantRecommendations": clean(&input.restaurant_recommendations),
            "hotelRecommendations": clean(&input.hotel_recommendations),
            "attractionRecommendations": clean(&input.attraction_recommendations),
            "shopRecommendations": clean(&input.shop_recommendations),
        });

        Ok(GenerateRequest {
            flow: Self::NAME,
            model: ModelRole::Text,
            prompt: self.renderer.render(&SUMMARY_PROMPT, &context)?,
            output: OutputSpec::Json(self.output_schema.to_provider_schema()),
        })
    }
}
