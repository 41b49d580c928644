//! Day-by-day itinerary

use super::{Flow, FlowStage, FlowTrace};
use crate::models::{ItineraryOutput, ItineraryRequest};
use crate::prompt::{sanitize_field, PromptRenderer, PromptTemplate};
use crate::provider::{GenerateRequest, ModelRole, OutputSpec};
use crate::schema::{Field, Schema, SchemaTarget, ValidationError, Violation, ViolationKind};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const MIN_DURATION_DAYS: i64 = 1;
pub const MAX_DURATION_DAYS: i64 = 14;

const ITINERARY_PROMPT: PromptTemplate = PromptTemplate::new(
    "generateItineraryPrompt",
    r#"You are an expert travel planner. Create a detailed day-by-day itinerary for a trip based on the traveller's input.

Location: {{{location}}}
Interests: {{{interests}}}
Duration: {{duration}} days

Return exactly {{duration}} days, numbered from 1. For each day, plan distinct activities for the morning, afternoon and evening. Mix popular attractions with hidden gems that match the interests.

Respond with a single JSON object.
"#,
);

fn activity_schema() -> Schema {
    Schema::object(vec![
        Field::required("title", Schema::text(), "The title of the activity."),
        Field::required("description", Schema::text(), "A brief description of the activity."),
    ])
}

fn day_plan_schema() -> Schema {
    Schema::object(vec![
        Field::required("morning", Schema::array_of(activity_schema()), "Activities for the morning."),
        Field::required(
            "afternoon",
            Schema::array_of(activity_schema()),
            "Activities for the afternoon.",
        ),
        Field::required("evening", Schema::array_of(activity_schema()), "Activities for the evening."),
    ])
}

pub struct ItineraryFlow {
    renderer: Arc<PromptRenderer>,
    input_schema: Schema,
    output_schema: Schema,
}

impl ItineraryFlow {
    pub const NAME: &'static str = "generateItinerary";

    pub fn new(renderer: Arc<PromptRenderer>) -> Self {
        Self {
            renderer,
            input_schema: Schema::object(vec![
                Field::required("location", Schema::non_blank_text(), "The destination for the trip."),
                Field::required(
                    "interests",
                    Schema::non_blank_text(),
                    "The user's interests (e.g., history, food, adventure).",
                ),
                Field::required(
                    "duration",
                    Schema::integer_in(MIN_DURATION_DAYS, MAX_DURATION_DAYS),
                    "The duration of the trip in days.",
                ),
            ]),
            output_schema: Schema::object(vec![Field::required(
                "itinerary",
                Schema::array_of(Schema::object(vec![
                    Field::required("day", Schema::integer(), "The day number, starting at 1."),
                    Field::required("plan", day_plan_schema(), "The plan for the day."),
                ])),
                "A day-by-day itinerary.",
            )]),
        }
    }
}

#[async_trait]
impl Flow for ItineraryFlow {
    type Input = ItineraryRequest;
    type Output = ItineraryOutput;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    async fn build_request(&self, input: &ItineraryRequest, trace: &mut FlowTrace) -> Result<GenerateRequest> {
        trace.enter(FlowStage::RenderingPrompt);
        let context = json!({
            "location": sanitize_field(&input.location),
            "interests": sanitize_field(&input.interests),
            "duration": input.duration,
        });

        Ok(GenerateRequest {
            flow: Self::NAME,
            model: ModelRole::Text,
            prompt: self.renderer.render(&ITINERARY_PROMPT, &context)?,
            output: OutputSpec::Json(self.output_schema.to_provider_schema()),
        })
    }

    /// The plan must cover exactly the requested days, numbered 1..=duration in order
    fn verify(&self, input: &ItineraryRequest, output: &ItineraryOutput) -> std::result::Result<(), ValidationError> {
        let mut violations = Vec::new();

        let expected = usize::from(input.duration);
        if output.itinerary.len() != expected {
            violations.push(Violation {
                path: "itinerary".to_string(),
                kind: ViolationKind::Mismatch {
                    expected: format!("{} days", expected),
                    found: format!("{} days", output.itinerary.len()),
                },
            });
        }

        for (i, day) in output.itinerary.iter().enumerate() {
            let number = i as i64 + 1;
            if day.day != number {
                violations.push(Violation {
                    path: format!("itinerary[{}].day", i),
                    kind: ViolationKind::Mismatch {
                        expected: number.to_string(),
                        found: day.day.to_string(),
                    },
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                target: SchemaTarget::Output,
                violations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::execute;
    use crate::provider::ScriptedProvider;
    use crate::WanderError;
    use serde_json::Value;

    fn day(n: i64) -> Value {
        let slot = |title: &str| json!([{ "title": title, "description": "Something to do." }]);
        json!({
            "day": n,
            "plan": {
                "morning": slot("Market"),
                "afternoon": slot("Museum"),
                "evening": slot("Dinner"),
            }
        })
    }

    fn flow() -> ItineraryFlow {
        ItineraryFlow::new(Arc::new(PromptRenderer::new()))
    }

    fn request(duration: Value) -> Value {
        json!({ "location": "Rome", "interests": "history", "duration": duration })
    }

    #[tokio::test]
    async fn test_itinerary_happy_path() {
        let provider = ScriptedProvider::with_json(json!({ "itinerary": [day(1), day(2), day(3)] }));
        let run = execute(&flow(), &provider, request(json!(3))).await.unwrap();

        assert_eq!(run.output.itinerary.len(), 3);
        assert_eq!(run.output.itinerary[2].plan.evening[0].title, "Dinner");

        let prompt = provider.requests()[0].prompt.text_content();
        assert!(prompt.contains("Duration: 3 days"));
        assert!(prompt.contains("Return exactly 3 days"));
    }

    #[tokio::test]
    async fn test_duration_out_of_range_never_calls_provider() {
        for duration in [json!(0), json!(15), json!(-1), json!(2.5)] {
            let provider = ScriptedProvider::with_json(json!({ "itinerary": [] }));
            let err = execute(&flow(), &provider, request(duration.clone()))
                .await
                .unwrap_err();

            match err {
                WanderError::Validation(e) => {
                    assert_eq!(e.target, SchemaTarget::Input);
                    assert!(e.names("duration"), "duration {}", duration);
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(provider.requests().is_empty());
        }
    }

    #[tokio::test]
    async fn test_duration_bounds_accepted() {
        for duration in [1i64, 14] {
            let days: Vec<Value> = (1..=duration).map(day).collect();
            let provider = ScriptedProvider::with_json(json!({ "itinerary": days }));
            let run = execute(&flow(), &provider, request(json!(duration))).await.unwrap();
            assert_eq!(run.output.itinerary.len() as i64, duration);
        }
    }

    #[tokio::test]
    async fn test_whole_float_numbers_accepted() {
        let mut first = day(1);
        first["day"] = json!(1.0);
        let provider = ScriptedProvider::with_json(json!({ "itinerary": [first, day(2), day(3)] }));
        let run = execute(&flow(), &provider, request(json!(3.0))).await.unwrap();

        assert_eq!(run.output.itinerary.len(), 3);
        assert_eq!(run.output.itinerary[0].day, 1);
        assert!(provider.requests()[0].prompt.text_content().contains("Duration: 3 days"));
    }

    #[tokio::test]
    async fn test_wrong_day_count_rejected() {
        let provider = ScriptedProvider::with_json(json!({ "itinerary": [day(1), day(2)] }));
        let err = execute(&flow(), &provider, request(json!(3))).await.unwrap_err();

        match err {
            WanderError::Validation(e) => {
                assert_eq!(e.target, SchemaTarget::Output);
                assert!(e.names("itinerary"));
                assert!(e.to_string().contains("expected 3 days, found 2 days"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_days_rejected() {
        let provider = ScriptedProvider::with_json(json!({ "itinerary": [day(1), day(3), day(2)] }));
        let err = execute(&flow(), &provider, request(json!(3))).await.unwrap_err();

        match err {
            WanderError::Validation(e) => {
                assert!(!e.names("itinerary"));
                assert!(e.names("itinerary[1].day"));
                assert!(e.names("itinerary[2].day"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_plan_slot_rejected() {
        let mut broken = day(1);
        broken["plan"].as_object_mut().unwrap().remove("evening");
        let provider = ScriptedProvider::with_json(json!({ "itinerary": [broken] }));

        let err = execute(&flow(), &provider, request(json!(1))).await.unwrap_err();
        assert!(matches!(err, WanderError::Validation(ref e) if e.names("itinerary[0].plan.evening")));
    }
}
