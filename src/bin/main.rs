//! Local development runner
//!
//! `wanderwise-dev list` prints the registered flows with their input schemas.
//! `wanderwise-dev run <flow> '<json>'` invokes one flow and prints the run.
//! Without GEMINI_API_KEY the provider is scripted with sample output.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wanderwise::{
    config::AppConfig,
    flows::{
        CoordinateRecommendationsFlow, ItineraryFlow, RecommendationsFlow,
        SummarizeRecommendationsFlow, TextToSpeechFlow, TranslateAudioFlow,
    },
    orchestrator::Flows,
    provider::{GenerateResponse, ScriptedProvider},
    tools::ReverseGeocoder,
};

const USAGE: &str = "usage: wanderwise-dev list | run <flow> '<json input>'";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let config = AppConfig::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("list") => {
            let flows = build_flows(&config, None)?;
            for descriptor in flows.registry().describe() {
                println!("{}", descriptor.name);
                println!("  input: {}", descriptor.input_schema);
            }
        }
        Some("run") => {
            let (Some(name), Some(raw)) = (args.get(1), args.get(2)) else {
                eprintln!("{}", USAGE);
                std::process::exit(2);
            };
            let input: Value = serde_json::from_str(raw)?;

            let flows = build_flows(&config, Some((name.as_str(), &input)))?;
            info!("Running flow '{}'", name);
            match flows.run(name, input).await {
                Ok(run) => println!("{}", serde_json::to_string_pretty(&run)?),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn build_flows(config: &AppConfig, sample_for: Option<(&str, &Value)>) -> wanderwise::Result<Flows> {
    if config.gemini.api_key.is_some() {
        return Flows::from_config(config);
    }

    warn!("GEMINI_API_KEY not set; using scripted sample output");
    let provider = Arc::new(ScriptedProvider::new());
    if let Some((name, input)) = sample_for {
        provider.push(Ok(sample_response(name, input)));
    }
    let geocoder = Arc::new(ReverseGeocoder::new(config.geocoding.clone())?);

    Ok(Flows::new(provider, geocoder, config.gemini.voice.clone()))
}

fn sample_place(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": format!("A local favourite: {}.", name),
        "address": address,
        "photoUrl": "https://images.unsplash.com/photo-1502602898657-3e91760cbb34",
    })
}

/// Plausible provider output for `flow`, shaped to pass its output checks
fn sample_response(flow: &str, input: &Value) -> GenerateResponse {
    match flow {
        RecommendationsFlow::NAME | CoordinateRecommendationsFlow::NAME => GenerateResponse::Json(json!({
            "restaurants": [
                sample_place("Le Comptoir", "9 Carrefour de l'Odéon, Paris"),
                sample_place("Chez Janou", "2 Rue Roger Verlomme, Paris"),
                sample_place("Bouillon Chartier", "7 Rue du Faubourg Montmartre, Paris"),
            ],
            "attractions": [
                sample_place("Musée d'Orsay", "1 Rue de la Légion d'Honneur, Paris"),
                sample_place("Sainte-Chapelle", "10 Boulevard du Palais, Paris"),
                sample_place("Canal Saint-Martin", "Quai de Valmy, Paris"),
            ],
        })),
        ItineraryFlow::NAME => {
            let activity = |title: &str| json!([{ "title": title, "description": "Sample activity." }]);
            let duration = input.get("duration").and_then(Value::as_u64).unwrap_or(3);
            let days: Vec<Value> = (1..=duration)
                .map(|day| {
                    json!({
                        "day": day,
                        "plan": {
                            "morning": activity("Café breakfast"),
                            "afternoon": activity("Museum visit"),
                            "evening": activity("Riverside dinner"),
                        }
                    })
                })
                .collect();
            GenerateResponse::Json(json!({ "itinerary": days }))
        }
        TranslateAudioFlow::NAME => GenerateResponse::Json(json!({
            "transcription": "Où est la gare ?",
            "translation": "Where is the train station?",
        })),
        TextToSpeechFlow::NAME => GenerateResponse::Media {
            mime_type: "audio/L16;codec=pcm;rate=24000".to_string(),
            // 4 samples of silence
            data: "AAAAAAAAAAA=".to_string(),
        },
        SummarizeRecommendationsFlow::NAME => GenerateResponse::Json(json!({
            "summary": "Paris offers classic bistros and world-class museums within walking distance.",
        })),
        _ => GenerateResponse::Json(json!({})),
    }
}
