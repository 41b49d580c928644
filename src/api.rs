//! REST API server for the WanderWise flows
//!
//! Exposes every flow over HTTP for the web UI.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::flows::{
    CoordinateRecommendationsFlow, FlowRun, ItineraryFlow, SummarizeRecommendationsFlow,
    TextToSpeechFlow, TranslateAudioFlow,
};
use crate::orchestrator::Flows;

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn respond(result: crate::Result<FlowRun<Value>>) -> ApiResult {
    match result {
        Ok(run) => (StatusCode::OK, Json(ApiResponse::success(run))),
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                error!("Flow request failed: {}", e);
            } else {
                info!("Flow request rejected: {}", e);
            }
            (status, Json(ApiResponse::error(e.user_message())))
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub flows: Arc<Flows>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Flow Endpoints
/// =============================

async fn list_flows(State(state): State<ApiState>) -> ApiResult {
    (
        StatusCode::OK,
        Json(ApiResponse::success(state.flows.registry().describe())),
    )
}

async fn run_flow(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> ApiResult {
    info!("Received request for flow '{}'", name);
    respond(state.flows.run(&name, input).await)
}

async fn recommendations(State(state): State<ApiState>, Json(input): Json<Value>) -> ApiResult {
    respond(state.flows.run_recommendations(input).await)
}

async fn recommendations_from_coordinates(
    State(state): State<ApiState>,
    Json(input): Json<Value>,
) -> ApiResult {
    respond(state.flows.run(CoordinateRecommendationsFlow::NAME, input).await)
}

async fn itinerary(State(state): State<ApiState>, Json(input): Json<Value>) -> ApiResult {
    respond(state.flows.run(ItineraryFlow::NAME, input).await)
}

async fn translate(State(state): State<ApiState>, Json(input): Json<Value>) -> ApiResult {
    respond(state.flows.run(TranslateAudioFlow::NAME, input).await)
}

async fn speech(State(state): State<ApiState>, Json(input): Json<Value>) -> ApiResult {
    respond(state.flows.run(TextToSpeechFlow::NAME, input).await)
}

async fn summary(State(state): State<ApiState>, Json(input): Json<Value>) -> ApiResult {
    respond(state.flows.run(SummarizeRecommendationsFlow::NAME, input).await)
}

/// =============================
/// Router
/// =============================

pub fn create_router(flows: Arc<Flows>) -> Router {
    let state = ApiState { flows };

    Router::new()
        .route("/health", get(health))
        .route("/api/flows", get(list_flows))
        .route("/api/flows/:name", post(run_flow))
        .route("/api/recommendations", post(recommendations))
        .route(
            "/api/recommendations/coordinates",
            post(recommendations_from_coordinates),
        )
        .route("/api/itinerary", post(itinerary))
        .route("/api/translate", post(translate))
        .route("/api/speech", post(speech))
        .route("/api/summary", post(summary))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(flows: Arc<Flows>, port: u16) -> crate::Result<()> {
    let router = create_router(flows);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use crate::provider::ScriptedProvider;
    use crate::tools::Tool;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    struct NoGeocoder;

    #[async_trait::async_trait]
    impl Tool for NoGeocoder {
        type Input = Coordinates;
        type Output = String;

        fn name(&self) -> &'static str {
            "noGeocoder"
        }

        fn description(&self) -> &'static str {
            "Always uses the coordinates."
        }

        async fn call(&self, coords: Coordinates) -> String {
            coords.fallback_label()
        }
    }

    fn router(provider: Arc<ScriptedProvider>) -> Router {
        create_router(Arc::new(Flows::new(provider, Arc::new(NoGeocoder), "Algenib")))
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, ApiResponse) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(Arc::new(ScriptedProvider::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_itinerary_endpoint() {
        let provider = Arc::new(ScriptedProvider::with_json(json!({
            "itinerary": [{
                "day": 1,
                "plan": { "morning": [], "afternoon": [], "evening": [] }
            }]
        })));

        let (status, body) = post_json(
            router(provider),
            "/api/itinerary",
            json!({ "location": "Porto", "interests": "wine", "duration": 1 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        let data = body.data.unwrap();
        assert_eq!(data["flow"], "generateItinerary");
        assert_eq!(data["output"]["itinerary"][0]["day"], 1);
        assert_eq!(data["trace"].as_array().unwrap().last().unwrap(), "done");
    }

    #[tokio::test]
    async fn test_invalid_input_is_unprocessable() {
        let provider = Arc::new(ScriptedProvider::new());
        let (status, body) = post_json(
            router(provider.clone()),
            "/api/itinerary",
            json!({ "location": "Porto", "interests": "wine", "duration": 15 }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!body.success);
        assert!(body.error.unwrap().contains("duration"));
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_bad_provider_output_is_bad_gateway() {
        let provider = Arc::new(ScriptedProvider::with_json(json!({ "transcription": 1 })));
        let (status, body) = post_json(
            router(provider),
            "/api/translate",
            json!({ "audio": "data:audio/webm;base64,aGVsbG8=" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.error.unwrap().contains("try again"));
    }

    #[tokio::test]
    async fn test_recommendations_route_coordinates() {
        let provider = Arc::new(ScriptedProvider::with_json(json!({})));
        let (status, body) = post_json(
            router(provider.clone()),
            "/api/recommendations",
            json!({ "location": "-33.8688, 151.2093", "interests": "beaches" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.data.unwrap()["flow"],
            "generateRecommendationsFromCoordinates"
        );
        assert!(provider.requests()[0]
            .prompt
            .text_content()
            .contains("Location: -33.8688, 151.2093"));
    }

    #[tokio::test]
    async fn test_generic_flow_endpoint() {
        let provider = Arc::new(ScriptedProvider::with_json(json!({ "summary": "Great food." })));
        let (status, body) = post_json(
            router(provider),
            "/api/flows/summarizeRecommendations",
            json!({
                "location": "Lima",
                "interests": "food",
                "restaurantRecommendations": ["Central"],
                "hotelRecommendations": [],
                "attractionRecommendations": [],
                "shopRecommendations": []
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["output"]["summary"], "Great food.");
    }

    #[tokio::test]
    async fn test_unknown_flow_is_not_found() {
        let (status, body) = post_json(
            router(Arc::new(ScriptedProvider::new())),
            "/api/flows/bookFlights",
            json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.as_deref(), Some("Unknown flow: bookFlights"));
    }

    #[tokio::test]
    async fn test_list_flows() {
        let response = router(Arc::new(ScriptedProvider::new()))
            .oneshot(Request::builder().uri("/api/flows").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ApiResponse = serde_json::from_slice(&bytes).unwrap();
        let flows = body.data.unwrap();
        assert_eq!(flows.as_array().unwrap().len(), 6);
        assert_eq!(flows[0]["name"], "generateItinerary");
    }
}
