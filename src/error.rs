//! Error types for the WanderWise flow service

use crate::schema::{SchemaTarget, ValidationError};
use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for flow operations
pub type Result<T> = std::result::Result<T, WanderError>;

#[derive(Error, Debug)]
pub enum WanderError {

    // =============================
    // Flow Pipeline Errors
    // =============================

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Provider error: {0}")]
    Provider(String),

    /// Only produced inside tools; the geocoder absorbs it into a fallback value.
    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WanderError {
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status for the caller boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            WanderError::Validation(e) if e.target == SchemaTarget::Input => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WanderError::Validation(_) | WanderError::Provider(_) => StatusCode::BAD_GATEWAY,
            WanderError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            WanderError::FlowNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generic message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            WanderError::Validation(e) if e.target == SchemaTarget::Input => e.to_string(),
            WanderError::Validation(_) | WanderError::Provider(_) => {
                "We couldn't generate a result at this time. Please try again later.".to_string()
            }
            WanderError::Network(_) => {
                "Unable to reach an external service. Please check your connection.".to_string()
            }
            WanderError::FlowNotFound(name) => format!("Unknown flow: {}", name),
            _ => "Something went wrong on our side. Please try again.".to_string(),
        }
    }
}
