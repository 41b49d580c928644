//! WanderWise flow service
//!
//! Backend for a travel-planning app. Each capability is a "flow":
//! - Recommendations by place name or by coordinates
//! - Day-by-day itineraries
//! - Audio transcription with English translation
//! - Text-to-speech
//! - Short summaries of recommendation results
//!
//! FLOW PIPELINE:
//! VALIDATE INPUT → [RESOLVE TOOL] → RENDER PROMPT → AWAIT PROVIDER → VALIDATE OUTPUT → DONE

pub mod api;
pub mod config;
pub mod error;
pub mod flows;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod tools;

pub use error::{Result, WanderError};

// Re-export common types
pub use models::*;
pub use orchestrator::Flows;
