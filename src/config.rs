//! Environment configuration
//!
//! Values come from the process environment (optionally seeded from `.env`
//! by the binaries). Missing credentials are not startup failures: Gemini
//! calls fail with a configuration error and geocoding falls back to the raw
//! coordinates.

use crate::Result;
use std::env;
use std::time::Duration;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_VOICE: &str = "Algenib";
const DEFAULT_GEOCODING_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub speech_model: String,
    pub voice: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub geocoding: GeocodingConfig,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                crate::error::WanderError::config(format!("HTTP_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let timeout = Duration::from_secs(timeout_secs);

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                crate::error::WanderError::config(format!("PORT '{}': {}", raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        let gemini_key = get("GEMINI_API_KEY");

        Ok(Self {
            gemini: GeminiConfig {
                api_key: gemini_key.clone(),
                base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                text_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
                speech_model: get("GEMINI_TTS_MODEL")
                    .unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
                voice: get("GEMINI_TTS_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string()),
                timeout,
            },
            geocoding: GeocodingConfig {
                // The maps key defaults to the Gemini key when both live in one project
                api_key: get("GOOGLE_MAPS_API_KEY").or(gemini_key),
                base_url: get("GEOCODING_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEOCODING_BASE_URL.to_string()),
                timeout,
            },
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert!(config.gemini.api_key.is_none());
        assert!(config.geocoding.api_key.is_none());
        assert_eq!(config.gemini.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.gemini.voice, "Algenib");
        assert_eq!(config.port, 8080);
        assert_eq!(config.geocoding.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_maps_key_falls_back_to_gemini_key() {
        let config = config_from(&[("GEMINI_API_KEY", "g-key")]).unwrap();
        assert_eq!(config.geocoding.api_key.as_deref(), Some("g-key"));

        let config = config_from(&[("GEMINI_API_KEY", "g-key"), ("GOOGLE_MAPS_API_KEY", "m-key")]).unwrap();
        assert_eq!(config.geocoding.api_key.as_deref(), Some("m-key"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let config = config_from(&[("GEMINI_API_KEY", "  ")]).unwrap();
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_port_parsing() {
        assert_eq!(config_from(&[("API_PORT", "9000")]).unwrap().port, 9000);
        assert_eq!(config_from(&[("PORT", "7000"), ("API_PORT", "9000")]).unwrap().port, 7000);
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
    }
}
