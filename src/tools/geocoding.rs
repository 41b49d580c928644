//! Reverse geocoding tool
//!
//! Turns coordinates into a readable place name via the Google Geocoding API.
//! Resolution is best effort: every failure falls back to the coordinates
//! formatted as `"{lat}, {lon}"`, so callers always get a usable string.

use crate::config::GeocodingConfig;
use crate::error::WanderError;
use crate::models::Coordinates;
use crate::tools::Tool;
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

pub struct ReverseGeocoder {
    client: Client,
    config: GeocodingConfig,
}

impl ReverseGeocoder {
    pub fn new(config: GeocodingConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn lookup(&self, coords: Coordinates) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| WanderError::Tool("geocoding API key is not configured".to_string()))?;

        let latlng = format!("{},{}", coords.latitude, coords.longitude);
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("latlng", latlng.as_str()), ("key", api_key)])
            .send()
            .await
            .map_err(|e| WanderError::Tool(format!("geocoding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WanderError::Tool(format!("geocoding API returned {}", status)));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| WanderError::Tool(format!("invalid geocoding response: {}", e)))?;

        best_address(body)
    }
}

#[async_trait::async_trait]
impl Tool for ReverseGeocoder {
    type Input = Coordinates;
    type Output = String;

    fn name(&self) -> &'static str {
        "getAddressFromCoordinates"
    }

    fn description(&self) -> &'static str {
        "Converts latitude and longitude coordinates into a human-readable address."
    }

    async fn call(&self, coords: Coordinates) -> String {
        match self.lookup(coords).await {
            Ok(address) => {
                debug!(%address, "Resolved coordinates");
                address
            }
            Err(e) => {
                warn!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    "Reverse geocoding failed, using coordinates: {}",
                    e
                );
                coords.fallback_label()
            }
        }
    }
}

/// Prefer "locality, country"; else the formatted address of the first result
fn best_address(body: GeocodeResponse) -> Result<String> {
    if body.status != "OK" {
        return Err(WanderError::Tool(format!(
            "no address for coordinates (status: {})",
            body.status
        )));
    }

    let first = body
        .results
        .into_iter()
        .next()
        .ok_or_else(|| WanderError::Tool("no address results".to_string()))?;

    let component = |kind: &str| {
        first
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.as_str())
            .filter(|name| !name.is_empty())
    };

    if let (Some(locality), Some(country)) = (component("locality"), component("country")) {
        return Ok(format!("{}, {}", locality, country));
    }

    first
        .formatted_address
        .clone()
        .filter(|address| !address.is_empty())
        .ok_or_else(|| WanderError::Tool("result has no formatted address".to_string()))
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}
