//! Request and response records for the travel flows
//!
//! Every record lives for one request. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

//
// ================= Recommendations =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub location: String,
    pub interests: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Label used when an address cannot be resolved
    pub fn fallback_label(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fallback_label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateRecommendationRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub interests: String,
}

impl CoordinateRecommendationRequest {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub name: String,
    pub description: String,
    pub address: String,
    pub photo_url: String,
}

/// Categories the provider returned nothing for stay `None`;
/// an explicitly empty category stays `Some(vec![])`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationsOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurants: Option<Vec<Recommendation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotels: Option<Vec<Recommendation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attractions: Option<Vec<Recommendation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shops: Option<Vec<Recommendation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nightlife: Option<Vec<Recommendation>>,
}

pub const RECOMMENDATIONS_PER_CATEGORY: std::ops::RangeInclusive<usize> = 3..=5;

impl RecommendationsOutput {
    pub fn categories(&self) -> [(&'static str, Option<&Vec<Recommendation>>); 5] {
        [
            ("restaurants", self.restaurants.as_ref()),
            ("hotels", self.hotels.as_ref()),
            ("attractions", self.attractions.as_ref()),
            ("shops", self.shops.as_ref()),
            ("nightlife", self.nightlife.as_ref()),
        ]
    }

    /// True when no category holds any recommendation
    pub fn is_empty(&self) -> bool {
        self.categories()
            .iter()
            .all(|(_, items)| items.map_or(true, |items| items.is_empty()))
    }

    /// Log categories whose size falls outside the requested range
    pub fn warn_on_unusual_counts(&self) {
        for (name, items) in self.categories() {
            if let Some(items) = items {
                if !RECOMMENDATIONS_PER_CATEGORY.contains(&items.len()) {
                    warn!(
                        category = name,
                        count = items.len(),
                        "Provider returned an unusual number of recommendations"
                    );
                }
            }
        }
    }

    fn names(items: Option<&Vec<Recommendation>>) -> Vec<String> {
        items
            .map(|items| items.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default()
    }
}

/// Parse a `"lat, lon"` location string such as `"48.8566, 2.3522"`.
/// Each part is a plain decimal (`-?D.D`) with 1 to 6 fractional digits,
/// up to 2 integer digits for latitude and 3 for longitude, and in range.
pub fn parse_coordinates(location: &str) -> Option<Coordinates> {
    let compact: String = location.chars().filter(|c| !c.is_whitespace()).collect();
    let (lat, lon) = compact.split_once(',')?;

    let latitude = plain_decimal(lat, 2)?;
    let longitude = plain_decimal(lon, 3)?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    Some(Coordinates {
        latitude,
        longitude,
    })
}

fn plain_decimal(part: &str, max_int_digits: usize) -> Option<f64> {
    let unsigned = part.strip_prefix('-').unwrap_or(part);
    let (int, frac) = unsigned.split_once('.')?;

    let digits = |s: &str, max: usize| (1..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(int, max_int_digits) || !digits(frac, 6) {
        return None;
    }

    part.parse().ok()
}

//
// ================= Itinerary =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryRequest {
    pub location: String,
    pub interests: String,
    pub duration: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayPlan {
    pub morning: Vec<Activity>,
    pub afternoon: Vec<Activity>,
    pub evening: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItineraryDay {
    pub day: i64,
    pub plan: DayPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItineraryOutput {
    pub itinerary: Vec<ItineraryDay>,
}

//
// ================= Speech =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioTranslationRequest {
    /// `data:<mime>;base64,<payload>`
    pub audio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioTranslationOutput {
    pub transcription: String,
    pub translation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechOutput {
    /// `data:audio/wav;base64,<payload>`
    pub audio: String,
}

//
// ================= Summary =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub location: String,
    pub interests: String,
    pub restaurant_recommendations: Vec<String>,
    pub hotel_recommendations: Vec<String>,
    pub attraction_recommendations: Vec<String>,
    pub shop_recommendations: Vec<String>,
}

impl SummaryRequest {
    /// Summarize a recommendations result by place name
    pub fn from_output(location: &str, interests: &str, output: &RecommendationsOutput) -> Self {
        Self {
            location: location.to_string(),
            interests: interests.to_string(),
            restaurant_recommendations: RecommendationsOutput::names(output.restaurants.as_ref()),
            hotel_recommendations: RecommendationsOutput::names(output.hotels.as_ref()),
            attraction_recommendations: RecommendationsOutput::names(output.attractions.as_ref()),
            shop_recommendations: RecommendationsOutput::names(output.shops.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryOutput {
    pub summary: String,
}
