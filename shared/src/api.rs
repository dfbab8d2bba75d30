//! Request and response bodies of the SmartRoute service and of the public
//! routing providers used as fallbacks.

use serde::{Deserialize, Serialize};

use crate::{Coordinate, GridCell, GridData, QualityLabel, lat_lng_pairs};

/// Body of `POST /route` and `POST /route/rl`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
}

impl RouteRequest {
    pub fn new(start: Coordinate, end: Coordinate) -> Self {
        Self {
            start_lat: start.lat,
            start_lng: start.lon,
            end_lat: end.lat,
            end_lng: end.lon,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, with = "lat_lng_pairs")]
    pub route_coordinates: Vec<Coordinate>,
    /// Kilometres.
    #[serde(default)]
    pub distance: f64,
    /// Minutes.
    #[serde(default)]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_path: Option<Vec<GridCell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_qualities: Option<Vec<QualityLabel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<GridData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<QualityLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlRouteResponse {
    /// Older deployments omit the flag on success.
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, with = "lat_lng_pairs")]
    pub route_coordinates: Vec<Coordinate>,
    /// Fraction of route cells rated Good, 0..=1.
    #[serde(default)]
    pub green_percentage: f64,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(with = "lat_lng_pairs")]
    pub route_coordinates: Vec<Coordinate>,
    pub feedback: FeedbackKind,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RlAgentStats {
    #[serde(default)]
    pub avg_green_percentage: f64,
    #[serde(default)]
    pub avg_reward: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RlFeedbackStats {
    /// Share of positive feedback; null until any feedback exists.
    #[serde(default)]
    pub avg_feedback: Option<f64>,
    #[serde(default)]
    pub positive: u32,
    #[serde(default)]
    pub negative: u32,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub cell: String,
    #[serde(default)]
    pub image_filename: String,
    pub prediction: QualityLabel,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub evidence: Vec<EvidenceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// OpenRouteService `directions/{profile}/geojson` request body.
#[derive(Debug, Clone, Serialize)]
pub struct DirectionsRequest {
    /// `[lng, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
    pub format: &'static str,
    pub instructions: bool,
    pub elevation: bool,
}

impl DirectionsRequest {
    pub fn between(start: Coordinate, end: Coordinate) -> Self {
        Self {
            coordinates: vec![start.to_lng_lat(), end.to_lng_lat()],
            format: "geojson",
            instructions: false,
            elevation: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoJsonLineString {
    /// `[lng, lat]` pairs.
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsSummary {
    /// Metres.
    #[serde(default)]
    pub distance: f64,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsProperties {
    pub summary: DirectionsSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsFeature {
    pub geometry: GeoJsonLineString,
    pub properties: DirectionsProperties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub features: Vec<DirectionsFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRoute {
    pub geometry: GeoJsonLineString,
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

fn default_true() -> bool {
    true
}
