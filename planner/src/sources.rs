//! Places a route can come from, tried in order by [`crate::fallback::FallbackChain`].

use std::f64::consts::PI;

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use shared::{
    Coordinate, GridCell, QualityLabel, haversine_km,
    api::{DirectionsRequest, DirectionsResponse, OsrmResponse},
};
use tracing::debug;

use crate::{client::SmartRouteClient, error::PlannerError};

const INTERPOLATION_STEPS: usize = 50;
const CURVE_START: f64 = 0.1;
const CURVE_END: f64 = 0.9;
const LAT_CURVE_AMPLITUDE: f64 = 0.001;
const LNG_CURVE_AMPLITUDE: f64 = 0.0008;
const JITTER: f64 = 0.0005;
const MINUTES_PER_KM: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteOrigin {
    SmartRoute,
    Directions,
    Osrm,
    Interpolated,
}

impl RouteOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmartRoute => "SmartRoute AI",
            Self::Directions => "OpenRouteService",
            Self::Osrm => "OSRM",
            Self::Interpolated => "estimated",
        }
    }
}

/// A route as returned by one source, before statistics are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    pub origin: RouteOrigin,
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub grid_path: Vec<GridCell>,
    /// Per-sample labels the SmartRoute service reports alongside the path.
    pub route_qualities: Vec<QualityLabel>,
}

impl RouteCandidate {
    pub fn plain(origin: RouteOrigin, path: Vec<Coordinate>, distance_km: f64, duration_minutes: f64) -> Self {
        Self {
            origin,
            path,
            distance_km,
            duration_minutes,
            grid_path: Vec::new(),
            route_qualities: Vec::new(),
        }
    }
}

#[async_trait(?Send)]
pub trait RouteSource {
    fn name(&self) -> &'static str;

    async fn fetch_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteCandidate, PlannerError>;
}

/// The SmartRoute service itself.
pub struct SmartRouteSource {
    client: SmartRouteClient,
}

impl SmartRouteSource {
    pub fn new(client: SmartRouteClient) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl RouteSource for SmartRouteSource {
    fn name(&self) -> &'static str {
        "smartroute"
    }

    async fn fetch_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteCandidate, PlannerError> {
        let response = self.client.fetch_route(start, end).await?;
        Ok(RouteCandidate {
            origin: RouteOrigin::SmartRoute,
            path: response.route_coordinates,
            distance_km: response.distance,
            duration_minutes: response.duration,
            grid_path: response.grid_path.unwrap_or_default(),
            route_qualities: response.route_qualities.unwrap_or_default(),
        })
    }
}

/// OpenRouteService-style directions endpoint answering GeoJSON.
pub struct DirectionsSource {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl DirectionsSource {
    pub fn new(url: impl Into<String>, api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            api_key,
            client,
        }
    }
}

#[async_trait(?Send)]
impl RouteSource for DirectionsSource {
    fn name(&self) -> &'static str {
        "directions"
    }

    async fn fetch_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteCandidate, PlannerError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&DirectionsRequest::between(start, end));
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PlannerError::Api { status, message });
        }

        let body: DirectionsResponse = response.json().await?;
        let feature = body
            .features
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::InvalidResponse("directions response has no features".into()))?;
        let path = lng_lat_path(feature.geometry.coordinates)?;
        debug!(points = path.len(), "directions provider returned a route");

        Ok(RouteCandidate::plain(
            RouteOrigin::Directions,
            path,
            feature.properties.summary.distance / 1000.0,
            feature.properties.summary.duration / 60.0,
        ))
    }
}

/// Public OSRM demo server.
pub struct OsrmSource {
    root: String,
    client: reqwest::Client,
}

impl OsrmSource {
    pub fn new(root: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            root: root.into(),
            client,
        }
    }

    fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.root, start.lon, start.lat, end.lon, end.lat
        )
    }
}

#[async_trait(?Send)]
impl RouteSource for OsrmSource {
    fn name(&self) -> &'static str {
        "osrm"
    }

    async fn fetch_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteCandidate, PlannerError> {
        let response = self
            .client
            .get(self.route_url(start, end))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PlannerError::Api { status, message });
        }

        let body: OsrmResponse = response.json().await?;
        if let Some(code) = body.code.as_deref().filter(|code| *code != "Ok") {
            return Err(PlannerError::Rejected(format!("OSRM answered {code}")));
        }
        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::InvalidResponse("OSRM response has no routes".into()))?;
        let path = lng_lat_path(route.geometry.coordinates)?;

        Ok(RouteCandidate::plain(
            RouteOrigin::Osrm,
            path,
            route.distance / 1000.0,
            route.duration / 60.0,
        ))
    }
}

fn lng_lat_path(coordinates: Vec<[f64; 2]>) -> Result<Vec<Coordinate>, PlannerError> {
    if coordinates.is_empty() {
        return Err(PlannerError::InvalidResponse("route geometry is empty".into()));
    }
    Ok(coordinates.into_iter().map(Coordinate::from_lng_lat).collect())
}

/// Last resort: a road-looking line between the endpoints, never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpolator;

impl Interpolator {
    pub fn synthesize<R: Rng>(&self, start: Coordinate, end: Coordinate, rng: &mut R) -> RouteCandidate {
        let mut path = Vec::with_capacity(INTERPOLATION_STEPS + 1);
        for i in 0..=INTERPOLATION_STEPS {
            let progress = i as f64 / INTERPOLATION_STEPS as f64;
            let mut point = start.interpolate(end, progress);
            if progress > CURVE_START && progress < CURVE_END {
                let lat_curve = (progress * PI * 3.0).sin() * LAT_CURVE_AMPLITUDE;
                let lng_curve = (progress * PI * 2.0).cos() * LNG_CURVE_AMPLITUDE;
                point.lat += lat_curve + (rng.r#gen::<f64>() - 0.5) * JITTER;
                point.lon += lng_curve + (rng.r#gen::<f64>() - 0.5) * JITTER;
            }
            path.push(point);
        }

        let distance_km = haversine_km(start, end);
        RouteCandidate::plain(
            RouteOrigin::Interpolated,
            path,
            distance_km,
            distance_km * MINUTES_PER_KM,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_interpolated_route_shape() {
        let start = Coordinate::new(28.60, 77.20);
        let end = Coordinate::new(28.70, 77.30);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let route = Interpolator.synthesize(start, end, &mut rng);

        assert_eq!(route.origin, RouteOrigin::Interpolated);
        assert_eq!(route.path.len(), INTERPOLATION_STEPS + 1);
        assert_eq!(route.path[0], start);
        let last = route.path.last().unwrap();
        assert!((last.lat - end.lat).abs() < 1e-9 && (last.lon - end.lon).abs() < 1e-9);
        assert!(route.grid_path.is_empty());
        assert!((route.duration_minutes - route.distance_km * 1.5).abs() < 1e-9);
        assert!((route.distance_km - haversine_km(start, end)).abs() < 1e-9);
    }

    #[test]
    fn test_interpolated_route_stays_near_the_straight_line() {
        let start = Coordinate::new(0.0, 0.0);
        let end = Coordinate::new(0.0, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let route = Interpolator.synthesize(start, end, &mut rng);
        let max_offset = LAT_CURVE_AMPLITUDE + JITTER / 2.0 + 1e-12;
        assert!(route.path.iter().all(|p| p.lat.abs() <= max_offset));
        assert!((route.distance_km - 111.19).abs() < 0.05);
    }

    #[test]
    fn test_identical_endpoints_have_zero_distance() {
        let point = Coordinate::new(28.6, 77.2);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let route = Interpolator.synthesize(point, point, &mut rng);
        assert_eq!(route.distance_km, 0.0);
        assert_eq!(route.duration_minutes, 0.0);
    }

    #[test]
    fn test_osrm_url_uses_lng_lat() {
        let source = OsrmSource::new("https://osrm.example", reqwest::Client::new());
        let url = source.route_url(Coordinate::new(28.6, 77.2), Coordinate::new(28.5, 77.1));
        assert_eq!(url, "https://osrm.example/route/v1/driving/77.2,28.6;77.1,28.5");
    }

    #[test]
    fn test_empty_geometry_is_rejected() {
        assert!(matches!(lng_lat_path(Vec::new()), Err(PlannerError::InvalidResponse(_))));
        let path = lng_lat_path(vec![[77.2, 28.6]]).unwrap();
        assert_eq!(path, vec![Coordinate::new(28.6, 77.2)]);
    }
}
