pub mod api;
pub mod grid;
pub mod quality;

use serde::{Deserialize, Serialize};

pub use grid::{CellId, GridBounds, GridCell, GridData};
pub use quality::QualityLabel;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    /// `[lat, lng]`, the order the SmartRoute service and Leaflet use.
    pub fn to_lat_lng(self) -> [f64; 2] {
        [self.lat, self.lon]
    }

    /// `[lng, lat]`, the GeoJSON order used by the fallback providers.
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn from_lng_lat([lon, lat]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Serde adapter for `Vec<Coordinate>` encoded as `[[lat, lng], ...]`.
pub mod lat_lng_pairs {
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq};

    use crate::Coordinate;

    pub fn serialize<S>(path: &[Coordinate], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(path.len()))?;
        for coord in path {
            seq.serialize_element(&coord.to_lat_lng())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Coordinate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Option::<Vec<[f64; 2]>>::deserialize(deserializer)?;
        Ok(pairs
            .unwrap_or_default()
            .into_iter()
            .map(Coordinate::from)
            .collect())
    }
}
