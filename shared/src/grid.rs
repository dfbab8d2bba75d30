use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Coordinate, QualityLabel};

/// `row,col` address of a grid cell, as typed by users and sent to `/upload-image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId {
    pub row: u32,
    pub col: u32,
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCellIdError(pub String);

impl fmt::Display for ParseCellIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell identifier {:?}, expected row,col", self.0)
    }
}

impl std::error::Error for ParseCellIdError {}

impl FromStr for CellId {
    type Err = ParseCellIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')'))
            .collect();
        let (row, col) = compact
            .split_once(',')
            .ok_or_else(|| ParseCellIdError(raw.to_string()))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| ParseCellIdError(raw.to_string()))
        };
        Ok(Self {
            row: parse(row)?,
            col: parse(col)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

/// One tile of the road-quality grid. Snapshots are never mutated client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
    pub center_lat: f64,
    pub center_lng: f64,
    pub quality: QualityLabel,
    #[serde(default = "default_cell_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "num_images",
        alias = "evidence_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub evidence_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_bounds: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng_bounds: Option<[f64; 2]>,
}

impl GridCell {
    pub fn id(&self) -> CellId {
        CellId {
            row: self.row,
            col: self.col,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.center_lat, self.center_lng)
    }
}

fn default_cell_color() -> String {
    "#6b7280".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridData {
    pub grid_size: u32,
    #[serde(rename = "delhi_bounds", alias = "bounds")]
    pub bounds: GridBounds,
    #[serde(default)]
    pub cells: Vec<GridCell>,
}

impl GridData {
    /// South-west and north-east corners of a cell.
    ///
    /// Uses the bounds the service sent with the cell, else derives them from
    /// the grid bounding box and dimension.
    pub fn cell_bounds(&self, cell: &GridCell) -> (Coordinate, Coordinate) {
        if let (Some(lat), Some(lng)) = (cell.lat_bounds, cell.lng_bounds) {
            return (Coordinate::new(lat[0], lng[0]), Coordinate::new(lat[1], lng[1]));
        }
        let size = f64::from(self.grid_size.max(1));
        let lat_step = (self.bounds.lat_max - self.bounds.lat_min) / size;
        let lng_step = (self.bounds.lng_max - self.bounds.lng_min) / size;
        let lat_min = self.bounds.lat_min + f64::from(cell.row) * lat_step;
        let lng_min = self.bounds.lng_min + f64::from(cell.col) * lng_step;
        (
            Coordinate::new(lat_min, lng_min),
            Coordinate::new(lat_min + lat_step, lng_min + lng_step),
        )
    }

    pub fn cell(&self, id: CellId) -> Option<&GridCell> {
        self.cells.iter().find(|cell| cell.id() == id)
    }
}

/// Accepts epoch seconds, RFC 3339 strings, naive ISO strings (read as UTC) or null.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(f64),
        Text(String),
    }

    let Some(raw) = Option::<Raw>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = match raw {
        Raw::Seconds(secs) => {
            DateTime::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
        }
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CELL: &str = r##"{
        "row": 3, "col": 5,
        "center_lat": 28.31, "center_lng": 76.87,
        "quality": "Satisfactory", "color": "#f97316",
        "confidence": 0.82, "last_updated": 1700000000,
        "num_images": 4,
        "lat_bounds": [28.29, 28.33], "lng_bounds": [76.845, 76.9]
    }"##;

    #[test]
    fn test_cell_with_all_fields() {
        let cell: GridCell = serde_json::from_str(FULL_CELL).unwrap();
        assert_eq!(cell.id(), CellId { row: 3, col: 5 });
        assert_eq!(cell.quality, QualityLabel::Satisfactory);
        assert_eq!(cell.confidence, Some(0.82));
        assert_eq!(cell.evidence_count, Some(4));
        assert_eq!(cell.last_updated.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_cell_optional_fields_missing_or_null() {
        let cell: GridCell = serde_json::from_str(
            r#"{"row": 0, "col": 0, "center_lat": 1.0, "center_lng": 2.0,
                "quality": "very_poor", "last_updated": null}"#,
        )
        .unwrap();
        assert_eq!(cell.quality, QualityLabel::VeryPoor);
        assert_eq!(cell.color, "#6b7280");
        assert!(cell.confidence.is_none());
        assert!(cell.last_updated.is_none());
        assert!(cell.evidence_count.is_none());
    }

    #[test]
    fn test_timestamp_from_iso_strings() {
        let cell: GridCell = serde_json::from_str(
            r#"{"row": 0, "col": 0, "center_lat": 1.0, "center_lng": 2.0,
                "quality": "Good", "last_updated": "2024-05-01T10:00:00.123456+00:00"}"#,
        )
        .unwrap();
        assert_eq!(
            cell.last_updated.unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2024-05-01 10:00"
        );

        let cell: GridCell = serde_json::from_str(
            r#"{"row": 0, "col": 0, "center_lat": 1.0, "center_lng": 2.0,
                "quality": "Good", "last_updated": "2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        assert!(cell.last_updated.is_some());
    }

    #[test]
    fn test_cell_bounds_derived_from_grid() {
        let grid = GridData {
            grid_size: 20,
            bounds: GridBounds {
                lat_min: 28.25,
                lat_max: 29.05,
                lng_min: 76.65,
                lng_max: 77.75,
            },
            cells: Vec::new(),
        };
        let mut cell: GridCell = serde_json::from_str(FULL_CELL).unwrap();
        cell.lat_bounds = None;
        let (sw, ne) = grid.cell_bounds(&cell);
        assert!((sw.lat - 28.37).abs() < 1e-9);
        assert!((ne.lat - 28.41).abs() < 1e-9);
        assert!((sw.lon - 76.925).abs() < 1e-9);
        assert!((ne.lon - 76.98).abs() < 1e-9);
    }

    #[test]
    fn test_grid_accepts_delhi_bounds_key() {
        let grid: GridData = serde_json::from_str(
            r#"{"grid_size": 2, "delhi_bounds": {"lat_min": 0, "lat_max": 1, "lng_min": 0, "lng_max": 1}, "cells": []}"#,
        )
        .unwrap();
        assert_eq!(grid.grid_size, 2);
        assert_eq!(grid.bounds.lat_max, 1.0);
    }

    #[test]
    fn test_cell_id_parsing() {
        assert_eq!("3,5".parse(), Ok(CellId { row: 3, col: 5 }));
        assert_eq!(" 3 , 5 ".parse(), Ok(CellId { row: 3, col: 5 }));
        assert_eq!("(0, 0)".parse(), Ok(CellId { row: 0, col: 0 }));
        assert!("3;5".parse::<CellId>().is_err());
        assert!("a,b".parse::<CellId>().is_err());
        assert!("-1,2".parse::<CellId>().is_err());
        assert_eq!(CellId { row: 7, col: 1 }.to_string(), "7,1");
    }
}
