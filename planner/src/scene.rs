//! Map layers as data.
//!
//! [`MapRenderer`] diffs the store against what it last drew and emits
//! [`MapCommand`]s; the Leaflet bridge in the frontend applies them verbatim.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::FixedOffset;
use geo_types::{Rect, coord};
use serde::Serialize;
use shared::{CellId, Coordinate, GridCell, GridData, QualityLabel};

use crate::{
    config::{PlannerConfig, TileSource},
    store::{RouteStore, SelectionMode},
};

pub const LOW_CONFIDENCE: f64 = 0.7;
pub const FIT_PADDING_PX: u32 = 20;
const PATH_CELL_HALF_SIZE: f64 = 0.01;
const PATH_BORDER: &str = "#3b82f6";
const START_PIN: &str = "#22c55e";
const END_PIN: &str = "#ef4444";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

/// Leaflet path options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStyle {
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

const GRID_STYLE: PathStyle = PathStyle {
    color: "black",
    weight: 1.0,
    opacity: 0.8,
    fill_opacity: 0.3,
};

const PATH_STYLE: PathStyle = PathStyle {
    color: PATH_BORDER,
    weight: 3.0,
    opacity: 1.0,
    fill_opacity: 0.7,
};

const ROUTE_STYLE: PathStyle = PathStyle {
    color: "",
    weight: 6.0,
    opacity: 0.8,
    fill_opacity: 0.0,
};

/// Axis-aligned cell rectangle as `[lat, lng]` corners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellShape {
    pub row: u32,
    pub col: u32,
    pub south_west: [f64; 2],
    pub north_east: [f64; 2],
    pub fill_color: String,
    pub popup_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: [f64; 2],
    pub icon_url: String,
    pub popup_html: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitBounds {
    pub south_west: [f64; 2],
    pub north_east: [f64; 2],
    pub padding: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum MapCommand {
    SetBasemap {
        tiles: TileSource,
    },
    /// Drops every previous grid polygon first.
    ReplaceGrid {
        style: PathStyle,
        cells: Vec<CellShape>,
    },
    ReplacePath {
        style: PathStyle,
        cells: Vec<CellShape>,
    },
    /// Markers and segments replace the previous ones.
    DrawRoute {
        style: PathStyle,
        markers: Vec<Marker>,
        segments: Vec<RouteSegment>,
        fit: Option<FitBounds>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct RouteSnapshot {
    start: Option<Coordinate>,
    end: Option<Coordinate>,
    path: Vec<Coordinate>,
    conditions: Vec<QualityLabel>,
}

impl RouteSnapshot {
    fn of(store: &RouteStore) -> Self {
        Self {
            start: store.start(),
            end: store.end(),
            path: store.route().to_vec(),
            conditions: store.road_conditions().to_vec(),
        }
    }
}

/// Remembers what is on the map so unchanged layers are not redrawn.
#[derive(Debug, Clone, Default)]
pub struct MapRenderer {
    theme: Option<Theme>,
    grid_revision: Option<u64>,
    path_revision: Option<u64>,
    route: Option<RouteSnapshot>,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands bringing the map in line with `store`. Timestamps in popups
    /// are shown in `local_offset`.
    pub fn render(
        &mut self,
        store: &RouteStore,
        theme: Theme,
        config: &PlannerConfig,
        local_offset: FixedOffset,
    ) -> Vec<MapCommand> {
        let mut commands = Vec::new();

        if self.theme != Some(theme) {
            self.theme = Some(theme);
            commands.push(MapCommand::SetBasemap {
                tiles: config.tiles(theme.is_dark()).clone(),
            });
        }

        if let Some(grid) = store.grid() {
            if self.grid_revision != Some(store.grid_revision()) {
                self.grid_revision = Some(store.grid_revision());
                commands.push(MapCommand::ReplaceGrid {
                    style: GRID_STYLE,
                    cells: grid_shapes(grid, local_offset),
                });
            }
        }

        if self.path_revision != Some(store.path_revision()) {
            self.path_revision = Some(store.path_revision());
            commands.push(MapCommand::ReplacePath {
                style: PATH_STYLE,
                cells: path_shapes(store.grid_path()),
            });
        }

        let snapshot = RouteSnapshot::of(store);
        if self.route.as_ref() != Some(&snapshot) {
            commands.push(route_command(&snapshot));
            self.route = Some(snapshot);
        }

        commands
    }
}

fn grid_shapes(grid: &GridData, local_offset: FixedOffset) -> Vec<CellShape> {
    grid.cells
        .iter()
        .map(|cell| {
            let (sw, ne) = grid.cell_bounds(cell);
            CellShape {
                row: cell.row,
                col: cell.col,
                south_west: sw.to_lat_lng(),
                north_east: ne.to_lat_lng(),
                fill_color: cell.color.clone(),
                popup_html: cell_popup_html(cell, local_offset),
            }
        })
        .collect()
}

fn path_shapes(path: &[GridCell]) -> Vec<CellShape> {
    path.iter()
        .enumerate()
        .map(|(index, cell)| CellShape {
            row: cell.row,
            col: cell.col,
            south_west: [
                cell.center_lat - PATH_CELL_HALF_SIZE,
                cell.center_lng - PATH_CELL_HALF_SIZE,
            ],
            north_east: [
                cell.center_lat + PATH_CELL_HALF_SIZE,
                cell.center_lng + PATH_CELL_HALF_SIZE,
            ],
            fill_color: cell.color.clone(),
            popup_html: format!(
                "<div class=\"path-cell-popup\"><h4>Path Cell {}</h4>\
                 <p><strong>Quality:</strong> {}</p>\
                 <p><strong>Position:</strong> ({}, {})</p></div>",
                index + 1,
                cell.quality,
                cell.row,
                cell.col
            ),
        })
        .collect()
}

fn route_command(snapshot: &RouteSnapshot) -> MapCommand {
    let mut markers = Vec::with_capacity(2);
    if let Some(start) = snapshot.start {
        markers.push(Marker {
            position: start.to_lat_lng(),
            icon_url: pin_icon(START_PIN),
            popup_html: "<b>Start Location</b><br>Click to begin your journey",
        });
    }
    if let Some(end) = snapshot.end {
        markers.push(Marker {
            position: end.to_lat_lng(),
            icon_url: pin_icon(END_PIN),
            popup_html: "<b>Destination</b><br>Your journey ends here",
        });
    }

    let segments = route_segments(&snapshot.path, &snapshot.conditions);
    let fit = if snapshot.path.is_empty() {
        None
    } else {
        let points = snapshot
            .path
            .iter()
            .chain(snapshot.start.iter())
            .chain(snapshot.end.iter())
            .copied();
        bounding_rect(points).map(|rect| FitBounds {
            south_west: [rect.min().y, rect.min().x],
            north_east: [rect.max().y, rect.max().x],
            padding: FIT_PADDING_PX,
        })
    };

    MapCommand::DrawRoute {
        style: ROUTE_STYLE,
        markers,
        segments,
        fit,
    }
}

/// One segment per consecutive pair, colored by the condition at the same
/// index modulo the list length.
pub fn route_segments(path: &[Coordinate], conditions: &[QualityLabel]) -> Vec<RouteSegment> {
    path.windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let label = if conditions.is_empty() {
                QualityLabel::Good
            } else {
                conditions[i % conditions.len()]
            };
            RouteSegment {
                from: pair[0].to_lat_lng(),
                to: pair[1].to_lat_lng(),
                color: condition_color(label),
            }
        })
        .collect()
}

pub fn condition_color(label: QualityLabel) -> &'static str {
    match label {
        QualityLabel::Good => "#22c55e",
        QualityLabel::Satisfactory => "#f97316",
        QualityLabel::Poor => "#ef4444",
        QualityLabel::VeryPoor => "#000000",
        QualityLabel::Unknown => "#3b82f6",
    }
}

fn bounding_rect(points: impl Iterator<Item = Coordinate>) -> Option<Rect<f64>> {
    points.fold(None, |rect: Option<Rect<f64>>, point| {
        let c = coord! { x: point.lon, y: point.lat };
        Some(match rect {
            None => Rect::new(c, c),
            Some(rect) => Rect::new(
                coord! { x: rect.min().x.min(c.x), y: rect.min().y.min(c.y) },
                coord! { x: rect.max().x.max(c.x), y: rect.max().y.max(c.y) },
            ),
        })
    })
}

/// 25x41 map pin as a base64 SVG data URI.
pub fn pin_icon(fill: &str) -> String {
    let svg = format!(
        "<svg width=\"25\" height=\"41\" viewBox=\"0 0 25 41\" xmlns=\"http://www.w3.org/2000/svg\">\
         <path d=\"M12.5 0C5.6 0 0 5.6 0 12.5C0 19.4 12.5 41 12.5 41S25 19.4 25 12.5C25 5.6 19.4 0 12.5 0Z\" fill=\"{fill}\"/>\
         <circle cx=\"12.5\" cy=\"12.5\" r=\"4\" fill=\"white\"/></svg>"
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// Popup and dwell tooltip body for a grid cell.
pub fn cell_popup_html(cell: &GridCell, local_offset: FixedOffset) -> String {
    let confidence = match cell.confidence {
        Some(value) if value < LOW_CONFIDENCE => {
            format!("{:.0}% <span class=\"low-confidence\">(low)</span>", value * 100.0)
        }
        Some(value) => format!("{:.0}%", value * 100.0),
        None => "N/A".to_string(),
    };
    let updated = cell
        .last_updated
        .map(|at| at.with_timezone(&local_offset).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        "<div class=\"grid-cell-popup\"><h4>Grid Cell ({}, {})</h4>\
         <p><strong>Quality:</strong> {}</p>\
         <p><strong>Confidence:</strong> {confidence}</p>\
         <p><strong>Last updated:</strong> {updated}</p>\
         <p><strong>Evidence:</strong> {} image(s)</p>\
         <p><strong>Center:</strong> {:.4}, {:.4}</p></div>",
        cell.row,
        cell.col,
        cell.quality,
        cell.evidence_count.unwrap_or(0),
        cell.center_lat,
        cell.center_lng
    )
}

/// Tooltip body for the cell under the pointer, if the grid knows it.
pub fn tooltip_html(grid: Option<&GridData>, cell: CellId, local_offset: FixedOffset) -> Option<String> {
    grid?.cell(cell).map(|cell| cell_popup_html(cell, local_offset))
}

pub fn selection_hint(mode: SelectionMode) -> Option<&'static str> {
    match mode {
        SelectionMode::PickingStart => Some(
            "Click on the map to select your start location (then automatically select destination)",
        ),
        SelectionMode::PickingEnd => Some("Click on the map to select your destination location"),
        SelectionMode::None => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use shared::GridBounds;

    use super::*;
    use crate::sources::{RouteCandidate, RouteOrigin};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn cell(row: u32, col: u32, quality: QualityLabel) -> GridCell {
        GridCell {
            row,
            col,
            center_lat: 28.5 + f64::from(row) * 0.1 + 0.05,
            center_lng: 77.0 + f64::from(col) * 0.1 + 0.05,
            quality,
            color: "#f97316".into(),
            confidence: None,
            last_updated: None,
            evidence_count: None,
            lat_bounds: None,
            lng_bounds: None,
        }
    }

    fn grid() -> GridData {
        GridData {
            grid_size: 2,
            bounds: GridBounds {
                lat_min: 28.5,
                lat_max: 28.7,
                lng_min: 77.0,
                lng_max: 77.2,
            },
            cells: vec![
                cell(0, 0, QualityLabel::Good),
                cell(0, 1, QualityLabel::Poor),
                cell(1, 0, QualityLabel::Satisfactory),
                cell(1, 1, QualityLabel::VeryPoor),
            ],
        }
    }

    fn kinds(commands: &[MapCommand]) -> Vec<&'static str> {
        commands
            .iter()
            .map(|command| match command {
                MapCommand::SetBasemap { .. } => "basemap",
                MapCommand::ReplaceGrid { .. } => "grid",
                MapCommand::ReplacePath { .. } => "path",
                MapCommand::DrawRoute { .. } => "route",
            })
            .collect()
    }

    #[test]
    fn test_first_render_then_nothing_changes() {
        let config = PlannerConfig::default();
        let mut store = RouteStore::new();
        store.apply_grid(Ok(grid()));
        let mut renderer = MapRenderer::new();

        let first = renderer.render(&store, Theme::Light, &config, utc());
        assert_eq!(kinds(&first), vec!["basemap", "grid", "path", "route"]);
        assert!(renderer.render(&store, Theme::Light, &config, utc()).is_empty());

        let toggled = renderer.render(&store, Theme::Dark, &config, utc());
        match toggled.as_slice() {
            [MapCommand::SetBasemap { tiles }] => assert!(tiles.url_template.contains("dark_all")),
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn test_grid_cells_use_derived_bounds() {
        let shapes = grid_shapes(&grid(), utc());
        assert_eq!(shapes.len(), 4);
        let last = &shapes[3];
        assert!((last.south_west[0] - 28.6).abs() < 1e-9);
        assert!((last.south_west[1] - 77.1).abs() < 1e-9);
        assert!((last.north_east[0] - 28.7).abs() < 1e-9);
        assert!((last.north_east[1] - 77.2).abs() < 1e-9);
        assert_eq!(last.fill_color, "#f97316");
    }

    #[test]
    fn test_popup_details() {
        let mut sample = cell(3, 4, QualityLabel::Poor);
        sample.confidence = Some(0.42);
        sample.evidence_count = Some(6);
        sample.last_updated = Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());

        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let html = cell_popup_html(&sample, ist);
        assert!(html.contains("Grid Cell (3, 4)"));
        assert!(html.contains("42% <span class=\"low-confidence\">(low)</span>"));
        assert!(html.contains("2024-03-01 16:00"));
        assert!(html.contains("6 image(s)"));
        assert!(html.contains("28.8500, 77.4500"));

        sample.confidence = Some(0.9);
        sample.last_updated = None;
        let html = cell_popup_html(&sample, ist);
        assert!(html.contains("90%"));
        assert!(!html.contains("(low)"));
        assert!(html.contains("Unknown"));
    }

    #[test]
    fn test_segments_cycle_through_conditions() {
        let path: Vec<_> = (0..5).map(|i| Coordinate::new(28.0 + f64::from(i) * 0.01, 77.0)).collect();
        let colors: Vec<_> = route_segments(&path, &[QualityLabel::Good, QualityLabel::VeryPoor])
            .iter()
            .map(|segment| segment.color)
            .collect();
        assert_eq!(colors, vec!["#22c55e", "#000000", "#22c55e", "#000000"]);

        let plain = route_segments(&path, &[]);
        assert!(plain.iter().all(|segment| segment.color == "#22c55e"));
        assert!(route_segments(&path[..1], &[]).is_empty());
    }

    #[test]
    fn test_route_draws_markers_and_fits_bounds() {
        let config = PlannerConfig::default();
        let mut store = RouteStore::new();
        let start = Coordinate::new(28.60, 77.30);
        let end = Coordinate::new(28.70, 77.10);
        store.set_start(start);
        let mut renderer = MapRenderer::new();
        renderer.render(&store, Theme::Light, &config, utc());

        store.set_end(end);
        let ticket = store.begin_route().unwrap();
        let mut candidate = RouteCandidate::plain(
            RouteOrigin::Osrm,
            vec![start, Coordinate::new(28.75, 77.2), end],
            5.0,
            10.0,
        );
        candidate.grid_path = vec![cell(0, 0, QualityLabel::Good)];
        store.complete_route(ticket, candidate, &mut ChaCha8Rng::seed_from_u64(0));

        let commands = renderer.render(&store, Theme::Light, &config, utc());
        assert_eq!(kinds(&commands), vec!["path", "route"]);
        let MapCommand::ReplacePath { cells, .. } = &commands[0] else {
            panic!("expected path first");
        };
        assert!(cells[0].popup_html.contains("Path Cell 1"));
        assert!((cells[0].north_east[0] - cells[0].south_west[0] - 0.02).abs() < 1e-9);

        let MapCommand::DrawRoute { markers, segments, fit, .. } = &commands[1] else {
            panic!("expected route");
        };
        assert_eq!(markers.len(), 2);
        assert!(markers[0].popup_html.contains("Start Location"));
        assert_eq!(segments.len(), 2);
        let fit = fit.unwrap();
        assert_eq!(fit.south_west, [28.60, 77.10]);
        assert_eq!(fit.north_east, [28.75, 77.30]);
        assert_eq!(fit.padding, FIT_PADDING_PX);
    }

    #[test]
    fn test_markers_without_route_do_not_fit() {
        let mut store = RouteStore::new();
        store.set_start(Coordinate::new(28.6, 77.2));
        let MapCommand::DrawRoute { markers, fit, .. } = route_command(&RouteSnapshot::of(&store)) else {
            panic!("expected route");
        };
        assert_eq!(markers.len(), 1);
        assert!(fit.is_none());
    }

    #[test]
    fn test_pin_icon_is_base64_svg() {
        let icon = pin_icon(START_PIN);
        let payload = icon.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
        assert!(svg.contains("fill=\"#22c55e\""));
        assert!(svg.contains("r=\"4\""));
    }

    #[test]
    fn test_commands_are_tagged() {
        let json = serde_json::to_value(MapCommand::ReplacePath {
            style: PATH_STYLE,
            cells: Vec::new(),
        })
        .unwrap();
        assert_eq!(json["kind"], "ReplacePath");
        assert_eq!(json["style"]["color"], "#3b82f6");
        assert_eq!(json["style"]["weight"], 3.0);
    }

    #[test]
    fn test_tooltip_and_hints() {
        let data = grid();
        let html = tooltip_html(Some(&data), CellId { row: 1, col: 1 }, utc()).unwrap();
        assert!(html.contains("Very Poor"));
        assert!(tooltip_html(Some(&data), CellId { row: 9, col: 9 }, utc()).is_none());
        assert!(tooltip_html(None, CellId { row: 0, col: 0 }, utc()).is_none());

        assert!(selection_hint(SelectionMode::PickingStart).unwrap().contains("start location"));
        assert!(selection_hint(SelectionMode::PickingEnd).unwrap().contains("destination"));
        assert!(selection_hint(SelectionMode::None).is_none());
    }
}
