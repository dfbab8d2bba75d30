//! Route/grid planning state.
//!
//! All mutations go through `RouteStore` methods so the frontend's update loop
//! and the tests drive exactly the same transitions.

use rand::Rng;
use shared::{Coordinate, GridCell, GridData, QualityLabel};
use tracing::{debug, info, warn};

use crate::{
    error::PlannerError,
    fallback::FallbackChain,
    sources::{RouteCandidate, RouteOrigin},
    stats::{RouteSummary, mock_conditions},
};

/// Which endpoint the next map click sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    None,
    PickingStart,
    PickingEnd,
}

/// Issued by [`RouteStore::begin_route`]; only the newest ticket may complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteTicket {
    pub generation: u64,
    pub start: Coordinate,
    pub end: Coordinate,
}

#[derive(Debug, Default)]
pub struct RouteStore {
    start: Option<Coordinate>,
    end: Option<Coordinate>,
    selection: SelectionMode,
    route: Vec<Coordinate>,
    route_origin: Option<RouteOrigin>,
    summary: Option<RouteSummary>,
    road_conditions: Vec<QualityLabel>,
    grid_path: Vec<GridCell>,
    grid: Option<GridData>,
    loading: bool,
    generation: u64,
    grid_revision: u64,
    path_revision: u64,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.start
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.end
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection
    }

    pub fn route(&self) -> &[Coordinate] {
        &self.route
    }

    pub fn route_origin(&self) -> Option<RouteOrigin> {
        self.route_origin
    }

    pub fn summary(&self) -> Option<&RouteSummary> {
        self.summary.as_ref()
    }

    pub fn road_conditions(&self) -> &[QualityLabel] {
        &self.road_conditions
    }

    pub fn grid_path(&self) -> &[GridCell] {
        &self.grid_path
    }

    pub fn grid(&self) -> Option<&GridData> {
        self.grid.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Bumped every time the grid overlay is replaced.
    pub fn grid_revision(&self) -> u64 {
        self.grid_revision
    }

    /// Bumped every time the grid path is replaced or cleared.
    pub fn path_revision(&self) -> u64 {
        self.path_revision
    }

    pub fn can_generate(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn set_start(&mut self, coord: Coordinate) {
        self.start = Some(coord);
    }

    pub fn set_end(&mut self, coord: Coordinate) {
        self.end = Some(coord);
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection = mode;
    }

    /// Picking the start advances to picking the end; picking the end finishes.
    pub fn handle_map_click(&mut self, coord: Coordinate) {
        debug!(
            "map click mode={:?} lat={:.5} lon={:.5}",
            self.selection, coord.lat, coord.lon
        );
        match self.selection {
            SelectionMode::PickingStart => {
                self.set_start(coord);
                self.selection = SelectionMode::PickingEnd;
            }
            SelectionMode::PickingEnd => {
                self.set_end(coord);
                self.selection = SelectionMode::None;
            }
            SelectionMode::None => {}
        }
    }

    /// Clears planning state. The grid overlay is kept; outstanding route
    /// requests are invalidated.
    pub fn reset(&mut self) {
        self.start = None;
        self.end = None;
        self.selection = SelectionMode::None;
        self.route.clear();
        self.route_origin = None;
        self.summary = None;
        self.road_conditions.clear();
        if !self.grid_path.is_empty() {
            self.grid_path.clear();
            self.path_revision += 1;
        }
        self.loading = false;
        self.generation += 1;
    }

    pub fn add_road_condition(&mut self, label: QualityLabel) {
        self.road_conditions.push(label);
    }

    /// Keeps the previous grid when loading failed.
    pub fn apply_grid(&mut self, result: Result<GridData, PlannerError>) {
        match result {
            Ok(grid) => {
                self.grid = Some(grid);
                self.grid_revision += 1;
            }
            Err(err) => warn!("failed to load grid data: {err}"),
        }
    }

    /// Marks the store loading and hands out a ticket, or `None` when an
    /// endpoint is missing.
    pub fn begin_route(&mut self) -> Option<RouteTicket> {
        let (start, end) = (self.start?, self.end?);
        self.generation += 1;
        self.loading = true;
        info!(generation = self.generation, "starting route generation");
        Some(RouteTicket {
            generation: self.generation,
            start,
            end,
        })
    }

    /// Applies a resolved route. Returns `false` when the ticket is stale,
    /// in which case nothing changes.
    pub fn complete_route<R: Rng>(&mut self, ticket: RouteTicket, candidate: RouteCandidate, rng: &mut R) -> bool {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale route result"
            );
            return false;
        }

        if !candidate.grid_path.is_empty() {
            self.road_conditions = candidate.grid_path.iter().map(|cell| cell.quality).collect();
            self.grid_path = candidate.grid_path;
            self.path_revision += 1;
        } else if self.road_conditions.is_empty() {
            // Samples outside the grid come back as Unknown and carry no signal.
            let sampled: Vec<QualityLabel> = candidate
                .route_qualities
                .into_iter()
                .filter(|label| label.is_known())
                .collect();
            if sampled.is_empty() {
                self.road_conditions = mock_conditions(candidate.path.len(), rng);
                debug!(conditions = ?self.road_conditions, "generated placeholder conditions");
            } else {
                self.road_conditions = sampled;
            }
        }

        let summary = RouteSummary::derive(
            candidate.distance_km,
            candidate.duration_minutes,
            &self.road_conditions,
        );
        info!(
            origin = candidate.origin.as_str(),
            distance_km = summary.distance_km,
            score = summary.quality_score,
            "route ready"
        );

        self.route = candidate.path;
        self.route_origin = Some(candidate.origin);
        self.summary = Some(summary);
        self.loading = false;
        true
    }

    /// Runs the whole generation in place. Does nothing without both endpoints.
    pub async fn generate_route<R: Rng>(&mut self, chain: &FallbackChain, rng: &mut R) {
        let Some(ticket) = self.begin_route() else {
            return;
        };
        let candidate = chain.resolve(ticket.start, ticket.end, rng).await;
        self.complete_route(ticket, candidate, rng);
    }
}
