//! Client-side planning logic for SmartRoute: route/grid state, the routing
//! fallback chain, derived statistics and the map layer model.
//!
//! Everything here builds for native targets and `wasm32-unknown-unknown`;
//! the Seed frontend is a thin shell over it.

pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod hover;
pub mod scene;
pub mod sidebar;
pub mod sources;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use client::{ImageUpload, SmartRouteClient};
pub use config::PlannerConfig;
pub use error::PlannerError;
pub use fallback::FallbackChain;
pub use hover::HoverTracker;
pub use scene::{MapCommand, MapRenderer, Theme};
pub use sources::{RouteCandidate, RouteOrigin, RouteSource};
pub use stats::RouteSummary;
pub use store::{RouteStore, RouteTicket, SelectionMode};
