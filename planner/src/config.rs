use std::time::Duration;

use shared::Coordinate;

pub const DEFAULT_API_ROOT: &str = "https://smartroute-ai.onrender.com";
pub const DEFAULT_DIRECTIONS_URL: &str =
    "https://api.openrouteservice.org/v2/directions/driving-car/geojson";
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_LOG_DIRECTIVES: &str = "planner=debug,frontend=debug";

const CARTO_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";

/// Raster basemap served as `{s}/{z}/{x}/{y}` tiles.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TileSource {
    pub url_template: String,
    pub attribution: String,
    pub subdomains: String,
    pub max_zoom: u8,
}

impl TileSource {
    fn carto(style: &str) -> Self {
        Self {
            url_template: format!("https://{{s}}.basemaps.cartocdn.com/{style}/{{z}}/{{x}}/{{y}}{{r}}.png"),
            attribution: CARTO_ATTRIBUTION.to_string(),
            subdomains: "abcd".to_string(),
            max_zoom: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// SmartRoute service root, without trailing slash.
    pub api_root: String,
    pub directions_url: String,
    pub directions_api_key: Option<String>,
    /// OSRM server root, without trailing slash.
    pub osrm_url: String,
    pub light_tiles: TileSource,
    pub dark_tiles: TileSource,
    pub initial_center: Coordinate,
    pub initial_zoom: u8,
    pub hover_dwell: Duration,
    pub monitor_interval: Duration,
    /// Ignored on wasm, where the browser owns request timeouts.
    pub request_timeout: Duration,
    pub log_directives: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            directions_url: DEFAULT_DIRECTIONS_URL.to_string(),
            directions_api_key: None,
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            light_tiles: TileSource::carto("light_all"),
            dark_tiles: TileSource::carto("dark_all"),
            // Delhi
            initial_center: Coordinate::new(28.6139, 77.2090),
            initial_zoom: 10,
            hover_dwell: Duration::from_secs(3),
            monitor_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            log_directives: DEFAULT_LOG_DIRECTIVES.to_string(),
        }
    }
}

impl PlannerConfig {
    /// Defaults overridden by `SMARTROUTE_*` variables present at compile time.
    ///
    /// The wasm bundle has no process environment, so overrides are baked in
    /// when the frontend is built.
    pub fn from_build_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = option_env!("SMARTROUTE_API_ROOT") {
            config.api_root = trim_root(url);
        }
        if let Some(url) = option_env!("SMARTROUTE_DIRECTIONS_URL") {
            config.directions_url = url.to_string();
        }
        if let Some(key) = option_env!("SMARTROUTE_DIRECTIONS_KEY") {
            config.directions_api_key = Some(key.to_string()).filter(|k| !k.is_empty());
        }
        if let Some(url) = option_env!("SMARTROUTE_OSRM_URL") {
            config.osrm_url = trim_root(url);
        }
        if let Some(directives) = option_env!("SMARTROUTE_LOG") {
            config.log_directives = directives.to_string();
        }
        config
    }

    pub fn with_api_root(mut self, root: &str) -> Self {
        self.api_root = trim_root(root);
        self
    }

    pub fn tiles(&self, dark: bool) -> &TileSource {
        if dark { &self.dark_tiles } else { &self.light_tiles }
    }
}

fn trim_root(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.hover_dwell, Duration::from_secs(3));
        assert_eq!(config.monitor_interval, Duration::from_secs(10));
        assert!(config.light_tiles.url_template.contains("light_all"));
        assert!(config.dark_tiles.url_template.contains("dark_all"));
        assert!(config.tiles(true).attribution.contains("OpenStreetMap"));
    }

    #[test]
    fn test_api_root_is_trimmed() {
        let config = PlannerConfig::default().with_api_root("http://127.0.0.1:9000///");
        assert_eq!(config.api_root, "http://127.0.0.1:9000");
    }
}
