//! Deployment configuration: which feeds to poll, which platforms to watch,
//! and where the display lives for weather lookups.
//!
//! Defaults describe the Greenpoint deployment (G train at Greenpoint Ave,
//! NYC Ferry at the Greenpoint landing); every value can be overridden
//! through the environment so nothing is compiled in.

use std::env;

use crate::extract::StopTarget;

/// Header name used when a feed requires an API key.
pub const API_KEY_HEADER: &str = "x-api-key";

const DEFAULT_SUBWAY_FEED_URL: &str =
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-g";
const DEFAULT_FERRY_FEED_URL: &str =
    "http://nycferry.connexionz.net/rtt/public/utility/gtfsrealtime.aspx/tripupdate";

// Greenpoint, Brooklyn
const DEFAULT_LATITUDE: f64 = 40.7313;
const DEFAULT_LONGITUDE: f64 = -73.9542;

/// One trip-update feed plus the platforms to watch on it.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Rider-facing name, used in report headers and log fields.
    pub name: String,
    /// Single letter drawn in the route disc on the board image.
    pub badge: String,
    pub url: String,
    /// Sent as [`API_KEY_HEADER`] when present.
    pub api_key: Option<String>,
    /// Target platforms in display order; one entry per direction.
    pub stops: Vec<StopTarget>,
}

#[derive(Debug, Clone, Copy)]
pub struct WeatherConfig {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub subway: FeedConfig,
    pub ferry: FeedConfig,
    pub weather: WeatherConfig,
    pub limit_per_direction: usize,
}

impl BoardConfig {
    /// Builds the deployment configuration, applying environment overrides
    /// (`SUBWAY_FEED_URL`, `SUBWAY_API_KEY`, `FERRY_FEED_URL`, `BOARD_LAT`,
    /// `BOARD_LON`) over the Greenpoint defaults.
    pub fn from_env() -> Self {
        let subway = FeedConfig {
            name: "G Train - Greenpoint Ave".to_string(),
            badge: "G".to_string(),
            url: env_or("SUBWAY_FEED_URL", DEFAULT_SUBWAY_FEED_URL),
            api_key: env::var("SUBWAY_API_KEY").ok(),
            stops: vec![
                StopTarget::new("G26N", "Court Square"),
                StopTarget::new("G26S", "Church Ave"),
            ],
        };

        let ferry = FeedConfig {
            name: "East River Ferry - Greenpoint".to_string(),
            badge: "F".to_string(),
            url: env_or("FERRY_FEED_URL", DEFAULT_FERRY_FEED_URL),
            api_key: None,
            stops: vec![StopTarget::new("18", "Hunters Point")],
        };

        let weather = WeatherConfig {
            latitude: env_parse_or("BOARD_LAT", DEFAULT_LATITUDE),
            longitude: env_parse_or("BOARD_LON", DEFAULT_LONGITUDE),
        };

        BoardConfig {
            subway,
            ferry,
            weather,
            limit_per_direction: 3,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_platform_directions() {
        let config = BoardConfig::from_env();

        assert_eq!(config.subway.stops.len(), 2);
        assert_eq!(config.subway.stops[0].stop_id, "G26N");
        assert_eq!(config.subway.stops[1].stop_id, "G26S");
        assert_eq!(config.ferry.stops.len(), 1);
        assert_eq!(config.ferry.stops[0].stop_id, "18");
    }

    #[test]
    fn test_limit_default() {
        let config = BoardConfig::from_env();
        assert_eq!(config.limit_per_direction, 3);
    }
}
