use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_file_size: usize,
    pub cache_ttl: Duration,
    pub catalog_path: PathBuf,
    pub tick_interval: Duration,
    /// Pointer queries farther than this (planar units) from the path get no reading.
    pub cursor_max_distance: Option<f64>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let max_file_size_mb = std::env::var("MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25);

        let cache_ttl_seconds = std::env::var("CACHE_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        let catalog_path = std::env::var("TRACK_CATALOG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/tracks/catalog.json"));

        let tick_ms: u64 = std::env::var("PLAYBACK_TICK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(100);

        let cursor_max_distance = std::env::var("CURSOR_MAX_DISTANCE")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0);

        Self {
            port,
            max_file_size: max_file_size_mb * 1024 * 1024,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            catalog_path,
            tick_interval: Duration::from_millis(tick_ms),
            cursor_max_distance,
        }
    }
}
