use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use crate::models::coordinate::Coordinate;
use crate::tracking::live_source::WatchOptions;

pub const DEFAULT_ORIGIN: Coordinate = Coordinate::new(37.5665, 126.978);
pub const DEFAULT_DELTA: f64 = 0.0001;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_ZOOM: u8 = 16;

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub origin: Coordinate,
    pub delta: f64,
    pub tick_interval: Duration,
    pub watch_options: WatchOptions,
    pub zoom: u8,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN,
            delta: DEFAULT_DELTA,
            tick_interval: DEFAULT_TICK_INTERVAL,
            watch_options: WatchOptions::default(),
            zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_concurrent_sessions: usize,
    pub storage_dir: Option<PathBuf>,
    pub tracking: TrackingConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = TrackingConfig::default();
        let origin = Coordinate::try_new(
            parsed("ORIGIN_LAT", defaults.origin.latitude),
            parsed("ORIGIN_LNG", defaults.origin.longitude),
        )
        .unwrap_or_else(|e| {
            warn!("Ignoring configured origin: {}", e);
            defaults.origin
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 3000),
            max_concurrent_sessions: parsed("MAX_CONCURRENT_SESSIONS", 10_000),
            storage_dir: env::var("TRACKER_STORAGE_DIR").ok().map(PathBuf::from),
            tracking: TrackingConfig {
                origin,
                delta: parsed("MANUAL_DELTA", defaults.delta),
                tick_interval: Duration::from_millis(parsed("TICK_INTERVAL_MS", 16u64).max(1)),
                ..defaults
            },
        }
    }
}

fn parsed<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!("Invalid {}={:?}, using {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
