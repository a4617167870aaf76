//! Service configuration from the process environment

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Runtime configuration for the OBM service.
#[derive(Debug, Clone)]
pub struct ObmConfig {
    /// WAL file location (`OBM_WAL_PATH`)
    pub wal_path: PathBuf,
    /// Snapshot cadence (`OBM_SNAPSHOT_INTERVAL_MS`)
    pub snapshot_interval: Duration,
    /// Depth levels per side in snapshots (`OBM_SNAPSHOT_DEPTH`)
    pub snapshot_depth: usize,
    /// Recent-request-id window for idempotency (`OBM_DEDUP_WINDOW`)
    pub dedup_window: usize,
    /// Broadcast ring-buffer capacity (`OBM_EVENT_CAPACITY`)
    pub event_capacity: usize,
}

impl Default for ObmConfig {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from("data/wal.bin"),
            snapshot_interval: Duration::from_secs(1),
            snapshot_depth: 50,
            dedup_window: 10_000,
            event_capacity: 4_096,
        }
    }
}

impl ObmConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            wal_path: std::env::var("OBM_WAL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.wal_path),
            snapshot_interval: Duration::from_millis(parse_var(
                "OBM_SNAPSHOT_INTERVAL_MS",
                defaults.snapshot_interval.as_millis() as u64,
            )),
            snapshot_depth: parse_var("OBM_SNAPSHOT_DEPTH", defaults.snapshot_depth),
            dedup_window: parse_var("OBM_DEDUP_WINDOW", defaults.dedup_window),
            event_capacity: parse_var("OBM_EVENT_CAPACITY", defaults.event_capacity),
        }
    }
}

fn parse_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(name, raw = %raw, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}
