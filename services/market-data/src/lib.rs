//! Market Data Service
//!
//! Publishes engine output to downstream consumers:
//! - Trade events, one per fill, immediately after WAL durability
//! - Aggregate depth snapshots on a fixed cadence
//!
//! Delivery is best-effort broadcast: subscriber absence or lag never
//! blocks the engine. Every event carries the originating LSN so consumers
//! can deduplicate across reconnects.

pub mod emitter;
pub mod events;

pub use emitter::EventEmitter;
pub use events::{MarketEvent, SnapshotEvent, TradeEvent};

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
