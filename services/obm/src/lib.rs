//! OBM service wiring
//!
//! Connects the ingress queue, the sequential matching engine, and the
//! event emitter into one single-writer run loop:
//!
//! ```text
//! ingress queue ──► MatchingEngine ──► WAL (flush) ──► events ──► ack
//!                        ▲
//!                 1 Hz snapshot tick
//! ```
//!
//! The engine, book, and WAL all live on the run-loop task; the snapshot
//! timer is a branch of the same `select!`, so exactly one request mutates
//! the book at any time.

pub mod config;
pub mod queue;
pub mod service;

pub use config::ObmConfig;
pub use queue::{in_memory, IngressOp, IngressOrder, IngressRequest, QueueProducer, RequestQueue};
pub use service::{now_nanos, ObmService};
