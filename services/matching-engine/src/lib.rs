//! Order Book Matching Engine
//!
//! Sequential price-time-priority matching over a single instrument.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced
//! - Every state transition is WAL-durable before it is observable
//! - Deterministic matching (identical WAL input replays to an identical book)
//! - The book is never left crossed after a request completes

pub mod book;
pub mod engine;
pub mod matching;
pub mod recovery;
pub mod requests;

pub use book::{Book, BookError};
pub use engine::{DepthSnapshot, EngineError, EngineOptions, MatchingEngine};
pub use recovery::{recover, RecoveredState, RecoveryError, RecoveryReport};
pub use requests::{EngineRequest, ExecutionReport, Reply, ReplyStatus, RequestKind, TradeFill};
