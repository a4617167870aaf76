//! WAL Store — durable record of every intended state transition
//!
//! Provides typed write-ahead log records, an append-only framed writer
//! with CRC32C checksums and explicit fsync, a replay reader with
//! torn-tail detection, and an exclusive lock file.
//!
//! The WAL is the persistence stream: downstream consumers read exactly
//! these records, in LSN order, and deduplicate by LSN.

pub mod lock;
pub mod reader;
pub mod record;
pub mod wal;

pub use lock::WalLock;
pub use reader::{ReplayOutcome, TornTail, WalReader};
pub use record::{Lsn, WalOp, WalRecord, WAL_FORMAT_VERSION};
pub use wal::{WalError, WalWriter};
