//! WAL record types and binary framing
//!
//! # Binary Format (per frame)
//! ```text
//! [len:      u32 LE]  // payload length in bytes
//! [crc32c:   u32 LE]  // CRC32C over the payload
//! [payload: len bytes]
//! ```
//! Payload byte 0 is the format version; the remainder is the bincode
//! encoding of [`WalRecord`]. LSNs are assigned by the writer, strictly
//! increasing by 1 from 1, and persisted inside the record.

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::{Order, OrderStatus};
use types::trade::Trade;

/// Log sequence number
pub type Lsn = u64;

/// On-disk payload format version (payload byte 0)
pub const WAL_FORMAT_VERSION: u8 = 1;

/// Frame header size: length prefix + checksum
pub const FRAME_HEADER_LEN: usize = 8;

/// Upper bound on a sane payload length; anything larger is treated as a
/// damaged length prefix.
const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// A single WAL record: one intended state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Strictly increasing from 1, assigned by the writer
    pub lsn: Lsn,
    /// Unix nanos at append time
    pub timestamp: i64,
    pub op: WalOp,
}

/// Operation kinds recorded in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalOp {
    /// Full order state as accepted, before any matching
    OrderInsert(Order),
    /// Price change; the order is re-seated with renewed time priority
    OrderModify {
        order_id: OrderId,
        new_price: Price,
        new_arrival_seq: u64,
    },
    OrderCancel {
        order_id: OrderId,
    },
    Trade(Trade),
    /// Per-order consequence of a trade, emitted once per order per trade
    OrderUpdate {
        order_id: OrderId,
        traded_qty: u64,
        avg_traded_price: Option<Price>,
        status: OrderStatus,
    },
}

impl WalOp {
    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            WalOp::OrderInsert(_) => "ORDER_INSERT",
            WalOp::OrderModify { .. } => "ORDER_MODIFY",
            WalOp::OrderCancel { .. } => "ORDER_CANCEL",
            WalOp::Trade(_) => "TRADE",
            WalOp::OrderUpdate { .. } => "ORDER_UPDATE",
        }
    }
}

/// Frame-level decode failures
///
/// `Truncated` and `ImplausibleLength` indicate a frame that cannot be
/// parsed at all; `ChecksumMismatch` a frame whose bytes are present but
/// damaged. The reader decides whether a failure is a recoverable torn
/// tail or fatal mid-log corruption based on its position in the file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("truncated frame: have {have} bytes, need {need}")]
    Truncated { have: usize, need: usize },

    #[error("implausible payload length {0} (damaged length prefix)")]
    ImplausibleLength(u32),

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("malformed record payload: {0}")]
    Malformed(String),
}

impl WalRecord {
    /// Encode into a complete frame (header + payload).
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        let mut payload = Vec::with_capacity(128);
        payload.push(WAL_FORMAT_VERSION);
        bincode::serialize_into(&mut payload, self)?;

        let crc = crc32c(&payload);
        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decode one frame from the front of `data`.
    ///
    /// Returns `(record, bytes_consumed)` on success.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), FrameError> {
        if data.len() < FRAME_HEADER_LEN {
            return Err(FrameError::Truncated {
                have: data.len(),
                need: FRAME_HEADER_LEN,
            });
        }

        let len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if len == 0 || len > MAX_PAYLOAD_LEN {
            return Err(FrameError::ImplausibleLength(len));
        }

        let total = FRAME_HEADER_LEN + len as usize;
        if data.len() < total {
            return Err(FrameError::Truncated {
                have: data.len(),
                need: total,
            });
        }

        let stored = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let payload = &data[FRAME_HEADER_LEN..total];
        let computed = crc32c(payload);
        if stored != computed {
            return Err(FrameError::ChecksumMismatch { stored, computed });
        }

        if payload[0] != WAL_FORMAT_VERSION {
            return Err(FrameError::UnsupportedVersion(payload[0]));
        }

        let record: WalRecord = bincode::deserialize(&payload[1..])
            .map_err(|e| FrameError::Malformed(e.to_string()))?;
        Ok((record, total))
    }

    /// Total frame length for a frame starting at `data`, if the length
    /// prefix is readable.
    pub fn frame_len(data: &[u8]) -> Option<usize> {
        if data.len() < 4 {
            return None;
        }
        let len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if len == 0 || len > MAX_PAYLOAD_LEN {
            return None;
        }
        Some(FRAME_HEADER_LEN + len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::OrderId;
    use types::numeric::Quantity;
    use types::order::Side;

    const TS: i64 = 1_708_123_456_789_000_000;

    fn sample_order() -> Order {
        Order::new(
            OrderId::new(),
            Side::Buy,
            Price::new(10_000),
            Quantity::new(10),
            1,
            TS,
        )
    }

    fn sample_record(lsn: Lsn, op: WalOp) -> WalRecord {
        WalRecord {
            lsn,
            timestamp: TS + lsn as i64,
            op,
        }
    }

    #[test]
    fn test_encode_decode_roundtrip_all_ops() {
        let order = sample_order();
        let trade = Trade::new(
            OrderId::new(),
            OrderId::new(),
            Price::new(10_100),
            Quantity::new(5),
            TS,
        );
        let ops = vec![
            WalOp::OrderInsert(order.clone()),
            WalOp::OrderModify {
                order_id: order.id,
                new_price: Price::new(10_100),
                new_arrival_seq: 2,
            },
            WalOp::OrderCancel { order_id: order.id },
            WalOp::Trade(trade),
            WalOp::OrderUpdate {
                order_id: order.id,
                traded_qty: 5,
                avg_traded_price: Some(Price::new(10_100)),
                status: OrderStatus::PartiallyFilled,
            },
        ];

        for (i, op) in ops.into_iter().enumerate() {
            let record = sample_record(i as Lsn + 1, op);
            let frame = record.encode().unwrap();
            let (decoded, consumed) = WalRecord::decode(&frame).unwrap();
            assert_eq!(consumed, frame.len());
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn test_decode_detects_payload_tamper() {
        let record = sample_record(1, WalOp::OrderInsert(sample_order()));
        let mut frame = record.encode().unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;

        match WalRecord::decode(&frame) {
            Err(FrameError::ChecksumMismatch { .. }) => {}
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_truncated_frame() {
        let record = sample_record(1, WalOp::OrderCancel {
            order_id: OrderId::new(),
        });
        let frame = record.encode().unwrap();

        match WalRecord::decode(&frame[..frame.len() - 3]) {
            Err(FrameError::Truncated { .. }) => {}
            other => panic!("expected truncated, got {:?}", other),
        }
        match WalRecord::decode(&frame[..5]) {
            Err(FrameError::Truncated { .. }) => {}
            other => panic!("expected truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_implausible_length() {
        let mut frame = vec![0u8; 16];
        frame[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        match WalRecord::decode(&frame) {
            Err(FrameError::ImplausibleLength(_)) => {}
            other => panic!("expected implausible length, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let record = sample_record(1, WalOp::OrderCancel {
            order_id: OrderId::new(),
        });
        let mut frame = record.encode().unwrap();
        frame[FRAME_HEADER_LEN] = 99; // version byte
        // Checksum now fails first, so recompute it over the tampered payload
        let crc = crc32c(&frame[FRAME_HEADER_LEN..]);
        frame[4..8].copy_from_slice(&crc.to_le_bytes());

        match WalRecord::decode(&frame) {
            Err(FrameError::UnsupportedVersion(99)) => {}
            other => panic!("expected unsupported version, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_len() {
        let record = sample_record(1, WalOp::OrderInsert(sample_order()));
        let frame = record.encode().unwrap();
        assert_eq!(WalRecord::frame_len(&frame), Some(frame.len()));
        assert_eq!(WalRecord::frame_len(&frame[..2]), None);
    }

    #[test]
    fn test_op_labels() {
        assert_eq!(
            WalOp::OrderCancel {
                order_id: OrderId::new()
            }
            .label(),
            "ORDER_CANCEL"
        );
        assert_eq!(WalOp::OrderInsert(sample_order()).label(), "ORDER_INSERT");
    }
}
