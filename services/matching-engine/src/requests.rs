//! Engine request and reply types
//!
//! The ingress queue delivers normalized requests; the engine validates
//! them (raw wire values included, so a bad side or zero price becomes a
//! rejected reply rather than a transport error) and answers through the
//! queue's reply channel.

use serde::{Deserialize, Serialize};
use types::errors::RejectReason;
use types::ids::{OrderId, RequestId};
use types::trade::Trade;

use persistence::record::Lsn;

/// A normalized request as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRequest {
    pub request_id: RequestId,
    pub kind: RequestKind,
}

/// Operation payloads, still carrying raw wire values for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Insert {
        /// Producer-assigned id; generated by the engine when absent
        order_id: Option<OrderId>,
        /// Wire encoding: +1 buy, -1 sell
        side: i8,
        price_paise: u64,
        qty: u64,
    },
    Modify {
        order_id: Option<OrderId>,
        new_price_paise: u64,
    },
    Cancel {
        order_id: Option<OrderId>,
    },
}

/// Reply status on the queue's reply channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplyStatus {
    Ok,
    Rejected,
}

/// Reply returned to the producer for every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub request_id: RequestId,
    pub status: ReplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Reply {
    /// Successful reply
    pub fn ok(request_id: RequestId) -> Self {
        Self {
            request_id,
            status: ReplyStatus::Ok,
            reason: None,
        }
    }

    /// Validation rejection
    pub fn rejected(request_id: RequestId, reason: &RejectReason) -> Self {
        Self {
            request_id,
            status: ReplyStatus::Rejected,
            reason: Some(reason.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }
}

/// A trade together with the LSN of its WAL record, for event emission
/// and consumer deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeFill {
    pub lsn: Lsn,
    pub trade: Trade,
}

/// Everything a completed request produced.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub reply: Reply,
    /// Trades in execution order; empty for rejects, cancels, no-cross
    pub trades: Vec<TradeFill>,
    /// True when the request id was already processed (redelivery)
    pub duplicate: bool,
}

impl ExecutionReport {
    /// Report for a validation rejection
    pub fn rejected(request_id: RequestId, reason: &RejectReason) -> Self {
        Self {
            reply: Reply::rejected(request_id, reason),
            trades: Vec::new(),
            duplicate: false,
        }
    }
}
