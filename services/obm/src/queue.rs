//! Ingress queue contract
//!
//! The engine consumes normalized request messages from an ordered,
//! at-least-once queue with per-message acknowledgment, and answers on the
//! queue's reply channel. The transport is deployment-specific; the
//! [`RequestQueue`] trait is the seam, and [`in_memory`] provides the
//! implementation used by tests and local runs.
//!
//! Acknowledgment is sent only after the engine's WAL flush, so an unacked
//! message is redelivered after a crash and absorbed idempotently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use matching_engine::requests::{EngineRequest, Reply, RequestKind};
use types::ids::{OrderId, RequestId};

/// Order payload of an ingress message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressOrder {
    /// Required for modify/cancel; optional on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    /// +1 buy, -1 sell
    pub side: i8,
    pub price_paise: u64,
    pub qty: u64,
}

/// Operation requested by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IngressOp {
    Insert,
    Modify,
    Cancel,
}

/// One message on the ingress queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRequest {
    pub request_id: RequestId,
    /// Producer-side timestamp
    pub ts: DateTime<Utc>,
    pub op: IngressOp,
    pub order: IngressOrder,
}

impl IngressRequest {
    /// Normalize into the engine's request shape.
    ///
    /// Raw wire values pass through untouched; the engine owns validation
    /// so a bad side or zero price becomes a rejected reply.
    pub fn to_engine_request(&self) -> EngineRequest {
        let kind = match self.op {
            IngressOp::Insert => RequestKind::Insert {
                order_id: self.order.id,
                side: self.order.side,
                price_paise: self.order.price_paise,
                qty: self.order.qty,
            },
            IngressOp::Modify => RequestKind::Modify {
                order_id: self.order.id,
                new_price_paise: self.order.price_paise,
            },
            IngressOp::Cancel => RequestKind::Cancel {
                order_id: self.order.id,
            },
        };
        EngineRequest {
            request_id: self.request_id,
            kind,
        }
    }
}

/// Transport-assigned redelivery handle.
pub type DeliveryTag = u64;

/// A delivered message awaiting acknowledgment.
#[derive(Debug)]
pub struct QueueMessage {
    pub delivery: DeliveryTag,
    pub request: IngressRequest,
}

/// Ordered, at-least-once ingress transport with per-message ack.
///
/// Must be consumed by exactly one engine instance.
#[async_trait]
pub trait RequestQueue: Send {
    /// Next message, or `None` when the transport has closed.
    async fn recv(&mut self) -> Option<QueueMessage>;

    /// Acknowledge a processed message; sent only after WAL flush.
    async fn ack(&mut self, delivery: DeliveryTag);

    /// Answer the producer.
    async fn reply(&mut self, reply: Reply);
}

/// Build an in-memory queue and its producer handle.
pub fn in_memory(capacity: usize) -> (InMemoryQueue, QueueProducer) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    (
        InMemoryQueue {
            requests: request_rx,
            next_delivery: 1,
            acks: ack_tx,
            replies: reply_tx,
        },
        QueueProducer {
            requests: request_tx,
            acks: ack_rx,
            replies: reply_rx,
        },
    )
}

/// Engine-side half of the in-memory queue.
pub struct InMemoryQueue {
    requests: mpsc::Receiver<IngressRequest>,
    next_delivery: DeliveryTag,
    acks: mpsc::UnboundedSender<DeliveryTag>,
    replies: mpsc::UnboundedSender<Reply>,
}

#[async_trait]
impl RequestQueue for InMemoryQueue {
    async fn recv(&mut self) -> Option<QueueMessage> {
        let request = self.requests.recv().await?;
        let delivery = self.next_delivery;
        self.next_delivery += 1;
        Some(QueueMessage { delivery, request })
    }

    async fn ack(&mut self, delivery: DeliveryTag) {
        let _ = self.acks.send(delivery);
    }

    async fn reply(&mut self, reply: Reply) {
        let _ = self.replies.send(reply);
    }
}

/// Producer-side half: submit requests, observe replies and acks.
pub struct QueueProducer {
    requests: mpsc::Sender<IngressRequest>,
    acks: mpsc::UnboundedReceiver<DeliveryTag>,
    replies: mpsc::UnboundedReceiver<Reply>,
}

impl QueueProducer {
    /// Enqueue a request; false when the consumer is gone.
    pub async fn submit(&self, request: IngressRequest) -> bool {
        self.requests.send(request).await.is_ok()
    }

    /// Await the next reply.
    pub async fn next_reply(&mut self) -> Option<Reply> {
        self.replies.recv().await
    }

    /// Await the next acknowledgment.
    pub async fn next_ack(&mut self) -> Option<DeliveryTag> {
        self.acks.recv().await
    }
}
