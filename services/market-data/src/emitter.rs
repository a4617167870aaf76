//! Best-effort event broadcast
//!
//! Fans events out to subscribers over a `tokio::sync::broadcast` channel.
//! The engine publishes strictly after WAL durability; the emitter never
//! blocks it. No subscribers, or a subscriber that has lagged off the end
//! of the ring buffer, is logged and otherwise ignored.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::{MarketEvent, SnapshotEvent, TradeEvent};

/// Default ring-buffer capacity per subscriber.
pub const DEFAULT_CAPACITY: usize = 4_096;

/// Broadcast hub for trade and snapshot events.
pub struct EventEmitter {
    tx: broadcast::Sender<MarketEvent>,
}

impl EventEmitter {
    /// Create an emitter with the given ring-buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish one trade event.
    pub fn publish_trade(&self, event: TradeEvent) {
        self.publish(MarketEvent::Trade(event));
    }

    /// Publish a batch of trade events in execution order.
    pub fn publish_trades(&self, events: impl IntoIterator<Item = TradeEvent>) {
        for event in events {
            self.publish_trade(event);
        }
    }

    /// Publish a depth snapshot.
    pub fn publish_snapshot(&self, event: SnapshotEvent) {
        self.publish(MarketEvent::Snapshot(event));
    }

    fn publish(&self, event: MarketEvent) {
        let label = event.label();
        let lsn = event.lsn();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(label, lsn, receivers, "event published");
            }
            Err(_) => {
                // No subscribers; broadcast is best-effort
                warn!(label, lsn, "event dropped, no subscribers");
            }
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::OrderId;
    use types::numeric::{Price, Quantity};
    use types::trade::Trade;

    fn trade_event(lsn: u64) -> TradeEvent {
        let trade = Trade::new(
            OrderId::new(),
            OrderId::new(),
            Price::new(10_000),
            Quantity::new(1),
            0,
        );
        TradeEvent::from_trade(lsn, &trade)
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let emitter = EventEmitter::new(16);
        let mut rx = emitter.subscribe();

        emitter.publish_trades(vec![trade_event(1), trade_event(2)]);
        emitter.publish_snapshot(SnapshotEvent {
            lsn: 2,
            ts: 0,
            bids: vec![],
            asks: vec![],
        });

        assert_eq!(rx.recv().await.unwrap().lsn(), 1);
        assert_eq!(rx.recv().await.unwrap().lsn(), 2);
        assert!(matches!(
            rx.recv().await.unwrap(),
            MarketEvent::Snapshot(_)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_fail() {
        let emitter = EventEmitter::new(16);
        assert_eq!(emitter.subscriber_count(), 0);
        // Must not panic or error
        emitter.publish_trade(trade_event(1));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let emitter = EventEmitter::new(16);
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();

        emitter.publish_trade(trade_event(9));

        assert_eq!(rx1.recv().await.unwrap().lsn(), 9);
        assert_eq!(rx2.recv().await.unwrap().lsn(), 9);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_does_not_block_publisher() {
        let emitter = EventEmitter::new(2);
        let mut rx = emitter.subscribe();

        // Overflow the ring buffer
        for lsn in 1..=5 {
            emitter.publish_trade(trade_event(lsn));
        }

        // The slow subscriber observes a lag error, then the newest events
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(missed)) => assert!(missed > 0),
            other => panic!("expected lag, got {:?}", other),
        }
        assert_eq!(rx.recv().await.unwrap().lsn(), 4);
    }
}
