//! Single-writer run loop
//!
//! Owns the engine on one task. Each iteration either processes one queue
//! message to completion (validate, WAL, match, flush, emit, reply, ack)
//! or publishes a depth snapshot on the cadence tick. On shutdown the
//! in-flight request finishes, WAL flush included, before the loop exits.

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use market_data::{EventEmitter, MarketEvent, SnapshotEvent, TradeEvent};
use matching_engine::{EngineError, EngineOptions, MatchingEngine};

use crate::config::ObmConfig;
use crate::queue::{QueueMessage, RequestQueue};

/// Current wall-clock time in Unix nanoseconds.
pub fn now_nanos() -> i64 {
    Utc::now()
        .timestamp_nanos_opt()
        .expect("wall clock outside the nanosecond range")
}

/// The assembled OBM service.
pub struct ObmService<Q: RequestQueue> {
    engine: MatchingEngine,
    emitter: EventEmitter,
    queue: Q,
    config: ObmConfig,
}

impl<Q: RequestQueue> ObmService<Q> {
    /// Recover from the WAL and assemble the service.
    ///
    /// Runs the full recovery flow before the queue consumer opens.
    pub fn start(config: ObmConfig, queue: Q) -> Result<Self, EngineError> {
        let options = EngineOptions {
            dedup_window: config.dedup_window,
        };
        let (engine, report) = MatchingEngine::open(&config.wal_path, options)?;
        info!(
            records_replayed = report.records_replayed,
            last_lsn = report.last_lsn,
            live_orders = report.live_orders,
            tail_truncated = report.tail_truncated,
            "engine recovered"
        );

        Ok(Self {
            engine,
            emitter: EventEmitter::new(config.event_capacity),
            queue,
            config,
        })
    }

    /// Subscribe to broadcast events; call before [`run`].
    ///
    /// [`run`]: ObmService::run
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.emitter.subscribe()
    }

    /// Drive the loop until shutdown is signaled or the queue closes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), EngineError> {
        // Initial snapshot after recovery, then the cadence takes over
        self.publish_snapshot();

        let period = self.config.snapshot_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("consuming ingress queue");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("shutdown signaled, halting before next dequeue");
                    break;
                }
                message = self.queue.recv() => {
                    match message {
                        Some(message) => self.handle(message).await?,
                        None => {
                            info!("ingress queue closed");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => self.publish_snapshot(),
            }
        }
        Ok(())
    }

    /// Process one message end to end.
    async fn handle(&mut self, message: QueueMessage) -> Result<(), EngineError> {
        let request = message.request.to_engine_request();
        let report = self.engine.process(request, now_nanos())?;

        // process() returned, so every record is durable; events may flow
        self.emitter.publish_trades(
            report
                .trades
                .iter()
                .map(|fill| TradeEvent::from_trade(fill.lsn, &fill.trade)),
        );
        self.queue.reply(report.reply).await;
        self.queue.ack(message.delivery).await;
        Ok(())
    }

    fn publish_snapshot(&self) {
        let snapshot = self
            .engine
            .depth_snapshot(self.config.snapshot_depth, now_nanos());
        self.emitter.publish_snapshot(SnapshotEvent {
            lsn: snapshot.lsn,
            ts: snapshot.timestamp,
            bids: snapshot
                .bids
                .into_iter()
                .map(|(price, qty)| (price.paise(), qty))
                .collect(),
            asks: snapshot
                .asks
                .into_iter()
                .map(|(price, qty)| (price.paise(), qty))
                .collect(),
        });
    }
}
