//! End-to-end matching scenarios over a real WAL file.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use matching_engine::{EngineOptions, EngineRequest, MatchingEngine, RequestKind};
use types::ids::{OrderId, RequestId};
use types::numeric::Price;
use types::order::{OrderStatus, Side};

const TS: i64 = 1_708_123_456_789_000_000;

fn open_engine(path: &PathBuf) -> MatchingEngine {
    let (engine, _) = MatchingEngine::open(path, EngineOptions::default()).unwrap();
    engine
}

fn insert_req(order_id: OrderId, side: i8, price: u64, qty: u64) -> EngineRequest {
    EngineRequest {
        request_id: RequestId::new(),
        kind: RequestKind::Insert {
            order_id: Some(order_id),
            side,
            price_paise: price,
            qty,
        },
    }
}

fn modify_req(order_id: OrderId, new_price: u64) -> EngineRequest {
    EngineRequest {
        request_id: RequestId::new(),
        kind: RequestKind::Modify {
            order_id: Some(order_id),
            new_price_paise: new_price,
        },
    }
}

#[test]
fn scenario_no_cross() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");
    let mut engine = open_engine(&path);

    let b1 = OrderId::new();
    let s1 = OrderId::new();
    let r1 = engine.process(insert_req(b1, 1, 10_000, 10), TS).unwrap();
    let r2 = engine.process(insert_req(s1, -1, 10_100, 5), TS + 1).unwrap();

    assert!(r1.trades.is_empty());
    assert!(r2.trades.is_empty());
    assert!(engine.book().contains(&b1));
    assert!(engine.book().contains(&s1));
    assert_eq!(engine.book().best_bid(), Some(Price::new(10_000)));
    assert_eq!(engine.book().best_ask(), Some(Price::new(10_100)));
}

#[test]
fn scenario_exact_cross_full_fill_both_sides() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");
    let mut engine = open_engine(&path);

    let b1 = OrderId::new();
    let s1 = OrderId::new();
    let b2 = OrderId::new();
    engine.process(insert_req(b1, 1, 10_000, 10), TS).unwrap();
    engine.process(insert_req(s1, -1, 10_100, 5), TS + 1).unwrap();
    let report = engine.process(insert_req(b2, 1, 10_100, 5), TS + 2).unwrap();

    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0].trade;
    assert_eq!(trade.price, Price::new(10_100));
    assert_eq!(trade.qty.get(), 5);
    assert_eq!(trade.bid_order_id, b2);
    assert_eq!(trade.ask_order_id, s1);

    // s1 filled and removed, b2 filled and never inserted, b1 unchanged
    assert!(!engine.book().contains(&s1));
    assert!(!engine.book().contains(&b2));
    let b1_order = engine.book().get(&b1).unwrap();
    assert_eq!(b1_order.status, OrderStatus::Open);
    assert_eq!(b1_order.remaining(), 10);
}

#[test]
fn scenario_partial_fill_aggressor_rests() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");
    let mut engine = open_engine(&path);

    let s1 = OrderId::new();
    let b1 = OrderId::new();
    engine.process(insert_req(s1, -1, 10_000, 3), TS).unwrap();
    let report = engine.process(insert_req(b1, 1, 10_000, 10), TS + 1).unwrap();

    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].trade.price, Price::new(10_000));
    assert_eq!(report.trades[0].trade.qty.get(), 3);

    assert!(!engine.book().contains(&s1));
    let b1_order = engine.book().get(&b1).unwrap();
    assert_eq!(b1_order.status, OrderStatus::PartiallyFilled);
    assert_eq!(b1_order.remaining(), 7);
    assert_eq!(b1_order.price, Price::new(10_000));
}

#[test]
fn scenario_price_time_priority() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");
    let mut engine = open_engine(&path);

    let s1 = OrderId::new();
    let s2 = OrderId::new();
    let b1 = OrderId::new();
    engine.process(insert_req(s1, -1, 10_000, 4), TS).unwrap();
    engine.process(insert_req(s2, -1, 10_000, 4), TS + 1).unwrap();
    let report = engine.process(insert_req(b1, 1, 10_000, 6), TS + 2).unwrap();

    assert_eq!(report.trades.len(), 2);
    assert_eq!(report.trades[0].trade.ask_order_id, s1);
    assert_eq!(report.trades[0].trade.qty.get(), 4);
    assert_eq!(report.trades[1].trade.ask_order_id, s2);
    assert_eq!(report.trades[1].trade.qty.get(), 2);

    assert!(!engine.book().contains(&s1));
    let s2_order = engine.book().get(&s2).unwrap();
    assert_eq!(s2_order.status, OrderStatus::PartiallyFilled);
    assert_eq!(s2_order.remaining(), 2);
    assert!(!engine.book().contains(&b1));
}

#[test]
fn scenario_modify_forfeits_priority() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");
    let mut engine = open_engine(&path);

    let s1 = OrderId::new();
    let s2 = OrderId::new();
    let b1 = OrderId::new();
    engine.process(insert_req(s1, -1, 10_000, 5), TS).unwrap();
    engine.process(insert_req(s2, -1, 10_000, 5), TS + 1).unwrap();
    // Re-seat s1; s2 now holds the older arrival sequence at the level
    engine.process(modify_req(s1, 10_000), TS + 2).unwrap();

    let report = engine.process(insert_req(b1, 1, 10_000, 5), TS + 3).unwrap();
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].trade.ask_order_id, s2);

    assert!(!engine.book().contains(&s2));
    assert!(engine.book().contains(&s1));
}

#[test]
fn scenario_crash_recovery_redelivery() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");

    let b1 = OrderId::new();
    let s1 = OrderId::new();
    let s1_request = insert_req(s1, -1, 10_000, 4);

    {
        let mut engine = open_engine(&path);
        engine.process(insert_req(b1, 1, 10_000, 10), TS).unwrap();
    }
    let durable_len = fs::metadata(&path).unwrap().len();
    {
        let mut engine = open_engine(&path);
        let report = engine.process(s1_request.clone(), TS + 1).unwrap();
        assert_eq!(report.trades.len(), 1);
    }

    // Crash before s1's records reached stable storage: drop them
    fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(durable_len)
        .unwrap();

    // Restart: b1 is back at its last durable state, s1 and its trade are gone
    let mut engine = open_engine(&path);
    let b1_order = engine.book().get(&b1).unwrap();
    assert_eq!(b1_order.status, OrderStatus::Open);
    assert_eq!(b1_order.remaining(), 10);
    assert!(!engine.book().contains(&s1));

    // The queue redelivers the unacknowledged request; it applies exactly once
    let report = engine.process(s1_request.clone(), TS + 2).unwrap();
    assert!(!report.duplicate);
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].trade.qty.get(), 4);
    assert_eq!(engine.book().get(&b1).unwrap().remaining(), 6);

    // A second redelivery is absorbed by the idempotency cache
    let replay = engine.process(s1_request, TS + 3).unwrap();
    assert!(replay.duplicate);
    assert!(replay.trades.is_empty());
    assert_eq!(engine.book().get(&b1).unwrap().remaining(), 6);
}

#[test]
fn replay_rebuilds_identical_book() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");

    let ids: Vec<OrderId> = (0..6).map(|_| OrderId::new()).collect();
    let live_snapshot = {
        let mut engine = open_engine(&path);
        engine.process(insert_req(ids[0], 1, 10_000, 10), TS).unwrap();
        engine.process(insert_req(ids[1], 1, 9_900, 5), TS + 1).unwrap();
        engine.process(insert_req(ids[2], -1, 10_100, 8), TS + 2).unwrap();
        engine.process(insert_req(ids[3], -1, 10_000, 4), TS + 3).unwrap(); // crosses ids[0]
        engine.process(modify_req(ids[1], 10_050), TS + 4).unwrap();
        engine
            .process(
                EngineRequest {
                    request_id: RequestId::new(),
                    kind: RequestKind::Cancel {
                        order_id: Some(ids[2]),
                    },
                },
                TS + 5,
            )
            .unwrap();
        engine.process(insert_req(ids[4], -1, 10_040, 2), TS + 6).unwrap(); // crosses re-priced ids[1]
        engine.process(insert_req(ids[5], 1, 9_800, 3), TS + 7).unwrap();

        let mut orders: Vec<_> = engine.book().iter().cloned().collect();
        orders.sort_by_key(|o| o.arrival_seq);
        (
            orders,
            engine.book().depth(Side::Buy, 50),
            engine.book().depth(Side::Sell, 50),
        )
    };

    let recovered = matching_engine::recover(&path).unwrap();
    let mut replayed: Vec<_> = recovered.book.iter().cloned().collect();
    replayed.sort_by_key(|o| o.arrival_seq);

    assert_eq!(replayed, live_snapshot.0);
    assert_eq!(recovered.book.depth(Side::Buy, 50), live_snapshot.1);
    assert_eq!(recovered.book.depth(Side::Sell, 50), live_snapshot.2);
}

#[test]
fn snapshot_matches_independent_aggregation() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wal.bin");
    let mut engine = open_engine(&path);

    for (side, price, qty) in [
        (1, 10_000, 10),
        (1, 10_000, 5),
        (1, 9_900, 7),
        (-1, 10_100, 4),
        (-1, 10_200, 6),
    ] {
        engine
            .process(insert_req(OrderId::new(), side, price, qty), TS)
            .unwrap();
    }

    let snap = engine.depth_snapshot(50, TS + 10);
    assert_eq!(snap.lsn, engine.last_lsn());

    // Independent aggregation over the replayed book
    let recovered = matching_engine::recover(&path).unwrap();
    assert_eq!(snap.bids, recovered.book.depth(Side::Buy, 50));
    assert_eq!(snap.asks, recovered.book.depth(Side::Sell, 50));
    assert_eq!(
        snap.bids,
        vec![(Price::new(10_000), 15), (Price::new(9_900), 7)]
    );
}
