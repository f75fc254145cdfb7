//! Randomized comparison against a reference implementation.
//!
//! A naive but obviously-correct book processes the same command stream;
//! after every command the engine must agree with it on best prices, open
//! order count, and per-level depth, and the engine's own invariants must
//! hold.

use matchbook::{
    EngineConfig, EngineEvent, LimitBook, MatchingEngine, Order, OrderId, SimClock, Side,
    TickPrice, TimeSource,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Straightforward price-time-priority book used as the oracle.
struct ReferenceBook {
    bids: BTreeMap<i64, Vec<(OrderId, u64)>>, // price -> [(id, remaining)]
    asks: BTreeMap<i64, Vec<(OrderId, u64)>>,
    orders: HashMap<OrderId, (Side, i64)>,
}

impl ReferenceBook {
    fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
        }
    }

    fn best_bid(&self) -> Option<i64> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask(&self) -> Option<i64> {
        self.asks.keys().next().copied()
    }

    fn place(&mut self, id: OrderId, side: Side, price: i64, mut qty: u64) -> bool {
        if self.orders.contains_key(&id) {
            return false;
        }

        match side {
            Side::Buy => {
                let mut emptied = Vec::new();
                let ask_prices: Vec<_> = self.asks.keys().copied().collect();
                for ask_price in ask_prices {
                    if ask_price > price || qty == 0 {
                        break;
                    }
                    let queue = self.asks.get_mut(&ask_price).unwrap();
                    while !queue.is_empty() && qty > 0 {
                        let fill = queue[0].1.min(qty);
                        queue[0].1 -= fill;
                        qty -= fill;
                        if queue[0].1 == 0 {
                            let (maker_id, _) = queue.remove(0);
                            self.orders.remove(&maker_id);
                        }
                    }
                    if queue.is_empty() {
                        emptied.push(ask_price);
                    }
                }
                for p in emptied {
                    self.asks.remove(&p);
                }
                if qty > 0 {
                    self.bids.entry(price).or_default().push((id, qty));
                    self.orders.insert(id, (Side::Buy, price));
                }
            }
            Side::Sell => {
                let mut emptied = Vec::new();
                let bid_prices: Vec<_> = self.bids.keys().rev().copied().collect();
                for bid_price in bid_prices {
                    if bid_price < price || qty == 0 {
                        break;
                    }
                    let queue = self.bids.get_mut(&bid_price).unwrap();
                    while !queue.is_empty() && qty > 0 {
                        let fill = queue[0].1.min(qty);
                        queue[0].1 -= fill;
                        qty -= fill;
                        if queue[0].1 == 0 {
                            let (maker_id, _) = queue.remove(0);
                            self.orders.remove(&maker_id);
                        }
                    }
                    if queue.is_empty() {
                        emptied.push(bid_price);
                    }
                }
                for p in emptied {
                    self.bids.remove(&p);
                }
                if qty > 0 {
                    self.asks.entry(price).or_default().push((id, qty));
                    self.orders.insert(id, (Side::Sell, price));
                }
            }
        }
        true
    }

    fn cancel(&mut self, id: OrderId) -> bool {
        let Some((side, price)) = self.orders.remove(&id) else {
            return false;
        };
        let book = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(queue) = book.get_mut(&price) {
            queue.retain(|(qid, _)| *qid != id);
            if queue.is_empty() {
                book.remove(&price);
            }
        }
        true
    }

    fn depth_at(&self, side: Side, price: i64) -> u64 {
        let book = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        book.get(&price)
            .map(|q| q.iter().map(|(_, qty)| qty).sum())
            .unwrap_or(0)
    }
}

/// Engine-side invariants, checked at a quiescent point.
fn audit(book: &LimitBook) {
    let mut slots = 0usize;
    for levels in [&book.bids, &book.asks] {
        for (price, level) in levels.iter() {
            assert!(!level.is_empty(), "empty level left at {price}");
            let sum: u64 = level.iter().map(|r| r.remaining_qty).sum();
            assert_eq!(level.total_qty(), sum, "total_qty out of sync at {price}");
            slots += level.len();
        }
    }
    assert_eq!(slots, book.total_orders());

    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
        assert!(bid < ask, "crossed book");
    }
}

fn compare(engine: &MatchingEngine, reference: &ReferenceBook) {
    assert_eq!(
        engine.book().best_bid().map(|p| p.ticks()),
        reference.best_bid(),
        "best bid diverged"
    );
    assert_eq!(
        engine.book().best_ask().map(|p| p.ticks()),
        reference.best_ask(),
        "best ask diverged"
    );
    assert_eq!(
        engine.book().total_orders(),
        reference.orders.len(),
        "open order count diverged"
    );

    let depth = engine.depth(usize::MAX);
    for level in &depth.bids {
        assert_eq!(
            level.qty,
            reference.depth_at(Side::Buy, level.price.ticks()),
            "bid depth diverged at {}",
            level.price
        );
    }
    for level in &depth.asks {
        assert_eq!(
            level.qty,
            reference.depth_at(Side::Sell, level.price.ticks()),
            "ask depth diverged at {}",
            level.price
        );
    }
}

fn run_fuzz(seed: u64, steps: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let clock = Arc::new(SimClock::new());
    let mut engine = MatchingEngine::with_clock(EngineConfig::default(), clock.clone());
    let mut reference = ReferenceBook::new();
    let mut events = Vec::new();

    let mut active: Vec<OrderId> = Vec::new();
    let mut next_id = 1u64;

    for step in 0..steps {
        clock.set(step as u64 * 100);

        if active.is_empty() || rng.gen_bool(0.7) {
            let id = next_id;
            next_id += 1;
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let ticks = rng.gen_range(9_900..10_100);
            let qty = rng.gen_range(1..200);

            let engine_ok = engine.submit(Order::limit(
                id,
                side,
                TickPrice::new(ticks),
                qty,
                clock.now_ns(),
            ));
            let reference_ok = reference.place(id, side, ticks, qty);
            assert_eq!(engine_ok, reference_ok, "submit outcome diverged at step {step}");
            active.push(id);
        } else {
            let idx = rng.gen_range(0..active.len());
            let id = active.swap_remove(idx);

            // Both sides may have already filled the order; outcomes must
            // still agree.
            let engine_ok = engine.cancel(id);
            let reference_ok = reference.cancel(id);
            assert_eq!(engine_ok, reference_ok, "cancel outcome diverged at step {step}");
        }

        engine.poll_events(&mut events);
        audit(engine.book());
        compare(&engine, &reference);
    }
}

#[test]
fn test_fuzz_against_reference_small() {
    run_fuzz(0x5EED_0001, 2_000);
}

#[test]
fn test_fuzz_against_reference_multiple_seeds() {
    for seed in [1u64, 7, 42, 1337, 0xFFFF_FFFF] {
        run_fuzz(seed, 500);
    }
}

#[test]
fn test_fuzz_wide_price_range() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let clock = Arc::new(SimClock::new());
    let mut engine = MatchingEngine::with_clock(EngineConfig::default(), clock);
    let mut events = Vec::new();

    // Sparse levels: almost every order makes and abandons its own level.
    for id in 1..=2_000u64 {
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let ticks = rng.gen_range(1_000..1_000_000);
        let qty = rng.gen_range(1..50);
        engine.submit(Order::limit(id, side, TickPrice::new(ticks), qty, id));
        engine.poll_events(&mut events);
        audit(engine.book());
    }
}

#[test]
fn test_event_stream_has_no_interleaving() {
    // Trades of one submit stay contiguous between its Accepted and BookTop.
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let clock = Arc::new(SimClock::new());
    let mut engine = MatchingEngine::with_clock(EngineConfig::default(), clock);
    let mut events = Vec::new();

    for id in 1..=500u64 {
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let ticks = rng.gen_range(9_990..10_010);
        let qty = rng.gen_range(1..100);
        let ok = engine.submit(Order::limit(id, side, TickPrice::new(ticks), qty, id));

        engine.poll_events(&mut events);
        if ok {
            assert!(matches!(events.first(), Some(EngineEvent::Accepted(a)) if a.id == id));
            assert!(matches!(events.last(), Some(EngineEvent::BookTop(_))));
            for middle in &events[1..events.len() - 1] {
                assert!(matches!(middle, EngineEvent::Trade(t) if t.taker_id == id));
            }
        }
    }
}
