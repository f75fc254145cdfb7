//! Matching engine: the public façade over one book, one clock, and one
//! event ring.
//!
//! Every operation runs to completion on the caller's thread and pushes its
//! event sequence onto the ring. Emission is best-effort: if the consumer
//! lags past the ring capacity, further events are dropped, not blocked on.

use crate::book::{LimitBook, ReplacePolicy};
use crate::clock::{SimClock, TimeSource};
use crate::events::{
    AcceptEvent, BookTop, DepthSnapshot, EngineEvent, RejectEvent, TradeEvent,
    REASON_ORDER_REJECTED,
};
use crate::order::{Order, OrderId};
use crate::price::TickPrice;
use crate::ring;
use std::sync::Arc;

/// Engine sizing and behavior options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Sizing hint for the order index; not an admission cap.
    pub max_orders: usize,
    /// Requested event ring capacity; rounded up to a power of two.
    pub ring_size: usize,
    /// Real price per tick, used by callers for conversions.
    pub tick_size: f64,
    /// Fate of the original order when a replace's resubmission fails.
    pub replace_policy: ReplacePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_orders: 100_000,
            ring_size: 10_000,
            tick_size: 0.01,
            replace_policy: ReplacePolicy::DropOrder,
        }
    }
}

/// Single-instrument matching engine.
///
/// One producer thread calls [`submit`](Self::submit) /
/// [`cancel`](Self::cancel) / [`replace`](Self::replace); one consumer
/// drains events, either in-thread via [`poll_events`](Self::poll_events) or
/// from a dedicated thread after
/// [`take_event_consumer`](Self::take_event_consumer).
pub struct MatchingEngine {
    config: EngineConfig,
    clock: Arc<dyn TimeSource>,
    book: LimitBook,
    tx: ring::Producer<EngineEvent>,
    rx: Option<ring::Consumer<EngineEvent>>,
    /// Scratch for trades produced by one operation; reused so the hot path
    /// stays allocation-free after warm-up.
    trade_buf: Vec<TradeEvent>,
}

impl MatchingEngine {
    /// Engine with a private simulated clock starting at zero.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SimClock::new()))
    }

    /// Engine reading time from an injected source.
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn TimeSource>) -> Self {
        let (tx, rx) = ring::bounded(config.ring_size);
        Self {
            book: LimitBook::with_capacity(config.tick_size, clock.clone(), config.max_orders),
            config,
            clock,
            tx,
            rx: Some(rx),
            trade_buf: Vec::with_capacity(64),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Submit an order.
    ///
    /// Success emits `Accepted`, each trade in execution order, then a
    /// `BookTop`. Failure (duplicate id, unfillable FOK) emits `Rejected`
    /// and leaves the book untouched.
    pub fn submit(&mut self, order: Order) -> bool {
        let mut trades = std::mem::take(&mut self.trade_buf);
        trades.clear();

        let ok = self.book.add(&order, &mut trades);
        if ok {
            self.emit(EngineEvent::Accepted(AcceptEvent {
                id: order.id,
                ts: self.clock.now_ns(),
            }));
            for trade in &trades {
                self.emit(EngineEvent::Trade(*trade));
            }
            let top = self.book.best_bid_ask();
            self.emit(EngineEvent::BookTop(top));
        } else {
            self.emit(EngineEvent::Rejected(RejectEvent {
                id: order.id,
                ts: self.clock.now_ns(),
                reason_code: REASON_ORDER_REJECTED,
            }));
        }

        self.trade_buf = trades;
        ok
    }

    /// Cancel a resting order. Success emits `Cancelled` then `BookTop`;
    /// an unknown id returns `false` with no event.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        match self.book.cancel(id) {
            Some(cancel) => {
                self.emit(EngineEvent::Cancelled(cancel));
                let top = self.book.best_bid_ask();
                self.emit(EngineEvent::BookTop(top));
                true
            }
            None => false,
        }
    }

    /// Replace a resting order with a new price and quantity (cancel +
    /// resubmit; time priority is lost). Success emits `Replaced`, any
    /// trades from the resubmission, then `BookTop`.
    pub fn replace(&mut self, id: OrderId, new_price: TickPrice, new_qty: u64) -> bool {
        let mut trades = std::mem::take(&mut self.trade_buf);
        trades.clear();

        let replaced =
            self.book
                .replace(id, new_price, new_qty, self.config.replace_policy, &mut trades);

        let ok = match replaced {
            Some(event) => {
                self.emit(EngineEvent::Replaced(event));
                for trade in &trades {
                    self.emit(EngineEvent::Trade(*trade));
                }
                let top = self.book.best_bid_ask();
                self.emit(EngineEvent::BookTop(top));
                true
            }
            None => false,
        };

        self.trade_buf = trades;
        ok
    }

    // ========================================================================
    // Event delivery
    // ========================================================================

    /// Drain all currently available events into `out` (cleared first), in
    /// FIFO order. Returns whether anything was delivered. Always `false`
    /// after the consumer handle has been taken.
    pub fn poll_events(&mut self, out: &mut Vec<EngineEvent>) -> bool {
        out.clear();
        let Some(rx) = self.rx.as_mut() else {
            return false;
        };
        while let Some(event) = rx.pop() {
            out.push(event);
        }
        !out.is_empty()
    }

    /// Detach the consumer end of the event ring for a dedicated consumer
    /// thread. Can be taken once; afterwards `poll_events` yields nothing.
    pub fn take_event_consumer(&mut self) -> Option<ring::Consumer<EngineEvent>> {
        self.rx.take()
    }

    #[inline]
    fn emit(&mut self, event: EngineEvent) {
        // Ring full: the event is dropped. Wait-free production is the
        // contract; consumers detect loss via BookTop gaps.
        let _ = self.tx.push(event);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Current engine time.
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now_ns()
    }

    /// Top of book snapshot.
    #[inline]
    pub fn best_bid_ask(&self) -> BookTop {
        self.book.best_bid_ask()
    }

    /// Depth snapshot of up to `max_levels` levels per side.
    #[inline]
    pub fn depth(&self, max_levels: usize) -> DepthSnapshot {
        self.book.depth(max_levels)
    }

    /// Read access to the book.
    #[inline]
    pub fn book(&self) -> &LimitBook {
        &self.book
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Side;

    fn px(ticks: i64) -> TickPrice {
        TickPrice::new(ticks)
    }

    fn engine_with_clock() -> (MatchingEngine, Arc<SimClock>) {
        let clock = Arc::new(SimClock::new());
        let engine = MatchingEngine::with_clock(EngineConfig::default(), clock.clone());
        (engine, clock)
    }

    fn drain(engine: &mut MatchingEngine) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        engine.poll_events(&mut out);
        out
    }

    #[test]
    fn test_submit_emits_accept_then_top() {
        let (mut engine, _clock) = engine_with_clock();
        assert!(engine.submit(Order::limit(1, Side::Buy, px(10000), 10, 0)));

        let events = drain(&mut engine);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::Accepted(a) if a.id == 1));
        match events[1] {
            EngineEvent::BookTop(top) => {
                assert_eq!(top.best_bid, px(10000));
                assert_eq!(top.bid_qty, 10);
            }
            _ => panic!("expected BookTop"),
        }
    }

    #[test]
    fn test_submit_cross_emits_accept_trades_top() {
        let (mut engine, _clock) = engine_with_clock();
        engine.submit(Order::limit(1, Side::Sell, px(10000), 10, 0));
        drain(&mut engine);

        assert!(engine.submit(Order::limit(2, Side::Buy, px(10000), 10, 1)));
        let events = drain(&mut engine);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], EngineEvent::Accepted(a) if a.id == 2));
        assert!(matches!(
            events[1],
            EngineEvent::Trade(t) if t.taker_id == 2 && t.maker_id == 1 && t.qty == 10
        ));
        assert!(matches!(events[2], EngineEvent::BookTop(_)));
    }

    #[test]
    fn test_duplicate_submit_rejected() {
        let (mut engine, _clock) = engine_with_clock();
        engine.submit(Order::limit(1, Side::Buy, px(10000), 5, 0));
        drain(&mut engine);

        assert!(!engine.submit(Order::limit(1, Side::Sell, px(10100), 5, 1)));
        let events = drain(&mut engine);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            EngineEvent::Rejected(r) if r.id == 1 && r.reason_code == REASON_ORDER_REJECTED
        ));
    }

    #[test]
    fn test_cancel_emits_cancelled_then_top() {
        let (mut engine, _clock) = engine_with_clock();
        engine.submit(Order::limit(1, Side::Buy, px(10000), 10, 0));
        drain(&mut engine);

        assert!(engine.cancel(1));
        let events = drain(&mut engine);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::Cancelled(c) if c.id == 1 && c.remaining == 10));
        assert!(matches!(events[1], EngineEvent::BookTop(top) if !top.best_bid.is_valid()));
    }

    #[test]
    fn test_cancel_unknown_emits_nothing() {
        let (mut engine, _clock) = engine_with_clock();
        assert!(!engine.cancel(7));
        assert!(drain(&mut engine).is_empty());
    }

    #[test]
    fn test_replace_emits_replaced_then_top() {
        let (mut engine, _clock) = engine_with_clock();
        engine.submit(Order::limit(1, Side::Buy, px(10000), 10, 0));
        drain(&mut engine);

        assert!(engine.replace(1, px(9990), 8));
        let events = drain(&mut engine);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            EngineEvent::Replaced(r) if r.id == 1 && r.new_price == px(9990) && r.new_qty == 8
        ));
        assert!(matches!(events[1], EngineEvent::BookTop(top) if top.best_bid == px(9990)));
    }

    #[test]
    fn test_event_timestamps_come_from_clock() {
        let (mut engine, clock) = engine_with_clock();
        clock.set(1_000);
        engine.submit(Order::limit(1, Side::Buy, px(10000), 10, 0));

        let events = drain(&mut engine);
        for event in events {
            match event {
                EngineEvent::Accepted(a) => assert_eq!(a.ts, 1_000),
                EngineEvent::BookTop(t) => assert_eq!(t.ts, 1_000),
                _ => {}
            }
        }

        clock.advance(500);
        assert_eq!(engine.now(), 1_500);
    }

    #[test]
    fn test_full_ring_drops_events_silently() {
        let config = EngineConfig {
            ring_size: 4, // power of two already; holds 3 events
            ..Default::default()
        };
        let mut engine = MatchingEngine::new(config);

        // Each resting submit produces 2 events; the second overflows the ring.
        assert!(engine.submit(Order::limit(1, Side::Buy, px(10000), 10, 0)));
        assert!(engine.submit(Order::limit(2, Side::Buy, px(9990), 10, 1)));

        let events = drain(&mut engine);
        assert_eq!(events.len(), 3);
        // The book itself is unaffected by the drop.
        assert_eq!(engine.book().total_orders(), 2);
    }

    #[test]
    fn test_take_event_consumer_moves_delivery() {
        let (mut engine, _clock) = engine_with_clock();
        let mut rx = engine.take_event_consumer().expect("first take");
        assert!(engine.take_event_consumer().is_none());

        engine.submit(Order::limit(1, Side::Buy, px(10000), 10, 0));

        let mut out = Vec::new();
        assert!(!engine.poll_events(&mut out));
        assert!(out.is_empty());

        let mut seen = Vec::new();
        while let Some(event) = rx.pop() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_consumer_thread_drains_while_producing() {
        let (mut engine, _clock) = engine_with_clock();
        let mut rx = engine.take_event_consumer().unwrap();

        let consumer = std::thread::spawn(move || {
            let mut count = 0usize;
            // 100 accepted resting orders -> 200 events.
            while count < 200 {
                if rx.pop().is_some() {
                    count += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
            count
        });

        for i in 1..=100u64 {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let ticks = if i % 2 == 0 {
                9_000 + i as i64
            } else {
                11_000 + i as i64
            };
            engine.submit(Order::limit(i, side, px(ticks), 10, i));
        }

        assert_eq!(consumer.join().unwrap(), 200);
    }

    #[test]
    fn test_depth_passthrough() {
        let (mut engine, _clock) = engine_with_clock();
        engine.submit(Order::limit(1, Side::Buy, px(10000), 10, 0));
        engine.submit(Order::limit(2, Side::Sell, px(10010), 20, 1));

        let depth = engine.depth(5);
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.asks.len(), 1);
        assert_eq!(depth.asks[0].qty, 20);
    }
}
