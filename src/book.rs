//! The central limit order book.
//!
//! Two ordered price maps (bids matched from the highest key, asks from the
//! lowest) plus an id index pointing back at the owning level. The matching
//! loop walks the opposite side in price order and consumes FIFO queues
//! level by level; execution always happens at the maker's resting price.

use crate::clock::TimeSource;
use crate::events::{BookTop, CancelEvent, DepthLevel, DepthSnapshot, ReplaceEvent, TradeEvent};
use crate::level::{PriceLevel, RestingOrder};
use crate::order::{Order, OrderId, Side};
use crate::price::TickPrice;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a resting order lives: enough to reach its level in O(log L).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderLocation {
    pub side: Side,
    pub price: TickPrice,
}

/// What to do with the original order when a replace's resubmission fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// The original order is gone; the replace reports failure.
    #[default]
    DropOrder,
    /// Re-rest the original order (at the back of its level's queue; time
    /// priority was already lost by the cancel) and report failure.
    RestoreOriginal,
}

/// Price-time priority limit book for a single instrument.
pub struct LimitBook {
    tick_size: f64,
    clock: Arc<dyn TimeSource>,
    /// Bid levels; the best bid is the **last** key.
    pub bids: BTreeMap<TickPrice, PriceLevel>,
    /// Ask levels; the best ask is the **first** key.
    pub asks: BTreeMap<TickPrice, PriceLevel>,
    /// Back-references for cancel/replace lookup. Never owns a slot.
    index: FxHashMap<OrderId, OrderLocation>,
}

impl LimitBook {
    pub fn new(tick_size: f64, clock: Arc<dyn TimeSource>) -> Self {
        Self::with_capacity(tick_size, clock, 0)
    }

    /// Pre-size the order index for `max_orders` open orders.
    pub fn with_capacity(tick_size: f64, clock: Arc<dyn TimeSource>, max_orders: usize) -> Self {
        Self {
            tick_size,
            clock,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: FxHashMap::with_capacity_and_hasher(max_orders, Default::default()),
        }
    }

    // ========================================================================
    // Admission
    // ========================================================================

    /// Admit an order: match aggressively where the type or price demands it,
    /// rest any limit residual. Trades are appended to `out_trades` in
    /// execution order.
    ///
    /// Returns `false` (book untouched, nothing appended) for a duplicate id
    /// or an unfillable FOK.
    pub fn add(&mut self, order: &Order, out_trades: &mut Vec<TradeEvent>) -> bool {
        if self.index.contains_key(&order.id) {
            return false;
        }

        if order.is_fok() && !self.fok_fillable(order) {
            return false;
        }

        let mut remaining = order.qty;

        // Aggressive phase: market/IOC/FOK always sweep; limits only if they
        // cross the opposite best.
        if !order.is_limit() || self.would_cross(order) {
            remaining = self.match_order(order, remaining, out_trades);
        }

        // Resting phase. Market/IOC/FOK residuals are discarded; only limit
        // orders rest.
        if remaining > 0 && order.is_limit() {
            self.rest(order, remaining);
        }

        true
    }

    /// Whether the opposite side holds enough crossing quantity for the full
    /// order. Read-only pre-scan; the FOK is rejected before any mutation.
    fn fok_fillable(&self, order: &Order) -> bool {
        let mut available = 0u64;
        match order.side {
            Side::Buy => {
                for (price, level) in self.asks.iter() {
                    if *price > order.price {
                        break;
                    }
                    available += level.total_qty();
                    if available >= order.qty {
                        return true;
                    }
                }
            }
            Side::Sell => {
                for (price, level) in self.bids.iter().rev() {
                    if *price < order.price {
                        break;
                    }
                    available += level.total_qty();
                    if available >= order.qty {
                        return true;
                    }
                }
            }
        }
        available >= order.qty
    }

    /// Whether a limit order would trade on arrival.
    fn would_cross(&self, order: &Order) -> bool {
        match order.side {
            Side::Buy => self
                .asks
                .first_key_value()
                .map_or(false, |(best, _)| order.price >= *best),
            Side::Sell => self
                .bids
                .last_key_value()
                .map_or(false, |(best, _)| order.price <= *best),
        }
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Sweep the opposite side while the cross predicate holds at its best
    /// price. Returns the unmatched remainder.
    fn match_order(
        &mut self,
        taker: &Order,
        mut remaining: u64,
        out_trades: &mut Vec<TradeEvent>,
    ) -> u64 {
        while remaining > 0 {
            let best = match taker.side {
                Side::Buy => self.asks.first_key_value().map(|(p, _)| *p),
                Side::Sell => self.bids.last_key_value().map(|(p, _)| *p),
            };
            let Some(level_price) = best else {
                break; // opposite side exhausted
            };

            if !taker.is_market() {
                let crosses = match taker.side {
                    Side::Buy => level_price <= taker.price,
                    Side::Sell => level_price >= taker.price,
                };
                if !crosses {
                    break;
                }
            }

            remaining = self.match_at_level(taker, level_price, remaining, out_trades);
        }
        remaining
    }

    /// Consume the FIFO queue at one opposite-side price. Returns when the
    /// level is exhausted (and erased) or the taker is satisfied.
    fn match_at_level(
        &mut self,
        taker: &Order,
        price: TickPrice,
        mut remaining: u64,
        out_trades: &mut Vec<TradeEvent>,
    ) -> u64 {
        loop {
            if remaining == 0 {
                break;
            }

            let ts = self.clock.now_ns();
            let levels = match taker.side.opposite() {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            let Some(level) = levels.get_mut(&price) else {
                break;
            };
            let Some(maker) = level.front() else {
                break;
            };

            let maker_id = maker.order.id;
            let maker_remaining = maker.remaining_qty;
            let fill = remaining.min(maker_remaining);
            remaining -= fill;

            let mut level_erased = false;
            if fill == maker_remaining {
                // Maker fully filled: drop the slot and its index entry
                // at the same instant.
                level.pop_front();
                if level.is_empty() {
                    levels.remove(&price);
                    level_erased = true;
                }
                self.index.remove(&maker_id);
            } else {
                level.update_front_remaining(maker_remaining - fill);
            }

            out_trades.push(TradeEvent {
                taker_id: taker.id,
                maker_id,
                price,
                qty: fill,
                ts,
            });

            if level_erased {
                break;
            }
        }
        remaining
    }

    /// Rest a (possibly partially filled) limit order.
    fn rest(&mut self, order: &Order, remaining: u64) {
        let levels = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        levels.entry(order.price).or_default().push_back(RestingOrder {
            order: *order,
            remaining_qty: remaining,
        });
        self.index.insert(
            order.id,
            OrderLocation {
                side: order.side,
                price: order.price,
            },
        );
    }

    // ========================================================================
    // Cancel / Replace
    // ========================================================================

    /// Remove a resting order. Returns the cancel record, or `None` for an
    /// unknown id (no partial effects).
    pub fn cancel(&mut self, id: OrderId) -> Option<CancelEvent> {
        let loc = self.index.remove(&id)?;
        let levels = match loc.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };

        let mut remaining = 0;
        if let Some(level) = levels.get_mut(&loc.price) {
            if let Some(qty) = level.remove_by_id(id) {
                remaining = qty;
            }
            if level.is_empty() {
                levels.remove(&loc.price);
            }
        }

        Some(CancelEvent {
            id,
            remaining,
            ts: self.clock.now_ns(),
        })
    }

    /// Cancel + resubmit with a new price and quantity. The replacement
    /// takes a fresh timestamp and joins the back of its queue, losing
    /// time priority.
    ///
    /// The caller's `new_qty` overrides the remaining quantity. If the
    /// resubmission is itself refused, `policy` decides the fate of the
    /// original order; the replace reports failure either way.
    pub fn replace(
        &mut self,
        id: OrderId,
        new_price: TickPrice,
        new_qty: u64,
        policy: ReplacePolicy,
        out_trades: &mut Vec<TradeEvent>,
    ) -> Option<ReplaceEvent> {
        let loc = *self.index.get(&id)?;
        let levels = match loc.side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        let original = *levels.get(&loc.price)?.find_by_id(id)?;

        self.cancel(id)?;

        let ts = self.clock.now_ns();
        let mut replacement = original.order;
        replacement.price = new_price;
        replacement.qty = new_qty;
        replacement.ts = ts;

        if !self.add(&replacement, out_trades) {
            if policy == ReplacePolicy::RestoreOriginal {
                // The original rested without crossing and the opposite side
                // has not changed, so a direct rest cannot cross the book.
                let mut restored = original.order;
                restored.qty = original.remaining_qty;
                self.rest(&restored, original.remaining_qty);
            }
            return None;
        }

        Some(ReplaceEvent {
            id,
            new_price,
            new_qty,
            ts,
        })
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Top of book, stamped at call time. O(1).
    pub fn best_bid_ask(&self) -> BookTop {
        let mut top = BookTop::empty(self.clock.now_ns());
        if let Some((price, level)) = self.bids.last_key_value() {
            top.best_bid = *price;
            top.bid_qty = level.total_qty();
        }
        if let Some((price, level)) = self.asks.first_key_value() {
            top.best_ask = *price;
            top.ask_qty = level.total_qty();
        }
        top
    }

    /// Best bid price, if any.
    #[inline]
    pub fn best_bid(&self) -> Option<TickPrice> {
        self.bids.last_key_value().map(|(p, _)| *p)
    }

    /// Best ask price, if any.
    #[inline]
    pub fn best_ask(&self) -> Option<TickPrice> {
        self.asks.first_key_value().map(|(p, _)| *p)
    }

    /// Up to `max_levels` aggregated levels per side, best first.
    pub fn depth(&self, max_levels: usize) -> DepthSnapshot {
        let mut out = DepthSnapshot {
            bids: Vec::with_capacity(max_levels.min(self.bids.len())),
            asks: Vec::with_capacity(max_levels.min(self.asks.len())),
            ts: self.clock.now_ns(),
        };
        for (price, level) in self.bids.iter().rev().take(max_levels) {
            out.bids.push(DepthLevel {
                price: *price,
                qty: level.total_qty(),
                order_count: level.len(),
            });
        }
        for (price, level) in self.asks.iter().take(max_levels) {
            out.asks.push(DepthLevel {
                price: *price,
                qty: level.total_qty(),
                order_count: level.len(),
            });
        }
        out
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Number of open (resting) orders.
    #[inline]
    pub fn total_orders(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn contains(&self, id: OrderId) -> bool {
        self.index.contains_key(&id)
    }

    /// Where an open order rests.
    #[inline]
    pub fn location(&self, id: OrderId) -> Option<&OrderLocation> {
        self.index.get(&id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }
}

impl std::fmt::Debug for LimitBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitBook")
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("open_orders", &self.index.len())
            .finish()
    }
}
