//! Engine output events.
//!
//! Each operation on the engine produces a short, contiguous sequence of
//! these events on the SPSC ring. External consumers (broadcasters,
//! recorders) serialize them; the core only fills in the fields.

use crate::order::OrderId;
use crate::price::TickPrice;
use serde::{Deserialize, Serialize};

/// Reject reason carried by [`RejectEvent::reason_code`]: the order was not
/// admitted (duplicate id, or FOK with insufficient liquidity). Further codes
/// may be added without breaking consumers.
pub const REASON_ORDER_REJECTED: u32 = 1;

/// A fill between an incoming taker and a resting maker.
///
/// The price is always the maker's resting price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub taker_id: OrderId,
    pub maker_id: OrderId,
    pub price: TickPrice,
    pub qty: u64,
    pub ts: u64,
}

/// Order admitted (it may have traded, rested, or both).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptEvent {
    pub id: OrderId,
    pub ts: u64,
}

/// Order refused; the book is untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectEvent {
    pub id: OrderId,
    pub ts: u64,
    pub reason_code: u32,
}

/// Resting order removed by request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelEvent {
    pub id: OrderId,
    /// Quantity still open at the moment of cancellation.
    pub remaining: u64,
    pub ts: u64,
}

/// Resting order re-priced / re-sized (cancel + resubmit; time priority lost).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceEvent {
    pub id: OrderId,
    pub new_price: TickPrice,
    pub new_qty: u64,
    pub ts: u64,
}

/// Top-of-book snapshot. Sides with no orders carry [`TickPrice::INVALID`]
/// and zero quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTop {
    pub best_bid: TickPrice,
    pub bid_qty: u64,
    pub best_ask: TickPrice,
    pub ask_qty: u64,
    pub ts: u64,
}

impl BookTop {
    /// A snapshot of an empty book at `ts`.
    pub const fn empty(ts: u64) -> Self {
        Self {
            best_bid: TickPrice::INVALID,
            bid_qty: 0,
            best_ask: TickPrice::INVALID,
            ask_qty: 0,
            ts,
        }
    }
}

/// One aggregated price level in a depth snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: TickPrice,
    pub qty: u64,
    pub order_count: usize,
}

/// Market depth: up to `k` levels per side, best first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    pub ts: u64,
}

/// Unified event stream element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    Trade(TradeEvent),
    Accepted(AcceptEvent),
    Rejected(RejectEvent),
    Cancelled(CancelEvent),
    Replaced(ReplaceEvent),
    BookTop(BookTop),
}
