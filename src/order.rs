//! Order vocabulary: identifiers, sides, order types, and the input record.

use crate::price::TickPrice;
use serde::{Deserialize, Serialize};

/// External order identifier. `0` is reserved as invalid.
pub type OrderId = u64;

/// Reserved id meaning "no order".
pub const INVALID_ORDER_ID: OrderId = 0;

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type determines matching behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    /// Rests in the book if not fully matched (default).
    #[default]
    Limit = 0,
    /// Crosses at any price; residual quantity is discarded, never rested.
    Market = 1,
    /// Immediate-Or-Cancel: trade what crosses now, discard the rest.
    IOC = 2,
    /// Fill-Or-Kill: all-or-nothing, rejected if the full quantity cannot fill.
    FOK = 3,
}

/// Peg reference for pegged-order metadata.
///
/// Carried through unchanged; the core does not reprice pegged orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PegType {
    #[default]
    None = 0,
    Mid = 1,
    BestBid = 2,
    BestAsk = 3,
}

/// Immutable order input record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    /// Ignored for pure market orders.
    pub price: TickPrice,
    pub qty: u64,
    /// Submission timestamp in nanoseconds.
    pub ts: u64,
    pub order_type: OrderType,
    /// Iceberg: visible quantity (0 = show all). Metadata only.
    pub display_qty: u64,
    /// Iceberg: quantity restored per refresh. Metadata only.
    pub refresh_qty: u64,
    /// Peg reference. Metadata only.
    pub peg_type: PegType,
    /// Peg offset in ticks. Metadata only.
    pub peg_offset: i64,
}

impl Order {
    /// Create a plain limit order (the common case).
    #[inline]
    pub const fn limit(id: OrderId, side: Side, price: TickPrice, qty: u64, ts: u64) -> Self {
        Self::with_type(id, side, price, qty, ts, OrderType::Limit)
    }

    /// Create a market order. The price field is set to the invalid sentinel.
    #[inline]
    pub const fn market(id: OrderId, side: Side, qty: u64, ts: u64) -> Self {
        Self::with_type(id, side, TickPrice::INVALID, qty, ts, OrderType::Market)
    }

    /// Create an Immediate-Or-Cancel order.
    #[inline]
    pub const fn ioc(id: OrderId, side: Side, price: TickPrice, qty: u64, ts: u64) -> Self {
        Self::with_type(id, side, price, qty, ts, OrderType::IOC)
    }

    /// Create a Fill-Or-Kill order.
    #[inline]
    pub const fn fok(id: OrderId, side: Side, price: TickPrice, qty: u64, ts: u64) -> Self {
        Self::with_type(id, side, price, qty, ts, OrderType::FOK)
    }

    #[inline]
    pub const fn with_type(
        id: OrderId,
        side: Side,
        price: TickPrice,
        qty: u64,
        ts: u64,
        order_type: OrderType,
    ) -> Self {
        Self {
            id,
            side,
            price,
            qty,
            ts,
            order_type,
            display_qty: 0,
            refresh_qty: 0,
            peg_type: PegType::None,
            peg_offset: 0,
        }
    }

    #[inline]
    pub const fn is_limit(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    #[inline]
    pub const fn is_market(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    #[inline]
    pub const fn is_ioc(&self) -> bool {
        matches!(self.order_type, OrderType::IOC)
    }

    #[inline]
    pub const fn is_fok(&self) -> bool {
        matches!(self.order_type, OrderType::FOK)
    }

    /// Iceberg if a display quantity is set and smaller than the full size.
    #[inline]
    pub const fn is_iceberg(&self) -> bool {
        self.display_qty > 0 && self.display_qty < self.qty
    }

    #[inline]
    pub const fn is_pegged(&self) -> bool {
        !matches!(self.peg_type, PegType::None)
    }

    /// Displayed quantity: the iceberg tip, or the full size.
    #[inline]
    pub const fn visible_qty(&self) -> u64 {
        if self.is_iceberg() {
            self.display_qty
        } else {
            self.qty
        }
    }
}
