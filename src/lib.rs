//! # Matchbook
//!
//! A deterministic, in-process limit order book matching engine for
//! market-microstructure research, backtesting, and exchange simulation.
//!
//! ## Design Principles
//!
//! - **Price-time priority**: best price first, FIFO within a price level
//! - **Deterministic**: all timestamps come from an injected clock; the same
//!   input sequence always produces the same event stream
//! - **Single-writer**: one thread owns each engine; events cross to the
//!   consumer over a lock-free SPSC ring
//! - **Integer ticks**: prices are whole tick counts end to end; floats only
//!   appear at the conversion boundary
//!
//! ## Architecture
//!
//! ```text
//! [Caller / Replay] --> submit/cancel/replace --> [MatchingEngine]
//!                                                       |
//!                                    [LimitBook: bids | asks | id index]
//!                                                       |
//!                                              [SPSC Event Ring]
//!                                                       |
//!                                              [Consumer Thread]
//! ```

pub mod book;
pub mod clock;
pub mod engine;
pub mod events;
pub mod level;
pub mod multi;
pub mod order;
pub mod price;
pub mod replay;
pub mod ring;

// Re-exports for convenience
pub use book::{LimitBook, OrderLocation, ReplacePolicy};
pub use clock::{MonoClock, SimClock, TimeSource};
pub use engine::{EngineConfig, MatchingEngine};
pub use events::{
    AcceptEvent, BookTop, CancelEvent, DepthLevel, DepthSnapshot, EngineEvent, RejectEvent,
    ReplaceEvent, TradeEvent, REASON_ORDER_REJECTED,
};
pub use level::{PriceLevel, RestingOrder};
pub use multi::MultiBookEngine;
pub use order::{Order, OrderId, OrderType, PegType, Side, INVALID_ORDER_ID};
pub use price::TickPrice;
pub use replay::{MarketReplay, ReplayCommand, ReplayError, ReplayMessage};
