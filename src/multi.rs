//! Multi-symbol dispatcher: one engine per symbol behind a reader-writer
//! discipline.
//!
//! Adding and removing symbols takes the map's write lock; per-symbol
//! operations share-read the map and serialise on the engine's own lock, so
//! traffic on one symbol never blocks another.

use crate::clock::{SimClock, TimeSource};
use crate::engine::{EngineConfig, MatchingEngine};
use crate::events::{BookTop, DepthSnapshot, EngineEvent};
use crate::order::{Order, OrderId};
use crate::price::TickPrice;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Symbol-keyed collection of matching engines sharing one time source.
pub struct MultiBookEngine {
    default_config: EngineConfig,
    clock: Arc<dyn TimeSource>,
    engines: RwLock<HashMap<String, Mutex<MatchingEngine>>>,
}

impl MultiBookEngine {
    /// Dispatcher with a private simulated clock.
    pub fn new(default_config: EngineConfig) -> Self {
        Self::with_clock(default_config, Arc::new(SimClock::new()))
    }

    /// Dispatcher whose engines all read the injected time source.
    pub fn with_clock(default_config: EngineConfig, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            default_config,
            clock,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Register a symbol. Returns `false` if it already exists.
    pub fn add_symbol(&self, symbol: &str, config: Option<EngineConfig>) -> bool {
        let mut engines = self.engines.write();
        if engines.contains_key(symbol) {
            return false;
        }
        let config = config.unwrap_or(self.default_config);
        engines.insert(
            symbol.to_owned(),
            Mutex::new(MatchingEngine::with_clock(config, self.clock.clone())),
        );
        debug!(symbol, "symbol added");
        true
    }

    /// Drop a symbol and its book. Returns `false` if unknown.
    pub fn remove_symbol(&self, symbol: &str) -> bool {
        let removed = self.engines.write().remove(symbol).is_some();
        if removed {
            debug!(symbol, "symbol removed");
        }
        removed
    }

    /// Submit to a symbol's engine. Unknown symbol is an outcome failure.
    pub fn submit(&self, symbol: &str, order: Order) -> bool {
        let engines = self.engines.read();
        match engines.get(symbol) {
            Some(engine) => engine.lock().submit(order),
            None => false,
        }
    }

    pub fn cancel(&self, symbol: &str, id: OrderId) -> bool {
        let engines = self.engines.read();
        match engines.get(symbol) {
            Some(engine) => engine.lock().cancel(id),
            None => false,
        }
    }

    pub fn replace(&self, symbol: &str, id: OrderId, new_price: TickPrice, new_qty: u64) -> bool {
        let engines = self.engines.read();
        match engines.get(symbol) {
            Some(engine) => engine.lock().replace(id, new_price, new_qty),
            None => false,
        }
    }

    pub fn best_bid_ask(&self, symbol: &str) -> Option<BookTop> {
        let engines = self.engines.read();
        engines.get(symbol).map(|engine| engine.lock().best_bid_ask())
    }

    pub fn depth(&self, symbol: &str, max_levels: usize) -> Option<DepthSnapshot> {
        let engines = self.engines.read();
        engines.get(symbol).map(|engine| engine.lock().depth(max_levels))
    }

    /// Drain a symbol's events. Returns whether any were delivered.
    pub fn poll_events(&self, symbol: &str, out: &mut Vec<EngineEvent>) -> bool {
        let engines = self.engines.read();
        match engines.get(symbol) {
            Some(engine) => engine.lock().poll_events(out),
            None => false,
        }
    }

    /// All registered symbols, in no particular order.
    pub fn symbols(&self) -> Vec<String> {
        self.engines.read().keys().cloned().collect()
    }

    pub fn symbol_count(&self) -> usize {
        self.engines.read().len()
    }
}
