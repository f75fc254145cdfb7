//! Historical order-flow replay from CSV.
//!
//! Record format (header required):
//! `ts,action,id,side,price,qty,type,new_price,new_qty` with
//! `action` one of `ADD`, `CANCEL`, `REPLACE`. Prices are decimal strings
//! converted to ticks with the engine's tick size. Malformed rows are
//! skipped, not fatal.

use crate::engine::MatchingEngine;
use crate::events::EngineEvent;
use crate::order::{Order, OrderId, OrderType, Side};
use crate::price::TickPrice;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read market data: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed market data: {0}")]
    Parse(#[from] csv::Error),
}

/// Raw CSV row. Optional columns stay `None` for actions that do not use
/// them (e.g. `CANCEL` rows carry only `ts,action,id`).
#[derive(Debug, Deserialize)]
struct RawRecord {
    ts: u64,
    action: String,
    id: OrderId,
    side: Option<String>,
    price: Option<Decimal>,
    qty: Option<u64>,
    #[serde(rename = "type")]
    order_type: Option<String>,
    new_price: Option<Decimal>,
    new_qty: Option<u64>,
}

/// One decoded engine call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayCommand {
    Add(Order),
    Cancel(OrderId),
    Replace {
        id: OrderId,
        new_price: TickPrice,
        new_qty: u64,
    },
}

/// A timestamped replay message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayMessage {
    pub ts: u64,
    pub command: ReplayCommand,
}

impl RawRecord {
    fn decode(&self, tick_size: f64) -> Option<ReplayCommand> {
        match self.action.as_str() {
            "ADD" | "SUBMIT" => {
                let side = parse_side(self.side.as_deref()?)?;
                let order_type = parse_order_type(self.order_type.as_deref().unwrap_or("LIMIT"));
                let price = self
                    .price
                    .map(|d| decimal_to_ticks(d, tick_size))
                    .unwrap_or(TickPrice::INVALID);
                Some(ReplayCommand::Add(Order::with_type(
                    self.id,
                    side,
                    price,
                    self.qty?,
                    self.ts,
                    order_type,
                )))
            }
            "CANCEL" => Some(ReplayCommand::Cancel(self.id)),
            "REPLACE" => {
                // Dedicated new_* columns win; older captures reuse price/qty.
                let price = self.new_price.or(self.price)?;
                let qty = self.new_qty.or(self.qty)?;
                Some(ReplayCommand::Replace {
                    id: self.id,
                    new_price: decimal_to_ticks(price, tick_size),
                    new_qty: qty,
                })
            }
            _ => None,
        }
    }
}

fn parse_side(raw: &str) -> Option<Side> {
    match raw {
        "BUY" | "Buy" | "buy" | "B" => Some(Side::Buy),
        "SELL" | "Sell" | "sell" | "S" => Some(Side::Sell),
        _ => None,
    }
}

fn parse_order_type(raw: &str) -> OrderType {
    match raw {
        "MARKET" | "Market" | "market" => OrderType::Market,
        "IOC" | "ioc" => OrderType::IOC,
        "FOK" | "fok" => OrderType::FOK,
        _ => OrderType::Limit,
    }
}

fn decimal_to_ticks(price: Decimal, tick_size: f64) -> TickPrice {
    TickPrice::from_f64(price.to_f64().unwrap_or(0.0), tick_size)
}

/// Loads recorded order flow and drives an engine through it.
#[derive(Debug, Default)]
pub struct MarketReplay {
    messages: Vec<ReplayMessage>,
}

impl MarketReplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load messages from a CSV file, converting prices with `tick_size`.
    /// Returns the number of messages loaded.
    pub fn load_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        tick_size: f64,
    ) -> Result<usize, ReplayError> {
        let file = File::open(path.as_ref())?;
        let count = self.load_from_reader(file, tick_size)?;
        info!(
            path = %path.as_ref().display(),
            messages = count,
            "loaded market data"
        );
        Ok(count)
    }

    /// Load messages from any reader. Rows with bad field values are
    /// skipped; a structural failure (I/O mid-stream, broken UTF-8) aborts
    /// the load with [`ReplayError::Parse`].
    pub fn load_from_reader<R: Read>(
        &mut self,
        reader: R,
        tick_size: f64,
    ) -> Result<usize, ReplayError> {
        self.messages.clear();

        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(reader);

        for (line, result) in csv_reader.deserialize::<RawRecord>().enumerate() {
            let raw = match result {
                Ok(raw) => raw,
                Err(err) if matches!(err.kind(), csv::ErrorKind::Deserialize { .. }) => {
                    warn!(line, %err, "skipping malformed record");
                    continue;
                }
                Err(err) => return Err(ReplayError::Parse(err)),
            };
            match raw.decode(tick_size) {
                Some(command) => self.messages.push(ReplayMessage {
                    ts: raw.ts,
                    command,
                }),
                None => warn!(line, action = %raw.action, "skipping undecodable record"),
            }
        }

        Ok(self.messages.len())
    }

    /// Number of loaded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replay every message in order. Returns how many engine calls
    /// succeeded. When `out_events` is given, events are drained after each
    /// call and appended to it.
    pub fn replay_all(
        &self,
        engine: &mut MatchingEngine,
        out_events: Option<&mut Vec<EngineEvent>>,
    ) -> usize {
        self.replay_until(u64::MAX, engine, out_events)
    }

    /// Replay messages with `ts <= until_ts` in order.
    pub fn replay_until(
        &self,
        until_ts: u64,
        engine: &mut MatchingEngine,
        mut out_events: Option<&mut Vec<EngineEvent>>,
    ) -> usize {
        let mut processed = 0usize;
        let mut scratch = Vec::new();

        for message in &self.messages {
            if message.ts > until_ts {
                break;
            }

            let ok = match message.command {
                ReplayCommand::Add(order) => engine.submit(order),
                ReplayCommand::Cancel(id) => engine.cancel(id),
                ReplayCommand::Replace {
                    id,
                    new_price,
                    new_qty,
                } => engine.replace(id, new_price, new_qty),
            };
            if ok {
                processed += 1;
            }

            if let Some(out) = out_events.as_deref_mut() {
                if engine.poll_events(&mut scratch) {
                    out.append(&mut scratch);
                }
            }
        }

        debug!(processed, total = self.messages.len(), "replay finished");
        processed
    }
}
