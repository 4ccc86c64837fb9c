//! Outbound event payloads handed to the publisher.

use std::fmt;

use crate::types::price::PriceValue;
use crate::types::tradable::{Side, TradableEntry};

/// One side of a trade, addressed to the entry's owner.
///
/// `volume` is the quantity traded in the leg that produced the event.
/// `details` reads `"leaving N"` with the entry's remaining volume after
/// that leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillEvent {
    pub owner: String,
    pub symbol: String,
    pub price: PriceValue,
    pub volume: u64,
    pub details: String,
    pub side: Side,
    pub id: String,
}

impl FillEvent {
    /// Fill for `entry` at `price`, taken after the leg was applied.
    pub fn for_entry(entry: &TradableEntry, price: PriceValue, volume: u64) -> Self {
        Self {
            owner: entry.owner().to_string(),
            symbol: entry.symbol().to_string(),
            price,
            volume,
            details: format!("leaving {}", entry.remaining_volume()),
            side: entry.side(),
            id: entry.id().to_string(),
        }
    }
}

impl fmt::Display for FillEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User: {}, Product: {}, Price: {}, Volume: {}, Details: {}, Side: {}, ID: {}",
            self.owner, self.symbol, self.price, self.volume, self.details, self.side, self.id
        )
    }
}

/// Notice that an entry (or what was left of it) is no longer live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelEvent {
    pub owner: String,
    pub symbol: String,
    pub price: PriceValue,
    pub volume: u64,
    pub details: String,
    pub side: Side,
    pub id: String,
}

impl CancelEvent {
    /// Cancel notice for `entry` carrying `volume`.
    pub fn for_entry(entry: &TradableEntry, volume: u64, details: impl Into<String>) -> Self {
        Self {
            owner: entry.owner().to_string(),
            symbol: entry.symbol().to_string(),
            price: entry.price(),
            volume,
            details: details.into(),
            side: entry.side(),
            id: entry.id().to_string(),
        }
    }
}

impl fmt::Display for CancelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User: {}, Product: {}, Price: {}, Volume: {}, Details: {}, Side: {}, ID: {}",
            self.owner, self.symbol, self.price, self.volume, self.details, self.side, self.id
        )
    }
}

/// Top of book for one symbol. An empty side reports `Limit(0)` and zero
/// volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub buy_price: PriceValue,
    pub buy_volume: u64,
    pub sell_price: PriceValue,
    pub sell_volume: u64,
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Product: {}. Buy Price: {}, Buy Volume: {}, Sell Price: {}, Sell Volume: {}",
            self.symbol, self.buy_price, self.buy_volume, self.sell_price, self.sell_volume
        )
    }
}

/// Depth of both sides of one book, best price first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDepth {
    pub buy: Vec<String>,
    pub sell: Vec<String>,
}
