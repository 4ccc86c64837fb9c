//! Matching strategies.
//!
//! ## Matching Rules
//!
//! - **Buy aggressors** cross the sell side (lowest price first)
//! - **Sell aggressors** cross the buy side (highest price first)
//! - Within a price, earlier arrivals trade first
//! - **Partial fills** are supported on both sides
//!
//! A strategy performs a single level pass; `Book` owns the loop that keeps
//! crossing while the aggressor's price allows, so a strategy never has to
//! reason about market state or remainders.
//!
//! ## Example
//!
//! ```
//! use matchbook::engine::{MatchingStrategy, PriceTimeMatcher};
//! use matchbook::orderbook::{Archive, BookSide};
//! use matchbook::types::{PriceValue, Side, TradableEntry};
//!
//! let mut sells = BookSide::new(Side::Sell);
//! let mut archive = Archive::new();
//! sells.insert(TradableEntry::order("bob", "AAA", PriceValue::limit(1_000), 100, Side::Sell).unwrap()).unwrap();
//!
//! let mut buy = TradableEntry::order("alice", "AAA", PriceValue::limit(1_000), 100, Side::Buy).unwrap();
//! let fills = PriceTimeMatcher::new().match_level(&mut buy, &mut sells, &mut archive);
//!
//! assert!(buy.is_done());
//! assert_eq!(fills.len(), 2);
//! ```

use std::fmt;

use crate::orderbook::{Archive, BookSide};
use crate::types::TradableEntry;

pub mod fills;
pub mod matcher;

pub use fills::{FillKey, FillSet};
pub use matcher::PriceTimeMatcher;

/// Pluggable crossing algorithm, selectable per symbol.
pub trait MatchingStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Cross `aggressor` against the entries at `opposite`'s best price.
    ///
    /// Implementations must reduce both sides' remaining volume by the
    /// traded quantity, remove emptied resting entries from `opposite`,
    /// and archive every entry (including a copy of the aggressor) whose
    /// remaining volume reached zero.
    fn match_level(
        &self,
        aggressor: &mut TradableEntry,
        opposite: &mut BookSide,
        archive: &mut Archive,
    ) -> FillSet;
}
