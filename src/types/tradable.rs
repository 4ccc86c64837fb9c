//! Tradable entries: orders and quote sides.
//!
//! ## Volume accounting
//!
//! Every entry tracks three volumes:
//!
//! ```text
//! original = remaining + cancelled + filled
//! ```
//!
//! `remaining` only ever goes down (through [`TradableEntry::fill`] or
//! [`TradableEntry::cancel_remaining`]) so `filled` never decreases. Once
//! `remaining` hits zero the entry leaves its book side for the archive and
//! is never mutated again.
//!
//! ## Identifiers
//!
//! Ids are 24 hex characters taken from a SHA-256 digest of the owner,
//! symbol, price, the wall clock in nanoseconds and a process-wide sequence
//! number. The sequence number keeps ids unique when the clock does not move
//! between two submissions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::error::{require_non_empty, ExchangeError, Result};
use crate::types::price::PriceValue;

/// Bytes of the SHA-256 digest kept for an entry id.
const ID_BYTES: usize = 12;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Side enum
// ============================================================================

/// Direction of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// Wants to buy
    #[default]
    Buy,
    /// Wants to sell
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TradableEntry
// ============================================================================

/// One order, or one side of a two-sided quote.
///
/// Fields are private so the volume invariant can only be changed through
/// `fill` and `cancel_remaining`.
///
/// ## Example
///
/// ```
/// use matchbook::types::{PriceValue, Side, TradableEntry};
///
/// let mut order = TradableEntry::order("alice", "AAA", PriceValue::limit(1_000), 200, Side::Buy).unwrap();
/// assert_eq!(order.fill(150), 150);
/// assert_eq!(order.remaining_volume(), 50);
/// assert_eq!(order.filled_volume(), 150);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradableEntry {
    symbol: String,
    price: PriceValue,
    original_volume: u64,
    remaining_volume: u64,
    cancelled_volume: u64,
    owner: String,
    side: Side,
    is_quote: bool,
    id: String,
}

impl TradableEntry {
    /// Create a new order.
    ///
    /// # Arguments
    ///
    /// * `owner` - Submitting user
    /// * `symbol` - Traded symbol
    /// * `price` - Limit price or `PriceValue::Market`
    /// * `volume` - Original volume, must be positive
    /// * `side` - Buy or Sell
    ///
    /// # Errors
    ///
    /// `ExchangeError::Validation` for an empty owner/symbol or zero volume.
    pub fn order(
        owner: &str,
        symbol: &str,
        price: PriceValue,
        volume: u64,
        side: Side,
    ) -> Result<Self> {
        let price_text = price.to_string();
        Self::build(owner, symbol, price, volume, side, false, &[owner, symbol, &price_text])
    }

    /// Create one side of a quote.
    ///
    /// Quote-side ids omit the price, so both sides of one quote differ only
    /// by their entropy.
    pub fn quote_side(
        owner: &str,
        symbol: &str,
        price: PriceValue,
        volume: u64,
        side: Side,
    ) -> Result<Self> {
        Self::build(owner, symbol, price, volume, side, true, &[owner, symbol])
    }

    fn build(
        owner: &str,
        symbol: &str,
        price: PriceValue,
        volume: u64,
        side: Side,
        is_quote: bool,
        id_parts: &[&str],
    ) -> Result<Self> {
        require_non_empty(owner, "owner")?;
        require_non_empty(symbol, "symbol")?;
        if volume == 0 {
            return Err(ExchangeError::Validation(format!(
                "volume for {owner} {side} {symbol} must be positive"
            )));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            price,
            original_volume: volume,
            remaining_volume: volume,
            cancelled_volume: 0,
            owner: owner.to_string(),
            side,
            is_quote,
            id: generate_id(id_parts),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn price(&self) -> PriceValue {
        self.price
    }

    #[inline]
    pub fn original_volume(&self) -> u64 {
        self.original_volume
    }

    #[inline]
    pub fn remaining_volume(&self) -> u64 {
        self.remaining_volume
    }

    #[inline]
    pub fn cancelled_volume(&self) -> u64 {
        self.cancelled_volume
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn is_quote(&self) -> bool {
        self.is_quote
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cumulative traded volume.
    #[inline]
    pub fn filled_volume(&self) -> u64 {
        self.original_volume - self.remaining_volume - self.cancelled_volume
    }

    /// True once nothing is left to trade.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.remaining_volume == 0
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Trade up to `quantity` of the remaining volume.
    ///
    /// # Returns
    ///
    /// The quantity actually filled (capped at the remaining volume)
    pub fn fill(&mut self, quantity: u64) -> u64 {
        let fill_qty = quantity.min(self.remaining_volume);
        self.remaining_volume -= fill_qty;
        fill_qty
    }

    /// Move all remaining volume into cancelled volume.
    ///
    /// # Returns
    ///
    /// The volume that was cancelled
    pub fn cancel_remaining(&mut self) -> u64 {
        let cancelled = self.remaining_volume;
        self.cancelled_volume += cancelled;
        self.remaining_volume = 0;
        cancelled
    }

    /// Immutable snapshot for callers outside the book.
    pub fn summary(&self) -> TradableSummary {
        TradableSummary::from(self)
    }
}

impl fmt::Display for TradableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_quote {
            write!(
                f,
                "{} x {} (Original Vol: {}, CXL'd: {}) [{}]",
                self.price, self.remaining_volume, self.original_volume, self.cancelled_volume, self.id
            )
        } else {
            write!(
                f,
                "{} order: {} {} {} at {} (Original Vol: {}, CXL'd: {}), ID: {}",
                self.owner,
                self.side,
                self.remaining_volume,
                self.symbol,
                self.price,
                self.original_volume,
                self.cancelled_volume,
                self.id
            )
        }
    }
}

/// Hex id from a SHA-256 over the parts, the clock and a sequence number.
fn generate_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    hasher.update(nanos.to_le_bytes());
    hasher.update(ID_SEQUENCE.fetch_add(1, Ordering::Relaxed).to_le_bytes());

    let digest = hasher.finalize();
    hex::encode(&digest[..ID_BYTES])
}

// ============================================================================
// TradableSummary
// ============================================================================

/// Read-only copy of an entry's fields, handed out by queries and
/// quote cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradableSummary {
    pub symbol: String,
    pub price: PriceValue,
    pub original_volume: u64,
    pub remaining_volume: u64,
    pub cancelled_volume: u64,
    pub owner: String,
    pub side: Side,
    pub is_quote: bool,
    pub id: String,
}

impl From<&TradableEntry> for TradableSummary {
    fn from(entry: &TradableEntry) -> Self {
        Self {
            symbol: entry.symbol.clone(),
            price: entry.price,
            original_volume: entry.original_volume,
            remaining_volume: entry.remaining_volume,
            cancelled_volume: entry.cancelled_volume,
            owner: entry.owner.clone(),
            side: entry.side,
            is_quote: entry.is_quote,
            id: entry.id.clone(),
        }
    }
}

impl fmt::Display for TradableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} at {} (Original Vol: {}, CXL'd: {}), isQuote: {}, ID: {}",
            self.owner,
            self.side,
            self.symbol,
            self.remaining_volume,
            self.price,
            self.original_volume,
            self.cancelled_volume,
            self.is_quote,
            self.id
        )
    }
}

// ============================================================================
// Quote
// ============================================================================

/// A two-sided quote: one buy side and one sell side from the same owner.
#[derive(Debug, Clone)]
pub struct Quote {
    owner: String,
    symbol: String,
    buy: TradableEntry,
    sell: TradableEntry,
}

impl Quote {
    /// Build both quote sides.
    ///
    /// Only per-side validation happens here; the spread and positivity
    /// checks belong to the book that accepts the quote.
    pub fn new(
        owner: &str,
        symbol: &str,
        buy_price: PriceValue,
        buy_volume: u64,
        sell_price: PriceValue,
        sell_volume: u64,
    ) -> Result<Self> {
        let buy = TradableEntry::quote_side(owner, symbol, buy_price, buy_volume, Side::Buy)?;
        let sell = TradableEntry::quote_side(owner, symbol, sell_price, sell_volume, Side::Sell)?;
        Ok(Self {
            owner: owner.to_string(),
            symbol: symbol.to_string(),
            buy,
            sell,
        })
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn buy(&self) -> &TradableEntry {
        &self.buy
    }

    #[inline]
    pub fn sell(&self) -> &TradableEntry {
        &self.sell
    }

    /// Split into `(buy, sell)` entries.
    pub fn into_sides(self) -> (TradableEntry, TradableEntry) {
        (self.buy, self.sell)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
