//! Price-time crossing of one aggressor against one book side.
//!
//! ## Algorithm
//!
//! One call is one *level pass*:
//!
//! 1. Snapshot the resting keys at the opposite side's best price
//! 2. Walk them oldest first while the aggressor has volume
//! 3. Trade `min(aggressor.remaining, resting.remaining)` at the resting
//!    price, or at the aggressor's price if the resting entry is
//!    market-priced
//! 4. Record one fill per side and archive whichever side reached zero
//!
//! The caller decides whether another pass is warranted (see
//! `Book::submit` and `Book::open_market`).

use tracing::trace;

use crate::engine::{FillSet, MatchingStrategy};
use crate::orderbook::{Archive, BookSide};
use crate::types::{FillEvent, PriceValue, TradableEntry};

/// Price-time priority matcher.
///
/// Stateless; one instance can serve any number of books.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriceTimeMatcher;

impl PriceTimeMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Price for a trade between `aggressor` and `resting`.
    #[inline]
    pub fn trade_price(aggressor: &TradableEntry, resting: &TradableEntry) -> PriceValue {
        if resting.price().is_market() {
            aggressor.price()
        } else {
            resting.price()
        }
    }
}

impl MatchingStrategy for PriceTimeMatcher {
    fn name(&self) -> &str {
        "price-time"
    }

    fn match_level(
        &self,
        aggressor: &mut TradableEntry,
        opposite: &mut BookSide,
        archive: &mut Archive,
    ) -> FillSet {
        let mut fills = FillSet::new();

        for key in opposite.best_keys() {
            if aggressor.is_done() {
                break;
            }
            let Some(resting) = opposite.entry(key) else {
                continue;
            };

            let quantity = aggressor.remaining_volume().min(resting.remaining_volume());
            let price = Self::trade_price(aggressor, resting);

            opposite.fill(key, quantity);
            aggressor.fill(quantity);

            if let Some(resting) = opposite.entry(key) {
                trace!(
                    symbol = resting.symbol(),
                    resting = resting.id(),
                    aggressor = aggressor.id(),
                    %price,
                    quantity,
                    "crossed"
                );
                fills.record(FillEvent::for_entry(resting, price, quantity));
                fills.record(FillEvent::for_entry(aggressor, price, quantity));

                if resting.is_done() {
                    if let Some(done) = opposite.remove_filled(key) {
                        archive.archive(done);
                    }
                }
            }

            if aggressor.is_done() {
                archive.archive(aggressor.clone());
            }
        }

        fills
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
