//! Two-sided book for one symbol.
//!
//! ## Responsibilities
//!
//! - Continuous crossing of incoming entries against the opposite side
//! - The opening auction sweep
//! - Close-out cancellation of everything resting
//! - Single active quote per owner
//! - De-duplicated top-of-book publication
//!
//! ## Publication
//!
//! A `Book` never rolls back a mutation because a publish call failed.
//! Every operation finishes its book changes, keeps publishing, and then
//! reports the first delivery failure as `ExchangeError::Delivery`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use matchbook::engine::PriceTimeMatcher;
//! use matchbook::market::MarketState;
//! use matchbook::orderbook::Book;
//! use matchbook::publisher::EventLog;
//! use matchbook::types::{PriceValue, Side, TradableEntry};
//!
//! let log = Arc::new(EventLog::new());
//! let mut book = Book::new("AAA", Arc::new(PriceTimeMatcher::new()), log.clone(), 64);
//!
//! let buy = TradableEntry::order("alice", "AAA", PriceValue::limit(1_000), 200, Side::Buy).unwrap();
//! book.submit(buy, MarketState::Open).unwrap();
//! let sell = TradableEntry::order("bob", "AAA", PriceValue::limit(1_000), 150, Side::Sell).unwrap();
//! book.submit(sell, MarketState::Open).unwrap();
//!
//! assert_eq!(book.book_depth().buy, vec!["$10.00 x 50"]);
//! assert_eq!(log.last_sales(), vec![("AAA".to_string(), PriceValue::limit(1_000), 150)]);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::engine::{FillSet, MatchingStrategy};
use crate::error::{ExchangeError, Result};
use crate::market::MarketState;
use crate::orderbook::{Archive, BookSide};
use crate::publisher::{PublishError, Publisher};
use crate::types::{
    BookDepth, CancelEvent, MarketSnapshot, PriceValue, Quote, Side, TradableEntry,
    TradableSummary,
};

/// Keeps the first publish failure of an operation.
#[derive(Debug, Default)]
struct Delivery {
    first_error: Option<PublishError>,
}

impl Delivery {
    fn note(&mut self, result: std::result::Result<(), PublishError>) {
        if let Err(err) = result {
            warn!(error = %err, "publish failed after book update");
            self.first_error.get_or_insert(err);
        }
    }

    fn finish(self) -> Result<()> {
        match self.first_error {
            Some(err) => Err(ExchangeError::Delivery(err)),
            None => Ok(()),
        }
    }
}

/// Buy side, sell side and archive for one symbol.
pub struct Book {
    symbol: String,
    buy_side: BookSide,
    sell_side: BookSide,
    archive: Archive,
    quoted_owners: HashSet<String>,
    last_published: Option<String>,
    strategy: Arc<dyn MatchingStrategy>,
    publisher: Arc<dyn Publisher>,
}

impl std::fmt::Debug for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("symbol", &self.symbol)
            .field("buy_side", &self.buy_side)
            .field("sell_side", &self.sell_side)
            .field("archived", &self.archive.len())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Book {
    /// Create an empty book.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Traded symbol
    /// * `strategy` - Crossing algorithm used for every match
    /// * `publisher` - Receiver of fills, cancels and market data
    /// * `capacity` - Entry slots pre-allocated per side
    pub fn new(
        symbol: &str,
        strategy: Arc<dyn MatchingStrategy>,
        publisher: Arc<dyn Publisher>,
        capacity: usize,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            buy_side: BookSide::with_capacity(Side::Buy, capacity),
            sell_side: BookSide::with_capacity(Side::Sell, capacity),
            archive: Archive::new(),
            quoted_owners: HashSet::new(),
            last_published: None,
            strategy,
            publisher,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.buy_side,
            Side::Sell => &self.sell_side,
        }
    }

    #[inline]
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    #[inline]
    pub fn has_quote(&self, owner: &str) -> bool {
        self.quoted_owners.contains(owner)
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.buy_side,
            Side::Sell => &mut self.sell_side,
        }
    }

    fn check_symbol(&self, symbol: &str) -> Result<()> {
        if symbol != self.symbol {
            return Err(ExchangeError::Validation(format!(
                "entry for {symbol} submitted to book {}",
                self.symbol
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Accept an order or quote side.
    ///
    /// In `PreOpen` the entry is staged on its own side. Otherwise it is
    /// crossed against the opposite side; a market remainder is cancelled,
    /// a limit remainder rests.
    ///
    /// # Errors
    ///
    /// `ExchangeError::Operation` (with the book untouched) when the entry's
    /// full volume would overflow the aggregate at its price level.
    pub fn submit(&mut self, entry: TradableEntry, state: MarketState) -> Result<()> {
        self.check_symbol(entry.symbol())?;
        self.ensure_room(&entry)?;
        debug!(symbol = %self.symbol, id = entry.id(), %state, "submit {entry}");

        let mut delivery = Delivery::default();
        self.add_to_book(entry, state, &mut delivery)?;
        self.publish_current_market(&mut delivery);
        delivery.finish()
    }

    /// Checked against the full volume, before any crossing.
    fn ensure_room(&self, entry: &TradableEntry) -> Result<()> {
        self.side(entry.side())
            .ensure_room(entry.price(), entry.original_volume())
            .map_err(|err| {
                warn!(symbol = %self.symbol, id = entry.id(), "level volume overflow");
                ExchangeError::from(err)
            })
    }

    fn add_to_book(
        &mut self,
        mut entry: TradableEntry,
        state: MarketState,
        delivery: &mut Delivery,
    ) -> Result<()> {
        if state == MarketState::PreOpen {
            self.side_mut(entry.side()).insert(entry)?;
            return Ok(());
        }

        let fills = self.cross(&mut entry, delivery);
        if !fills.is_empty() {
            self.publish_current_market(delivery);
            if let Some(lowest) = fills.lowest_priced() {
                let volume = entry.filled_volume();
                delivery.note(self.publisher.publish_last_sale(&self.symbol, lowest.price, volume));
            }
        }

        if entry.remaining_volume() == 0 {
            return Ok(());
        }
        if entry.price().is_market() {
            let notice = CancelEvent::for_entry(
                &entry,
                entry.remaining_volume(),
                format!("Cancelling order with order ID: {}", entry.id()),
            );
            debug!(symbol = %self.symbol, id = entry.id(), remaining = entry.remaining_volume(), "market remainder cancelled");
            self.archive.archive(entry);
            delivery.note(self.publisher.publish_cancel(&notice));
        } else {
            self.side_mut(entry.side()).insert(entry)?;
        }
        Ok(())
    }

    /// Run level passes until the aggressor is done or stops crossing, then
    /// publish the merged fills.
    fn cross(&mut self, aggressor: &mut TradableEntry, delivery: &mut Delivery) -> FillSet {
        let mut session = FillSet::new();

        while !aggressor.is_done() {
            let (opposite, archive) = match aggressor.side() {
                Side::Buy => (&mut self.sell_side, &mut self.archive),
                Side::Sell => (&mut self.buy_side, &mut self.archive),
            };
            let Some(best) = opposite.best_price() else {
                break;
            };
            let price = aggressor.price();
            let crosses = price.is_market()
                || match aggressor.side() {
                    Side::Buy => price.greater_or_equal(&best),
                    Side::Sell => price.less_or_equal(&best),
                };
            if !crosses {
                break;
            }

            let fills = self.strategy.match_level(aggressor, opposite, archive);
            if fills.is_empty() {
                break;
            }
            session.merge(fills);
        }

        for fill in session.iter() {
            delivery.note(self.publisher.publish_fill(fill));
        }
        session
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel a resting entry by id.
    ///
    /// If the id has already left the book, a "too late" notice is published
    /// instead.
    ///
    /// # Errors
    ///
    /// `ExchangeError::NotFound` if the id was never seen by this book.
    pub fn cancel_order(&mut self, side: Side, id: &str) -> Result<()> {
        let mut delivery = Delivery::default();

        let cancelled = {
            let (book_side, archive) = match side {
                Side::Buy => (&mut self.buy_side, &mut self.archive),
                Side::Sell => (&mut self.sell_side, &mut self.archive),
            };
            book_side.cancel_by_id(id, archive)
        };

        match cancelled {
            Some(event) => {
                debug!(symbol = %self.symbol, id, "order cancelled");
                delivery.note(self.publisher.publish_cancel(&event));
            }
            None => {
                let archived = self.archive.find_by_id(id).ok_or_else(|| {
                    ExchangeError::NotFound(format!("order {id} in {}", self.symbol))
                })?;
                debug!(symbol = %self.symbol, id, "too late to cancel");
                let notice = CancelEvent::for_entry(
                    archived,
                    archived.remaining_volume(),
                    format!("Too late to cancel order ID: {id}"),
                );
                delivery.note(self.publisher.publish_cancel(&notice));
            }
        }

        self.publish_current_market(&mut delivery);
        delivery.finish()
    }

    /// Cancel both sides of `owner`'s quote; either side may be absent.
    pub fn cancel_quote(&mut self, owner: &str) -> Result<()> {
        let mut delivery = Delivery::default();
        self.remove_quote(owner, &mut delivery);
        self.publish_current_market(&mut delivery);
        delivery.finish()
    }

    fn remove_quote(&mut self, owner: &str, delivery: &mut Delivery) -> Vec<TradableSummary> {
        let mut removed = Vec::with_capacity(2);
        for side in [Side::Buy, Side::Sell] {
            let cancelled = {
                let (book_side, archive) = match side {
                    Side::Buy => (&mut self.buy_side, &mut self.archive),
                    Side::Sell => (&mut self.sell_side, &mut self.archive),
                };
                book_side.cancel_by_owner(owner, archive)
            };
            if let Some((summary, event)) = cancelled {
                delivery.note(self.publisher.publish_cancel(&event));
                removed.push(summary);
            }
        }
        self.quoted_owners.remove(owner);
        debug!(symbol = %self.symbol, owner, sides = removed.len(), "quote removed");
        removed
    }

    // ========================================================================
    // Quotes
    // ========================================================================

    /// Replace `owner`'s quote with a new two-sided quote.
    ///
    /// # Errors
    ///
    /// `ExchangeError::Validation` (with the book untouched) when the sell
    /// price does not exceed the buy price, or either price or volume is not
    /// positive. `ExchangeError::Operation` (also with the book untouched)
    /// when either side would overflow its price level's aggregate volume.
    pub fn submit_quote(&mut self, quote: Quote, state: MarketState) -> Result<()> {
        self.check_symbol(quote.symbol())?;
        Self::validate_quote(&quote)?;
        self.ensure_room(quote.buy())?;
        self.ensure_room(quote.sell())?;

        let mut delivery = Delivery::default();
        let owner = quote.owner().to_string();
        if self.quoted_owners.contains(&owner) {
            self.remove_quote(&owner, &mut delivery);
        }

        let (buy, sell) = quote.into_sides();
        debug!(symbol = %self.symbol, %owner, buy = %buy, sell = %sell, "quote");
        self.add_to_book(buy, state, &mut delivery)?;
        self.add_to_book(sell, state, &mut delivery)?;
        self.quoted_owners.insert(owner);

        self.publish_current_market(&mut delivery);
        delivery.finish()
    }

    fn validate_quote(quote: &Quote) -> Result<()> {
        let zero = PriceValue::limit(0);
        let (buy, sell) = (quote.buy(), quote.sell());

        if !sell.price().greater_than(&buy.price()) {
            return Err(ExchangeError::Validation(format!(
                "sell price {} must be greater than buy price {}",
                sell.price(),
                buy.price()
            )));
        }
        if !buy.price().greater_than(&zero) || !sell.price().greater_than(&zero) {
            return Err(ExchangeError::Validation(format!(
                "quote prices must be positive (buy {}, sell {})",
                buy.price(),
                sell.price()
            )));
        }
        if buy.original_volume() == 0 || sell.original_volume() == 0 {
            return Err(ExchangeError::Validation("quote volumes must be positive".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Market lifecycle
    // ========================================================================

    /// Opening auction: keep crossing the best buy level against the sell
    /// side until the book no longer crosses.
    pub fn open_market(&mut self) -> Result<()> {
        let mut delivery = Delivery::default();
        let mut rounds = 0usize;

        loop {
            let (Some(buy_best), Some(sell_best)) =
                (self.buy_side.best_price(), self.sell_side.best_price())
            else {
                break;
            };
            let crossable = buy_best.greater_or_equal(&sell_best)
                || buy_best.is_market()
                || sell_best.is_market();
            if !crossable {
                break;
            }

            let mut sweep = FillSet::new();
            for key in self.buy_side.best_keys() {
                let Some(mut aggressor) = self.buy_side.entry(key).cloned() else {
                    continue;
                };
                let before = aggressor.remaining_volume();
                let fills = self.cross(&mut aggressor, &mut delivery);

                let traded = before - aggressor.remaining_volume();
                if traded > 0 {
                    self.buy_side.fill(key, traded);
                }
                if aggressor.is_done() {
                    // The matcher archived its copy already
                    self.buy_side.remove_filled(key);
                }
                sweep.merge(fills);
            }

            let Some(lowest) = sweep.lowest_priced() else {
                break;
            };
            rounds += 1;
            let (price, volume) = (lowest.price, lowest.volume);
            self.publish_current_market(&mut delivery);
            delivery.note(self.publisher.publish_last_sale(&self.symbol, price, volume));
        }

        self.publish_current_market(&mut delivery);
        info!(symbol = %self.symbol, rounds, "book opened");
        delivery.finish()
    }

    /// Cancel everything resting on both sides.
    pub fn close_market(&mut self) -> Result<()> {
        let mut delivery = Delivery::default();

        let mut cancels = self.buy_side.cancel_all(&mut self.archive);
        cancels.extend(self.sell_side.cancel_all(&mut self.archive));
        for event in &cancels {
            delivery.note(self.publisher.publish_cancel(event));
        }
        self.quoted_owners.clear();

        self.publish_current_market(&mut delivery);
        info!(symbol = %self.symbol, cancelled = cancels.len(), "book closed");
        delivery.finish()
    }

    // ========================================================================
    // Market data
    // ========================================================================

    /// Current top of book. Empty sides report `Limit(0)` and zero volume.
    pub fn market_data(&self) -> MarketSnapshot {
        MarketSnapshot {
            symbol: self.symbol.clone(),
            buy_price: self.buy_side.best_price().unwrap_or_default(),
            buy_volume: self.buy_side.best_volume(),
            sell_price: self.sell_side.best_price().unwrap_or_default(),
            sell_volume: self.sell_side.best_volume(),
        }
    }

    /// Publish the top of book if it differs from the last one published.
    pub fn update_current_market(&mut self) -> Result<()> {
        let mut delivery = Delivery::default();
        self.publish_current_market(&mut delivery);
        delivery.finish()
    }

    fn publish_current_market(&mut self, delivery: &mut Delivery) {
        let snapshot = self.market_data();
        let rendered = snapshot.to_string();
        if self.last_published.as_deref() == Some(rendered.as_str()) {
            return;
        }
        self.last_published = Some(rendered);
        delivery.note(self.publisher.publish_market_snapshot(&snapshot));
    }

    pub fn book_depth(&self) -> BookDepth {
        BookDepth {
            buy: self.buy_side.depth_snapshot(),
            sell: self.sell_side.depth_snapshot(),
        }
    }

    /// `owner`'s live entries on both sides, buy side first.
    pub fn orders_with_remaining(&self, owner: &str) -> Vec<TradableSummary> {
        let mut orders = self.buy_side.orders_with_remaining(owner);
        orders.extend(self.sell_side.orders_with_remaining(owner));
        orders
    }

    /// Hex SHA-256 over the live entries of both sides and the archive.
    ///
    /// Ids are left out, so two books fed the same command sequence produce
    /// the same digest.
    pub fn state_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.symbol.as_bytes());

        let live = self.buy_side.iter().chain(self.sell_side.iter());
        for entry in live.chain(self.archive.iter()) {
            hasher.update(entry.owner().as_bytes());
            hasher.update([entry.side() as u8, entry.is_quote() as u8]);
            hasher.update(entry.price().to_string().as_bytes());
            hasher.update(entry.original_volume().to_le_bytes());
            hasher.update(entry.remaining_volume().to_le_bytes());
            hasher.update(entry.cancelled_volume().to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
