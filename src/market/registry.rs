//! Symbol registry and global market state.
//!
//! ## Locking
//!
//! The registry lock (`RwLock`) guards the state and the symbol map. Each
//! book sits behind its own `Mutex`.
//!
//! - Per-symbol commands take the registry read lock, then the book lock
//! - State transitions take the registry write lock and reach every book
//!   through `Mutex::get_mut`, so they never wait on a book lock
//!
//! Books for different symbols are never locked together.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use matchbook::market::{MarketRegistry, MarketState};
//! use matchbook::publisher::EventLog;
//! use matchbook::types::{PriceValue, Side};
//!
//! let registry = MarketRegistry::new(Arc::new(EventLog::new()));
//! registry.create_symbol("AAA").unwrap();
//! registry.set_market_state(MarketState::PreOpen).unwrap();
//! registry.set_market_state(MarketState::Open).unwrap();
//!
//! let id = registry
//!     .submit_order("alice", "AAA", PriceValue::limit(1_000), 100, Side::Buy)
//!     .unwrap();
//! registry.cancel_order("AAA", Side::Buy, &id).unwrap();
//! assert_eq!(registry.book_depth("AAA").unwrap().buy, vec!["<Empty>"]);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, DEFAULT_BOOK_CAPACITY};
use crate::engine::{MatchingStrategy, PriceTimeMatcher};
use crate::error::{require_non_empty, ExchangeError, Result};
use crate::market::MarketState;
use crate::orderbook::Book;
use crate::publisher::Publisher;
use crate::types::{BookDepth, MarketSnapshot, PriceValue, Quote, Side, TradableEntry, TradableSummary};

#[derive(Debug, Default)]
struct RegistryInner {
    state: MarketState,
    books: HashMap<String, Mutex<Book>>,
}

/// Owns every book and the market-state machine.
pub struct MarketRegistry {
    inner: RwLock<RegistryInner>,
    publisher: Arc<dyn Publisher>,
    default_strategy: Arc<dyn MatchingStrategy>,
    book_capacity: usize,
}

impl std::fmt::Debug for MarketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MarketRegistry")
            .field("state", &inner.state)
            .field("symbols", &inner.books.len())
            .field("book_capacity", &self.book_capacity)
            .finish()
    }
}

impl MarketRegistry {
    /// Empty registry in the `Closed` state using price-time matching.
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            publisher,
            default_strategy: Arc::new(PriceTimeMatcher::new()),
            book_capacity: DEFAULT_BOOK_CAPACITY,
        }
    }

    /// Registry with the configured symbols already created.
    pub fn with_config(publisher: Arc<dyn Publisher>, config: &EngineConfig) -> Result<Self> {
        let mut registry = Self::new(publisher);
        registry.book_capacity = config.book_capacity;
        for symbol in &config.symbols {
            registry.create_symbol(symbol)?;
        }
        Ok(registry)
    }

    #[inline]
    pub fn publisher(&self) -> &Arc<dyn Publisher> {
        &self.publisher
    }

    pub fn market_state(&self) -> MarketState {
        self.inner.read().state
    }

    /// Created symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.inner.read().books.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    /// Create an empty book for `symbol` using price-time matching.
    ///
    /// # Errors
    ///
    /// * `Validation` - empty symbol
    /// * `Duplicate` - symbol already exists
    pub fn create_symbol(&self, symbol: &str) -> Result<()> {
        self.create_symbol_with_strategy(symbol, Arc::clone(&self.default_strategy))
    }

    /// Create an empty book for `symbol` matched by `strategy`.
    pub fn create_symbol_with_strategy(
        &self,
        symbol: &str,
        strategy: Arc<dyn MatchingStrategy>,
    ) -> Result<()> {
        require_non_empty(symbol, "symbol")?;

        let mut inner = self.inner.write();
        if inner.books.contains_key(symbol) {
            return Err(ExchangeError::Duplicate(format!("symbol {symbol} already exists")));
        }
        info!(symbol, strategy = strategy.name(), "symbol created");
        let book = Book::new(symbol, strategy, Arc::clone(&self.publisher), self.book_capacity);
        inner.books.insert(symbol.to_string(), Mutex::new(book));
        Ok(())
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Move to `target`, running the auction on `Open` and the close-out
    /// on `Closed`.
    ///
    /// # Errors
    ///
    /// `State` for anything but the single forward step. A `Delivery` error
    /// means the transition and its book side effects did happen.
    pub fn set_market_state(&self, target: MarketState) -> Result<()> {
        let mut inner = self.inner.write();
        inner.state.validate_transition(target)?;

        let previous = inner.state;
        inner.state = target;
        info!(from = %previous, to = %target, "market state changed");

        let mut first_error = None;
        if let Err(err) = self.publisher.publish_market_state(target) {
            warn!(error = %err, "market state publish failed");
            first_error = Some(ExchangeError::Delivery(err));
        }

        if matches!(target, MarketState::Open | MarketState::Closed) {
            let mut symbols: Vec<String> = inner.books.keys().cloned().collect();
            symbols.sort();
            for symbol in symbols {
                let Some(book) = inner.books.get_mut(&symbol) else {
                    continue;
                };
                let book = book.get_mut();
                let result = match target {
                    MarketState::Open => book.open_market(),
                    _ => book.close_market(),
                };
                if let Err(err) = result {
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Submit an order.
    ///
    /// # Returns
    ///
    /// The new entry's id
    ///
    /// # Errors
    ///
    /// * `Validation` - empty owner or symbol, zero volume
    /// * `State` - market closed, or a market order during pre-open
    /// * `NotFound` - unknown symbol
    /// * `OrderDelivery` - the order is live under the carried id, but a
    ///   notification for it could not be published
    pub fn submit_order(
        &self,
        owner: &str,
        symbol: &str,
        price: PriceValue,
        volume: u64,
        side: Side,
    ) -> Result<String> {
        let entry = TradableEntry::order(owner, symbol, price, volume, side)?;

        let inner = self.inner.read();
        match inner.state {
            MarketState::Closed => {
                return Err(ExchangeError::State(format!(
                    "cannot submit order for {symbol} while market is {}",
                    inner.state
                )))
            }
            MarketState::PreOpen if price.is_market() => {
                return Err(ExchangeError::State(format!(
                    "market orders are not accepted for {symbol} during {}",
                    inner.state
                )))
            }
            _ => {}
        }

        let book = Self::book(&inner, symbol)?;
        let id = entry.id().to_string();
        debug!(owner, symbol, %price, volume, %side, %id, "order submitted");
        let result = book.lock().submit(entry, inner.state);
        match result {
            Ok(()) => Ok(id),
            Err(ExchangeError::Delivery(source)) => Err(ExchangeError::OrderDelivery { id, source }),
            Err(err) => Err(err),
        }
    }

    /// Cancel a resting order by id.
    pub fn cancel_order(&self, symbol: &str, side: Side, id: &str) -> Result<()> {
        require_non_empty(symbol, "symbol")?;
        require_non_empty(id, "order id")?;

        let inner = self.inner.read();
        Self::require_not_closed(&inner, "cancel order", symbol)?;
        let book = Self::book(&inner, symbol)?;
        debug!(symbol, %side, id, "order cancel requested");
        let result = book.lock().cancel_order(side, id);
        result
    }

    /// Submit or replace `owner`'s two-sided quote.
    pub fn submit_quote(
        &self,
        owner: &str,
        symbol: &str,
        buy_price: PriceValue,
        buy_volume: u64,
        sell_price: PriceValue,
        sell_volume: u64,
    ) -> Result<()> {
        let quote = Quote::new(owner, symbol, buy_price, buy_volume, sell_price, sell_volume)?;

        let inner = self.inner.read();
        Self::require_not_closed(&inner, "submit quote", symbol)?;
        let book = Self::book(&inner, symbol)?;
        let result = book.lock().submit_quote(quote, inner.state);
        result
    }

    /// Cancel both sides of `owner`'s quote.
    pub fn cancel_quote(&self, owner: &str, symbol: &str) -> Result<()> {
        require_non_empty(owner, "owner")?;
        require_non_empty(symbol, "symbol")?;

        let inner = self.inner.read();
        Self::require_not_closed(&inner, "cancel quote", symbol)?;
        let book = Self::book(&inner, symbol)?;
        let result = book.lock().cancel_quote(owner);
        result
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn book_depth(&self, symbol: &str) -> Result<BookDepth> {
        self.inspect(symbol, Book::book_depth)
    }

    pub fn market_data(&self, symbol: &str) -> Result<MarketSnapshot> {
        self.inspect(symbol, Book::market_data)
    }

    /// `owner`'s live entries for `symbol`, buy side first.
    pub fn orders_with_remaining(&self, owner: &str, symbol: &str) -> Result<Vec<TradableSummary>> {
        require_non_empty(owner, "owner")?;
        self.inspect(symbol, |book| book.orders_with_remaining(owner))
    }

    /// Fingerprint of `symbol`'s live entries and archive.
    pub fn state_digest(&self, symbol: &str) -> Result<String> {
        self.inspect(symbol, Book::state_digest)
    }

    /// Run `read` against `symbol`'s book under its lock.
    pub fn inspect<T, F>(&self, symbol: &str, read: F) -> Result<T>
    where
        F: FnOnce(&Book) -> T,
    {
        require_non_empty(symbol, "symbol")?;
        let inner = self.inner.read();
        let book = Self::book(&inner, symbol)?;
        let guard = book.lock();
        Ok(read(&guard))
    }

    fn book<'a>(inner: &'a RegistryInner, symbol: &str) -> Result<&'a Mutex<Book>> {
        inner
            .books
            .get(symbol)
            .ok_or_else(|| ExchangeError::NotFound(format!("symbol {symbol}")))
    }

    fn require_not_closed(inner: &RegistryInner, action: &str, symbol: &str) -> Result<()> {
        if inner.state == MarketState::Closed {
            return Err(ExchangeError::State(format!(
                "cannot {action} for {symbol} while market is {}",
                inner.state
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{EventLog, Published};

    fn registry() -> (MarketRegistry, Arc<EventLog>) {
        let log = Arc::new(EventLog::new());
        let registry = MarketRegistry::new(log.clone());
        registry.create_symbol("AAA").unwrap();
        (registry, log)
    }

    fn open(registry: &MarketRegistry) {
        registry.set_market_state(MarketState::PreOpen).unwrap();
        registry.set_market_state(MarketState::Open).unwrap();
    }

    #[test]
    fn test_create_symbol_rules() {
        let (registry, _) = registry();
        assert!(matches!(registry.create_symbol("AAA"), Err(ExchangeError::Duplicate(_))));
        assert!(matches!(registry.create_symbol("  "), Err(ExchangeError::Validation(_))));

        registry.create_symbol("BBB").unwrap();
        assert_eq!(registry.symbols(), vec!["AAA", "BBB"]);
    }

    #[test]
    fn test_transitions() {
        let (registry, log) = registry();
        assert_eq!(registry.market_state(), MarketState::Closed);
        assert!(matches!(
            registry.set_market_state(MarketState::Open),
            Err(ExchangeError::State(_))
        ));

        open(&registry);
        assert!(matches!(
            registry.set_market_state(MarketState::PreOpen),
            Err(ExchangeError::State(_))
        ));
        registry.set_market_state(MarketState::Closed).unwrap();

        let states: Vec<_> = log
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Published::MarketState(state) => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![MarketState::PreOpen, MarketState::Open, MarketState::Closed]
        );
    }

    #[test]
    fn test_submit_check_order() {
        let (registry, _) = registry();
        // Validation comes before the state check
        assert!(matches!(
            registry.submit_order("", "AAA", PriceValue::limit(100), 1, Side::Buy),
            Err(ExchangeError::Validation(_))
        ));
        assert!(matches!(
            registry.submit_order("a", "AAA", PriceValue::limit(100), 1, Side::Buy),
            Err(ExchangeError::State(_))
        ));

        registry.set_market_state(MarketState::PreOpen).unwrap();
        assert!(matches!(
            registry.submit_order("a", "AAA", PriceValue::market(), 1, Side::Buy),
            Err(ExchangeError::State(_))
        ));
        assert!(matches!(
            registry.submit_order("a", "ZZZ", PriceValue::limit(100), 1, Side::Buy),
            Err(ExchangeError::NotFound(_))
        ));
        assert!(registry
            .submit_order("a", "AAA", PriceValue::limit(100), 1, Side::Buy)
            .is_ok());
    }

    #[test]
    fn test_commands_rejected_when_closed() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.cancel_order("AAA", Side::Buy, "x"),
            Err(ExchangeError::State(_))
        ));
        assert!(matches!(
            registry.submit_quote("mm", "AAA", PriceValue::limit(900), 10, PriceValue::limit(950), 10),
            Err(ExchangeError::State(_))
        ));
        assert!(matches!(registry.cancel_quote("mm", "AAA"), Err(ExchangeError::State(_))));
    }

    #[test]
    fn test_queries_on_unknown_symbol() {
        let (registry, _) = registry();
        assert!(matches!(registry.book_depth("ZZZ"), Err(ExchangeError::NotFound(_))));
        assert!(matches!(registry.market_data("ZZZ"), Err(ExchangeError::NotFound(_))));
        assert!(matches!(registry.state_digest("ZZZ"), Err(ExchangeError::NotFound(_))));
        assert!(matches!(
            registry.orders_with_remaining("a", "ZZZ"),
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[test]
    fn test_close_cancels_resting_entries() {
        let (registry, log) = registry();
        open(&registry);
        registry
            .submit_order("a", "AAA", PriceValue::limit(900), 10, Side::Buy)
            .unwrap();

        registry.set_market_state(MarketState::Closed).unwrap();

        assert_eq!(registry.book_depth("AAA").unwrap().buy, vec!["<Empty>"]);
        assert_eq!(log.cancels().len(), 1);
        assert!(registry.orders_with_remaining("a", "AAA").unwrap().is_empty());
    }

    #[test]
    fn test_with_config_creates_symbols() {
        let config = EngineConfig {
            symbols: vec!["AAA".to_string(), "BBB".to_string()],
            book_capacity: 8,
            ..EngineConfig::default()
        };
        let registry = MarketRegistry::with_config(Arc::new(EventLog::new()), &config).unwrap();
        assert_eq!(registry.symbols(), vec!["AAA", "BBB"]);

        let duplicate = EngineConfig {
            symbols: vec!["AAA".to_string(), "AAA".to_string()],
            ..EngineConfig::default()
        };
        assert!(matches!(
            MarketRegistry::with_config(Arc::new(EventLog::new()), &duplicate),
            Err(ExchangeError::Duplicate(_))
        ));
    }

    /// Strategy that never trades.
    #[derive(Debug)]
    struct NoCross;

    impl MatchingStrategy for NoCross {
        fn name(&self) -> &str {
            "no-cross"
        }

        fn match_level(
            &self,
            _aggressor: &mut TradableEntry,
            _opposite: &mut crate::orderbook::BookSide,
            _archive: &mut crate::orderbook::Archive,
        ) -> crate::engine::FillSet {
            crate::engine::FillSet::new()
        }
    }

    #[test]
    fn test_strategy_per_symbol() {
        let (registry, log) = registry();
        registry.create_symbol_with_strategy("BBB", Arc::new(NoCross)).unwrap();
        open(&registry);

        for symbol in ["AAA", "BBB"] {
            registry
                .submit_order("a", symbol, PriceValue::limit(1_000), 10, Side::Buy)
                .unwrap();
            registry
                .submit_order("b", symbol, PriceValue::limit(1_000), 10, Side::Sell)
                .unwrap();
        }

        assert!(log.fills().iter().all(|fill| fill.symbol == "AAA"));
        assert_eq!(registry.book_depth("AAA").unwrap().sell, vec!["<Empty>"]);
        assert_eq!(registry.book_depth("BBB").unwrap().sell, vec!["$10.00 x 10"]);
    }

    #[test]
    fn test_transition_with_failing_publisher_still_applies() {
        let (registry, log) = registry();
        log.set_failing(true);

        let result = registry.set_market_state(MarketState::PreOpen);

        assert!(matches!(result, Err(ExchangeError::Delivery(_))));
        assert_eq!(registry.market_state(), MarketState::PreOpen);
    }

    #[test]
    fn test_submit_with_failing_publisher_returns_live_id() {
        let (registry, log) = registry();
        open(&registry);
        log.set_failing(true);

        let err = registry
            .submit_order("a", "AAA", PriceValue::limit(900), 10, Side::Buy)
            .unwrap_err();
        let id = err.accepted_id().unwrap().to_string();
        assert!(matches!(err, ExchangeError::OrderDelivery { .. }));
        assert_eq!(registry.book_depth("AAA").unwrap().buy, vec!["$9.00 x 10"]);

        log.set_failing(false);
        registry.cancel_order("AAA", Side::Buy, &id).unwrap();
        assert_eq!(registry.book_depth("AAA").unwrap().buy, vec!["<Empty>"]);
    }

    #[test]
    fn test_level_volume_overflow_rejected() {
        let (registry, _) = registry();
        open(&registry);
        registry
            .submit_order("a", "AAA", PriceValue::limit(1_000), u64::MAX, Side::Buy)
            .unwrap();

        let result = registry.submit_order("b", "AAA", PriceValue::limit(1_000), u64::MAX, Side::Buy);

        assert!(matches!(result, Err(ExchangeError::Operation(_))));
        let depth = registry.book_depth("AAA").unwrap();
        assert_eq!(depth.buy.len(), 1);
        assert_eq!(registry.orders_with_remaining("b", "AAA").unwrap().len(), 0);
    }

    #[test]
    fn test_inspect() {
        let (registry, _) = registry();
        open(&registry);
        registry
            .submit_order("a", "AAA", PriceValue::limit(900), 10, Side::Buy)
            .unwrap();

        let resting = registry.inspect("AAA", |book| book.side(Side::Buy).len()).unwrap();
        assert_eq!(resting, 1);
        assert!(matches!(registry.inspect("ZZZ", |_| ()), Err(ExchangeError::NotFound(_))));
    }
}
