//! # matchbook
//!
//! Single-exchange order-matching engine.
//!
//! ## Architecture
//!
//! - **Types**: prices, tradable entries, quotes and outbound events
//! - **OrderBook**: per-symbol books with slab-backed price levels
//! - **Engine**: pluggable matching strategies (price-time by default)
//! - **Market**: the symbol registry and the `Closed -> PreOpen -> Open` cycle
//! - **Publisher**: the outbound notification interface and its implementations
//!
//! ## Design Principles
//!
//! 1. **Determinism**: the same commands produce the same book and the same events
//! 2. **No Floating Point**: prices are integer cents
//! 3. **Commit, then notify**: a failed publish never rolls back a book change
//! 4. **Synchronous Execution**: every command runs to completion under its book lock
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use matchbook::{MarketRegistry, MarketState, PriceValue, Side};
//! use matchbook::publisher::EventLog;
//!
//! let log = Arc::new(EventLog::new());
//! let registry = MarketRegistry::new(log.clone());
//! registry.create_symbol("AAA").unwrap();
//! registry.set_market_state(MarketState::PreOpen).unwrap();
//! registry.set_market_state(MarketState::Open).unwrap();
//!
//! registry.submit_order("alice", "AAA", PriceValue::limit(1_000), 200, Side::Buy).unwrap();
//! registry.submit_order("bob", "AAA", PriceValue::limit(1_000), 150, Side::Sell).unwrap();
//!
//! assert_eq!(registry.book_depth("AAA").unwrap().buy, vec!["$10.00 x 50"]);
//! assert_eq!(log.fills().len(), 2);
//! ```

// ============================================================================
// Module declarations
// ============================================================================

/// Value types: PriceValue, TradableEntry, events
pub mod types;

/// Books, sides, price levels and the archive
pub mod orderbook;

/// Matching strategies
pub mod engine;

/// Market state and the symbol registry
pub mod market;

/// Outbound notifications
pub mod publisher;

/// Environment-driven configuration
pub mod config;

/// Error taxonomy
pub mod error;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::EngineConfig;
pub use engine::{MatchingStrategy, PriceTimeMatcher};
pub use error::{ExchangeError, Result};
pub use market::{MarketRegistry, MarketState};
pub use orderbook::{Archive, Book, BookSide};
pub use publisher::{EventLog, MessageBus, PublishError, Publisher, Subscriber};
pub use types::{PriceValue, Quote, Side, TradableEntry, TradableSummary};
