//! Core value types for the matching engine.
//!
//! ## Types
//!
//! - [`PriceValue`]: a limit price in cents, or the market sentinel
//! - [`Side`]: Buy or Sell
//! - [`TradableEntry`]: an order or one side of a quote
//! - [`Quote`]: a two-sided quote from one owner
//! - [`FillEvent`] / [`CancelEvent`]: per-owner notifications
//! - [`MarketSnapshot`] / [`BookDepth`]: market data views
//!
//! ## Fixed-Point Prices
//!
//! Prices are stored as `i64` cents. `"$1,234.56"` is `PriceValue::limit(123_456)`.

pub mod message;
pub mod price;
pub mod tradable;

pub use message::{BookDepth, CancelEvent, FillEvent, MarketSnapshot};
pub use price::{PriceError, PriceValue, CENTS_PER_DOLLAR};
pub use tradable::{Quote, Side, TradableEntry, TradableSummary};
