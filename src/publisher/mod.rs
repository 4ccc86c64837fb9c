//! Outbound notification interface.
//!
//! The engine reports everything it does through a [`Publisher`]: fills and
//! cancels for the owning user, top-of-book snapshots and last sales for
//! everyone watching a symbol, and market-state changes for every
//! subscriber.
//!
//! ## Components
//!
//! - [`Publisher`]: the trait books and the registry call
//! - [`Subscriber`]: the receiving end, keyed by name
//! - [`MessageBus`]: per-symbol fan-out with ticker direction tracking
//! - [`EventLog`]: records every publication in order
//!
//! Delivery errors are returned to the caller, but by the time a publish
//! call runs the book mutation that produced it has already happened.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::market::MarketState;
use crate::types::{CancelEvent, FillEvent, MarketSnapshot, PriceValue};

pub mod bus;
pub mod log;
pub mod subscriber;

pub use bus::MessageBus;
pub use log::{EventLog, Published};
pub use subscriber::{LogSubscriber, Subscriber};

/// Publisher and subscriber failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("{subscriber} is already subscribed to {symbol}")]
    AlreadySubscribed { subscriber: String, symbol: String },

    #[error("{subscriber} is not subscribed to {symbol}")]
    NotSubscribed { subscriber: String, symbol: String },

    /// A subscriber refused or failed to take a message.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Movement of a symbol's ticker relative to its previous ticker price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickDirection {
    Up,
    Down,
    Flat,
    /// First ticker seen for the symbol
    None,
}

impl TickDirection {
    pub fn as_char(self) -> char {
        match self {
            TickDirection::Up => '\u{2191}',
            TickDirection::Down => '\u{2193}',
            TickDirection::Flat => '=',
            TickDirection::None => ' ',
        }
    }
}

impl fmt::Display for TickDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Sink for everything the engine reports.
///
/// Implementations must be shareable across the threads driving different
/// books.
pub trait Publisher: Send + Sync {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber>, symbol: &str) -> Result<(), PublishError>;

    fn unsubscribe(&self, subscriber: &str, symbol: &str) -> Result<(), PublishError>;

    /// Deliver a fill to its owner.
    fn publish_fill(&self, fill: &FillEvent) -> Result<(), PublishError>;

    /// Deliver a cancel notice to its owner.
    fn publish_cancel(&self, cancel: &CancelEvent) -> Result<(), PublishError>;

    /// Broadcast a changed top of book.
    fn publish_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PublishError>;

    /// Broadcast a last sale. Also advances the symbol's ticker.
    fn publish_last_sale(&self, symbol: &str, price: PriceValue, volume: u64)
        -> Result<(), PublishError>;

    /// Broadcast a ticker price; direction is derived from the previous one.
    fn publish_ticker(&self, symbol: &str, price: PriceValue) -> Result<(), PublishError>;

    /// Broadcast a market-state change to every subscriber once.
    fn publish_market_state(&self, state: MarketState) -> Result<(), PublishError>;
}
