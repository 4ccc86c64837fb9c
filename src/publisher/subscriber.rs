//! Receiving end of published messages.

use tracing::info;

use crate::market::MarketState;
use crate::publisher::{PublishError, TickDirection};
use crate::types::{CancelEvent, FillEvent, MarketSnapshot, PriceValue};

/// A named party that receives engine notifications.
///
/// Every method defaults to accepting and discarding the message, so a
/// subscriber only overrides what it cares about.
pub trait Subscriber: Send + Sync {
    /// Unique name; fills and cancels are routed by comparing it with the
    /// event owner.
    fn name(&self) -> &str;

    fn accept_fill(&self, _fill: &FillEvent) -> Result<(), PublishError> {
        Ok(())
    }

    fn accept_cancel(&self, _cancel: &CancelEvent) -> Result<(), PublishError> {
        Ok(())
    }

    fn accept_market_snapshot(&self, _snapshot: &MarketSnapshot) -> Result<(), PublishError> {
        Ok(())
    }

    fn accept_last_sale(
        &self,
        _symbol: &str,
        _price: PriceValue,
        _volume: u64,
    ) -> Result<(), PublishError> {
        Ok(())
    }

    fn accept_ticker(
        &self,
        _symbol: &str,
        _price: PriceValue,
        _direction: TickDirection,
    ) -> Result<(), PublishError> {
        Ok(())
    }

    fn accept_market_state(&self, _state: MarketState) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Subscriber that writes everything it receives to the log.
#[derive(Debug, Clone)]
pub struct LogSubscriber {
    name: String,
}

impl LogSubscriber {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Subscriber for LogSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept_fill(&self, fill: &FillEvent) -> Result<(), PublishError> {
        info!(subscriber = %self.name, "fill: {fill}");
        Ok(())
    }

    fn accept_cancel(&self, cancel: &CancelEvent) -> Result<(), PublishError> {
        info!(subscriber = %self.name, "cancel: {cancel}");
        Ok(())
    }

    fn accept_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PublishError> {
        info!(subscriber = %self.name, "market: {snapshot}");
        Ok(())
    }

    fn accept_last_sale(
        &self,
        symbol: &str,
        price: PriceValue,
        volume: u64,
    ) -> Result<(), PublishError> {
        info!(subscriber = %self.name, "last sale: {symbol} {volume}@{price}");
        Ok(())
    }

    fn accept_ticker(
        &self,
        symbol: &str,
        price: PriceValue,
        direction: TickDirection,
    ) -> Result<(), PublishError> {
        info!(subscriber = %self.name, "ticker: {symbol} {price} {direction}");
        Ok(())
    }

    fn accept_market_state(&self, state: MarketState) -> Result<(), PublishError> {
        info!(subscriber = %self.name, "market state: {state}");
        Ok(())
    }
}
