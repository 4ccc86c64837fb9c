//! Recording publisher.
//!
//! `EventLog` keeps every publication in call order. It is what the tests
//! and the demo binary use to look at the engine's outbound traffic, and it
//! can be switched into a failing mode to exercise delivery-error handling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::market::MarketState;
use crate::publisher::{PublishError, Publisher, Subscriber};
use crate::types::{CancelEvent, FillEvent, MarketSnapshot, PriceValue};

/// One recorded publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Fill(FillEvent),
    Cancel(CancelEvent),
    Snapshot(MarketSnapshot),
    LastSale {
        symbol: String,
        price: PriceValue,
        volume: u64,
    },
    Ticker {
        symbol: String,
        price: PriceValue,
    },
    MarketState(MarketState),
}

/// Publisher that records instead of delivering.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Published>>,
    subscriptions: Mutex<HashSet<(String, String)>>,
    failing: AtomicBool,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every publish call still records but then fails.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<Published> {
        self.events.lock().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn fills(&self) -> Vec<FillEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Published::Fill(fill) => Some(fill.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> Vec<CancelEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Published::Cancel(cancel) => Some(cancel.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn snapshots(&self) -> Vec<MarketSnapshot> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Published::Snapshot(snapshot) => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(symbol, price, volume)` for each last sale.
    pub fn last_sales(&self) -> Vec<(String, PriceValue, u64)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Published::LastSale { symbol, price, volume } => {
                    Some((symbol.clone(), *price, *volume))
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Published) -> Result<(), PublishError> {
        self.events.lock().push(event);
        if self.failing.load(Ordering::SeqCst) {
            Err(PublishError::DeliveryFailed("event log is failing".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Publisher for EventLog {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber>, symbol: &str) -> Result<(), PublishError> {
        let key = (subscriber.name().to_string(), symbol.to_string());
        if !self.subscriptions.lock().insert(key) {
            return Err(PublishError::AlreadySubscribed {
                subscriber: subscriber.name().to_string(),
                symbol: symbol.to_string(),
            });
        }
        Ok(())
    }

    fn unsubscribe(&self, subscriber: &str, symbol: &str) -> Result<(), PublishError> {
        let key = (subscriber.to_string(), symbol.to_string());
        if !self.subscriptions.lock().remove(&key) {
            return Err(PublishError::NotSubscribed {
                subscriber: subscriber.to_string(),
                symbol: symbol.to_string(),
            });
        }
        Ok(())
    }

    fn publish_fill(&self, fill: &FillEvent) -> Result<(), PublishError> {
        self.record(Published::Fill(fill.clone()))
    }

    fn publish_cancel(&self, cancel: &CancelEvent) -> Result<(), PublishError> {
        self.record(Published::Cancel(cancel.clone()))
    }

    fn publish_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PublishError> {
        self.record(Published::Snapshot(snapshot.clone()))
    }

    fn publish_last_sale(
        &self,
        symbol: &str,
        price: PriceValue,
        volume: u64,
    ) -> Result<(), PublishError> {
        let sale = self.record(Published::LastSale {
            symbol: symbol.to_string(),
            price,
            volume,
        });
        let ticker = self.publish_ticker(symbol, price);
        sale.and(ticker)
    }

    fn publish_ticker(&self, symbol: &str, price: PriceValue) -> Result<(), PublishError> {
        self.record(Published::Ticker {
            symbol: symbol.to_string(),
            price,
        })
    }

    fn publish_market_state(&self, state: MarketState) -> Result<(), PublishError> {
        self.record(Published::MarketState(state))
    }
}
