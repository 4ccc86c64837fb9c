//! Per-symbol fan-out publisher.
//!
//! ## Routing
//!
//! | Message         | Receivers                                        |
//! |-----------------|--------------------------------------------------|
//! | fill, cancel    | the symbol's subscriber named like the owner     |
//! | snapshot        | every subscriber of the symbol                   |
//! | last sale       | every subscriber of the symbol, then ticker      |
//! | ticker          | every subscriber of the symbol                   |
//! | market state    | every distinct subscriber, once                  |
//!
//! Subscriber lists are copied out before delivery so no lock is held while
//! a subscriber runs. Delivery continues past a failing subscriber and the
//! first error is returned afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::market::MarketState;
use crate::publisher::{PublishError, Publisher, Subscriber, TickDirection};
use crate::types::{CancelEvent, FillEvent, MarketSnapshot, PriceValue};

type SubscriberList = Vec<Arc<dyn Subscriber>>;

/// In-process publisher delivering straight to subscriber callbacks.
#[derive(Default)]
pub struct MessageBus {
    subscriptions: RwLock<BTreeMap<String, SubscriberList>>,
    tickers: Mutex<HashMap<String, PriceValue>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribers for `symbol`.
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.subscriptions.read().get(symbol).map_or(0, Vec::len)
    }

    /// Last ticker price seen for `symbol`.
    pub fn last_ticker(&self, symbol: &str) -> Option<PriceValue> {
        self.tickers.lock().get(symbol).copied()
    }

    fn subscribers_of(&self, symbol: &str) -> SubscriberList {
        self.subscriptions
            .read()
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    fn owner_of(&self, symbol: &str, owner: &str) -> SubscriberList {
        self.subscribers_of(symbol)
            .into_iter()
            .filter(|subscriber| subscriber.name() == owner)
            .collect()
    }

    /// Call `deliver` on every subscriber, keeping the first failure.
    fn fan_out<F>(subscribers: &[Arc<dyn Subscriber>], mut deliver: F) -> Result<(), PublishError>
    where
        F: FnMut(&dyn Subscriber) -> Result<(), PublishError>,
    {
        let mut first_error = None;
        for subscriber in subscribers {
            if let Err(err) = deliver(subscriber.as_ref()) {
                debug!(subscriber = subscriber.name(), error = %err, "delivery failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn direction(previous: Option<PriceValue>, price: PriceValue) -> TickDirection {
        match previous {
            None => TickDirection::None,
            Some(prev) if price.value_eq(&prev) || price == prev => TickDirection::Flat,
            Some(prev) if price.greater_than(&prev) => TickDirection::Up,
            Some(prev) if price.less_than(&prev) => TickDirection::Down,
            Some(_) => TickDirection::None,
        }
    }
}

impl Publisher for MessageBus {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber>, symbol: &str) -> Result<(), PublishError> {
        let mut subscriptions = self.subscriptions.write();
        let list = subscriptions.entry(symbol.to_string()).or_default();
        if list.iter().any(|s| s.name() == subscriber.name()) {
            return Err(PublishError::AlreadySubscribed {
                subscriber: subscriber.name().to_string(),
                symbol: symbol.to_string(),
            });
        }
        debug!(subscriber = subscriber.name(), symbol, "subscribed");
        list.push(subscriber);
        Ok(())
    }

    fn unsubscribe(&self, subscriber: &str, symbol: &str) -> Result<(), PublishError> {
        let mut subscriptions = self.subscriptions.write();
        let not_subscribed = || PublishError::NotSubscribed {
            subscriber: subscriber.to_string(),
            symbol: symbol.to_string(),
        };
        let list = subscriptions.get_mut(symbol).ok_or_else(not_subscribed)?;
        let position = list
            .iter()
            .position(|s| s.name() == subscriber)
            .ok_or_else(not_subscribed)?;
        list.remove(position);
        debug!(subscriber, symbol, "unsubscribed");
        Ok(())
    }

    fn publish_fill(&self, fill: &FillEvent) -> Result<(), PublishError> {
        let receivers = self.owner_of(&fill.symbol, &fill.owner);
        Self::fan_out(&receivers, |s| s.accept_fill(fill))
    }

    fn publish_cancel(&self, cancel: &CancelEvent) -> Result<(), PublishError> {
        let receivers = self.owner_of(&cancel.symbol, &cancel.owner);
        Self::fan_out(&receivers, |s| s.accept_cancel(cancel))
    }

    fn publish_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PublishError> {
        let receivers = self.subscribers_of(&snapshot.symbol);
        Self::fan_out(&receivers, |s| s.accept_market_snapshot(snapshot))
    }

    fn publish_last_sale(
        &self,
        symbol: &str,
        price: PriceValue,
        volume: u64,
    ) -> Result<(), PublishError> {
        let receivers = self.subscribers_of(symbol);
        let sale = Self::fan_out(&receivers, |s| s.accept_last_sale(symbol, price, volume));
        let ticker = self.publish_ticker(symbol, price);
        sale.and(ticker)
    }

    fn publish_ticker(&self, symbol: &str, price: PriceValue) -> Result<(), PublishError> {
        let previous = self.tickers.lock().insert(symbol.to_string(), price);
        let direction = Self::direction(previous, price);
        let receivers = self.subscribers_of(symbol);
        Self::fan_out(&receivers, |s| s.accept_ticker(symbol, price, direction))
    }

    fn publish_market_state(&self, state: MarketState) -> Result<(), PublishError> {
        let receivers: SubscriberList = {
            let subscriptions = self.subscriptions.read();
            let mut seen = HashSet::new();
            subscriptions
                .values()
                .flatten()
                .filter(|s| seen.insert(s.name().to_string()))
                .cloned()
                .collect()
        };
        Self::fan_out(&receivers, |s| s.accept_market_state(state))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    /// Subscriber that remembers what it was sent as plain strings.
    struct Recorder {
        name: String,
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self { name: name.to_string(), seen: Mutex::new(Vec::new()), fail: false })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self { name: name.to_string(), seen: Mutex::new(Vec::new()), fail: true })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().clone()
        }

        fn push(&self, line: String) -> Result<(), PublishError> {
            self.seen.lock().push(line);
            if self.fail {
                Err(PublishError::DeliveryFailed(self.name.clone()))
            } else {
                Ok(())
            }
        }
    }

    impl Subscriber for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn accept_fill(&self, fill: &FillEvent) -> Result<(), PublishError> {
            self.push(format!("fill {}", fill.volume))
        }

        fn accept_cancel(&self, cancel: &CancelEvent) -> Result<(), PublishError> {
            self.push(format!("cancel {}", cancel.volume))
        }

        fn accept_market_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PublishError> {
            self.push(format!("market {}", snapshot.symbol))
        }

        fn accept_last_sale(&self, _: &str, price: PriceValue, volume: u64) -> Result<(), PublishError> {
            self.push(format!("sale {volume}@{price}"))
        }

        fn accept_ticker(
            &self,
            _: &str,
            price: PriceValue,
            direction: TickDirection,
        ) -> Result<(), PublishError> {
            self.push(format!("ticker {price}{direction}"))
        }

        fn accept_market_state(&self, state: MarketState) -> Result<(), PublishError> {
            self.push(format!("state {state}"))
        }
    }

    fn fill_for(owner: &str) -> FillEvent {
        FillEvent {
            owner: owner.to_string(),
            symbol: "AAA".to_string(),
            price: PriceValue::limit(1_000),
            volume: 10,
            details: "leaving 0".to_string(),
            side: Side::Buy,
            id: "x".to_string(),
        }
    }

    #[test]
    fn test_subscribe_twice_fails() {
        let bus = MessageBus::new();
        let alice = Recorder::new("alice");
        bus.subscribe(alice.clone(), "AAA").unwrap();

        assert!(matches!(
            bus.subscribe(alice.clone(), "AAA"),
            Err(PublishError::AlreadySubscribed { .. })
        ));
        assert!(bus.subscribe(alice, "BBB").is_ok());
        assert_eq!(bus.subscriber_count("AAA"), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = MessageBus::new();
        bus.subscribe(Recorder::new("alice"), "AAA").unwrap();

        assert!(bus.unsubscribe("alice", "AAA").is_ok());
        assert!(matches!(
            bus.unsubscribe("alice", "AAA"),
            Err(PublishError::NotSubscribed { .. })
        ));
        assert!(matches!(
            bus.unsubscribe("alice", "ZZZ"),
            Err(PublishError::NotSubscribed { .. })
        ));
    }

    #[test]
    fn test_fill_routed_to_owner_only() {
        let bus = MessageBus::new();
        let alice = Recorder::new("alice");
        let bob = Recorder::new("bob");
        bus.subscribe(alice.clone(), "AAA").unwrap();
        bus.subscribe(bob.clone(), "AAA").unwrap();

        bus.publish_fill(&fill_for("alice")).unwrap();

        assert_eq!(alice.seen(), vec!["fill 10"]);
        assert!(bob.seen().is_empty());
    }

    #[test]
    fn test_last_sale_drives_ticker_direction() {
        let bus = MessageBus::new();
        let alice = Recorder::new("alice");
        bus.subscribe(alice.clone(), "AAA").unwrap();

        bus.publish_last_sale("AAA", PriceValue::limit(1_000), 5).unwrap();
        bus.publish_last_sale("AAA", PriceValue::limit(1_010), 5).unwrap();
        bus.publish_last_sale("AAA", PriceValue::limit(1_010), 5).unwrap();
        bus.publish_last_sale("AAA", PriceValue::limit(990), 5).unwrap();

        let tickers: Vec<_> = alice.seen().into_iter().filter(|l| l.starts_with("ticker")).collect();
        assert_eq!(
            tickers,
            vec![
                "ticker $10.00 ".to_string(),
                "ticker $10.10\u{2191}".to_string(),
                "ticker $10.10=".to_string(),
                "ticker $9.90\u{2193}".to_string(),
            ]
        );
        assert_eq!(bus.last_ticker("AAA"), Some(PriceValue::limit(990)));
    }

    #[test]
    fn test_market_state_reaches_each_subscriber_once() {
        let bus = MessageBus::new();
        let alice = Recorder::new("alice");
        bus.subscribe(alice.clone(), "AAA").unwrap();
        bus.subscribe(alice.clone(), "BBB").unwrap();

        bus.publish_market_state(MarketState::Open).unwrap();

        assert_eq!(alice.seen(), vec!["state OPEN"]);
    }

    #[test]
    fn test_failing_subscriber_does_not_block_others() {
        let bus = MessageBus::new();
        let broken = Recorder::failing("broken");
        let ok = Recorder::new("ok");
        bus.subscribe(broken.clone(), "AAA").unwrap();
        bus.subscribe(ok.clone(), "AAA").unwrap();

        let snapshot = MarketSnapshot {
            symbol: "AAA".to_string(),
            buy_price: PriceValue::limit(0),
            buy_volume: 0,
            sell_price: PriceValue::limit(0),
            sell_volume: 0,
        };
        let result = bus.publish_market_snapshot(&snapshot);

        assert_eq!(result, Err(PublishError::DeliveryFailed("broken".to_string())));
        assert_eq!(ok.seen(), vec!["market AAA"]);
    }
}
