//! matchbook - demo session
//!
//! Loads `EngineConfig` from the environment, wires a `MessageBus` with
//! logging subscribers, and walks one trading day: quotes during pre-open,
//! the opening auction, continuous orders, and the close.

use std::sync::Arc;

use matchbook::config::{EngineConfig, DEFAULT_LOG_FILTER};
use matchbook::market::{MarketRegistry, MarketState};
use matchbook::publisher::{LogSubscriber, MessageBus, Publisher};
use matchbook::types::{PriceValue, Side};
use matchbook::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEMO_SYMBOLS: [&str; 2] = ["AAA", "BBB"];
const TRADERS: [&str; 3] = ["alice", "bob", "mm"];

fn main() -> Result<()> {
    let mut config = EngineConfig::try_from_env()?;
    if config.symbols.is_empty() {
        config.symbols = DEMO_SYMBOLS.iter().map(|s| s.to_string()).collect();
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(fmt::layer())
        .init();

    let bus = Arc::new(MessageBus::new());
    for trader in TRADERS {
        let subscriber = Arc::new(LogSubscriber::new(trader));
        for symbol in &config.symbols {
            bus.subscribe(subscriber.clone(), symbol)?;
        }
    }

    let registry = MarketRegistry::with_config(bus.clone(), &config)?;
    let symbol = config.symbols[0].as_str();
    info!(symbols = ?registry.symbols(), "registry ready");

    // Pre-open: stage quotes and a crossing limit order
    registry.set_market_state(MarketState::PreOpen)?;
    registry.submit_quote(
        "mm",
        symbol,
        PriceValue::parse_dollars("9.00")?,
        100,
        PriceValue::parse_dollars("9.50")?,
        100,
    )?;
    registry.submit_order("alice", symbol, PriceValue::parse_dollars("9.60")?, 40, Side::Buy)?;
    report(&registry, symbol)?;

    // Open: the auction sweeps alice's bid against the quote
    registry.set_market_state(MarketState::Open)?;
    report(&registry, symbol)?;

    // Continuous trading
    let resting = registry.submit_order("bob", symbol, PriceValue::parse_dollars("8.95")?, 50, Side::Buy)?;
    registry.submit_order("alice", symbol, PriceValue::market(), 120, Side::Sell)?;
    registry.cancel_order(symbol, Side::Buy, &resting)?;
    registry.submit_quote(
        "mm",
        symbol,
        PriceValue::parse_dollars("9.10")?,
        200,
        PriceValue::parse_dollars("9.40")?,
        200,
    )?;
    for order in registry.orders_with_remaining("mm", symbol)? {
        info!("open: {order}");
    }
    report(&registry, symbol)?;

    registry.set_market_state(MarketState::Closed)?;
    report(&registry, symbol)?;
    info!(symbol, digest = %registry.state_digest(symbol)?, "session complete");
    Ok(())
}

fn report(registry: &MarketRegistry, symbol: &str) -> Result<()> {
    let depth = registry.book_depth(symbol)?;
    info!(state = %registry.market_state(), "{}", registry.market_data(symbol)?);
    info!(buy = ?depth.buy, sell = ?depth.sell, "depth");
    Ok(())
}
