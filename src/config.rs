//! Engine configuration loaded from the environment.

use std::env;

use dotenvy::dotenv;
use tracing::info;

use crate::error::{ExchangeError, Result};

const SYMBOLS: &str = "MATCHBOOK_SYMBOLS";
const BOOK_CAPACITY: &str = "MATCHBOOK_BOOK_CAPACITY";
const LOG_FILTER: &str = "RUST_LOG";

pub const DEFAULT_BOOK_CAPACITY: usize = 1024;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Symbols created at startup
    pub symbols: Vec<String>,
    /// Entry slots pre-allocated per book side
    pub book_capacity: usize,
    /// `tracing_subscriber::EnvFilter` directive for the demo binary
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            book_capacity: DEFAULT_BOOK_CAPACITY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read `.env` (if present) and then the process environment.
    pub fn try_from_env() -> Result<Self> {
        dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            symbols = ?config.symbols,
            book_capacity = config.book_capacity,
            "loaded engine config"
        );
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup. Missing keys fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbols = match lookup(SYMBOLS) {
            Some(raw) => parse_symbols(&raw)?,
            None => Vec::new(),
        };

        let book_capacity = match lookup(BOOK_CAPACITY) {
            Some(raw) => parse_capacity(&raw)?,
            None => DEFAULT_BOOK_CAPACITY,
        };

        let log_filter = lookup(LOG_FILTER)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            symbols,
            book_capacity,
            log_filter,
        })
    }
}

fn parse_symbols(raw: &str) -> Result<Vec<String>> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }
    cleaned
        .split(',')
        .map(|item| {
            let symbol = item.trim();
            if symbol.is_empty() {
                Err(ExchangeError::Validation(format!(
                    "{SYMBOLS} contains an empty symbol: {raw:?}"
                )))
            } else {
                Ok(symbol.to_string())
            }
        })
        .collect()
}

fn parse_capacity(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(capacity) if capacity > 0 => Ok(capacity),
        _ => Err(ExchangeError::Validation(format!(
            "{BOOK_CAPACITY} must be a positive integer, got {raw:?}"
        ))),
    }
}
