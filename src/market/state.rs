//! Global market-state machine.
//!
//! ```text
//! Closed --> PreOpen --> Open --> Closed
//! ```
//!
//! Only the single forward step is legal from each state.

use std::fmt;

use crate::error::{ExchangeError, Result};

/// Market phase shared by every book in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MarketState {
    /// No submissions or cancels accepted
    #[default]
    Closed,
    /// Entries are staged without matching; market orders rejected
    PreOpen,
    /// Continuous matching
    Open,
}

impl MarketState {
    /// The only state reachable from `self`.
    pub fn next(self) -> MarketState {
        match self {
            MarketState::Closed => MarketState::PreOpen,
            MarketState::PreOpen => MarketState::Open,
            MarketState::Open => MarketState::Closed,
        }
    }

    #[inline]
    pub fn can_transition_to(self, target: MarketState) -> bool {
        self.next() == target
    }

    /// Check a requested transition.
    ///
    /// # Errors
    ///
    /// `ExchangeError::State` for anything but the single forward step.
    pub fn validate_transition(self, target: MarketState) -> Result<()> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(ExchangeError::State(format!(
                "invalid market state transition from {self} to {target}"
            )))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketState::Closed => "CLOSED",
            MarketState::PreOpen => "PREOPEN",
            MarketState::Open => "OPEN",
        }
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
