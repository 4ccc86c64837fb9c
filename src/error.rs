//! Error taxonomy for the matching engine.
//!
//! Every fallible operation returns [`Result`], whose error is one of a small
//! closed set of variants. Errors are raised by the layer that owns the
//! violated invariant and travel unchanged through `Book` and
//! `MarketRegistry` to the caller.
//!
//! | Variant      | Raised when                                                   |
//! |--------------|---------------------------------------------------------------|
//! | `Validation` | an argument is empty or malformed, or a quote does not span   |
//! | `State`      | the market state forbids the operation or the transition      |
//! | `NotFound`   | a symbol or entry id is unknown                               |
//! | `Duplicate`  | a symbol already exists                                       |
//! | `Operation`  | price arithmetic is illegal (market operand, overflow, ...)   |
//! | `Delivery`   | the publisher rejected a message after the book committed     |
//! | `OrderDelivery` | as `Delivery`, for a submitted order that is now live      |

use thiserror::Error;

use crate::publisher::PublishError;
use crate::types::price::PriceError;

/// Errors returned by the engine's public operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Null, empty or malformed argument.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation illegal in the current market state.
    #[error("illegal in current market state: {0}")]
    State(String),

    /// Unknown symbol or entry id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Symbol (or other single-valued key) already present.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Illegal price arithmetic.
    #[error("price operation failed: {0}")]
    Operation(#[from] PriceError),

    /// The publisher failed to deliver a notification.
    ///
    /// Book state has already been committed when this is returned.
    #[error("publish failed: {0}")]
    Delivery(#[from] PublishError),

    /// An order was accepted but one of its notifications failed.
    ///
    /// The order is live under `id` and can be cancelled with it.
    #[error("order {id} accepted but publish failed: {source}")]
    OrderDelivery {
        id: String,
        #[source]
        source: PublishError,
    },
}

impl ExchangeError {
    /// Id of the entry that was committed despite the error, if any.
    pub fn accepted_id(&self) -> Option<&str> {
        match self {
            Self::OrderDelivery { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Reject empty or whitespace-only string arguments.
pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ExchangeError::Validation(format!("{what} cannot be empty")));
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
