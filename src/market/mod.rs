//! Market-wide state and the symbol registry.

pub mod registry;
pub mod state;

pub use registry::MarketRegistry;
pub use state::MarketState;
