//! Per-symbol order books.
//!
//! ## Architecture
//!
//! Each [`Book`] holds two [`BookSide`]s and an [`Archive`]:
//!
//! - **Slab-based storage**: entries live in a slab, levels hold slab keys
//! - **Price levels**: one FIFO queue per price, kept in a `BTreeMap`
//! - **Archive**: traded-out and cancelled entries, kept for late cancels
//!
//! ## Components
//!
//! - [`EntryNode`]: a `TradableEntry` with its level-queue links
//! - [`PriceLevel`]: FIFO queue of entries at one price
//! - [`BookSide`]: all levels of one side, best price first
//! - [`Archive`]: settled entries grouped by price
//! - [`Book`]: crossing, opening auction and close-out for one symbol
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Insert entry | O(log p) |
//! | Cancel by id | O(log p) |
//! | Best price | O(log p) |
//! | Cancel quote by owner | O(n) |
//!
//! `p` is the number of price levels, `n` the number of resting entries.

pub mod archive;
pub mod book;
pub mod level;
pub mod node;
pub mod side;

pub use archive::Archive;
pub use book::Book;
pub use level::PriceLevel;
pub use node::EntryNode;
pub use side::{BookSide, EMPTY_DEPTH};
