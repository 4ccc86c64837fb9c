//! Entry node for slab-based storage.
//!
//! ## Design
//!
//! `EntryNode` wraps a `TradableEntry` with doubly-linked list pointers so
//! an entry can be unlinked from its price level in O(1) once its slab key
//! is known.
//!
//! ## Slab Integration
//!
//! - Keys are `usize` values returned by `slab.insert()`
//! - Keys may be reused after `slab.remove()`
//! - O(1) insert, remove, and lookup
//!
//! ## Linked List
//!
//! - `next`: the entry that arrived after this one at the same price
//! - `prev`: the entry that arrived before this one at the same price

use crate::types::TradableEntry;

/// Entry node stored in a book side's slab.
///
/// The pointers are slab keys (`usize`), not references.
#[derive(Debug, Clone)]
pub struct EntryNode {
    /// The resting entry
    pub entry: TradableEntry,

    /// Next entry in the level queue (slab key)
    /// None if this is the tail (newest entry)
    pub next: Option<usize>,

    /// Previous entry in the level queue (slab key)
    /// None if this is the head (oldest entry)
    pub prev: Option<usize>,
}

impl EntryNode {
    /// Wrap an entry in an unlinked node.
    #[inline]
    pub fn new(entry: TradableEntry) -> Self {
        Self {
            entry,
            next: None,
            prev: None,
        }
    }

    /// Check if this node is unlinked (not part of any price level)
    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.next.is_none() && self.prev.is_none()
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.entry.remaining_volume()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
