//! Arrival-ordered queue of entries sharing one price.
//!
//! ## Queue Structure
//!
//! ```text
//! head (oldest) <-> entry2 <-> entry3 <-> tail (newest)
//! ```
//!
//! - New entries are appended at the tail
//! - Matching consumes entries from the head
//! - Any entry can be unlinked in O(1) using its slab key
//!
//! The entry data lives in the side's slab; a level only holds the queue
//! ends and the aggregate remaining volume.

use slab::Slab;

use crate::orderbook::EntryNode;
use crate::types::{PriceError, PriceValue};

/// All resting entries at a single price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Price shared by every entry at this level
    pub price: PriceValue,

    /// Sum of remaining volume at this level
    pub total_volume: u64,

    /// Oldest entry (slab key), first to trade
    pub head: Option<usize>,

    /// Newest entry (slab key)
    pub tail: Option<usize>,

    /// Number of entries at this level
    pub entry_count: usize,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new(price: PriceValue) -> Self {
        Self {
            price,
            total_volume: 0,
            head: None,
            tail: None,
            entry_count: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Whether `volume` more fits in the aggregate.
    #[inline]
    pub fn can_absorb(&self, volume: u64) -> bool {
        self.total_volume.checked_add(volume).is_some()
    }

    /// Append an entry at the tail of the queue.
    ///
    /// Keys not present in the slab are ignored. The level is left untouched
    /// if the aggregate volume would overflow.
    pub fn push_back(&mut self, key: usize, slab: &mut Slab<EntryNode>) -> Result<(), PriceError> {
        let old_tail = self.tail;
        let Some(node) = slab.get_mut(key) else {
            return Ok(());
        };
        let volume = node.remaining();
        let total_volume = self
            .total_volume
            .checked_add(volume)
            .ok_or(PriceError::VolumeOverflow)?;
        node.prev = old_tail;
        node.next = None;

        match old_tail.and_then(|tail| slab.get_mut(tail)) {
            Some(tail_node) => tail_node.next = Some(key),
            None => self.head = Some(key),
        }

        self.tail = Some(key);
        self.entry_count += 1;
        self.total_volume = total_volume;
        Ok(())
    }

    /// Unlink an entry from the queue.
    ///
    /// # Returns
    ///
    /// The remaining volume of the unlinked entry, or `None` if the key is
    /// not in the slab
    pub fn remove(&mut self, key: usize, slab: &mut Slab<EntryNode>) -> Option<u64> {
        let node = slab.get_mut(key)?;
        let volume = node.remaining();
        let prev_key = node.prev.take();
        let next_key = node.next.take();

        match prev_key.and_then(|prev| slab.get_mut(prev)) {
            Some(prev_node) => prev_node.next = next_key,
            None => self.head = next_key,
        }
        match next_key.and_then(|next| slab.get_mut(next)) {
            Some(next_node) => next_node.prev = prev_key,
            None => self.tail = prev_key,
        }

        self.entry_count = self.entry_count.saturating_sub(1);
        self.total_volume = self.total_volume.saturating_sub(volume);
        Some(volume)
    }

    /// Slab keys from oldest to newest.
    pub fn keys(&self, slab: &Slab<EntryNode>) -> Vec<usize> {
        let mut keys = Vec::with_capacity(self.entry_count);
        let mut cursor = self.head;
        while let Some(key) = cursor {
            keys.push(key);
            cursor = slab.get(key).and_then(|node| node.next);
        }
        keys
    }

    /// Update the aggregate after a partial fill.
    pub fn reduce_volume(&mut self, filled: u64) {
        self.total_volume = self.total_volume.saturating_sub(filled);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, TradableEntry};

    const PRICE: PriceValue = PriceValue::limit(1_000);

    fn create_test_node(slab: &mut Slab<EntryNode>, owner: &str, volume: u64) -> usize {
        let entry = TradableEntry::order(owner, "AAA", PRICE, volume, Side::Buy).unwrap();
        slab.insert(EntryNode::new(entry))
    }

    #[test]
    fn test_price_level_new() {
        let level = PriceLevel::new(PRICE);

        assert_eq!(level.price, PRICE);
        assert_eq!(level.total_volume, 0);
        assert!(level.head.is_none());
        assert!(level.tail.is_none());
        assert!(level.is_empty());
    }

    #[test]
    fn test_price_level_push_multiple() {
        let mut slab = Slab::with_capacity(10);
        let mut level = PriceLevel::new(PRICE);

        let key1 = create_test_node(&mut slab, "a", 100);
        let key2 = create_test_node(&mut slab, "b", 200);
        let key3 = create_test_node(&mut slab, "c", 300);
        level.push_back(key1, &mut slab).unwrap();
        level.push_back(key2, &mut slab).unwrap();
        level.push_back(key3, &mut slab).unwrap();

        assert_eq!(level.entry_count, 3);
        assert_eq!(level.total_volume, 600);
        assert_eq!(level.head, Some(key1));
        assert_eq!(level.tail, Some(key3));
        assert_eq!(level.keys(&slab), vec![key1, key2, key3]);

        let node2 = slab.get(key2).unwrap();
        assert_eq!(node2.prev, Some(key1));
        assert_eq!(node2.next, Some(key3));
    }

    #[test]
    fn test_price_level_remove_middle() {
        let mut slab = Slab::with_capacity(10);
        let mut level = PriceLevel::new(PRICE);

        let key1 = create_test_node(&mut slab, "a", 100);
        let key2 = create_test_node(&mut slab, "b", 200);
        let key3 = create_test_node(&mut slab, "c", 300);
        level.push_back(key1, &mut slab).unwrap();
        level.push_back(key2, &mut slab).unwrap();
        level.push_back(key3, &mut slab).unwrap();

        assert_eq!(level.remove(key2, &mut slab), Some(200));
        assert_eq!(level.entry_count, 2);
        assert_eq!(level.total_volume, 400);
        assert_eq!(level.keys(&slab), vec![key1, key3]);
        assert!(slab.get(key2).unwrap().is_unlinked());
    }

    #[test]
    fn test_price_level_remove_head_and_tail() {
        let mut slab = Slab::with_capacity(10);
        let mut level = PriceLevel::new(PRICE);

        let key1 = create_test_node(&mut slab, "a", 100);
        let key2 = create_test_node(&mut slab, "b", 200);
        level.push_back(key1, &mut slab).unwrap();
        level.push_back(key2, &mut slab).unwrap();

        level.remove(key1, &mut slab);
        assert_eq!(level.head, Some(key2));
        assert_eq!(level.tail, Some(key2));

        level.remove(key2, &mut slab);
        assert!(level.is_empty());
        assert_eq!(level.total_volume, 0);
        assert!(level.head.is_none());
        assert!(level.tail.is_none());
    }

    #[test]
    fn test_price_level_remove_missing_key() {
        let mut slab: Slab<EntryNode> = Slab::with_capacity(1);
        let mut level = PriceLevel::new(PRICE);
        assert_eq!(level.remove(7, &mut slab), None);
    }

    #[test]
    fn test_price_level_push_overflow_leaves_level_untouched() {
        let mut slab = Slab::with_capacity(10);
        let mut level = PriceLevel::new(PRICE);

        let key1 = create_test_node(&mut slab, "a", u64::MAX);
        let key2 = create_test_node(&mut slab, "b", 1);
        level.push_back(key1, &mut slab).unwrap();
        assert!(!level.can_absorb(1));

        assert_eq!(level.push_back(key2, &mut slab), Err(PriceError::VolumeOverflow));
        assert_eq!(level.entry_count, 1);
        assert_eq!(level.total_volume, u64::MAX);
        assert_eq!(level.keys(&slab), vec![key1]);
        assert!(slab.get(key2).unwrap().is_unlinked());
    }

    #[test]
    fn test_price_level_reduce_volume() {
        let mut level = PriceLevel::new(PRICE);
        level.total_volume = 1_000;

        level.reduce_volume(300);
        assert_eq!(level.total_volume, 700);

        // Saturating subtraction prevents underflow
        level.reduce_volume(1_000);
        assert_eq!(level.total_volume, 0);
    }
}
