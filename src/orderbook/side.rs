//! One direction of one symbol's book.
//!
//! ## Architecture
//!
//! - **Slab**: pre-allocated storage for resting entries, O(1) by key
//! - **BTreeMap**: price levels in ascending ordinal order
//! - **HashMap**: entry id to slab key, for O(1) cancel by id
//!
//! ## Price Ordering
//!
//! Levels are kept ascending by `PriceValue`'s `Ord`; the buy side reads
//! them from the top, the sell side from the bottom:
//!
//! - **Buy**: best = highest price
//! - **Sell**: best = lowest price
//!
//! A market-priced level, should one ever rest, sorts as amount zero. It is
//! therefore the worst buy level and (among non-negative prices) the best
//! sell level.
//!
//! ## Invariant
//!
//! A price key is never retained once its level is empty.

use std::collections::{BTreeMap, HashMap};

use slab::Slab;

use crate::orderbook::{Archive, EntryNode, PriceLevel};
use crate::types::{CancelEvent, PriceError, PriceValue, Side, TradableEntry, TradableSummary};

/// Depth line reported for a side with no entries.
pub const EMPTY_DEPTH: &str = "<Empty>";

/// Resting entries for one side of one book.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    entries: Slab<EntryNode>,
    levels: BTreeMap<PriceValue, PriceLevel>,
    index: HashMap<String, usize>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self::with_capacity(side, 0)
    }

    /// Create a side with `capacity` entry slots pre-allocated.
    pub fn with_capacity(side: Side, capacity: usize) -> Self {
        Self {
            side,
            entries: Slab::with_capacity(capacity),
            levels: BTreeMap::new(),
            index: HashMap::with_capacity(capacity),
        }
    }

    // ========================================================================
    // Size
    // ========================================================================

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Number of resting entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct price levels
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn best_level(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Buy => self.levels.values().next_back(),
            Side::Sell => self.levels.values().next(),
        }
    }

    /// Levels from best to worst.
    fn levels_best_first(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    /// Best price on this side, or `None` if empty.
    #[inline]
    pub fn best_price(&self) -> Option<PriceValue> {
        self.best_level().map(|level| level.price)
    }

    /// Aggregate remaining volume at the best price, 0 if empty.
    #[inline]
    pub fn best_volume(&self) -> u64 {
        self.best_level().map_or(0, |level| level.total_volume)
    }

    /// `"price x volume"` per level, best first, or `["<Empty>"]`.
    pub fn depth_snapshot(&self) -> Vec<String> {
        if self.levels.is_empty() {
            return vec![EMPTY_DEPTH.to_string()];
        }
        self.levels_best_first()
            .map(|level| format!("{} x {}", level.price, level.total_volume))
            .collect()
    }

    /// Entries resting at `price` in arrival order.
    pub fn entries_at(&self, price: &PriceValue) -> Option<Vec<&TradableEntry>> {
        let level = self.levels.get(price)?;
        Some(
            level
                .keys(&self.entries)
                .into_iter()
                .filter_map(|key| self.entries.get(key).map(|node| &node.entry))
                .collect(),
        )
    }

    /// Slab keys at the best price in arrival order.
    ///
    /// The returned list is a snapshot; keys removed while walking it simply
    /// stop resolving through [`BookSide::entry`].
    pub fn best_keys(&self) -> Vec<usize> {
        self.best_level()
            .map(|level| level.keys(&self.entries))
            .unwrap_or_default()
    }

    #[inline]
    pub fn entry(&self, key: usize) -> Option<&TradableEntry> {
        self.entries.get(key).map(|node| &node.entry)
    }

    /// Slab key of a resting entry.
    #[inline]
    pub fn key_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Every entry for `owner` that still has volume to trade.
    pub fn orders_with_remaining(&self, owner: &str) -> Vec<TradableSummary> {
        self.iter()
            .filter(|entry| entry.owner() == owner && entry.remaining_volume() > 0)
            .map(TradableEntry::summary)
            .collect()
    }

    /// All resting entries, best price first, arrival order within a price.
    pub fn iter(&self) -> impl Iterator<Item = &TradableEntry> + '_ {
        self.levels_best_first().flat_map(move |level| {
            level
                .keys(&self.entries)
                .into_iter()
                .filter_map(move |key| self.entries.get(key).map(|node| &node.entry))
        })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Fail if `volume` more at `price` would overflow that level's
    /// aggregate.
    pub fn ensure_room(&self, price: PriceValue, volume: u64) -> Result<(), PriceError> {
        match self.levels.get(&price) {
            Some(level) if !level.can_absorb(volume) => Err(PriceError::VolumeOverflow),
            _ => Ok(()),
        }
    }

    /// Append an entry to the queue for its price.
    ///
    /// # Returns
    ///
    /// The slab key for the inserted entry
    ///
    /// # Errors
    ///
    /// `VolumeOverflow` if the level aggregate cannot hold the entry's
    /// remaining volume; the side is unchanged.
    pub fn insert(&mut self, entry: TradableEntry) -> Result<usize, PriceError> {
        let price = entry.price();
        self.ensure_room(price, entry.remaining_volume())?;

        let id = entry.id().to_string();
        let key = self.entries.insert(EntryNode::new(entry));
        self.index.insert(id, key);

        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(key, &mut self.entries)?;
        Ok(key)
    }

    /// Trade up to `quantity` from the entry at `key`.
    ///
    /// # Returns
    ///
    /// The quantity actually filled, 0 for an unknown key
    pub fn fill(&mut self, key: usize, quantity: u64) -> u64 {
        let Some(node) = self.entries.get_mut(key) else {
            return 0;
        };
        let price = node.entry.price();
        let filled = node.entry.fill(quantity);
        if let Some(level) = self.levels.get_mut(&price) {
            level.reduce_volume(filled);
        }
        filled
    }

    /// Remove a traded-out entry, dropping its level if it empties.
    pub fn remove_filled(&mut self, key: usize) -> Option<TradableEntry> {
        self.take(key)
    }

    fn take(&mut self, key: usize) -> Option<TradableEntry> {
        let price = self.entries.get(key)?.entry.price();
        if let Some(level) = self.levels.get_mut(&price) {
            level.remove(key, &mut self.entries);
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
        let node = self.entries.try_remove(key)?;
        self.index.remove(node.entry.id());
        Some(node.entry)
    }

    /// Cancel a resting entry by id and archive it.
    ///
    /// # Returns
    ///
    /// The cancel notice, or `None` if no entry on this side has that id
    pub fn cancel_by_id(&mut self, id: &str, archive: &mut Archive) -> Option<CancelEvent> {
        let key = self.key_of(id)?;
        let entry = self.take(key)?;
        let event = CancelEvent::for_entry(
            &entry,
            entry.remaining_volume(),
            format!("Cancelling order with order ID: {}", entry.id()),
        );
        archive.archive(entry);
        Some(event)
    }

    /// Cancel the quote side held by `owner` and archive it.
    ///
    /// # Returns
    ///
    /// The quote side as it was before cancelling, plus its cancel notice
    pub fn cancel_by_owner(
        &mut self,
        owner: &str,
        archive: &mut Archive,
    ) -> Option<(TradableSummary, CancelEvent)> {
        let key = self
            .entries
            .iter()
            .find(|(_, node)| node.entry.is_quote() && node.entry.owner() == owner)
            .map(|(key, _)| key)?;
        let entry = self.take(key)?;
        let summary = entry.summary();
        let event = CancelEvent::for_entry(
            &entry,
            entry.remaining_volume(),
            format!("Quote {}-Side Cancelled.", entry.side()),
        );
        archive.archive(entry);
        Some((summary, event))
    }

    /// Cancel every resting entry, best price first.
    ///
    /// Works from a snapshot of the current queue so removals during the
    /// walk cannot skip entries.
    pub fn cancel_all(&mut self, archive: &mut Archive) -> Vec<CancelEvent> {
        let snapshot: Vec<(String, String, bool)> = self
            .iter()
            .map(|entry| (entry.id().to_string(), entry.owner().to_string(), entry.is_quote()))
            .collect();

        let mut events = Vec::with_capacity(snapshot.len());
        for (id, owner, is_quote) in snapshot {
            let event = if is_quote {
                self.cancel_by_owner(&owner, archive).map(|(_, event)| event)
            } else {
                self.cancel_by_id(&id, archive)
            };
            events.extend(event);
        }
        events
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
