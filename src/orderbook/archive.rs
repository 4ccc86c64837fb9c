//! Entries that have left the live book.
//!
//! Fully traded and cancelled entries are parked here, grouped by price in
//! the order they arrived, so late cancels can be answered with a
//! "too late" notice and the book can be audited afterwards.

use std::collections::{BTreeMap, HashMap};

use crate::types::{PriceValue, TradableEntry};

/// Settled entries keyed by price, with an id index.
#[derive(Debug, Default, Clone)]
pub struct Archive {
    by_price: BTreeMap<PriceValue, Vec<TradableEntry>>,
    index: HashMap<String, (PriceValue, usize)>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an entry. Any volume still remaining is moved to cancelled.
    pub fn archive(&mut self, mut entry: TradableEntry) {
        entry.cancel_remaining();
        let price = entry.price();
        let bucket = self.by_price.entry(price).or_default();
        self.index.insert(entry.id().to_string(), (price, bucket.len()));
        bucket.push(entry);
    }

    /// Look up an archived entry by id.
    pub fn find_by_id(&self, id: &str) -> Option<&TradableEntry> {
        let (price, slot) = self.index.get(id)?;
        self.by_price.get(price)?.get(*slot)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Archived entries at one price, oldest first.
    pub fn entries_at(&self, price: &PriceValue) -> &[TradableEntry] {
        self.by_price.get(price).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All archived entries, ascending by price then arrival.
    pub fn iter(&self) -> impl Iterator<Item = &TradableEntry> {
        self.by_price.values().flatten()
    }
}
