//! Coalescing of fill events produced during one matching session.
//!
//! Fills are keyed by `(owner, id, price, side)`. Recording a fill whose key
//! is already present overwrites that record's volume and details in place,
//! so each entry reports at most one fill per price per session. Insertion
//! order is preserved for publication.

use std::collections::HashMap;

use crate::types::{FillEvent, PriceValue, Side};

/// Identity of a fill record within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FillKey {
    pub owner: String,
    pub id: String,
    pub price: PriceValue,
    pub side: Side,
}

impl From<&FillEvent> for FillKey {
    fn from(fill: &FillEvent) -> Self {
        Self {
            owner: fill.owner.clone(),
            id: fill.id.clone(),
            price: fill.price,
            side: fill.side,
        }
    }
}

/// Insertion-ordered set of merged fills.
#[derive(Debug, Default, Clone)]
pub struct FillSet {
    fills: Vec<FillEvent>,
    index: HashMap<FillKey, usize>,
}

impl FillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fill, overwriting volume and details of an existing record
    /// with the same key.
    pub fn record(&mut self, fill: FillEvent) {
        let key = FillKey::from(&fill);
        match self.index.get(&key) {
            Some(&slot) => {
                let existing = &mut self.fills[slot];
                existing.volume = fill.volume;
                existing.details = fill.details;
            }
            None => {
                self.index.insert(key, self.fills.len());
                self.fills.push(fill);
            }
        }
    }

    /// Fold another session's fills into this one.
    pub fn merge(&mut self, other: FillSet) {
        for fill in other.fills {
            self.record(fill);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fills.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FillEvent> {
        self.fills.iter()
    }

    /// The fill with the lowest price; the earliest recorded wins ties.
    pub fn lowest_priced(&self) -> Option<&FillEvent> {
        self.fills
            .iter()
            .min_by(|a, b| a.price.compare_ordinal(&b.price))
    }

    pub fn into_vec(self) -> Vec<FillEvent> {
        self.fills
    }
}

impl IntoIterator for FillSet {
    type Item = FillEvent;
    type IntoIter = std::vec::IntoIter<FillEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.fills.into_iter()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(owner: &str, id: &str, cents: i64, volume: u64, side: Side) -> FillEvent {
        FillEvent {
            owner: owner.to_string(),
            symbol: "AAA".to_string(),
            price: PriceValue::limit(cents),
            volume,
            details: format!("leaving {volume}"),
            side,
            id: id.to_string(),
        }
    }

    #[test]
    fn test_record_distinct_keys() {
        let mut set = FillSet::new();
        set.record(fill("a", "1", 1_000, 10, Side::Buy));
        set.record(fill("b", "2", 1_000, 10, Side::Sell));
        set.record(fill("a", "1", 1_100, 10, Side::Buy));

        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_record_overwrites_same_key() {
        let mut set = FillSet::new();
        set.record(fill("a", "1", 1_000, 10, Side::Buy));
        set.record(fill("a", "1", 1_000, 25, Side::Buy));

        assert_eq!(set.len(), 1);
        let only = set.iter().next().unwrap();
        assert_eq!(only.volume, 25);
        assert_eq!(only.details, "leaving 25");
    }

    #[test]
    fn test_side_or_id_difference_creates_new_record() {
        let mut set = FillSet::new();
        set.record(fill("a", "1", 1_000, 10, Side::Buy));
        set.record(fill("a", "1", 1_000, 10, Side::Sell));
        set.record(fill("a", "2", 1_000, 10, Side::Buy));

        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_merge_preserves_order_and_overwrites() {
        let mut first = FillSet::new();
        first.record(fill("a", "1", 1_000, 10, Side::Buy));
        first.record(fill("b", "2", 1_000, 10, Side::Sell));

        let mut second = FillSet::new();
        second.record(fill("a", "1", 1_000, 5, Side::Buy));
        second.record(fill("c", "3", 1_050, 5, Side::Sell));

        first.merge(second);
        let fills = first.into_vec();
        assert_eq!(fills.len(), 3);
        assert_eq!(fills[0].volume, 5);
        assert_eq!(fills[2].owner, "c");
    }

    #[test]
    fn test_lowest_priced_first_wins() {
        let mut set = FillSet::new();
        assert!(set.lowest_priced().is_none());

        set.record(fill("a", "1", 1_050, 10, Side::Buy));
        set.record(fill("b", "2", 1_000, 20, Side::Sell));
        set.record(fill("c", "3", 1_000, 30, Side::Sell));

        let lowest = set.lowest_priced().unwrap();
        assert_eq!(lowest.owner, "b");
        assert_eq!(lowest.volume, 20);
    }
}
