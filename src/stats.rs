use crate::card::CollectionEntry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Distinct cards owned out of the cards available.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub collected: usize,
    pub available: usize,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collected, self.available)
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Sum of all owned quantities.
    pub total: u64,
    /// Owned quantity per rarity label. Entries without a rarity are not bucketed.
    pub rarities: BTreeMap<String, u64>,
    pub completion: Completion,
    pub rarity_completion: BTreeMap<String, Completion>,
}

impl CollectionStats {
    /// Owned quantity of entries that carry no rarity label.
    pub fn unlabelled(&self) -> u64 {
        self.total - self.rarities.values().sum::<u64>()
    }
}

/// Derives stats from scratch. Callers re-run it after every change instead of
/// patching a previous result.
pub fn compute(entries: &[CollectionEntry]) -> CollectionStats {
    let mut stats = CollectionStats::default();

    for entry in entries {
        let quantity = u64::from(entry.quantity);
        stats.total += quantity;
        stats.completion.available += 1;
        if entry.is_owned() {
            stats.completion.collected += 1;
        }

        if let Some(rarity) = entry.rarity() {
            *stats.rarities.entry(rarity.to_string()).or_insert(0) += quantity;
            let completion = stats
                .rarity_completion
                .entry(rarity.to_string())
                .or_default();
            completion.available += 1;
            if entry.is_owned() {
                completion.collected += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::entry;

    #[test]
    fn unlabelled_entries_count_only_towards_total() {
        let entries = vec![
            entry("a", Some("Common"), 6, 1),
            entry("b", Some("Common"), 4, 2),
            entry("c", Some("Rare"), 2, 3),
            entry("d", None, 1, 4),
        ];
        let stats = compute(&entries);

        assert_eq!(stats.total, 13);
        assert_eq!(stats.rarities.len(), 2);
        assert_eq!(stats.rarities["Common"], 10);
        assert_eq!(stats.rarities["Rare"], 2);
        assert_eq!(stats.unlabelled(), 1);
    }

    #[test]
    fn completion_tracks_distinct_owned_cards() {
        let entries = vec![
            entry("a", Some("Common"), 3, 1),
            entry("b", Some("Common"), 0, 2),
            entry("c", Some("Rare"), 0, 3),
            entry("d", None, 1, 4),
        ];
        let stats = compute(&entries);

        assert_eq!(stats.completion.to_string(), "2/4");
        assert_eq!(stats.rarity_completion["Common"].to_string(), "1/2");
        assert_eq!(stats.rarity_completion["Rare"].to_string(), "0/1");
        // A rarity with nothing owned still shows up with a zero count.
        assert_eq!(stats.rarities["Rare"], 0);
    }

    #[test]
    fn empty_collection() {
        let stats = compute(&[]);
        assert_eq!(stats, CollectionStats::default());
        assert_eq!(stats.completion.to_string(), "0/0");
    }

    #[test]
    fn is_idempotent() {
        let entries = vec![entry("a", Some("Rare"), 5, 1), entry("b", None, 2, 2)];
        assert_eq!(compute(&entries), compute(&entries));
    }
}
