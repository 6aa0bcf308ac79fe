use crate::api::RemoteInventoryGateway;
use crate::card::CollectionEntry;
use crate::error::{CollectionError, GatewayError};
use crate::stats::{self, CollectionStats};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

#[derive(Default)]
struct Loaded {
    expansion_id: Option<String>,
    /// Bumped on every committed load.
    generation: u64,
    /// Source of per-entry revisions; never reused within a store.
    next_revision: u64,
    entries: Vec<CollectionEntry>,
    revisions: Vec<u64>,
    index: HashMap<String, usize>,
    stats: CollectionStats,
}

impl Loaded {
    fn refresh_stats(&mut self) {
        self.stats = stats::compute(&self.entries);
    }

    fn bump_revision(&mut self, idx: usize) -> u64 {
        self.next_revision += 1;
        self.revisions[idx] = self.next_revision;
        self.next_revision
    }
}

/// A local quantity change, carrying what is needed to undo it exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantityChange {
    pub card_id: String,
    pub previous: u32,
    pub current: u32,
    revision: u64,
    generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The entry is back at its captured quantity.
    Restored(u32),
    /// Another mutation touched the entry first; its quantity was kept.
    Conflict { kept: u32 },
    /// A reload replaced the set after the change; nothing to undo.
    Superseded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Replaced { entries: usize },
    /// The response arrived for a scope that is no longer active.
    Stale,
}

/// The owned collection of the active expansion plus its derived stats.
///
/// All reads and writes go through one lock that is never held across an
/// await, so readers always see either the old or the new set in full.
#[derive(Default)]
pub struct CollectionStore {
    state: Mutex<Loaded>,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Loaded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn load(
        &self,
        gateway: &dyn RemoteInventoryGateway,
        expansion_id: &str,
    ) -> Result<LoadOutcome, CollectionError> {
        self.load_if(gateway, expansion_id, || true).await
    }

    /// Fetches and installs the collection of `expansion_id`, unless
    /// `still_current` returns false once the response is in.
    pub async fn load_if<F>(
        &self,
        gateway: &dyn RemoteInventoryGateway,
        expansion_id: &str,
        still_current: F,
    ) -> Result<LoadOutcome, CollectionError>
    where
        F: Fn() -> bool + Send + Sync,
    {
        debug!(expansion_id, "loading collection");
        let fetched = gateway.fetch_collection(expansion_id).await;

        let mut state = self.state();
        if !still_current() {
            info!(expansion_id, "discarding stale collection response");
            return Ok(LoadOutcome::Stale);
        }

        let entries = fetched
            .and_then(prepare_entries)
            .map_err(|source| {
                warn!(expansion_id, error = %source, "collection load failed, keeping previous set");
                CollectionError::Load {
                    expansion_id: expansion_id.to_string(),
                    source,
                }
            })?;

        let count = entries.len();
        state.index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.card_id().to_string(), i))
            .collect();
        state.revisions = vec![0; count];
        state.entries = entries;
        state.expansion_id = Some(expansion_id.to_string());
        state.generation += 1;
        state.refresh_stats();

        info!(
            expansion_id,
            entries = count,
            total = state.stats.total,
            "collection loaded"
        );
        Ok(LoadOutcome::Replaced { entries: count })
    }

    /// Entries ordered by collection number.
    pub fn entries(&self) -> Vec<CollectionEntry> {
        self.state().entries.clone()
    }

    pub fn entry(&self, card_id: &str) -> Option<CollectionEntry> {
        let state = self.state();
        state.index.get(card_id).map(|&i| state.entries[i].clone())
    }

    pub fn stats(&self) -> CollectionStats {
        self.state().stats.clone()
    }

    pub fn expansion_id(&self) -> Option<String> {
        self.state().expansion_id.clone()
    }

    /// Number of loads committed so far.
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Applies `delta` locally, clamping at zero. Never talks to the gateway.
    pub fn apply_delta(&self, card_id: &str, delta: i32) -> Result<QuantityChange, CollectionError> {
        let mut state = self.state();
        let idx = *state
            .index
            .get(card_id)
            .ok_or_else(|| CollectionError::UnknownCard(card_id.to_string()))?;

        let previous = state.entries[idx].quantity;
        let current = clamp_quantity(i64::from(previous) + i64::from(delta));
        state.entries[idx].quantity = current;
        let revision = state.bump_revision(idx);
        state.refresh_stats();

        debug!(card_id, previous, current, delta, "applied local delta");
        Ok(QuantityChange {
            card_id: card_id.to_string(),
            previous,
            current,
            revision,
            generation: state.generation,
        })
    }

    /// Restores the quantity captured by `change`, but only when nothing else
    /// touched the entry since.
    pub fn rollback(&self, change: &QuantityChange) -> RollbackOutcome {
        let mut state = self.state();
        if state.generation != change.generation {
            debug!(card_id = %change.card_id, "collection reloaded since change, skipping rollback");
            return RollbackOutcome::Superseded;
        }
        let Some(&idx) = state.index.get(&change.card_id) else {
            return RollbackOutcome::Superseded;
        };

        if state.revisions[idx] != change.revision {
            let kept = state.entries[idx].quantity;
            warn!(card_id = %change.card_id, kept, "entry changed before rollback");
            return RollbackOutcome::Conflict { kept };
        }

        state.entries[idx].quantity = change.previous;
        state.bump_revision(idx);
        state.refresh_stats();
        debug!(card_id = %change.card_id, restored = change.previous, "rolled back local delta");
        RollbackOutcome::Restored(change.previous)
    }

    /// True when a load replaced the set after `change` was applied.
    pub fn superseded(&self, change: &QuantityChange) -> bool {
        self.state().generation != change.generation
    }
}

fn clamp_quantity(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Orders a fetched set and rejects rows that would break the card index.
fn prepare_entries(mut entries: Vec<CollectionEntry>) -> Result<Vec<CollectionEntry>, GatewayError> {
    entries.sort_by(|a, b| {
        a.collection_number
            .cmp(&b.collection_number)
            .then_with(|| a.card_id().cmp(b.card_id()))
    });
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(entry.card_id()) {
            return Err(GatewayError::Malformed(format!(
                "card {} listed twice",
                entry.card_id()
            )));
        }
    }
    Ok(entries)
}
