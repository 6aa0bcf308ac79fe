use crate::api::RemoteInventoryGateway;
use crate::card::CollectionEntry;
use crate::dashboard::ExpansionCount;
use crate::error::GatewayError;
use crate::expansion::{Expansion, ExpansionCatalog};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Default)]
struct MemoryState {
    expansions: Vec<Expansion>,
    collections: HashMap<String, Vec<CollectionEntry>>,
    failing_collections: HashMap<String, usize>,
    failing_posts: HashMap<String, usize>,
    failing_dashboard: usize,
    collection_gates: HashMap<String, Arc<Notify>>,
    post_gates: HashMap<String, Arc<Notify>>,
    posts: Vec<(String, i32)>,
}

/// In-process inventory service for tests. Applies deltas to its own copy the
/// way the HTTP backend does, and lets callers inject failures or hold a
/// response in flight until released. Built only with the `test-util`
/// feature.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    collection_fetches: AtomicUsize,
}

/// Releases one held response.
#[derive(Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    pub fn release(&self) {
        self.0.notify_one();
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_expansion(self, expansion: Expansion, entries: Vec<CollectionEntry>) -> Self {
        {
            let mut state = self.state();
            state.collections.insert(expansion.id.clone(), entries);
            state.expansions.push(expansion);
        }
        self
    }

    /// Replaces the server-side rows of an expansion.
    pub fn set_collection(&self, expansion_id: &str, entries: Vec<CollectionEntry>) {
        self.state()
            .collections
            .insert(expansion_id.to_string(), entries);
    }

    pub fn quantity(&self, expansion_id: &str, card_id: &str) -> Option<u32> {
        self.state()
            .collections
            .get(expansion_id)?
            .iter()
            .find(|e| e.card_id() == card_id)
            .map(|e| e.quantity)
    }

    /// The next `times` collection fetches for `expansion_id` fail.
    pub fn fail_collection(&self, expansion_id: &str, times: usize) {
        self.state()
            .failing_collections
            .insert(expansion_id.to_string(), times);
    }

    /// The next `times` quantity posts for `card_id` fail.
    pub fn fail_posts(&self, card_id: &str, times: usize) {
        self.state().failing_posts.insert(card_id.to_string(), times);
    }

    /// The next `times` widget fetches fail.
    pub fn fail_dashboard(&self, times: usize) {
        self.state().failing_dashboard = times;
    }

    /// Holds the next collection fetch for `expansion_id` until released.
    pub fn hold_collection(&self, expansion_id: &str) -> Gate {
        let notify = Arc::new(Notify::new());
        self.state()
            .collection_gates
            .insert(expansion_id.to_string(), notify.clone());
        Gate(notify)
    }

    /// Holds the next quantity post for `card_id` until released.
    pub fn hold_post(&self, card_id: &str) -> Gate {
        let notify = Arc::new(Notify::new());
        self.state()
            .post_gates
            .insert(card_id.to_string(), notify.clone());
        Gate(notify)
    }

    pub fn collection_fetches(&self) -> usize {
        self.collection_fetches.load(Ordering::SeqCst)
    }

    /// Deltas the service accepted or rejected, in arrival order.
    pub fn posts(&self) -> Vec<(String, i32)> {
        self.state().posts.clone()
    }

    /// Owned quantity per expansion, in insertion order, skipping
    /// expansions with nothing owned.
    fn owned_by_expansion(&self) -> Result<Vec<(String, u64)>, GatewayError> {
        let mut state = self.state();
        if state.failing_dashboard > 0 {
            state.failing_dashboard -= 1;
            return Err(GatewayError::Unavailable("dashboard failed".to_string()));
        }
        Ok(state
            .expansions
            .iter()
            .filter_map(|exp| {
                let owned: u64 = state
                    .collections
                    .get(&exp.id)?
                    .iter()
                    .map(|e| u64::from(e.quantity))
                    .sum();
                (owned > 0).then(|| (exp.name.clone(), owned))
            })
            .collect())
    }

    fn take_failure(failures: &mut HashMap<String, usize>, key: &str) -> bool {
        match failures.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl RemoteInventoryGateway for MemoryGateway {
    async fn fetch_collection(
        &self,
        expansion_id: &str,
    ) -> Result<Vec<CollectionEntry>, GatewayError> {
        self.collection_fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.state().collection_gates.remove(expansion_id);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state();
        if Self::take_failure(&mut state.failing_collections, expansion_id) {
            return Err(GatewayError::Unavailable(format!(
                "collection {} failed",
                expansion_id
            )));
        }
        state
            .collections
            .get(expansion_id)
            .cloned()
            .ok_or_else(|| GatewayError::Status {
                status: 404,
                url: format!("memory://collection/{}/", expansion_id),
            })
    }

    async fn fetch_expansions(&self) -> Result<ExpansionCatalog, GatewayError> {
        Ok(ExpansionCatalog::from_expansions(
            self.state().expansions.clone(),
        ))
    }

    async fn post_quantity_delta(&self, card_id: &str, delta: i32) -> Result<(), GatewayError> {
        let gate = self.state().post_gates.remove(card_id);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state();
        state.posts.push((card_id.to_string(), delta));
        if Self::take_failure(&mut state.failing_posts, card_id) {
            return Err(GatewayError::Unavailable(format!(
                "update of {} failed",
                card_id
            )));
        }

        let entry = state
            .collections
            .values_mut()
            .flat_map(|entries| entries.iter_mut())
            .find(|e| e.card_id() == card_id)
            .ok_or_else(|| GatewayError::Status {
                status: 400,
                url: "memory://collection/update/".to_string(),
            })?;
        let updated = (i64::from(entry.quantity) + i64::from(delta)).max(0);
        entry.quantity = u32::try_from(updated).unwrap_or(u32::MAX);
        Ok(())
    }

    async fn fetch_total_cards(&self) -> Result<u64, GatewayError> {
        Ok(self.owned_by_expansion()?.iter().map(|(_, owned)| owned).sum())
    }

    async fn fetch_total_expansions(&self) -> Result<u64, GatewayError> {
        Ok(self.owned_by_expansion()?.len() as u64)
    }

    async fn fetch_cards_by_expansion(&self) -> Result<Vec<ExpansionCount>, GatewayError> {
        Ok(self
            .owned_by_expansion()?
            .into_iter()
            .map(|(expansion_name, card_count)| ExpansionCount {
                expansion_name,
                card_count,
            })
            .collect())
    }
}
