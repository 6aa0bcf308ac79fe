use crate::api::RemoteInventoryGateway;
use crate::card::CollectionEntry;
use crate::collection::CollectionStore;
use crate::dashboard::{self, Dashboard};
use crate::error::CollectionError;
use crate::expansion::ExpansionCatalog;
use crate::mutator::{Adjustment, QuantityMutator};
use crate::scope::{ExpansionScope, Selection};
use crate::stats::CollectionStats;
use futures::future::join_all;
use std::sync::Arc;

/// Everything the presentation layer needs: the current entries and stats,
/// expansion selection, and quantity adjustment.
pub struct CollectionTracker {
    gateway: Arc<dyn RemoteInventoryGateway>,
    store: CollectionStore,
    scope: ExpansionScope,
    mutator: QuantityMutator,
}

impl CollectionTracker {
    pub fn new(gateway: Arc<dyn RemoteInventoryGateway>) -> Self {
        CollectionTracker {
            gateway,
            store: CollectionStore::new(),
            scope: ExpansionScope::new(),
            mutator: QuantityMutator::new(),
        }
    }

    pub async fn initialize(&self) -> Result<Option<Selection>, CollectionError> {
        self.scope.initialize(&self.store, self.gateway.as_ref()).await
    }

    pub async fn select(&self, expansion_id: &str) -> Result<Selection, CollectionError> {
        self.scope
            .select(&self.store, self.gateway.as_ref(), expansion_id)
            .await
    }

    /// Reloads the active expansion; returns `None` when nothing is selected.
    pub async fn refresh(&self) -> Result<Option<Selection>, CollectionError> {
        self.scope.refresh(&self.store, self.gateway.as_ref()).await
    }

    pub async fn adjust(&self, card_id: &str, delta: i32) -> Result<Adjustment, CollectionError> {
        self.mutator
            .adjust(&self.store, self.gateway.as_ref(), card_id, delta)
            .await
    }

    /// Runs several adjustments concurrently. Results come back in input
    /// order; updates to the same card are still sent one at a time.
    pub async fn adjust_many(
        &self,
        changes: &[(String, i32)],
    ) -> Vec<Result<Adjustment, CollectionError>> {
        join_all(
            changes
                .iter()
                .map(|(card_id, delta)| self.adjust(card_id, *delta)),
        )
        .await
    }

    /// Collection-wide totals from the service, independent of the loaded
    /// expansion.
    pub async fn dashboard(&self) -> Result<Dashboard, CollectionError> {
        dashboard::load_dashboard(self.gateway.as_ref()).await
    }

    pub fn entries(&self) -> Vec<CollectionEntry> {
        self.store.entries()
    }

    pub fn entry(&self, card_id: &str) -> Option<CollectionEntry> {
        self.store.entry(card_id)
    }

    pub fn stats(&self) -> CollectionStats {
        self.store.stats()
    }

    pub fn catalog(&self) -> ExpansionCatalog {
        self.scope.catalog()
    }

    /// The selected expansion; may differ from the loaded one while a load
    /// is in flight.
    pub fn active_expansion(&self) -> Option<String> {
        self.scope.active()
    }

    pub fn loaded_expansion(&self) -> Option<String> {
        self.store.expansion_id()
    }

    pub fn pending_updates(&self) -> usize {
        self.mutator.pending_cards()
    }
}
