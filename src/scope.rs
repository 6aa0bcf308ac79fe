use crate::api::RemoteInventoryGateway;
use crate::collection::{CollectionStore, LoadOutcome};
use crate::error::CollectionError;
use crate::expansion::ExpansionCatalog;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Default)]
struct ScopeState {
    catalog: ExpansionCatalog,
    active: Option<String>,
    /// Identifies the latest selection; responses for older tickets are stale.
    ticket: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// The expansion was already active; nothing was fetched.
    Unchanged,
    Loaded { entries: usize },
    /// A newer selection was made while this one was loading.
    Superseded,
}

/// Which expansion's collection is loaded.
#[derive(Default)]
pub struct ExpansionScope {
    state: Mutex<ScopeState>,
}

impl ExpansionScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_catalog(&self, catalog: ExpansionCatalog) {
        self.state().catalog = catalog;
    }

    pub fn catalog(&self) -> ExpansionCatalog {
        self.state().catalog.clone()
    }

    pub fn active(&self) -> Option<String> {
        self.state().active.clone()
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.state().ticket == ticket
    }

    /// Fetches the catalog and selects its first expansion. Returns `None`
    /// when the catalog is empty.
    pub async fn initialize(
        &self,
        store: &CollectionStore,
        gateway: &dyn RemoteInventoryGateway,
    ) -> Result<Option<Selection>, CollectionError> {
        let catalog = gateway
            .fetch_expansions()
            .await
            .map_err(CollectionError::Catalog)?;
        let first = catalog.first().map(|exp| exp.id.clone());
        info!(expansions = catalog.len(), "expansion catalog loaded");
        self.set_catalog(catalog);

        match first {
            Some(expansion_id) => self.select(store, gateway, &expansion_id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn select(
        &self,
        store: &CollectionStore,
        gateway: &dyn RemoteInventoryGateway,
        expansion_id: &str,
    ) -> Result<Selection, CollectionError> {
        let ticket = {
            let mut state = self.state();
            if !state.catalog.contains(expansion_id) {
                return Err(CollectionError::InvalidScope(expansion_id.to_string()));
            }
            if state.active.as_deref() == Some(expansion_id) {
                debug!(expansion_id, "expansion already active");
                return Ok(Selection::Unchanged);
            }
            state.ticket += 1;
            state.active = Some(expansion_id.to_string());
            state.ticket
        };

        match self.load(store, gateway, expansion_id, ticket).await {
            Err(err) => {
                // Read before taking the scope lock: load_if locks the store
                // first and the scope second.
                let loaded = store.expansion_id();
                let mut state = self.state();
                if state.ticket == ticket {
                    // Point at what the store holds, so reselecting anything
                    // else triggers a load.
                    state.active = loaded;
                }
                Err(err)
            }
            selection => selection,
        }
    }

    /// Reloads the active expansion from the service. Unconfirmed local
    /// changes are replaced by what the service returns.
    pub async fn refresh(
        &self,
        store: &CollectionStore,
        gateway: &dyn RemoteInventoryGateway,
    ) -> Result<Option<Selection>, CollectionError> {
        let (ticket, expansion_id) = {
            let mut state = self.state();
            let Some(active) = state.active.clone() else {
                return Ok(None);
            };
            state.ticket += 1;
            (state.ticket, active)
        };
        self.load(store, gateway, &expansion_id, ticket).await.map(Some)
    }

    async fn load(
        &self,
        store: &CollectionStore,
        gateway: &dyn RemoteInventoryGateway,
        expansion_id: &str,
        ticket: u64,
    ) -> Result<Selection, CollectionError> {
        match store
            .load_if(gateway, expansion_id, || self.is_current(ticket))
            .await?
        {
            LoadOutcome::Replaced { entries } => Ok(Selection::Loaded { entries }),
            LoadOutcome::Stale => Ok(Selection::Superseded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::entry;
    use crate::expansion::expansion;
    use crate::memory::MemoryGateway;

    fn gateway() -> MemoryGateway {
        MemoryGateway::new()
            .with_expansion(
                expansion("sv1", "Scarlet & Violet", "2023/03/31"),
                vec![entry("sv1-1", Some("Common"), 1, 1)],
            )
            .with_expansion(
                expansion("sv2", "Scarlet & Violet", "2023/06/09"),
                vec![entry("sv2-1", Some("Rare"), 2, 1)],
            )
    }

    #[tokio::test]
    async fn initialize_selects_newest_expansion() {
        let gateway = gateway();
        let store = CollectionStore::new();
        let scope = ExpansionScope::new();

        let selection = scope.initialize(&store, &gateway).await.unwrap();
        assert_eq!(selection, Some(Selection::Loaded { entries: 1 }));
        assert_eq!(scope.active().as_deref(), Some("sv2"));
        assert_eq!(store.expansion_id().as_deref(), Some("sv2"));
    }

    #[tokio::test]
    async fn initialize_with_empty_catalog_loads_nothing() {
        let gateway = MemoryGateway::new();
        let store = CollectionStore::new();
        let scope = ExpansionScope::new();

        assert_eq!(scope.initialize(&store, &gateway).await.unwrap(), None);
        assert_eq!(scope.active(), None);
        assert_eq!(gateway.collection_fetches(), 0);
    }

    #[tokio::test]
    async fn unknown_expansion_is_rejected_before_fetching() {
        let gateway = gateway();
        let store = CollectionStore::new();
        let scope = ExpansionScope::new();
        scope.initialize(&store, &gateway).await.unwrap();

        let err = scope.select(&store, &gateway, "base1").await.unwrap_err();
        assert!(matches!(err, CollectionError::InvalidScope(ref id) if id == "base1"));
        assert_eq!(gateway.collection_fetches(), 1);
        assert_eq!(scope.active().as_deref(), Some("sv2"));
    }

    #[tokio::test]
    async fn failed_load_restores_previous_scope() {
        let gateway = gateway();
        let store = CollectionStore::new();
        let scope = ExpansionScope::new();
        scope.initialize(&store, &gateway).await.unwrap();

        gateway.fail_collection("sv1", 1);
        assert!(scope.select(&store, &gateway, "sv1").await.is_err());
        assert_eq!(scope.active().as_deref(), Some("sv2"));
        assert_eq!(store.expansion_id().as_deref(), Some("sv2"));

        // The failure was transient; selecting again retries the load.
        let selection = scope.select(&store, &gateway, "sv1").await.unwrap();
        assert_eq!(selection, Selection::Loaded { entries: 1 });
        assert_eq!(store.expansion_id().as_deref(), Some("sv1"));
    }
}
