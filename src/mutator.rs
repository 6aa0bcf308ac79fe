use crate::api::RemoteInventoryGateway;
use crate::collection::{CollectionStore, QuantityChange, RollbackOutcome};
use crate::error::CollectionError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

/// Result of a committed adjustment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjustment {
    pub card_id: String,
    pub previous: u32,
    /// The quantity the store holds once the update is confirmed.
    pub quantity: u32,
    /// A reload replaced the collection while the update was in flight;
    /// `quantity` is the reloaded value, not `previous + delta`.
    pub superseded: bool,
}

/// Optimistic quantity updates with exact rollback.
///
/// The local change is applied before the first await, so reads issued right
/// after `adjust` starts already see it. Remote calls for the same card are
/// queued and sent one at a time in the order the adjustments were made.
#[derive(Default)]
pub struct QuantityMutator {
    queues: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// A local change whose remote update has not settled yet. Dropping it
/// unsettled (the `adjust` future was cancelled) rolls the change back.
/// Either way the card's queue slot is given up.
struct PendingChange<'a> {
    mutator: &'a QuantityMutator,
    store: &'a CollectionStore,
    queue: Arc<AsyncMutex<()>>,
    change: QuantityChange,
    settled: bool,
}

impl PendingChange<'_> {
    fn settle(&mut self) -> QuantityChange {
        self.settled = true;
        self.change.clone()
    }
}

impl Drop for PendingChange<'_> {
    fn drop(&mut self) {
        if !self.settled {
            // The post may or may not have reached the service; the next
            // reload reconciles.
            let outcome = self.store.rollback(&self.change);
            warn!(card_id = %self.change.card_id, ?outcome, "quantity update cancelled");
        }
        self.mutator.release(&self.change.card_id, &self.queue);
    }
}

impl QuantityMutator {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self, card_id: &str) -> Arc<AsyncMutex<()>> {
        self.queues()
            .entry(card_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn release(&self, card_id: &str, queue: &Arc<AsyncMutex<()>>) {
        let mut queues = self.queues();
        // Only the map and the caller hold it: nobody is waiting behind us.
        if Arc::strong_count(queue) == 2 {
            queues.remove(card_id);
        }
    }

    /// Number of cards with a remote update queued or in flight.
    pub fn pending_cards(&self) -> usize {
        self.queues().len()
    }

    /// Applies `delta` locally, then sends it. On failure the local change is
    /// undone; if the returned future is dropped before the send settles the
    /// change is undone as well.
    pub async fn adjust(
        &self,
        store: &CollectionStore,
        gateway: &dyn RemoteInventoryGateway,
        card_id: &str,
        delta: i32,
    ) -> Result<Adjustment, CollectionError> {
        if delta == 0 {
            let entry = store
                .entry(card_id)
                .ok_or_else(|| CollectionError::UnknownCard(card_id.to_string()))?;
            return Ok(Adjustment {
                card_id: card_id.to_string(),
                previous: entry.quantity,
                quantity: entry.quantity,
                superseded: false,
            });
        }

        let change = store.apply_delta(card_id, delta)?;
        let mut pending = PendingChange {
            mutator: self,
            store,
            queue: self.queue(card_id),
            change,
            settled: false,
        };

        let sent = {
            let _turn = pending.queue.lock().await;
            gateway.post_quantity_delta(card_id, delta).await
        };
        let change = pending.settle();
        drop(pending);

        let source = match sent {
            Ok(()) => {
                let superseded = store.superseded(&change);
                let quantity = if superseded {
                    store.entry(card_id).map_or(change.current, |entry| entry.quantity)
                } else {
                    change.current
                };
                debug!(card_id, delta, quantity, superseded, "quantity update committed");
                return Ok(Adjustment {
                    card_id: change.card_id,
                    previous: change.previous,
                    quantity,
                    superseded,
                });
            }
            Err(source) => source,
        };

        warn!(card_id, delta, error = %source, "quantity update failed");
        match store.rollback(&change) {
            RollbackOutcome::Restored(restored) => Err(CollectionError::Sync {
                card_id: card_id.to_string(),
                restored,
                source,
            }),
            RollbackOutcome::Conflict { kept } => Err(CollectionError::Conflict {
                card_id: card_id.to_string(),
                kept,
                source,
            }),
            RollbackOutcome::Superseded => Err(CollectionError::Sync {
                card_id: card_id.to_string(),
                restored: store
                    .entry(card_id)
                    .map_or(change.previous, |entry| entry.quantity),
                source,
            }),
        }
    }
}
