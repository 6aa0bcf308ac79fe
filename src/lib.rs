//! Collection tracking for a trading-card catalog: owned quantities per card,
//! optimistic updates against a remote inventory service, and derived stats.

pub mod api;
pub mod card;
pub mod collection;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod expansion;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod mutator;
pub mod scope;
pub mod stats;
pub mod tracker;

pub use api::{HttpGateway, RemoteInventoryGateway};
pub use card::{Card, CollectionEntry};
pub use collection::CollectionStore;
pub use config::Config;
pub use dashboard::{Dashboard, ExpansionCount};
pub use error::{CollectionError, ConfigError, GatewayError};
pub use expansion::{Expansion, ExpansionCatalog};
#[cfg(any(test, feature = "test-util"))]
pub use memory::{Gate, MemoryGateway};
pub use mutator::{Adjustment, QuantityMutator};
pub use scope::{ExpansionScope, Selection};
pub use stats::{CollectionStats, Completion};
pub use tracker::CollectionTracker;
