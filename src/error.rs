use thiserror::Error;

/// Failures raised at the network boundary.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(Box<reqwest::Error>),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("inventory service unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        GatewayError::Http(Box::new(error))
    }
}

/// Failures of the collection core. None of them is fatal; every variant
/// leaves the previously loaded state in place.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("failed to load collection for expansion {expansion_id}: {source}")]
    Load {
        expansion_id: String,
        #[source]
        source: GatewayError,
    },

    #[error("failed to load expansion catalog: {0}")]
    Catalog(#[source] GatewayError),

    #[error("failed to load dashboard: {0}")]
    Dashboard(#[source] GatewayError),

    #[error("card {0} is not part of the loaded collection")]
    UnknownCard(String),

    #[error("card {card_id} changed while its update was failing; kept quantity {kept}")]
    Conflict {
        card_id: String,
        kept: u32,
        #[source]
        source: GatewayError,
    },

    #[error("unknown expansion: {0}")]
    InvalidScope(String),

    #[error("failed to update card {card_id}, quantity restored to {restored}: {source}")]
    Sync {
        card_id: String,
        restored: u32,
        #[source]
        source: GatewayError,
    },
}

impl CollectionError {
    /// Whether the failure came from the remote side rather than from the
    /// caller's input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CollectionError::Load { .. }
                | CollectionError::Catalog(_)
                | CollectionError::Dashboard(_)
                | CollectionError::Conflict { .. }
                | CollectionError::Sync { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("invalid API url: {0}")]
    Url(#[from] url::ParseError),
}
