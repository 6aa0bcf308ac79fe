use crate::card::{CollectionEntry, CollectionResponse};
use crate::config::Config;
use crate::dashboard::{ExpansionCount, TotalCardsResponse, TotalExpansionsResponse};
use crate::error::GatewayError;
use crate::expansion::{ExpansionCatalog, ExpansionsResponse};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Network boundary to the inventory service. Implementations own their
/// timeouts; the core treats a timeout like any other failure.
#[async_trait]
pub trait RemoteInventoryGateway: Send + Sync {
    async fn fetch_collection(
        &self,
        expansion_id: &str,
    ) -> Result<Vec<CollectionEntry>, GatewayError>;

    async fn fetch_expansions(&self) -> Result<ExpansionCatalog, GatewayError>;

    async fn post_quantity_delta(&self, card_id: &str, delta: i32) -> Result<(), GatewayError>;

    /// Owned copies across every expansion.
    async fn fetch_total_cards(&self) -> Result<u64, GatewayError>;

    /// Expansions with at least one owned card.
    async fn fetch_total_expansions(&self) -> Result<u64, GatewayError>;

    async fn fetch_cards_by_expansion(&self) -> Result<Vec<ExpansionCount>, GatewayError>;
}

pub struct HttpGateway {
    client: Client,
    base: Url,
}

#[derive(Deserialize)]
struct UpdateAck {
    #[serde(default)]
    message: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<HttpGateway, GatewayError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(HttpGateway {
            client,
            base: config.api_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Malformed(format!("bad endpoint {}: {}", path, e)))
    }

    async fn get_body(&self, path: &str) -> Result<String, GatewayError> {
        let url = self.endpoint(path)?;
        debug!(%url, "fetching widget");
        let response = self.client.get(url).send().await?;
        Self::read_body(response).await
    }

    async fn read_body(response: Response) -> Result<String, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl RemoteInventoryGateway for HttpGateway {
    async fn fetch_collection(
        &self,
        expansion_id: &str,
    ) -> Result<Vec<CollectionEntry>, GatewayError> {
        let url = self.endpoint(&format!(
            "collection/{}/",
            urlencoding::encode(expansion_id)
        ))?;
        debug!(%url, "fetching collection");

        let response = self.client.get(url).send().await?;
        let body = Self::read_body(response).await?;
        let collection: CollectionResponse = serde_json::from_str(&body)?;
        Ok(collection.collection)
    }

    async fn fetch_expansions(&self) -> Result<ExpansionCatalog, GatewayError> {
        let url = self.endpoint("expansions/")?;
        debug!(%url, "fetching expansions");

        let response = self.client.get(url).send().await?;
        let body = Self::read_body(response).await?;
        let expansions: ExpansionsResponse = serde_json::from_str(&body)?;
        Ok(ExpansionCatalog::from_grouped(expansions.expansions))
    }

    async fn post_quantity_delta(&self, card_id: &str, delta: i32) -> Result<(), GatewayError> {
        let url = self.endpoint("collection/update/")?;
        let change = delta.to_string();
        debug!(%url, card_id, delta, "posting quantity delta");

        let response = self
            .client
            .post(url)
            .query(&[("card_id", card_id), ("change", change.as_str())])
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        // The ack body carries nothing we need beyond being well-formed.
        if !body.trim().is_empty() {
            let ack: UpdateAck = serde_json::from_str(&body)?;
            debug!(card_id, message = ack.message.as_deref().unwrap_or(""), "update acknowledged");
        }
        Ok(())
    }

    async fn fetch_total_cards(&self) -> Result<u64, GatewayError> {
        let body = self.get_body("widgets/totalCards").await?;
        let widget: TotalCardsResponse = serde_json::from_str(&body)?;
        Ok(widget.total_cards)
    }

    async fn fetch_total_expansions(&self) -> Result<u64, GatewayError> {
        let body = self.get_body("widgets/totalExpansions").await?;
        let widget: TotalExpansionsResponse = serde_json::from_str(&body)?;
        Ok(widget.total_expansions)
    }

    async fn fetch_cards_by_expansion(&self) -> Result<Vec<ExpansionCount>, GatewayError> {
        let body = self.get_body("widgets/cardsByExpansion").await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gateway(base: &str) -> HttpGateway {
        let config = Config {
            api_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
        };
        HttpGateway::new(&config).unwrap()
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let gateway = gateway("http://localhost:8000/api/");
        assert_eq!(
            gateway.endpoint("expansions/").unwrap().as_str(),
            "http://localhost:8000/api/expansions/"
        );
    }

    #[test]
    fn expansion_id_is_encoded_as_one_segment() {
        let gateway = gateway("http://localhost:8000/");
        let path = format!("collection/{}/", urlencoding::encode("sv 3/5"));
        assert_eq!(
            gateway.endpoint(&path).unwrap().as_str(),
            "http://localhost:8000/collection/sv%203%2F5/"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let gateway = gateway("http://127.0.0.1:9/");
        let err = gateway.fetch_collection("sv1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Http(_)));
    }

    #[test]
    fn widget_endpoints_keep_their_casing() {
        let gateway = gateway("http://localhost:8000/api/");
        assert_eq!(
            gateway.endpoint("widgets/cardsByExpansion").unwrap().as_str(),
            "http://localhost:8000/api/widgets/cardsByExpansion"
        );
    }

    #[tokio::test]
    async fn unreachable_service_fails_widgets() {
        let gateway = gateway("http://127.0.0.1:9/");
        let err = gateway.fetch_total_cards().await.unwrap_err();
        assert!(matches!(err, GatewayError::Http(_)));
    }
}
