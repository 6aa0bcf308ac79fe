use crate::api::RemoteInventoryGateway;
use crate::error::CollectionError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One row of the cards-by-expansion widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionCount {
    pub expansion_name: String,
    pub card_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotalCardsResponse {
    pub total_cards: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotalExpansionsResponse {
    pub total_expansions: u64,
}

/// Collection-wide figures, across every expansion. These come from the
/// service as-is; nothing here is derived from the loaded expansion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Owned copies over all expansions.
    pub total_cards: u64,
    /// Expansions with at least one owned card.
    pub total_expansions: u64,
    pub cards_by_expansion: Vec<ExpansionCount>,
}

/// Fetches the three widgets concurrently. Any failing widget fails the
/// whole dashboard.
pub async fn load_dashboard(gateway: &dyn RemoteInventoryGateway) -> Result<Dashboard, CollectionError> {
    let (total_cards, total_expansions, cards_by_expansion) = tokio::try_join!(
        gateway.fetch_total_cards(),
        gateway.fetch_total_expansions(),
        gateway.fetch_cards_by_expansion(),
    )
    .map_err(CollectionError::Dashboard)?;

    debug!(total_cards, total_expansions, "dashboard loaded");
    Ok(Dashboard {
        total_cards,
        total_expansions,
        cards_by_expansion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::entry;
    use crate::error::GatewayError;
    use crate::expansion::expansion;
    use crate::memory::MemoryGateway;

    #[test]
    fn widget_bodies_decode() {
        let cards: TotalCardsResponse = serde_json::from_str(r#"{"totalCards": 59}"#).unwrap();
        assert_eq!(cards.total_cards, 59);

        let expansions: TotalExpansionsResponse =
            serde_json::from_str(r#"{"totalExpansions": 2}"#).unwrap();
        assert_eq!(expansions.total_expansions, 2);

        let rows: Vec<ExpansionCount> = serde_json::from_str(
            r#"[{"expansionName": "Base Set", "cardCount": 42}, {"expansionName": "Jungle", "cardCount": 17}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].expansion_name, "Jungle");
        assert_eq!(rows[0].card_count, 42);
    }

    #[tokio::test]
    async fn expansions_without_owned_cards_are_left_out() {
        let gateway = MemoryGateway::new()
            .with_expansion(
                expansion("sv1", "Scarlet & Violet", "2023/03/31"),
                vec![entry("sv1-1", Some("Common"), 3, 1), entry("sv1-2", None, 1, 2)],
            )
            .with_expansion(
                expansion("sv2", "Scarlet & Violet", "2023/06/09"),
                vec![entry("sv2-1", Some("Rare"), 0, 1)],
            );

        let dashboard = load_dashboard(&gateway).await.unwrap();
        assert_eq!(dashboard.total_cards, 4);
        assert_eq!(dashboard.total_expansions, 1);
        assert_eq!(
            dashboard.cards_by_expansion,
            vec![ExpansionCount {
                expansion_name: "Expansion sv1".to_string(),
                card_count: 4,
            }]
        );
    }

    #[tokio::test]
    async fn failing_widget_fails_the_dashboard() {
        let gateway = MemoryGateway::new();
        gateway.fail_dashboard(1);

        let err = load_dashboard(&gateway).await.unwrap_err();
        assert!(matches!(err, CollectionError::Dashboard(GatewayError::Unavailable(_))));
        assert!(err.is_remote());
    }
}
