use serde::{Deserialize, Deserializer, Serialize};

/// Catalog record for one card, as denormalized into a collection row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Card {
    #[serde(rename = "card_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(rename = "type", default)]
    pub supertype: String,
    #[serde(
        rename = "color",
        default,
        deserialize_with = "comma_list",
        serialize_with = "join_list"
    )]
    pub types: Vec<String>,
    #[serde(default)]
    pub hp: Option<String>,
    #[serde(default)]
    pub evolves_from: Option<String>,
    #[serde(default)]
    pub image_url: String,
}

/// A user's owned quantity for one card of the active expansion.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CollectionEntry {
    #[serde(flatten)]
    pub card: Card,
    pub quantity: u32,
    pub collection_number: u32,
}

impl CollectionEntry {
    pub fn card_id(&self) -> &str {
        &self.card.id
    }

    pub fn rarity(&self) -> Option<&str> {
        self.card.rarity.as_deref().filter(|r| !r.trim().is_empty())
    }

    /// Printed number, falling back to the ordinal position.
    pub fn number(&self) -> String {
        self.card
            .number
            .clone()
            .unwrap_or_else(|| self.collection_number.to_string())
    }

    pub fn is_owned(&self) -> bool {
        self.quantity > 0
    }
}

#[derive(Deserialize)]
pub struct CollectionResponse {
    pub collection: Vec<CollectionEntry>,
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

fn join_list<S>(types: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if types.is_empty() {
        serializer.serialize_none()
    } else {
        serializer.serialize_str(&types.join(","))
    }
}

#[cfg(test)]
pub(crate) fn entry(card_id: &str, rarity: Option<&str>, quantity: u32, number: u32) -> CollectionEntry {
    CollectionEntry {
        card: Card {
            id: card_id.to_string(),
            name: format!("Card {}", card_id),
            number: Some(number.to_string()),
            rarity: rarity.map(str::to_string),
            supertype: "Pokémon".to_string(),
            types: vec!["Grass".to_string()],
            hp: Some("60".to_string()),
            evolves_from: None,
            image_url: format!("https://images.example/{}.png", card_id),
        },
        quantity,
        collection_number: number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_api_row() {
        let body = r#"{
            "collection": [
                {"card_id": "sv1-1", "name": "Pineco", "type": "Pokémon", "color": "Grass",
                 "rarity": "Common", "image_url": "https://images.example/sv1-1.png",
                 "quantity": 2, "collection_number": 1},
                {"card_id": "sv1-2", "name": "Forretress ex", "type": "Pokémon",
                 "color": "Grass, Metal", "rarity": null, "image_url": "",
                 "quantity": 0, "collection_number": 2, "hp": "270", "evolves_from": "Pineco"}
            ],
            "stats": {"total": "1/2", "rarities": {"Common": "1/1"}}
        }"#;
        let response: CollectionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.collection.len(), 2);

        let first = &response.collection[0];
        assert_eq!(first.card_id(), "sv1-1");
        assert_eq!(first.card.types, vec!["Grass"]);
        assert_eq!(first.rarity(), Some("Common"));
        assert_eq!(first.number(), "1");

        let second = &response.collection[1];
        assert_eq!(second.card.types, vec!["Grass", "Metal"]);
        assert_eq!(second.rarity(), None);
        assert_eq!(second.card.evolves_from.as_deref(), Some("Pineco"));
        assert!(!second.is_owned());
    }

    #[test]
    fn null_color_is_empty_type_list() {
        let row = r#"{"card_id": "x", "name": "Trainer", "type": "Trainer", "color": null,
                      "rarity": "Uncommon", "image_url": "", "quantity": 1, "collection_number": 7}"#;
        let entry: CollectionEntry = serde_json::from_str(row).unwrap();
        assert!(entry.card.types.is_empty());
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let row = r#"{"card_id": "x", "name": "Bad", "type": "Trainer", "color": null,
                      "rarity": null, "image_url": "", "quantity": -1, "collection_number": 1}"#;
        assert!(serde_json::from_str::<CollectionEntry>(row).is_err());
    }

    #[test]
    fn blank_rarity_counts_as_unset() {
        let entry = entry("x", Some("  "), 1, 1);
        assert_eq!(entry.rarity(), None);
    }
}
