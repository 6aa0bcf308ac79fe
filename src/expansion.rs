use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Expansion {
    pub id: String,
    pub name: String,
    pub series: String,
    #[serde(default)]
    pub printed_total: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub ptcgo_code: Option<String>,
    pub release_date: String,
    #[serde(default)]
    pub symbol_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Expansion {
    /// Menu label, e.g. `Scarlet & Violet (SVI)`.
    pub fn label(&self) -> String {
        match &self.ptcgo_code {
            Some(code) if !code.is_empty() => format!("{} ({})", self.name, code),
            _ => self.name.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct ExpansionsResponse {
    pub expansions: HashMap<String, Vec<Expansion>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
    pub name: String,
    pub expansions: Vec<Expansion>,
}

/// Expansions grouped by series, newest series first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpansionCatalog {
    series: Vec<Series>,
}

impl ExpansionCatalog {
    /// Groups by series. Series are ordered by their latest release, and the
    /// expansions inside a series newest first.
    pub fn from_grouped(grouped: HashMap<String, Vec<Expansion>>) -> Self {
        let mut series: Vec<Series> = grouped
            .into_iter()
            .filter(|(_, expansions)| !expansions.is_empty())
            .map(|(name, mut expansions)| {
                expansions.sort_by(|a, b| {
                    b.release_date
                        .cmp(&a.release_date)
                        .then_with(|| a.id.cmp(&b.id))
                });
                Series { name, expansions }
            })
            .collect();

        // Each series is sorted, so its first expansion is its latest release.
        series.sort_by(|a, b| {
            b.expansions[0]
                .release_date
                .cmp(&a.expansions[0].release_date)
                .then_with(|| a.name.cmp(&b.name))
        });

        ExpansionCatalog { series }
    }

    pub fn from_expansions(expansions: Vec<Expansion>) -> Self {
        let mut grouped: HashMap<String, Vec<Expansion>> = HashMap::new();
        for expansion in expansions {
            grouped
                .entry(expansion.series.clone())
                .or_insert_with(Vec::new)
                .push(expansion);
        }
        ExpansionCatalog::from_grouped(grouped)
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expansion> {
        self.series.iter().flat_map(|s| s.expansions.iter())
    }

    pub fn first(&self) -> Option<&Expansion> {
        self.iter().next()
    }

    pub fn get(&self, expansion_id: &str) -> Option<&Expansion> {
        self.iter().find(|exp| exp.id == expansion_id)
    }

    pub fn contains(&self, expansion_id: &str) -> bool {
        self.get(expansion_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.series.iter().map(|s| s.expansions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn expansion(id: &str, series: &str, release_date: &str) -> Expansion {
    Expansion {
        id: id.to_string(),
        name: format!("Expansion {}", id),
        series: series.to_string(),
        printed_total: Some(100),
        total: Some(120),
        ptcgo_code: Some(id.to_uppercase()),
        release_date: release_date.to_string(),
        symbol_url: None,
        logo_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_series_by_latest_release() {
        let catalog = ExpansionCatalog::from_expansions(vec![
            expansion("base1", "Base", "1999/01/09"),
            expansion("sv1", "Scarlet & Violet", "2023/03/31"),
            expansion("swsh1", "Sword & Shield", "2020/02/07"),
            expansion("sv2", "Scarlet & Violet", "2023/06/09"),
            expansion("base2", "Base", "1999/06/16"),
        ]);

        let ids: Vec<&str> = catalog.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["sv2", "sv1", "swsh1", "base2", "base1"]);
        assert_eq!(catalog.first().map(|e| e.id.as_str()), Some("sv2"));
        assert_eq!(catalog.series()[0].name, "Scarlet & Violet");
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn decodes_grouped_response() {
        let body = r#"{"expansions": {
            "Base": [{"id": "base1", "name": "Base", "series": "Base", "printed_total": 102,
                      "total": 102, "legal_unlimited": "Legal", "ptcgo_code": "BS",
                      "release_date": "1999/01/09", "updated_at": "2022/10/10 15:12:00",
                      "symbol_url": "https://images.example/base1/symbol.png",
                      "logo_url": "https://images.example/base1/logo.png"}],
            "Empty": []
        }}"#;
        let response: ExpansionsResponse = serde_json::from_str(body).unwrap();
        let catalog = ExpansionCatalog::from_grouped(response.expansions);

        assert_eq!(catalog.series().len(), 1);
        let base = catalog.get("base1").unwrap();
        assert_eq!(base.label(), "Base (BS)");
        assert_eq!(base.printed_total, Some(102));
        assert!(!catalog.contains("Empty"));
    }

    #[test]
    fn empty_catalog_has_no_first() {
        let catalog = ExpansionCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.first().is_none());
    }
}
