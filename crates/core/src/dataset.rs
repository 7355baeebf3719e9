//! Dataset document model and entry normalization.
//!
//! The source document is JSON with a top-level `products` array. Every
//! field an entry might omit carries a serde default so a sparse document
//! still parses; validation happens during normalization, not parsing.

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_PRODUCT_NAME: &str = "Unnamed Product";

#[derive(Debug, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductEntry {
    #[serde(default)]
    pub asin: String,
    #[serde(default, rename = "product")]
    pub name: Option<String>,
    #[serde(default)]
    pub sales: Vec<SaleRecord>,
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
    #[serde(default)]
    pub returns: Vec<ReturnRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaleRecord {
    pub week: String,
    #[serde(default)]
    pub units_sold: i64,
    #[serde(default)]
    pub gmv: f64,
    #[serde(default)]
    pub refunds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReviewRecord {
    #[serde(default)]
    pub review_text: String,
    #[serde(default)]
    pub rating: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnRecord {
    #[serde(default)]
    pub return_reason: String,
    #[serde(default)]
    pub count: i64,
}

/// An entry that passed validation: trimmed non-empty asin, defaulted
/// name, and returns merged by normalized reason.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub asin: String,
    pub name: String,
    pub sales: Vec<SaleRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub returns: Vec<(String, i64)>,
}

impl Dataset {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Normalize every entry, dropping those without a usable asin. Each
    /// skipped entry emits a warning; skipping never aborts the batch.
    pub fn normalized_entries(&self) -> Vec<NormalizedEntry> {
        self.products
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let normalized = entry.normalize();
                if normalized.is_none() {
                    warn!(
                        event_name = "dataset.entry_skipped",
                        entry_index = index,
                        "skipped dataset entry with missing asin"
                    );
                }
                normalized
            })
            .collect()
    }
}

impl ProductEntry {
    /// Returns `None` when the asin is empty or whitespace-only.
    pub fn normalize(&self) -> Option<NormalizedEntry> {
        let asin = self.asin.trim();
        if asin.is_empty() {
            return None;
        }

        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_PRODUCT_NAME.to_string(),
        };

        Some(NormalizedEntry {
            asin: asin.to_string(),
            name,
            sales: self.sales.clone(),
            reviews: self
                .reviews
                .iter()
                .map(|review| ReviewRecord {
                    review_text: review.review_text.trim().to_string(),
                    rating: review.rating,
                })
                .collect(),
            returns: merge_returns(&self.returns),
        })
    }
}

/// Merge return records by normalized reason: trim whitespace, case-fold
/// for grouping, sum counts. The first-seen trimmed spelling is kept for
/// display and the result preserves first-seen order. Empty reasons after
/// trimming are dropped silently.
pub fn merge_returns(records: &[ReturnRecord]) -> Vec<(String, i64)> {
    let mut merged: Vec<(String, i64)> = Vec::new();
    let mut index_by_key: std::collections::HashMap<String, usize> =
        std::collections::HashMap::new();

    for record in records {
        let reason = record.return_reason.trim();
        if reason.is_empty() {
            continue;
        }
        let key = reason.to_lowercase();
        match index_by_key.get(&key) {
            Some(&slot) => merged[slot].1 += record.count,
            None => {
                index_by_key.insert(key, merged.len());
                merged.push((reason.to_string(), record.count));
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{merge_returns, Dataset, ProductEntry, ReturnRecord};

    #[test]
    fn parses_full_document_shape() {
        let raw = r#"{
            "products": [
                {
                    "asin": "B00TEST01",
                    "product": "Trail Bottle",
                    "sales": [
                        {"week": "1", "units_sold": 10, "gmv": 100.0, "refunds": 5.0}
                    ],
                    "reviews": [
                        {"review_text": "Great bottle", "rating": 5}
                    ],
                    "returns": [
                        {"return_reason": "Damaged Item", "count": 2}
                    ]
                }
            ]
        }"#;

        let dataset = Dataset::parse(raw).expect("dataset should parse");
        assert_eq!(dataset.products.len(), 1);

        let entries = dataset.normalized_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].asin, "B00TEST01");
        assert_eq!(entries[0].name, "Trail Bottle");
        assert_eq!(entries[0].sales[0].units_sold, 10);
        assert_eq!(entries[0].returns, vec![("Damaged Item".to_string(), 2)]);
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let raw = r#"{"products": [{"asin": "B00TEST02"}]}"#;

        let entries = Dataset::parse(raw).expect("parse").normalized_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Unnamed Product");
        assert!(entries[0].sales.is_empty());
        assert!(entries[0].reviews.is_empty());
        assert!(entries[0].returns.is_empty());
    }

    #[test]
    fn entry_with_whitespace_asin_is_skipped_without_aborting_batch() {
        let raw = r#"{
            "products": [
                {"asin": "   ", "product": "Ghost"},
                {"asin": "B00KEEP01", "product": "Keeper"}
            ]
        }"#;

        let entries = Dataset::parse(raw).expect("parse").normalized_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].asin, "B00KEEP01");
    }

    #[test]
    fn blank_product_name_defaults() {
        let entry = ProductEntry {
            asin: "B00TEST03".to_string(),
            name: Some("   ".to_string()),
            ..ProductEntry::default()
        };

        let normalized = entry.normalize().expect("asin is present");
        assert_eq!(normalized.name, "Unnamed Product");
    }

    #[test]
    fn merge_returns_sums_counts_across_case_and_whitespace_variants() {
        let records = vec![
            ReturnRecord { return_reason: "Late Delivery".to_string(), count: 3 },
            ReturnRecord { return_reason: "late delivery ".to_string(), count: 2 },
            ReturnRecord { return_reason: "Damaged Item".to_string(), count: 1 },
        ];

        let merged = merge_returns(&records);
        assert_eq!(
            merged,
            vec![("Late Delivery".to_string(), 5), ("Damaged Item".to_string(), 1)]
        );
    }

    #[test]
    fn merge_returns_drops_empty_reasons() {
        let records = vec![
            ReturnRecord { return_reason: "  ".to_string(), count: 4 },
            ReturnRecord { return_reason: String::new(), count: 1 },
        ];

        assert!(merge_returns(&records).is_empty());
    }
}
