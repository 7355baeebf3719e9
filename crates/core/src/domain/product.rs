use serde::{Deserialize, Serialize};

/// A catalog product keyed by its ASIN. The aggregate fields are derived
/// from the product's sale and review records and recomputed after every
/// dataset reload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub asin: String,
    pub name: String,
    pub average_rating: f64,
    pub total_gmv: f64,
    pub total_units: i64,
    pub total_refunds: f64,
}

impl Product {
    pub fn new(asin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            asin: asin.into(),
            name: name.into(),
            average_rating: 0.0,
            total_gmv: 0.0,
            total_units: 0,
            total_refunds: 0.0,
        }
    }
}
