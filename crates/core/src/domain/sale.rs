use serde::{Deserialize, Serialize};

/// One weekly sales record. Unique per (asin, week); duplicate weeks in a
/// dataset overwrite rather than accumulate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub asin: String,
    pub week: String,
    pub units_sold: i64,
    pub gmv: f64,
    pub refunds: f64,
}
