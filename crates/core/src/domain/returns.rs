use serde::{Deserialize, Serialize};

/// A merged return record: one row per distinct normalized reason per
/// product, with counts summed at load time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReturn {
    pub asin: String,
    pub return_reason: String,
    pub count: i64,
}
