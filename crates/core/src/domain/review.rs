use serde::{Deserialize, Serialize};

/// A customer review. Ratings are expected in 1..=5 but stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub asin: String,
    pub review_text: String,
    pub rating: i64,
}
