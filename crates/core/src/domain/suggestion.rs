use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The improvement suggestion attached 1:1 to a product. `is_manual`
/// marks operator-edited text, which the engine must not overwrite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub asin: String,
    pub action_text: String,
    pub is_manual: bool,
    pub generated_on: DateTime<Utc>,
}

impl SuggestedAction {
    pub const PLACEHOLDER: &'static str = "No suggestion available";
}
