pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod recommend;

pub use chrono;

pub use aggregate::{average_rating, return_rate, round1, round2, safe_pct_change, KpiTotals};
pub use dataset::{Dataset, NormalizedEntry, ProductEntry, ReturnRecord, ReviewRecord, SaleRecord};
pub use domain::product::Product;
pub use domain::returns::ProductReturn;
pub use domain::review::Review;
pub use domain::sale::Sale;
pub use domain::suggestion::SuggestedAction;
pub use recommend::{Recommendation, RecommendationEngine, RecommendationInput};
