use async_trait::async_trait;
use thiserror::Error;

use chrono::{DateTime, Utc};
use merchpulse_core::{KpiTotals, Product, ProductReturn, Review, Sale, SuggestedAction};

pub mod product;
pub mod returns;
pub mod review;
pub mod sale;
pub mod suggestion;

pub use product::SqlProductRepository;
pub use returns::SqlReturnRepository;
pub use review::SqlReviewRepository;
pub use sale::SqlSaleRepository;
pub use suggestion::SqlSuggestionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert or, when the asin already exists, refresh the display name.
    /// Aggregate fields are owned by `update_aggregates`.
    async fn upsert(&self, product: &Product) -> Result<(), RepositoryError>;
    async fn find_by_asin(&self, asin: &str) -> Result<Option<Product>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn update_aggregates(
        &self,
        asin: &str,
        totals: &KpiTotals,
        average_rating: f64,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Upsert by (asin, week): the last write for a given week wins.
    async fn upsert(&self, sale: &Sale) -> Result<(), RepositoryError>;
    async fn list_for_product(&self, asin: &str) -> Result<Vec<Sale>, RepositoryError>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError>;
    async fn list_for_product(&self, asin: &str) -> Result<Vec<Review>, RepositoryError>;
}

#[async_trait]
pub trait ReturnRepository: Send + Sync {
    async fn insert(&self, product_return: &ProductReturn) -> Result<(), RepositoryError>;
    async fn list_for_product(&self, asin: &str) -> Result<Vec<ProductReturn>, RepositoryError>;
    /// The single return reason with the highest count for a product.
    async fn top_reason(&self, asin: &str) -> Result<Option<String>, RepositoryError>;
}

#[async_trait]
pub trait SuggestionRepository: Send + Sync {
    /// Upsert the engine-generated suggestion. A stored manual suggestion
    /// is left untouched; returns whether the generated text was written.
    async fn upsert_generated(
        &self,
        asin: &str,
        action_text: &str,
        generated_on: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Store operator-edited text, marking the suggestion as manual.
    async fn save_manual(
        &self,
        asin: &str,
        action_text: &str,
        generated_on: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn find_for_product(&self, asin: &str)
        -> Result<Option<SuggestedAction>, RepositoryError>;
}
