//! Full dataset reload pipeline.
//!
//! The pipeline parses the source document completely before touching the
//! database, so a missing or malformed document never destroys loaded
//! state. The clearing of prior data runs in a single transaction; the
//! subsequent insert, aggregate, and recommend phases run sequentially
//! per product.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use merchpulse_core::{
    aggregate, Dataset, NormalizedEntry, Product, ProductReturn, RecommendationEngine,
    RecommendationInput, Review, Sale,
};

use crate::repositories::{
    ProductRepository, RepositoryError, ReturnRepository, ReviewRepository, SaleRepository,
    SqlProductRepository, SqlReturnRepository, SqlReviewRepository, SqlSaleRepository,
    SqlSuggestionRepository, SuggestionRepository,
};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("dataset not found at `{path}`")]
    DatasetNotFound { path: String },
    #[error("could not read dataset `{path}`: {source}")]
    DatasetRead { path: String, source: std::io::Error },
    #[error("could not parse dataset `{path}`: {source}")]
    DatasetParse { path: String, source: serde_json::Error },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ReloadError {
    fn from(value: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(value))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub products_loaded: usize,
    pub entries_skipped: usize,
    pub sales_loaded: usize,
    pub reviews_loaded: usize,
    pub returns_loaded: usize,
    pub suggestions_generated: usize,
    pub suggestions_preserved: usize,
}

pub struct DatasetReload;

impl DatasetReload {
    /// Reload from a document on disk. The document is located, read, and
    /// parsed before any existing rows are deleted.
    pub async fn from_path(
        pool: &DbPool,
        path: impl AsRef<Path>,
    ) -> Result<ReloadSummary, ReloadError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.exists() {
            return Err(ReloadError::DatasetNotFound { path: display });
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ReloadError::DatasetRead { path: display.clone(), source })?;
        let dataset = Dataset::parse(&raw)
            .map_err(|source| ReloadError::DatasetParse { path: display, source })?;

        Self::apply(pool, &dataset).await
    }

    /// Replace all stored records with the given parsed dataset, then
    /// recompute aggregates and regenerate suggestions. Manual
    /// suggestions for products still present in the dataset are kept.
    pub async fn apply(pool: &DbPool, dataset: &Dataset) -> Result<ReloadSummary, ReloadError> {
        let entries = dataset.normalized_entries();
        let mut summary = ReloadSummary {
            entries_skipped: dataset.products.len() - entries.len(),
            ..ReloadSummary::default()
        };

        let keep_asins: Vec<&str> = entries.iter().map(|entry| entry.asin.as_str()).collect();
        clear_for_reload(pool, &keep_asins).await?;
        info!(event_name = "reload.cleared", "removed prior product records");

        insert_entries(pool, &entries, &mut summary).await?;
        info!(
            event_name = "reload.loaded",
            products = summary.products_loaded,
            skipped = summary.entries_skipped,
            "dataset loaded"
        );

        recompute_aggregates(pool).await?;
        info!(event_name = "reload.aggregated", "product aggregates updated");

        regenerate_suggestions(pool, &mut summary).await?;
        info!(
            event_name = "reload.suggested",
            generated = summary.suggestions_generated,
            preserved = summary.suggestions_preserved,
            "suggestions regenerated"
        );

        Ok(summary)
    }
}

/// Clear prior state in one transaction. Sale, review, and return rows
/// are always replaced wholesale; products absent from the incoming
/// document are deleted (cascading their suggestions); manual
/// suggestions for surviving products are kept.
async fn clear_for_reload(pool: &DbPool, keep_asins: &[&str]) -> Result<(), ReloadError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM sale").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM review").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM product_return").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM suggested_action WHERE is_manual = 0")
        .execute(&mut *tx)
        .await?;

    if keep_asins.is_empty() {
        sqlx::query("DELETE FROM product").execute(&mut *tx).await?;
    } else {
        let mut builder = sqlx::QueryBuilder::new("DELETE FROM product WHERE asin NOT IN (");
        let mut separated = builder.separated(", ");
        for asin in keep_asins {
            separated.push_bind(*asin);
        }
        builder.push(")");
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

async fn insert_entries(
    pool: &DbPool,
    entries: &[NormalizedEntry],
    summary: &mut ReloadSummary,
) -> Result<(), ReloadError> {
    let products = SqlProductRepository::new(pool.clone());
    let sales = SqlSaleRepository::new(pool.clone());
    let reviews = SqlReviewRepository::new(pool.clone());
    let returns = SqlReturnRepository::new(pool.clone());

    for entry in entries {
        products.upsert(&Product::new(&entry.asin, &entry.name)).await?;
        summary.products_loaded += 1;

        for sale in &entry.sales {
            sales
                .upsert(&Sale {
                    asin: entry.asin.clone(),
                    week: sale.week.clone(),
                    units_sold: sale.units_sold,
                    gmv: sale.gmv,
                    refunds: sale.refunds,
                })
                .await?;
            summary.sales_loaded += 1;
        }

        for review in &entry.reviews {
            reviews
                .insert(&Review {
                    asin: entry.asin.clone(),
                    review_text: review.review_text.clone(),
                    rating: review.rating,
                })
                .await?;
            summary.reviews_loaded += 1;
        }

        for (reason, count) in &entry.returns {
            returns
                .insert(&ProductReturn {
                    asin: entry.asin.clone(),
                    return_reason: reason.clone(),
                    count: *count,
                })
                .await?;
            summary.returns_loaded += 1;
        }
    }

    Ok(())
}

/// Recompute derived fields for every product from the records currently
/// attached to it. Idempotent over unchanged sale/review data.
pub async fn recompute_aggregates(pool: &DbPool) -> Result<(), RepositoryError> {
    let products = SqlProductRepository::new(pool.clone());
    let sales = SqlSaleRepository::new(pool.clone());
    let reviews = SqlReviewRepository::new(pool.clone());

    for product in products.list_all().await? {
        let product_sales = sales.list_for_product(&product.asin).await?;
        let totals = aggregate::KpiTotals::from_sales(&product_sales);

        let ratings: Vec<i64> = reviews
            .list_for_product(&product.asin)
            .await?
            .iter()
            .map(|review| review.rating)
            .collect();
        let average_rating = aggregate::average_rating(&ratings);

        products.update_aggregates(&product.asin, &totals, average_rating).await?;
    }

    Ok(())
}

/// Run the recommendation engine for every product and upsert the result.
/// Manual suggestions are preserved; the generated text is still logged
/// for comparison.
pub async fn regenerate_suggestions(
    pool: &DbPool,
    summary: &mut ReloadSummary,
) -> Result<(), RepositoryError> {
    let products = SqlProductRepository::new(pool.clone());
    let reviews = SqlReviewRepository::new(pool.clone());
    let returns = SqlReturnRepository::new(pool.clone());
    let suggestions = SqlSuggestionRepository::new(pool.clone());
    let engine = RecommendationEngine;

    for product in products.list_all().await? {
        let review_texts: Vec<String> = reviews
            .list_for_product(&product.asin)
            .await?
            .into_iter()
            .map(|review| review.review_text)
            .collect();
        let return_reasons: Vec<String> = returns
            .list_for_product(&product.asin)
            .await?
            .into_iter()
            .map(|product_return| product_return.return_reason)
            .collect();

        let recommendation = engine.generate(&RecommendationInput {
            review_texts: &review_texts,
            return_reasons: &return_reasons,
            average_rating: product.average_rating,
        });

        let written = suggestions
            .upsert_generated(&product.asin, &recommendation.text, Utc::now())
            .await?;
        if written {
            summary.suggestions_generated += 1;
        } else {
            summary.suggestions_preserved += 1;
        }

        info!(
            event_name = "reload.suggestion",
            asin = %product.asin,
            preserved_manual = !written,
            suggestion = %recommendation.text,
            "suggestion evaluated"
        );
    }

    Ok(())
}
