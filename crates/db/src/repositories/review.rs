use merchpulse_core::Review;
use sqlx::{sqlite::SqliteRow, Row};

use super::{RepositoryError, ReviewRepository};
use crate::DbPool;

pub struct SqlReviewRepository {
    pool: DbPool,
}

impl SqlReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReviewRepository for SqlReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO review (asin, review_text, rating)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&review.asin)
        .bind(&review.review_text)
        .bind(review.rating)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_product(&self, asin: &str) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT asin, review_text, rating
            FROM review
            WHERE asin = ?
            ORDER BY id ASC
            "#,
        )
        .bind(asin)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(review_from_row).collect()
    }
}

fn review_from_row(row: &SqliteRow) -> Result<Review, RepositoryError> {
    Ok(Review {
        asin: row.try_get("asin")?,
        review_text: row.try_get("review_text")?,
        rating: row.try_get("rating")?,
    })
}
