use merchpulse_core::ProductReturn;
use sqlx::{sqlite::SqliteRow, Row};

use super::{RepositoryError, ReturnRepository};
use crate::DbPool;

pub struct SqlReturnRepository {
    pool: DbPool,
}

impl SqlReturnRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReturnRepository for SqlReturnRepository {
    async fn insert(&self, product_return: &ProductReturn) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO product_return (asin, return_reason, count)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&product_return.asin)
        .bind(&product_return.return_reason)
        .bind(product_return.count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_product(&self, asin: &str) -> Result<Vec<ProductReturn>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT asin, return_reason, count
            FROM product_return
            WHERE asin = ?
            ORDER BY count DESC, id ASC
            "#,
        )
        .bind(asin)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(return_from_row).collect()
    }

    async fn top_reason(&self, asin: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT return_reason
            FROM product_return
            WHERE asin = ?
            ORDER BY count DESC, id ASC
            LIMIT 1
            "#,
        )
        .bind(asin)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<String, _>("return_reason")))
    }
}

fn return_from_row(row: &SqliteRow) -> Result<ProductReturn, RepositoryError> {
    Ok(ProductReturn {
        asin: row.try_get("asin")?,
        return_reason: row.try_get("return_reason")?,
        count: row.try_get("count")?,
    })
}
