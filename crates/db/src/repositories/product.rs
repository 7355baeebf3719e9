use merchpulse_core::{KpiTotals, Product};
use sqlx::{sqlite::SqliteRow, Row};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO product (asin, name, average_rating, total_gmv, total_units, total_refunds)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (asin) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(&product.asin)
        .bind(&product.name)
        .bind(product.average_rating)
        .bind(product.total_gmv)
        .bind(product.total_units)
        .bind(product.total_refunds)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_asin(&self, asin: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT asin, name, average_rating, total_gmv, total_units, total_refunds
            FROM product
            WHERE asin = ?
            "#,
        )
        .bind(asin)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT asin, name, average_rating, total_gmv, total_units, total_refunds
            FROM product
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn update_aggregates(
        &self,
        asin: &str,
        totals: &KpiTotals,
        average_rating: f64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE product
            SET total_gmv = ?, total_units = ?, total_refunds = ?, average_rating = ?
            WHERE asin = ?
            "#,
        )
        .bind(totals.total_gmv)
        .bind(totals.total_units)
        .bind(totals.total_refunds)
        .bind(average_rating)
        .bind(asin)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        asin: row.try_get("asin")?,
        name: row.try_get("name")?,
        average_rating: row.try_get("average_rating")?,
        total_gmv: row.try_get("total_gmv")?,
        total_units: row.try_get("total_units")?,
        total_refunds: row.try_get("total_refunds")?,
    })
}
