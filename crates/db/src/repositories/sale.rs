use merchpulse_core::Sale;
use sqlx::{sqlite::SqliteRow, Row};

use super::{RepositoryError, SaleRepository};
use crate::DbPool;

pub struct SqlSaleRepository {
    pool: DbPool,
}

impl SqlSaleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SaleRepository for SqlSaleRepository {
    async fn upsert(&self, sale: &Sale) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO sale (asin, week, units_sold, gmv, refunds)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (asin, week) DO UPDATE SET
                units_sold = excluded.units_sold,
                gmv = excluded.gmv,
                refunds = excluded.refunds
            "#,
        )
        .bind(&sale.asin)
        .bind(&sale.week)
        .bind(sale.units_sold)
        .bind(sale.gmv)
        .bind(sale.refunds)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_product(&self, asin: &str) -> Result<Vec<Sale>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT asin, week, units_sold, gmv, refunds
            FROM sale
            WHERE asin = ?
            ORDER BY week ASC
            "#,
        )
        .bind(asin)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(sale_from_row).collect()
    }
}

fn sale_from_row(row: &SqliteRow) -> Result<Sale, RepositoryError> {
    Ok(Sale {
        asin: row.try_get("asin")?,
        week: row.try_get("week")?,
        units_sold: row.try_get("units_sold")?,
        gmv: row.try_get("gmv")?,
        refunds: row.try_get("refunds")?,
    })
}

#[cfg(test)]
mod tests {
    use merchpulse_core::{Product, Sale};

    use super::{SaleRepository, SqlSaleRepository};
    use crate::repositories::{ProductRepository, SqlProductRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    fn sale(week: &str, units_sold: i64, gmv: f64, refunds: f64) -> Sale {
        Sale { asin: "B00SALE01".to_string(), week: week.to_string(), units_sold, gmv, refunds }
    }

    #[tokio::test]
    async fn upsert_overwrites_duplicate_weeks_instead_of_accumulating() {
        let pool = setup_pool().await;
        let repo = SqlSaleRepository::new(pool.clone());

        repo.upsert(&sale("1", 10, 100.0, 0.0)).await.expect("first upsert");
        repo.upsert(&sale("1", 20, 300.0, 5.0)).await.expect("second upsert");

        let sales = repo.list_for_product("B00SALE01").await.expect("list sales");
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].units_sold, 20);
        assert_eq!(sales[0].gmv, 300.0);
        assert_eq!(sales[0].refunds, 5.0);

        pool.close().await;
    }

    #[tokio::test]
    async fn list_for_product_excludes_other_products() {
        let pool = setup_pool().await;
        SqlProductRepository::new(pool.clone())
            .upsert(&Product::new("B00SALE02", "Other"))
            .await
            .expect("insert second product");
        let repo = SqlSaleRepository::new(pool.clone());

        repo.upsert(&sale("1", 10, 100.0, 0.0)).await.expect("upsert");
        repo.upsert(&Sale {
            asin: "B00SALE02".to_string(),
            week: "1".to_string(),
            units_sold: 99,
            gmv: 999.0,
            refunds: 0.0,
        })
        .await
        .expect("upsert other");

        let sales = repo.list_for_product("B00SALE01").await.expect("list sales");
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].units_sold, 10);

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        SqlProductRepository::new(pool.clone())
            .upsert(&Product::new("B00SALE01", "Widget"))
            .await
            .expect("insert product");
        pool
    }
}
