use chrono::{DateTime, Utc};
use merchpulse_core::SuggestedAction;
use sqlx::{sqlite::SqliteRow, Row};

use super::{RepositoryError, SuggestionRepository};
use crate::DbPool;

pub struct SqlSuggestionRepository {
    pool: DbPool,
}

impl SqlSuggestionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SuggestionRepository for SqlSuggestionRepository {
    async fn upsert_generated(
        &self,
        asin: &str,
        action_text: &str,
        generated_on: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // The WHERE clause on the conflict arm preserves manual edits.
        let result = sqlx::query(
            r#"
            INSERT INTO suggested_action (id, asin, action_text, is_manual, generated_on)
            VALUES (?, ?, ?, 0, ?)
            ON CONFLICT (asin) DO UPDATE SET
                action_text = excluded.action_text,
                is_manual = 0,
                generated_on = excluded.generated_on
            WHERE suggested_action.is_manual = 0
            "#,
        )
        .bind(format!("sug-{}", sqlx::types::Uuid::new_v4()))
        .bind(asin)
        .bind(action_text)
        .bind(generated_on.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_manual(
        &self,
        asin: &str,
        action_text: &str,
        generated_on: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO suggested_action (id, asin, action_text, is_manual, generated_on)
            VALUES (?, ?, ?, 1, ?)
            ON CONFLICT (asin) DO UPDATE SET
                action_text = excluded.action_text,
                is_manual = 1,
                generated_on = excluded.generated_on
            "#,
        )
        .bind(format!("sug-{}", sqlx::types::Uuid::new_v4()))
        .bind(asin)
        .bind(action_text)
        .bind(generated_on.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_for_product(
        &self,
        asin: &str,
    ) -> Result<Option<SuggestedAction>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT asin, action_text, is_manual, generated_on
            FROM suggested_action
            WHERE asin = ?
            "#,
        )
        .bind(asin)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| suggestion_from_row(&r)).transpose()
    }
}

fn suggestion_from_row(row: &SqliteRow) -> Result<SuggestedAction, RepositoryError> {
    let generated_on: String = row.try_get("generated_on")?;

    Ok(SuggestedAction {
        asin: row.try_get("asin")?,
        action_text: row.try_get("action_text")?,
        is_manual: row.try_get("is_manual")?,
        generated_on: parse_timestamp("generated_on", generated_on)?,
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}
