//! PostgreSQL-backed document store using SQLx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::Document;
use crate::store::{merge_json, DocumentStore, MAX_BATCH_WRITES};

/// Database connection pool and operations.
///
/// Every collection lives in one `documents` table keyed by
/// `(collection, id)` with the body stored as JSONB.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(connection_string)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    /// Create the documents table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // NULL for anything that is not an RFC 3339 timestamp, so a bad
        // value never matches instead of failing the whole query
        sqlx::query(
            r#"
            CREATE OR REPLACE FUNCTION retention_timestamp(value TEXT)
            RETURNS TIMESTAMPTZ
            LANGUAGE plpgsql STABLE AS $$
            BEGIN
                IF value IS NULL OR value !~ '^\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$' THEN
                    RETURN NULL;
                END IF;
                RETURN value::timestamptz;
            EXCEPTION WHEN others THEN
                RETURN NULL;
            END;
            $$
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn find_older_than(
        &self,
        collection: &str,
        field: &str,
        cutoff: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let limit = limit.map(|l| l as i64);

        let rows = sqlx::query(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1
              AND jsonb_typeof(data -> $2) = 'string'
              AND retention_timestamp(data ->> $2) < $3
            LIMIT $4
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let docs = rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                data: row.get("data"),
            })
            .collect();

        Ok(docs)
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<usize> {
        if ids.len() > MAX_BATCH_WRITES {
            return Err(AppError::InvalidState(format!(
                "Batch of {} writes exceeds the limit of {}",
                ids.len(),
                MAX_BATCH_WRITES
            )));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = ANY($2)")
            .bind(collection)
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(ids.len())
    }

    async fn merge_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Value> = sqlx::query_scalar(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let merged = match existing {
            Some(mut current) => {
                merge_json(&mut current, data);
                current
            }
            None => data,
        };

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&merged)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let data: Option<Value> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(data.map(|data| Document::new(id, data)))
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT id FROM documents WHERE collection = $1 ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
