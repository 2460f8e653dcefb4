use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;

use super::document::{Document, CREATED_AT_FIELD, ID_FIELD};
use super::query_builder::{bind_params, QueryBuilder};
use super::store::{validate_collection, DocumentStore, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::{Filter, FindQuery};

/// PostgreSQL-backed store keeping every collection in one JSONB table
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!("Connected document store (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                doc JSONB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let value: Value = row.try_get("doc")?;
    Document::from_value(value).ok_or_else(|| StoreError::Corrupt("doc column".to_string()))
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let sql = QueryBuilder::new(collection)?.select(query)?;
        tracing::debug!("find {}: {}", collection, sql.query);
        let rows = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row_to_document(row).map(|d| d.project(&query.select)))
            .collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let sql = QueryBuilder::new(collection)?.count(filter)?;
        let row = bind_params(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        let row = sqlx::query("SELECT doc FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        validate_collection(collection)?;
        let doc = doc.stamp();
        let id = doc
            .id()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Corrupt("document id is not a string".to_string()))?;
        let row = sqlx::query(
            "INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3) RETURNING doc",
        )
        .bind(collection)
        .bind(&id)
        .bind(doc.into_value())
        .fetch_one(&self.pool)
        .await?;
        row_to_document(&row)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        mut patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        patch.remove(ID_FIELD);
        patch.remove(CREATED_AT_FIELD);
        let row = sqlx::query(
            "UPDATE documents SET doc = doc || $3::jsonb WHERE collection = $1 AND id = $2 RETURNING doc",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        validate_collection(collection)?;
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let sql = QueryBuilder::new(collection)?.delete(filter)?;
        let result = bind_params(sqlx::query(&sql.query), &sql.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
