//! PostgreSQL-backed gateway over the `documents` table

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{split_path, BackendGateway, Collection, Document, DocumentMove, OrderBy, TransferOrder};
use crate::error::{GatewayError, GatewayResult, TransferError, WriteStep};

const UPSERT_DOCUMENT: &str = r#"
    INSERT INTO documents (collection, id, data, updated_at)
    VALUES ($1, $2, $3, NOW())
    ON CONFLICT (collection, id)
    DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
"#;

const DELETE_DOCUMENT: &str = "DELETE FROM documents WHERE collection = $1 AND id = $2";

/// Document store on a single JSONB table keyed by (collection, id)
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_document(row: PgRow) -> GatewayResult<Document> {
    Ok(Document {
        id: row.try_get("id")?,
        data: row.try_get("data")?,
    })
}

#[async_trait]
impl BackendGateway for PgGateway {
    async fn query(
        &self,
        collection: &Collection,
        order_by: &OrderBy,
        limit: usize,
        start_after: Option<&Document>,
    ) -> GatewayResult<Vec<Document>> {
        let direction = if order_by.descending { "DESC" } else { "ASC" };
        let comparator = if order_by.descending { "<" } else { ">" };
        let path = order_by.field_path();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = match start_after {
            None => {
                let sql = format!(
                    r#"
                    SELECT id, data FROM documents
                    WHERE collection = $1
                    ORDER BY COALESCE(data #> $2::text[], 'null'::jsonb) {direction}, id {direction}
                    LIMIT $3
                    "#
                );
                sqlx::query(&sql)
                    .bind(collection.path())
                    .bind(&path)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(last) => {
                let last_key = last.field(&order_by.field).cloned().unwrap_or(Value::Null);
                let sql = format!(
                    r#"
                    SELECT id, data FROM documents
                    WHERE collection = $1
                      AND (COALESCE(data #> $2::text[], 'null'::jsonb), id) {comparator} ($3::jsonb, $4)
                    ORDER BY COALESCE(data #> $2::text[], 'null'::jsonb) {direction}, id {direction}
                    LIMIT $5
                    "#
                );
                sqlx::query(&sql)
                    .bind(collection.path())
                    .bind(&path)
                    .bind(last_key)
                    .bind(&last.id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        debug!(
            collection = %collection,
            order_by = %order_by,
            rows = rows.len(),
            "Document query completed"
        );

        rows.into_iter().map(to_document).collect()
    }

    async fn get_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> GatewayResult<Option<Document>> {
        let row = sqlx::query("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.path())
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(to_document).transpose()
    }

    async fn set_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
    ) -> GatewayResult<()> {
        sqlx::query(UPSERT_DOCUMENT)
            .bind(collection.path())
            .bind(document_id)
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> GatewayResult<()> {
        sqlx::query(DELETE_DOCUMENT)
            .bind(collection.path())
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search_by_field(
        &self,
        collection: &Collection,
        field: &str,
        value: &Value,
    ) -> GatewayResult<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, data FROM documents
            WHERE collection = $1 AND data #> $2::text[] = $3::jsonb
            ORDER BY id
            "#,
        )
        .bind(collection.path())
        .bind(split_path(field))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(to_document).collect()
    }

    /// Both halves run in one transaction, so the move is all-or-nothing.
    async fn transfer(&self, document_move: DocumentMove) -> Result<(), TransferError> {
        let DocumentMove {
            document_id,
            source,
            destination,
            data,
            order,
        } = document_move;

        let (first_step, first_collection) = match order {
            TransferOrder::WriteThenDelete => (WriteStep::Set, &destination),
            TransferOrder::DeleteThenWrite => (WriteStep::Delete, &source),
        };
        let failed = |step: WriteStep, collection: &Collection, err: sqlx::Error| TransferError {
            step,
            collection: collection.clone(),
            source: GatewayError::Database(err),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| failed(first_step, first_collection, e))?;

        let set = sqlx::query(UPSERT_DOCUMENT)
            .bind(destination.path())
            .bind(&document_id)
            .bind(data);
        let delete = sqlx::query(DELETE_DOCUMENT)
            .bind(source.path())
            .bind(&document_id);

        match order {
            TransferOrder::WriteThenDelete => {
                set.execute(&mut *tx)
                    .await
                    .map_err(|e| failed(WriteStep::Set, &destination, e))?;
                delete
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| failed(WriteStep::Delete, &source, e))?;
            }
            TransferOrder::DeleteThenWrite => {
                delete
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| failed(WriteStep::Delete, &source, e))?;
                set.execute(&mut *tx)
                    .await
                    .map_err(|e| failed(WriteStep::Set, &destination, e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| failed(first_step, first_collection, e))?;

        debug!(
            document_id = %document_id,
            from = %source,
            to = %destination,
            "Document moved atomically"
        );

        Ok(())
    }
}
