//! Backend gateway seam
//!
//! The core never talks to a concrete backend. Everything it needs is the
//! document-store contract below: ordered forward-only queries, point reads,
//! upserts, idempotent deletes and exact-match field search.
//!
//! ```text
//! Session → Paginator / BucketFetcher / ModerationExecutor → BackendGateway
//!                                                               ├── PgGateway (documents table)
//!                                                               └── MemoryGateway (in-process)
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GatewayResult, RecordsError, Result, TransferError, WriteStep};

mod memory;
mod postgres;

pub use memory::{MemoryGateway, Operation};
pub use postgres::PgGateway;

/// Addressable collections of the moderation backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Active users
    Users,
    /// Suspended users
    Stop,
    /// Unsubscribed users
    Unsubscribe,
    /// Like/dislike/matching buckets, one document per user
    Likes,
    /// Payment buckets, one document per user
    Payment,
    /// `users/{owner}/report`
    Report { owner: String },
    /// `users/{owner}/block`
    Block { owner: String },
}

impl Collection {
    pub fn path(&self) -> String {
        match self {
            Collection::Users => "users".to_string(),
            Collection::Stop => "stop".to_string(),
            Collection::Unsubscribe => "unsubscribe".to_string(),
            Collection::Likes => "likes".to_string(),
            Collection::Payment => "payment".to_string(),
            Collection::Report { owner } => format!("users/{}/report", owner),
            Collection::Block { owner } => format!("users/{}/block", owner),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Ordering key of a query: a dot-separated field path plus direction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
        }
    }

    pub fn field_path(&self) -> Vec<String> {
        split_path(&self.field)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.descending { "desc" } else { "asc" };
        write!(f, "{} {}", self.field, direction)
    }
}

pub(crate) fn split_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

/// Resolve a dot-separated field path inside a JSON document
pub(crate) fn lookup<'a>(data: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(data, |current, segment| current.get(segment))
}

/// A stored document: identity plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup(&self.data, path)
    }

    /// Deserialize the body, reporting the document's location on failure
    pub fn decode<T: DeserializeOwned>(&self, collection: &Collection) -> Result<T> {
        T::deserialize(&self.data).map_err(|source| RecordsError::Decode {
            collection: collection.path(),
            document_id: self.id.clone(),
            source,
        })
    }
}

/// Order in which the two halves of a [`DocumentMove`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOrder {
    /// Write destination first, then delete the source
    WriteThenDelete,
    /// Delete the source first, then write destination
    DeleteThenWrite,
}

/// Move of one document between collections under the same id
#[derive(Debug, Clone)]
pub struct DocumentMove {
    pub document_id: String,
    pub source: Collection,
    pub destination: Collection,
    pub data: Value,
    pub order: TransferOrder,
}

/// Document-store contract consumed by the core
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Ordered forward-only query; `start_after` excludes everything up to and
    /// including that document in `order_by` order.
    async fn query(
        &self,
        collection: &Collection,
        order_by: &OrderBy,
        limit: usize,
        start_after: Option<&Document>,
    ) -> GatewayResult<Vec<Document>>;

    async fn get_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> GatewayResult<Option<Document>>;

    /// Upsert
    async fn set_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
    ) -> GatewayResult<()>;

    /// Deleting an absent document succeeds
    async fn delete_document(&self, collection: &Collection, document_id: &str)
        -> GatewayResult<()>;

    /// Exact-match search on a field path
    async fn search_by_field(
        &self,
        collection: &Collection,
        field: &str,
        value: &Value,
    ) -> GatewayResult<Vec<Document>>;

    /// Move a document between collections.
    ///
    /// The default runs two independent calls in the requested order and stops at
    /// the first failure without undoing the completed step. Backends with
    /// transactions should override this to make the move atomic.
    async fn transfer(&self, document_move: DocumentMove) -> std::result::Result<(), TransferError> {
        let DocumentMove {
            document_id,
            source,
            destination,
            data,
            order,
        } = document_move;

        match order {
            TransferOrder::WriteThenDelete => {
                self.set_document(&destination, &document_id, data)
                    .await
                    .map_err(|err| TransferError {
                        step: WriteStep::Set,
                        collection: destination.clone(),
                        source: err,
                    })?;
                self.delete_document(&source, &document_id)
                    .await
                    .map_err(|err| TransferError {
                        step: WriteStep::Delete,
                        collection: source.clone(),
                        source: err,
                    })?;
            }
            TransferOrder::DeleteThenWrite => {
                self.delete_document(&source, &document_id)
                    .await
                    .map_err(|err| TransferError {
                        step: WriteStep::Delete,
                        collection: source.clone(),
                        source: err,
                    })?;
                self.set_document(&destination, &document_id, data)
                    .await
                    .map_err(|err| TransferError {
                        step: WriteStep::Set,
                        collection: destination.clone(),
                        source: err,
                    })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_paths() {
        assert_eq!(Collection::Users.path(), "users");
        assert_eq!(Collection::Unsubscribe.path(), "unsubscribe");
        assert_eq!(
            Collection::Report {
                owner: "u1".to_string()
            }
            .path(),
            "users/u1/report"
        );
        assert_eq!(
            Collection::Block {
                owner: "u1".to_string()
            }
            .to_string(),
            "users/u1/block"
        );
    }

    #[test]
    fn test_lookup_nested_field() {
        let data = json!({ "user": { "nickName": "mina" }, "createdDate": 10.0 });

        assert_eq!(lookup(&data, "user.nickName"), Some(&json!("mina")));
        assert_eq!(lookup(&data, "createdDate"), Some(&json!(10.0)));
        assert_eq!(lookup(&data, "user.birth"), None);
    }

    #[test]
    fn test_decode_reports_location() {
        let doc = Document::new("u9", json!({ "id": 5 }));
        let err = doc
            .decode::<std::collections::HashMap<String, String>>(&Collection::Stop)
            .unwrap_err();

        assert!(err.to_string().starts_with("Malformed document stop/u9"));
    }
}
