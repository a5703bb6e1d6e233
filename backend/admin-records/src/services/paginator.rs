//! Cursor pagination over ordered collection queries

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RecordsError, Result};
use crate::gateway::{BackendGateway, Collection, Document, OrderBy};

/// Exclusive-start position in one ordered query.
///
/// Only valid for the (collection, order) pair it was created for.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    collection: Collection,
    order_by: OrderBy,
    last_seen: Option<Document>,
}

impl Cursor {
    /// Cursor positioned before the first document
    pub fn start(collection: Collection, order_by: OrderBy) -> Self {
        Self {
            collection,
            order_by,
            last_seen: None,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn order_by(&self) -> &OrderBy {
        &self.order_by
    }

    pub fn last_seen(&self) -> Option<&Document> {
        self.last_seen.as_ref()
    }

    pub fn is_for(&self, collection: &Collection, order_by: &OrderBy) -> bool {
        &self.collection == collection && &self.order_by == order_by
    }

    fn advanced_to(&self, last: Document) -> Self {
        Self {
            collection: self.collection.clone(),
            order_by: self.order_by.clone(),
            last_seen: Some(last),
        }
    }
}

/// One fetched page. When `exhausted` is set, `items` is empty and `cursor`
/// is unchanged.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Cursor,
    pub exhausted: bool,
}

impl<T> Page<T> {
    fn exhausted(cursor: &Cursor) -> Self {
        Self {
            items: Vec::new(),
            cursor: cursor.clone(),
            exhausted: true,
        }
    }
}

#[derive(Clone)]
pub struct CursorPaginator {
    gateway: Arc<dyn BackendGateway>,
}

impl CursorPaginator {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch up to `page_size` items strictly after `cursor`.
    ///
    /// Decoding happens for the whole page before anything is returned, so a
    /// failure leaves the caller's state untouched.
    pub async fn next_page<T, F>(
        &self,
        collection: &Collection,
        order_by: &OrderBy,
        page_size: usize,
        cursor: &Cursor,
        decode: F,
    ) -> Result<Page<T>>
    where
        F: Fn(&Document) -> Result<T>,
    {
        if page_size == 0 {
            return Err(RecordsError::InvalidInput(
                "page size must be greater than zero".to_string(),
            ));
        }

        if !cursor.is_for(collection, order_by) {
            return Err(RecordsError::CursorMismatch {
                expected: format!("{} ({})", cursor.collection, cursor.order_by),
                actual: format!("{} ({})", collection, order_by),
            });
        }

        let documents = self
            .gateway
            .query(collection, order_by, page_size, cursor.last_seen())
            .await
            .map_err(|e| RecordsError::fetch(collection, e))?;

        let last = match documents.last() {
            None => {
                debug!(collection = %collection, "Page exhausted: no documents after cursor");
                return Ok(Page::exhausted(cursor));
            }
            Some(last) => last,
        };

        // A backend that repeats the tail page must not advance the cursor
        if cursor.last_seen().map(|seen| seen.id.as_str()) == Some(last.id.as_str()) {
            debug!(
                collection = %collection,
                document_id = %last.id,
                "Page exhausted: tail page repeated"
            );
            return Ok(Page::exhausted(cursor));
        }

        let items = documents.iter().map(&decode).collect::<Result<Vec<T>>>()?;
        let next_cursor = cursor.advanced_to(last.clone());

        debug!(
            collection = %collection,
            order_by = %order_by,
            items = items.len(),
            "Fetched page"
        );

        Ok(Page {
            items,
            cursor: next_cursor,
            exhausted: false,
        })
    }

    /// [`next_page`](Self::next_page) for documents that deserialize directly into `T`
    pub async fn next_page_as<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        order_by: &OrderBy,
        page_size: usize,
        cursor: &Cursor,
    ) -> Result<Page<T>> {
        self.next_page(collection, order_by, page_size, cursor, |doc| doc.decode(collection))
            .await
    }
}
