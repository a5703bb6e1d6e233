//! In-process gateway
//!
//! Mirrors the PostgreSQL gateway's ordering rules (jsonb ordering of the order
//! key, id as tie-breaker) so paging behaves the same against both. Supports
//! injected failures and artificial latency for exercising error and
//! latest-wins paths.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{lookup, BackendGateway, Collection, Document, OrderBy};
use crate::error::{GatewayError, GatewayResult};

/// Gateway operation, used to target injected failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    GetDocument,
    SetDocument,
    DeleteDocument,
    SearchByField,
}

#[derive(Debug)]
struct FailureRule {
    operation: Operation,
    collection: String,
    remaining: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, BTreeMap<String, Value>>,
    failures: Vec<FailureRule>,
    calls: HashMap<Operation, usize>,
    latency: Duration,
}

impl MemoryState {
    fn record_call(&mut self, operation: Operation, collection: &str) -> GatewayResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;

        if let Some(rule) = self
            .failures
            .iter_mut()
            .find(|r| r.operation == operation && r.collection == collection && r.remaining > 0)
        {
            rule.remaining -= 1;
            return Err(GatewayError::Unavailable(format!(
                "injected {:?} failure on {}",
                operation, collection
            )));
        }

        Ok(())
    }
}

/// Thread-safe in-memory document store; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without going through failure injection or counters
    pub async fn insert(&self, collection: &Collection, document_id: &str, data: Value) {
        let mut state = self.state.write().await;
        state
            .collections
            .entry(collection.path())
            .or_default()
            .insert(document_id.to_string(), data);
    }

    pub async fn document(&self, collection: &Collection, document_id: &str) -> Option<Value> {
        let state = self.state.read().await;
        state
            .collections
            .get(&collection.path())
            .and_then(|docs| docs.get(document_id))
            .cloned()
    }

    pub async fn contains(&self, collection: &Collection, document_id: &str) -> bool {
        self.document(collection, document_id).await.is_some()
    }

    pub async fn len(&self, collection: &Collection) -> usize {
        let state = self.state.read().await;
        state
            .collections
            .get(&collection.path())
            .map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self, collection: &Collection) -> bool {
        self.len(collection).await == 0
    }

    /// Fail the next `times` calls of `operation` against `collection`
    pub async fn fail_on(&self, operation: Operation, collection: &Collection, times: usize) {
        let mut state = self.state.write().await;
        state.failures.push(FailureRule {
            operation,
            collection: collection.path(),
            remaining: times,
        });
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    /// Delay applied before every gateway call completes
    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = latency;
    }

    pub async fn calls(&self, operation: Operation) -> usize {
        let state = self.state.read().await;
        state.calls.get(&operation).copied().unwrap_or(0)
    }

    async fn wait(&self) {
        let latency = self.state.read().await.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values following PostgreSQL's jsonb btree ordering
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| {
                x.iter()
                    .zip(y.iter())
                    .map(|(l, r)| compare_values(l, r))
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            }),
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn order_key(data: &Value, order_by: &OrderBy) -> Value {
    lookup(data, &order_by.field).cloned().unwrap_or(Value::Null)
}

#[async_trait]
impl BackendGateway for MemoryGateway {
    async fn query(
        &self,
        collection: &Collection,
        order_by: &OrderBy,
        limit: usize,
        start_after: Option<&Document>,
    ) -> GatewayResult<Vec<Document>> {
        self.wait().await;
        let path = collection.path();
        let mut state = self.state.write().await;
        state.record_call(Operation::Query, &path)?;

        let directed = |ord: Ordering| if order_by.descending { ord.reverse() } else { ord };

        let mut rows: Vec<(Value, Document)> = state
            .collections
            .get(&path)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| (order_key(data, order_by), Document::new(id.clone(), data.clone())))
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|(ka, a), (kb, b)| directed(compare_values(ka, kb).then_with(|| a.id.cmp(&b.id))));

        let start = start_after.map(|doc| (order_key(&doc.data, order_by), doc.id.clone()));

        let page = rows
            .into_iter()
            .filter(|(key, doc)| match &start {
                None => true,
                Some((start_key, start_id)) => {
                    directed(compare_values(key, start_key).then_with(|| doc.id.cmp(start_id)))
                        == Ordering::Greater
                }
            })
            .take(limit)
            .map(|(_, doc)| doc)
            .collect();

        Ok(page)
    }

    async fn get_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> GatewayResult<Option<Document>> {
        self.wait().await;
        let path = collection.path();
        let mut state = self.state.write().await;
        state.record_call(Operation::GetDocument, &path)?;

        Ok(state
            .collections
            .get(&path)
            .and_then(|docs| docs.get(document_id))
            .map(|data| Document::new(document_id, data.clone())))
    }

    async fn set_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
    ) -> GatewayResult<()> {
        self.wait().await;
        let path = collection.path();
        let mut state = self.state.write().await;
        state.record_call(Operation::SetDocument, &path)?;

        state
            .collections
            .entry(path)
            .or_default()
            .insert(document_id.to_string(), data);
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> GatewayResult<()> {
        self.wait().await;
        let path = collection.path();
        let mut state = self.state.write().await;
        state.record_call(Operation::DeleteDocument, &path)?;

        if let Some(docs) = state.collections.get_mut(&path) {
            docs.remove(document_id);
        }
        Ok(())
    }

    async fn search_by_field(
        &self,
        collection: &Collection,
        field: &str,
        value: &Value,
    ) -> GatewayResult<Vec<Document>> {
        self.wait().await;
        let path = collection.path();
        let mut state = self.state.write().await;
        state.record_call(Operation::SearchByField, &path)?;

        Ok(state
            .collections
            .get(&path)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| lookup(data, field) == Some(value))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> MemoryGateway {
        let gateway = MemoryGateway::new();
        for (id, date) in [("a", 3.0), ("b", 1.0), ("c", 2.0), ("d", 2.0)] {
            gateway
                .insert(&Collection::Users, id, json!({ "id": id, "createdDate": date }))
                .await;
        }
        gateway
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_compare_values_follows_jsonb_type_order() {
        assert_eq!(compare_values(&json!(null), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!("z"), &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
    }

    #[tokio::test]
    async fn test_query_orders_with_id_tie_breaker() {
        let gateway = seeded().await;
        let order = OrderBy::new("createdDate", true);

        let docs = gateway.query(&Collection::Users, &order, 10, None).await.unwrap();
        assert_eq!(ids(&docs), vec!["a", "d", "c", "b"]);

        let asc = OrderBy::new("createdDate", false);
        let docs = gateway.query(&Collection::Users, &asc, 10, None).await.unwrap();
        assert_eq!(ids(&docs), vec!["b", "c", "d", "a"]);
    }

    #[tokio::test]
    async fn test_query_start_after_is_exclusive() {
        let gateway = seeded().await;
        let order = OrderBy::new("createdDate", true);

        let first = gateway.query(&Collection::Users, &order, 2, None).await.unwrap();
        assert_eq!(ids(&first), vec!["a", "d"]);

        let second = gateway
            .query(&Collection::Users, &order, 2, first.last())
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["c", "b"]);

        let third = gateway
            .query(&Collection::Users, &order, 2, second.last())
            .await
            .unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let gateway = seeded().await;
        gateway.fail_on(Operation::DeleteDocument, &Collection::Users, 1).await;

        assert!(gateway.delete_document(&Collection::Users, "a").await.is_err());
        assert!(gateway.delete_document(&Collection::Users, "a").await.is_ok());
        assert!(!gateway.contains(&Collection::Users, "a").await);
        assert_eq!(gateway.calls(Operation::DeleteDocument).await, 2);
    }

    #[tokio::test]
    async fn test_delete_missing_document_is_noop() {
        let gateway = MemoryGateway::new();
        gateway.delete_document(&Collection::Stop, "ghost").await.unwrap();
        assert!(gateway.is_empty(&Collection::Stop).await);

        gateway.insert(&Collection::Stop, "u1", json!({})).await;
        assert!(!gateway.is_empty(&Collection::Stop).await);
        assert_eq!(gateway.len(&Collection::Stop).await, 1);
    }

    #[tokio::test]
    async fn test_search_by_nested_field() {
        let gateway = MemoryGateway::new();
        gateway
            .insert(&Collection::Stop, "u1", json!({ "user": { "nickName": "mina" } }))
            .await;
        gateway
            .insert(&Collection::Stop, "u2", json!({ "user": { "nickName": "jun" } }))
            .await;

        let docs = gateway
            .search_by_field(&Collection::Stop, "user.nickName", &json!("jun"))
            .await
            .unwrap();
        assert_eq!(ids(&docs), vec!["u2"]);
    }
}
