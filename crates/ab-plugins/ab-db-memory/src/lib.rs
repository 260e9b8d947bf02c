//! # ab-db-memory
//!
//! In-process implementation of `DocumentStore`, used for development and tests.
//! Each kind is one `DashMap` entry, so every operation holds that
//! collection's shard lock for its whole duration and is atomic.

use ab_core::document::{apply_all, document_id, id_value, Document, Filter, Kind, Sort, Update, ID_FIELD};
use ab_core::traits::DocumentStore;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryDocumentStore {
    /// Documents per kind, keyed (and so ordered) by their v7 id.
    collections: DashMap<Kind, BTreeMap<Uuid, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents of one kind.
    pub fn count(&self, kind: Kind) -> usize {
        self.collections.get(&kind).map(|c| c.len()).unwrap_or(0)
    }

    /// Stores `doc` as-is, keeping whatever `_id` it carries. Meant for
    /// seeding fixtures that are inconsistent on purpose.
    pub fn insert_raw(&self, kind: Kind, doc: Document) -> anyhow::Result<Uuid> {
        let id = document_id(&doc).ok_or_else(|| anyhow::anyhow!("{kind} document has no valid _id"))?;
        self.collections.entry(kind).or_default().insert(id, doc);
        Ok(id)
    }
}

fn assign_id(mut fields: Document) -> (Uuid, Document) {
    let id = Uuid::now_v7();
    fields.insert(ID_FIELD.to_string(), id_value(id));
    (id, fields)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, kind: Kind, fields: Document) -> anyhow::Result<Uuid> {
        let (id, doc) = assign_id(fields);
        self.collections.entry(kind).or_default().insert(id, doc);
        trace!(%kind, %id, "created");
        Ok(id)
    }

    async fn find_by_id(&self, kind: Kind, id: Uuid) -> anyhow::Result<Option<Document>> {
        Ok(self.collections.get(&kind).and_then(|c| c.get(&id).cloned()))
    }

    async fn find_one(&self, kind: Kind, filter: Filter) -> anyhow::Result<Option<Document>> {
        Ok(self
            .collections
            .get(&kind)
            .and_then(|c| c.values().find(|doc| filter.matches(doc)).cloned()))
    }

    async fn find_many(
        &self,
        kind: Kind,
        filter: Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>> {
        let mut docs: Vec<Document> = match self.collections.get(&kind) {
            Some(c) => c.values().filter(|doc| filter.matches(doc)).cloned().collect(),
            None => return Ok(Vec::new()),
        };
        if let Some(sort) = sort {
            docs.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn update(&self, kind: Kind, id: Uuid, updates: Vec<Update>) -> anyhow::Result<Option<Document>> {
        let Some(mut collection) = self.collections.get_mut(&kind) else {
            return Ok(None);
        };
        let Some(doc) = collection.get_mut(&id) else {
            return Ok(None);
        };
        let next = apply_all(doc, &updates)?;
        *doc = next.clone();
        Ok(Some(next))
    }

    async fn delete_by_id(&self, kind: Kind, id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .collections
            .get_mut(&kind)
            .is_some_and(|mut c| c.remove(&id).is_some()))
    }

    async fn find_or_create(
        &self,
        kind: Kind,
        key: String,
        value: Value,
        defaults: Document,
    ) -> anyhow::Result<Document> {
        let mut collection = self.collections.entry(kind).or_default();
        let filter = Filter::Eq(key.clone(), value.clone());
        if let Some(existing) = collection.values().find(|doc| filter.matches(doc)) {
            return Ok(existing.clone());
        }

        let mut fields = defaults;
        fields.insert(key, value);
        let (id, doc) = assign_id(fields);
        collection.insert(id, doc.clone());
        trace!(%kind, %id, "created on lookup");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn fields(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_assigns_fresh_id() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create(Kind::Thread, fields(json!({ "_id": "spoofed", "text": "hi" })))
            .await
            .unwrap();

        let doc = store.find_by_id(Kind::Thread, id).await.unwrap().unwrap();
        assert_eq!(doc[ID_FIELD], json!(id.to_string()));
        assert_eq!(doc["text"], json!("hi"));
        assert!(store.find_by_id(Kind::Reply, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_many_filters_sorts_and_limits() {
        let store = MemoryDocumentStore::new();
        for (text, bumped) in [("a", "2024-01-01"), ("b", "2024-03-01"), ("c", "2024-02-01")] {
            store
                .create(Kind::Thread, fields(json!({ "text": text, "bumped_on": bumped })))
                .await
                .unwrap();
        }

        let docs = store
            .find_many(Kind::Thread, Filter::All, Some(Sort::desc("bumped_on")), Some(2))
            .await
            .unwrap();
        let texts: Vec<_> = docs.iter().map(|d| d["text"].as_str().unwrap()).collect();
        assert_eq!(texts, ["b", "c"]);
    }

    #[tokio::test]
    async fn update_missing_document_is_none() {
        let store = MemoryDocumentStore::new();
        let result = store
            .update(Kind::Thread, Uuid::now_v7(), vec![Update::set("reported", true)])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn failed_update_keeps_document() {
        let store = MemoryDocumentStore::new();
        let id = store.create(Kind::Board, fields(json!({ "name": "b" }))).await.unwrap();

        let result = store
            .update(Kind::Board, id, vec![Update::set("name", "c"), Update::push("name", "x")])
            .await;
        assert!(result.is_err());

        let doc = store.find_by_id(Kind::Board, id).await.unwrap().unwrap();
        assert_eq!(doc["name"], json!("b"));
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let store = MemoryDocumentStore::new();
        let id = store.create(Kind::Reply, Document::new()).await.unwrap();
        assert!(store.delete_by_id(Kind::Reply, id).await.unwrap());
        assert!(!store.delete_by_id(Kind::Reply, id).await.unwrap());
        assert_eq!(store.count(Kind::Reply), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_find_or_create_yields_one_document() {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .find_or_create(Kind::Board, "name".into(), json!("test"), fields(json!({ "threads": [] })))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap()[ID_FIELD].clone());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.count(Kind::Board), 1);
    }
}
