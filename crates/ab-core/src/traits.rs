//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be used by the binary.

use crate::document::{Document, Filter, Kind, Sort, Update};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Persistence contract: a key-addressable document store.
///
/// Each call is atomic on its own; nothing spans more than one document
/// except `find_or_create`, which is atomic on its key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists `fields` under a freshly assigned `_id` and returns that id.
    /// Any `_id` already present in `fields` is replaced.
    async fn create(&self, kind: Kind, fields: Document) -> anyhow::Result<Uuid>;

    async fn find_by_id(&self, kind: Kind, id: Uuid) -> anyhow::Result<Option<Document>>;

    async fn find_one(&self, kind: Kind, filter: Filter) -> anyhow::Result<Option<Document>>;

    async fn find_many(
        &self,
        kind: Kind,
        filter: Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>>;

    /// Applies every update to one document as a unit and returns the result,
    /// or `None` when no such document exists.
    async fn update(&self, kind: Kind, id: Uuid, updates: Vec<Update>) -> anyhow::Result<Option<Document>>;

    /// Returns `true` if a document was removed.
    async fn delete_by_id(&self, kind: Kind, id: Uuid) -> anyhow::Result<bool>;

    /// Returns the document whose `key` equals `value`, creating it from
    /// `defaults` (with `key` set) when none exists. Concurrent callers with
    /// the same key observe a single document.
    async fn find_or_create(
        &self,
        kind: Kind,
        key: String,
        value: Value,
        defaults: Document,
    ) -> anyhow::Result<Document>;
}
