#![allow(dead_code)]

use ab_core::{DocumentStore, ModerationService, ReplyStorage, ServiceConfig};
use ab_db_memory::MemoryDocumentStore;
use ab_db_sqlite::SqliteDocumentStore;
use std::sync::Arc;
use tempfile::TempDir;

/// One engine + reply layout combination under test.
pub struct Setup {
    pub label: String,
    pub store: Arc<dyn DocumentStore>,
    pub service: ModerationService,
    /// Keeps a file database alive for the lifetime of the setup.
    _dir: Option<TempDir>,
}

impl Setup {
    fn new(label: String, store: Arc<dyn DocumentStore>, reply_storage: ReplyStorage) -> Self {
        let config = ServiceConfig { reply_storage, ..ServiceConfig::default() };
        Self {
            label,
            service: ModerationService::new(Arc::clone(&store), config),
            store,
            _dir: None,
        }
    }
}

/// A WAL-mode SQLite database in a fresh temporary directory.
pub async fn sqlite_file() -> (SqliteDocumentStore, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite:{}", dir.path().join("anonboard.db").display());
    let store = SqliteDocumentStore::new(&url).await.expect("file sqlite");
    (store, dir)
}

/// Fresh, empty stores for every combination.
pub async fn setups() -> Vec<Setup> {
    let mut all = Vec::new();
    for reply_storage in [ReplyStorage::Embedded, ReplyStorage::Referenced] {
        all.push(Setup::new(
            format!("memory/{reply_storage:?}"),
            Arc::new(MemoryDocumentStore::new()),
            reply_storage,
        ));

        let sqlite = SqliteDocumentStore::new("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        all.push(Setup::new(format!("sqlite/{reply_storage:?}"), Arc::new(sqlite), reply_storage));

        let (file, dir) = sqlite_file().await;
        let mut setup = Setup::new(format!("sqlite-file/{reply_storage:?}"), Arc::new(file), reply_storage);
        setup._dir = Some(dir);
        all.push(setup);
    }
    all
}
