//! # Board model
//!
//! Reads and writes boards, threads and replies through a [`DocumentStore`].
//! Callers never learn whether replies are embedded in their thread or stored
//! on their own; both layouts are read transparently and new replies follow
//! the configured [`ReplyStorage`].

use crate::document::{Document, Filter, Kind, Sort, Update, ID_FIELD};
use crate::error::{AppError, Result};
use crate::models::{timestamp, Board, Reply, ReplyEntry, ReplyStorage, Thread, ThreadRecord, DELETED_TEXT};
use crate::traits::DocumentStore;
use crate::views::{ThreadPreview, ThreadView};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct BoardModel {
    store: Arc<dyn DocumentStore>,
    reply_storage: ReplyStorage,
}

impl BoardModel {
    pub fn new(store: Arc<dyn DocumentStore>, reply_storage: ReplyStorage) -> Self {
        Self { store, reply_storage }
    }

    pub fn reply_storage(&self) -> ReplyStorage {
        self.reply_storage
    }

    // Board Operations

    /// Returns the board called `name`, creating an empty one if needed.
    pub async fn get_or_create_board(&self, name: &str) -> Result<Board> {
        let defaults = object(json!({ "threads": [] }));
        let doc = self
            .store
            .find_or_create(Kind::Board, "name".to_string(), Value::from(name), defaults)
            .await?;
        decode(Kind::Board, doc)
    }

    pub async fn find_board(&self, name: &str) -> Result<Option<Board>> {
        self.store
            .find_one(Kind::Board, Filter::eq("name", name))
            .await?
            .map(|doc| decode(Kind::Board, doc))
            .transpose()
    }

    pub async fn attach_thread(&self, board: &Board, thread_id: Uuid) -> Result<()> {
        let updated = self
            .store
            .update(Kind::Board, board.id, vec![Update::push("threads", thread_id.to_string())])
            .await?;
        if updated.is_none() {
            warn!(board = %board.name, %thread_id, "board vanished before thread could be attached");
        }
        Ok(())
    }

    /// Pulls `thread_id` from every board that references it.
    pub async fn detach_thread(&self, thread_id: Uuid) -> Result<usize> {
        let owners = self
            .store
            .find_many(Kind::Board, Filter::contains("threads", thread_id.to_string()), None, None)
            .await?;
        let mut detached = 0;
        for doc in owners {
            let board: Board = decode(Kind::Board, doc)?;
            let pulled = self
                .store
                .update(Kind::Board, board.id, vec![Update::pull("threads", thread_id.to_string())])
                .await?;
            if pulled.is_some() {
                detached += 1;
            }
        }
        Ok(detached)
    }

    /// The `thread_limit` most recently bumped threads of a board, each with
    /// its `reply_limit` newest replies.
    pub async fn list_recent_threads(
        &self,
        board_name: &str,
        thread_limit: usize,
        reply_limit: usize,
    ) -> Result<Vec<ThreadPreview>> {
        let board = self
            .find_board(board_name)
            .await?
            .ok_or_else(|| AppError::not_found(Kind::Board, board_name))?;
        if board.threads.is_empty() || thread_limit == 0 {
            return Ok(Vec::new());
        }

        let referenced = board.threads.len();
        let docs = self
            .store
            .find_many(
                Kind::Thread,
                Filter::ids(board.threads),
                Some(Sort::desc("bumped_on")),
                Some(thread_limit),
            )
            .await?;
        if docs.len() < referenced.min(thread_limit) {
            debug!(board = board_name, referenced, found = docs.len(), "skipping dangling thread references");
        }

        let mut previews = Vec::with_capacity(docs.len());
        for doc in docs {
            let thread = self.resolve(decode(Kind::Thread, doc)?).await?;
            previews.push(ThreadPreview::new(&thread, reply_limit));
        }
        Ok(previews)
    }

    // Thread Operations

    pub async fn view_thread(&self, thread_id: Uuid) -> Result<ThreadView> {
        let thread = self
            .load_thread(thread_id)
            .await?
            .ok_or_else(|| AppError::not_found(Kind::Thread, thread_id))?;
        Ok(ThreadView::from(&thread))
    }

    /// The stored thread with its replies resolved, oldest first.
    pub async fn load_thread(&self, thread_id: Uuid) -> Result<Option<Thread>> {
        match self.thread_record(thread_id).await? {
            Some(record) => Ok(Some(self.resolve(record).await?)),
            None => Ok(None),
        }
    }

    /// The stored thread without resolving reply references.
    pub async fn thread_record(&self, thread_id: Uuid) -> Result<Option<ThreadRecord>> {
        self.store
            .find_by_id(Kind::Thread, thread_id)
            .await?
            .map(|doc| decode(Kind::Thread, doc))
            .transpose()
    }

    pub async fn insert_thread(&self, text: &str, delete_password: &str, now: DateTime<Utc>) -> Result<Thread> {
        let fields = object(json!({
            "text": text,
            "delete_password": delete_password,
            "reported": false,
            "created_on": timestamp::to_value(&now),
            "bumped_on": timestamp::to_value(&now),
            "replies": [],
        }));
        let id = self.store.create(Kind::Thread, fields).await?;
        Ok(Thread {
            id,
            text: text.to_string(),
            delete_password: delete_password.to_string(),
            reported: false,
            created_on: now,
            bumped_on: now,
            replies: Vec::new(),
        })
    }

    pub async fn mark_thread_reported(&self, thread_id: Uuid) -> Result<bool> {
        let updated = self
            .store
            .update(Kind::Thread, thread_id, vec![Update::set("reported", true)])
            .await?;
        Ok(updated.is_some())
    }

    /// Hard delete. Replies stored on their own are left in place.
    pub async fn remove_thread(&self, thread_id: Uuid) -> Result<bool> {
        Ok(self.store.delete_by_id(Kind::Thread, thread_id).await?)
    }

    // Reply Operations

    /// Attaches `reply` to a thread and bumps the thread to the reply's
    /// creation time. Returns `None` if the thread does not exist.
    pub async fn insert_reply(&self, thread_id: Uuid, mut reply: Reply) -> Result<Option<Thread>> {
        let bump = Update::set("bumped_on", timestamp::to_value(&reply.created_on));
        let updated = match self.reply_storage {
            ReplyStorage::Embedded => {
                let entry = encode(Kind::Reply, &reply)?;
                self.store
                    .update(Kind::Thread, thread_id, vec![Update::push("replies", Value::Object(entry)), bump])
                    .await?
            }
            ReplyStorage::Referenced => {
                if self.store.find_by_id(Kind::Thread, thread_id).await?.is_none() {
                    return Ok(None);
                }
                let mut fields = encode(Kind::Reply, &reply)?;
                fields.remove(ID_FIELD);
                reply.id = self.store.create(Kind::Reply, fields).await?;

                let updated = self
                    .store
                    .update(Kind::Thread, thread_id, vec![Update::push("replies", reply.id.to_string()), bump])
                    .await?;
                if updated.is_none() {
                    warn!(%thread_id, reply_id = %reply.id, "thread removed while replying; dropping orphan reply");
                    self.store.delete_by_id(Kind::Reply, reply.id).await?;
                }
                updated
            }
        };

        match updated {
            Some(doc) => Ok(Some(self.resolve(decode(Kind::Thread, doc)?).await?)),
            None => Ok(None),
        }
    }

    /// Replaces a reply's text with the tombstone and bumps its thread.
    /// Returns `false` if the thread or the reply does not exist.
    pub async fn tombstone_reply(&self, thread_id: Uuid, reply_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let Some(record) = self.thread_record(thread_id).await? else {
            return Ok(false);
        };
        let bump = Update::set("bumped_on", timestamp::to_value(&now));

        match record.replies.iter().find(|entry| entry.id() == reply_id) {
            None => Ok(false),
            Some(ReplyEntry::Embedded(_)) => {
                let updated = self
                    .store
                    .update(
                        Kind::Thread,
                        thread_id,
                        vec![Update::set_element("replies", reply_id, "text", DELETED_TEXT), bump],
                    )
                    .await?;
                Ok(updated.is_some())
            }
            Some(ReplyEntry::Reference(_)) => {
                let updated = self
                    .store
                    .update(Kind::Reply, reply_id, vec![Update::set("text", DELETED_TEXT)])
                    .await?;
                if updated.is_none() {
                    return Ok(false);
                }
                self.store.update(Kind::Thread, thread_id, vec![bump]).await?;
                Ok(true)
            }
        }
    }

    /// Flags a reply wherever it is stored. Returns `false` if no reply has
    /// that id.
    pub async fn mark_reply_reported(&self, reply_id: Uuid) -> Result<bool> {
        let standalone = self
            .store
            .update(Kind::Reply, reply_id, vec![Update::set("reported", true)])
            .await?;
        if standalone.is_some() {
            return Ok(true);
        }

        let Some(doc) = self
            .store
            .find_one(Kind::Thread, Filter::has_element("replies", reply_id))
            .await?
        else {
            return Ok(false);
        };
        let owner: ThreadRecord = decode(Kind::Thread, doc)?;
        let updated = self
            .store
            .update(
                Kind::Thread,
                owner.id,
                vec![Update::set_element("replies", reply_id, "reported", true)],
            )
            .await?;
        Ok(updated.is_some())
    }

    /// Removes every thread of a board and empties its reference list,
    /// creating the board if it does not exist yet. Returns how many threads
    /// were deleted.
    pub async fn reset_board(&self, name: &str) -> Result<usize> {
        let board = self.get_or_create_board(name).await?;
        let mut removed = 0;
        for &thread_id in &board.threads {
            if let Some(record) = self.thread_record(thread_id).await? {
                for entry in &record.replies {
                    if let ReplyEntry::Reference(reply_id) = entry {
                        self.store.delete_by_id(Kind::Reply, *reply_id).await?;
                    }
                }
            }
            if self.remove_thread(thread_id).await? {
                removed += 1;
            }
        }
        self.store
            .update(Kind::Board, board.id, vec![Update::set("threads", Value::Array(Vec::new()))])
            .await?;
        Ok(removed)
    }

    async fn resolve(&self, record: ThreadRecord) -> Result<Thread> {
        let mut replies = Vec::with_capacity(record.replies.len());
        let mut references = Vec::new();
        for entry in record.replies {
            match entry {
                ReplyEntry::Embedded(reply) => replies.push(reply),
                ReplyEntry::Reference(id) => references.push(id),
            }
        }

        if !references.is_empty() {
            let wanted = references.len();
            let docs = self
                .store
                .find_many(Kind::Reply, Filter::ids(references), None, None)
                .await?;
            if docs.len() < wanted {
                debug!(thread_id = %record.id, wanted, found = docs.len(), "skipping dangling reply references");
            }
            for doc in docs {
                replies.push(decode(Kind::Reply, doc)?);
            }
        }

        replies.sort_by(|a, b| a.created_on.cmp(&b.created_on).then_with(|| a.id.cmp(&b.id)));
        Ok(Thread {
            id: record.id,
            text: record.text,
            delete_password: record.delete_password,
            reported: record.reported,
            created_on: record.created_on,
            bumped_on: record.bumped_on,
            replies,
        })
    }
}

fn decode<T: DeserializeOwned>(kind: Kind, doc: Document) -> Result<T> {
    serde_json::from_value(Value::Object(doc)).map_err(|source| AppError::Corrupt { kind, source })
}

fn encode<T: Serialize>(kind: Kind, value: &T) -> Result<Document> {
    match serde_json::to_value(value).map_err(|source| AppError::Corrupt { kind, source })? {
        Value::Object(doc) => Ok(doc),
        _ => Ok(Document::new()),
    }
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(doc) => doc,
        _ => Document::new(),
    }
}
