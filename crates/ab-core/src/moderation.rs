//! # Moderation & mutation service
//!
//! Every operation the outside world can perform on a board. Delete secrets
//! are compared verbatim against the stored plaintext. A wrong secret or an
//! unknown id on delete/report is an ordinary [`ModerationOutcome`], not an
//! error.

use crate::board::BoardModel;
use crate::document::Kind;
use crate::error::{AppError, Result};
use crate::models::{Reply, ReplyStorage};
use crate::traits::DocumentStore;
use crate::views::{ThreadDetail, ThreadPreview, ThreadView};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const DEFAULT_THREAD_LIMIT: usize = 10;
pub const DEFAULT_REPLY_LIMIT: usize = 3;
pub const MAX_BOARD_NAME_LEN: usize = 64;

/// Result of a delete or report request, rendered verbatim to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationOutcome {
    Success,
    Reported,
    IncorrectPassword,
    IncorrectThreadId,
    /// Unknown reply on report.
    Incorrect,
}

impl ModerationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationOutcome::Success => "success",
            ModerationOutcome::Reported => "reported",
            ModerationOutcome::IncorrectPassword => "incorrect password",
            ModerationOutcome::IncorrectThreadId => "incorrect thread id",
            ModerationOutcome::Incorrect => "incorrect",
        }
    }
}

impl fmt::Display for ModerationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub reply_storage: ReplyStorage,
    pub thread_limit: usize,
    pub reply_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            reply_storage: ReplyStorage::default(),
            thread_limit: DEFAULT_THREAD_LIMIT,
            reply_limit: DEFAULT_REPLY_LIMIT,
        }
    }
}

pub struct ModerationService {
    model: BoardModel,
    thread_limit: usize,
    reply_limit: usize,
}

impl ModerationService {
    pub fn new(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        Self {
            model: BoardModel::new(store, config.reply_storage),
            thread_limit: config.thread_limit,
            reply_limit: config.reply_limit,
        }
    }

    pub fn model(&self) -> &BoardModel {
        &self.model
    }

    /// Posts a thread, creating the board on first use.
    #[instrument(skip(self, text, delete_password))]
    pub async fn create_thread(&self, board_name: &str, text: &str, delete_password: &str) -> Result<ThreadDetail> {
        validate_board_name(board_name)?;
        validate_text(text)?;

        let board = self.model.get_or_create_board(board_name).await?;
        let thread = self.model.insert_thread(text, delete_password, Utc::now()).await?;
        // Not atomic with the insert above: a failure here leaves the thread
        // unlisted, which readers tolerate.
        self.model.attach_thread(&board, thread.id).await?;

        info!(thread_id = %thread.id, "thread created");
        Ok(ThreadDetail::from(&thread))
    }

    pub async fn list_threads(&self, board_name: &str) -> Result<Vec<ThreadPreview>> {
        self.model
            .list_recent_threads(board_name, self.thread_limit, self.reply_limit)
            .await
    }

    pub async fn view_thread(&self, thread_id: Uuid) -> Result<ThreadView> {
        self.model.view_thread(thread_id).await
    }

    #[instrument(skip(self, text, delete_password))]
    pub async fn create_reply(
        &self,
        board_name: &str,
        thread_id: Uuid,
        text: &str,
        delete_password: &str,
    ) -> Result<ThreadDetail> {
        validate_text(text)?;

        let reply = Reply::new(text, delete_password, Utc::now());
        let thread = self
            .model
            .insert_reply(thread_id, reply)
            .await?
            .ok_or_else(|| AppError::not_found(Kind::Thread, thread_id))?;

        info!(replies = thread.replies.len(), "reply created");
        Ok(ThreadDetail::from(&thread))
    }

    #[instrument(skip(self, delete_password))]
    pub async fn delete_thread(
        &self,
        board_name: &str,
        thread_id: Uuid,
        delete_password: &str,
    ) -> Result<ModerationOutcome> {
        let authorized = self
            .model
            .thread_record(thread_id)
            .await?
            .is_some_and(|record| record.delete_password == delete_password);
        if !authorized {
            warn!("thread delete rejected");
            return Ok(ModerationOutcome::IncorrectPassword);
        }

        if !self.model.remove_thread(thread_id).await? {
            return Ok(ModerationOutcome::IncorrectPassword);
        }
        let detached = self.model.detach_thread(thread_id).await?;

        info!(detached, "thread deleted");
        Ok(ModerationOutcome::Success)
    }

    /// Anyone may report; reporting twice is harmless.
    #[instrument(skip(self))]
    pub async fn report_thread(&self, thread_id: Uuid) -> Result<ModerationOutcome> {
        if self.model.mark_thread_reported(thread_id).await? {
            info!("thread reported");
            Ok(ModerationOutcome::Reported)
        } else {
            Ok(ModerationOutcome::IncorrectThreadId)
        }
    }

    #[instrument(skip(self, delete_password))]
    pub async fn delete_reply(
        &self,
        thread_id: Uuid,
        reply_id: Uuid,
        delete_password: &str,
    ) -> Result<ModerationOutcome> {
        let authorized = self
            .model
            .load_thread(thread_id)
            .await?
            .and_then(|thread| thread.reply(reply_id).map(|r| r.delete_password == delete_password))
            .unwrap_or(false);
        if !authorized {
            warn!("reply delete rejected");
            return Ok(ModerationOutcome::IncorrectPassword);
        }

        if !self.model.tombstone_reply(thread_id, reply_id, Utc::now()).await? {
            return Ok(ModerationOutcome::IncorrectPassword);
        }

        info!("reply deleted");
        Ok(ModerationOutcome::Success)
    }

    /// Flags a reply. Does not bump its thread.
    #[instrument(skip(self))]
    pub async fn report_reply(&self, reply_id: Uuid) -> Result<ModerationOutcome> {
        if self.model.mark_reply_reported(reply_id).await? {
            info!("reply reported");
            Ok(ModerationOutcome::Reported)
        } else {
            Ok(ModerationOutcome::Incorrect)
        }
    }
}

pub fn validate_board_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::ValidationError("board name cannot be empty".into()));
    }
    if name.chars().count() > MAX_BOARD_NAME_LEN {
        return Err(AppError::ValidationError(format!(
            "board name exceeds maximum length of {MAX_BOARD_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::ValidationError("text cannot be empty".into()));
    }
    Ok(())
}
