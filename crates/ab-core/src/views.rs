//! # Response projections
//!
//! Everything that leaves the core goes through one of these types. None of
//! them has a `delete_password` field, so a secret cannot be serialized by
//! accident on any read or write path.

use crate::models::{timestamp, Reply, Thread};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reply as shown in listings and thread views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
}

impl From<&Reply> for ReplyView {
    fn from(reply: &Reply) -> Self {
        Self { id: reply.id, text: reply.text.clone(), created_on: reply.created_on }
    }
}

/// One entry of a board listing: a thread with a window of its newest replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadPreview {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub bumped_on: DateTime<Utc>,
    /// Newest first, at most the listing's reply limit.
    pub replies: Vec<ReplyView>,
    /// Total replies on the thread, before the window was applied.
    pub replycount: usize,
}

impl ThreadPreview {
    pub fn new(thread: &Thread, reply_limit: usize) -> Self {
        Self {
            id: thread.id,
            text: thread.text.clone(),
            created_on: thread.created_on,
            bumped_on: thread.bumped_on,
            replies: thread.replies.iter().rev().take(reply_limit).map(ReplyView::from).collect(),
            replycount: thread.replies.len(),
        }
    }
}

/// A single thread with every reply, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub bumped_on: DateTime<Utc>,
    pub replies: Vec<ReplyView>,
}

impl From<&Thread> for ThreadView {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id,
            text: thread.text.clone(),
            created_on: thread.created_on,
            bumped_on: thread.bumped_on,
            replies: thread.replies.iter().map(ReplyView::from).collect(),
        }
    }
}

/// Reply as echoed back after a write, moderation flag included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub reported: bool,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub bumped_on: DateTime<Utc>,
}

/// Thread as echoed back by the create-thread and create-reply operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub reported: bool,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub bumped_on: DateTime<Utc>,
    pub replies: Vec<ReplyDetail>,
}

impl From<&Thread> for ThreadDetail {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id,
            text: thread.text.clone(),
            reported: thread.reported,
            created_on: thread.created_on,
            bumped_on: thread.bumped_on,
            replies: thread
                .replies
                .iter()
                .map(|r| ReplyDetail {
                    id: r.id,
                    text: r.text.clone(),
                    reported: r.reported,
                    created_on: r.created_on,
                    bumped_on: r.bumped_on,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thread_with_replies(n: usize) -> Thread {
        let start = Utc::now();
        Thread {
            id: Uuid::now_v7(),
            text: "op".into(),
            delete_password: "secret-op".into(),
            reported: true,
            created_on: start,
            bumped_on: start,
            replies: (0..n)
                .map(|i| Reply::new(format!("reply {i}"), "secret-reply", start + Duration::seconds(i as i64)))
                .collect(),
        }
    }

    #[test]
    fn preview_keeps_newest_replies_first() {
        let thread = thread_with_replies(5);
        let preview = ThreadPreview::new(&thread, 3);
        let texts: Vec<_> = preview.replies.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["reply 4", "reply 3", "reply 2"]);
        assert_eq!(preview.replycount, 5);
    }

    #[test]
    fn no_projection_serializes_secrets_or_board_flags() {
        let thread = thread_with_replies(2);
        let preview = serde_json::to_string(&ThreadPreview::new(&thread, 3)).unwrap();
        let view = serde_json::to_string(&ThreadView::from(&thread)).unwrap();
        let detail = serde_json::to_string(&ThreadDetail::from(&thread)).unwrap();

        for body in [&preview, &view, &detail] {
            assert!(!body.contains("delete_password"));
            assert!(!body.contains("secret-"));
        }
        assert!(!preview.contains("reported"));
        assert!(!view.contains("reported"));
        assert!(detail.contains("\"reported\":true"));
    }
}
