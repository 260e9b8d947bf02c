//! # Domain Models
//!
//! These structs represent the core entities of the board and the exact shape
//! they take inside the document store. Field names are part of the persisted
//! contract and must not be renamed.
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text a reply carries once it has been deleted by its author.
pub const DELETED_TEXT: &str = "[deleted]";

/// Where a thread keeps its replies inside the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStorage {
    /// Replies live as sub-documents of the thread's `replies` array.
    #[default]
    Embedded,
    /// Replies are standalone documents; the thread keeps their ids.
    Referenced,
}

/// A named board (e.g. "test", "b").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    /// Thread ids in insertion order. May briefly hold ids of threads that no
    /// longer exist; readers skip those.
    #[serde(default)]
    pub threads: Vec<Uuid>,
}

/// A top-level post with its replies resolved, in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: Uuid,
    pub text: String,
    pub delete_password: String,
    pub reported: bool,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub replies: Vec<Reply>,
}

impl Thread {
    pub fn reply(&self, reply_id: Uuid) -> Option<&Reply> {
        self.replies.iter().find(|r| r.id == reply_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub delete_password: String,
    #[serde(default)]
    pub reported: bool,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub bumped_on: DateTime<Utc>,
}

impl Reply {
    /// A fresh, unreported reply stamped with `now`.
    pub fn new(text: impl Into<String>, delete_password: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.into(),
            delete_password: delete_password.into(),
            reported: false,
            created_on: now,
            bumped_on: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.text == DELETED_TEXT
    }
}

/// A thread exactly as it is stored. `replies` may mix embedded documents and
/// bare ids; the model resolves both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub delete_password: String,
    #[serde(default)]
    pub reported: bool,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub bumped_on: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<ReplyEntry>,
}

/// One slot of a stored thread's `replies` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyEntry {
    Embedded(Reply),
    Reference(Uuid),
}

impl ReplyEntry {
    pub fn id(&self) -> Uuid {
        match self {
            ReplyEntry::Embedded(reply) => reply.id,
            ReplyEntry::Reference(id) => *id,
        }
    }
}

/// Timestamps are stored as RFC 3339 with a fixed nanosecond fraction so that
/// their string form sorts chronologically in any store.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn to_value(at: &DateTime<Utc>) -> serde_json::Value {
        serde_json::Value::String(format(at))
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn timestamps_sort_as_strings() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(1);
        assert!(timestamp::format(&early) < timestamp::format(&late));
        assert_eq!(timestamp::format(&early), "2024-01-01T00:00:00.000000000Z");
    }

    #[test]
    fn reply_entries_decode_both_layouts() {
        let reply_id = Uuid::now_v7();
        let doc = json!({
            "_id": Uuid::now_v7(),
            "text": "op",
            "delete_password": "pw",
            "created_on": "2024-01-01T00:00:00.000000000Z",
            "bumped_on": "2024-01-01T00:00:00.000000000Z",
            "replies": [
                reply_id,
                {
                    "_id": Uuid::now_v7(),
                    "text": "hi",
                    "delete_password": "pw2",
                    "reported": false,
                    "created_on": "2024-01-01T00:00:01.000000000Z",
                    "bumped_on": "2024-01-01T00:00:01.000000000Z"
                }
            ]
        });
        let record: ThreadRecord = serde_json::from_value(doc).unwrap();
        assert!(!record.reported);
        assert_eq!(record.replies.len(), 2);
        assert_eq!(record.replies[0], ReplyEntry::Reference(reply_id));
        assert!(matches!(&record.replies[1], ReplyEntry::Embedded(r) if r.text == "hi"));
    }

    #[test]
    fn tombstone_detection() {
        let mut reply = Reply::new("hello", "pw", Utc::now());
        assert!(!reply.is_deleted());
        reply.text = DELETED_TEXT.to_string();
        assert!(reply.is_deleted());
    }
}
