//! anonboard/crates/ab-core/src/lib.rs
//!
//! The central domain logic and interface definitions for the anonymous board.

pub mod board;
pub mod document;
pub mod error;
pub mod models;
pub mod moderation;
pub mod traits;
pub mod views;

// Re-exporting for easier access in other crates
pub use board::BoardModel;
pub use document::{Document, Filter, Kind, Sort, Update};
pub use error::*;
pub use models::*;
pub use moderation::{ModerationOutcome, ModerationService, ServiceConfig};
pub use traits::*;
pub use views::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_reply_creation_v7() {
        let now = chrono::Utc::now();
        let first = Reply::new("Hello Rust!", "pw", now);
        let second = Reply::new("Hello again", "pw", now);
        assert_ne!(first.id, second.id);
        assert_eq!(first.id.get_version(), Some(uuid::Version::SortRand));
        assert_eq!(first.created_on, first.bumped_on);
        assert!(!first.reported);
    }
}
