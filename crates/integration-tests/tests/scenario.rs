//! A visitor's first session on a fresh board, on every engine and layout.

mod common;

use ab_core::ModerationOutcome;
use common::setups;

#[tokio::test]
async fn first_thread_and_reply_on_a_fresh_board() {
    for s in setups().await {
        let thread = s.service.create_thread("test", "hello", "pw1").await.unwrap();
        assert!(!thread.id.is_nil(), "{}", s.label);
        assert_eq!(thread.text, "hello", "{}", s.label);
        assert!(thread.replies.is_empty(), "{}", s.label);
        assert!(!thread.reported, "{}", s.label);
        assert_eq!(thread.created_on, thread.bumped_on, "{}", s.label);

        let detail = s.service.create_reply("test", thread.id, "hi", "pw2").await.unwrap();
        assert_eq!(detail.replies.len(), 1, "{}", s.label);
        assert_eq!(detail.replies[0].text, "hi", "{}", s.label);
        let reply_id = detail.replies[0].id;

        let listing = s.service.list_threads("test").await.unwrap();
        assert_eq!(listing.len(), 1, "{}", s.label);
        assert_eq!(listing[0].id, thread.id, "{}", s.label);
        assert_eq!(listing[0].replies.len(), 1, "{}", s.label);
        assert_eq!(listing[0].replycount, 1, "{}", s.label);

        let outcome = s.service.delete_reply(thread.id, reply_id, "wrong").await.unwrap();
        assert_eq!(outcome.as_str(), "incorrect password", "{}", s.label);
        let view = s.service.view_thread(thread.id).await.unwrap();
        assert_eq!(view.replies[0].text, "hi", "{}", s.label);

        let outcome = s.service.delete_reply(thread.id, reply_id, "pw2").await.unwrap();
        assert_eq!(outcome, ModerationOutcome::Success, "{}", s.label);
        assert_eq!(outcome.as_str(), "success", "{}", s.label);
        let view = s.service.view_thread(thread.id).await.unwrap();
        assert_eq!(view.replies[0].text, "[deleted]", "{}", s.label);
    }
}
