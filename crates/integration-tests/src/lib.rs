//! Cross-crate tests for the board model and moderation service, run against
//! every storage engine and reply layout. See `tests/`.
