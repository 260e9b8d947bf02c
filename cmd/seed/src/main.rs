//! Resets a board and fills it with predictable threads and replies, for
//! manual testing against a SQLite database.

use ab_config::{init_tracing, Settings};
use ab_core::{ModerationService, ServiceConfig};
use ab_db_sqlite::SqliteDocumentStore;
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Populate a board with test threads")]
struct Cli {
    /// Board to reset and fill
    #[arg(long, default_value = "test")]
    board: String,

    /// Number of threads to create
    #[arg(long, default_value_t = 10)]
    threads: usize,

    /// Replies per thread
    #[arg(long, default_value_t = 3)]
    replies: usize,

    /// Database URL; defaults to `database.url` from the configuration
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    let url = cli.database_url.as_deref().unwrap_or(settings.database.url());
    let store = Arc::new(SqliteDocumentStore::new(url).await?);
    let service = ModerationService::new(store, ServiceConfig::from(settings.board));

    let cleared = service.model().reset_board(&cli.board).await?;
    info!(board = %cli.board, cleared, "board reset");

    for i in 1..=cli.threads {
        let thread = service
            .create_thread(
                &cli.board,
                &format!("Test thread {i} on board \"{}\"", cli.board),
                &format!("password{i}"),
            )
            .await?;

        for j in 1..=cli.replies {
            service
                .create_reply(
                    &cli.board,
                    thread.id,
                    &format!("Reply {j} to thread {i} on board \"{}\"", cli.board),
                    &format!("replypass{i}-{j}"),
                )
                .await?;
        }
        info!(thread = i, replies = cli.replies, "created thread");
    }

    info!(
        board = %cli.board,
        threads = cli.threads,
        replies = cli.replies,
        "seeding complete"
    );
    Ok(())
}
