//! # anonboard Binary
//!
//! The entry point that assembles the application from configuration and the
//! storage plugins compiled in.

use ab_api::middleware::{cors_policy, standard_middleware};
use ab_api::{configure_routes, AppState};
use ab_config::{init_tracing, Backend, DatabaseSettings, Settings};
use ab_core::{DocumentStore, ModerationService, ServiceConfig};
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing::info;

// Feature-gated imports
#[cfg(feature = "db-memory")]
use ab_db_memory::MemoryDocumentStore;

#[cfg(feature = "db-sqlite")]
use ab_db_sqlite::SqliteDocumentStore;

async fn build_store(database: &DatabaseSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match database.backend {
        #[cfg(feature = "db-memory")]
        Backend::Memory => Ok(Arc::new(MemoryDocumentStore::new())),
        #[cfg(feature = "db-sqlite")]
        Backend::Sqlite => Ok(Arc::new(SqliteDocumentStore::new(database.url()).await?)),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("storage backend {other:?} was not compiled in"),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    // 1. Initialize Database Implementation
    let store = build_store(&settings.database).await?;

    // 2. Wrap the service in AppState (dynamic dispatch over the store)
    let service_config = ServiceConfig::from(settings.board);
    let state = web::Data::new(AppState {
        service: ModerationService::new(store, service_config),
    });

    let addr = (settings.server.host.clone(), settings.server.port);
    info!(
        host = %addr.0,
        port = addr.1,
        backend = ?settings.database.backend,
        reply_storage = ?service_config.reply_storage,
        "anonboard starting"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_policy())
            .wrap(standard_middleware())
            .configure(configure_routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
