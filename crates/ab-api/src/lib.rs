//! # ab-api
//!
//! The web routing and orchestration layer for the board.

pub mod error;
pub mod handlers;
pub mod middleware;

pub use error::ApiError;
pub use handlers::AppState;

use actix_web::web;

/// Configures the routes for the board API.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index)).service(
        web::scope("/api")
            // Thread listing, creation and moderation (e.g., /api/threads/test)
            .service(
                web::resource("/threads/{board}")
                    .route(web::get().to(handlers::list_threads))
                    .route(web::post().to(handlers::create_thread))
                    .route(web::delete().to(handlers::delete_thread))
                    .route(web::put().to(handlers::report_thread)),
            )
            // Single-thread view and reply moderation (e.g., /api/replies/test?thread_id=...)
            .service(
                web::resource("/replies/{board}")
                    .route(web::get().to(handlers::view_thread))
                    .route(web::post().to(handlers::create_reply))
                    .route(web::delete().to(handlers::delete_reply))
                    .route(web::put().to(handlers::report_reply)),
            ),
    );
}
