//! anonboard/crates/ab-api/src/middleware.rs Middleware
//!
//! Custom middleware for logging and cross-origin access.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Request logger. Records go through the `log` facade, which the binary's
/// tracing subscriber picks up.
pub fn standard_middleware() -> Logger {
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

/// Configures CORS (Cross-Origin Resource Sharing).
/// Clients are anonymous, so any origin may call the API.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_any_header()
        .max_age(3600)
}
