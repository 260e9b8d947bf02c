//! Maps core errors onto HTTP responses.

use ab_core::{AppError, Kind};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    pub fn not_found(kind: Kind, key: &str) -> Self {
        ApiError::App(AppError::not_found(kind, key))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::App(AppError::NotFound(..)) => StatusCode::NOT_FOUND,
            ApiError::App(AppError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            ApiError::App(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ApiError::App(AppError::NotFound(kind, _)) => format!("{} not found.", capitalize(kind.as_str())),
            ApiError::App(AppError::ValidationError(msg)) => msg.clone(),
            ApiError::App(err) => {
                error!(error = %err, "request failed");
                "internal server error".to_string()
            }
        };
        HttpResponse::build(status)
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_matches_legacy_message() {
        let err = ApiError::not_found(Kind::Board, "nope");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(capitalize(Kind::Board.as_str()), "Board");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = ApiError::from(AppError::Storage(std::io::Error::other("db path /secret").into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_is_bad_request() {
        let err = ApiError::from(AppError::ValidationError("text cannot be empty".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
