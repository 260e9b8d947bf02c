//! # ab-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the moderation
//! service. Handlers decode input, call exactly one service operation and
//! render its result; no domain rules live here.

use crate::error::ApiError;
use ab_core::{Kind, ModerationOutcome, ModerationService};
use actix_web::{web, Either, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub service: ModerationService,
}

/// Bodies arrive either as JSON or as a classic urlencoded form.
type Body<T> = Either<web::Json<T>, web::Form<T>>;

fn into_inner<T>(body: Body<T>) -> T {
    match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    }
}

fn outcome(result: ModerationOutcome) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(result.as_str())
}

/// Ids that do not parse cannot name an existing record.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

#[derive(Debug, Deserialize)]
pub struct NewThread {
    pub text: String,
    pub delete_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteThread {
    pub thread_id: String,
    pub delete_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportThread {
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NewReply {
    pub thread_id: String,
    pub text: String,
    pub delete_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteReply {
    pub thread_id: String,
    pub reply_id: String,
    pub delete_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportReply {
    pub reply_id: String,
}

/// POST /api/threads/{board}
pub async fn create_thread(
    data: web::Data<AppState>,
    board: web::Path<String>,
    body: Body<NewThread>,
) -> Result<HttpResponse, ApiError> {
    let form = into_inner(body);
    let thread = data
        .service
        .create_thread(&board, &form.text, &form.delete_password)
        .await?;
    Ok(HttpResponse::Ok().json(thread))
}

/// GET /api/threads/{board}
pub async fn list_threads(data: web::Data<AppState>, board: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let threads = data.service.list_threads(&board).await?;
    Ok(HttpResponse::Ok().json(threads))
}

/// DELETE /api/threads/{board}
pub async fn delete_thread(
    data: web::Data<AppState>,
    board: web::Path<String>,
    body: Body<DeleteThread>,
) -> Result<HttpResponse, ApiError> {
    let form = into_inner(body);
    let result = match parse_id(&form.thread_id) {
        Some(thread_id) => {
            data.service
                .delete_thread(&board, thread_id, &form.delete_password)
                .await?
        }
        None => ModerationOutcome::IncorrectPassword,
    };
    Ok(outcome(result))
}

/// PUT /api/threads/{board}
pub async fn report_thread(
    data: web::Data<AppState>,
    _board: web::Path<String>,
    body: Body<ReportThread>,
) -> Result<HttpResponse, ApiError> {
    let form = into_inner(body);
    let result = match parse_id(&form.thread_id) {
        Some(thread_id) => data.service.report_thread(thread_id).await?,
        None => ModerationOutcome::IncorrectThreadId,
    };
    Ok(outcome(result))
}

/// POST /api/replies/{board}
pub async fn create_reply(
    data: web::Data<AppState>,
    board: web::Path<String>,
    body: Body<NewReply>,
) -> Result<HttpResponse, ApiError> {
    let form = into_inner(body);
    let thread_id = parse_id(&form.thread_id).ok_or_else(|| ApiError::not_found(Kind::Thread, &form.thread_id))?;
    let thread = data
        .service
        .create_reply(&board, thread_id, &form.text, &form.delete_password)
        .await?;
    Ok(HttpResponse::Ok().json(thread))
}

/// GET /api/replies/{board}?thread_id=
pub async fn view_thread(
    data: web::Data<AppState>,
    _board: web::Path<String>,
    query: web::Query<ThreadQuery>,
) -> Result<HttpResponse, ApiError> {
    let thread_id = parse_id(&query.thread_id).ok_or_else(|| ApiError::not_found(Kind::Thread, &query.thread_id))?;
    let thread = data.service.view_thread(thread_id).await?;
    Ok(HttpResponse::Ok().json(thread))
}

/// DELETE /api/replies/{board}
pub async fn delete_reply(
    data: web::Data<AppState>,
    _board: web::Path<String>,
    body: Body<DeleteReply>,
) -> Result<HttpResponse, ApiError> {
    let form = into_inner(body);
    let result = match (parse_id(&form.thread_id), parse_id(&form.reply_id)) {
        (Some(thread_id), Some(reply_id)) => {
            data.service
                .delete_reply(thread_id, reply_id, &form.delete_password)
                .await?
        }
        _ => ModerationOutcome::IncorrectPassword,
    };
    Ok(outcome(result))
}

/// PUT /api/replies/{board}
pub async fn report_reply(
    data: web::Data<AppState>,
    _board: web::Path<String>,
    body: Body<ReportReply>,
) -> Result<HttpResponse, ApiError> {
    let form = into_inner(body);
    let result = match parse_id(&form.reply_id) {
        Some(reply_id) => data.service.report_reply(reply_id).await?,
        None => ModerationOutcome::Incorrect,
    };
    Ok(outcome(result))
}

/// Optional: A simple homepage handler for "/"
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().body("anonboard is running. Try GET /api/threads/test")
}
