//! Unified application error model and mapping helpers.
//! Handlers and the access filter return `AppError`; the HTTP layer maps each
//! variant onto a status code and a small JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// No authenticated identity on the request.
    pub fn unauthorized() -> Self { Self::auth("unauthorized", "Unauthorized") }

    pub fn user_not_found(username: &str) -> Self {
        AppError::NotFound { code: "user_not_found".into(), message: format!("no user named '{}'", username) }
    }

    pub fn article_not_found(id: i64) -> Self {
        AppError::NotFound { code: "article_not_found".into(), message: format!("article {} not found", id) }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Prefer an AppError carried inside the chain; everything else is internal
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Internal { code: "internal".into(), message: other.to_string() },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = self.code_str(), "request failed: {}", self.message());
        }
        let body = serde_json::json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::conflict("conflict", "dup").http_status(), 409);
        assert_eq!(AppError::auth("auth", "no").http_status(), 401);
        assert_eq!(AppError::io("io", "io").http_status(), 503);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn named_constructors_carry_codes() {
        assert_eq!(AppError::unauthorized().code_str(), "unauthorized");
        let e = AppError::user_not_found("zed");
        assert_eq!(e.code_str(), "user_not_found");
        assert!(e.message().contains("zed"));
        assert_eq!(AppError::article_not_found(9).to_string(), "article_not_found: article 9 not found");
    }

    #[test]
    fn anyhow_preserves_inner_app_error() {
        let wrapped = anyhow::Error::new(AppError::unauthorized());
        assert_eq!(AppError::from(wrapped), AppError::unauthorized());

        let plain = anyhow::anyhow!("disk on fire");
        let mapped = AppError::from(plain);
        assert_eq!(mapped.http_status(), 500);
        assert_eq!(mapped.message(), "disk on fire");
    }

    #[test]
    fn into_response_uses_mapped_status() {
        let resp = AppError::article_not_found(3).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = AppError::unauthorized().into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
