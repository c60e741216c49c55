use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::identity::{self, LoginRequest, LoginResponse, RequestContext, UsernameAuthProvider};
use crate::storage::{Repository, User};

use super::{session_cookie, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginPayload {
    username: String,
}

/// Log `username` in under the store read lock, so a concurrent `/clear`
/// cannot slip between the user lookup and the session it issues.
pub(crate) fn login_user(state: &AppState, current: Option<&str>, username: String) -> AppResult<LoginResponse> {
    let store = state.store.read();
    let provider = UsernameAuthProvider::new(&*store);
    identity::login(&provider, &state.sessions, current, &LoginRequest { username })
}

pub(crate) async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload.map_err(|e| AppError::user("invalid_body".to_string(), e.body_text()))?;
    let resp = login_user(&state, ctx.session.as_deref(), payload.username)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session_cookie(&resp.session, state.config.secure_cookies)?);
    Ok((StatusCode::OK, headers, Json(resp.user)).into_response())
}

pub(crate) async fn logout(State(state): State<AppState>, ctx: RequestContext) -> StatusCode {
    identity::logout(&state.sessions, ctx.session.as_deref());
    StatusCode::NO_CONTENT
}

/// The logged-in user, or 401. A session whose user was removed counts as anonymous.
pub(crate) async fn check_session(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Json<User>> {
    let user_id = ctx.require_user()?;
    state.store.find_user_by_id(user_id).map(Json).ok_or_else(AppError::unauthorized)
}
