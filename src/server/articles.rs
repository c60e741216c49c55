use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::access;
use crate::error::{AppError, AppResult};
use crate::identity::RequestContext;
use crate::storage::Article;

use super::{session_cookie, AppState};

/// Non-numeric ids name no article.
fn article_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::not_found("article_not_found", "article not found"))
}

pub(crate) async fn index(State(state): State<AppState>) -> Json<Vec<Article>> {
    Json(access::list_articles(&state.store))
}

pub(crate) async fn show(
    State(state): State<AppState>,
    ctx: RequestContext,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Response> {
    let id = article_id(path)?;
    let (token, created) = state.sessions.ensure(ctx.session.as_deref())?;
    let mut resp = match access::view_article(&state.sessions, &token, &state.store, id, state.config.page_view_limit) {
        Ok(article) => Json(article).into_response(),
        Err(e) => e.into_response(),
    };
    // the view was counted against the new session, so the client must keep it
    if created {
        resp.headers_mut().insert(SET_COOKIE, session_cookie(&token, state.config.secure_cookies)?);
    }
    Ok(resp)
}

pub(crate) async fn members_index(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Json<Vec<Article>>> {
    access::list_members_only_articles(&ctx, &state.store).map(Json)
}

pub(crate) async fn members_show(
    State(state): State<AppState>,
    ctx: RequestContext,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Article>> {
    // an unparsable id must still answer 401 to anonymous callers
    ctx.require_user()?;
    let id = article_id(path)?;
    access::get_members_only_article(&ctx, &state.store, id).map(Json)
}
