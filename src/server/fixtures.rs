//! Test fixture hook. Only routed when `test_hooks` is enabled; not part of
//! the production API.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::error::AppResult;
use crate::storage::FixtureReport;

use super::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/clear", get(clear))
}

/// Wipe users, articles and every session, then re-apply the startup fixture.
/// The store write lock is held throughout; logins take the read lock, so
/// none can bind a session to a user id from before the wipe.
pub fn reset(state: &AppState) -> AppResult<(usize, FixtureReport)> {
    let mut store = state.store.write();
    let dropped = state.sessions.reset_all();
    store.clear()?;
    let report = match &state.fixture {
        Some(fx) => store.apply_fixture(fx)?,
        None => FixtureReport::default(),
    };
    info!(sessions_dropped = dropped, users = report.users, articles = report.articles, "fixture reset");
    Ok((dropped, report))
}

async fn clear(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let (dropped, report) = reset(&state)?;
    Ok(Json(json!({
        "status": "ok",
        "sessions_dropped": dropped,
        "users": report.users,
        "articles": report.articles,
    })))
}
