//!
//! gazette HTTP server
//! --------------------
//! This module defines the Axum-based HTTP API for gazette.
//!
//! Responsibilities:
//! - Session management with an opaque cookie token mapped to a server-side record.
//! - Login/logout/check_session endpoints backed by the `identity` module.
//! - Public and member-only article endpoints delegating to the `access` rules.
//! - Optional `/clear` fixture hook for test runs.
//! - Startup: store open/seed, inventory log, background session sweeper.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{RequestContext, SessionManager};
use crate::storage::{Fixture, Repository, SharedStore};

pub mod articles;
pub mod auth;
pub mod fixtures;

pub const SESSION_COOKIE: &str = "gazette_session";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub sessions: SessionManager,
    pub config: Arc<ServerConfig>,
    /// Fixture re-applied by the `/clear` hook, if the server was seeded from one.
    pub fixture: Option<Arc<Fixture>>,
}

impl AppState {
    pub fn new(store: SharedStore, config: ServerConfig) -> Self {
        Self {
            store,
            sessions: SessionManager::with_anonymous_cap(config.session_ttl, config.max_anonymous_sessions),
            config: Arc::new(config),
            fixture: None,
        }
    }

    pub fn with_fixture(mut self, fixture: Fixture) -> Self {
        self.fixture = Some(Arc::new(fixture));
        self
    }
}

pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all("cookie") {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}

pub(crate) fn session_cookie(token: &str, secure: bool) -> AppResult<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Lax; Path=/{}", SESSION_COOKIE, token, secure))
        .map_err(|e| AppError::internal("session_cookie".to_string(), e.to_string()))
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let live = parse_cookie(&parts.headers, SESSION_COOKIE).and_then(|t| state.sessions.get(&t));
        Ok(match live {
            Some(sess) => RequestContext { identity: sess.identity(), session: Some(sess.token), request_id },
            None => RequestContext { request_id, ..Default::default() },
        })
    }
}

/// Build the application router. `/clear` is only mounted with test hooks on.
pub fn router(state: AppState) -> Router {
    let mut app: Router<AppState> = Router::new()
        .route("/", get(|| async { "gazette ok" }))
        .route("/login", post(auth::login))
        .route("/logout", delete(auth::logout))
        .route("/check_session", get(auth::check_session))
        .route("/articles", get(articles::index))
        .route("/articles/{id}", get(articles::show))
        .route("/members_only_articles", get(articles::members_index))
        .route("/members_only_articles/{id}", get(articles::members_show));
    if state.config.test_hooks {
        app = app.merge(fixtures::routes());
    }
    app.with_state(state)
}

fn load_fixture(config: &ServerConfig) -> anyhow::Result<Option<Fixture>> {
    if let Some(path) = &config.seed_file {
        return Ok(Some(Fixture::from_path(path)?));
    }
    Ok(config.demo_seed.then(Fixture::demo))
}

/// Open the store described by `config`, seed it when empty and build the state.
pub fn prepare_state(config: ServerConfig) -> anyhow::Result<AppState> {
    let store = match &config.data_dir {
        Some(dir) => SharedStore::open(dir).with_context(|| format!("opening store under {}", dir.display()))?,
        None => SharedStore::in_memory(),
    };
    let fixture = load_fixture(&config)?;
    if let Some(fx) = &fixture {
        let mut guard = store.write();
        if guard.is_empty() {
            let report = guard.apply_fixture(fx).context("seeding store")?;
            info!(users = report.users, articles = report.articles, "seeded empty store");
        } else {
            info!("store already populated; fixture not applied");
        }
    }
    log_inventory(&store);
    let state = AppState::new(store, config);
    Ok(match fixture {
        Some(fx) => state.with_fixture(fx),
        None => state,
    })
}

fn log_inventory(store: &SharedStore) {
    let users = store.list_users().len();
    let articles = store.list_articles();
    let members = articles.iter().filter(|a| a.is_member_only).count();
    info!(users, articles = articles.len(), member_only = members, "store inventory");
    if users == 0 {
        warn!("no users in store; every login will be rejected");
    }
}

/// Periodically drop idle sessions. Runs until the returned task is aborted.
pub fn spawn_session_sweeper(sessions: SessionManager) -> JoinHandle<()> {
    let every = (sessions.ttl() / 2).clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            let removed = sessions.sweep_expired();
            if removed > 0 { tracing::debug!(removed = removed, "session_sweep"); }
        }
    })
}

/// Serve `state` on an already bound listener until the process is interrupted.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.http_addr();
    let state = prepare_state(config)?;
    if state.config.test_hooks {
        warn!("test hooks enabled: GET /clear wipes the store and all sessions");
    }
    let sweeper = spawn_session_sweeper(state.sessions.clone());
    info!("Starting server on {}", addr);
    let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {}", addr))?;
    let result = serve(listener, state).await;
    sweeper.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cookie_finds_named_pair() {
        let mut h = HeaderMap::new();
        h.insert("cookie", HeaderValue::from_static("theme=dark; gazette_session=abc-123; x=1"));
        assert_eq!(parse_cookie(&h, SESSION_COOKIE).as_deref(), Some("abc-123"));
        assert_eq!(parse_cookie(&h, "missing"), None);
        assert_eq!(parse_cookie(&HeaderMap::new(), SESSION_COOKIE), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let plain = session_cookie("tok", false).unwrap();
        assert_eq!(plain.to_str().unwrap(), "gazette_session=tok; HttpOnly; SameSite=Lax; Path=/");
        let secure = session_cookie("tok", true).unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn prepare_state_seeds_demo_into_empty_store() {
        let cfg = ServerConfig { demo_seed: true, ..Default::default() };
        let state = prepare_state(cfg).unwrap();
        assert_eq!(state.store.list_users().len(), 3);
        assert!(state.fixture.is_some());
    }

    #[test]
    fn prepare_state_without_seed_is_empty() {
        let state = prepare_state(ServerConfig::default()).unwrap();
        assert!(state.store.read().is_empty());
        assert!(state.fixture.is_none());
    }

    #[tokio::test]
    async fn sweeper_drains_idle_sessions() {
        let sessions = SessionManager::new(Duration::from_millis(100));
        sessions.ensure(None).unwrap();
        sessions.issue(None, 1).unwrap();
        assert_eq!(sessions.len(), 2);

        let sweeper = spawn_session_sweeper(sessions.clone());
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !sessions.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        sweeper.abort();
        assert!(sessions.is_empty());
    }

    #[test]
    fn prepare_state_keeps_existing_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ServerConfig { data_dir: Some(tmp.path().to_path_buf()), demo_seed: true, ..Default::default() };
        prepare_state(cfg.clone()).unwrap();
        let state = prepare_state(cfg).unwrap();
        // second start must not duplicate the demo users
        assert_eq!(state.store.list_users().len(), 3);
    }
}
