use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;

use crate::error::{AppError, AppResult};
use crate::tprintln;

use super::principal::Identity;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: Option<i64>,
    pub page_views: u32,
    pub last_seen: Instant,
}

impl Session {
    pub fn identity(&self) -> Identity { Identity::from_user_id(self.user_id) }
}

fn gen_token() -> AppResult<SessionToken> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| AppError::internal("session_token".to_string(), e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Server-side session records keyed by the token handed out in the cookie.
///
/// Sessions expire after `ttl` without a request; an expired session is
/// dropped on the next lookup or sweep and treated as if it never existed.
/// At most `max_anonymous` sessions without a user are kept; opening one more
/// evicts the least recently seen anonymous session.
#[derive(Clone)]
pub struct SessionManager {
    ttl: Duration,
    max_anonymous: usize,
    sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
}

pub const DEFAULT_MAX_ANONYMOUS_SESSIONS: usize = 10_000;

impl Default for SessionManager {
    fn default() -> Self { Self::new(Duration::from_secs(60 * 60)) }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self { Self::with_anonymous_cap(ttl, DEFAULT_MAX_ANONYMOUS_SESSIONS) }

    pub fn with_anonymous_cap(ttl: Duration, max_anonymous: usize) -> Self {
        Self { ttl, max_anonymous: max_anonymous.max(1), sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn expired(&self, sess: &Session, now: Instant) -> bool {
        now.duration_since(sess.last_seen) >= self.ttl
    }

    /// Live session for `token`, refreshing its idle timer.
    pub fn get(&self, token: &str) -> Option<Session> {
        let now = Instant::now();
        let mut map = self.sessions.write();
        let sess = map.get_mut(token)?;
        if self.expired(sess, now) {
            map.remove(token);
            tprintln!("session.expired token={}", token);
            return None;
        }
        sess.last_seen = now;
        Some(sess.clone())
    }

    pub fn current_user(&self, token: Option<&str>) -> Identity {
        token.and_then(|t| self.get(t)).map(|s| s.identity()).unwrap_or_default()
    }

    /// Return the live session for `token`, or create a fresh one.
    /// The flag is true when a new session was created.
    pub fn ensure(&self, token: Option<&str>) -> AppResult<(SessionToken, bool)> {
        if let Some(existing) = token.and_then(|t| self.get(t)) {
            return Ok((existing.token, false));
        }
        let now = Instant::now();
        let token = gen_token()?;
        let sess = Session { token: token.clone(), user_id: None, page_views: 0, last_seen: now };
        let mut map = self.sessions.write();
        let anonymous = map.values().filter(|s| s.user_id.is_none()).count();
        if anonymous >= self.max_anonymous {
            let oldest = map
                .values()
                .filter(|s| s.user_id.is_none())
                .min_by_key(|s| s.last_seen)
                .map(|s| s.token.clone());
            if let Some(oldest) = oldest {
                map.remove(&oldest);
                tprintln!("session.evict anonymous={}", anonymous);
            }
        }
        map.insert(token.clone(), sess);
        tprintln!("session.issue ttl_secs={}", self.ttl.as_secs());
        Ok((token, true))
    }

    /// Open a fresh session bound to `user_id`, retiring `previous`.
    ///
    /// The page-view count of a live `previous` session carries over; the old
    /// token stops resolving immediately.
    pub fn issue(&self, previous: Option<&str>, user_id: i64) -> AppResult<SessionToken> {
        let token = gen_token()?;
        let now = Instant::now();
        let mut map = self.sessions.write();
        let page_views = previous
            .and_then(|t| map.remove(t))
            .filter(|old| !self.expired(old, now))
            .map(|old| old.page_views)
            .unwrap_or(0);
        map.insert(token.clone(), Session { token: token.clone(), user_id: Some(user_id), page_views, last_seen: now });
        tprintln!("session.issue user_id={} carried_views={}", user_id, page_views);
        Ok(token)
    }

    /// Drop the session's identity. Returns whether one was set.
    pub fn clear_user(&self, token: &str) -> bool {
        match self.sessions.write().get_mut(token) {
            Some(sess) => sess.user_id.take().is_some(),
            None => false,
        }
    }

    /// Count one article view against the session and return the new total.
    pub fn record_page_view(&self, token: &str) -> Option<u32> {
        let mut map = self.sessions.write();
        let sess = map.get_mut(token)?;
        sess.page_views = sess.page_views.saturating_add(1);
        sess.last_seen = Instant::now();
        Some(sess.page_views)
    }

    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.sessions.write();
        let before = map.len();
        map.retain(|_, s| !self.expired(s, now));
        before - map.len()
    }

    pub fn reset_all(&self) -> usize {
        let mut map = self.sessions.write();
        let n = map.len();
        map.clear();
        n
    }
}
