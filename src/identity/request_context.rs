use crate::error::{AppError, AppResult};

use super::principal::Identity;
use super::session::SessionToken;

/// Per-request view of the caller, built once from the session cookie and
/// passed by reference to everything that makes an access decision.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Token of the caller's live session, if it presented one.
    pub session: Option<SessionToken>,
    pub identity: Identity,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self { Self::default() }

    pub fn authenticated(user_id: i64) -> Self {
        Self { identity: Identity::Authenticated { user_id }, ..Default::default() }
    }

    /// The authenticated user id, or `Unauthorized`.
    pub fn require_user(&self) -> AppResult<i64> {
        self.identity.user_id().ok_or_else(AppError::unauthorized)
    }
}
