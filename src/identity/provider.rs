use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::storage::{Repository, User};
use crate::tprintln;

use super::session::{SessionManager, SessionToken};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    /// Freshly issued token; the caller must hand it back in a cookie.
    pub session: SessionToken,
    pub user: User,
}

/// Resolves a login request to a known user.
pub trait AuthProvider {
    fn authenticate(&self, req: &LoginRequest) -> AppResult<User>;
}

/// Username-only authentication: the user exists, so the login succeeds.
pub struct UsernameAuthProvider<'a, R: Repository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: Repository + ?Sized> UsernameAuthProvider<'a, R> {
    pub fn new(repo: &'a R) -> Self { Self { repo } }
}

impl<R: Repository + ?Sized> AuthProvider for UsernameAuthProvider<'_, R> {
    fn authenticate(&self, req: &LoginRequest) -> AppResult<User> {
        self.repo
            .find_user_by_username(&req.username)
            .ok_or_else(|| AppError::user_not_found(&req.username))
    }
}

/// Authenticate and move the caller onto a newly issued session bound to the
/// user. The caller's previous token is retired; its page views carry over.
/// A failed login leaves the session untouched.
pub fn login(
    provider: &dyn AuthProvider,
    sessions: &SessionManager,
    current: Option<&str>,
    req: &LoginRequest,
) -> AppResult<LoginResponse> {
    let user = match provider.authenticate(req) {
        Ok(u) => u,
        Err(e) => {
            debug!(username = %req.username, "login rejected: {}", e.message());
            return Err(e);
        }
    };
    let session = sessions.issue(current, user.id)?;
    info!(user_id = user.id, username = %user.username, replaced = current.is_some(), "login");
    tprintln!("auth.login user={}", user.username);
    Ok(LoginResponse { session, user })
}

/// Clear the identity on the caller's session. Always succeeds.
pub fn logout(sessions: &SessionManager, current: Option<&str>) {
    let had_user = current.map(|t| sessions.clear_user(t)).unwrap_or(false);
    info!(had_user, "logout");
}
