//! Sessions and caller identity.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod request_context;
mod session;

pub use principal::Identity;
pub use provider::{login, logout, AuthProvider, LoginRequest, LoginResponse, UsernameAuthProvider};
pub use request_context::RequestContext;
pub use session::{Session, SessionManager, SessionToken, DEFAULT_MAX_ANONYMOUS_SESSIONS};
