//! Article access rules.
//!
//! Every decision here depends only on whether the request carries an
//! authenticated identity and on the article's `is_member_only` flag, plus the
//! per-session page-view counter on the public detail route.

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::{RequestContext, SessionManager};
use crate::storage::{Article, Repository};

/// Default number of public article reads allowed per session.
pub const DEFAULT_PAGE_VIEW_LIMIT: u32 = 3;

fn require_member(ctx: &RequestContext) -> AppResult<i64> {
    ctx.require_user().inspect_err(|_| {
        debug!(target: "gazette::access", request_id = ?ctx.request_id, "member-only access denied");
    })
}

/// Every article flagged member-only, for authenticated callers.
pub fn list_members_only_articles<R: Repository + ?Sized>(ctx: &RequestContext, repo: &R) -> AppResult<Vec<Article>> {
    require_member(ctx)?;
    Ok(repo.list_articles_where(&|a| a.is_member_only))
}

/// Any existing article by id, for authenticated callers. The member-only flag
/// is not consulted here; only the index filters on it.
pub fn get_members_only_article<R: Repository + ?Sized>(ctx: &RequestContext, repo: &R, id: i64) -> AppResult<Article> {
    require_member(ctx)?;
    repo.find_article_by_id(id).ok_or_else(|| AppError::article_not_found(id))
}

pub fn list_articles<R: Repository + ?Sized>(repo: &R) -> Vec<Article> {
    repo.list_articles()
}

/// Public article read metered by the session's page-view counter.
///
/// `session` must be a live session token; the view is counted before the
/// lookup, so reads of unknown ids still use up the allowance.
pub fn view_article<R: Repository + ?Sized>(
    sessions: &SessionManager,
    session: &str,
    repo: &R,
    id: i64,
    limit: u32,
) -> AppResult<Article> {
    let views = sessions
        .record_page_view(session)
        .ok_or_else(|| AppError::internal("session_lost", "session vanished before page view"))?;
    if views > limit {
        debug!(target: "gazette::access", views, limit, "page view limit reached");
        return Err(AppError::auth("pageview_limit", "Maximum pageview limit reached"));
    }
    repo.find_article_by_id(id).ok_or_else(|| AppError::article_not_found(id))
}
