//! On-disk snapshot of the whole store, rewritten after every mutation.
//! Format: bincode of [`Snapshot`], written to a temp file then renamed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::models::{Article, User};
use super::StoreError;

pub const SNAPSHOT_FILE: &str = "gazette.bin";

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub next_user_id: i64,
    pub next_article_id: i64,
    pub users: Vec<User>,
    pub articles: Vec<Article>,
}

pub fn snapshot_path(dir: &Path) -> PathBuf { dir.join(SNAPSHOT_FILE) }

pub(crate) fn load(path: &Path) -> Result<Option<Snapshot>, StoreError> {
    if !path.exists() { return Ok(None); }
    let bytes = std::fs::read(path)?;
    let snap: Snapshot = bincode::deserialize(&bytes)?;
    Ok(Some(snap))
}

pub(crate) fn save(path: &Path, snap: &Snapshot) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() { std::fs::create_dir_all(dir)?; }
    let bytes = bincode::serialize(snap)?;
    let tmp = path.with_extension("bin.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), users = snap.users.len(), articles = snap.articles.len(), "snapshot written");
    Ok(())
}
