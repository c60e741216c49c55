//!
//! gazette storage module
//! -----------------------
//! In-process store for the two entities the service knows about: users and
//! articles. Rows live in ordered maps keyed by their integer id, with a unique
//! index on usernames. When opened against a data directory the store loads a
//! bincode snapshot on startup and rewrites it after every mutation.
//!
//! Read access goes through the [`Repository`] trait so request handling never
//! builds ad-hoc queries; mutation (seeding, clearing) is only available on the
//! concrete [`Store`]. The store is shared between requests as a
//! [`SharedStore`] (`Arc<RwLock<Store>>`).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::error::AppError;

pub mod fixture;
pub mod models;
pub mod snapshot;

pub use fixture::{Fixture, FixtureReport};
pub use models::{Article, NewArticle, NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("username already taken: {0}")]
    DuplicateUsername(String),

    #[error("article references unknown author: {0}")]
    UnknownAuthor(String),

    #[error("invalid record: {0}")]
    Invalid(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => AppError::conflict("duplicate_username".to_string(), err.to_string()),
            StoreError::UnknownAuthor(_) | StoreError::Invalid(_) => AppError::user("invalid_record".to_string(), err.to_string()),
            StoreError::Io(_) | StoreError::Snapshot(_) => AppError::io("storage_io".to_string(), err.to_string()),
        }
    }
}

/// Typed read access to users and articles.
pub trait Repository {
    fn find_user_by_username(&self, username: &str) -> Option<User>;
    fn find_user_by_id(&self, id: i64) -> Option<User>;
    fn find_article_by_id(&self, id: i64) -> Option<Article>;
    /// Articles matching `predicate`, ordered by id.
    fn list_articles_where(&self, predicate: &dyn Fn(&Article) -> bool) -> Vec<Article>;
    fn list_users(&self) -> Vec<User>;

    fn list_articles(&self) -> Vec<Article> {
        self.list_articles_where(&|_| true)
    }
}

pub struct Store {
    snapshot_path: Option<PathBuf>,
    users: BTreeMap<i64, User>,
    usernames: HashMap<String, i64>,
    articles: BTreeMap<i64, Article>,
    next_user_id: i64,
    next_article_id: i64,
}

impl Default for Store {
    fn default() -> Self { Self::in_memory() }
}

impl Store {
    /// Store with no backing snapshot; contents are lost on drop.
    pub fn in_memory() -> Self {
        Self {
            snapshot_path: None,
            users: BTreeMap::new(),
            usernames: HashMap::new(),
            articles: BTreeMap::new(),
            next_user_id: 1,
            next_article_id: 1,
        }
    }

    /// Open a store persisted under `dir`, loading the existing snapshot if any.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = snapshot::snapshot_path(dir);
        let mut store = Self::in_memory();
        if let Some(snap) = snapshot::load(&path)? {
            for u in snap.users {
                store.usernames.insert(u.username.clone(), u.id);
                store.users.insert(u.id, u);
            }
            for a in snap.articles {
                store.articles.insert(a.id, a);
            }
            store.next_user_id = snap.next_user_id.max(1);
            store.next_article_id = snap.next_article_id.max(1);
            info!(path = %path.display(), users = store.users.len(), articles = store.articles.len(), "loaded store snapshot");
        }
        store.snapshot_path = Some(path);
        Ok(store)
    }

    pub fn is_empty(&self) -> bool { self.users.is_empty() && self.articles.is_empty() }

    pub fn insert_user(&mut self, new: NewUser) -> Result<User, StoreError> {
        let user = self.insert_user_row(new)?;
        self.persist()?;
        Ok(user)
    }

    pub fn insert_article(&mut self, new: NewArticle) -> Result<Article, StoreError> {
        let article = self.insert_article_row(new)?;
        self.persist()?;
        Ok(article)
    }

    /// Insert every user, then every article, and persist once.
    /// Rows inserted before a failing row are kept.
    pub fn apply_fixture(&mut self, fixture: &Fixture) -> Result<FixtureReport, StoreError> {
        let mut report = FixtureReport::default();
        let result: Result<(), StoreError> = (|| {
            for u in &fixture.users {
                self.insert_user_row(u.clone())?;
                report.users += 1;
            }
            for a in &fixture.articles {
                self.insert_article_row(a.clone())?;
                report.articles += 1;
            }
            Ok(())
        })();
        self.persist()?;
        result.map(|_| report)
    }

    /// Drop every user and article and restart id numbering at 1.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.users.clear();
        self.usernames.clear();
        self.articles.clear();
        self.next_user_id = 1;
        self.next_article_id = 1;
        debug!("store cleared");
        self.persist()
    }

    fn insert_user_row(&mut self, new: NewUser) -> Result<User, StoreError> {
        let username = new.username.trim().to_string();
        if username.is_empty() {
            return Err(StoreError::Invalid("username must not be empty".into()));
        }
        if self.usernames.contains_key(&username) {
            return Err(StoreError::DuplicateUsername(username));
        }
        let id = self.next_user_id;
        self.next_user_id += 1;
        let user = User { id, username: username.clone() };
        self.usernames.insert(username, id);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn insert_article_row(&mut self, new: NewArticle) -> Result<Article, StoreError> {
        if new.title.trim().is_empty() {
            return Err(StoreError::Invalid("article title must not be empty".into()));
        }
        let user_id = match new.author_username.as_deref() {
            Some(name) => Some(*self.usernames.get(name).ok_or_else(|| StoreError::UnknownAuthor(name.to_string()))?),
            None => None,
        };
        let author = new
            .author
            .or_else(|| new.author_username.clone())
            .unwrap_or_else(|| "Staff".to_string());
        let id = self.next_article_id;
        self.next_article_id += 1;
        let article = Article {
            id,
            author,
            preview: new.preview.unwrap_or_else(|| models::preview_of(&new.body)),
            minutes_to_read: new.minutes_to_read.unwrap_or_else(|| models::estimate_minutes_to_read(&new.body)),
            date: new.date.unwrap_or_else(Utc::now),
            title: new.title,
            body: new.body,
            is_member_only: new.is_member_only,
            user_id,
        };
        self.articles.insert(id, article.clone());
        Ok(article)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else { return Ok(()); };
        let snap = snapshot::Snapshot {
            next_user_id: self.next_user_id,
            next_article_id: self.next_article_id,
            users: self.users.values().cloned().collect(),
            articles: self.articles.values().cloned().collect(),
        };
        snapshot::save(path, &snap)
    }
}

impl Repository for Store {
    fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.usernames.get(username).and_then(|id| self.users.get(id)).cloned()
    }

    fn find_user_by_id(&self, id: i64) -> Option<User> {
        self.users.get(&id).cloned()
    }

    fn find_article_by_id(&self, id: i64) -> Option<Article> {
        self.articles.get(&id).cloned()
    }

    fn list_articles_where(&self, predicate: &dyn Fn(&Article) -> bool) -> Vec<Article> {
        self.articles.values().filter(|a| predicate(a)).cloned().collect()
    }

    fn list_users(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }
}

#[derive(Clone)]
pub struct SharedStore(pub Arc<RwLock<Store>>);

impl SharedStore {
    pub fn new(store: Store) -> Self { Self(Arc::new(RwLock::new(store))) }

    pub fn in_memory() -> Self { Self::new(Store::in_memory()) }

    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(Store::open(dir)?))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Store> { self.0.read() }

    pub fn write(&self) -> RwLockWriteGuard<'_, Store> { self.0.write() }
}

impl Repository for SharedStore {
    fn find_user_by_username(&self, username: &str) -> Option<User> { self.read().find_user_by_username(username) }
    fn find_user_by_id(&self, id: i64) -> Option<User> { self.read().find_user_by_id(id) }
    fn find_article_by_id(&self, id: i64) -> Option<Article> { self.read().find_article_by_id(id) }
    fn list_articles_where(&self, predicate: &dyn Fn(&Article) -> bool) -> Vec<Article> {
        self.read().list_articles_where(predicate)
    }
    fn list_users(&self) -> Vec<User> { self.read().list_users() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> Store {
        let mut s = Store::in_memory();
        s.apply_fixture(&Fixture {
            users: vec![NewUser::new("alice"), NewUser::new("bob")],
            articles: vec![
                NewArticle::new("members", "secret body", true).by("alice"),
                NewArticle::new("public", "open body", false),
            ],
        })
        .unwrap();
        s
    }

    #[test]
    fn lookups_by_username_and_id() {
        let s = seeded();
        let alice = s.find_user_by_username("alice").unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(s.find_user_by_id(2).unwrap().username, "bob");
        assert!(s.find_user_by_username("mallory").is_none());
        assert!(s.find_user_by_username("ALICE").is_none());
    }

    #[test]
    fn article_fields_are_derived_on_insert() {
        let s = seeded();
        let a = s.find_article_by_id(1).unwrap();
        assert_eq!(a.author, "alice");
        assert_eq!(a.user_id, Some(1));
        assert_eq!(a.preview, "secret body");
        assert_eq!(a.minutes_to_read, 1);
        let b = s.find_article_by_id(2).unwrap();
        assert_eq!(b.author, "Staff");
        assert_eq!(b.user_id, None);
    }

    #[test]
    fn list_where_filters_and_orders_by_id() {
        let s = seeded();
        let members = s.list_articles_where(&|a| a.is_member_only);
        assert_eq!(members.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(s.list_articles().len(), 2);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let mut s = seeded();
        let err = s.insert_user(NewUser::new("alice")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(ref n) if n == "alice"));
        assert_eq!(AppError::from(err).http_status(), 409);
    }

    #[test]
    fn unknown_author_and_blank_rows_are_invalid() {
        let mut s = Store::in_memory();
        let err = s.insert_article(NewArticle::new("t", "b", true).by("ghost")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownAuthor(_)));
        assert!(matches!(s.insert_user(NewUser::new("  ")), Err(StoreError::Invalid(_))));
        assert!(s.is_empty());
    }

    #[test]
    fn clear_restarts_ids() {
        let mut s = seeded();
        s.clear().unwrap();
        assert!(s.is_empty());
        let u = s.insert_user(NewUser::new("carol")).unwrap();
        assert_eq!(u.id, 1);
    }

    #[test]
    fn snapshot_survives_reopen() {
        let tmp = tempdir().unwrap();
        {
            let mut s = Store::open(tmp.path()).unwrap();
            s.apply_fixture(&Fixture::demo()).unwrap();
        }
        let reopened = Store::open(tmp.path()).unwrap();
        assert_eq!(reopened.list_users().len(), 3);
        assert_eq!(reopened.list_articles().len(), Fixture::demo().articles.len());
        assert!(reopened.find_article_by_id(1).unwrap().is_member_only);

        let mut reopened = reopened;
        let next = reopened.insert_user(NewUser::new("dave")).unwrap();
        assert_eq!(next.id, 4);
    }

    #[test]
    fn shared_store_reads_through_lock() {
        let shared = SharedStore::new(seeded());
        assert_eq!(shared.find_user_by_username("bob").map(|u| u.id), Some(2));
        shared.write().clear().unwrap();
        assert!(shared.list_users().is_empty());
    }
}
