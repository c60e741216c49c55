use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters of the body copied into a generated preview.
pub const PREVIEW_CHARS: usize = 25;
/// Reading speed used to estimate `minutes_to_read`.
pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub body: String,
    pub preview: String,
    pub minutes_to_read: u32,
    pub date: DateTime<Utc>,
    pub is_member_only: bool,
    /// Owning user, when the fixture linked the article to one.
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
}

impl NewUser {
    pub fn new<S: Into<String>>(username: S) -> Self { Self { username: username.into() } }
}

/// Article as written in a fixture. Derived fields are filled in on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Username of the owning user; resolved to `user_id` on insert.
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub minutes_to_read: Option<u32>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_member_only: bool,
}

impl NewArticle {
    pub fn new<S: Into<String>>(title: S, body: S, is_member_only: bool) -> Self {
        Self { title: title.into(), body: body.into(), is_member_only, ..Default::default() }
    }

    pub fn by(mut self, username: &str) -> Self {
        self.author_username = Some(username.to_string());
        self
    }
}

pub fn preview_of(body: &str) -> String {
    if body.chars().count() <= PREVIEW_CHARS {
        return body.to_string();
    }
    let mut out: String = body.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

pub fn estimate_minutes_to_read(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_bodies_only() {
        assert_eq!(preview_of("short body"), "short body");
        let long = "abcdefghijklmnopqrstuvwxyz0123";
        assert_eq!(preview_of(long), "abcdefghijklmnopqrstuvwxy...");
    }

    #[test]
    fn reading_time_rounds_up_with_floor_of_one() {
        assert_eq!(estimate_minutes_to_read(""), 1);
        assert_eq!(estimate_minutes_to_read("one two three"), 1);
        let body = vec!["word"; 201].join(" ");
        assert_eq!(estimate_minutes_to_read(&body), 2);
    }

    #[test]
    fn new_article_fixture_defaults() {
        let a: NewArticle = serde_json::from_str(r#"{"title":"t","body":"b"}"#).unwrap();
        assert!(!a.is_member_only);
        assert!(a.author.is_none() && a.preview.is_none() && a.date.is_none());
    }
}
