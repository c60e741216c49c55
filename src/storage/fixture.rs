//! Seed data: JSON fixtures and the built-in demo set.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::models::{NewArticle, NewUser};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<NewUser>,
    #[serde(default)]
    pub articles: Vec<NewArticle>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixtureReport {
    pub users: usize,
    pub articles: usize,
}

impl Fixture {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing fixture {}", path.display()))
    }

    pub fn is_empty(&self) -> bool { self.users.is_empty() && self.articles.is_empty() }

    /// Small deterministic data set. Article 1 is member-only.
    pub fn demo() -> Self {
        let users = ["alice", "bob", "carol"].into_iter().map(NewUser::new).collect();
        let articles = vec![
            NewArticle::new(
                "Members: the state of the union",
                "A long look at how the membership programme grew over the year and what comes next for subscribers.",
                true,
            )
            .by("alice"),
            NewArticle::new(
                "Welcome to the Gazette",
                "Everything you need to know about reading articles here, free or otherwise.",
                false,
            )
            .by("bob"),
            NewArticle::new(
                "Inside the newsroom",
                "Our editors explain how a story moves from a tip to the front page, step by step.",
                true,
            )
            .by("carol"),
            NewArticle::new(
                "Weekend reading list",
                "Five pieces worth your time this weekend, picked by the staff.",
                false,
            ),
            NewArticle::new(
                "Ask the editor",
                "Readers wrote in with questions about corrections and the editor answered all of them.",
                true,
            )
            .by("alice"),
        ];
        Self { users, articles }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_fixture() {
        let fx = Fixture::from_json_str(
            r#"{"users":[{"username":"alice"}],"articles":[{"title":"t","body":"b","is_member_only":true,"author_username":"alice"}]}"#,
        )
        .unwrap();
        assert_eq!(fx.users, vec![NewUser::new("alice")]);
        assert_eq!(fx.articles.len(), 1);
        assert!(fx.articles[0].is_member_only);
        assert_eq!(fx.articles[0].author_username.as_deref(), Some("alice"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let fx = Fixture::from_json_str("{}").unwrap();
        assert!(fx.is_empty());
    }

    #[test]
    fn demo_has_members_only_first_article() {
        let fx = Fixture::demo();
        assert!(fx.articles[0].is_member_only);
        assert!(fx.articles.iter().any(|a| !a.is_member_only));
        assert_eq!(fx.users.len(), 3);
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = Fixture::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("reading fixture"));
    }
}
