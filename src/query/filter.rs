//! The fixed filter set

use crate::model::{Author, Commit, EntityKind};
use chrono::{DateTime, Duration, Utc};

/// One active filter; filters replace each other rather than compose
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// All records of the kind
    #[default]
    None,
    /// Case-insensitive substring match on a commit's message
    MessageContains(String),
    /// Case-insensitive substring match on an author's name
    NameContains(String),
    /// Drop commits whose message starts with the text (case-sensitive)
    MessagePrefixExcludes(String),
    /// Records dated strictly after now minus the duration
    RecentSince(Duration),
    /// Commits whose author's name is exactly the text
    AuthorEquals(String),
}

impl Filter {
    /// Filter for a search-bar string.
    ///
    /// An empty string clears the filter instead of matching literally.
    pub fn search(kind: EntityKind, text: &str) -> Self {
        if text.is_empty() {
            return Self::None;
        }
        match kind {
            EntityKind::Commit => Self::MessageContains(text.to_string()),
            EntityKind::Author => Self::NameContains(text.to_string()),
        }
    }

    /// Whether the filter can be evaluated against records of `kind`
    pub fn applies_to(&self, kind: EntityKind) -> bool {
        match self {
            Self::None | Self::RecentSince(_) => true,
            Self::MessageContains(_) | Self::MessagePrefixExcludes(_) | Self::AuthorEquals(_) => {
                kind == EntityKind::Commit
            }
            Self::NameContains(_) => kind == EntityKind::Author,
        }
    }

    /// Evaluate against a commit and its resolved author
    pub(crate) fn matches_commit(&self, commit: &Commit, author: &Author, now: DateTime<Utc>) -> bool {
        match self {
            Self::None => true,
            Self::MessageContains(text) => contains_ignore_case(&commit.message, text),
            Self::NameContains(_) => false,
            Self::MessagePrefixExcludes(text) => !commit.message.starts_with(text.as_str()),
            Self::RecentSince(window) => commit.date > now - *window,
            Self::AuthorEquals(name) => author.name == *name,
        }
    }

    pub(crate) fn matches_author(&self, author: &Author, now: DateTime<Utc>) -> bool {
        match self {
            Self::None => true,
            Self::NameContains(text) => contains_ignore_case(&author.name, text),
            Self::RecentSince(window) => author.last_seen > now - *window,
            Self::MessageContains(_) | Self::MessagePrefixExcludes(_) | Self::AuthorEquals(_) => false,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::MessageContains(t) => write!(f, "message contains '{}'", t),
            Self::NameContains(t) => write!(f, "name contains '{}'", t),
            Self::MessagePrefixExcludes(t) => write!(f, "message does not start with '{}'", t),
            Self::RecentSince(d) => write!(f, "dated within the last {}s", d.num_seconds()),
            Self::AuthorEquals(n) => write!(f, "author is '{}'", n),
        }
    }
}

/// Preset filters offered by the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFilter {
    OnlyFixes,
    IgnorePullRequests,
    OnlyRecent,
    AllCommits,
    OnlyBenBarham,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 5] = [
        Self::OnlyFixes,
        Self::IgnorePullRequests,
        Self::OnlyRecent,
        Self::AllCommits,
        Self::OnlyBenBarham,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::OnlyFixes => "Show only fixes",
            Self::IgnorePullRequests => "Ignore Pull Requests",
            Self::OnlyRecent => "Show only recent",
            Self::AllCommits => "Show all commits",
            Self::OnlyBenBarham => "Show only Ben Barham commits",
        }
    }

    pub fn filter(&self) -> Filter {
        match self {
            Self::OnlyFixes => Filter::MessageContains("fix".to_string()),
            Self::IgnorePullRequests => Filter::MessagePrefixExcludes("Merge pull request".to_string()),
            Self::OnlyRecent => Filter::RecentSince(Duration::hours(12)),
            Self::AllCommits => Filter::None,
            Self::OnlyBenBarham => Filter::AuthorEquals("Ben Barham".to_string()),
        }
    }
}

impl std::str::FromStr for QuickFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixes" => Ok(Self::OnlyFixes),
            "no-pull-requests" => Ok(Self::IgnorePullRequests),
            "recent" => Ok(Self::OnlyRecent),
            "all" => Ok(Self::AllCommits),
            "ben-barham" => Ok(Self::OnlyBenBarham),
            other => Err(format!(
                "unknown filter '{}' (expected fixes, no-pull-requests, recent, all, ben-barham)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;

    fn ann() -> Author {
        Author::new("Ann", "ann@example.com", Utc::now())
    }

    fn commit(message: &str, date: DateTime<Utc>) -> Commit {
        Commit::new("abc", "https://x", message, date, EntityId::new())
    }

    #[test]
    fn empty_search_clears_filter() {
        assert_eq!(Filter::search(EntityKind::Commit, ""), Filter::None);
        assert_eq!(
            Filter::search(EntityKind::Commit, "fix"),
            Filter::MessageContains("fix".to_string())
        );
        assert_eq!(
            Filter::search(EntityKind::Author, "ann"),
            Filter::NameContains("ann".to_string())
        );
    }

    #[test]
    fn message_contains_ignores_case() {
        let now = Utc::now();
        let filter = Filter::MessageContains("FIX".to_string());
        assert!(filter.matches_commit(&commit("Fix the build", now), &ann(), now));
        assert!(!filter.matches_commit(&commit("Add feature", now), &ann(), now));
    }

    #[test]
    fn prefix_exclusion_is_case_sensitive() {
        let now = Utc::now();
        let filter = Filter::MessagePrefixExcludes("Merge pull request".to_string());
        assert!(!filter.matches_commit(&commit("Merge pull request #42 from x", now), &ann(), now));
        assert!(filter.matches_commit(&commit("merge pull request #42 from x", now), &ann(), now));
        assert!(filter.matches_commit(&commit("Fix: Merge pull request handling", now), &ann(), now));
    }

    #[test]
    fn recent_since_is_strict() {
        let now = Utc::now();
        let filter = Filter::RecentSince(Duration::hours(12));
        assert!(filter.matches_commit(&commit("new", now - Duration::hours(1)), &ann(), now));
        assert!(!filter.matches_commit(&commit("edge", now - Duration::hours(12)), &ann(), now));
        assert!(!filter.matches_commit(&commit("old", now - Duration::days(2)), &ann(), now));
    }

    #[test]
    fn author_equals_is_exact() {
        let now = Utc::now();
        let ben = Author::new("Ben Barham", "ben@example.com", now);
        let other = Author::new("ben barham", "ben2@example.com", now);
        let filter = Filter::AuthorEquals("Ben Barham".to_string());
        let c = commit("x", now);
        assert!(filter.matches_commit(&c, &ben, now));
        assert!(!filter.matches_commit(&c, &other, now));
    }

    #[test]
    fn name_contains_matches_authors_only() {
        let now = Utc::now();
        let filter = Filter::NameContains("AN".to_string());
        assert!(filter.matches_author(&ann(), now));
        assert!(!filter.matches_commit(&commit("Ann", now), &ann(), now));
    }

    #[test]
    fn filters_declare_their_kinds() {
        assert!(Filter::None.applies_to(EntityKind::Author));
        assert!(Filter::RecentSince(Duration::hours(1)).applies_to(EntityKind::Author));
        assert!(!Filter::MessageContains("x".into()).applies_to(EntityKind::Author));
        assert!(!Filter::NameContains("x".into()).applies_to(EntityKind::Commit));
        assert!(!Filter::AuthorEquals("x".into()).applies_to(EntityKind::Author));
    }

    #[test]
    fn quick_filters_parse_and_map() {
        assert_eq!("recent".parse::<QuickFilter>().unwrap(), QuickFilter::OnlyRecent);
        assert!("bogus".parse::<QuickFilter>().is_err());
        assert_eq!(
            QuickFilter::OnlyBenBarham.filter(),
            Filter::AuthorEquals("Ben Barham".to_string())
        );
        assert_eq!(QuickFilter::ALL.len(), 5);
    }
}
