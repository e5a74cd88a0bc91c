//! Read-side views returned by fetches
//!
//! A commit view carries its resolved author so presenters never need to
//! reach back into a context.

use super::author::Author;
use super::commit::Commit;
use super::entity::{EntityId, EntityKind};

/// Uniform row shape for presenters
pub trait Presentable {
    fn title(&self) -> String;
    fn subtitle(&self) -> String;
}

/// A commit joined with its author
#[derive(Debug, Clone, PartialEq)]
pub struct CommitView {
    pub commit: Commit,
    pub author: Author,
}

impl Presentable for CommitView {
    fn title(&self) -> String {
        self.commit.message.clone()
    }

    fn subtitle(&self) -> String {
        format!("By {} on {}", self.author.name, self.commit.date)
    }
}

impl Presentable for Author {
    fn title(&self) -> String {
        self.name.clone()
    }

    fn subtitle(&self) -> String {
        self.email.clone()
    }
}

/// One row of a fetch result
#[derive(Debug, Clone, PartialEq)]
pub enum EntityView {
    Commit(CommitView),
    Author(Author),
}

impl EntityView {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Commit(v) => v.commit.id,
            Self::Author(a) => a.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Commit(_) => EntityKind::Commit,
            Self::Author(_) => EntityKind::Author,
        }
    }

    pub fn as_commit(&self) -> Option<&CommitView> {
        match self {
            Self::Commit(v) => Some(v),
            Self::Author(_) => None,
        }
    }

    pub fn as_author(&self) -> Option<&Author> {
        match self {
            Self::Author(a) => Some(a),
            Self::Commit(_) => None,
        }
    }
}

impl Presentable for EntityView {
    fn title(&self) -> String {
        match self {
            Self::Commit(v) => v.title(),
            Self::Author(a) => a.title(),
        }
    }

    fn subtitle(&self) -> String {
        match self {
            Self::Commit(v) => v.subtitle(),
            Self::Author(a) => a.subtitle(),
        }
    }
}
