//! Commit record

use super::entity::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit ingested from the remote feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: EntityId,
    pub sha: String,
    pub url: String,
    /// The only field editable from the foreground
    pub message: String,
    pub date: DateTime<Utc>,
    /// The referenced author; always set
    pub author: EntityId,
}

impl Commit {
    pub fn new(
        sha: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
        date: DateTime<Utc>,
        author: EntityId,
    ) -> Self {
        Self {
            id: EntityId::new(),
            sha: sha.into(),
            url: url.into(),
            message: message.into(),
            date,
            author,
        }
    }
}
