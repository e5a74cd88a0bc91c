//! Author record

use super::entity::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit author, identified by exact (case-sensitive) name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: EntityId,
    /// Identity key
    pub name: String,
    pub email: String,
    /// Date of the commit that first introduced this author
    pub last_seen: DateTime<Utc>,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>, last_seen: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            email: email.into(),
            last_seen,
        }
    }
}
