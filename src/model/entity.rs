//! Entity identity and the tagged record type shared by every layer

use super::author::Author;
use super::commit::Commit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stored record
///
/// Serializes as a plain UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new random EntityId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an EntityId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an EntityId from its string form
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two persisted entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Commit,
    Author,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Author => "author",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single persisted attribute, used for property-level change tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Sha,
    Url,
    Message,
    Date,
    Author,
    Name,
    Email,
    LastSeen,
}

impl Property {
    /// Properties carried by each entity kind, in column order
    pub fn all_for(kind: EntityKind) -> &'static [Property] {
        match kind {
            EntityKind::Commit => &[
                Property::Sha,
                Property::Url,
                Property::Message,
                Property::Date,
                Property::Author,
            ],
            EntityKind::Author => &[Property::Name, Property::Email, Property::LastSeen],
        }
    }
}

/// A record of either kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Commit(Commit),
    Author(Author),
}

impl Record {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Commit(c) => c.id,
            Self::Author(a) => a.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Commit(_) => EntityKind::Commit,
            Self::Author(_) => EntityKind::Author,
        }
    }

    /// The timestamp used for ordering: `date` for commits, `last_seen` for authors
    pub fn sort_date(&self) -> DateTime<Utc> {
        match self {
            Self::Commit(c) => c.date,
            Self::Author(a) => a.last_seen,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Self::Commit(c) => Some(c),
            Self::Author(_) => None,
        }
    }

    pub fn as_author(&self) -> Option<&Author> {
        match self {
            Self::Author(a) => Some(a),
            Self::Commit(_) => None,
        }
    }

    /// True if `property` holds the same value in both records.
    ///
    /// Records of different kinds never compare equal.
    pub fn same_value(&self, other: &Record, property: Property) -> bool {
        match (self, other) {
            (Self::Commit(a), Self::Commit(b)) => match property {
                Property::Sha => a.sha == b.sha,
                Property::Url => a.url == b.url,
                Property::Message => a.message == b.message,
                Property::Date => a.date == b.date,
                Property::Author => a.author == b.author,
                _ => true,
            },
            (Self::Author(a), Self::Author(b)) => match property {
                Property::Name => a.name == b.name,
                Property::Email => a.email == b.email,
                Property::LastSeen => a.last_seen == b.last_seen,
                _ => true,
            },
            _ => false,
        }
    }

    /// Copy the value of `property` from `source` into `self`.
    ///
    /// No-op when the kinds differ or the property does not belong to the kind.
    pub fn copy_value(&mut self, source: &Record, property: Property) {
        match (self, source) {
            (Self::Commit(dst), Self::Commit(src)) => match property {
                Property::Sha => dst.sha = src.sha.clone(),
                Property::Url => dst.url = src.url.clone(),
                Property::Message => dst.message = src.message.clone(),
                Property::Date => dst.date = src.date,
                Property::Author => dst.author = src.author,
                _ => {}
            },
            (Self::Author(dst), Self::Author(src)) => match property {
                Property::Name => dst.name = src.name.clone(),
                Property::Email => dst.email = src.email.clone(),
                Property::LastSeen => dst.last_seen = src.last_seen,
                _ => {}
            },
            _ => {}
        }
    }

    /// Properties whose values differ between `self` and `other`
    pub fn changed_properties(&self, other: &Record) -> Vec<Property> {
        Property::all_for(self.kind())
            .iter()
            .copied()
            .filter(|p| !self.same_value(other, *p))
            .collect()
    }
}

/// A record together with its store-wide insertion sequence
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Monotonic insertion order; the stable secondary sort key
    pub seq: i64,
    pub record: Record,
}

impl StoredRecord {
    pub fn new(seq: i64, record: Record) -> Self {
        Self { seq, record }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(message: &str) -> Record {
        Record::Commit(Commit::new("abc", "https://x/abc", message, Utc::now(), EntityId::new()))
    }

    #[test]
    fn entity_id_serializes_as_string() {
        let id = EntityId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        assert_eq!(EntityId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn changed_properties_reports_only_differences() {
        let before = commit("first");
        let mut after = before.clone();
        if let Record::Commit(c) = &mut after {
            c.message = "second".to_string();
        }
        assert_eq!(before.changed_properties(&after), vec![Property::Message]);
    }

    #[test]
    fn copy_value_moves_single_property() {
        let source = commit("from source");
        let mut target = commit("original");
        target.copy_value(&source, Property::Message);
        assert_eq!(target.as_commit().unwrap().message, "from source");
        // other properties keep their own values
        assert_ne!(target.id(), source.id());
    }

    #[test]
    fn records_of_different_kinds_never_match() {
        let c = commit("x");
        let a = Record::Author(Author::new("Ann", "ann@example.com", Utc::now()));
        assert!(!c.same_value(&a, Property::Sha));
    }
}
