//! Wire types for feed records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record of the feed. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub sha: String,
    pub url: String,
    pub commit: FeedCommit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCommit {
    pub author: FeedAuthor,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedAuthor {
    pub name: String,
    pub email: String,
    /// ISO-8601 timestamp, parsed by the consumer
    pub date: String,
}

impl FeedRecord {
    pub fn new(
        sha: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
        author: FeedAuthor,
    ) -> Self {
        Self {
            sha: sha.into(),
            url: url.into(),
            commit: FeedCommit {
                author,
                message: message.into(),
            },
        }
    }

    pub fn author_name(&self) -> &str {
        &self.commit.author.name
    }

    /// The commit date, or `None` if the timestamp is not valid RFC 3339
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.commit.author.date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

impl FeedAuthor {
    pub fn new(name: impl Into<String>, email: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            date: date.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_feed_shape_ignoring_extra_fields() {
        let json = r#"[{
            "sha": "6f1c",
            "url": "https://api.github.com/repos/apple/swift/commits/6f1c",
            "node_id": "C_kwDO",
            "commit": {
                "author": { "name": "Ann", "email": "ann@example.com", "date": "2023-08-15T10:30:00Z" },
                "committer": { "name": "GitHub" },
                "message": "Fix crash"
            }
        }]"#;
        let records: Vec<FeedRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].author_name(), "Ann");
        assert_eq!(records[0].commit.message, "Fix crash");
        assert_eq!(
            records[0].parsed_date(),
            Some(Utc.with_ymd_and_hms(2023, 8, 15, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn invalid_date_parses_to_none() {
        let record = FeedRecord::new("s", "u", "m", FeedAuthor::new("Ann", "a@x", "yesterday"));
        assert_eq!(record.parsed_date(), None);
    }

    #[test]
    fn offset_dates_are_normalized_to_utc() {
        let record = FeedRecord::new(
            "s",
            "u",
            "m",
            FeedAuthor::new("Ann", "a@x", "2023-08-15T12:30:00+02:00"),
        );
        assert_eq!(
            record.parsed_date(),
            Some(Utc.with_ymd_and_hms(2023, 8, 15, 10, 30, 0).unwrap())
        );
    }
}
