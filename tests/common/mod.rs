//! Shared fixtures for the scenario tests
//!
//! Feed records built in code, a feed client serving them, and a store
//! backend whose saves always fail.

#![allow(dead_code)]

use async_trait::async_trait;
use commitsync::feed::{FeedAuthor, FeedResult, FetchOptions};
use commitsync::model::{EntityId, StoredRecord};
use commitsync::storage::{ChangeSet, MergeResolver, SaveReceipt};
use commitsync::{EntityKind, FeedClient, FeedRecord, OpenStore, RecordStore, SqliteStore, StorageError, StorageResult, Store};
use std::sync::Arc;

/// One feed record with a derived url and email
pub fn record(sha: &str, author: &str, message: &str, date: &str) -> FeedRecord {
    FeedRecord::new(
        sha,
        format!("https://api.github.com/repos/apple/swift/commits/{}", sha),
        message,
        FeedAuthor::new(
            author,
            format!("{}@example.com", author.to_lowercase().replace(' ', ".")),
            date,
        ),
    )
}

/// Ann's two commits
pub fn ann_batch() -> Vec<FeedRecord> {
    vec![
        record("a1", "Ann", "Fix crash", "2023-08-15T10:30:00Z"),
        record("a2", "Ann", "Add feature", "2023-08-15T11:30:00Z"),
    ]
}

/// Five commits by three authors, including a merge commit
pub fn mixed_batch() -> Vec<FeedRecord> {
    vec![
        record("m1", "Ann", "Fix crash in parser", "2023-08-14T09:00:00Z"),
        record("m2", "Ben Barham", "Merge pull request #42 from x", "2023-08-14T10:00:00Z"),
        record("m3", "Cid", "Refactor lexer", "2023-08-14T11:00:00Z"),
        record("m4", "Ben Barham", "Add index-while-building flag", "2023-08-14T12:00:00Z"),
        record("m5", "Ann", "fix typo", "2023-08-14T13:00:00Z"),
    ]
}

pub fn memory_store() -> Store {
    Store::open_in_memory().expect("in-memory store")
}

/// Serves the same records on every fetch
pub struct StaticFeed(pub Vec<FeedRecord>);

#[async_trait]
impl FeedClient for StaticFeed {
    async fn fetch(&self, _options: &FetchOptions) -> FeedResult<Vec<FeedRecord>> {
        Ok(self.0.clone())
    }
}

/// SQLite-backed reads; every save fails with an IO error
pub struct FailingSaves(pub SqliteStore);

impl FailingSaves {
    pub fn store() -> Store {
        let backend = SqliteStore::open_in_memory().expect("in-memory store");
        Store::new(Arc::new(Self(backend))).expect("store")
    }
}

impl RecordStore for FailingSaves {
    fn load_all(&self, kind: EntityKind) -> StorageResult<Vec<StoredRecord>> {
        self.0.load_all(kind)
    }

    fn load_record(&self, id: &EntityId) -> StorageResult<Option<StoredRecord>> {
        self.0.load_record(id)
    }

    fn find_authors_named(&self, name: &str) -> StorageResult<Vec<StoredRecord>> {
        self.0.find_authors_named(name)
    }

    fn count(&self, kind: EntityKind) -> StorageResult<usize> {
        self.0.count(kind)
    }

    fn max_seq(&self) -> StorageResult<i64> {
        self.0.max_seq()
    }

    fn save_changes(
        &self,
        _changes: &ChangeSet,
        _resolver: &dyn MergeResolver,
    ) -> StorageResult<SaveReceipt> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}
