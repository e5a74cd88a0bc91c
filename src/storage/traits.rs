//! Storage trait definitions

use crate::model::{EntityId, EntityKind, Record, StoredRecord};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An in-memory modification waiting to be written.
///
/// `snapshot` is the durable value the context last absorbed; `current` is
/// the value held in memory. The difference between them is the set of
/// properties the context changed.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub snapshot: Record,
    pub current: Record,
}

impl PendingUpdate {
    pub fn id(&self) -> EntityId {
        self.current.id()
    }
}

/// Everything one context save writes, applied in a single transaction
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub inserts: Vec<StoredRecord>,
    pub updates: Vec<PendingUpdate>,
    pub deletes: Vec<(EntityKind, EntityId)>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Outcome of a committed `ChangeSet`
#[derive(Debug, Clone, Default)]
pub struct SaveReceipt {
    pub inserted: Vec<EntityId>,
    /// Durable values of updated records after merging
    pub updated: Vec<StoredRecord>,
    /// Updates dropped because the row no longer exists
    pub skipped: Vec<EntityId>,
    pub deleted: Vec<EntityId>,
}

/// Decides the value written for an updated record, given the row as it is
/// in the store at save time.
pub trait MergeResolver {
    fn resolve(&self, pending: &PendingUpdate, durable: &Record) -> Record;
}

/// Trait for durable record backends
///
/// Implementations must be thread-safe (Send + Sync): every context of a
/// store shares one backend.
pub trait RecordStore: Send + Sync {
    /// Load every record of one kind
    fn load_all(&self, kind: EntityKind) -> StorageResult<Vec<StoredRecord>>;

    /// Load one record by ID, whatever its kind
    fn load_record(&self, id: &EntityId) -> StorageResult<Option<StoredRecord>>;

    /// Load authors whose name matches exactly
    fn find_authors_named(&self, name: &str) -> StorageResult<Vec<StoredRecord>>;

    /// Count records of one kind
    fn count(&self, kind: EntityKind) -> StorageResult<usize>;

    /// Highest insertion sequence in use (0 for an empty store)
    fn max_seq(&self) -> StorageResult<i64>;

    /// Apply a change set atomically: either all of it is written or none.
    fn save_changes(
        &self,
        changes: &ChangeSet,
        resolver: &dyn MergeResolver,
    ) -> StorageResult<SaveReceipt>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: RecordStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
