//! Store: the shared durable backend plus the contexts that work on it
//!
//! A `Store` is a cheap, clonable handle. Components receive it explicitly
//! and open their own `ManagedContext`s from it; there is no global store.

mod context;
pub mod merge;
pub mod notify;

pub use context::{ContextId, ContextInfo, ManagedContext};
pub use merge::{MergeOutcome, MergePolicy};
pub use notify::{ChangeEvent, ChangeNotifier, Notification, Subscription};

use crate::model::{EntityId, EntityKind};
use crate::storage::{OpenStore, RecordStore, SqliteStore, StorageError};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Name of the foreground context
pub const VIEW_CONTEXT: &str = "viewContext";
/// Name of the ingestion context
pub const IMPORT_CONTEXT: &str = "importContext";
/// Transaction author recorded for ingestion saves
pub const BACKGROUND_AUTHOR: &str = "backgroundTask";

/// Errors from context and query operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Record not found: {0}")]
    NotFound(EntityId),

    #[error("Expected a {expected} record, found a {found} record")]
    WrongKind {
        expected: EntityKind,
        found: EntityKind,
    },

    #[error("Update would change the identity of record {0}")]
    IdentityChanged(EntityId),

    #[error("Filter '{filter}' does not apply to {kind} records")]
    UnsupportedFilter { filter: String, kind: EntityKind },

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

struct StoreInner {
    backend: Arc<dyn RecordStore>,
    notifier: ChangeNotifier,
    next_seq: AtomicI64,
}

/// Handle to the durable store shared by every context
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Wrap an existing backend
    pub fn new(backend: Arc<dyn RecordStore>) -> StoreResult<Self> {
        let next_seq = backend.max_seq()? + 1;
        Ok(Self {
            inner: Arc::new(StoreInner {
                backend,
                notifier: ChangeNotifier::default(),
                next_seq: AtomicI64::new(next_seq),
            }),
        })
    }

    /// Open or create a SQLite store file
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::new(Arc::new(SqliteStore::open(path)?))
    }

    /// Create a store backed by an in-memory SQLite database
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::new(Arc::new(SqliteStore::open_in_memory()?))
    }

    /// The foreground context: absorbs other saves, in-memory values win
    pub fn view_context(&self) -> ManagedContext {
        ManagedContext::new(self.clone(), VIEW_CONTEXT)
            .with_merge_policy(MergePolicy::PropertyObjectTrump)
            .automatically_merging_changes()
    }

    /// A fresh ingestion context
    pub fn new_background_context(&self) -> ManagedContext {
        ManagedContext::new(self.clone(), IMPORT_CONTEXT)
            .with_transaction_author(BACKGROUND_AUTHOR)
            .with_merge_policy(MergePolicy::PropertyObjectTrump)
            .automatically_merging_changes()
    }

    /// A plain context that only sees other saves when it re-reads
    pub fn new_context(&self, name: impl Into<String>) -> ManagedContext {
        ManagedContext::new(self.clone(), name)
    }

    /// Subscribe to change events from every context of this store
    pub fn subscribe(&self) -> Subscription {
        self.inner.notifier.subscribe()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.inner.notifier
    }

    /// Durable record count, ignoring any context's pending changes
    pub fn count(&self, kind: EntityKind) -> StoreResult<usize> {
        Ok(self.inner.backend.count(kind)?)
    }

    pub(crate) fn backend(&self) -> &dyn RecordStore {
        self.inner.backend.as_ref()
    }

    pub(crate) fn next_seq(&self) -> i64 {
        self.inner.next_seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("subscribers", &self.inner.notifier.subscriber_count())
            .finish()
    }
}
