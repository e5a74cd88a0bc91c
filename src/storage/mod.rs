//! Durable storage backends
//!
//! Contexts talk to storage through the `RecordStore` trait. The primary
//! implementation is `SqliteStore` for persistent storage.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    ChangeSet, MergeResolver, OpenStore, PendingUpdate, RecordStore, SaveReceipt, StorageError,
    StorageResult,
};
