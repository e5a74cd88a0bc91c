//! commitsync: commit feed ingestion into a durable local store
//!
//! Fetches a commit feed, turns each record into a `Commit` attached to a
//! deduplicated `Author`, and saves each batch atomically to SQLite.
//!
//! # Core Concepts
//!
//! - **Store**: the shared durable backend plus its change notifier
//! - **Contexts**: owned, transactional views that save in one step and
//!   merge property-by-property with what other contexts saved
//! - **Queries**: one entity kind, one filter, newest first
//!
//! # Example
//!
//! ```
//! use commitsync::{Author, FetchRequest, Store};
//!
//! let store = Store::open_in_memory().unwrap();
//! let mut ctx = store.view_context();
//! ctx.insert_author(Author::new("Ann", "ann@example.com", chrono::Utc::now()));
//! ctx.save().unwrap();
//!
//! let authors = ctx.fetch(&FetchRequest::authors()).unwrap();
//! assert_eq!(authors.len(), 1);
//! ```

pub mod browse;
pub mod config;
pub mod edit;
pub mod feed;
pub mod ingest;
pub mod model;
pub mod query;
pub mod storage;
pub mod store;

pub use browse::{BrowseError, Browser, Presenter};
pub use config::SyncConfig;
pub use edit::{EditError, EditSession, MAX_FIELD_LEN};
pub use feed::{FeedClient, FeedError, FeedRecord, HttpFeedClient};
pub use ingest::{AuthorDeduplicator, IngestPipeline, IngestReport};
pub use model::{Author, Commit, EntityId, EntityKind, EntityView, Presentable, Record};
pub use query::{FetchRequest, Filter, QuickFilter};
pub use storage::{OpenStore, RecordStore, SqliteStore, StorageError, StorageResult};
pub use store::{
    ChangeEvent, ManagedContext, MergePolicy, Notification, Store, StoreError, StoreResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
