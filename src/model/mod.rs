//! Core record types: commits, authors, and the views handed to presenters

mod author;
mod commit;
mod entity;
mod view;

pub use author::Author;
pub use commit::Commit;
pub use entity::{EntityId, EntityKind, Property, Record, StoredRecord};
pub use view::{CommitView, EntityView, Presentable};
