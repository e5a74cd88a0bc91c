//! Query system for reading back ordered, filtered views
//!
//! Queries are built from a `FetchRequest` (entity kind plus one `Filter`)
//! and executed against a `ManagedContext`, so results include that
//! context's unsaved changes.

mod fetch;
mod filter;

pub use fetch::FetchRequest;
pub use filter::{Filter, QuickFilter};
