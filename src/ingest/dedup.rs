//! Author deduplication by exact name

use crate::model::Author;
use crate::store::{ManagedContext, StoreResult};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Outcome of resolving one author name
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub author: Author,
    /// True if the author was inserted by this resolution
    pub created: bool,
}

/// Finds or creates the single author for a name.
///
/// Matching is exact and case-sensitive. An existing author is returned
/// unchanged; the fallback email and date only seed new authors.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorDeduplicator;

impl AuthorDeduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        ctx: &mut ManagedContext,
        name: &str,
        fallback_email: &str,
        fallback_date: DateTime<Utc>,
    ) -> StoreResult<Resolution> {
        if let Some(author) = ctx.find_author_named(name)? {
            debug!(author = name, id = %author.id, "reusing author");
            return Ok(Resolution {
                author,
                created: false,
            });
        }

        let author = Author::new(name, fallback_email, fallback_date);
        ctx.insert_author(author.clone());
        debug!(author = name, id = %author.id, "created author");
        Ok(Resolution {
            author,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use crate::store::Store;
    use chrono::TimeZone;

    #[test]
    fn second_resolution_reuses_unsaved_author() {
        let store = Store::open_in_memory().unwrap();
        let mut ctx = store.new_background_context();
        let dedup = AuthorDeduplicator::new();

        let first = dedup
            .resolve(&mut ctx, "Ann", "ann@example.com", Utc::now())
            .unwrap();
        let second = dedup
            .resolve(&mut ctx, "Ann", "other@example.com", Utc::now())
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.author.id, second.author.id);
        assert_eq!(second.author.email, "ann@example.com");
        assert_eq!(ctx.count(EntityKind::Author).unwrap(), 1);
    }

    #[test]
    fn existing_author_is_never_overwritten() {
        let store = Store::open_in_memory().unwrap();
        let seen = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut seed = store.new_context("seed");
        let existing = seed.insert_author(Author::new("Ann", "ann@example.com", seen));
        seed.save().unwrap();

        let mut ctx = store.new_background_context();
        let resolved = AuthorDeduplicator::new()
            .resolve(&mut ctx, "Ann", "new@example.com", Utc::now())
            .unwrap();

        assert!(!resolved.created);
        assert_eq!(resolved.author.id, existing);
        assert_eq!(resolved.author.email, "ann@example.com");
        assert_eq!(resolved.author.last_seen, seen);
        assert!(!ctx.has_changes());
    }

    #[test]
    fn matching_is_case_sensitive() {
        let store = Store::open_in_memory().unwrap();
        let mut ctx = store.new_background_context();
        let dedup = AuthorDeduplicator::new();

        dedup.resolve(&mut ctx, "Ann", "a@example.com", Utc::now()).unwrap();
        let lower = dedup.resolve(&mut ctx, "ann", "a@example.com", Utc::now()).unwrap();

        assert!(lower.created);
        assert_eq!(ctx.count(EntityKind::Author).unwrap(), 2);
    }
}
