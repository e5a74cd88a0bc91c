//! Fetch requests: sort + filter over one entity kind

use super::filter::Filter;
use crate::model::{CommitView, EntityKind, EntityView, Record};
use crate::store::{ManagedContext, StoreError, StoreResult};
use chrono::{DateTime, Utc};

/// Read request for one entity kind.
///
/// Results are ordered by date, newest first; records with equal dates keep
/// their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub kind: EntityKind,
    pub filter: Filter,
    /// Reference time for `RecentSince`; defaults to the execution time
    pub now: Option<DateTime<Utc>>,
}

impl FetchRequest {
    /// Create an unfiltered request
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            filter: Filter::None,
            now: None,
        }
    }

    pub fn commits() -> Self {
        Self::new(EntityKind::Commit)
    }

    pub fn authors() -> Self {
        Self::new(EntityKind::Author)
    }

    /// Replace the active filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Evaluate time-relative filters against a fixed instant
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Execute the request against a context
    pub fn execute(&self, ctx: &mut ManagedContext) -> StoreResult<Vec<EntityView>> {
        if !self.filter.applies_to(self.kind) {
            return Err(StoreError::UnsupportedFilter {
                filter: self.filter.to_string(),
                kind: self.kind,
            });
        }
        let now = self.now.unwrap_or_else(Utc::now);

        let mut live = ctx.materialize(self.kind)?;
        live.sort_by(|(seq_a, a), (seq_b, b)| {
            b.sort_date()
                .cmp(&a.sort_date())
                .then_with(|| seq_a.cmp(seq_b))
        });

        let mut views = Vec::new();
        for (_, record) in live {
            match record {
                Record::Commit(commit) => {
                    let author = ctx.author_of(&commit)?;
                    if self.filter.matches_commit(&commit, &author, now) {
                        views.push(EntityView::Commit(CommitView { commit, author }));
                    }
                }
                Record::Author(author) => {
                    if self.filter.matches_author(&author, now) {
                        views.push(EntityView::Author(author));
                    }
                }
            }
        }
        Ok(views)
    }
}
