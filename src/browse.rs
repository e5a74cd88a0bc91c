//! Foreground browser over the view context
//!
//! Holds the active entity kind, the active filter and the last result
//! list. Row indices refer to that list. Changes saved by other contexts
//! arrive through `next_change`, which absorbs them and reloads.

use crate::edit::{EditError, EditSession};
use crate::model::{EntityKind, EntityView};
use crate::query::{FetchRequest, Filter, QuickFilter};
use crate::store::{ChangeEvent, ManagedContext, Notification, Store, StoreError, Subscription};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from browser operations
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("No row {row}; {len} rows are shown")]
    NoSuchRow { row: usize, len: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Result type for browser operations
pub type BrowseResult<T> = Result<T, BrowseError>;

/// Receives the rows after every reload
pub trait Presenter {
    fn present(&mut self, kind: EntityKind, rows: &[EntityView]);
}

pub struct Browser {
    ctx: ManagedContext,
    kind: EntityKind,
    filter: Filter,
    items: Vec<EntityView>,
    changes: Subscription,
}

impl Browser {
    /// Browse commits, unfiltered, through the store's view context
    pub fn new(store: &Store) -> Self {
        Self {
            ctx: store.view_context(),
            kind: EntityKind::Commit,
            filter: Filter::None,
            items: Vec::new(),
            changes: store.subscribe(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Rows from the last reload
    pub fn items(&self) -> &[EntityView] {
        &self.items
    }

    pub fn row(&self, row: usize) -> BrowseResult<&EntityView> {
        self.items.get(row).ok_or(BrowseError::NoSuchRow {
            row,
            len: self.items.len(),
        })
    }

    pub fn context(&mut self) -> &mut ManagedContext {
        &mut self.ctx
    }

    /// Re-run the active request
    pub fn reload(&mut self) -> BrowseResult<&[EntityView]> {
        let request = FetchRequest::new(self.kind).with_filter(self.filter.clone());
        self.items = self.ctx.fetch(&request)?;
        debug!(kind = %self.kind, filter = %self.filter, rows = self.items.len(), "browser reloaded");
        Ok(self.items.as_slice())
    }

    /// Switch entity kind; the filter is cleared
    pub fn show(&mut self, kind: EntityKind) -> BrowseResult<&[EntityView]> {
        self.kind = kind;
        self.filter = Filter::None;
        self.reload()
    }

    /// Replace the filter, keeping the old one if it does not apply
    pub fn set_filter(&mut self, filter: Filter) -> BrowseResult<&[EntityView]> {
        if !filter.applies_to(self.kind) {
            return Err(StoreError::UnsupportedFilter {
                filter: filter.to_string(),
                kind: self.kind,
            }
            .into());
        }
        self.filter = filter;
        self.reload()
    }

    /// Search by message (commits) or name (authors); empty text clears
    pub fn set_search_text(&mut self, text: &str) -> BrowseResult<&[EntityView]> {
        self.set_filter(Filter::search(self.kind, text))
    }

    pub fn apply_quick_filter(&mut self, quick: QuickFilter) -> BrowseResult<&[EntityView]> {
        self.set_filter(quick.filter())
    }

    /// Delete the record shown at `row` and save.
    ///
    /// A failed save is rolled back in the view context and returned.
    pub fn delete(&mut self, row: usize) -> BrowseResult<Option<ChangeEvent>> {
        let id = self.row(row)?.id();
        self.ctx.delete(&id)?;
        let event = match self.ctx.save() {
            Ok(event) => event,
            Err(e) => {
                warn!(%id, error = %e, "delete failed; rolling back");
                self.ctx.rollback();
                return Err(e.into());
            }
        };
        self.reload()?;
        Ok(event)
    }

    /// Open an edit session for the record shown at `row`
    pub fn begin_edit(&mut self, row: usize) -> BrowseResult<EditSession> {
        let id = self.row(row)?.id();
        Ok(EditSession::begin(&mut self.ctx, &id)?)
    }

    /// Save an edit session through the view context and reload
    pub fn save_edit(&mut self, session: &EditSession) -> BrowseResult<Option<ChangeEvent>> {
        let event = match session.save(&mut self.ctx) {
            Ok(event) => event,
            Err(e) => {
                warn!(id = %session.target(), error = %e, "edit failed; rolling back");
                self.ctx.rollback();
                return Err(e.into());
            }
        };
        self.reload()?;
        Ok(event)
    }

    /// Wait for the next saved change, then reload.
    ///
    /// Returns `None` once the store has shut down.
    pub async fn next_change(&mut self) -> BrowseResult<Option<Notification>> {
        let Some(notification) = self.changes.recv().await else {
            return Ok(None);
        };
        if let Notification::Resync = notification {
            self.ctx.refresh_all()?;
        }
        self.reload()?;
        Ok(Some(notification))
    }

    /// Hand the current rows to a presenter
    pub fn present(&self, presenter: &mut dyn Presenter) {
        presenter.present(self.kind, &self.items);
    }
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("kind", &self.kind)
            .field("filter", &self.filter)
            .field("rows", &self.items.len())
            .finish()
    }
}
