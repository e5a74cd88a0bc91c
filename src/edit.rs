//! Bounded single-field edits of a commit message or an author name

use crate::model::{CommitView, EntityId, EntityKind, Presentable, Record};
use crate::store::{ChangeEvent, ManagedContext, StoreError};
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

/// Longest text an edit session accepts, in characters
pub const MAX_FIELD_LEN: usize = 50;

/// Why an edit was rejected or could not be saved
#[derive(Debug, Error)]
pub enum EditError {
    #[error("Record not found: {0}")]
    NotFound(EntityId),

    #[error("Edit would make the text {len} characters long (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Range {start}..{end} is outside text of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for edit sessions
pub type EditResult<T> = Result<T, EditError>;

/// The one field an edit session writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    CommitMessage,
    AuthorName,
}

impl EditField {
    fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Commit => Self::CommitMessage,
            EntityKind::Author => Self::AuthorName,
        }
    }
}

/// Working copy of one editable field.
///
/// Every accepted change keeps the text within `MAX_FIELD_LEN` characters;
/// rejected changes leave it untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    target: EntityId,
    field: EditField,
    text: String,
    detail: String,
}

impl EditSession {
    /// Start editing an existing commit or author
    pub fn begin(ctx: &mut ManagedContext, id: &EntityId) -> EditResult<Self> {
        let record = ctx.record(id)?.ok_or(EditError::NotFound(*id))?;
        let (current, detail) = match &record {
            Record::Commit(commit) => {
                let author = ctx.author_of(commit)?;
                let view = CommitView {
                    commit: commit.clone(),
                    author,
                };
                (commit.message.clone(), view.subtitle())
            }
            Record::Author(author) => (author.name.clone(), author.subtitle()),
        };

        Ok(Self {
            target: *id,
            field: EditField::for_kind(record.kind()),
            text: current.chars().take(MAX_FIELD_LEN).collect(),
            detail,
        })
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn field(&self) -> EditField {
        self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Read-only context line: "By ... on ..." or the author's email
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Length of the working text in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the characters in `range` with `replacement`
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> EditResult<()> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(EditError::InvalidRange {
                start: range.start,
                end: range.end,
                len,
            });
        }
        let new_len = len - (range.end - range.start) + replacement.chars().count();
        if new_len > MAX_FIELD_LEN {
            return Err(EditError::TooLong {
                len: new_len,
                max: MAX_FIELD_LEN,
            });
        }

        let mut next: String = self.text.chars().take(range.start).collect();
        next.push_str(replacement);
        next.extend(self.text.chars().skip(range.end));
        self.text = next;
        Ok(())
    }

    /// Replace the whole text
    pub fn set_text(&mut self, text: &str) -> EditResult<()> {
        let len = self.len();
        self.replace_range(0..len, text)
    }

    /// Write the text into the field and save the context.
    ///
    /// On failure the session keeps its text and the error is returned.
    pub fn save(&self, ctx: &mut ManagedContext) -> EditResult<Option<ChangeEvent>> {
        match self.field {
            EditField::CommitMessage => ctx.set_commit_message(&self.target, self.text.as_str())?,
            EditField::AuthorName => ctx.set_author_name(&self.target, self.text.as_str())?,
        }
        let event = ctx.save()?;
        debug!(id = %self.target, field = ?self.field, "edit saved");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, Commit};
    use crate::store::Store;
    use chrono::Utc;

    fn seeded(message: &str) -> (Store, EntityId, EntityId) {
        let store = Store::open_in_memory().unwrap();
        let mut ctx = store.new_context("seed");
        let author = ctx.insert_author(Author::new("Ann", "ann@example.com", Utc::now()));
        let commit = ctx
            .insert_commit(Commit::new("abc", "https://x/abc", message, Utc::now(), author))
            .unwrap();
        ctx.save().unwrap();
        (store, author, commit)
    }

    #[test]
    fn initial_text_is_truncated() {
        let long = "x".repeat(80);
        let (store, _, commit) = seeded(&long);
        let mut ctx = store.view_context();

        let session = EditSession::begin(&mut ctx, &commit).unwrap();
        assert_eq!(session.len(), MAX_FIELD_LEN);
        assert_eq!(session.field(), EditField::CommitMessage);
        assert!(session.detail().starts_with("By Ann on "));
    }

    #[test]
    fn edits_beyond_the_limit_are_rejected() {
        let (store, _, commit) = seeded("Fix crash");
        let mut ctx = store.view_context();
        let mut session = EditSession::begin(&mut ctx, &commit).unwrap();

        let result = session.set_text(&"y".repeat(51));
        assert!(matches!(result, Err(EditError::TooLong { len: 51, max: 50 })));
        assert_eq!(session.text(), "Fix crash");

        session.set_text(&"y".repeat(50)).unwrap();
        assert_eq!(session.len(), 50);
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let (store, _, commit) = seeded("Fix");
        let mut ctx = store.view_context();
        let mut session = EditSession::begin(&mut ctx, &commit).unwrap();

        assert!(matches!(
            session.replace_range(2..5, "x"),
            Err(EditError::InvalidRange { start: 2, end: 5, len: 3 })
        ));
        session.replace_range(3..3, "ed crash").unwrap();
        assert_eq!(session.text(), "Fixed crash");
    }

    #[test]
    fn ranges_count_characters_not_bytes() {
        let (store, _, commit) = seeded("café ok");
        let mut ctx = store.view_context();
        let mut session = EditSession::begin(&mut ctx, &commit).unwrap();

        session.replace_range(4..7, "!").unwrap();
        assert_eq!(session.text(), "café!");
    }

    #[test]
    fn save_persists_commit_message() {
        let (store, _, commit) = seeded("Fix crash");
        let mut ctx = store.view_context();
        let mut session = EditSession::begin(&mut ctx, &commit).unwrap();
        session.set_text("Fix crash on launch").unwrap();

        let event = session.save(&mut ctx).unwrap().unwrap();
        assert!(event.updated.contains(&commit));

        let mut fresh = store.new_context("fresh");
        assert_eq!(fresh.commit(&commit).unwrap().unwrap().message, "Fix crash on launch");
    }

    #[test]
    fn save_persists_author_name() {
        let (store, author, _) = seeded("Fix crash");
        let mut ctx = store.view_context();
        let mut session = EditSession::begin(&mut ctx, &author).unwrap();
        assert_eq!(session.field(), EditField::AuthorName);
        assert_eq!(session.detail(), "ann@example.com");

        session.set_text("Ann B.").unwrap();
        session.save(&mut ctx).unwrap();

        let mut fresh = store.new_context("fresh");
        assert_eq!(fresh.author(&author).unwrap().unwrap().name, "Ann B.");
    }

    #[test]
    fn save_of_a_deleted_record_fails_and_keeps_text() {
        let (store, _, commit) = seeded("Fix crash");
        let mut ctx = store.new_context("editor");
        let mut session = EditSession::begin(&mut ctx, &commit).unwrap();
        session.set_text("draft").unwrap();

        let mut other = store.new_context("other");
        other.delete(&commit).unwrap();
        other.save().unwrap();
        ctx.refresh_all().unwrap();

        assert!(matches!(
            session.save(&mut ctx),
            Err(EditError::Store(StoreError::NotFound(_)))
        ));
        assert_eq!(session.text(), "draft");
        assert_eq!(store.count(EntityKind::Commit).unwrap(), 0);
    }

    #[test]
    fn missing_record_cannot_be_edited() {
        let store = Store::open_in_memory().unwrap();
        let mut ctx = store.view_context();
        let missing = EntityId::new();
        assert!(matches!(
            EditSession::begin(&mut ctx, &missing),
            Err(EditError::NotFound(id)) if id == missing
        ));
    }
}
