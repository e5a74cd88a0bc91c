//! ManagedContext: a transactional, owner-confined view onto the store
//!
//! A context registers every record it reads or creates. Changes stay in
//! memory until `save()`, which writes them in one transaction and publishes
//! a single `ChangeEvent`. Records are only ever touched through `&mut self`,
//! so a context belongs to whichever task owns it; other contexts see its
//! changes only after the save, by absorbing the event or re-reading.

use super::merge::MergePolicy;
use super::notify::{ChangeEvent, Notification, Subscription};
use super::{Store, StoreError, StoreResult};
use crate::model::{Author, Commit, EntityId, EntityKind, EntityView, Record, StoredRecord};
use crate::query::FetchRequest;
use crate::storage::{ChangeSet, PendingUpdate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

/// Unique identifier for a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Create a new random ContextId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a context, carried on every event it publishes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextInfo {
    pub id: ContextId,
    /// Human-readable name, e.g. "viewContext" or "importContext"
    pub name: String,
    /// Who writes through this context, e.g. "backgroundTask"
    pub transaction_author: Option<String>,
}

/// One registered record
#[derive(Debug, Clone)]
struct Managed {
    seq: i64,
    /// Last durable value absorbed; `None` for unsaved inserts
    snapshot: Option<Record>,
    current: Record,
    deleted: bool,
}

impl Managed {
    fn clean(stored: StoredRecord) -> Self {
        Self {
            seq: stored.seq,
            snapshot: Some(stored.record.clone()),
            current: stored.record,
            deleted: false,
        }
    }

    fn is_inserted(&self) -> bool {
        self.snapshot.is_none()
    }

    fn is_updated(&self) -> bool {
        !self.deleted && self.snapshot.as_ref().is_some_and(|s| *s != self.current)
    }

    fn has_changes(&self) -> bool {
        self.deleted || self.is_inserted() || self.is_updated()
    }
}

/// A transactional view onto the store, confined to its owner
pub struct ManagedContext {
    info: ContextInfo,
    store: Store,
    merge_policy: MergePolicy,
    objects: HashMap<EntityId, Managed>,
    /// Present when the context absorbs other contexts' saves before reads
    inbox: Option<Subscription>,
}

impl ManagedContext {
    pub(crate) fn new(store: Store, name: impl Into<String>) -> Self {
        Self {
            info: ContextInfo {
                id: ContextId::new(),
                name: name.into(),
                transaction_author: None,
            },
            store,
            merge_policy: MergePolicy::default(),
            objects: HashMap::new(),
            inbox: None,
        }
    }

    /// Tag saves from this context with a transaction author
    pub fn with_transaction_author(mut self, author: impl Into<String>) -> Self {
        self.info.transaction_author = Some(author.into());
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Absorb other contexts' saves before every read
    pub fn automatically_merging_changes(mut self) -> Self {
        if self.inbox.is_none() {
            self.inbox = Some(self.store.subscribe());
        }
        self
    }

    pub fn info(&self) -> &ContextInfo {
        &self.info
    }

    pub fn id(&self) -> ContextId {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// True if anything is waiting to be saved
    pub fn has_changes(&self) -> bool {
        self.objects.values().any(Managed::has_changes)
    }

    // === Reads ===

    /// Look up a live record by ID, loading it from the store if needed
    pub fn record(&mut self, id: &EntityId) -> StoreResult<Option<Record>> {
        self.drain_inbox()?;
        self.lookup(id, false)
    }

    pub fn commit(&mut self, id: &EntityId) -> StoreResult<Option<Commit>> {
        match self.record(id)? {
            Some(Record::Commit(c)) => Ok(Some(c)),
            Some(other) => Err(StoreError::WrongKind {
                expected: EntityKind::Commit,
                found: other.kind(),
            }),
            None => Ok(None),
        }
    }

    pub fn author(&mut self, id: &EntityId) -> StoreResult<Option<Author>> {
        match self.record(id)? {
            Some(Record::Author(a)) => Ok(Some(a)),
            Some(other) => Err(StoreError::WrongKind {
                expected: EntityKind::Author,
                found: other.kind(),
            }),
            None => Ok(None),
        }
    }

    /// Find the author with exactly this name, including unsaved inserts.
    ///
    /// When several authors share the name the earliest inserted wins.
    pub fn find_author_named(&mut self, name: &str) -> StoreResult<Option<Author>> {
        self.drain_inbox()?;
        for stored in self.store.backend().find_authors_named(name)? {
            self.absorb_stored(stored);
        }

        let found = self
            .objects
            .values()
            .filter(|m| !m.deleted)
            .filter_map(|m| m.current.as_author().map(|a| (m.seq, a)))
            .filter(|(_, a)| a.name == name)
            .min_by_key(|(seq, _)| *seq)
            .map(|(_, a)| a.clone());
        Ok(found)
    }

    /// Run a fetch request against this context
    pub fn fetch(&mut self, request: &FetchRequest) -> StoreResult<Vec<EntityView>> {
        request.execute(self)
    }

    /// Number of live records of one kind as seen by this context
    pub fn count(&mut self, kind: EntityKind) -> StoreResult<usize> {
        Ok(self.materialize(kind)?.len())
    }

    /// Every live record of `kind` with its insertion sequence.
    ///
    /// Refreshes registered records from the store first, so the result
    /// reflects the latest durable state overlaid with this context's
    /// pending changes.
    pub(crate) fn materialize(&mut self, kind: EntityKind) -> StoreResult<Vec<(i64, Record)>> {
        self.drain_inbox()?;
        let rows = self.store.backend().load_all(kind)?;
        let durable: HashSet<EntityId> = rows.iter().map(|r| r.record.id()).collect();
        for stored in rows {
            self.absorb_stored(stored);
        }

        // Saved records missing from the store were deleted by someone else
        self.objects.retain(|id, m| {
            m.current.kind() != kind || m.is_inserted() || durable.contains(id)
        });

        Ok(self
            .objects
            .values()
            .filter(|m| !m.deleted && m.current.kind() == kind)
            .map(|m| (m.seq, m.current.clone()))
            .collect())
    }

    /// Resolve a commit's author for display, even if it is pending deletion
    pub(crate) fn author_of(&mut self, commit: &Commit) -> StoreResult<Author> {
        match self.lookup(&commit.author, true)? {
            Some(Record::Author(a)) => Ok(a),
            Some(other) => Err(StoreError::WrongKind {
                expected: EntityKind::Author,
                found: other.kind(),
            }),
            None => Err(StoreError::NotFound(commit.author)),
        }
    }

    fn lookup(&mut self, id: &EntityId, include_deleted: bool) -> StoreResult<Option<Record>> {
        if let Some(m) = self.objects.get(id) {
            if m.deleted && !include_deleted {
                return Ok(None);
            }
            return Ok(Some(m.current.clone()));
        }
        match self.store.backend().load_record(id)? {
            Some(stored) => {
                let record = stored.record.clone();
                self.objects.insert(*id, Managed::clean(stored));
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // === Writes ===

    /// Register a new author; it becomes durable on the next save
    pub fn insert_author(&mut self, author: Author) -> EntityId {
        self.register_insert(Record::Author(author))
    }

    /// Register a new commit. Its author must be resolvable from this context.
    pub fn insert_commit(&mut self, commit: Commit) -> StoreResult<EntityId> {
        match self.lookup(&commit.author, false)? {
            Some(Record::Author(_)) => Ok(self.register_insert(Record::Commit(commit))),
            Some(other) => Err(StoreError::WrongKind {
                expected: EntityKind::Author,
                found: other.kind(),
            }),
            None => Err(StoreError::NotFound(commit.author)),
        }
    }

    fn register_insert(&mut self, record: Record) -> EntityId {
        let id = record.id();
        let seq = self.store.next_seq();
        self.objects.insert(
            id,
            Managed {
                seq,
                snapshot: None,
                current: record,
                deleted: false,
            },
        );
        id
    }

    /// Modify a live record in memory
    pub fn update(&mut self, id: &EntityId, apply: impl FnOnce(&mut Record)) -> StoreResult<()> {
        if self.lookup(id, false)?.is_none() {
            return Err(StoreError::NotFound(*id));
        }
        let managed = self.objects.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        let mut next = managed.current.clone();
        apply(&mut next);
        if next.id() != *id || next.kind() != managed.current.kind() {
            return Err(StoreError::IdentityChanged(*id));
        }
        managed.current = next;
        Ok(())
    }

    pub fn set_commit_message(&mut self, id: &EntityId, message: impl Into<String>) -> StoreResult<()> {
        self.expect_kind(id, EntityKind::Commit)?;
        let message = message.into();
        self.update(id, |record| {
            if let Record::Commit(c) = record {
                c.message = message;
            }
        })
    }

    pub fn set_author_name(&mut self, id: &EntityId, name: impl Into<String>) -> StoreResult<()> {
        self.expect_kind(id, EntityKind::Author)?;
        let name = name.into();
        self.update(id, |record| {
            if let Record::Author(a) = record {
                a.name = name;
            }
        })
    }

    fn expect_kind(&mut self, id: &EntityId, expected: EntityKind) -> StoreResult<()> {
        match self.lookup(id, false)? {
            Some(record) if record.kind() == expected => Ok(()),
            Some(record) => Err(StoreError::WrongKind {
                expected,
                found: record.kind(),
            }),
            None => Err(StoreError::NotFound(*id)),
        }
    }

    /// Mark a record for deletion on the next save.
    ///
    /// Deleting a commit never touches its author.
    pub fn delete(&mut self, id: &EntityId) -> StoreResult<()> {
        if self.lookup(id, false)?.is_none() {
            return Err(StoreError::NotFound(*id));
        }
        let inserted = self.objects.get(id).is_some_and(Managed::is_inserted);
        if inserted {
            self.objects.remove(id);
        } else if let Some(m) = self.objects.get_mut(id) {
            m.deleted = true;
        }
        Ok(())
    }

    /// Discard every pending change
    pub fn rollback(&mut self) {
        self.objects.retain(|_, m| !m.is_inserted());
        for m in self.objects.values_mut() {
            m.deleted = false;
            if let Some(snapshot) = &m.snapshot {
                m.current = snapshot.clone();
            }
        }
    }

    /// Write all pending changes in one transaction.
    ///
    /// Returns the published event, or `None` when there was nothing to
    /// save. On failure nothing is written and the pending changes stay in
    /// the context.
    pub fn save(&mut self) -> StoreResult<Option<ChangeEvent>> {
        let changes = self.pending_changes();
        if changes.is_empty() {
            return Ok(None);
        }

        let receipt = match self
            .store
            .backend()
            .save_changes(&changes, &self.merge_policy)
        {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(context = %self.info.name, error = %e, "context save failed");
                return Err(e.into());
            }
        };

        let mut event = ChangeEvent::new(self.info.clone());
        for id in receipt.inserted {
            if let Some(m) = self.objects.get_mut(&id) {
                m.snapshot = Some(m.current.clone());
            }
            event.inserted.insert(id);
        }
        for stored in receipt.updated {
            let id = stored.record.id();
            if let Some(m) = self.objects.get_mut(&id) {
                m.snapshot = Some(stored.record.clone());
                m.current = stored.record;
            }
            event.updated.insert(id);
        }
        for id in receipt.skipped {
            debug!(context = %self.info.name, %id, "update dropped; record deleted elsewhere");
            self.objects.remove(&id);
        }
        for (_, id) in &changes.deletes {
            self.objects.remove(id);
        }
        for id in receipt.deleted {
            event.deleted.insert(id);
        }

        debug!(
            context = %self.info.name,
            inserted = event.inserted.len(),
            updated = event.updated.len(),
            deleted = event.deleted.len(),
            "context saved"
        );

        if !event.is_empty() {
            self.store.notifier().publish(event.clone());
        }
        Ok(Some(event))
    }

    fn pending_changes(&self) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for m in self.objects.values() {
            if m.deleted {
                changes.deletes.push((m.current.kind(), m.current.id()));
            } else if m.is_inserted() {
                changes.inserts.push(StoredRecord::new(m.seq, m.current.clone()));
            } else if let Some(snapshot) = m.snapshot.as_ref().filter(|s| **s != m.current) {
                changes.updates.push(PendingUpdate {
                    snapshot: snapshot.clone(),
                    current: m.current.clone(),
                });
            }
        }
        // Deterministic write order
        changes.inserts.sort_by_key(|s| s.seq);
        changes
    }

    // === Absorbing other contexts' saves ===

    /// Bring registered records up to date with another context's save
    pub fn absorb(&mut self, event: &ChangeEvent) -> StoreResult<()> {
        if event.source.id == self.info.id {
            return Ok(());
        }
        for id in &event.deleted {
            if self.objects.remove(id).is_some() {
                debug!(context = %self.info.name, %id, "dropped record deleted elsewhere");
            }
        }
        for id in event.inserted.iter().chain(event.updated.iter()) {
            if self.objects.contains_key(id) {
                self.refresh(id)?;
            }
        }
        Ok(())
    }

    /// Re-read every saved record this context holds
    pub fn refresh_all(&mut self) -> StoreResult<()> {
        let ids: Vec<EntityId> = self
            .objects
            .iter()
            .filter(|(_, m)| !m.is_inserted())
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.refresh(&id)?;
        }
        Ok(())
    }

    fn refresh(&mut self, id: &EntityId) -> StoreResult<()> {
        match self.store.backend().load_record(id)? {
            Some(stored) => self.absorb_stored(stored),
            None => {
                if self.objects.get(id).is_some_and(|m| !m.is_inserted()) {
                    self.objects.remove(id);
                }
            }
        }
        Ok(())
    }

    /// Register or rebase one durable record.
    ///
    /// Untouched records take the durable value; records with pending
    /// changes keep them on top of the new durable value.
    fn absorb_stored(&mut self, stored: StoredRecord) {
        let id = stored.record.id();
        let policy = self.merge_policy;
        match self.objects.get_mut(&id) {
            None => {
                self.objects.insert(id, Managed::clean(stored));
            }
            Some(m) => {
                let Some(snapshot) = m.snapshot.as_ref() else {
                    return;
                };
                if *snapshot == stored.record {
                    return;
                }
                m.current = if m.current == *snapshot {
                    stored.record.clone()
                } else {
                    policy.merge(snapshot, &m.current, &stored.record).merged
                };
                m.snapshot = Some(stored.record);
                m.seq = stored.seq;
            }
        }
    }

    fn drain_inbox(&mut self) -> StoreResult<()> {
        let Some(mut inbox) = self.inbox.take() else {
            return Ok(());
        };
        let mut notifications = Vec::new();
        while let Some(n) = inbox.try_recv() {
            notifications.push(n);
        }
        self.inbox = Some(inbox);

        for notification in notifications {
            match notification {
                Notification::Changed(event) => self.absorb(&event)?,
                Notification::Resync => self.refresh_all()?,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ManagedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedContext")
            .field("info", &self.info)
            .field("merge_policy", &self.merge_policy)
            .field("registered", &self.objects.len())
            .field("auto_merge", &self.inbox.is_some())
            .finish()
    }
}
