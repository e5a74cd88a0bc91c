//! SQLite storage backend

use super::traits::{
    ChangeSet, MergeResolver, OpenStore, RecordStore, SaveReceipt, StorageError, StorageResult,
};
use crate::model::{Author, Commit, EntityId, EntityKind, Record, StoredRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed record store
///
/// Uses a single SQLite database file with one table per entity kind and a
/// `commits.author_id → authors.id` foreign key. Thread-safe via internal
/// mutex on the connection; every `save_changes` call runs in one
/// transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Raw `authors` row
struct AuthorRow {
    id: String,
    seq: i64,
    name: String,
    email: String,
    last_seen: String,
}

impl AuthorRow {
    const COLUMNS: &'static str = "id, seq, name, email, last_seen";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            seq: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            last_seen: row.get(4)?,
        })
    }

    fn into_stored(self) -> StorageResult<StoredRecord> {
        Ok(StoredRecord::new(
            self.seq,
            Record::Author(Author {
                id: parse_id("authors", &self.id)?,
                name: self.name,
                email: self.email,
                last_seen: parse_date(&self.last_seen)?,
            }),
        ))
    }
}

/// Raw `commits` row
struct CommitRow {
    id: String,
    seq: i64,
    sha: String,
    url: String,
    message: String,
    date: String,
    author_id: String,
}

impl CommitRow {
    const COLUMNS: &'static str = "id, seq, sha, url, message, date, author_id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            seq: row.get(1)?,
            sha: row.get(2)?,
            url: row.get(3)?,
            message: row.get(4)?,
            date: row.get(5)?,
            author_id: row.get(6)?,
        })
    }

    fn into_stored(self) -> StorageResult<StoredRecord> {
        Ok(StoredRecord::new(
            self.seq,
            Record::Commit(Commit {
                id: parse_id("commits", &self.id)?,
                sha: self.sha,
                url: self.url,
                message: self.message,
                date: parse_date(&self.date)?,
                author: parse_id("commits", &self.author_id)?,
            }),
        ))
    }
}

fn parse_id(table: &'static str, raw: &str) -> StorageResult<EntityId> {
    EntityId::parse(raw).map_err(|e| StorageError::CorruptRow {
        table,
        reason: format!("bad id '{}': {}", raw, e),
    })
}

fn parse_date(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StorageError::DateParse(e.to_string()))
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Authors: identity is the exact name, but no uniqueness is enforced
            -- so manual renames can never fail a save
            CREATE TABLE IF NOT EXISTS authors (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                last_seen TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_authors_name ON authors(name);

            -- Commits: sha is deliberately not unique
            CREATE TABLE IF NOT EXISTS commits (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                sha TEXT NOT NULL,
                url TEXT NOT NULL,
                message TEXT NOT NULL,
                date TEXT NOT NULL,
                author_id TEXT NOT NULL,
                FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE RESTRICT
            );

            CREATE INDEX IF NOT EXISTS idx_commits_author ON commits(author_id);

            PRAGMA foreign_keys = ON;
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn load_in(conn: &Connection, id: &EntityId) -> StorageResult<Option<StoredRecord>> {
        let author = conn
            .query_row(
                &format!("SELECT {} FROM authors WHERE id = ?1", AuthorRow::COLUMNS),
                params![id.to_string()],
                AuthorRow::from_row,
            )
            .optional()?;
        if let Some(row) = author {
            return row.into_stored().map(Some);
        }

        let commit = conn
            .query_row(
                &format!("SELECT {} FROM commits WHERE id = ?1", CommitRow::COLUMNS),
                params![id.to_string()],
                CommitRow::from_row,
            )
            .optional()?;
        commit.map(CommitRow::into_stored).transpose()
    }

    fn insert_in(conn: &Connection, stored: &StoredRecord) -> StorageResult<()> {
        match &stored.record {
            Record::Author(a) => {
                conn.execute(
                    "INSERT INTO authors (id, seq, name, email, last_seen) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        a.id.to_string(),
                        stored.seq,
                        a.name,
                        a.email,
                        a.last_seen.to_rfc3339(),
                    ],
                )?;
            }
            Record::Commit(c) => {
                conn.execute(
                    r#"
                    INSERT INTO commits (id, seq, sha, url, message, date, author_id)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        c.id.to_string(),
                        stored.seq,
                        c.sha,
                        c.url,
                        c.message,
                        c.date.to_rfc3339(),
                        c.author.to_string(),
                    ],
                )?;
            }
        }
        Ok(())
    }

    fn update_in(conn: &Connection, record: &Record) -> StorageResult<()> {
        match record {
            Record::Author(a) => {
                conn.execute(
                    "UPDATE authors SET name = ?2, email = ?3, last_seen = ?4 WHERE id = ?1",
                    params![a.id.to_string(), a.name, a.email, a.last_seen.to_rfc3339()],
                )?;
            }
            Record::Commit(c) => {
                conn.execute(
                    r#"
                    UPDATE commits
                    SET sha = ?2, url = ?3, message = ?4, date = ?5, author_id = ?6
                    WHERE id = ?1
                    "#,
                    params![
                        c.id.to_string(),
                        c.sha,
                        c.url,
                        c.message,
                        c.date.to_rfc3339(),
                        c.author.to_string(),
                    ],
                )?;
            }
        }
        Ok(())
    }

    fn delete_in(conn: &Connection, kind: EntityKind, id: &EntityId) -> StorageResult<bool> {
        let sql = match kind {
            EntityKind::Commit => "DELETE FROM commits WHERE id = ?1",
            EntityKind::Author => "DELETE FROM authors WHERE id = ?1",
        };
        let rows = conn.execute(sql, params![id.to_string()])?;
        Ok(rows > 0)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // WAL keeps readers unblocked while a batch is being written
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl RecordStore for SqliteStore {
    fn load_all(&self, kind: EntityKind) -> StorageResult<Vec<StoredRecord>> {
        let conn = self.lock()?;
        match kind {
            EntityKind::Author => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM authors ORDER BY seq",
                    AuthorRow::COLUMNS
                ))?;
                let records = stmt
                    .query_map([], AuthorRow::from_row)?
                    .map(|r| r.map_err(StorageError::from).and_then(AuthorRow::into_stored))
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(records)
            }
            EntityKind::Commit => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM commits ORDER BY seq",
                    CommitRow::COLUMNS
                ))?;
                let records = stmt
                    .query_map([], CommitRow::from_row)?
                    .map(|r| r.map_err(StorageError::from).and_then(CommitRow::into_stored))
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(records)
            }
        }
    }

    fn load_record(&self, id: &EntityId) -> StorageResult<Option<StoredRecord>> {
        let conn = self.lock()?;
        Self::load_in(&conn, id)
    }

    fn find_authors_named(&self, name: &str) -> StorageResult<Vec<StoredRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM authors WHERE name = ?1 ORDER BY seq",
            AuthorRow::COLUMNS
        ))?;
        let records = stmt
            .query_map(params![name], AuthorRow::from_row)?
            .map(|r| r.map_err(StorageError::from).and_then(AuthorRow::into_stored))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(records)
    }

    fn count(&self, kind: EntityKind) -> StorageResult<usize> {
        let conn = self.lock()?;
        let sql = match kind {
            EntityKind::Commit => "SELECT COUNT(*) FROM commits",
            EntityKind::Author => "SELECT COUNT(*) FROM authors",
        };
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn max_seq(&self) -> StorageResult<i64> {
        let conn = self.lock()?;
        let seq: i64 = conn.query_row(
            r#"
            SELECT COALESCE(MAX(seq), 0) FROM (
                SELECT seq FROM authors
                UNION ALL
                SELECT seq FROM commits
            )
            "#,
            [],
            |row| row.get(0),
        )?;
        Ok(seq)
    }

    fn save_changes(
        &self,
        changes: &ChangeSet,
        resolver: &dyn MergeResolver,
    ) -> StorageResult<SaveReceipt> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut receipt = SaveReceipt::default();

        // Authors before commits so new commits can reference new authors
        let (authors, commits): (Vec<&StoredRecord>, Vec<&StoredRecord>) = changes
            .inserts
            .iter()
            .partition(|s| s.record.kind() == EntityKind::Author);
        for stored in authors.into_iter().chain(commits) {
            Self::insert_in(&tx, stored)?;
            receipt.inserted.push(stored.record.id());
        }

        for pending in &changes.updates {
            let Some(durable) = Self::load_in(&tx, &pending.id())? else {
                receipt.skipped.push(pending.id());
                continue;
            };
            let merged = resolver.resolve(pending, &durable.record);
            Self::update_in(&tx, &merged)?;
            receipt.updated.push(StoredRecord::new(durable.seq, merged));
        }

        // Commits before authors; a still-referenced author aborts the save
        let ordered = changes
            .deletes
            .iter()
            .filter(|(kind, _)| *kind == EntityKind::Commit)
            .chain(changes.deletes.iter().filter(|(kind, _)| *kind == EntityKind::Author));
        for (kind, id) in ordered {
            if Self::delete_in(&tx, *kind, id)? {
                receipt.deleted.push(*id);
            }
        }

        tx.commit()?;
        Ok(receipt)
    }
}
