//! Batch ingestion of feed records
//!
//! One batch is processed in a fresh background context: every record
//! becomes a commit, authors are resolved by name within the same context,
//! and a single save makes the whole batch visible at once.

use super::dedup::AuthorDeduplicator;
use crate::feed::{FeedClient, FeedRecord, FetchOptions};
use crate::model::Commit;
use crate::store::{ChangeEvent, Store, StoreError, StoreResult};
use chrono::Utc;
use tracing::{debug, info};

/// Summary of one ingested batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub records_seen: usize,
    pub commits_inserted: usize,
    pub authors_created: usize,
    pub authors_reused: usize,
    /// The event published by the batch save; `None` when nothing was saved
    pub event: Option<ChangeEvent>,
}

/// Turns feed records into durable commits and authors
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    store: Store,
    dedup: AuthorDeduplicator,
}

impl IngestPipeline {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            dedup: AuthorDeduplicator::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Ingest one batch in a new background context.
    ///
    /// Records are processed in order. Either the whole batch is saved or,
    /// on a store failure, nothing is.
    pub fn ingest(&self, records: &[FeedRecord]) -> StoreResult<IngestReport> {
        let mut report = IngestReport {
            records_seen: records.len(),
            ..Default::default()
        };
        if records.is_empty() {
            debug!("empty batch; nothing to ingest");
            return Ok(report);
        }

        let mut ctx = self.store.new_background_context();
        for record in records {
            let date = record.parsed_date().unwrap_or_else(|| {
                debug!(sha = %record.sha, date = %record.commit.author.date, "unparsable commit date; using now");
                Utc::now()
            });

            let resolution = self.dedup.resolve(
                &mut ctx,
                record.author_name(),
                &record.commit.author.email,
                date,
            )?;
            if resolution.created {
                report.authors_created += 1;
            } else {
                report.authors_reused += 1;
            }

            ctx.insert_commit(Commit::new(
                record.sha.as_str(),
                record.url.as_str(),
                record.commit.message.as_str(),
                date,
                resolution.author.id,
            ))?;
            report.commits_inserted += 1;
        }

        report.event = ctx.save()?;
        debug!(
            commits = report.commits_inserted,
            authors_created = report.authors_created,
            authors_reused = report.authors_reused,
            "batch saved"
        );
        Ok(report)
    }

    /// Fetch one page from the feed and ingest it on a blocking worker.
    ///
    /// Feed failures read as an empty batch; store failures are returned.
    pub async fn sync(&self, client: &dyn FeedClient) -> StoreResult<IngestReport> {
        let records = client.fetch_or_empty(&FetchOptions::default()).await;
        let pipeline = self.clone();
        let report = tokio::task::spawn_blocking(move || pipeline.ingest(&records))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        info!(
            records = report.records_seen,
            commits = report.commits_inserted,
            new_authors = report.authors_created,
            "sync finished"
        );
        Ok(report)
    }
}
