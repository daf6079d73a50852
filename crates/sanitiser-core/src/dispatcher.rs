//! Batch dispatch
//!
//! Every entry of a batch is processed in its own isolated future and turned
//! into exactly one [`ProcessingOutcome`]; failures are data, not control flow.
//! Up to `max_concurrency` records are in flight at once and outcomes come
//! back in batch order.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use sanitiser_storage_traits::ObjectStore;
use serde_json::Value;
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::HandlerConfig;
use crate::error::Error;
use crate::notification::{NotificationBatch, RecordEntry};
use crate::outcome::{BatchReport, ErrorKind, ProcessingOutcome};
use crate::sanitizer::{RecordSanitizer, Stage};

/// The sanitisation handler: owns the store and the configuration
pub struct SanitiserHandler<S>
where
    S: ObjectStore + ?Sized,
{
    store: Arc<S>,
    config: HandlerConfig,
}

impl<S> SanitiserHandler<S>
where
    S: ObjectStore + ?Sized,
{
    /// Create a handler reading and writing through `store`
    pub fn new(store: Arc<S>, config: HandlerConfig) -> Self {
        Self { store, config }
    }

    /// Handler configuration
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Store used for reads and writes
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Parse a raw payload and process every record in it.
    ///
    /// Records not started before `deadline` are reported as
    /// [`ErrorKind::DeadlineExceeded`] and left for redelivery.
    ///
    /// # Errors
    /// * `BatchMalformed` - If the payload is not a batch; no record is touched
    pub async fn handle_payload(
        &self,
        payload: &Value,
        deadline: Option<Instant>,
    ) -> Result<BatchReport, Error> {
        let batch = NotificationBatch::from_value(payload).inspect_err(|e| {
            tracing::error!(error = %e, "rejecting notification batch");
        })?;
        Ok(self.dispatch(batch, deadline).await)
    }

    /// Process every entry of `batch`, returning one outcome per entry in order
    pub async fn dispatch(
        &self,
        batch: NotificationBatch,
        deadline: Option<Instant>,
    ) -> BatchReport {
        let records = batch.len();
        tracing::info!(records, "received notification batch");

        if batch.is_empty() {
            return BatchReport::new(Vec::new());
        }

        let span = tracing::info_span!("sanitise_batch", records);
        let outcomes: Vec<ProcessingOutcome> = stream::iter(batch.into_entries())
            .map(|entry| self.process_entry(entry, deadline))
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .instrument(span)
            .await;

        let report = BatchReport::new(outcomes);
        tracing::info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "notification batch processed"
        );
        report
    }

    async fn process_entry(
        &self,
        entry: RecordEntry,
        deadline: Option<Instant>,
    ) -> ProcessingOutcome {
        let outcome = match entry {
            RecordEntry::Invalid { key, reason } => {
                ProcessingOutcome::failure(key, Stage::Pending.failure_kind(), reason)
            }
            RecordEntry::Valid(record) if deadline.is_some_and(|d| Instant::now() >= d) => {
                ProcessingOutcome::failure(
                    record.source_key(),
                    ErrorKind::DeadlineExceeded,
                    "not started before the invocation deadline; left for redelivery",
                )
            }
            RecordEntry::Valid(record) => {
                let span = tracing::info_span!(
                    "sanitise_record",
                    bucket = record.source_bucket(),
                    key = record.source_key()
                );
                RecordSanitizer::new(self.store.as_ref(), &self.config)
                    .run(&record)
                    .instrument(span)
                    .await
            }
        };
        outcome.log();
        outcome
    }
}
