//! Per-record sanitisation pipeline
//!
//! `Pending → Fetching → Decoding → Normalizing → Encoding → Uploading`,
//! ending in either a success or a failure tagged with the stage's error kind.
//! No stage is retried.

use std::fmt;
use std::time::Duration;

use sanitiser_storage_traits::{ObjectStore, StoreError};

use crate::config::HandlerConfig;
use crate::media_processing::{
    MediaProcessingError, SanitizeOptions, SanitizedImage, decode, encode_sanitized,
    normalize_decoded,
};
use crate::notification::ChangeRecord;
use crate::outcome::{ErrorKind, ProcessingOutcome};

/// Pipeline stage of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Not started
    Pending,
    /// Reading the source object
    Fetching,
    /// Decoding the fetched bytes
    Decoding,
    /// Converting to opaque RGB
    Normalizing,
    /// Re-encoding without metadata
    Encoding,
    /// Writing the sanitised object
    Uploading,
}

impl Stage {
    /// Error kind reported for a failure in this stage
    pub fn failure_kind(self) -> ErrorKind {
        match self {
            Self::Pending => ErrorKind::InvalidRecord,
            Self::Fetching => ErrorKind::FetchFailed,
            Self::Decoding => ErrorKind::DecodeFailed,
            Self::Normalizing | Self::Encoding => ErrorKind::EncodeFailed,
            Self::Uploading => ErrorKind::UploadFailed,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Fetching => write!(f, "fetching"),
            Self::Decoding => write!(f, "decoding"),
            Self::Normalizing => write!(f, "normalizing"),
            Self::Encoding => write!(f, "encoding"),
            Self::Uploading => write!(f, "uploading"),
        }
    }
}

/// A failed record: the stage it failed in and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Stage the record failed in
    pub stage: Stage,
    /// Human readable reason
    pub detail: String,
}

impl From<MediaProcessingError> for RecordFailure {
    fn from(e: MediaProcessingError) -> Self {
        Self::new(e.stage(), e.to_string())
    }
}

impl RecordFailure {
    fn new<S>(stage: Stage, detail: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            stage,
            detail: detail.into(),
        }
    }

    fn from_store(stage: Stage, err: &StoreError) -> Self {
        if err.is_transient() {
            Self::new(stage, format!("{err} (transient)"))
        } else {
            Self::new(stage, err.to_string())
        }
    }

    fn timed_out(stage: Stage, after: Duration) -> Self {
        Self::new(stage, format!("timed out after {after:?} (transient)"))
    }

    /// Convert into the record's outcome
    pub fn into_outcome(self, key: &str) -> ProcessingOutcome {
        ProcessingOutcome::failure(key, self.stage.failure_kind(), self.detail)
    }
}

/// What was written for a successful record
struct Uploaded {
    input_size: usize,
    output_size: usize,
    content_type: &'static str,
    fallback: Option<String>,
}

impl Uploaded {
    fn describe(input_size: usize, sanitized: &SanitizedImage) -> Self {
        Self {
            input_size,
            output_size: sanitized.data.len(),
            content_type: sanitized.mime_type(),
            fallback: sanitized.is_fallback().then(|| {
                format!(
                    "re-encoded {:?} as {:?}",
                    sanitized.source_format, sanitized.format
                )
            }),
        }
    }
}

/// Runs the pipeline for single records against one store and configuration
pub struct RecordSanitizer<'a, S>
where
    S: ObjectStore + ?Sized,
{
    store: &'a S,
    config: &'a HandlerConfig,
}

impl<'a, S> RecordSanitizer<'a, S>
where
    S: ObjectStore + ?Sized,
{
    /// Create a sanitiser over `store`
    pub fn new(store: &'a S, config: &'a HandlerConfig) -> Self {
        Self { store, config }
    }

    /// Process `record` and return its outcome.
    ///
    /// The outcome is a success only once the destination store acknowledged
    /// the write.
    pub async fn run(&self, record: &ChangeRecord) -> ProcessingOutcome {
        let key = record.source_key();
        match self.process(record).await {
            Ok(uploaded) => ProcessingOutcome::success(
                key,
                uploaded.input_size,
                uploaded.output_size,
                uploaded.content_type,
                uploaded.fallback,
            ),
            Err(failure) => failure.into_outcome(key),
        }
    }

    async fn process(&self, record: &ChangeRecord) -> Result<Uploaded, RecordFailure> {
        let bucket = record.source_bucket();
        let key = record.source_key();

        tracing::debug!(bucket, key, stage = %Stage::Fetching, "processing image");
        let data = tokio::time::timeout(self.config.fetch_timeout, self.store.get(bucket, key))
            .await
            .map_err(|_| RecordFailure::timed_out(Stage::Fetching, self.config.fetch_timeout))?
            .map_err(|e| RecordFailure::from_store(Stage::Fetching, &e))?;
        let input_size = data.len();
        tracing::debug!(key, bytes = input_size, "downloaded image");

        // Decode, normalise and encode are CPU bound; the buffer moves into the
        // blocking task and the sanitised image moves back out.
        let options = self.config.sanitize.clone();
        let span = tracing::Span::current();
        let sanitized = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            transform(&data, &options)
        })
        .await
        .map_err(|e| RecordFailure::new(Stage::Encoding, format!("sanitiser task failed: {e}")))??;
        tracing::debug!(
            key,
            stage = %Stage::Uploading,
            format = ?sanitized.format,
            bytes = sanitized.data.len(),
            "sanitised image"
        );

        let uploaded = Uploaded::describe(input_size, &sanitized);
        let destination = self.config.destination_bucket.as_str();
        tokio::time::timeout(
            self.config.upload_timeout,
            self.store.put(destination, key, sanitized.data, uploaded.content_type),
        )
        .await
        .map_err(|_| RecordFailure::timed_out(Stage::Uploading, self.config.upload_timeout))?
        .map_err(|e| RecordFailure::from_store(Stage::Uploading, &e))?;

        Ok(uploaded)
    }
}

/// The decode, normalize and encode stages of one image
fn transform(data: &[u8], options: &SanitizeOptions) -> Result<SanitizedImage, RecordFailure> {
    tracing::debug!(stage = %Stage::Decoding, bytes = data.len(), "decoding image");
    let decoded = decode(data, options)?;
    let source_format = decoded.format;

    tracing::debug!(stage = %Stage::Normalizing, format = ?source_format, "normalizing image");
    let rgb = normalize_decoded(data, decoded, options);

    tracing::debug!(
        stage = %Stage::Encoding,
        width = rgb.width(),
        height = rgb.height(),
        "encoding image"
    );
    encode_sanitized(&rgb, source_format, options).map_err(RecordFailure::from)
}
