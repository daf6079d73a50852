//! Per-record processing outcomes and the batch report

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a record failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The record is not a well-formed object-creation notification
    InvalidRecord,
    /// The source object could not be read
    FetchFailed,
    /// The source object is not a decodable image
    DecodeFailed,
    /// The image could not be re-encoded without metadata
    EncodeFailed,
    /// The sanitised image could not be written
    UploadFailed,
    /// The record was not started before the invocation deadline
    DeadlineExceeded,
}

impl ErrorKind {
    /// Stable name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRecord => "InvalidRecord",
            Self::FetchFailed => "FetchFailed",
            Self::DecodeFailed => "DecodeFailed",
            Self::EncodeFailed => "EncodeFailed",
            Self::UploadFailed => "UploadFailed",
            Self::DeadlineExceeded => "DeadlineExceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The sanitised image was uploaded
    Success,
    /// The record failed at some stage
    Failure,
}

/// The result of processing one change record.
///
/// Built once through [`ProcessingOutcome::success`] or
/// [`ProcessingOutcome::failure`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    key: String,
    status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

impl ProcessingOutcome {
    /// A confirmed upload of `output_size` bytes under `key`
    pub fn success<K>(
        key: K,
        input_size: usize,
        output_size: usize,
        content_type: &str,
        detail: Option<String>,
    ) -> Self
    where
        K: Into<String>,
    {
        Self {
            key: key.into(),
            status: OutcomeStatus::Success,
            error_kind: None,
            detail,
            input_size: Some(input_size),
            output_size: Some(output_size),
            content_type: Some(content_type.to_string()),
        }
    }

    /// A failure of kind `error_kind`
    pub fn failure<K, D>(key: K, error_kind: ErrorKind, detail: D) -> Self
    where
        K: Into<String>,
        D: Into<String>,
    {
        Self {
            key: key.into(),
            status: OutcomeStatus::Failure,
            error_kind: Some(error_kind),
            detail: Some(detail.into()),
            input_size: None,
            output_size: None,
            content_type: None,
        }
    }

    /// Object key of the record (same in source and destination)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Outcome status
    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    /// Whether the record succeeded
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Failure kind, `None` on success
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Human readable detail
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Size of the fetched source object
    pub fn input_size(&self) -> Option<usize> {
        self.input_size
    }

    /// Size of the uploaded sanitised object
    pub fn output_size(&self) -> Option<usize> {
        self.output_size
    }

    /// Content type of the uploaded sanitised object
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Emit the outcome as one structured log event
    pub fn log(&self) {
        match self.status {
            OutcomeStatus::Success => tracing::info!(
                key = %self.key,
                status = "success",
                input_size = self.input_size,
                output_size = self.output_size,
                content_type = self.content_type.as_deref(),
                detail = self.detail.as_deref(),
                "image sanitised"
            ),
            OutcomeStatus::Failure => tracing::error!(
                key = %self.key,
                status = "failure",
                error_kind = self.error_kind.map(|k| k.as_str()),
                detail = self.detail.as_deref(),
                "image sanitisation failed"
            ),
        }
    }
}

/// What the handler returns for a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of outcomes (always the number of records in the batch)
    pub processed: usize,
    /// Number of successful outcomes
    pub succeeded: usize,
    /// Number of failed outcomes
    pub failed: usize,
    /// One outcome per record, in batch order
    pub results: Vec<ProcessingOutcome>,
}

impl BatchReport {
    /// Build a report from outcomes in batch order
    pub fn new(results: Vec<ProcessingOutcome>) -> Self {
        let succeeded = results.iter().filter(|o| o.is_success()).count();
        Self {
            processed: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::FetchFailed.to_string(), "FetchFailed");
        assert_eq!(ErrorKind::DecodeFailed.as_str(), "DecodeFailed");
        assert_eq!(
            serde_json::to_value(ErrorKind::UploadFailed).unwrap(),
            json!("UploadFailed")
        );
    }

    #[test]
    fn test_success_serialization() {
        let outcome = ProcessingOutcome::success("a.jpg", 100, 80, "image/jpeg", None);
        assert!(outcome.is_success());
        assert_eq!(outcome.error_kind(), None);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "key": "a.jpg",
                "status": "success",
                "inputSize": 100,
                "outputSize": 80,
                "contentType": "image/jpeg"
            })
        );
    }

    #[test]
    fn test_failure_serialization() {
        let outcome = ProcessingOutcome::failure("b.png", ErrorKind::DecodeFailed, "bad bytes");
        assert!(!outcome.is_success());
        assert_eq!(outcome.status(), OutcomeStatus::Failure);
        assert_eq!(outcome.detail(), Some("bad bytes"));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "key": "b.png",
                "status": "failure",
                "errorKind": "DecodeFailed",
                "detail": "bad bytes"
            })
        );
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport::new(vec![
            ProcessingOutcome::success("a", 1, 1, "image/png", None),
            ProcessingOutcome::failure("b", ErrorKind::FetchFailed, "missing"),
            ProcessingOutcome::failure("c", ErrorKind::UploadFailed, "denied"),
        ]);
        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.results[1].key(), "b");
    }

    #[test]
    fn test_empty_batch_report() {
        let report = BatchReport::new(Vec::new());
        assert_eq!(report.processed, 0);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 0);
        assert!(report.results.is_empty());
    }
}
