//! Event-driven image sanitisation
//!
//! Given a batch of object-created notifications, this crate fetches each
//! referenced image, strips every embedded metadata segment (EXIF, ICC
//! profiles, XMP, comments, text chunks, thumbnails), flattens it to opaque
//! RGB, re-encodes it and writes it to a destination bucket under the same
//! key. Each record is isolated: a failure produces a failure outcome for that
//! record and the rest of the batch carries on.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sanitiser_core::{HandlerConfig, SanitiserHandler};
//! use sanitiser_memory_storage::MemoryObjectStore;
//!
//! # async fn run(payload: serde_json::Value) -> Result<(), sanitiser_core::Error> {
//! let store = Arc::new(MemoryObjectStore::new());
//! let handler = SanitiserHandler::new(store, HandlerConfig::from_env()?);
//! let report = handler.handle_payload(&payload, None).await?;
//! println!("{} succeeded, {} failed", report.succeeded, report.failed);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod media_processing;
pub mod notification;
pub mod outcome;
pub mod sanitizer;
#[cfg(test)]
pub mod test_util;

pub use self::config::{ConfigError, HandlerConfig};
pub use self::dispatcher::SanitiserHandler;
pub use self::error::Error;
pub use self::notification::{ChangeRecord, NotificationBatch, RecordEntry};
pub use self::outcome::{BatchReport, ErrorKind, OutcomeStatus, ProcessingOutcome};

// Re-export the storage abstraction for convenience
pub use sanitiser_storage_traits::{ObjectStore, StoreError};
