//! Sanitiser storage - the object store abstraction the sanitisation handler
//! reads source images from and writes sanitised images to.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use async_trait::async_trait;

pub mod error;

pub use error::StoreError;

/// An object as held by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object body
    pub body: Vec<u8>,
    /// MIME type recorded with the object
    pub content_type: String,
}

/// Object store used by the sanitisation handler.
///
/// Implementors must make `put` all-or-nothing: after an `Ok(())` the whole
/// body is visible under the key, after an error (or a dropped future) no
/// partially written body may be visible under it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the full content of `key` in `bucket`.
    ///
    /// # Errors
    ///
    /// * [`StoreError::NotFound`] if the object does not exist
    /// * [`StoreError::AccessDenied`] if the caller may not read it
    /// * [`StoreError::Backend`] for any transport or service fault
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Write `body` under `key` in `bucket`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// * [`StoreError::AccessDenied`] if the caller may not write it
    /// * [`StoreError::Quota`] if the store refuses the object for size or quota reasons
    /// * [`StoreError::Backend`] for any transport or service fault
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;
}
