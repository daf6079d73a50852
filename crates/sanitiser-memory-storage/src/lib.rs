//! Memory-based object store for the image sanitiser.
//!
//! Objects are held in a map keyed by `(bucket, key)` and are cleared when the
//! store is dropped. It is useful for tests and local runs where no real
//! object store is available.
//!
//! Writes are atomic: a `put` either replaces the whole object under its key
//! or leaves the map untouched.
//!
//! ## Simulating store refusals
//!
//! [`StoreLimits`] lets callers reproduce the refusals a real store produces:
//!
//! ```rust
//! use sanitiser_memory_storage::{MemoryObjectStore, StoreLimits};
//!
//! let limits = StoreLimits::default()
//!     .with_max_object_size(1024)
//!     .with_denied_bucket("locked-bucket");
//!
//! let store = MemoryObjectStore::with_limits(limits);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use sanitiser_storage_traits::{ObjectStore, StoreError, StoredObject};

/// Default maximum size of a single stored object (5 GiB, the S3 single-put limit)
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 5 * 1024 * 1024 * 1024;

/// Configurable limits for the memory store.
#[derive(Debug, Clone)]
pub struct StoreLimits {
    /// Maximum size of a single object in bytes; larger puts fail with [`StoreError::Quota`]
    pub max_object_size: usize,
    /// Buckets for which every read and write fails with [`StoreError::AccessDenied`]
    pub denied_buckets: BTreeSet<String>,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            denied_buckets: BTreeSet::new(),
        }
    }
}

impl StoreLimits {
    /// Creates a new `StoreLimits` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum size of a single object in bytes.
    pub fn with_max_object_size(mut self, limit: usize) -> Self {
        self.max_object_size = limit;
        self
    }

    /// Denies all access to `bucket`.
    pub fn with_denied_bucket<S>(mut self, bucket: S) -> Self
    where
        S: Into<String>,
    {
        self.denied_buckets.insert(bucket.into());
        self
    }
}

/// In-memory [`ObjectStore`]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    limits: StoreLimits,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::with_limits(StoreLimits::default())
    }
}

impl fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("objects", &self.objects.read().len())
            .field("limits", &self.limits)
            .field("get_calls", &self.get_calls())
            .field("put_calls", &self.put_calls())
            .finish()
    }
}

impl MemoryObjectStore {
    /// Creates an empty store with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with custom limits.
    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            limits,
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Returns the limits in use.
    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    /// Seeds an object without going through [`ObjectStore::put`].
    ///
    /// Seeding ignores limits and does not count as a put call.
    pub fn insert<B, K>(&self, bucket: B, key: K, body: Vec<u8>, content_type: &str)
    where
        B: Into<String>,
        K: Into<String>,
    {
        self.objects.write().insert(
            (bucket.into(), key.into()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
    }

    /// Returns a copy of the object under `key` in `bucket`, if any.
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Returns the keys stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Total number of stored objects across all buckets.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Number of [`ObjectStore::get`] calls made so far, successful or not.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of [`ObjectStore::put`] calls made so far, successful or not.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    fn check_access(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        if self.limits.denied_buckets.contains(bucket) {
            return Err(StoreError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_access(bucket, key)?;

        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_access(bucket, key)?;

        if body.len() > self.limits.max_object_size {
            return Err(StoreError::Quota {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: format!(
                    "object size {} exceeds maximum {}",
                    body.len(),
                    self.limits.max_object_size
                ),
            });
        }

        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
