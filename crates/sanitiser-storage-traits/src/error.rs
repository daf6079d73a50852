//! Object store errors

/// Error returned by an [`ObjectStore`](crate::ObjectStore)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The object does not exist
    #[error("object s3://{bucket}/{key} not found")]
    NotFound {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
    },
    /// The caller is not allowed to access the object
    #[error("access denied to s3://{bucket}/{key}")]
    AccessDenied {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
    },
    /// The store refused the write for size or quota reasons
    #[error("quota exceeded writing s3://{bucket}/{key}: {reason}")]
    Quota {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
        /// Reason given by the store
        reason: String,
    },
    /// Transport or service fault
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the same request later could plausibly succeed.
    ///
    /// Only [`StoreError::Backend`] is considered transient; missing objects,
    /// denied access and quota refusals will not change on redelivery.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound {
            bucket: "in".to_string(),
            key: "a/b.jpg".to_string(),
        };
        assert_eq!(err.to_string(), "object s3://in/a/b.jpg not found");

        let err = StoreError::AccessDenied {
            bucket: "out".to_string(),
            key: "x.png".to_string(),
        };
        assert_eq!(err.to_string(), "access denied to s3://out/x.png");

        let err = StoreError::Quota {
            bucket: "out".to_string(),
            key: "x.png".to_string(),
            reason: "too big".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "quota exceeded writing s3://out/x.png: too big"
        );

        let err = StoreError::Backend("connection reset".to_string());
        assert_eq!(err.to_string(), "storage backend error: connection reset");
    }

    #[test]
    fn test_store_error_is_transient() {
        assert!(StoreError::Backend("timeout".to_string()).is_transient());
        assert!(
            !StoreError::NotFound {
                bucket: "b".to_string(),
                key: "k".to_string(),
            }
            .is_transient()
        );
        assert!(
            !StoreError::Quota {
                bucket: "b".to_string(),
                key: "k".to_string(),
                reason: String::new(),
            }
            .is_transient()
        );
    }
}
