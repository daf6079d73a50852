//! Amazon S3 backed [`ObjectStore`].
//!
//! Service errors are classified by their S3 error code into the
//! [`StoreError`] taxonomy; anything that is not a recognised refusal is
//! reported as [`StoreError::Backend`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use sanitiser_storage_traits::{ObjectStore, StoreError};

const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NotFound", "NoSuchBucket"];
const ACCESS_DENIED_CODES: &[&str] = &["AccessDenied", "Forbidden", "AllAccessDisabled"];
const QUOTA_CODES: &[&str] = &["QuotaExceeded", "ServiceQuotaExceeded", "EntityTooLarge"];

/// S3 object store
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wrap an already configured S3 client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(bucket, key, e))?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Backend(format!("reading body of s3://{bucket}/{key}: {e}")))?;

        Ok(body.into_bytes().to_vec())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify_sdk_error(bucket, key, e))?;

        tracing::debug!(bucket, key, bytes = len, "put_object acknowledged");
        Ok(())
    }
}

fn classify_sdk_error<E, R>(bucket: &str, key: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    classify(bucket, key, code.as_deref(), || {
        DisplayErrorContext(&err).to_string()
    })
}

fn classify<F>(bucket: &str, key: &str, code: Option<&str>, message: F) -> StoreError
where
    F: FnOnce() -> String,
{
    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        Some(code) if ACCESS_DENIED_CODES.contains(&code) => StoreError::AccessDenied {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        Some(code) if QUOTA_CODES.contains(&code) => StoreError::Quota {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: message(),
        },
        _ => StoreError::Backend(message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> String {
        "service said no".to_string()
    }

    #[test]
    fn test_classify_not_found() {
        for code in ["NoSuchKey", "NotFound", "NoSuchBucket"] {
            assert!(matches!(
                classify("in", "k", Some(code), msg),
                StoreError::NotFound { .. }
            ));
        }
    }

    #[test]
    fn test_classify_access_denied() {
        let err = classify("in", "k", Some("AccessDenied"), msg);
        assert_eq!(
            err,
            StoreError::AccessDenied {
                bucket: "in".to_string(),
                key: "k".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_quota_keeps_message() {
        let err = classify("out", "k", Some("EntityTooLarge"), msg);
        assert_eq!(
            err,
            StoreError::Quota {
                bucket: "out".to_string(),
                key: "k".to_string(),
                reason: "service said no".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_unknown_is_backend() {
        assert_eq!(
            classify("in", "k", Some("SlowDown"), msg),
            StoreError::Backend("service said no".to_string())
        );
        assert_eq!(
            classify("in", "k", None, msg),
            StoreError::Backend("service said no".to_string())
        );
    }
}
