//! Port abstraction for image storage.

use async_trait::async_trait;
use url::Url;

use super::define_port_error;

define_port_error! {
    /// Errors raised by blob store adapters.
    pub enum BlobStoreError {
        /// Backend could not be reached.
        Connection { message: String } => "blob store connection failed: {message}",
        /// Upload was rejected.
        Upload { message: String } => "blob upload failed: {message}",
        /// Delete was rejected.
        Delete { message: String } => "blob delete failed: {message}",
    }
}

/// Uploaded object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Storage path, used for deletion.
    pub path: String,
    /// Public download reference.
    pub url: Url,
}

/// Object storage for event images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `path` and return the download reference.
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, BlobStoreError>;

    /// Remove the object at `path`. Deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> Result<(), BlobStoreError>;
}
