use async_trait::async_trait;

use super::error::StorageError;

/// Path-addressed blob storage.
///
/// Paths are opaque keys chosen by the caller (forward-slash separated,
/// relative, no traversal components). The store has no transactional
/// coupling to any other system: callers sequence their writes so that a
/// failure leaves at worst an orphaned blob, never a dangling reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at the given path, replacing any existing blob.
    async fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}
