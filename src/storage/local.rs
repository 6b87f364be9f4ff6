//! Local filesystem storage backend implementation.

use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{IoSnafu, MissingLocalRootSnafu, ObjectStoreSnafu, StorageError};

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Absolute directory used as the store prefix.
    pub path: String,
}

impl LocalConfig {
    /// The directory must already exist.
    pub(super) async fn build_store(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let is_dir = tokio::fs::metadata(&self.path)
            .await
            .is_ok_and(|meta| meta.is_dir());
        ensure!(is_dir, MissingLocalRootSnafu { path: &self.path });

        Ok(Arc::new(
            LocalFileSystem::new_with_prefix(&self.path).context(ObjectStoreSnafu)?,
        ))
    }

    pub(super) async fn create_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.path).await.context(IoSnafu)
    }
}
