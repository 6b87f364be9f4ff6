//! Multi-cloud storage abstraction.
//!
//! Provides a unified interface for working with S3, GCS, Azure Blob Storage,
//! and the local filesystem. A provider owns one root (bucket/container plus
//! key prefix, or a local directory); every path it accepts or returns is
//! relative to that root.

mod azure;
mod gcs;
mod local;
mod s3;
mod url_parser;

pub use url_parser::BackendConfig;
pub use azure::AzureConfig;
pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use s3::S3Config;

use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{EngineUrlSnafu, ObjectStoreSnafu, StorageError};
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over different cloud storage backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.root_url())
    }
}

fn record<T, E>(operation: StorageOperation, start: Instant, result: &Result<T, E>) {
    emit!(StorageRequest {
        operation,
        status: RequestStatus::of(result),
    });
    emit!(StorageRequestDuration {
        operation,
        duration: start.elapsed(),
    });
}

impl StorageProvider {
    /// Create a storage provider for an existing root.
    ///
    /// A local root that does not exist is an error.
    pub async fn for_url_with_options(
        url: &str,
        options: &HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;
        let object_store = match &config {
            BackendConfig::S3(s3) => s3.build_store(options)?,
            BackendConfig::Gcs(gcs) => gcs.build_store(options)?,
            BackendConfig::Azure(azure) => azure.build_store(options)?,
            BackendConfig::Local(local) => local.build_store().await?,
        };
        Ok(Self {
            config,
            object_store,
        })
    }

    /// Create a storage provider for a root that is written to, creating a
    /// missing local directory first.
    pub async fn for_output_with_options(
        url: &str,
        options: &HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        if let BackendConfig::Local(local) = BackendConfig::parse_url(url)? {
            local.create_root().await?;
        }
        Self::for_url_with_options(url, options).await
    }

    /// Location of the root as the engine sees it, used in logs.
    pub fn root_url(&self) -> String {
        self.engine_dir_url("")
    }

    /// The underlying object store, addressed by full keys (not root-relative).
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.object_store)
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// List every object under `prefix` (relative to the root).
    ///
    /// Returns paths relative to the root. A missing prefix lists as empty.
    pub async fn list_with_prefix(&self, prefix: &str) -> Result<Vec<Path>, StorageError> {
        let prefix = Path::from(prefix);
        let full_prefix = self.qualify_path(&prefix);
        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let start = Instant::now();
        let result: Result<Vec<_>, _> = self
            .object_store
            .list(Some(&full_prefix))
            .try_collect()
            .await;
        record(StorageOperation::List, start, &result);

        let metas = match result.context(ObjectStoreSnafu) {
            Ok(metas) => metas,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(metas
            .into_iter()
            .map(|meta| meta.location.parts().skip(key_part_count).collect())
            .collect())
    }

    /// Whether at least one object exists under `prefix`.
    pub async fn has_objects(&self, prefix: &str) -> Result<bool, StorageError> {
        Ok(!self.list_with_prefix(prefix).await?.is_empty())
    }

    /// Delete every object under `prefix`, returning how many were removed.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let paths = self.list_with_prefix(prefix).await?;

        for path in &paths {
            let start = Instant::now();
            let result = self.object_store.delete(&self.qualify_path(path)).await;
            record(StorageOperation::Delete, start, &result);

            match result.context(ObjectStoreSnafu) {
                Err(e) if !e.is_not_found() => return Err(e),
                _ => {}
            }
        }

        debug!("Deleted {} objects under {}", paths.len(), self.engine_url(prefix));
        Ok(paths.len())
    }

    /// Put bytes to a path.
    pub async fn put(&self, path: impl Into<Path>, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = path.into();
        let start = Instant::now();
        let result = self
            .object_store
            .put(&self.qualify_path(&path), PutPayload::from(bytes))
            .await;
        record(StorageOperation::Put, start, &result);

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// URL under which the execution engine reaches `relative` (a root-relative path).
    ///
    /// Remote roots map to `s3://`, `gs://` or `abfss://` URLs resolved through the
    /// store registered by [`StorageProvider::object_store_url`]; local roots map to
    /// absolute filesystem paths.
    pub fn engine_url(&self, relative: &str) -> String {
        let relative = Path::from(relative);
        let key = self.qualify_path(&relative);

        let base = match &self.config {
            BackendConfig::S3(s3) => format!("s3://{}", s3.bucket),
            BackendConfig::Gcs(gcs) => format!("gs://{}", gcs.bucket),
            BackendConfig::Azure(azure) => format!(
                "abfss://{}@{}.dfs.core.windows.net",
                azure.container, azure.account
            ),
            BackendConfig::Local(local) => local.path.trim_end_matches('/').to_string(),
        };

        if AsRef::<str>::as_ref(&*key).is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{key}")
        }
    }

    /// Engine URL of a directory, with the trailing separator that marks it
    /// as a collection rather than a single file.
    pub fn engine_dir_url(&self, relative: &str) -> String {
        let url = self.engine_url(relative);
        if url.ends_with('/') {
            url
        } else {
            format!("{url}/")
        }
    }

    /// `scheme://authority` under which this store must be registered with the
    /// engine, or `None` for local roots served by the engine's own filesystem store.
    pub fn object_store_url(&self) -> Result<Option<url::Url>, StorageError> {
        let raw = match &self.config {
            BackendConfig::S3(s3) => format!("s3://{}", s3.bucket),
            BackendConfig::Gcs(gcs) => format!("gs://{}", gcs.bucket),
            BackendConfig::Azure(azure) => format!(
                "abfss://{}@{}.dfs.core.windows.net",
                azure.container, azure.account
            ),
            BackendConfig::Local(_) => return Ok(None),
        };

        url::Url::parse(&raw)
            .map(Some)
            .context(EngineUrlSnafu { url: raw })
    }
}

/// List the files of a dataset laid out as `<prefix>/*/.../<file>` with exactly
/// `depth` segments below `prefix`, keeping names that end with `extension`.
///
/// Returns root-relative paths, sorted for consistent ordering.
pub async fn list_dataset_files(
    storage: &StorageProvider,
    prefix: &str,
    depth: usize,
    extension: &str,
) -> Result<Vec<Path>, StorageError> {
    let prefix_parts = Path::from(prefix).parts().count();
    let listed = storage.list_with_prefix(prefix).await?;
    let total_listed = listed.len();

    let mut files: Vec<Path> = listed
        .into_iter()
        .filter(|path| path.parts().count() == prefix_parts + depth)
        .filter(|path| {
            path.filename()
                .is_some_and(|name| name.ends_with(extension) && !name.starts_with('.'))
        })
        .collect();

    debug!(
        "Listed {} objects under {}, {} match depth {} and extension {}",
        total_listed,
        prefix,
        files.len(),
        depth,
        extension
    );

    files.sort();
    Ok(files)
}
