//! Google Cloud Storage backend implementation.

use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{GcsConfigSnafu, StorageError};

/// Google Cloud Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    pub bucket: String,
    pub key: Option<Path>,
}

impl GcsConfig {
    pub(super) fn build_store(
        &self,
        options: &HashMap<String, String>,
    ) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut builder = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(&self.bucket)
            .with_retry(RetryConfig::default());

        if let Ok(service_account_key) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            debug!("Using GCS service account key from the environment");
            builder = builder.with_service_account_key(&service_account_key);
        }

        for (key, value) in options {
            builder = builder.with_config(key.parse().context(GcsConfigSnafu)?, value.clone());
        }

        Ok(Arc::new(builder.build().context(GcsConfigSnafu)?))
    }
}
