//! S3 storage backend implementation.

use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{S3ConfigSnafu, StorageError};

/// S3 storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub bucket: String,
    pub key: Option<Path>,
}

impl S3Config {
    /// Credentials come from `AWS_*` variables, then `options`; the parsed
    /// region and endpoint are applied last.
    pub(super) fn build_store(
        &self,
        options: &HashMap<String, String>,
    ) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&self.bucket)
            .with_retry(RetryConfig::default());

        for (key, value) in options {
            builder = builder.with_config(key.parse().context(S3ConfigSnafu)?, value.clone());
        }

        if let Some(region) = &self.region {
            builder = builder.with_region(region);
        }

        // Custom endpoints (MinIO, localstack) are path-style and may be plain HTTP.
        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false)
                .with_allow_http(true);
        }

        Ok(Arc::new(builder.build().context(S3ConfigSnafu)?))
    }
}
