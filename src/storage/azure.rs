//! Azure Blob Storage backend implementation.

use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AzureConfigSnafu, StorageError};

/// Azure Blob Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub account: String,
    pub container: String,
    pub key: Option<Path>,
}

impl AzureConfig {
    pub(super) fn build_store(
        &self,
        options: &HashMap<String, String>,
    ) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut builder = MicrosoftAzureBuilder::from_env()
            .with_account(&self.account)
            .with_container_name(&self.container)
            .with_retry(RetryConfig::default());

        for (key, value) in options {
            builder = builder.with_config(key.parse().context(AzureConfigSnafu)?, value.clone());
        }

        Ok(Arc::new(builder.build().context(AzureConfigSnafu)?))
    }
}
