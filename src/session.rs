//! Execution context bootstrap.
//!
//! An [`EngineSession`] owns the DataFusion context for one run. Remote
//! storage roots are registered with the context's runtime so `s3://`,
//! `gs://` and `abfss://` URLs resolve to the same object stores the
//! [`StorageProvider`]s use; local roots go through the engine's built-in
//! filesystem store.

use datafusion::prelude::{SessionConfig, SessionContext};
use snafu::prelude::*;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::emit;
use crate::error::{RegisterStoreSnafu, SessionError};
use crate::metrics::events::ActiveSessions;
use crate::storage::StorageProvider;

/// A ready-to-use execution context plus the stores registered on it.
pub struct EngineSession {
    ctx: SessionContext,
    registered: Vec<Url>,
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("session_id", &self.ctx.session_id())
            .field("registered", &self.registered)
            .finish()
    }
}

impl EngineSession {
    /// Build the context and register the object store of every remote provider.
    ///
    /// When two providers share a bucket, the later one's store is the one the
    /// engine uses for that bucket.
    pub fn acquire(
        engine: &EngineConfig,
        providers: &[&StorageProvider],
    ) -> Result<Self, SessionError> {
        let config = SessionConfig::new()
            .with_target_partitions(engine.target_partitions)
            .with_batch_size(engine.batch_size);
        let ctx = SessionContext::new_with_config(config);

        let mut registered = Vec::new();
        for provider in providers {
            let Some(url) = provider.object_store_url().context(RegisterStoreSnafu)? else {
                continue;
            };
            debug!(
                "Registering object store for {} as {}",
                provider.root_url(),
                url
            );
            ctx.runtime_env()
                .register_object_store(&url, provider.object_store());
            if !registered.contains(&url) {
                registered.push(url);
            }
        }

        info!(
            "Session {} acquired (target_partitions={}, batch_size={}, remote stores={})",
            ctx.session_id(),
            engine.target_partitions,
            engine.batch_size,
            registered.len()
        );
        emit!(ActiveSessions { count: 1 });

        Ok(Self { ctx, registered })
    }

    /// The DataFusion context every stage runs against.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Release the session. Consumes it, so it can only happen once.
    pub fn close(self) {
        let runtime = self.ctx.runtime_env();
        for url in &self.registered {
            if let Err(e) = runtime.deregister_object_store(url) {
                warn!("Failed to deregister object store {}: {}", url, e);
            }
        }

        info!("Session {} closed", self.ctx.session_id());
        emit!(ActiveSessions { count: 0 });
    }
}
