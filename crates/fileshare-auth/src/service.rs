//! Wiring of stores and components into one service

use std::sync::Arc;

use anyhow::{Context, bail};
use fileshare_storage::{BlobStore, InMemoryBlobStore, LocalBlobStore};
use tracing::info;

use crate::authorizer::AccessAuthorizer;
use crate::config::Config;
use crate::ledger::ShareLedger;
use crate::memory::InMemoryMetadataStore;
use crate::metadata::MetadataStore;
use crate::registry::FileRegistry;
use crate::users::UserDirectory;

/// Every component of the core, built over one pair of stores
pub struct FileShareService {
    users: UserDirectory,
    registry: FileRegistry,
}

impl FileShareService {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        let authorizer = AccessAuthorizer::new(ShareLedger::new(metadata.clone()));
        Self {
            users: UserDirectory::new(metadata.clone()),
            registry: FileRegistry::new(blobs, metadata, authorizer),
        }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let blobs: Arc<dyn BlobStore> = match config.storage.backend.as_str() {
            "memory" => Arc::new(InMemoryBlobStore::new()),
            "local" => {
                let path = config
                    .storage
                    .local_path
                    .as_deref()
                    .context("storage.local_path is required for the local backend")?;
                Arc::new(
                    LocalBlobStore::new(path)
                        .await
                        .with_context(|| format!("Failed to open blob store at {path}"))?,
                )
            }
            other => bail!("Unknown storage backend '{other}'"),
        };

        let metadata = metadata_store(config)?;

        info!(
            storage = %config.storage.backend,
            metadata = %config.metadata.backend,
            "fileshare service ready"
        );

        let service = Self::new(blobs, metadata);
        Ok(Self {
            registry: service
                .registry
                .with_upload_limit(config.limits.max_upload_bytes),
            ..service
        })
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn authorizer(&self) -> &AccessAuthorizer {
        self.registry.authorizer()
    }

    pub fn ledger(&self) -> &ShareLedger {
        self.registry.authorizer().ledger()
    }
}

fn metadata_store(config: &Config) -> anyhow::Result<Arc<dyn MetadataStore>> {
    match config.metadata.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryMetadataStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config
                .metadata
                .sqlite_path
                .as_deref()
                .context("metadata.sqlite_path is required for the sqlite backend")?;
            let store = crate::sqlite::SqliteMetadataStore::open(path)
                .with_context(|| format!("Failed to open metadata database at {path}"))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => bail!("Metadata backend 'sqlite' requires the `sqlite` feature"),
        other => bail!("Unknown metadata backend '{other}'"),
    }
}
