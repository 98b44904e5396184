//! fileshare-auth: Ownership, sharing and access authorization for stored files
//!
//! Users upload files they exclusively own, then grant other users READ or
//! WRITE access. Every download, overwrite, deletion and share change is
//! decided by [`AccessAuthorizer`] before a store is touched.
//!
//! ## Features
//!
//! | Feature  | Description                    |
//! |----------|--------------------------------|
//! | (none)   | In-memory metadata only        |
//! | `sqlite` | SQLite metadata persistence    |
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fileshare_auth::{FileShareService, InMemoryMetadataStore, Permission};
//! use fileshare_storage::InMemoryBlobStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = FileShareService::new(
//!         Arc::new(InMemoryBlobStore::new()),
//!         Arc::new(InMemoryMetadataStore::new()),
//!     );
//!
//!     let alice = service.users().register("alice", "alice@example.com", "h1").await?;
//!     let bob = service.users().register("bob", "bob@example.com", "h2").await?;
//!
//!     let file = service
//!         .registry()
//!         .create(alice.id, "notes.txt", b"hello", "text/plain")
//!         .await?;
//!     service
//!         .registry()
//!         .share(file.id, alice.id, bob.id, Permission::Read)
//!         .await?;
//!
//!     let content = service.registry().read_content(file.id, bob.id).await?;
//!     assert_eq!(content, b"hello");
//!
//!     Ok(())
//! }
//! ```

mod authorizer;
mod config;
mod error;
mod ledger;
mod locks;
mod metadata;
mod model;
mod registry;
mod service;
mod users;
mod view;

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-exports
pub use authorizer::{Access, AccessAuthorizer};
pub use config::{Config, LimitsConfig, MetadataConfig, StorageConfig};
pub use error::{AuthError, AuthResult, ErrorKind};
pub use ledger::ShareLedger;
pub use metadata::MetadataStore;
pub use model::{
    ContentUpdate, File, FileId, FileShare, NewFile, NewShare, NewUser, Permission, ShareId, User,
    UserId,
};
pub use registry::FileRegistry;
pub use service::FileShareService;
pub use users::UserDirectory;
pub use view::{FileShareView, FileView, UserView};

pub use memory::InMemoryMetadataStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMetadataStore;
