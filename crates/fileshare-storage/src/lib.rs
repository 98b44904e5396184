//! fileshare-storage: Blob storage keyed by generated names
//!
//! Provides async storage backends for uploaded file content. Keys are
//! generated by the store on `put` and never derived from user input.
//! Authorization lives in `fileshare-auth`.
//!
//! ## Backends
//!
//! | Backend            | Use Case               |
//! |--------------------|------------------------|
//! | `InMemoryBlobStore`| Unit tests             |
//! | `LocalBlobStore`   | Single-node deployment |
//!
//! ## Example
//!
//! ```rust,ignore
//! use fileshare_storage::{BlobStore, InMemoryBlobStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = InMemoryBlobStore::new();
//!
//!     let key = storage.put(b"Hello, blobs!").await?;
//!     let retrieved = storage.get(&key).await?;
//!     assert_eq!(retrieved, b"Hello, blobs!");
//!
//!     Ok(())
//! }
//! ```

mod error;
mod traits;

mod local;
mod memory;

// Re-exports
pub use error::{StorageError, StorageResult};
pub use traits::{BlobKey, BlobStore};

pub use local::LocalBlobStore;
pub use memory::InMemoryBlobStore;
