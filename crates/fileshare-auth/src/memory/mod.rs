//! In-memory implementations for testing

mod metadata;

pub use metadata::InMemoryMetadataStore;
