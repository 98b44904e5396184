//! SQLite persistence backend

mod metadata;
mod schema;

pub use metadata::SqliteMetadataStore;
pub use schema::{SCHEMA_VERSION, check_version, init_schema};
