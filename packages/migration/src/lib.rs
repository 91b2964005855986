//! Directory-driven schema migration engine and the structured-value codec.
//! Used by the db-infra bootstrap layer and the migration CLI.

pub mod codec;
pub mod error;
pub mod runner;

pub use error::MigrateError;
pub use runner::{
    applied_migrations, discover_migrations, pending_migrations, run_pending, MigrationScript,
};
