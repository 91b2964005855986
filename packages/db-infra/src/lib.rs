//! Database bootstrap: connection-URL parsing, startup migrations, and the
//! pooled session factory shared by the rest of the application.
//! Used by application binaries and the migration CLI.

pub mod codec;
pub mod config;
pub mod error;
pub mod infra;
pub mod session;

pub use config::db::{parse_db_url, DbTarget, ServerConfig};
pub use error::DbInfraError;
pub use infra::db::core::{
    bootstrap_db, build_pool, connect_native, run_migrations, sanitize_db_url,
};
pub use session::{acquire_session, session_scope, with_session, Db, SharedSession};
