use std::path::PathBuf;

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("failed to read migrations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("migration '{name}' failed: {source}")]
    Apply {
        name: String,
        #[source]
        source: DbErr,
    },
    #[error("migration bookkeeping failed: {message}")]
    Bookkeeping { message: String },
    #[error(transparent)]
    Db(#[from] DbErr),
}
