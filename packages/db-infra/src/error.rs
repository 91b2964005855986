use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbInfraError {
    /// Unsupported scheme or bad environment. Fatal at startup.
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// Failure while connecting for or applying migrations. Fatal at startup.
    #[error("Migration error: {message}")]
    Migration { message: String },
    /// Runtime database errors (pool exhaustion, liveness, query failures),
    /// surfaced to the operation that requested the session.
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}

impl From<migration::MigrateError> for DbInfraError {
    fn from(e: migration::MigrateError) -> Self {
        Self::Migration {
            message: e.to_string(),
        }
    }
}
