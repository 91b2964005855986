//! Scoped session acquisition over the process-wide pooled handle.
//!
//! A session is one sea-orm transaction: nothing commits implicitly, and
//! release is guaranteed on every exit path (an uncommitted transaction
//! rolls back when dropped). One core acquire/release pair backs both
//! calling conventions: the closure adapter [`with_session`] and the
//! task-scoped adapter [`session_scope`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::config::db::DbTarget;
use crate::error::DbInfraError;

/// Process-wide pooled handle, constructed once at startup and passed by
/// clone to everything needing database access.
#[derive(Debug, Clone)]
pub struct Db {
    conn: DatabaseConnection,
    target: DbTarget,
}

impl Db {
    pub(crate) fn new(conn: DatabaseConnection, target: DbTarget) -> Self {
        Self { conn, target }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn target(&self) -> &DbTarget {
        &self.target
    }
}

/// A session shared across nested calls within one [`session_scope`].
#[derive(Clone)]
pub struct SharedSession(Arc<DatabaseTransaction>);

impl SharedSession {
    pub fn session(&self) -> &DatabaseTransaction {
        &self.0
    }
}

tokio::task_local! {
    static CURRENT_SESSION: SharedSession;
}

/// Acquire one session, exclusively owned by the caller. Dropping it without
/// committing rolls the transaction back, so release is guaranteed even on
/// failure paths.
pub async fn acquire_session(db: &Db) -> Result<DatabaseTransaction, DbInfraError> {
    Ok(db.conn.begin().await?)
}

/// Run a closure within one session. Call as
/// `with_session(&db, |txn| Box::pin(async move { ... }))`.
///
/// 1) Inside a [`session_scope`] → reuse the scope's session (no commit or
///    rollback here; the scope owner settles it).
/// 2) Otherwise → acquire, run the closure, commit on Ok, roll back on Err.
pub async fn with_session<R, F>(db: &Db, f: F) -> Result<R, DbInfraError>
where
    F: for<'a> FnOnce(
        &'a DatabaseTransaction,
    ) -> Pin<Box<dyn Future<Output = Result<R, DbInfraError>> + Send + 'a>>,
{
    let shared: Option<SharedSession> = CURRENT_SESSION.try_with(|s| s.clone()).ok();
    if let Some(shared) = shared {
        return f(shared.session()).await;
    }

    let txn = acquire_session(db).await?;
    let out = f(&txn).await;
    match out {
        Ok(val) => {
            txn.commit().await?;
            Ok(val)
        }
        Err(err) => {
            // Best-effort rollback; preserve the original error
            let _ = txn.rollback().await;
            Err(err)
        }
    }
}

/// Bind one session to the current task scope. Nested [`with_session`] calls
/// inside `f` reuse it without re-acquisition; the session commits when `f`
/// returns Ok and rolls back when it returns Err.
pub async fn session_scope<R, F, Fut>(db: &Db, f: F) -> Result<R, DbInfraError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, DbInfraError>>,
{
    let shared = SharedSession(Arc::new(acquire_session(db).await?));
    let out = CURRENT_SESSION.scope(shared.clone(), f()).await;

    let txn = Arc::try_unwrap(shared.0).map_err(|_| {
        DbInfraError::config("session escaped its scope; cannot settle the transaction")
    })?;
    match out {
        Ok(val) => {
            txn.commit().await?;
            Ok(val)
        }
        Err(err) => {
            let _ = txn.rollback().await;
            Err(err)
        }
    }
}
