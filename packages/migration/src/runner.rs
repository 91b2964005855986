//! Applies ordered SQL migration scripts from a directory, tracking what has
//! already run in a durable bookkeeping table owned by this crate.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use sea_orm::sea_query::{ColumnDef, Order, Query, Table};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, DeriveIden, TransactionTrait,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::MigrateError;

#[derive(DeriveIden)]
enum SchemaMigrations {
    Table,
    Name,
    AppliedAt,
}

/// One migration script on disk. The file name (without extension) is the
/// unique name and the deterministic order key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub name: String,
    pub path: PathBuf,
}

/// List `*.sql` scripts in the directory, sorted by name ascending.
pub fn discover_migrations(dir: &Path) -> Result<Vec<MigrationScript>, MigrateError> {
    let entries = fs::read_dir(dir).map_err(|e| MigrateError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MigrateError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        scripts.push(MigrationScript {
            name: name.to_string(),
            path,
        });
    }
    scripts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(scripts)
}

/// Names of migrations recorded as applied, ascending. A missing bookkeeping
/// table reads as zero applied migrations.
pub async fn applied_migrations(conn: &DatabaseConnection) -> Result<Vec<String>, MigrateError> {
    let backend = conn.get_database_backend();
    let stmt = Query::select()
        .column(SchemaMigrations::Name)
        .from(SchemaMigrations::Table)
        .order_by(SchemaMigrations::Name, Order::Asc)
        .to_owned();

    let rows = match conn.query_all(backend.build(&stmt)).await {
        Ok(rows) => rows,
        Err(DbErr::Exec(_)) | Err(DbErr::Query(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::with_capacity(rows.len());
    for row in rows {
        names.push(row.try_get("", "name")?);
    }
    Ok(names)
}

/// Scripts present in the directory but not yet recorded as applied.
pub async fn pending_migrations(
    conn: &DatabaseConnection,
    dir: &Path,
) -> Result<Vec<MigrationScript>, MigrateError> {
    let applied: HashSet<String> = applied_migrations(conn).await?.into_iter().collect();
    let scripts = discover_migrations(dir)?;
    Ok(scripts
        .into_iter()
        .filter(|s| !applied.contains(&s.name))
        .collect())
}

/// Apply every unapplied script in order. Each script runs in its own
/// transaction together with its bookkeeping row, so an interrupted run
/// resumes at the failed step and never re-applies earlier ones.
///
/// Returns the number of scripts applied by this call.
pub async fn run_pending(conn: &DatabaseConnection, dir: &Path) -> Result<usize, MigrateError> {
    ensure_bookkeeping(conn).await?;

    let applied = applied_migrations(conn).await?;
    let applied_set: HashSet<String> = applied.iter().cloned().collect();
    let scripts = discover_migrations(dir)?;

    info!(
        "migrate=start dir={} defined={} applied={}",
        dir.display(),
        scripts.len(),
        applied.len()
    );

    let pending: Vec<MigrationScript> = scripts
        .into_iter()
        .filter(|s| !applied_set.contains(&s.name))
        .collect();

    if let (Some(first), Some(last_applied)) = (pending.first(), applied.last()) {
        if first.name.as_str() < last_applied.as_str() {
            warn!(
                "migrate=out_of_order pending={} last_applied={}",
                first.name, last_applied
            );
        }
    }

    let mut applied_now = 0;
    for script in &pending {
        apply_one(conn, script).await?;
        applied_now += 1;
    }

    info!("migrate=done applied_now={}", applied_now);
    Ok(applied_now)
}

async fn apply_one(conn: &DatabaseConnection, script: &MigrationScript) -> Result<(), MigrateError> {
    let sql = fs::read_to_string(&script.path).map_err(|e| MigrateError::Io {
        path: script.path.clone(),
        source: e,
    })?;

    info!(migration = %script.name, "migrate=apply");

    let txn = conn.begin().await?;
    if let Err(e) = txn.execute_unprepared(&sql).await {
        let _ = txn.rollback().await;
        return Err(MigrateError::Apply {
            name: script.name.clone(),
            source: e,
        });
    }
    if let Err(e) = record_applied(&txn, &script.name).await {
        let _ = txn.rollback().await;
        return Err(e);
    }
    txn.commit().await.map_err(|e| MigrateError::Apply {
        name: script.name.clone(),
        source: e,
    })?;
    Ok(())
}

async fn ensure_bookkeeping(conn: &DatabaseConnection) -> Result<(), MigrateError> {
    let backend = conn.get_database_backend();
    let stmt = Table::create()
        .table(SchemaMigrations::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(SchemaMigrations::Name)
                .string_len(255)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(SchemaMigrations::AppliedAt).text().not_null())
        .to_owned();
    conn.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn record_applied<C: ConnectionTrait>(conn: &C, name: &str) -> Result<(), MigrateError> {
    let applied_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| MigrateError::Bookkeeping {
            message: format!("failed to format applied_at for '{name}': {e}"),
        })?;

    let mut stmt = Query::insert();
    stmt.into_table(SchemaMigrations::Table)
        .columns([SchemaMigrations::Name, SchemaMigrations::AppliedAt])
        .values([name.into(), applied_at.into()])
        .map_err(|e| MigrateError::Bookkeeping {
            message: format!("failed to build bookkeeping insert for '{name}': {e}"),
        })?;

    let backend = conn.get_database_backend();
    conn.execute(backend.build(&stmt)).await?;
    Ok(())
}
