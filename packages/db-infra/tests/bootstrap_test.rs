use std::fs;
use std::path::Path;

use db_infra::{bootstrap_db, run_migrations, with_session, DbInfraError, DbTarget};
use sea_orm::ConnectionTrait;
use serial_test::serial;
use tempfile::TempDir;

fn write_script(dir: &Path, name: &str, sql: &str) {
    fs::write(dir.join(name), sql).unwrap();
}

fn basic_migrations() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_script(
        dir.path(),
        "0001_create_notes.sql",
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL, meta TEXT);",
    );
    write_script(
        dir.path(),
        "0002_seed_notes.sql",
        "INSERT INTO notes (body, meta) VALUES ('hello', '{\"pinned\":true}');",
    );
    dir
}

// Exercises the documented startup scenario: a relative sqlite URL creates
// the database file, the bookkeeping table, and applies every pending step.
#[tokio::test]
#[serial]
async fn sqlite_file_url_bootstraps_from_nothing() {
    let workdir = TempDir::new().unwrap();
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(workdir.path()).unwrap();

    let migrations = basic_migrations();
    let result = bootstrap_db("sqlite:///./app.db", migrations.path()).await;

    let checks = async {
        let db = result?;
        assert!(workdir.path().join("app.db").exists());

        let pending = migration::pending_migrations(db.conn(), migrations.path())
            .await
            .map_err(DbInfraError::from)?;
        assert!(pending.is_empty());

        let n = with_session(&db, |txn| {
            Box::pin(async move {
                let row = txn
                    .query_one(sea_orm::Statement::from_string(
                        txn.get_database_backend(),
                        "SELECT COUNT(*) AS n FROM notes".to_string(),
                    ))
                    .await?
                    .unwrap();
                Ok(row.try_get::<i64>("", "n").unwrap())
            })
        })
        .await?;
        assert_eq!(n, 1);
        Ok::<(), DbInfraError>(())
    }
    .await;

    std::env::set_current_dir(previous).unwrap();
    checks.unwrap();
}

#[tokio::test]
async fn in_memory_bootstrap_serves_sessions() {
    let migrations = basic_migrations();
    let db = bootstrap_db("sqlite://", migrations.path()).await.unwrap();

    let body = with_session(&db, |txn| {
        Box::pin(async move {
            let row = txn
                .query_one(sea_orm::Statement::from_string(
                    txn.get_database_backend(),
                    "SELECT body FROM notes LIMIT 1".to_string(),
                ))
                .await?
                .unwrap();
            Ok(row.try_get::<String>("", "body").unwrap())
        })
    })
    .await
    .unwrap();
    assert_eq!(body, "hello");
}

#[tokio::test]
async fn unsupported_scheme_never_reaches_the_database() {
    let migrations = TempDir::new().unwrap();
    let err = bootstrap_db("oracle://u:p@h/db", migrations.path())
        .await
        .unwrap_err();
    assert!(matches!(err, DbInfraError::Config { .. }));
}

#[tokio::test]
async fn migration_failure_aborts_bootstrap() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "0001_broken.sql", "CREATE GARBAGE;");

    let err = bootstrap_db("sqlite://", dir.path()).await.unwrap_err();
    assert!(matches!(err, DbInfraError::Migration { .. }));
}

#[tokio::test]
async fn run_migrations_is_idempotent_on_a_file_database() {
    let workdir = TempDir::new().unwrap();
    let db_path = workdir.path().join("repeat.db");
    let target = DbTarget::Sqlite {
        path: db_path.display().to_string(),
    };

    let migrations = basic_migrations();
    run_migrations(&target, migrations.path()).await.unwrap();
    run_migrations(&target, migrations.path()).await.unwrap();
}
