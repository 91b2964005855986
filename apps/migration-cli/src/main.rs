use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use db_infra::{connect_native, parse_db_url, run_migrations, sanitize_db_url, DbInfraError, DbTarget};
use migration::{applied_migrations, pending_migrations};

#[derive(Clone, ValueEnum)]
enum Command {
    /// Apply all pending migrations
    Up,
    /// Show applied and pending migrations
    Status,
}

#[derive(Parser)]
#[command(name = "migration-cli")]
#[command(about = "Database migration tool")]
struct Args {
    #[arg(value_enum)]
    command: Command,

    /// Connection URL (defaults to DATABASE_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Directory of ordered .sql migration scripts
    #[arg(short, long, default_value = "migrations")]
    dir: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter("migration=info,db_infra=info,sqlx=warn")
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let url = match args.url.or_else(|| std::env::var("DATABASE_URL").ok()) {
        Some(url) => url,
        None => {
            eprintln!("No connection URL: pass --url or set DATABASE_URL");
            std::process::exit(2);
        }
    };

    let target = match parse_db_url(&url) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    if is_ephemeral(&target) {
        eprintln!("❌ In-memory SQLite databases are not supported for CLI operations.");
        eprintln!();
        eprintln!("Reason: each CLI invocation opens a fresh in-memory database that is");
        eprintln!("destroyed when the command exits, so there is nothing durable to");
        eprintln!("migrate or inspect.");
        eprintln!();
        eprintln!("Point the URL at a file instead, e.g. sqlite:///./app.db");
        std::process::exit(2);
    }

    let result = match args.command {
        Command::Up => run_migrations(&target, &args.dir).await,
        Command::Status => print_status(&target, &args.dir).await,
    };

    if let Err(e) = result {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
}

/// An empty-path sqlite target lives only as long as its connection; useless
/// from a one-shot CLI process.
fn is_ephemeral(target: &DbTarget) -> bool {
    matches!(target, DbTarget::Sqlite { path } if path.is_empty())
}

async fn print_status(target: &DbTarget, dir: &Path) -> Result<(), DbInfraError> {
    let conn = connect_native(target).await?;

    let applied = applied_migrations(&conn).await?;
    let pending = pending_migrations(&conn, dir).await?;
    conn.close().await?;

    println!(
        "database: {}",
        sanitize_db_url(&target.connection_url())
    );
    println!("applied ({}):", applied.len());
    for name in &applied {
        println!("  {name}");
    }
    println!("pending ({}):", pending.len());
    for script in &pending {
        println!("  {}", script.name);
    }
    Ok(())
}
