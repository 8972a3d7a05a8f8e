//! SQLite connection bootstrap.

use crate::migration::Migrator;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use sea_orm_migration::MigratorTrait;
use sg_gateway_error::SGResult;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the catalog database and bring the schema up to
/// date.
///
/// The pool is pinned to a single connection: every repository operation is
/// serialized through it, and the `foreign_keys` pragma applies to all
/// statements.
pub async fn init_db(database_url: &str) -> SGResult<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url);
    opts.connect_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(60))
        .max_connections(1)
        .sqlx_logging(false);

    info!(database_url, "Connecting to catalog database");
    let db = Database::connect(opts).await?;

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        "PRAGMA foreign_keys = ON;".to_string(),
    ))
    .await?;

    Migrator::up(&db, None).await?;
    info!("Catalog database ready");

    Ok(db)
}

/// URL for an on-disk catalog at the given path, created when missing.
pub fn file_url(path: &str) -> String {
    format!("sqlite://{path}?mode=rwc")
}

/// URL for a private in-memory catalog.
pub fn memory_url() -> &'static str {
    "sqlite::memory:"
}
