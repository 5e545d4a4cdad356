use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mediadesk_shared::error::ContentError;
use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sea_orm_migration::MigratorTrait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::ConnectOptions;
use tracing::debug;

use crate::migration::Migrator;

/// Open the database at the given path, creating it if needed.
pub async fn new(db_path: &PathBuf) -> Result<DatabaseConnection, ContentError> {
    start_db(Some(db_path)).await
}

/// Start the database and run migrations, `None` gives you an in-memory database.
pub async fn start_db(db_path: Option<&PathBuf>) -> Result<DatabaseConnection, ContentError> {
    let db_url = match db_path {
        Some(path) => format!("sqlite://{}?mode=rwc", path.display()),
        None => "sqlite::memory:".to_string(),
    };
    debug!("Opening Database: {db_url}");

    let options = SqliteConnectOptions::from_str(&db_url)
        .map_err(|err| ContentError::Configuration(format!("invalid database url: {err:?}")))?
        .foreign_keys(true)
        .log_statements(log::LevelFilter::Trace)
        .log_slow_statements(log::LevelFilter::Warn, Duration::from_millis(500));

    // in-memory databases only live as long as their connection
    let pool_options = match db_path {
        Some(_) => SqlitePoolOptions::new().max_connections(8),
        None => SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None),
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|err| ContentError::Persistence(format!("connection failed: {err:?}")))?;

    let conn = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);

    Migrator::up(&conn, None).await?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::category;
    use crate::migration::DEFAULT_CATEGORY_ID;
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn test_start_db_runs_migrations() {
        let conn = start_db(None).await.expect("Failed to start db");

        let default = category::Entity::find_by_id(DEFAULT_CATEGORY_ID)
            .one(&conn)
            .await
            .expect("Failed to query categories")
            .expect("Default category missing");
        assert_eq!(default.name, "Uncategorized");
    }

    #[tokio::test]
    async fn test_start_db_on_disk_is_idempotent() {
        let dir = tempfile::tempdir().expect("Failed to create tempdir");
        let path = dir.path().join("mediadesk.sqlite3");

        let conn = new(&path).await.expect("Failed to create db");
        drop(conn);
        let conn = new(&path).await.expect("Failed to reopen db");

        let categories = category::Entity::find()
            .all(&conn)
            .await
            .expect("Failed to list categories");
        assert_eq!(categories.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_start_db() {
        // I sure hope this path isn't writeable!
        new(&format!(
            "/asdfasdf{}/asd{}fsadfdf",
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4()
        )
        .into())
        .await
        .expect_err("Should fail to open DB");
    }
}
