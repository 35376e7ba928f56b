use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tempo_core::config::StoreConfig;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_config(store: &StoreConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&store.database_url, store.max_connections, store.timeout_secs).await
}

/// Opens a SQLite pool, creating the database file when it does not exist yet.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = database_url
        .parse::<sqlx::sqlite::SqliteConnectOptions>()?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    // Every connection to `sqlite::memory:` opens a separate, empty database.
    let max_connections =
        if database_url.contains(":memory:") { 1 } else { max_connections.max(1) };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use tempo_core::config::AppConfig;

    use super::{connect_with_config, connect_with_settings};

    #[tokio::test]
    async fn file_database_is_created_on_first_connect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("tempo.db").display());

        let pool = connect_with_settings(&url, 1, 5).await.expect("connect");
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("query");

        assert_eq!(one, 1);
        assert!(dir.path().join("tempo.db").exists());
    }

    #[tokio::test]
    async fn store_config_drives_pool_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.store.database_url = format!("sqlite://{}", dir.path().join("pool.db").display());
        config.store.max_connections = 4;

        let pool = connect_with_config(&config.store).await.expect("connect");
        assert_eq!(pool.options().get_max_connections(), 4);
    }

    #[tokio::test]
    async fn in_memory_pool_is_pinned_to_one_connection() {
        let pool = connect_with_settings("sqlite::memory:", 4, 5).await.expect("connect");
        assert_eq!(pool.options().get_max_connections(), 1);
    }
}
