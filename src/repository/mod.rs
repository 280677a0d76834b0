//! Repository layer for database operations

pub mod cache;
pub mod publishers;

use sqlx::{Pool, Sqlite};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
    pub cache: cache::NameCacheRepository,
    pub publishers: publishers::PublishersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            cache: cache::NameCacheRepository::new(pool.clone()),
            publishers: publishers::PublishersRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Migrated in-memory database; one connection so every query sees the same data
#[cfg(test)]
pub(crate) async fn test_pool() -> Pool<Sqlite> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations apply");
    pool
}
