//! Postgres connection pool.
//!
//! [`Database`] wraps an sqlx pool and leases one connection per routed
//! event. A leased `PoolConnection` goes back to the pool when dropped.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tracing::info;

use crate::config::DatabaseConfig;
use pk_core::{ConnectionPool, PoolError, PoolResult};

/// A connection leased from the pool.
pub type DbConnection = PoolConnection<Postgres>;

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Opens the pool and checks that the server is reachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .test_before_acquire(true)
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "Database connected");
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every connection; later acquisitions fail with `PoolError::Closed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConnectionPool for Database {
    type Connection = DbConnection;

    async fn acquire(&self) -> PoolResult<DbConnection> {
        self.pool.acquire().await.map_err(map_pool_error)
    }
}

fn map_pool_error(err: sqlx::Error) -> PoolError {
    match err {
        sqlx::Error::PoolTimedOut => PoolError::Timeout,
        sqlx::Error::PoolClosed => PoolError::Closed,
        other => PoolError::backend(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_mapped() {
        assert!(matches!(map_pool_error(sqlx::Error::PoolTimedOut), PoolError::Timeout));
        assert!(matches!(map_pool_error(sqlx::Error::PoolClosed), PoolError::Closed));
        assert!(matches!(
            map_pool_error(sqlx::Error::RowNotFound),
            PoolError::Backend(_)
        ));
    }

    #[tokio::test]
    async fn test_closed_pool_refuses_leases() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/pluralkit")
            .unwrap();
        let db = Database::from_pool(pool);
        db.close().await;

        assert!(matches!(db.acquire().await, Err(PoolError::Closed)));
    }
}
