//! Stores for pkgmatrix: PostgreSQL repositories and an in-memory equivalent.

pub mod memory;
pub mod repositories;

pub use memory::MemoryStore;
pub use repositories::*;

use pkgmatrix_core::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Database connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| pkgmatrix_core::Error::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| pkgmatrix_core::Error::Database(e.to_string()))?;
        Ok(())
    }

    pub fn packages(&self) -> PgPackageRepository {
        PgPackageRepository::new(self.pool.clone())
    }

    pub fn versions(&self) -> PgVersionRepository {
        PgVersionRepository::new(self.pool.clone())
    }

    pub fn builds(&self) -> PgBuildRepository {
        PgBuildRepository::new(self.pool.clone())
    }
}
