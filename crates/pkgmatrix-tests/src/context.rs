//! Test context providing a migrated PostgreSQL database.

use crate::containers::PostgresContainer;
use pkgmatrix_db::{Database, PgBuildRepository, PgPackageRepository, PgVersionRepository};

/// Test context with PostgreSQL running.
///
/// Drop this to stop the container.
pub struct TestContext {
    pub postgres: PostgresContainer,
    pub db: Database,
}

impl TestContext {
    /// Start PostgreSQL and apply migrations.
    pub async fn new() -> anyhow::Result<Self> {
        crate::init_test_logging();

        let postgres = PostgresContainer::start().await?;
        let db = Database::connect(postgres.connection_string()).await?;
        db.migrate().await?;

        Ok(Self { postgres, db })
    }

    pub fn packages(&self) -> PgPackageRepository {
        self.db.packages()
    }

    pub fn versions(&self) -> PgVersionRepository {
        self.db.versions()
    }

    pub fn builds(&self) -> PgBuildRepository {
        self.db.builds()
    }
}
