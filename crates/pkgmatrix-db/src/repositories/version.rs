//! PostgreSQL implementation of VersionRepository.

use async_trait::async_trait;
use pkgmatrix_core::ids::{PackageId, VersionId};
use pkgmatrix_core::ports::VersionRepository;
use pkgmatrix_core::version::{Channel, Reference, Version};
use pkgmatrix_core::{Error, Result};
use sqlx::{PgPool, Row};

/// PostgreSQL-backed version repository.
#[derive(Clone)]
pub struct PgVersionRepository {
    pool: PgPool,
}

impl PgVersionRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn reference_to_columns(reference: &Option<Reference>) -> (Option<&'static str>, Option<&str>) {
        match reference {
            Some(Reference::Branch(name)) => (Some("branch"), Some(name.as_str())),
            Some(Reference::Tag(name)) => (Some("tag"), Some(name.as_str())),
            None => (None, None),
        }
    }

    fn row_to_version(&self, r: &sqlx::postgres::PgRow) -> Result<Version> {
        let kind: Option<String> = r.get("reference_kind");
        let name: Option<String> = r.get("reference_name");
        let reference = match (kind.as_deref(), name) {
            (Some("branch"), Some(name)) => Some(Reference::Branch(name)),
            (Some("tag"), Some(name)) => Some(Reference::Tag(name)),
            _ => None,
        };
        let latest = r
            .get::<Option<String>, _>("latest")
            .map(|s| s.parse::<Channel>())
            .transpose()?;

        Ok(Version {
            id: VersionId::from_uuid(r.get::<uuid::Uuid, _>("id")),
            package_id: PackageId::from_uuid(r.get::<uuid::Uuid, _>("package_id")),
            reference,
            latest,
            created_at: r.get("created_at"),
        })
    }
}

#[async_trait]
impl VersionRepository for PgVersionRepository {
    async fn create(&self, version: &Version) -> Result<VersionId> {
        let (kind, name) = Self::reference_to_columns(&version.reference);
        sqlx::query(
            "INSERT INTO versions (id, package_id, reference_kind, reference_name, latest, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(version.id.as_uuid())
        .bind(version.package_id.as_uuid())
        .bind(kind)
        .bind(name)
        .bind(version.latest.map(|c| c.as_str()))
        .bind(version.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(version.id)
    }

    async fn get(&self, id: VersionId) -> Result<Option<Version>> {
        let row = sqlx::query(
            "SELECT id, package_id, reference_kind, reference_name, latest, created_at FROM versions WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(self.row_to_version(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_significant(&self, package_id: PackageId) -> Result<Vec<Version>> {
        let rows = sqlx::query(
            "SELECT id, package_id, reference_kind, reference_name, latest, created_at FROM versions WHERE package_id = $1 AND latest IS NOT NULL ORDER BY created_at ASC, id ASC",
        )
        .bind(package_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        rows.iter().map(|r| self.row_to_version(r)).collect()
    }
}
