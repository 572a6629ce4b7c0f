//! PostgreSQL implementation of PackageRepository.

use async_trait::async_trait;
use pkgmatrix_core::ids::PackageId;
use pkgmatrix_core::package::{PackageUrl, TrackedPackage};
use pkgmatrix_core::ports::PackageRepository;
use pkgmatrix_core::{Error, Result};
use sqlx::{PgPool, Row};

/// PostgreSQL-backed package repository.
#[derive(Clone)]
pub struct PgPackageRepository {
    pool: PgPool,
}

impl PgPackageRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_package(&self, r: &sqlx::postgres::PgRow) -> Result<TrackedPackage> {
        let url: String = r.get("url");
        let stage: String = r.get("processing_stage");
        Ok(TrackedPackage {
            id: PackageId::from_uuid(r.get::<uuid::Uuid, _>("id")),
            url: PackageUrl::parse(&url)?,
            processing_stage: stage.parse()?,
            created_at: r.get("created_at"),
        })
    }
}

#[async_trait]
impl PackageRepository for PgPackageRepository {
    async fn insert_many(&self, packages: &[TrackedPackage]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut inserted = 0;
        for package in packages {
            let result = sqlx::query(
                "INSERT INTO packages (id, url, processing_stage, created_at) VALUES ($1, $2, $3, $4) ON CONFLICT (url) DO NOTHING",
            )
            .bind(package.id.as_uuid())
            .bind(package.url.as_str())
            .bind(package.processing_stage.as_str())
            .bind(package.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(inserted)
    }

    async fn get(&self, id: PackageId) -> Result<Option<TrackedPackage>> {
        let row = sqlx::query(
            "SELECT id, url, processing_stage, created_at FROM packages WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(self.row_to_package(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_urls(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT url FROM packages ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get::<String, _>("url")).collect())
    }

    async fn delete_by_url(&self, url: &PackageUrl) -> Result<u64> {
        // Rows written before canonicalization may differ in case or carry a trailing slash.
        let result = sqlx::query("DELETE FROM packages WHERE lower(rtrim(url, '/')) = $1")
            .bind(url.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
