//! PostgreSQL implementation of BuildRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pkgmatrix_core::build::{BuildCell, BuildStatus};
use pkgmatrix_core::ids::{BuildId, PackageId, VersionId};
use pkgmatrix_core::matrix::Matrix;
use pkgmatrix_core::ports::BuildRepository;
use pkgmatrix_core::{Error, Result};
use sqlx::{PgPool, Row};

/// PostgreSQL-backed build repository.
#[derive(Clone)]
pub struct PgBuildRepository {
    pool: PgPool,
}

impl PgBuildRepository {
    /// Create a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_build(&self, r: &sqlx::postgres::PgRow) -> Result<BuildCell> {
        let platform: String = r.get("platform");
        let toolchain: String = r.get("toolchain_version");
        let status: String = r.get("status");
        Ok(BuildCell {
            id: BuildId::from_uuid(r.get::<uuid::Uuid, _>("id")),
            version_id: VersionId::from_uuid(r.get::<uuid::Uuid, _>("version_id")),
            platform: platform.parse()?,
            toolchain: toolchain.parse()?,
            status: status.parse()?,
            job_url: r.get("job_url"),
            created_at: r.get("created_at"),
        })
    }
}

#[async_trait]
impl BuildRepository for PgBuildRepository {
    async fn create(&self, build: &BuildCell) -> Result<BuildId> {
        let result = sqlx::query(
            "INSERT INTO builds (id, version_id, platform, toolchain_version, status, job_url, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(build.id.as_uuid())
        .bind(build.version_id.as_uuid())
        .bind(build.platform.as_str())
        .bind(build.toolchain.to_string())
        .bind(build.status.as_str())
        .bind(&build.job_url)
        .bind(build.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(build.id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::DuplicateBuild {
                    version_id: build.version_id,
                    platform: build.platform,
                    toolchain: build.toolchain,
                })
            }
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }

    async fn list_for_version(&self, version_id: VersionId) -> Result<Vec<BuildCell>> {
        let rows = sqlx::query(
            "SELECT id, version_id, platform, toolchain_version, status, job_url, created_at FROM builds WHERE version_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(version_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        rows.iter().map(|r| self.row_to_build(r)).collect()
    }

    async fn set_job_url(&self, id: BuildId, job_url: &str) -> Result<()> {
        sqlx::query("UPDATE builds SET job_url = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(job_url)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn build_candidates(&self, matrix: &Matrix, limit: u32) -> Result<Vec<PackageId>> {
        let platforms: Vec<String> = matrix.platforms().iter().map(|p| p.to_string()).collect();
        let toolchains: Vec<String> = matrix.toolchains().iter().map(|t| t.to_string()).collect();

        let rows = sqlx::query(
            r#"SELECT p.id
               FROM packages p
               WHERE EXISTS (
                   SELECT 1
                   FROM versions v
                   WHERE v.package_id = p.id
                     AND v.latest IS NOT NULL
                     AND v.reference_name IS NOT NULL
                     AND (
                         SELECT COUNT(*)
                         FROM builds b
                         WHERE b.version_id = v.id
                           AND b.platform = ANY($1)
                           AND b.toolchain_version = ANY($2)
                     ) < $3
               )
               ORDER BY p.created_at ASC, p.id ASC
               LIMIT $4"#,
        )
        .bind(&platforms[..])
        .bind(&toolchains[..])
        .bind(matrix.len() as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| PackageId::from_uuid(r.get::<uuid::Uuid, _>("id")))
            .collect())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"DELETE FROM builds b
               USING versions v
               WHERE b.version_id = v.id
                 AND (
                     v.latest IS NULL
                     OR (b.status = $1 AND b.created_at < $2)
                 )"#,
        )
        .bind(BuildStatus::Pending.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        tracing::debug!(deleted = result.rows_affected(), %cutoff, "Deleted stale builds");
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM builds")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.get::<i64, _>("count") as u64)
    }
}
