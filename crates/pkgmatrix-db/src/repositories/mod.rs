//! Repository implementations for PostgreSQL.

mod build;
mod package;
mod version;

pub use build::PgBuildRepository;
pub use package::PgPackageRepository;
pub use version::PgVersionRepository;
