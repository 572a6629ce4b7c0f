//! Integration test infrastructure for pkgmatrix.
//!
//! Provides a testcontainers-backed PostgreSQL context, data fixtures and
//! wiremock stand-ins for the GitLab API and the package listing.
//!
//! # Usage
//!
//! ```ignore
//! use pkgmatrix_tests::TestContext;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let ctx = TestContext::new().await.unwrap();
//!     // Use ctx.db, ctx.packages(), ctx.builds(), etc.
//! }
//! ```

pub mod containers;
pub mod context;
pub mod fixtures;
pub mod helpers;

pub use context::TestContext;
pub use fixtures::*;
pub use helpers::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,pkgmatrix=debug")),
        )
        .with_test_writer()
        .try_init();
}
