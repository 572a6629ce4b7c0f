//! HTTP adapters for pkgmatrix.
//!
//! [`GitlabClient`] implements the `BuildQueue` port against GitLab's
//! pipeline trigger and pipeline listing endpoints. [`HttpPackageList`]
//! implements `PackageListSource` over a JSON array of package URLs.

pub mod config;
pub mod error;
pub mod gitlab;
pub mod package_list;

pub use config::RemoteConfig;
pub use error::RemoteError;
pub use gitlab::GitlabClient;
pub use package_list::HttpPackageList;

/// Build the shared HTTP client with the configured request timeout.
pub fn http_client(config: &RemoteConfig) -> Result<reqwest::Client, RemoteError> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("pkgmatrix/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
