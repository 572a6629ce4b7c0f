//! Test helper functions and utilities.

use pkgmatrix_core::build::BuildCell;
use pkgmatrix_core::package::TrackedPackage;
use pkgmatrix_core::ports::{BuildRepository, PackageRepository, VersionRepository};
use pkgmatrix_core::settings::CallbackParams;
use pkgmatrix_core::version::Version;
use pkgmatrix_remote::RemoteConfig;
use std::collections::HashMap;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECT_ID: &str = "19564054";
pub const PACKAGE_LIST_PATH: &str = "/packages.json";

/// Site callback parameters handed to every job.
pub fn callback() -> CallbackParams {
    CallbackParams::new("https://swiftpackageindex.com/api", "builder-token")
}

/// Store a package together with its versions.
pub async fn seed_package(
    packages: &dyn PackageRepository,
    versions: &dyn VersionRepository,
    package: &TrackedPackage,
    package_versions: &[Version],
) -> anyhow::Result<()> {
    packages.insert_many(std::slice::from_ref(package)).await?;
    for version in package_versions {
        versions.create(version).await?;
    }
    Ok(())
}

pub async fn seed_builds(builds: &dyn BuildRepository, cells: &[BuildCell]) -> anyhow::Result<()> {
    for cell in cells {
        builds.create(cell).await?;
    }
    Ok(())
}

/// Wiremock stand-in for the GitLab API and the package listing.
pub struct RemoteMock {
    pub server: MockServer,
}

impl RemoteMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> RemoteConfig {
        RemoteConfig {
            package_list_url: format!("{}{}", self.server.uri(), PACKAGE_LIST_PATH),
            gitlab_api_url: self.server.uri(),
            project_id: PROJECT_ID.to_string(),
            pipeline_token: "pipeline-token".to_string(),
            private_token: "private-token".to_string(),
            pipeline_ref: "main".to_string(),
            request_timeout_secs: 5,
        }
    }

    pub async fn serve_package_list(&self, urls: &[&str]) {
        Mock::given(method("GET"))
            .and(path(PACKAGE_LIST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(urls))
            .mount(&self.server)
            .await;
    }

    pub async fn fail_package_list(&self) {
        Mock::given(method("GET"))
            .and(path(PACKAGE_LIST_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
    }

    /// Report `pending` and `running` pipeline totals.
    pub async fn with_occupancy(&self, pending: u64, running: u64) {
        let pipelines = format!("/projects/{}/pipelines", PROJECT_ID);
        for (status, total) in [("pending", pending), ("running", running)] {
            Mock::given(method("GET"))
                .and(path(pipelines.as_str()))
                .and(query_param("status", status))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("x-total", total.to_string().as_str())
                        .set_body_json(serde_json::json!([])),
                )
                .mount(&self.server)
                .await;
        }
    }

    pub async fn accept_triggers(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/projects/[^/]+/trigger/pipeline$"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 1,
                "status": "created",
                "web_url": "https://gitlab.example.com/builder/-/pipelines/1"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn reject_triggers(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/projects/[^/]+/trigger/pipeline$"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Query parameters of every trigger request received so far.
    pub async fn triggered(&self) -> Vec<HashMap<String, String>> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/trigger/pipeline"))
            .map(|r| r.url.query_pairs().into_owned().collect())
            .collect()
    }
}
