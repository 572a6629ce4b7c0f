//! GitLab pipeline client.

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use async_trait::async_trait;
use pkgmatrix_core::ports::{BuildJob, BuildQueue, TriggeredJob};
use pkgmatrix_core::Result;
use serde::Deserialize;
use tracing::{debug, info, warn};

const TOTAL_HEADER: &str = "x-total";

/// Triggers builder pipelines and reports how many are in flight.
pub struct GitlabClient {
    config: RemoteConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    web_url: Option<String>,
}

impl GitlabClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        config.validate_gitlab()?;
        let client = crate::http_client(&config)?;
        Ok(Self { config, client })
    }

    fn trigger_params(&self, job: &BuildJob) -> Vec<(&'static str, String)> {
        vec![
            ("token", self.config.pipeline_token.clone()),
            ("ref", self.config.pipeline_ref.clone()),
            ("variables[API_BASEURL]", job.callback.api_base_url.clone()),
            ("variables[BUILD_PLATFORM]", job.platform.to_string()),
            ("variables[BUILDER_TOKEN]", job.callback.builder_token.clone()),
            ("variables[CLONE_URL]", job.clone_url.to_string()),
            ("variables[REFERENCE]", job.reference.name().to_string()),
            ("variables[SWIFT_VERSION]", job.toolchain.to_string()),
            ("variables[VERSION_ID]", job.version_id.as_uuid().to_string()),
        ]
    }

    async fn count_pipelines(&self, status: &str) -> std::result::Result<u64, RemoteError> {
        let endpoint = format!("{}/pipelines", self.config.gitlab_project_url());
        let response = self
            .client
            .get(&endpoint)
            .header("PRIVATE-TOKEN", &self.config.private_token)
            .query(&[("status", status), ("per_page", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::UnexpectedStatus {
                endpoint,
                status,
                body,
            });
        }

        let total = response
            .headers()
            .get(TOTAL_HEADER)
            .ok_or_else(|| RemoteError::InvalidResponse(format!("missing {} header", TOTAL_HEADER)))?
            .to_str()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?
            .trim()
            .parse::<u64>()
            .map_err(|e| RemoteError::InvalidResponse(format!("{}: {}", TOTAL_HEADER, e)))?;

        debug!(status, total, "Counted pipelines");
        Ok(total)
    }

    async fn post_trigger(&self, job: &BuildJob) -> std::result::Result<TriggeredJob, RemoteError> {
        let endpoint = format!("{}/trigger/pipeline", self.config.gitlab_project_url());
        let response = self
            .client
            .post(&endpoint)
            .query(&self.trigger_params(job))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::UnexpectedStatus {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body: TriggerResponse = response.json().await?;
        Ok(TriggeredJob {
            web_url: body.web_url,
        })
    }
}

#[async_trait]
impl BuildQueue for GitlabClient {
    async fn occupancy(&self) -> Result<u64> {
        let (pending, running) = tokio::try_join!(
            self.count_pipelines("pending"),
            self.count_pipelines("running"),
        )?;
        Ok(pending + running)
    }

    async fn trigger(&self, job: &BuildJob) -> Result<TriggeredJob> {
        match self.post_trigger(job).await {
            Ok(triggered) => {
                info!(
                    version_id = %job.version_id,
                    platform = %job.platform,
                    toolchain = %job.toolchain,
                    web_url = triggered.web_url.as_deref().unwrap_or("-"),
                    "Pipeline triggered"
                );
                Ok(triggered)
            }
            Err(e) => {
                warn!(
                    version_id = %job.version_id,
                    platform = %job.platform,
                    toolchain = %job.toolchain,
                    error = %e,
                    "Pipeline trigger failed"
                );
                Err(e.into())
            }
        }
    }
}
