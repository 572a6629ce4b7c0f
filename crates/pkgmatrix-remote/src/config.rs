//! Remote endpoint configuration.

use pkgmatrix_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the package listing and the CI system live, and how to authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// URL serving the package listing as a JSON array of strings.
    #[serde(default)]
    pub package_list_url: String,
    /// GitLab API root, e.g. `https://gitlab.com/api/v4`.
    #[serde(default = "default_gitlab_api_url")]
    pub gitlab_api_url: String,
    /// Numeric id or URL-encoded path of the builder project.
    #[serde(default)]
    pub project_id: String,
    /// Pipeline trigger token.
    #[serde(default)]
    pub pipeline_token: String,
    /// Access token used to list pipelines.
    #[serde(default)]
    pub private_token: String,
    /// Branch of the builder project pipelines run on.
    #[serde(default = "default_pipeline_ref")]
    pub pipeline_ref: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gitlab_api_url() -> String {
    "https://gitlab.com/api/v4".to_string()
}

fn default_pipeline_ref() -> String {
    "main".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            package_list_url: String::new(),
            gitlab_api_url: default_gitlab_api_url(),
            project_id: String::new(),
            pipeline_token: String::new(),
            private_token: String::new(),
            pipeline_ref: default_pipeline_ref(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check the settings the GitLab client needs.
    pub fn validate_gitlab(&self) -> Result<()> {
        require("remote.gitlab_api_url", &self.gitlab_api_url)?;
        require("remote.project_id", &self.project_id)?;
        require("remote.pipeline_token", &self.pipeline_token)?;
        require("remote.private_token", &self.private_token)?;
        require("remote.pipeline_ref", &self.pipeline_ref)?;
        if self.request_timeout_secs == 0 {
            return Err(Error::Configuration(
                "remote.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Check the settings the package list fetcher needs.
    pub fn validate_package_list(&self) -> Result<()> {
        require("remote.package_list_url", &self.package_list_url)
    }

    pub(crate) fn gitlab_project_url(&self) -> String {
        format!(
            "{}/projects/{}",
            self.gitlab_api_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

fn require(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{} is not set", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tokens_are_configuration_errors() {
        let config = RemoteConfig {
            project_id: "42".into(),
            pipeline_token: "trigger".into(),
            ..Default::default()
        };
        let err = config.validate_gitlab().unwrap_err();
        assert!(err.to_string().contains("remote.private_token"));
    }

    #[test]
    fn test_project_url_strips_trailing_slash() {
        let config = RemoteConfig {
            gitlab_api_url: "http://gitlab.local/api/v4/".into(),
            project_id: "42".into(),
            ..Default::default()
        };
        assert_eq!(
            config.gitlab_project_url(),
            "http://gitlab.local/api/v4/projects/42"
        );
    }
}
