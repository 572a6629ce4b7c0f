//! Package listing fetcher.

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use async_trait::async_trait;
use pkgmatrix_core::ports::PackageListSource;
use pkgmatrix_core::Result;
use tracing::debug;

/// Reads the source-of-truth package listing: a JSON array of URLs.
pub struct HttpPackageList {
    url: String,
    client: reqwest::Client,
}

impl HttpPackageList {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        config.validate_package_list()?;
        Ok(Self {
            url: config.package_list_url.clone(),
            client: crate::http_client(config)?,
        })
    }

    async fn get(&self) -> std::result::Result<Vec<String>, RemoteError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::UnexpectedStatus {
                endpoint: self.url.clone(),
                status,
                body,
            });
        }
        let urls: Vec<String> = response.json().await?;
        Ok(urls)
    }
}

#[async_trait]
impl PackageListSource for HttpPackageList {
    async fn fetch(&self) -> Result<Vec<String>> {
        let urls = self.get().await?;
        debug!(count = urls.len(), url = %self.url, "Fetched package list");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmatrix_core::Error;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> RemoteConfig {
        RemoteConfig {
            package_list_url: format!("{}/packages.json", server.uri()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_urls_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/packages.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                "https://github.com/a/one.git",
                "https://github.com/b/two.git"
            ])))
            .mount(&server)
            .await;

        let source = HttpPackageList::new(&config(&server)).unwrap();
        let urls = source.fetch().await.unwrap();

        assert_eq!(
            urls,
            vec!["https://github.com/a/one.git", "https://github.com/b/two.git"]
        );
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"a list\"}"))
            .mount(&server)
            .await;

        let source = HttpPackageList::new(&config(&server)).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpPackageList::new(&config(&server)).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, Error::Network(_)));
    }
}
