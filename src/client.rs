//! HTTP access to the metrics server for the remote-data cache

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::state::api::{Endpoint, FetchError};

/// Performs the network call behind a cache entry
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Raw JSON body of a successful response
    async fn fetch(&self, endpoint: &Endpoint) -> Result<Value, FetchError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`Fetcher`] talking to the server over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &Endpoint) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint.path())).map_err(|e| {
            FetchError::Network {
                error: format!("invalid url: {}", e),
            }
        })?;

        let params = endpoint.query_params();
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &params {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<Value, FetchError> {
        let url = self.url_for(endpoint)?;
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network {
                error: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FetchError::Network {
            error: e.to_string(),
        })?;

        if !status.is_success() {
            let error = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| body.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(FetchError::Http {
                code: status.as_u16(),
                error,
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Parsing {
            error: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_urls_with_query_parameters() {
        let fetcher = HttpFetcher::new("http://localhost:3001/");
        assert_eq!(fetcher.base_url(), "http://localhost:3001");

        let url = fetcher.url_for(&Endpoint::GetDashboardMetrics).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/dashboard");

        let url = fetcher
            .url_for(&Endpoint::GetProducts {
                search: Some("oak desk".to_string()),
            })
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/products?search=oak+desk");
    }

    #[test]
    fn bad_base_url_is_a_network_error() {
        let fetcher = HttpFetcher::new("not a url");
        let err = fetcher.url_for(&Endpoint::GetDashboardMetrics).unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
