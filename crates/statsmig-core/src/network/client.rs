//! HTTP client for talking to the statistics index.
//!
//! Provides a wrapper around reqwest with:
//! - Configurable timeouts
//! - User-agent management
//! - Mapping of non-success responses to [`MigrateError::Index`]

use crate::config::NetworkConfig;
use crate::{MigrateError, Result};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Longest slice of an error body carried into an error message.
const ERROR_BODY_LIMIT: usize = 512;

/// HTTP client used by the Solr index.
pub struct HttpClient {
    client: Client,
    /// Default timeout for requests.
    default_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a new HTTP client with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| MigrateError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!("GET {} {:?}", url, params);
        let response = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| request_error("GET", &url, e))?;

        let response = check_response_status(response, &url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| request_error("GET", &url, e))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST a JSON body to `url` with query parameters.
    pub async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<()> {
        debug!("POST {} {:?}", url, params);
        let response = self
            .client
            .post(url.clone())
            .query(params)
            .json(body)
            .send()
            .await
            .map_err(|e| request_error("POST", &url, e))?;

        check_response_status(response, &url).await?;
        Ok(())
    }
}

fn request_error(method: &str, url: &Url, err: reqwest::Error) -> MigrateError {
    if err.is_timeout() {
        MigrateError::Timeout(format!("{} {}", method, url))
    } else {
        MigrateError::Network {
            message: format!("{} {} failed: {}", method, url, err),
            source: Some(err),
        }
    }
}

async fn check_response_status(response: Response, url: &Url) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(index_error(status, url, &body))
}

/// Build an index error from a failed response, keeping the body short.
fn index_error(status: StatusCode, url: &Url, body: &str) -> MigrateError {
    let mut detail: String = body.trim().chars().take(ERROR_BODY_LIMIT).collect();
    if detail.is_empty() {
        detail = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    MigrateError::Index {
        status: status.as_u16(),
        message: format!("{}: {}", url.path(), detail),
    }
}
