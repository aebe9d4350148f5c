//! HTTP client for the GitHub REST API

use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::AgentError;

const USER_AGENT: &str = concat!("jeeves/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// HTTP client for GitHub communication
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, AgentError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| AgentError::ConfigError(format!("Invalid GitHub API URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AgentError::ConfigError(format!(
                "GitHub API URL cannot be a base: {}",
                base_url
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            "x-github-api-version",
            header::HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL from path segments, percent-encoding each one
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, AgentError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AgentError::ConfigError(format!("Invalid GitHub API URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a POST request with a bearer token
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        token: &str,
        body: &B,
    ) -> Result<T, AgentError> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url.clone())
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP POST {} failed: {} - {}", url, status, body);
            return Err(api_error(status, &body));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

fn api_error(status: StatusCode, body: &str) -> AgentError {
    #[derive(serde::Deserialize)]
    struct GithubErrorBody {
        message: String,
    }

    match serde_json::from_str::<GithubErrorBody>(body) {
        Ok(parsed) => AgentError::ApiError(format!("{}: {}", status, parsed.message)),
        Err(_) => AgentError::ApiError(format!("{}: {}", status, body)),
    }
}
