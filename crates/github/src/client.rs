//! Authenticated transport shared by every GitHub adapter in this crate.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use pipeline::{GitHubError, RepositoryId};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("foreman/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error bodies are cut to this many bytes before being stored in an error.
const MAX_ERROR_BODY: usize = 500;

/// GitHub API client authenticated with a personal access or installation
/// token.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client for the API rooted at `api_url` (REST root; GraphQL is
    /// served from `<api_url>/graphql`).
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GitHubError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Starts an authenticated request to `path` (relative to the API root).
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Runs a GraphQL query or mutation and returns its `data` member.
    pub(crate) async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GitHubError> {
        let response = send(
            self.request(Method::POST, "graphql")
                .json(&json!({ "query": query, "variables": variables })),
        )
        .await?;
        let response = ensure_success(response).await?;
        let body: GraphQlResponse<T> = decode(response).await?;

        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(GitHubError::GraphQl(messages.join("; ")));
        }
        body.data
            .ok_or_else(|| GitHubError::Decode("GraphQL response has no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Sends a request, mapping connection-level failures to
/// [`GitHubError::Transport`].
pub(crate) async fn send(builder: RequestBuilder) -> Result<Response, GitHubError> {
    builder
        .send()
        .await
        .map_err(|e| GitHubError::Transport(e.to_string()))
}

/// Turns a non-2xx response into [`GitHubError::Api`].
pub(crate) async fn ensure_success(response: Response) -> Result<Response, GitHubError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(api_error(response).await)
    }
}

/// Builds [`GitHubError::Api`] from a response, keeping a bounded body excerpt.
pub(crate) async fn api_error(response: Response) -> GitHubError {
    let status = response.status();
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
    }
    GitHubError::Api {
        status: status.as_u16(),
        message,
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GitHubError> {
    response
        .json::<T>()
        .await
        .map_err(|e| GitHubError::Decode(e.to_string()))
}

/// Splits a repository id for use in REST paths.
pub(crate) fn owner_and_name(repository: &RepositoryId) -> Result<(&str, &str), GitHubError> {
    repository
        .owner_and_name()
        .ok_or_else(|| GitHubError::InvalidRepository(repository.clone()))
}

pub(crate) fn is_not_found(response: &Response) -> bool {
    response.status() == StatusCode::NOT_FOUND
}
