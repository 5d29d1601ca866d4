//! [`DocumentStore`] over the repository contents API.
//!
//! The concurrency token is the file's blob SHA. GitHub rejects an update whose
//! `sha` no longer matches the branch head with `409 Conflict`, and a create
//! (no `sha`) of a file that already exists with `422 Unprocessable Entity`;
//! both surface as [`GitHubError::Conflict`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use pipeline::{
    BranchName, ContentToken, DocumentCommit, DocumentPath, DocumentStore, GitHubError,
    RepositoryId, StoredDocument,
};

use crate::client::{api_error, decode, ensure_success, is_not_found, owner_and_name, send};
use crate::GitHubClient;

/// Documents stored as files on one branch of each repository.
#[derive(Debug, Clone)]
pub struct RepositoryContents {
    client: GitHubClient,
    branch: BranchName,
}

impl RepositoryContents {
    pub fn new(client: GitHubClient, branch: BranchName) -> Self {
        Self { client, branch }
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }
}

#[derive(Debug, Deserialize)]
struct FilePayload {
    sha: String,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutFile<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutFileResponse {
    content: PutFileContent,
}

#[derive(Debug, Deserialize)]
struct PutFileContent {
    sha: String,
}

fn decode_content(payload: &FilePayload) -> Result<String, GitHubError> {
    match payload.encoding.as_deref() {
        Some("base64") => {}
        other => {
            return Err(GitHubError::Decode(format!(
                "unsupported content encoding {other:?} (file too large for the contents API?)"
            )))
        }
    }
    let packed: String = payload
        .content
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(packed)
        .map_err(|e| GitHubError::Decode(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| GitHubError::Decode(format!("content is not UTF-8: {e}")))
}

fn token(sha: String) -> Result<ContentToken, GitHubError> {
    ContentToken::new(sha).ok_or_else(|| GitHubError::Decode("empty blob sha".to_string()))
}

#[async_trait]
impl DocumentStore for RepositoryContents {
    #[instrument(skip_all, fields(%repository, %path, branch = %self.branch))]
    async fn fetch(
        &self,
        repository: &RepositoryId,
        path: &DocumentPath,
    ) -> Result<Option<StoredDocument>, GitHubError> {
        let (owner, name) = owner_and_name(repository)?;
        let response = send(
            self.client
                .request(Method::GET, &format!("repos/{owner}/{name}/contents/{path}"))
                .query(&[("ref", self.branch.as_str())]),
        )
        .await?;

        if is_not_found(&response) {
            debug!("document does not exist yet");
            return Ok(None);
        }
        let payload: FilePayload = decode(ensure_success(response).await?).await?;
        let content = decode_content(&payload)?;
        Ok(Some(StoredDocument {
            content,
            token: token(payload.sha)?,
        }))
    }

    #[instrument(skip_all, fields(%repository, %path, branch = %self.branch))]
    async fn commit(
        &self,
        repository: &RepositoryId,
        path: &DocumentPath,
        commit: DocumentCommit,
    ) -> Result<ContentToken, GitHubError> {
        let (owner, name) = owner_and_name(repository)?;
        let body = PutFile {
            message: &commit.message,
            content: STANDARD.encode(commit.content.as_bytes()),
            branch: self.branch.as_str(),
            sha: commit.expected.as_ref().map(ContentToken::as_str),
        };
        let response = send(
            self.client
                .request(Method::PUT, &format!("repos/{owner}/{name}/contents/{path}"))
                .json(&body),
        )
        .await?;

        let status = response.status();
        let stale = status == StatusCode::CONFLICT
            || (status == StatusCode::UNPROCESSABLE_ENTITY && commit.expected.is_none());
        if stale {
            warn!(status = status.as_u16(), "document changed since it was read");
            return Err(GitHubError::Conflict {
                repository: repository.clone(),
                path: path.clone(),
            });
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let written: PutFileResponse = decode(response).await?;
        token(written.content.sha)
    }
}
