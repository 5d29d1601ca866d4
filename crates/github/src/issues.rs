//! [`IssueTracker`] and [`PullRequestReader`] over the REST API.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use pipeline::{GitHubError, IssueNumber, IssueTracker, PullRequestNumber, PullRequestReader, RepositoryId};

use crate::client::{decode, ensure_success, owner_and_name, send};
use crate::GitHubClient;

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    body: Option<String>,
}

#[async_trait]
impl IssueTracker for GitHubClient {
    #[instrument(skip_all, fields(%repository, %issue))]
    async fn add_comment(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), GitHubError> {
        let (owner, name) = owner_and_name(repository)?;
        let response = send(
            self.request(Method::POST, &format!("repos/{owner}/{name}/issues/{issue}/comments"))
                .json(&NewComment { body }),
        )
        .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestReader for GitHubClient {
    #[instrument(skip_all, fields(%repository, pull_request = %number))]
    async fn pull_request_description(
        &self,
        repository: &RepositoryId,
        number: PullRequestNumber,
    ) -> Result<Option<String>, GitHubError> {
        let (owner, name) = owner_and_name(repository)?;
        let response =
            send(self.request(Method::GET, &format!("repos/{owner}/{name}/pulls/{number}"))).await?;
        let payload: PullRequestPayload = decode(ensure_success(response).await?).await?;
        Ok(payload.body.filter(|b| !b.is_empty()))
    }
}
