//! GitHub effect interpreter using octocrab.
//!
//! Implements `GitHubInterpreter` for `OctocrabClient`. Listing and body
//! updates are idempotent and retried on transient errors; creation is not
//! retried.

use octocrab::models::pulls::PullRequest;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::types::{PrNumber, ReviewRequest};

use super::client::OctocrabClient;
use super::error::GitHubApiError;
use super::retry::{RetryConfig, RetryPolicy, retry_with_backoff};

const PAGE_SIZE: u8 = 100;

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        let policy = match effect {
            GitHubEffect::CreatePr { .. } => RetryPolicy::NoRetry,
            _ => RetryPolicy::RetryTransient,
        };
        interpret_github_effect(self, effect, RetryConfig::DEFAULT, policy).await
    }
}

/// Interprets a GitHub effect, executing it against the GitHub API.
pub async fn interpret_github_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
    retry_config: RetryConfig,
    retry_policy: RetryPolicy,
) -> Result<GitHubResponse, GitHubApiError> {
    tracing::debug!(?effect, repo = %client.repo(), "GitHub effect");
    retry_with_backoff(retry_config, retry_policy, || {
        execute_effect(client, effect.clone())
    })
    .await
}

/// Executes a single effect without retry logic.
async fn execute_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::ListPrs { head } => list_prs(client, &head).await,
        GitHubEffect::CreatePr {
            base,
            head,
            title,
            body,
        } => create_pr(client, base, head, title, body).await,
        GitHubEffect::UpdatePrBody { pr, body } => update_pr_body(client, pr, body).await,
    }
}

/// Maps the API's pull request onto the fields the train tracks.
fn to_review_request(pull: PullRequest) -> ReviewRequest {
    ReviewRequest {
        number: PrNumber(pull.number),
        url: pull.html_url.map(|u| u.to_string()).unwrap_or_default(),
        title: pull.title.unwrap_or_default(),
        body: pull.body,
        closed_at: pull.closed_at,
        merged: pull.merged_at.is_some(),
    }
}

// ─── PR Operations ────────────────────────────────────────────────────────────

async fn list_prs(client: &OctocrabClient, head: &str) -> Result<GitHubResponse, GitHubApiError> {
    // The head filter needs the owner prefix; a bare branch name is ignored.
    let head_filter = format!("{}:{}", client.owner(), head);
    let mut page = 1u32;
    let mut all_prs = Vec::new();

    loop {
        let result = client
            .inner()
            .pulls(client.owner(), client.repo_name())
            .list()
            .state(octocrab::params::State::All)
            .head(head_filter.clone())
            .per_page(PAGE_SIZE)
            .page(page)
            .send()
            .await;

        match result {
            Ok(page_result) => {
                let items = page_result.items;
                let is_last_page = items.len() < usize::from(PAGE_SIZE);

                all_prs.extend(
                    items
                        .into_iter()
                        .filter(|pull| pull.head.ref_field == head)
                        .map(to_review_request),
                );

                if is_last_page {
                    break;
                }
                page += 1;
            }
            Err(e) => return Err(GitHubApiError::from_octocrab(e)),
        }
    }

    tracing::debug!(head, count = all_prs.len(), "listed pull requests");
    Ok(GitHubResponse::Prs(all_prs))
}

async fn create_pr(
    client: &OctocrabClient,
    base: String,
    head: String,
    title: String,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .pulls(client.owner(), client.repo_name())
        .create(title, head, base)
        .body(body)
        .send()
        .await;

    match result {
        Ok(pull) => Ok(GitHubResponse::PrCreated(to_review_request(pull))),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

async fn update_pr_body(
    client: &OctocrabClient,
    pr: PrNumber,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .pulls(client.owner(), client.repo_name())
        .update(pr.0)
        .body(body)
        .send()
        .await;

    match result {
        Ok(_) => Ok(GitHubResponse::Ok),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}
