//! Commit loading: pagination, head detection, retry on missing pushed
//! dates, and pushed date backfill.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::queries::{COMMITS_QUERY, HISTORY_QUERY};
use super::records::{CommitsField, HistoryRepository, PullRequestField, RepositoryData};
use super::retry::{RetryPolicy, Sleeper};
use super::types::{Commit, PullRequestDescriptor, MAX_PULL_REQUEST_COMMITS};
use super::{execute, PrError};
use crate::github::{GitHubApi, GraphQlRequest};

/// Everything needed to load the commits of one pull request.
pub(crate) struct CommitLoader<'a> {
    pub api: &'a dyn GitHubApi,
    pub cancel: &'a CancellationToken,
    pub retry: RetryPolicy,
    pub sleeper: &'a dyn Sleeper,
    pub owner: &'a str,
    pub repo: &'a str,
    pub number: u64,
    pub pr: &'a PullRequestDescriptor,
}

impl CommitLoader<'_> {
    /// Load every commit, guaranteeing the head commit has a pushed date.
    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo, number = self.number))]
    pub async fn load(&self) -> Result<Vec<Commit>, PrError> {
        let mut commits = self.load_with_retry().await?;
        if commits.len() >= MAX_PULL_REQUEST_COMMITS {
            return Err(PrError::TooManyCommits {
                max: MAX_PULL_REQUEST_COMMITS,
            });
        }

        backfill_pushed_at(&mut commits, &self.pr.head_sha);
        Ok(commits)
    }

    /// GitHub does not always return the latest commit information right
    /// after a push; reload until the head commit has a pushed date.
    async fn load_with_retry(&self) -> Result<Vec<Commit>, PrError> {
        let head_sha = &self.pr.head_sha;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut commits = self.load_raw_commits().await?;

            // a head that is not in the list will not appear on retry
            let head = commits
                .iter()
                .position(|c| c.sha == *head_sha)
                .ok_or_else(|| PrError::MissingHeadCommit {
                    sha: head_sha.clone(),
                })?;

            // GitHub does not report pushed dates for commits from forks
            if self.pr.is_cross_repository && commits[head].pushed_at.is_none() {
                self.load_pushed_at(&mut commits).await?;
            }

            if commits[head].pushed_at.is_some() {
                debug!(attempt, commits = commits.len(), "loaded commits");
                return Ok(commits);
            }

            if !self.retry.should_retry(attempt) {
                return Err(PrError::MissingPushedDate {
                    sha: head_sha.clone(),
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay_after(attempt);
            warn!(attempt, ?delay, "head commit is missing pushed date, retrying");
            self.sleep(delay).await?;
        }
    }

    async fn load_raw_commits(&self) -> Result<Vec<Commit>, PrError> {
        const CONTEXT: &str = "failed to load commits";

        let mut request = GraphQlRequest::new(COMMITS_QUERY)
            .var("owner", self.owner)
            .var("name", self.repo)
            .var("number", self.number)
            .var("cursor", Value::Null);

        let mut commits = Vec::new();
        loop {
            let data: RepositoryData<PullRequestField<CommitsField>> =
                execute(self.api, self.cancel, &request, CONTEXT).await?;
            let page = data
                .into_pull_request()
                .ok_or_else(|| {
                    PrError::pull_request_not_found(CONTEXT, self.owner, self.repo, self.number)
                })?
                .commits;

            commits.extend(page.nodes.iter().map(|n| n.commit.to_commit()));
            debug!(page = page.nodes.len(), total = commits.len(), "fetched commit page");
            if !page.page_info.advance(&mut request, "cursor") {
                break;
            }
        }
        Ok(commits)
    }

    /// Fill in pushed dates from the history of the head repository. Fork
    /// commits only carry pushed dates in the fork itself.
    async fn load_pushed_at(&self, commits: &mut [Commit]) -> Result<(), PrError> {
        const CONTEXT: &str = "failed to load commit pushed dates";

        let mut pending: HashMap<String, usize> = commits
            .iter()
            .enumerate()
            .filter(|(_, c)| c.pushed_at.is_none())
            .map(|(i, c)| (c.sha.clone(), i))
            .collect();

        let mut request = GraphQlRequest::new(HISTORY_QUERY)
            .var("owner", self.pr.head_repo_owner.as_str())
            .var("name", self.pr.head_repo_name.as_str())
            .var("oid", self.pr.head_sha.as_str())
            .var("cursor", Value::Null);

        while !pending.is_empty() {
            let data: RepositoryData<HistoryRepository> =
                execute(self.api, self.cancel, &request, CONTEXT).await?;
            let history = data
                .repository
                .and_then(|r| r.object)
                .map(|o| o.history)
                .unwrap_or_default();

            for node in &history.nodes {
                if let Some(index) = pending.remove(&node.oid) {
                    commits[index].pushed_at = node.pushed_date;
                }
            }
            debug!(remaining = pending.len(), "scanned fork history page");

            if !history.page_info.advance(&mut request, "cursor") {
                break;
            }
        }

        if !pending.is_empty() {
            return Err(PrError::BackfillIncomplete {
                missing: pending.len(),
            });
        }
        Ok(())
    }

    async fn sleep(&self, delay: Duration) -> Result<(), PrError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PrError::Cancelled),
            _ = self.sleeper.sleep(delay) => Ok(()),
        }
    }
}

/// Walk the first-parent chain from the head, giving each parent without a
/// pushed date the pushed date of its child. A parent is pushed no later
/// than its child, usually in the same push.
pub fn backfill_pushed_at(commits: &mut [Commit], head_sha: &str) {
    let mut by_sha: HashMap<String, usize> = commits
        .iter()
        .enumerate()
        .map(|(i, c)| (c.sha.clone(), i))
        .collect();

    let mut current = head_sha.to_string();
    // removing visited commits keeps malformed cyclic data from looping
    while let Some(index) = by_sha.remove(&current) {
        let Some(parent_sha) = commits[index].parents.first() else {
            break;
        };
        let Some(&parent) = by_sha.get(parent_sha) else {
            break;
        };

        if commits[parent].pushed_at.is_none() {
            commits[parent].pushed_at = commits[index].pushed_at;
        }
        current = commits[parent].sha.clone();
    }
}
