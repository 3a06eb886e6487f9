pub mod actor;
pub mod commits;
pub mod context;
pub mod cursor;
pub mod locator;
pub mod queries;
pub mod records;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use context::PullRequestContext;
pub use locator::{Locator, PartialPullRequest};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use types::{
    Comment, Commit, File, FileStatus, PullRequestDescriptor, Review, ReviewState,
    MAX_PULL_REQUEST_COMMITS, MAX_PULL_REQUEST_FILES,
};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::github::{ApiError, GitHubApi, GraphQlRequest};

#[derive(Debug, Error)]
pub enum PrError {
    #[error("Invalid pull request locator: {0}")]
    InvalidLocator(String),

    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,

    #[error("too many files in pull request, maximum is {max}")]
    TooManyFiles { max: usize },

    #[error("too many commits in pull request, maximum is {max}")]
    TooManyCommits { max: usize },

    #[error("head commit {sha:.10} is missing, probably due to a force-push")]
    MissingHeadCommit { sha: String },

    #[error("head commit {sha:.10} is missing pushed date after {attempts} attempts")]
    MissingPushedDate { sha: String, attempts: u32 },

    #[error("{missing} commits were not found while loading pushed dates")]
    BackfillIncomplete { missing: usize },

    #[error("{context}: {source}")]
    Api {
        context: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("{context}: unexpected response shape: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl PrError {
    /// True if GitHub reported the pull request (or a resource it
    /// references) as not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PrError::Api { source, .. } if source.is_not_found())
    }

    pub(crate) fn pull_request_not_found(
        context: &'static str,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Self {
        PrError::Api {
            context,
            source: ApiError::NotFound(format!("pull request {}/{}#{}", owner, repo, number)),
        }
    }
}

/// Run a GraphQL request and decode its `data`, failing fast when `cancel`
/// fires while the request is in flight.
pub(crate) async fn execute<T: DeserializeOwned>(
    api: &dyn GitHubApi,
    cancel: &CancellationToken,
    request: &GraphQlRequest,
    context: &'static str,
) -> Result<T, PrError> {
    let data = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PrError::Cancelled),
        result = api.query(request) => result.map_err(|source| PrError::Api { context, source })?,
    };
    serde_json::from_value(data).map_err(|e| PrError::Decode {
        context,
        message: e.to_string(),
    })
}
