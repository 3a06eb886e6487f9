use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::commits::CommitLoader;
use super::locator::Locator;
use super::queries::COMMENTS_AND_REVIEWS_QUERY;
use super::records::{ActivityField, PullRequestField, RepositoryData};
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::types::{
    Comment, Commit, File, PullRequestDescriptor, Review, MAX_PULL_REQUEST_FILES,
};
use super::{execute, PrError};
use crate::github::{GitHubApi, GraphQlRequest};

/// Loads and caches the state of one pull request.
///
/// Create a new context for each pull request you handle; every accessor
/// queries GitHub on its first call and returns the cached result after.
/// A failed call caches nothing and can be repeated.
pub struct PullRequestContext {
    api: Arc<dyn GitHubApi>,
    cancel: CancellationToken,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,

    owner: String,
    repo: String,
    number: u64,
    pr: PullRequestDescriptor,

    files: Option<Vec<File>>,
    commits: Option<Vec<Commit>>,
    comments: Option<Vec<Comment>>,
    reviews: Option<Vec<Review>>,
}

impl std::fmt::Debug for PullRequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullRequestContext")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("number", &self.number)
            .field("pr", &self.pr)
            .finish_non_exhaustive()
    }
}

impl PullRequestContext {
    /// Resolve `locator` and build a context around it. `cancel` aborts any
    /// request (or retry delay) this context is waiting on.
    pub async fn new(
        api: Arc<dyn GitHubApi>,
        locator: &Locator,
        cancel: CancellationToken,
    ) -> Result<Self, PrError> {
        let pr = locator.resolve(api.as_ref(), &cancel).await?;
        Ok(Self {
            api,
            cancel,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            owner: locator.owner().to_string(),
            repo: locator.repo().to_string(),
            number: locator.number(),
            pr,
            files: None,
            commits: None,
            comments: None,
            reviews: None,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn descriptor(&self) -> &PullRequestDescriptor {
        &self.pr
    }

    pub fn author(&self) -> &str {
        &self.pr.author
    }

    pub fn head_sha(&self) -> &str {
        &self.pr.head_sha
    }

    /// `(base, head)` branch names; a fork head is `owner:branch`.
    pub fn branches(&self) -> (String, String) {
        self.pr.branches()
    }

    /// Files changed by the pull request, in GitHub's order.
    pub async fn changed_files(&mut self) -> Result<&[File], PrError> {
        if self.files.is_none() {
            let files = self.load_files().await?;
            self.files = Some(files);
        }
        Ok(self.files.as_deref().unwrap_or_default())
    }

    /// Commits of the pull request. The head commit always has a pushed
    /// date; ancestors on its first-parent chain inherit one if GitHub
    /// reported none.
    pub async fn commits(&mut self) -> Result<&[Commit], PrError> {
        if self.commits.is_none() {
            let commits = CommitLoader {
                api: self.api.as_ref(),
                cancel: &self.cancel,
                retry: self.retry,
                sleeper: self.sleeper.as_ref(),
                owner: &self.owner,
                repo: &self.repo,
                number: self.number,
                pr: &self.pr,
            }
            .load()
            .await?;
            self.commits = Some(commits);
        }
        Ok(self.commits.as_deref().unwrap_or_default())
    }

    pub async fn comments(&mut self) -> Result<&[Comment], PrError> {
        if self.comments.is_none() {
            self.load_comments_and_reviews().await?;
        }
        Ok(self.comments.as_deref().unwrap_or_default())
    }

    /// Reviews that approve or request changes.
    pub async fn reviews(&mut self) -> Result<&[Review], PrError> {
        if self.reviews.is_none() {
            self.load_comments_and_reviews().await?;
        }
        Ok(self.reviews.as_deref().unwrap_or_default())
    }

    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo, number = self.number))]
    async fn load_files(&self) -> Result<Vec<File>, PrError> {
        const CONTEXT: &str = "failed to list pull request files";

        let mut raw = Vec::new();
        let mut page = 1;
        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PrError::Cancelled),
                result = self.api.list_files(&self.owner, &self.repo, self.number, page) => result,
            };
            let result = result.map_err(|source| PrError::Api { context: CONTEXT, source })?;
            raw.extend(result.files);
            debug!(page, total = raw.len(), "fetched file page");

            match result.next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        let files: Vec<File> = raw.iter().map(File::from).collect();
        if files.len() >= MAX_PULL_REQUEST_FILES {
            return Err(PrError::TooManyFiles {
                max: MAX_PULL_REQUEST_FILES,
            });
        }
        Ok(files)
    }

    /// Comments and reviews share one query with a cursor each, so loading
    /// both takes max(c, r) round-trips instead of c + r.
    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo, number = self.number))]
    async fn load_comments_and_reviews(&mut self) -> Result<(), PrError> {
        const CONTEXT: &str = "failed to load pull request data";

        let mut request = GraphQlRequest::new(COMMENTS_AND_REVIEWS_QUERY)
            .var("owner", self.owner.as_str())
            .var("name", self.repo.as_str())
            .var("number", self.number)
            .var("commentCursor", Value::Null)
            .var("reviewCursor", Value::Null);

        let mut comments = Vec::new();
        let mut reviews = Vec::new();
        let mut comments_done = false;
        let mut reviews_done = false;

        while !(comments_done && reviews_done) {
            let data: RepositoryData<PullRequestField<ActivityField>> =
                execute(self.api.as_ref(), &self.cancel, &request, CONTEXT).await?;
            let activity = data.into_pull_request().ok_or_else(|| {
                PrError::pull_request_not_found(CONTEXT, &self.owner, &self.repo, self.number)
            })?;

            if !comments_done {
                comments.extend(activity.comments.nodes.iter().map(|c| c.to_comment()));
                comments_done = !activity.comments.page_info.advance(&mut request, "commentCursor");
            }
            if !reviews_done {
                reviews.extend(activity.reviews.nodes.iter().map(|r| r.to_review()));
                reviews_done = !activity.reviews.page_info.advance(&mut request, "reviewCursor");
            }
            debug!(comments = comments.len(), reviews = reviews.len(), "fetched activity page");
        }

        self.comments = Some(comments);
        self.reviews = Some(reviews);
        Ok(())
    }
}
