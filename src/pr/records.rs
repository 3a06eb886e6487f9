//! Raw GraphQL response records and their conversion into domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::actor::{login_of, Actor, GitActor};
use super::cursor::PageCursor;
use super::types::{Comment, Commit, File, FileStatus, PullRequestDescriptor, Review, ReviewState};
use crate::github::RawFile;

/// `{ repository { ... } }`; GitHub returns `null` for unknown repositories.
#[derive(Debug, Deserialize)]
pub struct RepositoryData<T> {
    pub repository: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestField<T> {
    pub pull_request: Option<T>,
}

impl<T> RepositoryData<PullRequestField<T>> {
    /// The `pullRequest` object, if both it and its repository resolved.
    pub fn into_pull_request(self) -> Option<T> {
        self.repository.and_then(|r| r.pull_request)
    }
}

/// A page of a GraphQL connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default)]
    pub page_info: PageCursor,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            page_info: PageCursor::default(),
            nodes: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    pub author: Option<Actor>,
    pub is_cross_repository: bool,
    pub head_ref_oid: String,
    pub head_ref_name: String,
    pub head_repository: Option<RawRepository>,
    pub base_ref_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawRepository {
    pub name: String,
    pub owner: Actor,
}

impl RawPullRequest {
    pub fn to_descriptor(&self) -> PullRequestDescriptor {
        let (head_repo_name, head_repo_owner) = match &self.head_repository {
            Some(repo) => (repo.name.clone(), repo.owner.login.clone()),
            None => (String::new(), String::new()),
        };
        PullRequestDescriptor {
            author: login_of(self.author.as_ref()),
            is_cross_repository: self.is_cross_repository,
            head_sha: self.head_ref_oid.clone(),
            head_ref_name: self.head_ref_name.clone(),
            head_repo_name,
            head_repo_owner,
            base_ref_name: self.base_ref_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitsField {
    pub commits: Connection<RawPullRequestCommit>,
}

#[derive(Debug, Deserialize)]
pub struct RawPullRequestCommit {
    pub commit: RawCommit,
}

#[derive(Debug, Deserialize)]
pub struct RawOid {
    pub oid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    pub oid: String,
    #[serde(default)]
    pub author: Option<GitActor>,
    #[serde(default)]
    pub committer: Option<GitActor>,
    #[serde(default)]
    pub committed_via_web: bool,
    pub pushed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Connection<RawOid>,
}

impl RawCommit {
    pub fn to_commit(&self) -> Commit {
        Commit {
            sha: self.oid.clone(),
            parents: self.parents.nodes.iter().map(|p| p.oid.clone()).collect(),
            committed_via_web: self.committed_via_web,
            author: self.author.as_ref().map(GitActor::rest_login).unwrap_or_default(),
            committer: self
                .committer
                .as_ref()
                .map(GitActor::rest_login)
                .unwrap_or_default(),
            pushed_at: self.pushed_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityField {
    pub comments: Connection<RawComment>,
    pub reviews: Connection<RawReview>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComment {
    pub author: Option<Actor>,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl RawComment {
    pub fn to_comment(&self) -> Comment {
        Comment {
            created_at: self.created_at,
            author: login_of(self.author.as_ref()),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReview {
    pub author: Option<Actor>,
    pub state: String,
    #[serde(default)]
    pub body: String,
    pub submitted_at: DateTime<Utc>,
}

impl RawReview {
    pub fn to_review(&self) -> Review {
        Review {
            created_at: self.submitted_at,
            author: login_of(self.author.as_ref()),
            state: ReviewState::from_api(&self.state),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryRepository {
    pub object: Option<HistoryObject>,
}

/// `object(oid:)` narrowed to a commit; non-commit objects have no history.
#[derive(Debug, Deserialize)]
pub struct HistoryObject {
    #[serde(default)]
    pub history: Connection<HistoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryNode {
    pub oid: String,
    pub pushed_date: Option<DateTime<Utc>>,
}

impl From<&RawFile> for File {
    fn from(raw: &RawFile) -> Self {
        File {
            filename: raw.filename.clone(),
            status: FileStatus::from_api(&raw.status),
            additions: raw.additions,
            deletions: raw.deletions,
        }
    }
}
