use chrono::{DateTime, Utc};

/// Upper bound on files GitHub will list for a pull request.
pub const MAX_PULL_REQUEST_FILES: usize = 300;

/// Upper bound on commits GitHub will list for a pull request.
pub const MAX_PULL_REQUEST_COMMITS: usize = 250;

/// The canonical facts about a pull request needed to load the rest of it.
/// Derived once per context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDescriptor {
    /// Author login, with a `[bot]` suffix for app identities
    pub author: String,
    /// True when the head repository differs from the base repository
    pub is_cross_repository: bool,
    pub head_sha: String,
    pub head_ref_name: String,
    pub head_repo_name: String,
    pub head_repo_owner: String,
    pub base_ref_name: String,
}

impl PullRequestDescriptor {
    /// Returns the names of the base and head branch. If the head branch
    /// lives in a fork the head is reported as `owner:branch`.
    pub fn branches(&self) -> (String, String) {
        let base = self.base_ref_name.clone();
        let head = if self.is_cross_repository {
            format!("{}:{}", self.head_repo_owner, self.head_ref_name)
        } else {
            self.head_ref_name.clone()
        };
        (base, head)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
    Unknown,
}

impl FileStatus {
    /// Maps a REST status string. Anything outside the fixed table
    /// (renamed, copied, ...) is `Unknown`.
    pub fn from_api(status: &str) -> Self {
        match status {
            "added" => FileStatus::Added,
            "deleted" => FileStatus::Deleted,
            "modified" => FileStatus::Modified,
            _ => FileStatus::Unknown,
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Added => write!(f, "added"),
            FileStatus::Deleted => write!(f, "deleted"),
            FileStatus::Modified => write!(f, "modified"),
            FileStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// A file touched by the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub filename: String,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
}

/// A commit on the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    /// Parent SHAs; the first entry is the first parent
    pub parents: Vec<String>,
    pub committed_via_web: bool,
    /// Empty when the commit author is not linked to an account
    pub author: String,
    pub committer: String,
    /// When the commit was pushed. Always set for the head commit once
    /// commits have loaded; ancestors may be inferred from their children.
    pub pushed_at: Option<DateTime<Utc>>,
}

/// A conversation comment on the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    /// Any other lower-cased state; not requested by the review query
    Other(String),
}

impl ReviewState {
    pub fn from_api(state: &str) -> Self {
        let state = state.to_lowercase();
        match state.as_str() {
            "approved" => ReviewState::Approved,
            "changes_requested" => ReviewState::ChangesRequested,
            _ => ReviewState::Other(state),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReviewState::Approved => "approved",
            ReviewState::ChangesRequested => "changes_requested",
            ReviewState::Other(state) => state,
        }
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted review that approves or requests changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub state: ReviewState,
    pub body: String,
}
