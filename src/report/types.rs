use crate::pr::{Comment, Commit, File, PullRequestDescriptor, Review};

/// Review outcome for one reviewer or for the pull request as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReviewStatus {
    Pending,
    Approved,
    ChangesRequested,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "PENDING"),
            ReviewStatus::Approved => write!(f, "APPROVED"),
            ReviewStatus::ChangesRequested => write!(f, "CHANGES REQUESTED"),
        }
    }
}

/// Everything loaded for a pull request, owned so it outlives the context.
#[derive(Debug, Clone)]
pub struct PullRequestSnapshot {
    /// `owner/repo`
    pub repository: String,
    pub number: u64,
    pub descriptor: PullRequestDescriptor,
    pub files: Vec<File>,
    pub commits: Vec<Commit>,
    pub comments: Vec<Comment>,
    pub reviews: Vec<Review>,
}

/// Summary of a pull request ready for display.
#[derive(Debug)]
pub struct Report {
    pub repository: String,
    pub number: u64,
    pub author: String,
    pub base_branch: String,
    /// `owner:branch` for forks
    pub head_branch: String,
    pub files: Vec<File>,
    pub additions: u64,
    pub deletions: u64,
    pub commits: Vec<Commit>,
    pub comment_count: usize,
    /// Latest review outcome per reviewer, sorted by login
    pub reviewers: Vec<(String, ReviewStatus)>,
    /// Changes requested by anyone wins over approvals
    pub overall: ReviewStatus,
}
