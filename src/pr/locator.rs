use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::queries::PULL_REQUEST_QUERY;
use super::records::{PullRequestField, RawPullRequest, RepositoryData};
use super::types::PullRequestDescriptor;
use super::{execute, PrError};
use crate::github::{GitHubApi, GraphQlRequest};

/// Identifies a pull request, optionally carrying the (possibly partial)
/// pull request payload of the webhook that triggered the load.
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    owner: String,
    repo: String,
    number: u64,
    value: Option<PartialPullRequest>,
}

/// The REST pull request payload, reduced to what a descriptor needs.
/// Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialPullRequest {
    pub user: Option<PartialUser>,
    pub base: Option<PartialRef>,
    pub head: Option<PartialRef>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialUser {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialRef {
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub sha: Option<String>,
    pub repo: Option<PartialRepo>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialRepo {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub owner: Option<PartialUser>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn non_zero(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v != 0)
}

impl PartialPullRequest {
    /// Builds a descriptor if every required field is present and non-empty.
    /// A legitimately empty value is indistinguishable from a missing one
    /// and also yields `None`.
    pub fn to_descriptor(&self) -> Option<PullRequestDescriptor> {
        let author = non_empty(&self.user.as_ref()?.login)?;

        let base = self.base.as_ref()?;
        let base_ref = non_empty(&base.ref_name)?;
        let base_repo_id = non_zero(base.repo.as_ref()?.id)?;

        let head = self.head.as_ref()?;
        let head_sha = non_empty(&head.sha)?;
        let head_ref = non_empty(&head.ref_name)?;
        let head_repo = head.repo.as_ref()?;
        let head_repo_id = non_zero(head_repo.id)?;
        let head_repo_name = non_empty(&head_repo.name)?;
        let head_repo_owner = non_empty(&head_repo.owner.as_ref()?.login)?;

        Some(PullRequestDescriptor {
            author: author.to_string(),
            is_cross_repository: head_repo_id != base_repo_id,
            head_sha: head_sha.to_string(),
            head_ref_name: head_ref.to_string(),
            head_repo_name: head_repo_name.to_string(),
            head_repo_owner: head_repo_owner.to_string(),
            base_ref_name: base_ref.to_string(),
        })
    }
}

impl Locator {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        number: u64,
    ) -> Result<Self, PrError> {
        let owner = owner.into();
        let repo = repo.into();
        if owner.is_empty() || repo.is_empty() || number == 0 {
            return Err(PrError::InvalidLocator(format!(
                "owner, repository and number are required (got {:?}/{:?}#{})",
                owner, repo, number
            )));
        }
        Ok(Self {
            owner,
            repo,
            number,
            value: None,
        })
    }

    /// Parse a GitHub pull request URL:
    /// `https://github.com/{owner}/{repo}/pull/{number}`.
    pub fn parse_url(url: &str) -> Result<Self, PrError> {
        let parsed = reqwest::Url::parse(url).map_err(|_| PrError::InvalidUrl(url.to_string()))?;

        if parsed.host_str() != Some("github.com") {
            return Err(PrError::InvalidUrl(url.to_string()));
        }

        let segments: Vec<_> = parsed
            .path_segments()
            .ok_or_else(|| PrError::InvalidUrl(url.to_string()))?
            .filter(|segment| !segment.is_empty())
            .collect();

        if segments.len() != 4 || segments[2] != "pull" {
            return Err(PrError::InvalidUrl(url.to_string()));
        }

        let number = segments[3]
            .parse::<u64>()
            .map_err(|_| PrError::InvalidUrl(url.to_string()))?;

        Self::new(segments[0], segments[1], number)
    }

    /// Attach a pull request payload, e.g. from a webhook event.
    pub fn with_pull_request(mut self, value: PartialPullRequest) -> Self {
        self.value = Some(value);
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

    /// True if the attached payload holds every field a descriptor needs.
    pub fn is_complete(&self) -> bool {
        self.value
            .as_ref()
            .and_then(PartialPullRequest::to_descriptor)
            .is_some()
    }

    /// Produce the pull request descriptor, querying GitHub only when the
    /// attached payload is missing or incomplete.
    #[instrument(
        skip(self, api, cancel),
        fields(owner = %self.owner, repo = %self.repo, number = self.number)
    )]
    pub async fn resolve(
        &self,
        api: &dyn GitHubApi,
        cancel: &CancellationToken,
    ) -> Result<PullRequestDescriptor, PrError> {
        if let Some(descriptor) = self.value.as_ref().and_then(PartialPullRequest::to_descriptor) {
            debug!("using pull request from payload");
            return Ok(descriptor);
        }

        debug!("loading pull request details");
        let request = GraphQlRequest::new(PULL_REQUEST_QUERY)
            .var("owner", self.owner.as_str())
            .var("name", self.repo.as_str())
            .var("number", self.number);

        const CONTEXT: &str = "failed to load pull request details";
        let data: RepositoryData<PullRequestField<RawPullRequest>> =
            execute(api, cancel, &request, CONTEXT).await?;
        let pr = data.into_pull_request().ok_or_else(|| {
            PrError::pull_request_not_found(CONTEXT, &self.owner, &self.repo, self.number)
        })?;
        Ok(pr.to_descriptor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::testing::FakeGitHub;
    use serde_json::json;

    fn full_payload() -> PartialPullRequest {
        serde_json::from_value(json!({
            "number": 42,
            "user": { "login": "alice" },
            "base": { "ref": "main", "sha": "base0", "repo": { "id": 1, "name": "repo", "owner": { "login": "org" } } },
            "head": { "ref": "feature", "sha": "head1", "repo": { "id": 2, "name": "repo", "owner": { "login": "bob" } } }
        }))
        .unwrap()
    }

    #[test]
    fn test_new_rejects_missing_fields() {
        assert!(matches!(Locator::new("", "repo", 1), Err(PrError::InvalidLocator(_))));
        assert!(matches!(Locator::new("org", "", 1), Err(PrError::InvalidLocator(_))));
        assert!(matches!(Locator::new("org", "repo", 0), Err(PrError::InvalidLocator(_))));
        assert!(Locator::new("org", "repo", 1).is_ok());
    }

    #[test]
    fn test_parse_valid_pr_url() {
        let loc = Locator::parse_url("https://github.com/org/repo/pull/42").unwrap();
        assert_eq!(loc.owner(), "org");
        assert_eq!(loc.repo(), "repo");
        assert_eq!(loc.number(), 42);
    }

    #[test]
    fn test_parse_invalid_pr_url() {
        assert!(Locator::parse_url("https://example.com").is_err());
        assert!(Locator::parse_url("not-a-url").is_err());
        assert!(Locator::parse_url("https://github.com/org/repo/pulls/42").is_err());
        assert!(Locator::parse_url("https://github.com/org/repo/pull/0").is_err());
    }

    #[test]
    fn test_completeness() {
        let loc = Locator::new("org", "repo", 42).unwrap();
        assert!(!loc.is_complete());
        assert!(loc.clone().with_pull_request(full_payload()).is_complete());

        let mut missing_owner = full_payload();
        if let Some(repo) = missing_owner.head.as_mut().and_then(|h| h.repo.as_mut()) {
            repo.owner = None;
        }
        assert!(!loc.clone().with_pull_request(missing_owner).is_complete());

        let mut zero_id = full_payload();
        if let Some(repo) = zero_id.base.as_mut().and_then(|b| b.repo.as_mut()) {
            repo.id = Some(0);
        }
        assert!(!loc.clone().with_pull_request(zero_id).is_complete());

        let mut empty_ref = full_payload();
        if let Some(head) = empty_ref.head.as_mut() {
            head.ref_name = Some(String::new());
        }
        assert!(!loc.with_pull_request(empty_ref).is_complete());
    }

    #[tokio::test]
    async fn test_resolve_complete_payload_without_network() {
        let api = FakeGitHub::new(|_| panic!("no query expected"));
        let loc = Locator::new("org", "repo", 42)
            .unwrap()
            .with_pull_request(full_payload());

        let pr = loc.resolve(&api, &CancellationToken::new()).await.unwrap();
        assert_eq!(api.query_count(), 0);
        assert_eq!(pr.author, "alice");
        assert!(pr.is_cross_repository);
        assert_eq!(pr.head_sha, "head1");
        assert_eq!(pr.head_repo_owner, "bob");
        assert_eq!(pr.base_ref_name, "main");
    }

    #[tokio::test]
    async fn test_resolve_partial_payload_queries_once() {
        let api = FakeGitHub::new(|request| {
            assert_eq!(request.query, PULL_REQUEST_QUERY);
            assert_eq!(request.variables["number"], json!(42));
            Ok(json!({
                "repository": { "pullRequest": {
                    "author": { "__typename": "Bot", "login": "deploy-bot" },
                    "isCrossRepository": false,
                    "headRefOid": "head1",
                    "headRefName": "feature",
                    "headRepository": { "name": "repo", "owner": { "__typename": "Organization", "login": "org" } },
                    "baseRefName": "main"
                }}
            }))
        });
        let mut partial = full_payload();
        partial.user = None;
        let loc = Locator::new("org", "repo", 42).unwrap().with_pull_request(partial);

        let pr = loc.resolve(&api, &CancellationToken::new()).await.unwrap();
        assert_eq!(api.query_count(), 1);
        assert_eq!(pr.author, "deploy-bot[bot]");
        assert!(!pr.is_cross_repository);
    }

    #[tokio::test]
    async fn test_resolve_missing_pull_request_is_not_found() {
        let api = FakeGitHub::new(|_| Ok(json!({ "repository": { "pullRequest": null } })));
        let loc = Locator::new("org", "repo", 42).unwrap();

        let err = loc.resolve(&api, &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
