//! GraphQL documents used to load a pull request.
//!
//! Connection fields take a `$cursor`-style variable so pagination loops can
//! rewrite it between round-trips; see [`super::cursor::PageCursor`].

pub const PULL_REQUEST_QUERY: &str = r#"
query PullRequest($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      author { __typename login }
      isCrossRepository
      headRefOid
      headRefName
      headRepository {
        name
        owner { __typename login }
      }
      baseRefName
    }
  }
}
"#;

pub const COMMITS_QUERY: &str = r#"
query PullRequestCommits($owner: String!, $name: String!, $number: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      commits(first: 100, after: $cursor) {
        pageInfo { endCursor hasNextPage }
        nodes {
          commit {
            oid
            author { user { __typename login } }
            committer { user { __typename login } }
            committedViaWeb
            pushedDate
            parents(first: 3) { nodes { oid } }
          }
        }
      }
    }
  }
}
"#;

/// Comments and reviews in one request so both connections page together.
pub const COMMENTS_AND_REVIEWS_QUERY: &str = r#"
query PullRequestActivity(
  $owner: String!,
  $name: String!,
  $number: Int!,
  $commentCursor: String,
  $reviewCursor: String
) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      comments(first: 100, after: $commentCursor) {
        pageInfo { endCursor hasNextPage }
        nodes {
          author { __typename login }
          body
          createdAt
        }
      }
      reviews(first: 100, after: $reviewCursor, states: [APPROVED, CHANGES_REQUESTED]) {
        pageInfo { endCursor hasNextPage }
        nodes {
          author { __typename login }
          state
          body
          submittedAt
        }
      }
    }
  }
}
"#;

/// History of a commit in a specific repository; used against forks,
/// where the base repository does not carry pushed dates.
pub const HISTORY_QUERY: &str = r#"
query CommitHistory($owner: String!, $name: String!, $oid: GitObjectID!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    object(oid: $oid) {
      ... on Commit {
        history(first: 100, after: $cursor) {
          pageInfo { endCursor hasNextPage }
          nodes {
            oid
            pushedDate
          }
        }
      }
    }
  }
}
"#;
