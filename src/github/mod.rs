pub mod http;

pub use http::HttpClient;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("GitHub rejected the credentials: {0}")]
    Auth(String),

    #[error("GitHub API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("network error talking to GitHub: {0}")]
    Network(String),

    #[error("failed to decode GitHub response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True when the referenced resource no longer exists (or never did).
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// A GraphQL document plus the variables it is executed with.
///
/// Pagination loops keep one request alive and rewrite its cursor variables
/// between round-trips.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: Map<String, Value>,
}

impl GraphQlRequest {
    pub fn new(query: &'static str) -> Self {
        Self {
            query,
            variables: Map::new(),
        }
    }

    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_var(name, value);
        self
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_string(), value.into());
    }

    /// Returns a string variable, `None` when unset or null.
    pub fn str_var(&self, name: &str) -> Option<&str> {
        self.variables.get(name).and_then(Value::as_str)
    }
}

/// One changed file as returned by the REST files endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

/// A page of the REST file listing. `next_page` is `None` on the last page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePage {
    pub files: Vec<RawFile>,
    pub next_page: Option<u32>,
}

/// The two GitHub protocols a pull request context talks to.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Execute a GraphQL request and return its `data` object.
    async fn query(&self, request: &GraphQlRequest) -> Result<Value, ApiError>;

    /// Fetch one page (1-based) of the files changed by a pull request.
    async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        page: u32,
    ) -> Result<FilePage, ApiError>;
}
