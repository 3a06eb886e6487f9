//! In-memory GitHub doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::retry::Sleeper;
use crate::github::{ApiError, FilePage, GitHubApi, GraphQlRequest, RawFile};

type QueryHandler = Box<dyn Fn(&GraphQlRequest) -> Result<Value, ApiError> + Send + Sync>;

/// Answers GraphQL requests with a closure and serves files from memory.
pub struct FakeGitHub {
    handler: QueryHandler,
    files: Vec<RawFile>,
    page_size: usize,
    queries: Mutex<Vec<GraphQlRequest>>,
    file_pages: AtomicUsize,
}

impl FakeGitHub {
    pub fn new(
        handler: impl Fn(&GraphQlRequest) -> Result<Value, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            files: Vec::new(),
            page_size: 100,
            queries: Mutex::new(Vec::new()),
            file_pages: AtomicUsize::new(0),
        }
    }

    pub fn with_files(mut self, files: Vec<RawFile>) -> Self {
        self.files = files;
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<GraphQlRequest> {
        self.queries.lock().unwrap().clone()
    }

    pub fn file_page_count(&self) -> usize {
        self.file_pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn query(&self, request: &GraphQlRequest) -> Result<Value, ApiError> {
        self.queries.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }

    async fn list_files(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        page: u32,
    ) -> Result<FilePage, ApiError> {
        self.file_pages.fetch_add(1, Ordering::SeqCst);
        let start = (page as usize - 1) * self.page_size;
        let end = (start + self.page_size).min(self.files.len());
        let files = self.files.get(start..end).unwrap_or_default().to_vec();
        let next_page = (end < self.files.len()).then_some(page + 1);
        Ok(FilePage { files, next_page })
    }
}

/// Records requested delays instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

/// Serve `items` as a connection page starting at the request's cursor
/// variable, where cursors are stringified offsets.
pub fn connection_page(
    items: &[Value],
    request: &GraphQlRequest,
    cursor_var: &str,
    page_size: usize,
) -> Value {
    let start: usize = request
        .str_var(cursor_var)
        .and_then(|c| c.parse().ok())
        .unwrap_or(0)
        .min(items.len());
    let end = (start + page_size).min(items.len());
    let end_cursor = if items.is_empty() {
        Value::Null
    } else {
        json!(end.to_string())
    };
    json!({
        "pageInfo": { "endCursor": end_cursor, "hasNextPage": end < items.len() },
        "nodes": items[start..end].to_vec(),
    })
}

/// A commit record as returned by the commits query.
pub fn commit_node(sha: &str, parents: &[&str], pushed: Option<&str>) -> Value {
    json!({
        "commit": {
            "oid": sha,
            "author": { "user": { "__typename": "User", "login": "alice" } },
            "committer": { "user": { "__typename": "User", "login": "alice" } },
            "committedViaWeb": false,
            "pushedDate": pushed,
            "parents": { "nodes": parents.iter().map(|p| json!({ "oid": p })).collect::<Vec<_>>() },
        }
    })
}

pub fn raw_file(name: &str, status: &str) -> RawFile {
    RawFile {
        filename: name.to_string(),
        status: status.to_string(),
        additions: 1,
        deletions: 0,
    }
}
