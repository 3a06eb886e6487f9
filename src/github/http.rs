use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, LINK, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{ApiError, FilePage, GitHubApi, GraphQlRequest, RawFile};

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default GitHub GraphQL endpoint.
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

const USER_AGENT_VALUE: &str = "pr-context";

/// Number of files requested per REST page (GitHub's maximum).
const FILES_PER_PAGE: u32 = 100;

/// `GitHubApi` over HTTPS using reqwest.
pub struct HttpClient {
    client: Client,
    token: String,
    api_url: String,
    graphql_url: String,
}

// Keep the token out of debug output
impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("api_url", &self.api_url)
            .field("graphql_url", &self.graphql_url)
            .finish()
    }
}

impl HttpClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_endpoints(token, DEFAULT_API_URL, DEFAULT_GRAPHQL_URL)
    }

    /// Client against custom endpoints (GitHub Enterprise, or a mock server).
    pub fn with_endpoints(
        token: impl Into<String>,
        api_url: impl Into<String>,
        graphql_url: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client: Client::new(),
            token: token.into(),
            api_url: api_url.trim_end_matches('/').to_string(),
            graphql_url: graphql_url.into(),
        }
    }

    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => "unknown error".to_string(),
        };

        Err(match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth(message),
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Turn a GraphQL envelope into its `data`, surfacing any reported errors.
fn into_data(response: GraphQlResponse) -> Result<Value, ApiError> {
    if !response.errors.is_empty() {
        let message = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let not_found = response
            .errors
            .iter()
            .any(|e| e.kind.as_deref() == Some("NOT_FOUND"));
        return Err(if not_found {
            ApiError::NotFound(message)
        } else {
            ApiError::GraphQl(message)
        });
    }
    response
        .data
        .ok_or_else(|| ApiError::Decode("response carried neither data nor errors".to_string()))
}

/// Extract the `page` number of the `rel="next"` entry of a `Link` header.
fn next_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|p| p.trim() == "rel=\"next\"") {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

#[async_trait]
impl GitHubApi for HttpClient {
    #[instrument(skip(self, request), fields(variables = request.variables.len()))]
    async fn query(&self, request: &GraphQlRequest) -> Result<Value, ApiError> {
        let body = json!({
            "query": request.query,
            "variables": request.variables,
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let envelope = response.json::<GraphQlResponse>().await?;
        into_data(envelope)
    }

    #[instrument(skip(self))]
    async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        page: u32,
    ) -> Result<FilePage, ApiError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/files",
            self.api_url, owner, repo, number
        );

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(&self.token)
            .query(&[("per_page", FILES_PER_PAGE), ("page", page)])
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let next_page = next_page(response.headers());
        let files = response.json::<Vec<RawFile>>().await?;
        debug!(files = files.len(), ?next_page, "received file page");

        Ok(FilePage { files, next_page })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpClient {
        HttpClient::with_endpoints(
            "test-token",
            server.uri(),
            format!("{}/graphql", server.uri()),
        )
    }

    #[test]
    fn test_next_page_from_link_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/pulls/2/files?per_page=100&page=3>; rel=\"next\", \
                 <https://api.github.com/repositories/1/pulls/2/files?per_page=100&page=4>; rel=\"last\"",
            ),
        );
        assert_eq!(next_page(&headers), Some(3));
    }

    #[test]
    fn test_next_page_absent_on_last_page() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/pulls/2/files?page=1>; rel=\"first\", \
                 <https://api.github.com/repositories/1/pulls/2/files?page=2>; rel=\"prev\"",
            ),
        );
        assert_eq!(next_page(&headers), None);
        assert_eq!(next_page(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_list_files_reads_page_and_link() {
        let server = MockServer::start().await;
        let link = format!(
            "<{}/repos/org/repo/pulls/7/files?per_page=100&page=2>; rel=\"next\"",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/pulls/7/files"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", link.as_str())
                    .set_body_json(json!([
                        { "filename": "src/main.rs", "status": "modified", "additions": 3, "deletions": 1 },
                        { "filename": "README.md", "status": "added", "additions": 10, "deletions": 0 }
                    ])),
            )
            .mount(&server)
            .await;

        let page = client_for(&server)
            .list_files("org", "repo", 7, 1)
            .await
            .unwrap();
        assert_eq!(page.next_page, Some(2));
        assert_eq!(page.files.len(), 2);
        assert_eq!(page.files[0].filename, "src/main.rs");
        assert_eq!(page.files[1].additions, 10);
    }

    #[tokio::test]
    async fn test_list_files_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/pulls/7/files"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_files("org", "repo", 7, 1)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NotFound("Not Found".to_string()));
    }

    #[tokio::test]
    async fn test_query_returns_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({ "variables": { "owner": "org" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "name": "repo" } }
            })))
            .mount(&server)
            .await;

        let request = GraphQlRequest::new("query { repository { name } }").var("owner", "org");
        let data = client_for(&server).query(&request).await.unwrap();
        assert_eq!(data["repository"]["name"], "repo");
    }

    #[tokio::test]
    async fn test_query_maps_graphql_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": null },
                "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to a Repository" }]
            })))
            .mount(&server)
            .await;

        let request = GraphQlRequest::new("query { repository { name } }");
        let err = client_for(&server).query(&request).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_query_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
            )
            .mount(&server)
            .await;

        let request = GraphQlRequest::new("query { viewer { login } }");
        let err = client_for(&server).query(&request).await.unwrap_err();
        assert_eq!(err, ApiError::Auth("Bad credentials".to_string()));
    }

    #[tokio::test]
    async fn test_query_server_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "message": "Server Error" })),
            )
            .mount(&server)
            .await;

        let request = GraphQlRequest::new("query { viewer { login } }");
        let err = client_for(&server).query(&request).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 500,
                message: "Server Error".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_files_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/pulls/7/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_files("org", "repo", 7, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_query_unreachable_host() {
        let client = HttpClient::with_endpoints(
            "test-token",
            "http://127.0.0.1:1",
            "http://127.0.0.1:1/graphql",
        );
        let request = GraphQlRequest::new("query { viewer { login } }");
        let err = client.query(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    }

    #[test]
    fn test_default_client_hides_token() {
        let debug = format!("{:?}", HttpClient::new("secret-token"));
        assert!(debug.contains(DEFAULT_API_URL));
        assert!(debug.contains(DEFAULT_GRAPHQL_URL));
        assert!(!debug.contains("secret-token"));
    }
}
