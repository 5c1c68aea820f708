pub mod types;

pub use types::{Comment, PullRequest, RawComment, RawPullRequest, RepoRef};

use std::collections::HashSet;

use async_trait::async_trait;
use http::header::HeaderName;
use http::{StatusCode, Uri};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::{Octocrab, Page};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version every request is pinned to.
const API_VERSION: &str = "2022-11-28";
const API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-github-api-version");
const PULLS_PER_PAGE: &str = "100";

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[source] octocrab::Error),

    #[error("GitHub API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Pagination revisited {0}")]
    PaginationLoop(String),

    #[error("Invalid GitHub API URL: {0}")]
    InvalidApiUrl(String),

    #[error("Invalid repository: {0}")]
    InvalidRepository(String),
}

impl From<octocrab::Error> for PrError {
    fn from(error: octocrab::Error) -> Self {
        match error {
            octocrab::Error::GitHub { source, .. } => PrError::Status {
                status: source.status_code,
                message: source.message,
            },
            other => PrError::ApiRequest(other),
        }
    }
}

/// Read-only view of a repository's pull requests and review comments.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Every pull request regardless of state, in the order the API lists them.
    async fn list_pull_requests(&self, repo: &RepoRef) -> Result<Vec<RawPullRequest>, PrError>;

    /// Review comments of one pull request, in the order the API returns them.
    async fn list_review_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<RawComment>, PrError>;
}

/// Octocrab-backed GitHub client authenticated with a personal access token.
pub struct GitHubClient {
    client: Octocrab,
    paginate_comments: bool,
}

impl GitHubClient {
    /// Build a client against `api_url`. Requests are never retried.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(token: impl Into<String>, api_url: &str) -> Result<Self, PrError> {
        let base_uri: Uri = api_url
            .parse::<Uri>()
            .map_err(|_| PrError::InvalidApiUrl(api_url.to_string()))?;
        if !matches!(base_uri.scheme_str(), Some("http" | "https")) || base_uri.host().is_none() {
            return Err(PrError::InvalidApiUrl(api_url.to_string()));
        }

        let client = Octocrab::builder()
            .personal_token(token.into())
            .add_header(API_VERSION_HEADER, API_VERSION.to_string())
            .add_retry_config(RetryConfig::None)
            .base_uri(base_uri)
            .map_err(|_| PrError::InvalidApiUrl(api_url.to_string()))?
            .build()?;

        Ok(Self {
            client,
            paginate_comments: false,
        })
    }

    /// Follow pagination for review comments too. Off by default, in which
    /// case only the first page of comments is read.
    pub fn with_comment_pagination(mut self, enabled: bool) -> Self {
        self.paginate_comments = enabled;
        self
    }

    /// Drain `first` and every page reachable through its `next` links.
    ///
    /// A `next` link that was already followed is an error rather than an
    /// endless loop.
    async fn all_pages<T: DeserializeOwned>(&self, mut page: Page<T>) -> Result<Vec<T>, PrError> {
        let mut items = std::mem::take(&mut page.items);
        let mut followed = HashSet::new();

        while let Some(next) = page.next.take() {
            let next_uri = next.to_string();
            if !followed.insert(next_uri.clone()) {
                return Err(PrError::PaginationLoop(next_uri));
            }
            debug!(url = %next_uri, "following next page");
            match self.client.get_page::<T>(&Some(next)).await? {
                Some(following) => {
                    page = following;
                    items.append(&mut page.items);
                }
                None => break,
            }
        }

        Ok(items)
    }
}

fn pulls_path(repo: &RepoRef) -> String {
    format!("/repos/{}/{}/pulls", repo.owner, repo.name)
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn list_pull_requests(&self, repo: &RepoRef) -> Result<Vec<RawPullRequest>, PrError> {
        let query = [("state", "all"), ("per_page", PULLS_PER_PAGE)];
        let first: Page<RawPullRequest> = self.client.get(pulls_path(repo), Some(&query)).await?;
        let pulls = self.all_pages(first).await?;
        debug!(count = pulls.len(), "listed pull requests");
        Ok(pulls)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn list_review_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<RawComment>, PrError> {
        let route = format!("{}/{}/comments", pulls_path(repo), number);
        let mut first: Page<RawComment> = self.client.get(route, None::<&()>).await?;
        let comments = if self.paginate_comments {
            self.all_pages(first).await?
        } else {
            if first.next.is_some() {
                debug!(pr = number, "more review comments available; only the first page is read");
            }
            std::mem::take(&mut first.items)
        };
        debug!(pr = number, count = comments.len(), "listed review comments");
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoRef {
        RepoRef::new("octo", "widgets").unwrap()
    }

    fn pull_json(number: u64) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "title": format!("PR {number}"),
            "html_url": format!("https://github.com/octo/widgets/pull/{number}"),
            "state": "open",
            "user": { "login": "alice" },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        })
    }

    fn comment_json(id: u64, body: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "body": body,
            "html_url": format!("https://github.com/octo/widgets/pull/1#discussion_r{id}"),
            "user": { "login": "bob" },
            "created_at": "2024-01-03T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_rejects_invalid_api_url() {
        assert!(matches!(
            GitHubClient::new("t", "not a url"),
            Err(PrError::InvalidApiUrl(_))
        ));
        assert!(matches!(
            GitHubClient::new("t", "ftp://example.com"),
            Err(PrError::InvalidApiUrl(_))
        ));
        assert!(GitHubClient::new("t", "https://github.example.com/api/v3").is_ok());
    }

    #[tokio::test]
    async fn test_list_pull_requests_follows_every_page() {
        let server = MockServer::start().await;
        let pulls_path = "/repos/octo/widgets/pulls";
        let page_url = |page: u32| format!("{}{}?state=all&per_page=100&page={page}", server.uri(), pulls_path);

        Mock::given(method("GET"))
            .and(path(pulls_path))
            .and(query_param("state", "all"))
            .and(query_param("per_page", "100"))
            .and(query_param_is_missing("page"))
            .and(header("authorization", "Bearer s3cret"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([pull_json(5), pull_json(4)]))
                    .insert_header(
                        "Link",
                        format!("<{}>; rel=\"next\", <{}>; rel=\"last\"", page_url(2), page_url(3)),
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(pulls_path))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([pull_json(3), pull_json(2)]))
                    .insert_header(
                        "Link",
                        format!("<{}>; rel=\"next\", <{}>; rel=\"last\"", page_url(3), page_url(3)),
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(pulls_path))
            .and(query_param("page", "3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([pull_json(1)]))
                    .insert_header("Link", format!("<{}>; rel=\"prev\"", page_url(2))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new("s3cret", &server.uri()).unwrap();
        let pulls = client.list_pull_requests(&repo()).await.unwrap();

        let numbers: Vec<u64> = pulls.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![5, 4, 3, 2, 1]);
        assert_eq!(pulls[0].user.as_ref().unwrap().login, "alice");
    }

    #[tokio::test]
    async fn test_list_pull_requests_rejects_self_referencing_next_link() {
        let server = MockServer::start().await;
        let pulls_path = "/repos/octo/widgets/pulls";
        let same_page = format!("{}{}?state=all&per_page=100&page=2", server.uri(), pulls_path);

        Mock::given(method("GET"))
            .and(path(pulls_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([pull_json(1)]))
                    .insert_header("Link", format!("<{same_page}>; rel=\"next\"")),
            )
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        let err = client.list_pull_requests(&repo()).await.unwrap_err();
        assert!(matches!(err, PrError::PaginationLoop(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_list_review_comments_reads_single_page_by_default() {
        let server = MockServer::start().await;
        let comments_path = "/repos/octo/widgets/pulls/1/comments";
        let next = format!("{}{}?page=2", server.uri(), comments_path);

        Mock::given(method("GET"))
            .and(path(comments_path))
            .and(query_param_is_missing("page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([comment_json(1, "ok\nlgtm")]))
                    .insert_header("Link", format!("<{next}>; rel=\"next\"")),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(comments_path))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([comment_json(2, "done")])))
            .expect(0)
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        let comments = client.list_review_comments(&repo(), 1).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body.as_deref(), Some("ok\nlgtm"));
    }

    #[tokio::test]
    async fn test_list_review_comments_paginates_when_enabled() {
        let server = MockServer::start().await;
        let comments_path = "/repos/octo/widgets/pulls/1/comments";
        let next = format!("{}{}?page=2", server.uri(), comments_path);

        Mock::given(method("GET"))
            .and(path(comments_path))
            .and(query_param_is_missing("page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([comment_json(1, "first")]))
                    .insert_header("Link", format!("<{next}>; rel=\"next\"")),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(comments_path))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([comment_json(2, "second")])))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri())
            .unwrap()
            .with_comment_pagination(true);
        let comments = client.list_review_comments(&repo(), 1).await.unwrap();
        let ids: Vec<u64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_error_status_carries_api_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new("expired", &server.uri()).unwrap();
        let err = client.list_pull_requests(&repo()).await.unwrap_err();
        match err {
            PrError::Status { status, message } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/9/comments"))
            .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({
                "message": "Bad Gateway"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new("t", &server.uri()).unwrap();
        let err = client.list_review_comments(&repo(), 9).await.unwrap_err();
        assert!(err.to_string().contains("502"), "unexpected error: {err}");
    }
}
