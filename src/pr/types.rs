use serde::Deserialize;

use super::PrError;

/// Owner/name pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Build a repository reference, rejecting blank owner or name.
    pub fn new(owner: &str, name: &str) -> Result<Self, PrError> {
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() {
            return Err(PrError::InvalidRepository(
                "owner must not be empty".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(PrError::InvalidRepository(
                "repository name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub login: String,
}

/// Pull request record as returned by `GET /repos/{owner}/{repo}/pulls`.
/// Only the fields the report needs are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    /// `null` for deleted accounts.
    pub user: Option<RawUser>,
    pub created_at: String,
    pub updated_at: String,
}

/// Review comment record as returned by `GET /repos/{owner}/{repo}/pulls/{n}/comments`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: u64,
    /// Missing or `null` bodies are treated as empty.
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub user: Option<RawUser>,
    pub created_at: String,
}

/// A pull request together with its normalized review comments.
///
/// Timestamps are kept as the ISO-8601 text GitHub returned so the report
/// reproduces them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
    pub comments: Vec<Comment>,
}

impl PullRequest {
    pub fn from_raw(raw: RawPullRequest, comments: Vec<Comment>) -> Self {
        Self {
            number: raw.number,
            title: raw.title,
            url: raw.html_url,
            author: login_of(raw.user),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    #[allow(dead_code)] // Not a report column.
    pub id: u64,
    /// Body with line breaks removed.
    pub body: String,
    pub url: String,
    pub author: String,
    pub created_at: String,
}

impl From<RawComment> for Comment {
    fn from(raw: RawComment) -> Self {
        Self {
            id: raw.id,
            body: strip_line_breaks(raw.body.as_deref().unwrap_or_default()),
            url: raw.html_url,
            author: login_of(raw.user),
            created_at: raw.created_at,
        }
    }
}

/// Remove every `\r\n` and `\n` sequence. A lone `\r` is left in place.
pub fn strip_line_breaks(body: &str) -> String {
    body.replace("\r\n", "").replace('\n', "")
}

fn login_of(user: Option<RawUser>) -> String {
    user.map(|u| u.login).unwrap_or_default()
}
