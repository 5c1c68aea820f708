use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::pr::{Comment, PrError, PullRequest, PullRequestSource, RepoRef};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to list pull requests: {0}")]
    ListPullRequests(#[source] PrError),

    #[error("failed to fetch review comments for PR #{number}: {source}")]
    FetchComments {
        number: u64,
        #[source]
        source: PrError,
    },
}

/// Fetch every pull request of `repo` along with its review comments.
///
/// Requests are issued one at a time: the full listing first, then one
/// comment request per pull request in listing order. The first failure
/// aborts the run and nothing collected so far is returned.
#[instrument(skip(source, repo), fields(repo = %repo))]
pub async fn collect<S>(source: &S, repo: &RepoRef) -> Result<Vec<PullRequest>, CollectError>
where
    S: PullRequestSource + ?Sized,
{
    let raw_pulls = source.list_pull_requests(repo).await.map_err(|e| {
        error!(error = %e, "error fetching pull requests");
        CollectError::ListPullRequests(e)
    })?;
    info!(count = raw_pulls.len(), "listed pull requests");

    let mut pull_requests = Vec::with_capacity(raw_pulls.len());
    for raw in raw_pulls {
        let number = raw.number;
        let comments: Vec<Comment> = source
            .list_review_comments(repo, number)
            .await
            .map_err(|e| {
                error!(pr = number, error = %e, "error fetching review comments");
                CollectError::FetchComments { number, source: e }
            })?
            .into_iter()
            .map(Comment::from)
            .collect();
        debug!(pr = number, comments = comments.len(), "collected pull request");
        pull_requests.push(PullRequest::from_raw(raw, comments));
    }

    Ok(pull_requests)
}
