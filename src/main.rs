mod collect;
mod config;
mod pr;
mod report;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use crate::pr::{GitHubClient, PullRequestSource, RepoRef};
use crate::report::Escaping;

/// Export every review comment of every pull request in a GitHub repository
/// as tab-separated values on stdout.
#[derive(Parser, Debug)]
#[command(name = "pr-comments-tsv", version, about)]
struct Cli {
    /// Repository owner (user or organization)
    owner: String,

    /// Repository name
    repo: String,

    /// GitHub access token
    token: String,

    /// Read every page of review comments (default: first page only)
    #[arg(long)]
    all_comments: bool,

    /// Backslash-escape tabs, newlines and backslashes inside fields
    #[arg(long)]
    escape: bool,

    /// GitHub REST API base URL (default: https://api.github.com)
    #[arg(long)]
    api_url: Option<String>,

    /// TOML settings file; none is read unless given
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), error_chain(err.as_ref()));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let repo = RepoRef::new(&cli.owner, &cli.repo)?;

    let config = config::Config::load(cli.config.as_deref())?;

    let api_url = cli.api_url.as_deref().unwrap_or(config.api_url());
    let client = GitHubClient::new(cli.token, api_url)?
        .with_comment_pagination(cli.all_comments || config.github.paginate_comments);
    let escaping = Escaping::from_flag(cli.escape || config.report.escape);

    let report = export(&client, &repo)
        .instrument(info_span!("export", repo = %repo))
        .await?;
    info!(rows = report.rows.len(), "writing report");
    report::output(&report, escaping)?;
    info!("done");

    Ok(())
}

/// Collect everything first; a failure anywhere means no report at all.
async fn export<S>(source: &S, repo: &RepoRef) -> Result<report::Report, collect::CollectError>
where
    S: PullRequestSource + ?Sized,
{
    info!("fetching pull requests and review comments");
    let pull_requests = collect::collect(source, repo).await?;
    Ok(report::build(&pull_requests))
}

/// Render an error followed by its `source()` chain, colon-separated.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
