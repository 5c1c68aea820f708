pub mod types;

pub use types::{Escaping, Report, ReportRow, HEADER};

use crate::pr::PullRequest;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Write(#[from] std::io::Error),
}

/// Flatten pull requests into one row per (pull request, comment) pair.
///
/// Pull requests without comments contribute no rows. Rows keep the order
/// of `pull_requests` and of each pull request's comments.
pub fn build(pull_requests: &[PullRequest]) -> Report {
    let rows = pull_requests
        .iter()
        .flat_map(|pr| {
            pr.comments.iter().map(move |comment| ReportRow {
                pr_id: pr.number,
                pr_title: pr.title.clone(),
                pr_url: pr.url.clone(),
                pr_user: pr.author.clone(),
                pr_created_at: pr.created_at.clone(),
                pr_updated_at: pr.updated_at.clone(),
                comment_body: comment.body.clone(),
                comment_url: comment.url.clone(),
                comment_user: comment.author.clone(),
                comment_created_at: comment.created_at.clone(),
            })
        })
        .collect();

    Report { rows }
}

/// Write the header line and every row as tab-separated text.
pub fn write_tsv<W: Write>(report: &Report, escaping: Escaping, out: &mut W) -> Result<(), ReportError> {
    writeln!(out, "{}", join_fields(HEADER.iter().copied(), escaping))?;
    for row in &report.rows {
        let fields = row.fields();
        writeln!(out, "{}", join_fields(fields.iter().map(|f| &**f), escaping))?;
    }
    Ok(())
}

/// Print the report to standard output.
#[instrument(skip(report), fields(rows = report.rows.len()))]
pub fn output(report: &Report, escaping: Escaping) -> Result<(), ReportError> {
    debug!("writing report to stdout");
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    write_tsv(report, escaping, &mut out)?;
    out.flush()?;
    Ok(())
}

fn join_fields<'a>(fields: impl Iterator<Item = &'a str>, escaping: Escaping) -> String {
    fields
        .map(|field| escaping.apply(field))
        .collect::<Vec<_>>()
        .join("\t")
}
