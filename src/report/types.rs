use std::borrow::Cow;

/// Column names of the TSV header, in output order.
pub const HEADER: [&str; 10] = [
    "pr_id",
    "pr_title",
    "pr_url",
    "pr_user",
    "pr_created_at",
    "pr_updated_at",
    "comment_body",
    "comment_url",
    "comment_user",
    "comment_created_at",
];

/// How field values are written into the TSV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Escaping {
    /// Values are written as-is. An embedded tab or newline shifts columns.
    #[default]
    None,
    /// Backslash, tab, LF and CR are written as `\\`, `\t`, `\n`, `\r`.
    Backslash,
}

impl Escaping {
    pub fn from_flag(escape: bool) -> Self {
        if escape {
            Escaping::Backslash
        } else {
            Escaping::None
        }
    }

    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Escaping::None => Cow::Borrowed(value),
            Escaping::Backslash => {
                if !value.contains(['\\', '\t', '\n', '\r']) {
                    return Cow::Borrowed(value);
                }
                let mut escaped = String::with_capacity(value.len() + 8);
                for ch in value.chars() {
                    match ch {
                        '\\' => escaped.push_str("\\\\"),
                        '\t' => escaped.push_str("\\t"),
                        '\n' => escaped.push_str("\\n"),
                        '\r' => escaped.push_str("\\r"),
                        other => escaped.push(other),
                    }
                }
                Cow::Owned(escaped)
            }
        }
    }
}

/// One (pull request, comment) pair flattened into report columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub pr_id: u64,
    pub pr_title: String,
    pub pr_url: String,
    pub pr_user: String,
    pub pr_created_at: String,
    pub pr_updated_at: String,
    pub comment_body: String,
    pub comment_url: String,
    pub comment_user: String,
    pub comment_created_at: String,
}

impl ReportRow {
    /// Field values in [`HEADER`] order.
    pub fn fields(&self) -> [Cow<'_, str>; 10] {
        [
            Cow::Owned(self.pr_id.to_string()),
            Cow::Borrowed(self.pr_title.as_str()),
            Cow::Borrowed(self.pr_url.as_str()),
            Cow::Borrowed(self.pr_user.as_str()),
            Cow::Borrowed(self.pr_created_at.as_str()),
            Cow::Borrowed(self.pr_updated_at.as_str()),
            Cow::Borrowed(self.comment_body.as_str()),
            Cow::Borrowed(self.comment_url.as_str()),
            Cow::Borrowed(self.comment_user.as_str()),
            Cow::Borrowed(self.comment_created_at.as_str()),
        ]
    }
}

/// Flattened report ready to be written out.
#[derive(Debug, Default)]
pub struct Report {
    pub rows: Vec<ReportRow>,
}
