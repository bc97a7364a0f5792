//! Job files.
//!
//! A job file describes one merge over local files. YAML and JSON are both
//! accepted; the extension decides which parser is used.
//!
//! ```yaml
//! user: me@example.com
//! data:
//!   path: people.csv
//! doc_merge:
//!   template: letter.txt
//!   output_folder: letters
//!   title: { type: ByHeader, input: Name }
//! mail_merge:
//!   template: mail.txt
//!   subject: { type: Specify, input: Welcome }
//!   recipients: { type: ByHeader, input: Email }
//! filters:
//!   - selector: { type: ByHeader, input: Country }
//!     operator: EQUAL
//!     compare_value: NZ
//! ```

use anyhow::{Context, Result};
use rowmerge_core::{ColumnSelector, RowFilter};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER: &str = "rmerge@localhost";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    /// Account the merge runs as; the default mail sender.
    #[serde(default = "default_user")]
    pub user: String,
    pub data: DataSpec,
    #[serde(default)]
    pub filters: Vec<RowFilter>,
    /// Drop the default merge-status filter.
    #[serde(default)]
    pub no_default_filter: bool,
    pub doc_merge: Option<DocMergeSpec>,
    pub mail_merge: Option<MailMergeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSpec {
    pub path: PathBuf,
    #[serde(default = "default_header_row")]
    pub header_row: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocMergeSpec {
    pub template: PathBuf,
    #[serde(default = "default_output_folder")]
    pub output_folder: String,
    pub title: Option<ColumnSelector>,
    pub shared_to: Option<ColumnSelector>,
    #[serde(default)]
    pub as_pdf: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailMergeSpec {
    pub template: PathBuf,
    pub sender: Option<String>,
    pub subject: Option<ColumnSelector>,
    pub recipients: Option<ColumnSelector>,
    pub cc: Option<ColumnSelector>,
    pub bcc: Option<ColumnSelector>,
    #[serde(default = "default_true")]
    pub send_as_attachment: bool,
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_header_row() -> usize {
    rowmerge_core::config::DEFAULT_HEADER_ROW
}

fn default_output_folder() -> String {
    "documents".to_string()
}

fn default_true() -> bool {
    true
}

impl Job {
    /// Read a job file. Relative paths inside it are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file: {}", path.display()))?;
        let mut job = Self::parse(&text, path)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        job.data.path = base.join(&job.data.path);
        if let Some(doc) = job.doc_merge.as_mut() {
            doc.template = base.join(&doc.template);
        }
        if let Some(mail) = job.mail_merge.as_mut() {
            mail.template = base.join(&mail.template);
        }
        Ok(job)
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(text)
                .with_context(|| format!("Invalid JSON job file: {}", path.display()))
        } else {
            serde_yaml::from_str(text)
                .with_context(|| format!("Invalid YAML job file: {}", path.display()))
        }
    }
}
