//! Merge runs.
//!
//! A run visits every data row below the header row in order, against one
//! snapshot of the sheet taken at the start. Rows that pass the filters get
//! their document and mail merges, then their status cells are written and
//! flushed before the next row starts, so a failure part way through leaves
//! finished rows marked and a rerun picks up where it stopped.

use crate::config::{
    DataSource, DocMergeSettings, MailMergeSettings, MergeConfig, DOCUMENT_URL_HEADER,
    MERGE_STATUS_HEADER,
};
use crate::error::{MergeError, MergeResult};
use crate::filter::{compile_filters, passes};
use crate::platform::{Artifact, ArtifactKind, OutgoingMail, Platform};
use crate::selector::ColumnSelector;
use crate::template::{merge_template, render_text, RowContext};
use crate::timestamp::{merge_status_text, Clock, SystemClock};
use rowmerge_sheet::{CellPos, CellValue};
use serde::Serialize;

/// What happened to one visited row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    /// The row failed a filter and was left untouched.
    Skipped { row: usize },
    /// The row was merged and marked done.
    Completed {
        row: usize,
        document: Option<Artifact>,
        mailed: bool,
    },
}

impl RowOutcome {
    #[must_use]
    pub fn row(&self) -> usize {
        match self {
            RowOutcome::Skipped { row } | RowOutcome::Completed { row, .. } => *row,
        }
    }
}

/// Per-row outcomes of a run, in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub rows: Vec<RowOutcome>,
}

impl MergeReport {
    #[must_use]
    pub fn completed(&self) -> usize {
        self.rows
            .iter()
            .filter(|outcome| matches!(outcome, RowOutcome::Completed { .. }))
            .count()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.rows.len() - self.completed()
    }

    /// Documents produced by the run.
    #[must_use]
    pub fn documents(&self) -> Vec<&Artifact> {
        self.rows
            .iter()
            .filter_map(|outcome| match outcome {
                RowOutcome::Completed { document, .. } => document.as_ref(),
                RowOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    #[must_use]
    pub fn mails_sent(&self) -> usize {
        self.rows
            .iter()
            .filter(|outcome| matches!(outcome, RowOutcome::Completed { mailed: true, .. }))
            .count()
    }
}

/// Run a merge, stamping rows with the system clock.
pub fn run_merge<P>(platform: &mut P, config: &MergeConfig) -> MergeResult<MergeReport>
where
    P: Platform + ?Sized,
{
    run_merge_with_clock(platform, config, &SystemClock)
}

/// Run a merge, stamping rows with `clock`.
///
/// Fails before touching any row when the configuration is not ready. An
/// error on a row stops the run; rows completed before it stay marked.
pub fn run_merge_with_clock<P>(
    platform: &mut P,
    config: &MergeConfig,
    clock: &dyn Clock,
) -> MergeResult<MergeReport>
where
    P: Platform + ?Sized,
{
    config.ensure_ready()?;
    let source = config.data_source().ok_or_else(|| MergeError::NotReady {
        missing: config.missing_requirements(),
    })?;

    let filters = compile_filters(config.row_filters(), &source.headers)?;
    let status_col = source.headers.position_of(MERGE_STATUS_HEADER)?;
    let url_col = source.headers.position_of(DOCUMENT_URL_HEADER)?;

    let grid = platform.read_display_values(&source.sheet)?;
    let first_row = source.header_row + 1;
    let last_row = grid.last_row();
    tracing::info!(
        "Starting merge on {} rows {}..={}",
        source.sheet,
        first_row,
        last_row
    );

    let mut report = MergeReport::default();
    for row in first_row..=last_row {
        if !passes(row, &grid, &filters) {
            tracing::debug!("Row {}: skipped by filter", row);
            report.rows.push(RowOutcome::Skipped { row });
            continue;
        }

        let ctx = RowContext {
            row,
            grid: &grid,
            headers: &source.headers,
        };

        let document = if config.doc_merge().enabled {
            let artifact = merge_document(platform, config.doc_merge(), &ctx)?;
            tracing::debug!("Row {}: document merged into {}", row, artifact.url);
            Some(artifact)
        } else {
            None
        };

        let mailed = if config.mail_merge().enabled {
            send_mail(platform, config.mail_merge(), &ctx, document.as_ref())?;
            true
        } else {
            false
        };

        write_back(platform, source, row, status_col, url_col, document.as_ref(), clock)?;
        tracing::info!("Row {}: done", row);
        report.rows.push(RowOutcome::Completed {
            row,
            document,
            mailed,
        });
    }

    tracing::info!(
        "Merge finished: {} completed, {} skipped",
        report.completed(),
        report.skipped()
    );
    Ok(report)
}

fn merge_document<P>(
    platform: &mut P,
    settings: &DocMergeSettings,
    ctx: &RowContext<'_>,
) -> MergeResult<Artifact>
where
    P: Platform + ?Sized,
{
    let template = settings
        .template
        .as_ref()
        .ok_or_else(|| not_ready("No document merge template set."))?;
    let destination = settings
        .destination
        .as_ref()
        .ok_or_else(|| not_ready("No document merge destination folder set."))?;

    let mut artifact = merge_template(
        platform,
        template,
        ctx,
        destination,
        settings.title.as_ref(),
    )?;

    if settings.as_pdf {
        artifact = convert_to_pdf(platform, &artifact)?;
    }

    if let Some(selector) = settings.shared_to.active() {
        let address = selector.resolve_value(ctx.row, ctx.grid, ctx.headers)?;
        if address.trim().is_empty() {
            tracing::warn!("Row {}: no address to share {} with", ctx.row, artifact.url);
        } else {
            platform.share_with(&artifact, address.trim())?;
        }
    }

    Ok(artifact)
}

/// Replace a merged artifact by its PDF rendering.
fn convert_to_pdf<P>(platform: &mut P, artifact: &Artifact) -> MergeResult<Artifact>
where
    P: Platform + ?Sized,
{
    let pdf = match artifact.kind {
        ArtifactKind::FlowDocument => {
            let folder = platform.parent_folder(artifact)?;
            platform.export_pdf(artifact, &folder)?
        }
        ArtifactKind::TabularDocument => platform.render_pdf(artifact)?,
        _ => return Err(MergeError::unsupported("pdf conversion", &artifact.kind)),
    };
    platform.trash(artifact)?;
    Ok(pdf)
}

fn send_mail<P>(
    platform: &mut P,
    settings: &MailMergeSettings,
    ctx: &RowContext<'_>,
    document: Option<&Artifact>,
) -> MergeResult<()>
where
    P: Platform + ?Sized,
{
    let template = settings
        .template
        .as_ref()
        .ok_or_else(|| not_ready("No mail merge template set."))?;
    let from = settings
        .sender
        .clone()
        .ok_or_else(|| not_ready("No mail merge email sender set."))?;
    let recipients = settings
        .recipients
        .as_ref()
        .ok_or_else(|| not_ready("No mail merge email recipients set."))?;
    let subject = settings
        .subject
        .as_ref()
        .ok_or_else(|| not_ready("No mail merge email subject set."))?;

    let body = render_text(platform, &template.template, ctx, &template.folder)?;
    let resolve = |selector: &ColumnSelector| {
        selector.resolve_value(ctx.row, ctx.grid, ctx.headers)
    };

    let mail = OutgoingMail {
        to: resolve(recipients)?,
        subject: resolve(subject)?,
        body,
        cc: settings.cc.active().map(resolve).transpose()?,
        bcc: settings.bcc.active().map(resolve).transpose()?,
        attachments: if settings.send_as_attachment {
            document.cloned().into_iter().collect()
        } else {
            Vec::new()
        },
        from,
    };

    platform.send(&mail)?;
    tracing::debug!("Row {}: mail sent to {}", ctx.row, mail.to);
    Ok(())
}

/// Mark a row done and make the mark durable.
fn write_back<P>(
    platform: &mut P,
    source: &DataSource,
    row: usize,
    status_col: usize,
    url_col: usize,
    document: Option<&Artifact>,
    clock: &dyn Clock,
) -> MergeResult<()>
where
    P: Platform + ?Sized,
{
    let status = merge_status_text(&clock.now());
    platform.write_range(
        &source.sheet,
        CellPos::new(row, status_col),
        vec![vec![CellValue::String(status)]],
    )?;

    if let Some(document) = document {
        platform.write_range(
            &source.sheet,
            CellPos::new(row, url_col),
            vec![vec![CellValue::String(document.url.clone())]],
        )?;
    }

    platform.flush()
}

fn not_ready(message: &str) -> MergeError {
    MergeError::NotReady {
        missing: vec![message.to_string()],
    }
}
