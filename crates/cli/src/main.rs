//! # rowmerge-cli
//!
//! Runs a merge job over local files.

mod job;
mod local;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use job::Job;
use rowmerge_core::memory::MemoryWorkspace;
use rowmerge_core::{
    run_merge_with_clock, Clock, FolderId, MergeConfigBuilder, MergeReport, RowOutcome, SheetRef,
    SystemClock,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// rmerge - row-driven document and mail merge
#[derive(Parser)]
#[command(name = "rmerge")]
#[command(author, version, about = "Row-driven document and mail merge", long_about = None)]
struct Cli {
    /// Job file (YAML or JSON)
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Directory results are written to
    #[arg(short, long, value_name = "DIR", default_value = "rmerge-out")]
    output: PathBuf,

    /// Only report whether the job is ready to run
    #[arg(long)]
    check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    let job = Job::load(&cli.job)?;
    let mut session = Session::open(&job)?;

    if cli.check {
        let missing = session.builder.missing_requirements();
        if missing.is_empty() {
            println!("{}", "Ready".green().bold());
        } else {
            println!("{}", "Not ready:".yellow().bold());
            for message in &missing {
                println!("  - {message}");
            }
        }
        return Ok(());
    }

    let result = session.run(&SystemClock);
    let written = session.export(&cli.output)?;
    let report = result?;

    print_report(&report);
    println!(
        "{} {} file(s) written to {}",
        "Saved".cyan().bold(),
        written,
        cli.output.display()
    );
    Ok(())
}

/// A job loaded into an in-memory workspace.
struct Session {
    ws: MemoryWorkspace,
    builder: MergeConfigBuilder,
    data_path: PathBuf,
    sheet: SheetRef,
    output_folder: Option<(String, FolderId)>,
}

impl Session {
    fn open(job: &Job) -> Result<Self> {
        let mut ws = MemoryWorkspace::new(job.user.clone());
        let data = ws.create_folder("data");
        let templates = ws.create_folder("templates");

        let sheet = local::import_data(&mut ws, &data, &job.data.path)?;
        let mut builder = MergeConfigBuilder::for_user(job.user.clone());
        builder
            .set_data_source_at(&mut ws, sheet.clone(), job.data.header_row)
            .context("Failed to bind data source")?;

        if job.no_default_filter {
            builder.clear_row_filters();
        }
        builder.add_row_filters(job.filters.iter().cloned());

        let mut output_folder = None;
        if let Some(doc) = &job.doc_merge {
            let template = local::import_template(&mut ws, &templates, &doc.template)?;
            let folder = ws.create_folder(&doc.output_folder);
            builder
                .enable_doc_merge(true)
                .set_doc_output_folder(folder.clone())
                .set_doc_as_pdf(doc.as_pdf)
                .set_doc_title(doc.title.clone())
                .context("Invalid document title selector")?
                .set_doc_shared_to(doc.shared_to.clone())
                .context("Invalid share selector")?;
            builder
                .set_doc_template(&mut ws, &template)
                .context("Failed to set document template")?;
            output_folder = Some((doc.output_folder.clone(), folder));
        }

        if let Some(mail) = &job.mail_merge {
            let template = local::import_template(&mut ws, &templates, &mail.template)?;
            builder
                .enable_mail_merge(true)
                .set_mail_send_as_attachment(mail.send_as_attachment)
                .set_mail_subject(mail.subject.clone())
                .context("Invalid mail subject selector")?
                .set_mail_recipients(mail.recipients.clone())
                .context("Invalid mail recipients selector")?
                .set_mail_cc(mail.cc.clone())
                .context("Invalid mail cc selector")?
                .set_mail_bcc(mail.bcc.clone())
                .context("Invalid mail bcc selector")?;
            if let Some(sender) = &mail.sender {
                builder.set_mail_sender(sender)?;
            }
            builder
                .set_mail_template_by_locator(&mut ws, &template.url)
                .context("Failed to set mail template")?;
        }

        Ok(Self {
            ws,
            builder,
            data_path: job.data.path.clone(),
            sheet,
            output_folder,
        })
    }

    fn run(&mut self, clock: &dyn Clock) -> Result<MergeReport> {
        let config = self.builder.build()?;
        Ok(run_merge_with_clock(&mut self.ws, &config, clock)?)
    }

    /// Write the data sheet, merged documents and outbox under `dir`.
    /// Returns the number of files written.
    fn export(&self, dir: &Path) -> Result<usize> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        let mut written = 0;

        if let Some(rows) = self.ws.sheet_values(&self.sheet) {
            let name = self
                .data_path
                .file_name()
                .map_or_else(|| PathBuf::from("data.csv"), PathBuf::from);
            local::write_csv(&dir.join(name), rows)?;
            written += 1;
        }

        if let Some((name, folder)) = &self.output_folder {
            written += local::export_folder(&self.ws, folder, &dir.join(name))?.len();
        }

        if !self.ws.outbox().is_empty() {
            local::export_outbox(self.ws.outbox(), &dir.join("outbox.json"))?;
            written += 1;
        }

        Ok(written)
    }
}

fn print_report(report: &MergeReport) {
    for outcome in &report.rows {
        match outcome {
            RowOutcome::Skipped { row } => {
                println!("{} row {}", "skip".dimmed(), row);
            }
            RowOutcome::Completed {
                row,
                document,
                mailed,
            } => {
                let mut line = format!("{} row {}", "done".green(), row);
                if let Some(doc) = document {
                    line.push_str(&format!(" -> {}", doc.name));
                }
                if *mailed {
                    line.push_str(" (mailed)");
                }
                println!("{line}");
            }
        }
    }
    println!(
        "{} {} completed, {} skipped, {} mail(s) sent",
        "Merge finished:".cyan().bold(),
        report.completed(),
        report.skipped(),
        report.mails_sent()
    );
}
