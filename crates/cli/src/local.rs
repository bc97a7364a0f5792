//! Local files in and out of a [`MemoryWorkspace`].
//!
//! Data sources and tabular templates are CSV files; flow templates are text
//! files with one paragraph per line. Results are written back as the same
//! kinds of files, plus a JSON outbox of the mail that was sent.

use anyhow::{bail, Context, Result};
use rowmerge_core::memory::{Content, Element, MemoryWorkspace, StoredFile};
use rowmerge_core::{Artifact, FolderId, OutgoingMail, SheetRef};
use rowmerge_sheet::CellValue;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Read a CSV file as rows of cells. Empty fields become blank cells.
pub fn read_csv(path: &Path) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::String(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// Write rows of cells as CSV, using each cell's display string.
pub fn write_csv(path: &Path, rows: &[Vec<CellValue>]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    for row in rows {
        writer.write_record(row.iter().map(CellValue::as_str))?;
    }
    writer.flush()?;
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Sheet1")
        .to_string()
}

/// Load a data CSV as a one-sheet spreadsheet named after the file.
pub fn import_data(ws: &mut MemoryWorkspace, folder: &FolderId, path: &Path) -> Result<SheetRef> {
    let rows = read_csv(path)?;
    let name = file_stem(path);
    let book = ws.create_spreadsheet(folder, &name, [(name.clone(), rows)]);
    tracing::debug!("Imported data source {} as {}", path.display(), book.url);
    Ok(SheetRef::new(book.id, name))
}

/// Load a template file: `.txt` as a document, `.csv` as a spreadsheet.
pub fn import_template(
    ws: &mut MemoryWorkspace,
    folder: &FolderId,
    path: &Path,
) -> Result<Artifact> {
    let name = file_stem(path);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt" | "md") => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template: {}", path.display()))?;
            Ok(ws.create_document(folder, &name, Element::from_text(&text)))
        }
        Some("csv") => {
            let rows = read_csv(path)?;
            Ok(ws.create_spreadsheet(folder, &name, [(name.clone(), rows)]))
        }
        _ => bail!(
            "Unsupported template file: {} (expected .txt, .md or .csv)",
            path.display()
        ),
    }
}

/// Turn an artifact name into a safe file name.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\n' | '\r' => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pick `<stem>.<ext>`, or `<stem> (n).<ext>` when taken.
fn unique_path(dir: &Path, stem: &str, ext: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.{ext}"));
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = dir.join(format!("{stem} ({n}).{ext}"));
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Write every live file of `folder` into `dir`. Returns the paths written.
pub fn export_folder(ws: &MemoryWorkspace, folder: &FolderId, dir: &Path) -> Result<Vec<PathBuf>> {
    let files = ws.files_in(folder);
    if files.is_empty() {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut taken = HashSet::new();
    let mut written = Vec::new();
    for file in files {
        written.extend(export_file(file, dir, &mut taken)?);
    }
    Ok(written)
}

fn export_file(file: &StoredFile, dir: &Path, taken: &mut HashSet<PathBuf>) -> Result<Vec<PathBuf>> {
    let stem = sanitize(&file.artifact.name);
    match &file.content {
        Content::Flow(body) => {
            let path = unique_path(dir, &stem, "txt", taken);
            std::fs::write(&path, body.plain_text())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(vec![path])
        }
        Content::Pdf(text) => {
            let path = unique_path(dir, &stem, "pdf.txt", taken);
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(vec![path])
        }
        Content::Tabular(sheets) => {
            let single = sheets.len() == 1;
            let mut paths = Vec::new();
            for (sheet, rows) in sheets {
                let sheet_stem = if single {
                    stem.clone()
                } else {
                    format!("{stem} - {}", sanitize(sheet))
                };
                let path = unique_path(dir, &sheet_stem, "csv", taken);
                write_csv(&path, rows)?;
                paths.push(path);
            }
            Ok(paths)
        }
    }
}

/// Write the sent mail as pretty JSON.
pub fn export_outbox(outbox: &[OutgoingMail], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(outbox)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
