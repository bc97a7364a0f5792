//! In-memory workspace.
//!
//! [`MemoryWorkspace`] implements every collaborator trait over plain data
//! structures: folders, flow documents as element trees, spreadsheets as
//! value grids, rendered PDFs as text and an outbox of sent mail. It also
//! counts display reads, range writes and flushes so callers can check how
//! the engine drives the platform.

use crate::error::{MergeError, MergeResult};
use crate::locator::entity_id_from_locator;
use crate::platform::{
    Artifact, ArtifactId, ArtifactKind, DocumentNode, FlowDocuments, FolderId, Identity, Mailer,
    OutgoingMail, PdfRenderer, SheetRef, Spreadsheets, Storage,
};
use indexmap::IndexMap;
use rowmerge_sheet::{CellPos, CellValue, DataGrid};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "https://docs.memory.test";

/// Element tree of a flow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Document body; children are separated by line breaks in plain text.
    Body(Vec<Element>),
    /// A paragraph made of formatting runs.
    Paragraph(Vec<Element>),
    /// A run of text.
    Text(String),
}

impl Element {
    /// Build a body with one single-run paragraph per line of `text`.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Element::Body(
            text.lines()
                .map(|line| Element::Paragraph(vec![Element::Text(line.to_string())]))
                .collect(),
        )
    }

    /// Build a paragraph from separate runs.
    pub fn paragraph<I, S>(runs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Element::Paragraph(runs.into_iter().map(|run| Element::Text(run.into())).collect())
    }

    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Element::Body(children) => children
                .iter()
                .map(Element::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Element::Paragraph(children) => children.iter().map(Element::plain_text).collect(),
            Element::Text(text) => text.clone(),
        }
    }

    /// Replace `pattern` inside every text run that holds it whole.
    fn replace_literal(&mut self, pattern: &str, value: &str) -> bool {
        match self {
            Element::Body(children) | Element::Paragraph(children) => {
                let mut found = false;
                for child in children {
                    found |= child.replace_literal(pattern, value);
                }
                found
            }
            Element::Text(text) => {
                if text.contains(pattern) {
                    *text = text.replace(pattern, value);
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl DocumentNode for Element {
    fn text(&self) -> Option<&str> {
        match self {
            Element::Text(text) => Some(text),
            _ => None,
        }
    }

    fn set_text(&mut self, text: String) {
        if let Element::Text(current) = self {
            *current = text;
        }
    }

    fn child_count(&self) -> usize {
        match self {
            Element::Body(children) | Element::Paragraph(children) => children.len(),
            Element::Text(_) => 0,
        }
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut dyn DocumentNode> {
        match self {
            Element::Body(children) | Element::Paragraph(children) => children
                .get_mut(index)
                .map(|child| child as &mut dyn DocumentNode),
            Element::Text(_) => None,
        }
    }
}

/// Stored content of a file.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Flow(Element),
    Tabular(IndexMap<String, Vec<Vec<CellValue>>>),
    /// Text rendering of a PDF export.
    Pdf(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub artifact: Artifact,
    pub folder: FolderId,
    pub content: Content,
    pub trashed: bool,
    pub shared_with: Vec<String>,
}

/// A self-contained platform living in memory.
#[derive(Debug, Clone)]
pub struct MemoryWorkspace {
    base_url: String,
    user: String,
    aliases: Vec<String>,
    folders: IndexMap<FolderId, String>,
    files: IndexMap<ArtifactId, StoredFile>,
    outbox: Vec<OutgoingMail>,
    rejected_recipients: HashSet<String>,
    highlighted: Vec<(SheetRef, CellPos)>,
    display_reads: Cell<usize>,
    range_writes: HashMap<SheetRef, usize>,
    flushes: usize,
}

impl MemoryWorkspace {
    /// Create an empty workspace owned by `user`.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user: user.into(),
            aliases: Vec::new(),
            folders: IndexMap::new(),
            files: IndexMap::new(),
            outbox: Vec::new(),
            rejected_recipients: HashSet::new(),
            highlighted: Vec::new(),
            display_reads: Cell::new(0),
            range_writes: HashMap::new(),
            flushes: 0,
        }
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        self.aliases.push(alias.into());
    }

    /// Make the mail transport fail for `address`.
    pub fn reject_mail_to(&mut self, address: impl Into<String>) {
        self.rejected_recipients.insert(address.into());
    }

    pub fn create_folder(&mut self, name: &str) -> FolderId {
        let id = FolderId(new_id());
        self.folders.insert(id.clone(), name.to_string());
        id
    }

    #[must_use]
    pub fn folder_locator(&self, folder: &FolderId) -> String {
        format!("{}/drive/folders/{}", self.base_url, folder)
    }

    pub fn create_document(&mut self, folder: &FolderId, name: &str, body: Element) -> Artifact {
        self.insert(folder, name, Content::Flow(body))
    }

    pub fn create_spreadsheet<I, S>(&mut self, folder: &FolderId, name: &str, sheets: I) -> Artifact
    where
        I: IntoIterator<Item = (S, Vec<Vec<CellValue>>)>,
        S: Into<String>,
    {
        let sheets = sheets
            .into_iter()
            .map(|(sheet, values)| (sheet.into(), values))
            .collect();
        self.insert(folder, name, Content::Tabular(sheets))
    }

    /// Look up a file, trashed or not.
    #[must_use]
    pub fn file(&self, id: &ArtifactId) -> Option<&StoredFile> {
        self.files.get(id)
    }

    /// Files in `folder` that are not trashed, in creation order.
    #[must_use]
    pub fn files_in(&self, folder: &FolderId) -> Vec<&StoredFile> {
        self.files
            .values()
            .filter(|file| !file.trashed && &file.folder == folder)
            .collect()
    }

    /// Values of a sheet, if both book and sheet exist.
    #[must_use]
    pub fn sheet_values(&self, sheet: &SheetRef) -> Option<&Vec<Vec<CellValue>>> {
        match &self.files.get(&sheet.book)?.content {
            Content::Tabular(sheets) => sheets.get(&sheet.sheet),
            _ => None,
        }
    }

    /// Plain text of a flow document or PDF.
    #[must_use]
    pub fn document_text(&self, id: &ArtifactId) -> Option<String> {
        match &self.files.get(id)?.content {
            Content::Flow(body) => Some(body.plain_text()),
            Content::Pdf(text) => Some(text.clone()),
            Content::Tabular(_) => None,
        }
    }

    #[must_use]
    pub fn outbox(&self) -> &[OutgoingMail] {
        &self.outbox
    }

    /// Header cells highlighted on a sheet.
    #[must_use]
    pub fn highlighted(&self, sheet: &SheetRef) -> Vec<CellPos> {
        self.highlighted
            .iter()
            .filter(|(s, _)| s == sheet)
            .map(|(_, cell)| *cell)
            .collect()
    }

    /// Number of display value snapshots taken, across all sheets.
    #[must_use]
    pub fn display_reads(&self) -> usize {
        self.display_reads.get()
    }

    /// Number of range writes made to a sheet.
    #[must_use]
    pub fn range_writes(&self, sheet: &SheetRef) -> usize {
        self.range_writes.get(sheet).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn url_for(&self, id: &ArtifactId, kind: &ArtifactKind) -> String {
        match kind {
            ArtifactKind::FlowDocument => format!("{}/document/d/{}/edit", self.base_url, id),
            ArtifactKind::TabularDocument => {
                format!("{}/spreadsheets/d/{}/edit", self.base_url, id)
            }
            ArtifactKind::Pdf | ArtifactKind::Other(_) => {
                format!("{}/file/d/{}/view", self.base_url, id)
            }
        }
    }

    fn insert(&mut self, folder: &FolderId, name: &str, content: Content) -> Artifact {
        let id = ArtifactId(new_id());
        let kind = match &content {
            Content::Flow(_) => ArtifactKind::FlowDocument,
            Content::Tabular(_) => ArtifactKind::TabularDocument,
            Content::Pdf(_) => ArtifactKind::Pdf,
        };
        let artifact = Artifact {
            url: self.url_for(&id, &kind),
            id: id.clone(),
            name: name.to_string(),
            kind,
        };
        self.files.insert(
            id,
            StoredFile {
                artifact: artifact.clone(),
                folder: folder.clone(),
                content,
                trashed: false,
                shared_with: Vec::new(),
            },
        );
        artifact
    }

    fn live(&self, id: &ArtifactId) -> MergeResult<&StoredFile> {
        self.files
            .get(id)
            .filter(|file| !file.trashed)
            .ok_or_else(|| MergeError::collaborator("file lookup", format!("no such file: {id}")))
    }

    fn live_mut(&mut self, id: &ArtifactId) -> MergeResult<&mut StoredFile> {
        self.files
            .get_mut(id)
            .filter(|file| !file.trashed)
            .ok_or_else(|| MergeError::collaborator("file lookup", format!("no such file: {id}")))
    }

    fn sheet_mut(&mut self, sheet: &SheetRef) -> MergeResult<&mut Vec<Vec<CellValue>>> {
        let file = self.live_mut(&sheet.book)?;
        let kind = file.artifact.kind.clone();
        match &mut file.content {
            Content::Tabular(sheets) => sheets.get_mut(&sheet.sheet).ok_or_else(|| {
                MergeError::collaborator("sheet lookup", format!("no such sheet: {sheet}"))
            }),
            _ => Err(MergeError::unsupported("sheet access", kind)),
        }
    }

    fn sheet(&self, sheet: &SheetRef) -> MergeResult<&Vec<Vec<CellValue>>> {
        let file = self.live(&sheet.book)?;
        match &file.content {
            Content::Tabular(sheets) => sheets.get(&sheet.sheet).ok_or_else(|| {
                MergeError::collaborator("sheet lookup", format!("no such sheet: {sheet}"))
            }),
            _ => Err(MergeError::unsupported("sheet access", &file.artifact.kind)),
        }
    }

    fn flow_body_mut(&mut self, id: &ArtifactId) -> MergeResult<&mut Element> {
        let file = self.live_mut(id)?;
        let kind = file.artifact.kind.clone();
        match &mut file.content {
            Content::Flow(body) => Ok(body),
            _ => Err(MergeError::unsupported("document editing", kind)),
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Tab-separated text of every sheet, for PDF renderings.
fn render_sheets(sheets: &IndexMap<String, Vec<Vec<CellValue>>>) -> String {
    let mut out = String::new();
    for (name, rows) in sheets {
        out.push_str(name);
        out.push('\n');
        for row in rows {
            let line: Vec<String> = row.iter().map(CellValue::as_str).collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
    }
    out
}

impl Storage for MemoryWorkspace {
    fn open_by_locator(&mut self, locator: &str) -> MergeResult<Artifact> {
        let id = ArtifactId(entity_id_from_locator(locator)?);
        Ok(self.live(&id)?.artifact.clone())
    }

    fn folder_by_id(&self, id: &str) -> MergeResult<FolderId> {
        let folder = FolderId(id.to_string());
        if self.folders.contains_key(&folder) {
            Ok(folder)
        } else {
            Err(MergeError::collaborator(
                "folder lookup",
                format!("no such folder: {id}"),
            ))
        }
    }

    fn parent_folder(&self, artifact: &Artifact) -> MergeResult<FolderId> {
        Ok(self.live(&artifact.id)?.folder.clone())
    }

    fn duplicate(
        &mut self,
        artifact: &Artifact,
        name: &str,
        folder: &FolderId,
    ) -> MergeResult<Artifact> {
        self.folder_by_id(&folder.0)?;
        let content = self.live(&artifact.id)?.content.clone();
        Ok(self.insert(folder, name, content))
    }

    fn rename(&mut self, artifact: &mut Artifact, name: &str) -> MergeResult<()> {
        self.live_mut(&artifact.id)?.artifact.name = name.to_string();
        artifact.name = name.to_string();
        Ok(())
    }

    fn share_with(&mut self, artifact: &Artifact, email: &str) -> MergeResult<()> {
        self.live_mut(&artifact.id)?
            .shared_with
            .push(email.to_string());
        Ok(())
    }

    fn trash(&mut self, artifact: &Artifact) -> MergeResult<()> {
        self.live_mut(&artifact.id)?.trashed = true;
        Ok(())
    }

    fn export_pdf(&mut self, artifact: &Artifact, folder: &FolderId) -> MergeResult<Artifact> {
        let file = self.live(&artifact.id)?;
        let Content::Flow(body) = &file.content else {
            return Err(MergeError::unsupported("pdf export", &file.artifact.kind));
        };
        let text = body.plain_text();
        let name = file.artifact.name.clone();
        self.folder_by_id(&folder.0)?;
        Ok(self.insert(folder, &name, Content::Pdf(text)))
    }

    fn flush(&mut self) -> MergeResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

impl FlowDocuments for MemoryWorkspace {
    fn body_text(&self, doc: &ArtifactId) -> MergeResult<String> {
        let file = self.live(doc)?;
        match &file.content {
            Content::Flow(body) => Ok(body.plain_text()),
            _ => Err(MergeError::unsupported("document text", &file.artifact.kind)),
        }
    }

    fn replace_text(&mut self, doc: &ArtifactId, pattern: &str, value: &str) -> MergeResult<bool> {
        Ok(self.flow_body_mut(doc)?.replace_literal(pattern, value))
    }

    fn body_mut(&mut self, doc: &ArtifactId) -> MergeResult<&mut dyn DocumentNode> {
        let body: &mut dyn DocumentNode = self.flow_body_mut(doc)?;
        Ok(body)
    }

    fn save(&mut self, doc: &ArtifactId) -> MergeResult<()> {
        self.live(doc).map(|_| ())
    }
}

impl Spreadsheets for MemoryWorkspace {
    fn sheet_names(&self, book: &ArtifactId) -> MergeResult<Vec<String>> {
        let file = self.live(book)?;
        match &file.content {
            Content::Tabular(sheets) => Ok(sheets.keys().cloned().collect()),
            _ => Err(MergeError::unsupported("sheet listing", &file.artifact.kind)),
        }
    }

    fn read_values(&self, sheet: &SheetRef) -> MergeResult<Vec<Vec<CellValue>>> {
        self.sheet(sheet).cloned()
    }

    fn read_display_values(&self, sheet: &SheetRef) -> MergeResult<DataGrid> {
        let values = self.sheet(sheet)?;
        self.display_reads.set(self.display_reads.get() + 1);
        Ok(DataGrid::from_cells(values))
    }

    fn write_range(
        &mut self,
        sheet: &SheetRef,
        origin: CellPos,
        values: Vec<Vec<CellValue>>,
    ) -> MergeResult<()> {
        if origin.row == 0 || origin.col == 0 {
            return Err(MergeError::collaborator(
                "range write",
                format!("invalid origin {}:{}", origin.row, origin.col),
            ));
        }
        let grid = self.sheet_mut(sheet)?;

        for (r, row) in values.into_iter().enumerate() {
            let row_index = origin.row - 1 + r;
            if grid.len() <= row_index {
                grid.resize(row_index + 1, Vec::new());
            }
            let target = &mut grid[row_index];
            for (c, value) in row.into_iter().enumerate() {
                let col_index = origin.col - 1 + c;
                if target.len() <= col_index {
                    target.resize(col_index + 1, CellValue::Null);
                }
                target[col_index] = value;
            }
        }

        // Keep the range rectangular.
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        for row in grid.iter_mut() {
            row.resize(width, CellValue::Null);
        }

        *self.range_writes.entry(sheet.clone()).or_insert(0) += 1;
        Ok(())
    }

    fn highlight_header(&mut self, sheet: &SheetRef, cell: CellPos) -> MergeResult<()> {
        self.sheet(sheet)?;
        if !self.highlighted.iter().any(|(s, c)| s == sheet && *c == cell) {
            self.highlighted.push((sheet.clone(), cell));
        }
        Ok(())
    }
}

impl PdfRenderer for MemoryWorkspace {
    fn render_pdf(&mut self, book: &Artifact) -> MergeResult<Artifact> {
        let file = self.live(&book.id)?;
        let Content::Tabular(sheets) = &file.content else {
            return Err(MergeError::unsupported("pdf rendering", &file.artifact.kind));
        };
        let text = render_sheets(sheets);
        let name = file.artifact.name.clone();
        let folder = file.folder.clone();
        Ok(self.insert(&folder, &name, Content::Pdf(text)))
    }
}

impl Mailer for MemoryWorkspace {
    fn send(&mut self, mail: &OutgoingMail) -> MergeResult<()> {
        if self.rejected_recipients.contains(&mail.to) {
            return Err(MergeError::collaborator(
                "mail send",
                format!("recipient rejected: {}", mail.to),
            ));
        }
        for attachment in &mail.attachments {
            self.live(&attachment.id)?;
        }
        self.outbox.push(mail.clone());
        Ok(())
    }
}

impl Identity for MemoryWorkspace {
    fn active_user_email(&self) -> MergeResult<String> {
        Ok(self.user.clone())
    }

    fn aliases(&self) -> MergeResult<Vec<String>> {
        Ok(self.aliases.clone())
    }
}
