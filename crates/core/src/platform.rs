//! Collaborator interfaces.
//!
//! The engine never touches files, sheets or mail directly. Everything it
//! needs from the hosting platform is expressed by the traits in this module;
//! [`crate::memory::MemoryWorkspace`] implements all of them in memory.

use crate::error::MergeResult;
use rowmerge_sheet::{CellPos, CellValue, DataGrid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Linear text body made of paragraphs and runs.
    FlowDocument,
    /// Named sheets of 2D value grids.
    TabularDocument,
    /// Rendered, read-only export.
    Pdf,
    /// Anything else, identified by its media type.
    Other(String),
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::FlowDocument => write!(f, "document"),
            ArtifactKind::TabularDocument => write!(f, "spreadsheet"),
            ArtifactKind::Pdf => write!(f, "pdf"),
            ArtifactKind::Other(media_type) => write!(f, "{media_type}"),
        }
    }
}

/// Opaque platform identifier of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque platform identifier of a folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderId(pub String);

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub name: String,
    pub url: String,
    pub kind: ArtifactKind,
}

/// A named sheet inside a tabular document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetRef {
    pub book: ArtifactId,
    pub sheet: String,
}

impl SheetRef {
    pub fn new(book: ArtifactId, sheet: impl Into<String>) -> Self {
        Self {
            book,
            sheet: sheet.into(),
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.book, self.sheet)
    }
}

/// File storage.
pub trait Storage {
    /// Open a file given its URL-like locator.
    fn open_by_locator(&mut self, locator: &str) -> MergeResult<Artifact>;

    /// Look up a folder by id.
    fn folder_by_id(&self, id: &str) -> MergeResult<FolderId>;

    /// Folder a file lives in.
    fn parent_folder(&self, artifact: &Artifact) -> MergeResult<FolderId>;

    /// Copy a file into `folder` under `name`.
    fn duplicate(
        &mut self,
        artifact: &Artifact,
        name: &str,
        folder: &FolderId,
    ) -> MergeResult<Artifact>;

    fn rename(&mut self, artifact: &mut Artifact, name: &str) -> MergeResult<()>;

    /// Grant `email` access to a file.
    fn share_with(&mut self, artifact: &Artifact, email: &str) -> MergeResult<()>;

    fn trash(&mut self, artifact: &Artifact) -> MergeResult<()>;

    /// Export a flow document as a PDF file with the same name in `folder`.
    fn export_pdf(&mut self, artifact: &Artifact, folder: &FolderId) -> MergeResult<Artifact>;

    /// Force buffered writes to become durable.
    fn flush(&mut self) -> MergeResult<()>;
}

/// A node of a flow document's element tree.
///
/// Text nodes report their content through [`DocumentNode::text`]; container
/// nodes return `None` there and expose children instead.
pub trait DocumentNode {
    fn text(&self) -> Option<&str>;
    fn set_text(&mut self, text: String);
    fn child_count(&self) -> usize;
    fn child_mut(&mut self, index: usize) -> Option<&mut dyn DocumentNode>;
}

/// Flow document editing.
pub trait FlowDocuments {
    /// Full plain text of the document body.
    fn body_text(&self, doc: &ArtifactId) -> MergeResult<String>;

    /// Replace every literal occurrence of `pattern`. Returns whether any was found.
    fn replace_text(&mut self, doc: &ArtifactId, pattern: &str, value: &str) -> MergeResult<bool>;

    /// Root of the document body for element-by-element edits.
    fn body_mut(&mut self, doc: &ArtifactId) -> MergeResult<&mut dyn DocumentNode>;

    fn save(&mut self, doc: &ArtifactId) -> MergeResult<()>;
}

/// Spreadsheet range access.
pub trait Spreadsheets {
    /// Sheet names of a tabular document, in tab order.
    fn sheet_names(&self, book: &ArtifactId) -> MergeResult<Vec<String>>;

    /// Typed values of the sheet's populated range, anchored at A1.
    fn read_values(&self, sheet: &SheetRef) -> MergeResult<Vec<Vec<CellValue>>>;

    /// Display strings of the sheet's populated range, anchored at A1.
    fn read_display_values(&self, sheet: &SheetRef) -> MergeResult<DataGrid>;

    /// Write a rectangular block of values with its top-left cell at `origin`.
    fn write_range(
        &mut self,
        sheet: &SheetRef,
        origin: CellPos,
        values: Vec<Vec<CellValue>>,
    ) -> MergeResult<()>;

    /// Apply the bookkeeping-column header style to one cell.
    fn highlight_header(&mut self, sheet: &SheetRef, cell: CellPos) -> MergeResult<()>;
}

/// Rendering of tabular documents.
pub trait PdfRenderer {
    /// Render a spreadsheet as a PDF file placed next to it.
    fn render_pdf(&mut self, book: &Artifact) -> MergeResult<Artifact>;
}

/// A message handed to the mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub attachments: Vec<Artifact>,
    pub from: String,
}

/// Mail transport.
pub trait Mailer {
    fn send(&mut self, mail: &OutgoingMail) -> MergeResult<()>;
}

/// The signed-in user of the platform.
pub trait Identity {
    fn active_user_email(&self) -> MergeResult<String>;
    fn aliases(&self) -> MergeResult<Vec<String>>;
}

/// Everything a merge run needs.
pub trait Platform: Storage + FlowDocuments + Spreadsheets + PdfRenderer + Mailer {}

impl<T> Platform for T where T: Storage + FlowDocuments + Spreadsheets + PdfRenderer + Mailer {}

/// Addresses a user can send mail as: the active account first, then its aliases.
pub fn sender_addresses(identity: &dyn Identity) -> MergeResult<Vec<String>> {
    let mut addresses = vec![identity.active_user_email()?];
    addresses.extend(identity.aliases()?);
    Ok(addresses)
}
