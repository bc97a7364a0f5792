//! Template tag extraction.
//!
//! Tags are flat `{{name}}` placeholders. Flow documents are scanned as one
//! body of text; tabular documents are scanned cell by cell.

use crate::error::{MergeError, MergeResult};
use crate::platform::{Artifact, ArtifactKind, FlowDocuments, SheetRef, Spreadsheets};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use rowmerge_sheet::{CellPos, CellValue};

lazy_static! {
    static ref TAG_PATTERN: Regex = Regex::new(r"\{\{(.*?)\}\}").unwrap();
}

/// Wrap a tag name in braces.
#[must_use]
pub fn tag_literal(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Strip the braces off a tag literal. Returns `None` if `literal` is not one.
#[must_use]
pub fn tag_name(literal: &str) -> Option<&str> {
    literal.strip_prefix("{{")?.strip_suffix("}}")
}

/// Tags of a flow document: name -> ordinal positions among all tag matches.
pub type FlowTags = IndexMap<String, Vec<usize>>;

/// Tags of a tabular document: sheet -> tag literal -> last cell it was seen in.
pub type TabularTags = IndexMap<String, IndexMap<String, CellPos>>;

/// Tags found in a template, shaped by the template's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateTags {
    Flow(FlowTags),
    Tabular(TabularTags),
}

impl TemplateTags {
    /// Artifact kind these tags were extracted from.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        match self {
            TemplateTags::Flow(_) => ArtifactKind::FlowDocument,
            TemplateTags::Tabular(_) => ArtifactKind::TabularDocument,
        }
    }

    /// Distinct tag names, in first-seen order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        match self {
            TemplateTags::Flow(tags) => tags.keys().cloned().collect(),
            TemplateTags::Tabular(sheets) => {
                let mut names: Vec<String> = Vec::new();
                for literal in sheets.values().flat_map(IndexMap::keys) {
                    if let Some(name) = tag_name(literal) {
                        if !names.iter().any(|n| n == name) {
                            names.push(name.to_string());
                        }
                    }
                }
                names
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            TemplateTags::Flow(tags) => tags.is_empty(),
            TemplateTags::Tabular(sheets) => sheets.values().all(IndexMap::is_empty),
        }
    }
}

/// Collect `{{...}}` tags from flow text. Duplicate names accumulate positions.
#[must_use]
pub fn extract_flow_tags(text: &str) -> FlowTags {
    let mut tags = FlowTags::new();
    for (index, captures) in TAG_PATTERN.captures_iter(text).enumerate() {
        tags.entry(captures[1].to_string()).or_default().push(index);
    }
    tags
}

/// Collect tag literals from one sheet's values.
///
/// Only string cells are scanned. A literal seen again later in the sheet
/// replaces the earlier position.
#[must_use]
pub fn extract_sheet_tags(values: &[Vec<CellValue>]) -> IndexMap<String, CellPos> {
    let mut tags = IndexMap::new();
    for (row, cells) in values.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let Some(text) = cell.as_text() else {
                continue;
            };
            for found in TAG_PATTERN.find_iter(text) {
                tags.insert(found.as_str().to_string(), CellPos::new(row + 1, col + 1));
            }
        }
    }
    tags
}

/// Scan a template artifact for tags.
pub fn extract_tags<P>(platform: &P, template: &Artifact) -> MergeResult<TemplateTags>
where
    P: FlowDocuments + Spreadsheets + ?Sized,
{
    match template.kind {
        ArtifactKind::FlowDocument => {
            let text = platform.body_text(&template.id)?;
            Ok(TemplateTags::Flow(extract_flow_tags(&text)))
        }
        ArtifactKind::TabularDocument => {
            let mut sheets = TabularTags::new();
            for sheet in platform.sheet_names(&template.id)? {
                let values = platform.read_values(&SheetRef::new(template.id.clone(), &sheet))?;
                let tags = extract_sheet_tags(&values);
                if !tags.is_empty() {
                    sheets.insert(sheet, tags);
                }
            }
            Ok(TemplateTags::Tabular(sheets))
        }
        ref other => Err(MergeError::unsupported("tag extraction", other)),
    }
}
