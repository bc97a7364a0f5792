//! Template merging.
//!
//! A [`Template`] couples a template artifact with the tags found in it.
//! [`merge_template`] copies the template and fills its tags from one data
//! row, using the substitution strategy of the template's kind.

use crate::error::{MergeError, MergeResult};
use crate::locator::classify_locator;
use crate::platform::{
    Artifact, ArtifactKind, DocumentNode, FlowDocuments, FolderId, SheetRef, Spreadsheets,
    Storage,
};
use crate::selector::ColumnSelector;
use crate::tags::{extract_tags, tag_literal, tag_name, FlowTags, TabularTags, TemplateTags};
use rowmerge_sheet::{CellPos, CellValue, DataGrid, HeaderMap};

/// Name given to a template copy until its title is known.
pub const TEMP_ARTIFACT_NAME: &str = "%temp%";

/// A template artifact and its tag map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    artifact: Artifact,
    tags: TemplateTags,
}

impl Template {
    /// Pair an artifact with its tags. The tag map must come from the same
    /// kind of artifact.
    pub fn new(artifact: Artifact, tags: TemplateTags) -> MergeResult<Self> {
        if artifact.kind != tags.kind() {
            return Err(MergeError::unsupported("template merge", &artifact.kind));
        }
        Ok(Self { artifact, tags })
    }

    /// Open a template by locator and extract its tags.
    ///
    /// Locators that are neither documents nor spreadsheets fail with
    /// [`MergeError::UnrecognizedTemplateKind`].
    pub fn open<P>(platform: &mut P, locator: &str) -> MergeResult<Self>
    where
        P: Storage + FlowDocuments + Spreadsheets + ?Sized,
    {
        let kind = classify_locator(locator)
            .map_err(|_| MergeError::UnrecognizedTemplateKind(locator.to_string()))?;
        let artifact = platform.open_by_locator(locator)?;
        if artifact.kind != kind {
            return Err(MergeError::unsupported("template open", &artifact.kind));
        }
        let tags = extract_tags(platform, &artifact)?;
        Self::new(artifact, tags)
    }

    #[must_use]
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    #[must_use]
    pub fn tags(&self) -> &TemplateTags {
        &self.tags
    }

    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.tags.kind()
    }
}

/// The data row a merge fills tags from.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    /// 1-based sheet row
    pub row: usize,
    pub grid: &'a DataGrid,
    pub headers: &'a HeaderMap,
}

impl RowContext<'_> {
    /// Display value of a header column in this row.
    fn value_of(&self, position: usize) -> &str {
        self.grid.cell(self.row, position)
    }
}

/// Produce a merged copy of `template` in `destination`, renamed by `title`
/// when one is given.
pub fn merge_template<P>(
    platform: &mut P,
    template: &Template,
    ctx: &RowContext<'_>,
    destination: &FolderId,
    title: Option<&ColumnSelector>,
) -> MergeResult<Artifact>
where
    P: Storage + FlowDocuments + Spreadsheets + ?Sized,
{
    let name = title
        .map(|selector| selector.resolve_value(ctx.row, ctx.grid, ctx.headers))
        .transpose()?;

    let mut merged = match &template.tags {
        TemplateTags::Flow(tags) => {
            merge_flow_document(platform, &template.artifact, tags, ctx, destination)?
        }
        TemplateTags::Tabular(tags) => {
            merge_tabular_document(platform, &template.artifact, tags, ctx, destination)?
        }
    };

    if let Some(name) = name {
        if let Err(err) = platform.rename(&mut merged, &name) {
            platform.trash(&merged)?;
            return Err(err);
        }
    }

    Ok(merged)
}

/// Merge a flow document and return the plain text of the result. The
/// intermediate copy is trashed.
pub fn render_text<P>(
    platform: &mut P,
    template: &Template,
    ctx: &RowContext<'_>,
    scratch: &FolderId,
) -> MergeResult<String>
where
    P: Storage + FlowDocuments + Spreadsheets + ?Sized,
{
    let TemplateTags::Flow(tags) = &template.tags else {
        return Err(MergeError::unsupported("text rendering", template.kind()));
    };
    let rendered = merge_flow_document(platform, &template.artifact, tags, ctx, scratch)?;
    let text = platform.body_text(&rendered.id)?;
    platform.trash(&rendered)?;
    Ok(text)
}

fn merge_flow_document<P>(
    platform: &mut P,
    template: &Artifact,
    tags: &FlowTags,
    ctx: &RowContext<'_>,
    destination: &FolderId,
) -> MergeResult<Artifact>
where
    P: Storage + FlowDocuments + ?Sized,
{
    let merged = platform.duplicate(template, TEMP_ARTIFACT_NAME, destination)?;

    for (name, column) in ctx.headers.iter() {
        if !tags.contains_key(name) {
            continue;
        }
        let pattern = tag_literal(name);
        let value = ctx.value_of(column.position);

        if !platform.replace_text(&merged.id, &pattern, value)? {
            // Tags split across formatting runs are invisible to the literal search.
            tracing::warn!(
                "Tag {} not found by text search in {}, rewriting text nodes",
                pattern,
                merged.id
            );
            let body = platform.body_mut(&merged.id)?;
            rewrite_text_nodes(body, &|text: &str| text.contains(&pattern), &|text: &str| {
                text.replace(&pattern, value)
            });
        }
    }

    platform.save(&merged.id)?;
    Ok(merged)
}

fn merge_tabular_document<P>(
    platform: &mut P,
    template: &Artifact,
    tags: &TabularTags,
    ctx: &RowContext<'_>,
    destination: &FolderId,
) -> MergeResult<Artifact>
where
    P: Storage + Spreadsheets + ?Sized,
{
    let merged = platform.duplicate(template, TEMP_ARTIFACT_NAME, destination)?;

    for (sheet_name, sheet_tags) in tags {
        let sheet = SheetRef::new(merged.id.clone(), sheet_name.as_str());
        let mut values = platform.read_values(&sheet)?;

        for (literal, pos) in sheet_tags {
            let Some(column) = tag_name(literal).and_then(|name| ctx.headers.get(name)) else {
                continue;
            };
            let replacement = ctx.value_of(column.position);
            let Some(cell) = values
                .get_mut(pos.row.saturating_sub(1))
                .and_then(|cells| cells.get_mut(pos.col.saturating_sub(1)))
            else {
                continue;
            };
            let updated = cell
                .as_text()
                .map(|text| text.replacen(literal.as_str(), replacement, 1));
            if let Some(updated) = updated {
                *cell = CellValue::String(updated);
            }
        }

        // One write per sheet.
        platform.write_range(&sheet, CellPos::origin(), values)?;
    }

    Ok(merged)
}

/// Walk an element tree and rewrite every text node accepted by `matches`.
/// Returns the number of nodes rewritten.
pub fn rewrite_text_nodes<M, R>(node: &mut dyn DocumentNode, matches: &M, rewrite: &R) -> usize
where
    M: Fn(&str) -> bool,
    R: Fn(&str) -> String,
{
    let mut rewritten = 0;

    let replacement = node.text().filter(|text| matches(*text)).map(|text| rewrite(text));
    if let Some(text) = replacement {
        node.set_text(text);
        rewritten += 1;
    }

    for index in 0..node.child_count() {
        if let Some(child) = node.child_mut(index) {
            rewritten += rewrite_text_nodes(child, matches, rewrite);
        }
    }

    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Element, MemoryWorkspace};
    use crate::platform::ArtifactId;

    /// A platform whose literal search never finds anything, forcing the
    /// element walk.
    struct NoTextSearch(MemoryWorkspace);

    impl Storage for NoTextSearch {
        fn open_by_locator(&mut self, locator: &str) -> MergeResult<Artifact> {
            self.0.open_by_locator(locator)
        }
        fn folder_by_id(&self, id: &str) -> MergeResult<FolderId> {
            self.0.folder_by_id(id)
        }
        fn parent_folder(&self, artifact: &Artifact) -> MergeResult<FolderId> {
            self.0.parent_folder(artifact)
        }
        fn duplicate(
            &mut self,
            artifact: &Artifact,
            name: &str,
            folder: &FolderId,
        ) -> MergeResult<Artifact> {
            self.0.duplicate(artifact, name, folder)
        }
        fn rename(&mut self, artifact: &mut Artifact, name: &str) -> MergeResult<()> {
            self.0.rename(artifact, name)
        }
        fn share_with(&mut self, artifact: &Artifact, email: &str) -> MergeResult<()> {
            self.0.share_with(artifact, email)
        }
        fn trash(&mut self, artifact: &Artifact) -> MergeResult<()> {
            self.0.trash(artifact)
        }
        fn export_pdf(&mut self, artifact: &Artifact, folder: &FolderId) -> MergeResult<Artifact> {
            self.0.export_pdf(artifact, folder)
        }
        fn flush(&mut self) -> MergeResult<()> {
            self.0.flush()
        }
    }

    impl FlowDocuments for NoTextSearch {
        fn body_text(&self, doc: &ArtifactId) -> MergeResult<String> {
            self.0.body_text(doc)
        }
        fn replace_text(
            &mut self,
            _doc: &ArtifactId,
            _pattern: &str,
            _value: &str,
        ) -> MergeResult<bool> {
            Ok(false)
        }
        fn body_mut(
            &mut self,
            doc: &ArtifactId,
        ) -> MergeResult<&mut dyn DocumentNode> {
            self.0.body_mut(doc)
        }
        fn save(&mut self, doc: &ArtifactId) -> MergeResult<()> {
            self.0.save(doc)
        }
    }

    impl Spreadsheets for NoTextSearch {
        fn sheet_names(&self, book: &ArtifactId) -> MergeResult<Vec<String>> {
            self.0.sheet_names(book)
        }
        fn read_values(&self, sheet: &SheetRef) -> MergeResult<Vec<Vec<CellValue>>> {
            self.0.read_values(sheet)
        }
        fn read_display_values(&self, sheet: &SheetRef) -> MergeResult<DataGrid> {
            self.0.read_display_values(sheet)
        }
        fn write_range(
            &mut self,
            sheet: &SheetRef,
            origin: CellPos,
            values: Vec<Vec<CellValue>>,
        ) -> MergeResult<()> {
            self.0.write_range(sheet, origin, values)
        }
        fn highlight_header(&mut self, sheet: &SheetRef, cell: CellPos) -> MergeResult<()> {
            self.0.highlight_header(sheet, cell)
        }
    }

    fn people() -> (DataGrid, HeaderMap) {
        let grid = DataGrid::from_data(vec![vec!["Name", "City"], vec!["Alice", "Oslo"]]);
        let headers = HeaderMap::from_row(grid.row(1).unwrap()).unwrap();
        (grid, headers)
    }

    #[test]
    fn element_walk_runs_when_search_misses() {
        let mut ws = MemoryWorkspace::new("me@example.com");
        let folder = ws.create_folder("Docs");
        let doc = ws.create_document(
            &folder,
            "Letter",
            Element::Body(vec![
                Element::paragraph(["Dear ", "{{Name}}", ","]),
                Element::paragraph(["See you in {{City}}."]),
            ]),
        );
        let mut platform = NoTextSearch(ws);
        let template = Template::open(&mut platform, &doc.url).unwrap();
        let (grid, headers) = people();
        let ctx = RowContext {
            row: 2,
            grid: &grid,
            headers: &headers,
        };

        let merged = merge_template(&mut platform, &template, &ctx, &folder, None).unwrap();

        assert_eq!(merged.name, TEMP_ARTIFACT_NAME);
        assert_eq!(
            platform.0.document_text(&merged.id).unwrap(),
            "Dear Alice,\nSee you in Oslo."
        );
    }

    #[test]
    fn render_text_trashes_the_rendering() {
        let mut ws = MemoryWorkspace::new("me@example.com");
        let folder = ws.create_folder("Mail");
        let doc = ws.create_document(&folder, "Body", Element::from_text("Hi {{Name}}"));
        let template = Template::open(&mut ws, &doc.url).unwrap();
        let (grid, headers) = people();
        let ctx = RowContext {
            row: 2,
            grid: &grid,
            headers: &headers,
        };

        assert_eq!(render_text(&mut ws, &template, &ctx, &folder).unwrap(), "Hi Alice");
        assert_eq!(ws.files_in(&folder).len(), 1);
    }

    #[test]
    fn title_renames_merged_copy() {
        let mut ws = MemoryWorkspace::new("me@example.com");
        let folder = ws.create_folder("Docs");
        let doc = ws.create_document(&folder, "Letter", Element::from_text("{{City}}"));
        let template = Template::open(&mut ws, &doc.url).unwrap();
        let (grid, headers) = people();
        let ctx = RowContext {
            row: 2,
            grid: &grid,
            headers: &headers,
        };
        let title = ColumnSelector::ByLetter("B".into());

        let merged = merge_template(&mut ws, &template, &ctx, &folder, Some(&title)).unwrap();

        assert_eq!(merged.name, "Oslo");
        assert_eq!(ws.file(&merged.id).unwrap().artifact.name, "Oslo");
    }

    #[test]
    fn unresolvable_title_leaves_no_copy() {
        let mut ws = MemoryWorkspace::new("me@example.com");
        let templates = ws.create_folder("Templates");
        let out = ws.create_folder("Out");
        let doc = ws.create_document(&templates, "Letter", Element::from_text("{{City}}"));
        let template = Template::open(&mut ws, &doc.url).unwrap();
        let (grid, headers) = people();
        let ctx = RowContext {
            row: 2,
            grid: &grid,
            headers: &headers,
        };

        for title in [
            ColumnSelector::ByHeader("Surname".into()),
            ColumnSelector::ByLetter("A1".into()),
            ColumnSelector::ByNumber(0),
        ] {
            assert!(merge_template(&mut ws, &template, &ctx, &out, Some(&title)).is_err());
        }
        assert!(ws.files_in(&out).is_empty());
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        let mut ws = MemoryWorkspace::new("me@example.com");
        let folder = ws.create_folder("Docs");
        let doc = ws.create_document(&folder, "Letter", Element::from_text("x"));
        let err = Template::new(doc, TemplateTags::Tabular(TabularTags::new())).unwrap_err();
        assert!(matches!(err, MergeError::UnsupportedTemplateKind { .. }));
    }

    #[test]
    fn rewrite_counts_touched_nodes() {
        let mut body = Element::Body(vec![
            Element::paragraph(["a {{x}}", "b", "{{x}} c"]),
            Element::paragraph(["{{x}}"]),
        ]);
        let count = rewrite_text_nodes(&mut body, &|t: &str| t.contains("{{x}}"), &|t: &str| {
            t.replace("{{x}}", "1")
        });
        assert_eq!(count, 3);
        assert_eq!(body.plain_text(), "a 1b1 c\n1");
    }
}
