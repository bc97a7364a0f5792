//! Merge configuration.
//!
//! [`MergeConfigBuilder`] is the only mutable view of a configuration. Every
//! setter validates its input; [`MergeConfigBuilder::snapshot`] and
//! [`MergeConfigBuilder::build`] hand out immutable [`MergeConfig`] values for
//! a run to consume.

use crate::error::{MergeError, MergeResult};
use crate::filter::{default_row_filters, RowFilter};
use crate::locator::entity_id_from_locator;
use crate::platform::{
    Artifact, ArtifactKind, FlowDocuments, FolderId, SheetRef, Spreadsheets, Storage,
};
use crate::selector::{ColumnSelector, SwitchedSelector};
use crate::template::Template;
use rowmerge_sheet::{CellPos, CellValue, HeaderMap};
use validator::ValidateEmail;

pub const MERGE_STATUS_HEADER: &str = "G Merge Status";
pub const EMAIL_TRACKING_STATUS_HEADER: &str = "Email Tracking Status";
pub const DOCUMENT_URL_HEADER: &str = "Document URL";
pub const MERGE_ID_HEADER: &str = "G Merge Id";

/// Columns a data source sheet always carries, in the order they are appended.
pub const BOOKKEEPING_HEADERS: [&str; 4] = [
    MERGE_STATUS_HEADER,
    EMAIL_TRACKING_STATUS_HEADER,
    DOCUMENT_URL_HEADER,
    MERGE_ID_HEADER,
];

pub const DEFAULT_HEADER_ROW: usize = 1;

/// The sheet rows are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub sheet: SheetRef,
    /// 1-based row holding the column headers
    pub header_row: usize,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocMergeSettings {
    pub enabled: bool,
    pub template: Option<Template>,
    pub destination: Option<FolderId>,
    pub title: Option<ColumnSelector>,
    pub shared_to: SwitchedSelector,
    pub as_pdf: bool,
}

/// Mail body template and the folder its renderings are made in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTemplate {
    pub template: Template,
    pub folder: FolderId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMergeSettings {
    pub enabled: bool,
    pub template: Option<MailTemplate>,
    pub sender: Option<String>,
    pub subject: Option<ColumnSelector>,
    pub recipients: Option<ColumnSelector>,
    pub cc: SwitchedSelector,
    pub bcc: SwitchedSelector,
    pub send_as_attachment: bool,
}

impl Default for MailMergeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            template: None,
            sender: None,
            subject: None,
            recipients: None,
            cc: SwitchedSelector::disabled(),
            bcc: SwitchedSelector::disabled(),
            send_as_attachment: true,
        }
    }
}

/// Configuration progress, derived from the settings on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    Unconfigured,
    PartiallyConfigured,
    Ready,
}

/// An immutable merge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    data_source: Option<DataSource>,
    row_filters: Vec<RowFilter>,
    doc: DocMergeSettings,
    mail: MailMergeSettings,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            data_source: None,
            row_filters: default_row_filters(),
            doc: DocMergeSettings::default(),
            mail: MailMergeSettings::default(),
        }
    }
}

impl MergeConfig {
    #[must_use]
    pub fn data_source(&self) -> Option<&DataSource> {
        self.data_source.as_ref()
    }

    #[must_use]
    pub fn row_filters(&self) -> &[RowFilter] {
        &self.row_filters
    }

    #[must_use]
    pub fn doc_merge(&self) -> &DocMergeSettings {
        &self.doc
    }

    #[must_use]
    pub fn mail_merge(&self) -> &MailMergeSettings {
        &self.mail
    }

    /// Every requirement that is not yet met, one message each.
    #[must_use]
    pub fn missing_requirements(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.data_source.is_none() {
            missing.push("No data source sheet set.".to_string());
        }

        if self.doc.enabled {
            if self.doc.template.is_none() {
                missing.push("No document merge template set.".to_string());
            }
            if self.doc.destination.is_none() {
                missing.push("No document merge destination folder set.".to_string());
            }
            if self.doc.title.is_none() {
                missing.push("No document merge document title set.".to_string());
            }
        }

        if self.mail.enabled {
            if self.mail.template.is_none() {
                missing.push("No mail merge template set.".to_string());
            }
            if self.mail.sender.is_none() {
                missing.push("No mail merge email sender set.".to_string());
            }
            if self.mail.subject.is_none() {
                missing.push("No mail merge email subject set.".to_string());
            }
            if self.mail.recipients.is_none() {
                missing.push("No mail merge email recipients set.".to_string());
            }
        }

        missing
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.missing_requirements().is_empty()
    }

    #[must_use]
    pub fn state(&self) -> ConfigState {
        if self.is_ready() {
            ConfigState::Ready
        } else if self.data_source.is_none() && !self.doc.enabled && !self.mail.enabled {
            ConfigState::Unconfigured
        } else {
            ConfigState::PartiallyConfigured
        }
    }

    /// Fail with every missing requirement at once.
    pub fn ensure_ready(&self) -> MergeResult<()> {
        let missing = self.missing_requirements();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MergeError::NotReady { missing })
        }
    }
}

/// Mutable configuration under construction.
#[derive(Debug, Clone, Default)]
pub struct MergeConfigBuilder {
    config: MergeConfig,
}

impl MergeConfigBuilder {
    /// A configuration with everything unset and merges disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`MergeConfigBuilder::new`], with mail sent as `active_user` unless
    /// another sender is set.
    #[must_use]
    pub fn for_user(active_user: impl Into<String>) -> Self {
        let mut builder = Self::new();
        builder.config.mail.sender = Some(active_user.into());
        builder
    }

    /// Immutable copy of the current settings.
    #[must_use]
    pub fn snapshot(&self) -> MergeConfig {
        self.config.clone()
    }

    #[must_use]
    pub fn missing_requirements(&self) -> Vec<String> {
        self.config.missing_requirements()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.config.is_ready()
    }

    #[must_use]
    pub fn state(&self) -> ConfigState {
        self.config.state()
    }

    /// Snapshot the configuration if it is ready to run.
    pub fn build(&self) -> MergeResult<MergeConfig> {
        self.config.ensure_ready()?;
        Ok(self.snapshot())
    }

    // ===== Data source =====

    /// Bind the data source sheet, using the first row as the header row.
    pub fn set_data_source<P>(&mut self, platform: &mut P, sheet: SheetRef) -> MergeResult<&mut Self>
    where
        P: Spreadsheets + ?Sized,
    {
        self.set_data_source_at(platform, sheet, DEFAULT_HEADER_ROW)
    }

    /// Bind the data source sheet with headers on `header_row` (1-based).
    ///
    /// Missing bookkeeping columns are appended to the header row and all of
    /// them are highlighted; existing ones are reused, so binding the same
    /// sheet again adds nothing.
    pub fn set_data_source_at<P>(
        &mut self,
        platform: &mut P,
        sheet: SheetRef,
        header_row: usize,
    ) -> MergeResult<&mut Self>
    where
        P: Spreadsheets + ?Sized,
    {
        if header_row == 0 {
            return Err(MergeError::InvalidOperation(
                "header row numbers start at 1".to_string(),
            ));
        }
        let headers = ensure_bookkeeping_columns(platform, &sheet, header_row)?;
        tracing::debug!("Data source {} bound with {} headers", sheet, headers.len());
        self.config.data_source = Some(DataSource {
            sheet,
            header_row,
            headers,
        });
        Ok(self)
    }

    // ===== Row filters =====

    /// Append a filter. Filters combine with logical AND.
    pub fn add_row_filter(&mut self, filter: RowFilter) -> &mut Self {
        self.config.row_filters.push(filter);
        self
    }

    pub fn add_row_filters(&mut self, filters: impl IntoIterator<Item = RowFilter>) -> &mut Self {
        self.config.row_filters.extend(filters);
        self
    }

    #[must_use]
    pub fn row_filters(&self) -> &[RowFilter] {
        &self.config.row_filters
    }

    /// Go back to the default filter set.
    pub fn reset_row_filters(&mut self) -> &mut Self {
        self.config.row_filters = default_row_filters();
        self
    }

    /// Remove every filter, including the default one.
    pub fn clear_row_filters(&mut self) -> &mut Self {
        self.config.row_filters.clear();
        self
    }

    // ===== Document merge =====

    pub fn enable_doc_merge(&mut self, enabled: bool) -> &mut Self {
        self.config.doc.enabled = enabled;
        self
    }

    /// Open the document merge template and extract its tags. On failure the
    /// previous template is kept.
    pub fn set_doc_template_by_locator<P>(
        &mut self,
        platform: &mut P,
        locator: &str,
    ) -> MergeResult<&mut Self>
    where
        P: Storage + FlowDocuments + Spreadsheets + ?Sized,
    {
        let template = Template::open(platform, locator)?;
        self.config.doc.template = Some(template);
        Ok(self)
    }

    pub fn set_doc_template<P>(&mut self, platform: &mut P, file: &Artifact) -> MergeResult<&mut Self>
    where
        P: Storage + FlowDocuments + Spreadsheets + ?Sized,
    {
        self.set_doc_template_by_locator(platform, &file.url)
    }

    pub fn set_doc_output_folder(&mut self, folder: FolderId) -> &mut Self {
        self.config.doc.destination = Some(folder);
        self
    }

    pub fn set_doc_output_folder_by_locator<P>(
        &mut self,
        platform: &P,
        locator: &str,
    ) -> MergeResult<&mut Self>
    where
        P: Storage + ?Sized,
    {
        let folder = platform.folder_by_id(&entity_id_from_locator(locator)?)?;
        Ok(self.set_doc_output_folder(folder))
    }

    /// Selector for the merged document's name. `None` unsets it.
    pub fn set_doc_title(&mut self, title: Option<ColumnSelector>) -> MergeResult<&mut Self> {
        self.config.doc.title = checked(title)?;
        Ok(self)
    }

    /// Selector for the address merged documents are shared with. `None`
    /// switches sharing off.
    pub fn set_doc_shared_to(
        &mut self,
        shared_to: Option<ColumnSelector>,
    ) -> MergeResult<&mut Self> {
        self.config.doc.shared_to = SwitchedSelector::from_option(checked(shared_to)?);
        Ok(self)
    }

    pub fn set_doc_as_pdf(&mut self, as_pdf: bool) -> &mut Self {
        self.config.doc.as_pdf = as_pdf;
        self
    }

    // ===== Mail merge =====

    pub fn enable_mail_merge(&mut self, enabled: bool) -> &mut Self {
        self.config.mail.enabled = enabled;
        self
    }

    /// Open the mail body template. Only flow documents are accepted; on
    /// failure the previous template is kept.
    pub fn set_mail_template_by_locator<P>(
        &mut self,
        platform: &mut P,
        locator: &str,
    ) -> MergeResult<&mut Self>
    where
        P: Storage + FlowDocuments + Spreadsheets + ?Sized,
    {
        let template = Template::open(platform, locator)?;
        if template.kind() != ArtifactKind::FlowDocument {
            return Err(MergeError::unsupported("mail template", template.kind()));
        }
        let folder = platform.parent_folder(template.artifact())?;
        self.config.mail.template = Some(MailTemplate { template, folder });
        Ok(self)
    }

    /// Send mail as `address`, which must be a well-formed email.
    pub fn set_mail_sender(&mut self, address: &str) -> MergeResult<&mut Self> {
        let address = address.trim().to_string();
        if !address.validate_email() {
            return Err(MergeError::InvalidEmail(address));
        }
        self.config.mail.sender = Some(address);
        Ok(self)
    }

    pub fn set_mail_subject(&mut self, subject: Option<ColumnSelector>) -> MergeResult<&mut Self> {
        self.config.mail.subject = checked(subject)?;
        Ok(self)
    }

    pub fn set_mail_recipients(
        &mut self,
        recipients: Option<ColumnSelector>,
    ) -> MergeResult<&mut Self> {
        self.config.mail.recipients = checked(recipients)?;
        Ok(self)
    }

    pub fn set_mail_cc(&mut self, cc: Option<ColumnSelector>) -> MergeResult<&mut Self> {
        self.config.mail.cc = SwitchedSelector::from_option(checked(cc)?);
        Ok(self)
    }

    pub fn set_mail_bcc(&mut self, bcc: Option<ColumnSelector>) -> MergeResult<&mut Self> {
        self.config.mail.bcc = SwitchedSelector::from_option(checked(bcc)?);
        Ok(self)
    }

    pub fn set_mail_send_as_attachment(&mut self, send_as_attachment: bool) -> &mut Self {
        self.config.mail.send_as_attachment = send_as_attachment;
        self
    }
}

/// Pass a selector through once its letter or number input is known good.
fn checked(selector: Option<ColumnSelector>) -> MergeResult<Option<ColumnSelector>> {
    if let Some(selector) = &selector {
        selector.validate()?;
    }
    Ok(selector)
}

/// Make sure every bookkeeping column exists on the header row and return the
/// resulting header map.
fn ensure_bookkeeping_columns<P>(
    platform: &mut P,
    sheet: &SheetRef,
    header_row: usize,
) -> MergeResult<HeaderMap>
where
    P: Spreadsheets + ?Sized,
{
    let grid = platform.read_display_values(sheet)?;
    let mut header: Vec<String> = grid.row(header_row).map(<[String]>::to_vec).unwrap_or_default();
    let mut last_column = grid.last_column();

    for name in BOOKKEEPING_HEADERS {
        let column = if let Some(index) = header.iter().position(|h| h == name) {
            index + 1
        } else {
            last_column += 1;
            platform.write_range(
                sheet,
                CellPos::new(header_row, last_column),
                vec![vec![CellValue::from(name)]],
            )?;
            header.resize(last_column, String::new());
            header[last_column - 1] = name.to_string();
            tracing::info!("Added column '{}' to {}", name, sheet);
            last_column
        };
        platform.highlight_header(sheet, CellPos::new(header_row, column))?;
    }

    Ok(HeaderMap::from_row(&header)?)
}
