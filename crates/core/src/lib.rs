//! # rowmerge-core
//!
//! Row-driven document and mail merge engine.
//!
//! This crate provides:
//! - Column selectors and row filters evaluated against a sheet snapshot
//! - Tag extraction and template merging for flow and tabular documents
//! - A configuration builder with readiness checks
//! - The merge run loop with per-row status write-back
//! - Collaborator traits for the hosting platform, plus an in-memory platform
//!
//! # Examples
//!
//! ```
//! use rowmerge_core::memory::{Element, MemoryWorkspace};
//! use rowmerge_core::{run_merge, ColumnSelector, MergeConfigBuilder, SheetRef};
//! use rowmerge_sheet::CellValue;
//!
//! let mut ws = MemoryWorkspace::new("me@example.com");
//! let data = ws.create_folder("Data");
//! let out = ws.create_folder("Out");
//! let book = ws.create_spreadsheet(
//!     &data,
//!     "People",
//!     [("Sheet1", vec![
//!         vec![CellValue::from("Name")],
//!         vec![CellValue::from("Alice")],
//!     ])],
//! );
//! let letter = ws.create_document(&data, "Letter", Element::from_text("Dear {{Name}}"));
//!
//! let mut builder = MergeConfigBuilder::new();
//! builder.set_data_source(&mut ws, SheetRef::new(book.id.clone(), "Sheet1")).unwrap();
//! builder
//!     .enable_doc_merge(true)
//!     .set_doc_output_folder(out.clone())
//!     .set_doc_title(Some(ColumnSelector::ByHeader("Name".into())))
//!     .unwrap();
//! builder.set_doc_template(&mut ws, &letter).unwrap();
//!
//! let report = run_merge(&mut ws, &builder.build().unwrap()).unwrap();
//! let merged = report.documents()[0];
//! assert_eq!(merged.name, "Alice");
//! assert_eq!(ws.document_text(&merged.id).unwrap(), "Dear Alice");
//! ```

/// Merge configuration and readiness.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Row filters.
pub mod filter;
/// Locator parsing.
pub mod locator;
/// In-memory platform.
pub mod memory;
/// Merge runs.
pub mod orchestrator;
/// Collaborator traits.
pub mod platform;
/// Column selectors.
pub mod selector;
/// Tag extraction.
pub mod tags;
/// Template merging.
pub mod template;
/// Status timestamps.
pub mod timestamp;

/// Re-export configuration types.
pub use config::{
    ConfigState, DataSource, DocMergeSettings, MailMergeSettings, MailTemplate, MergeConfig,
    MergeConfigBuilder, BOOKKEEPING_HEADERS, DOCUMENT_URL_HEADER, EMAIL_TRACKING_STATUS_HEADER,
    MERGE_ID_HEADER, MERGE_STATUS_HEADER,
};
/// Re-export core error types.
pub use error::{MergeError, MergeResult};
/// Re-export filter types.
pub use filter::{FilterOperator, RowFilter};
/// Re-export run entry points.
pub use orchestrator::{run_merge, run_merge_with_clock, MergeReport, RowOutcome};
/// Re-export platform types.
pub use platform::{
    sender_addresses, Artifact, ArtifactId, ArtifactKind, FolderId, OutgoingMail, Platform,
    SheetRef,
};
/// Re-export selector types.
pub use selector::{ColumnSelector, SelectorKind, SwitchedSelector};
/// Re-export template types.
pub use template::Template;
/// Re-export clock types.
pub use timestamp::{Clock, FixedClock, SystemClock};
