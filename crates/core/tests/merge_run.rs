//! Merge run tests against the in-memory workspace.

#[path = "_common.rs"]
mod common;
use common::*;

use rowmerge_core::memory::Element;
use rowmerge_core::{
    run_merge_with_clock, ArtifactKind, ColumnSelector, FilterOperator, MergeConfigBuilder,
    MergeError, RowFilter, RowOutcome, SheetRef,
};
use rowmerge_sheet::CellValue;

fn by_header(name: &str) -> Option<ColumnSelector> {
    Some(ColumnSelector::ByHeader(name.to_string()))
}

fn doc_builder(f: &mut Fixture, text: &str) -> MergeConfigBuilder {
    let url = letter(f, text);
    let mut b = builder(f);
    b.enable_doc_merge(true)
        .set_doc_output_folder(f.out.clone())
        .set_doc_title(by_header("Name"))
        .expect("title");
    b.set_doc_template_by_locator(&mut f.ws, &url)
        .expect("template");
    b
}

fn mail_builder(f: &mut Fixture, text: &str) -> MergeConfigBuilder {
    let url = letter(f, text);
    let mut b = builder(f);
    b.enable_mail_merge(true)
        .set_mail_subject(Some(ColumnSelector::Specify("Hello".into())))
        .and_then(|b| b.set_mail_recipients(by_header("Email")))
        .expect("selectors");
    b.set_mail_sender(USER).expect("sender");
    b.set_mail_template_by_locator(&mut f.ws, &url)
        .expect("template");
    b
}

#[test]
fn test_single_row_document_merge_and_rerun() {
    let mut f = fixture(&[&["Name"], &["Alice"]]);
    let config = doc_builder(&mut f, "Dear {{Name}},").build().expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");
    assert_eq!(report.completed(), 1);

    let merged = f.ws.files_in(&f.out);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].artifact.name, "Alice");
    assert_eq!(
        f.ws.document_text(&merged[0].artifact.id).as_deref(),
        Some("Dear Alice,")
    );
    assert_eq!(cell(&f, 2, "G Merge Status"), PROCESSED);
    assert_eq!(cell(&f, 2, "Document URL"), merged[0].artifact.url);

    let rerun = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("rerun");
    assert_eq!(rerun.completed(), 0);
    assert_eq!(rerun.rows, vec![RowOutcome::Skipped { row: 2 }]);
    assert_eq!(f.ws.files_in(&f.out).len(), 1);
}

#[test]
fn test_every_row_is_marked_and_flushed() {
    let mut f = people();
    let config = doc_builder(&mut f, "Hi {{Name}} from {{Country}}")
        .build()
        .expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    assert_eq!(report.completed(), 3);
    assert_eq!(f.ws.flush_count(), 3);
    for row in 2..=4 {
        assert_eq!(cell(&f, row, "G Merge Status"), PROCESSED);
    }
    let texts: Vec<String> = report
        .documents()
        .iter()
        .map(|doc| f.ws.document_text(&doc.id).expect("text"))
        .collect();
    assert_eq!(
        texts,
        vec!["Hi Alice from NZ", "Hi Bob from AU", "Hi Carol from NZ"]
    );
}

#[test]
fn test_filtered_rows_are_untouched() {
    let mut f = people();
    let mut b = doc_builder(&mut f, "{{Name}}");
    b.add_row_filter(RowFilter::new(
        ColumnSelector::ByHeader("Country".into()),
        FilterOperator::Equal,
        "NZ",
    ));
    let config = b.build().expect("ready");
    let writes_before = f.ws.range_writes(&f.sheet);

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    assert_eq!(report.completed(), 2);
    assert_eq!(report.rows[1], RowOutcome::Skipped { row: 3 });
    assert_eq!(cell(&f, 3, "G Merge Status"), "");
    assert_eq!(cell(&f, 3, "Document URL"), "");
    // status + url for two rows
    assert_eq!(f.ws.range_writes(&f.sheet) - writes_before, 4);
}

#[test]
fn test_no_filters_visits_done_rows_again() {
    let mut f = fixture(&[&["Name"], &["Alice"]]);
    let mut b = doc_builder(&mut f, "{{Name}}");
    b.clear_row_filters();
    let config = b.build().expect("ready");

    run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");
    run_merge_with_clock(&mut f.ws, &config, &clock()).expect("rerun");

    assert_eq!(f.ws.files_in(&f.out).len(), 2);
}

#[test]
fn test_rows_are_judged_against_one_snapshot() {
    let mut f = fixture(&[
        &["Name", "Document URL"],
        &["Alice", ""],
        &["Bob", "https://files.example.com/bob"],
        &["Carol", ""],
    ]);
    let mut b = doc_builder(&mut f, "{{Name}}");
    b.add_row_filter(RowFilter::new(
        ColumnSelector::ByHeader("Document URL".into()),
        FilterOperator::IsEmpty,
        "",
    ));
    let config = b.build().expect("ready");
    let reads_before = f.ws.display_reads();

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    // one read for the whole run, even though row 2 gains a URL before row 4
    assert_eq!(f.ws.display_reads() - reads_before, 1);
    assert_eq!(report.completed(), 2);
    assert_eq!(report.rows[1], RowOutcome::Skipped { row: 3 });
    assert_eq!(report.rows[2].row(), 4);
    assert_ne!(cell(&f, 2, "Document URL"), "");
    assert_eq!(cell(&f, 3, "Document URL"), "https://files.example.com/bob");
    assert_eq!(cell(&f, 3, "G Merge Status"), "");
    assert_eq!(cell(&f, 4, "G Merge Status"), PROCESSED);
}

#[test]
fn test_unknown_title_column_leaves_no_copy() {
    let mut f = fixture(&[&["Name"], &["Alice"]]);
    let mut b = doc_builder(&mut f, "{{Name}}");
    b.set_doc_title(by_header("Surname")).expect("title");
    let config = b.build().expect("ready");

    let err = run_merge_with_clock(&mut f.ws, &config, &clock()).unwrap_err();

    assert!(matches!(err, MergeError::Sheet(_)));
    assert!(f.ws.files_in(&f.out).is_empty());
    assert_eq!(cell(&f, 2, "G Merge Status"), "");
}

#[test]
fn test_not_ready_fails_before_any_row() {
    let mut f = people();
    let mut b = builder(&mut f);
    b.enable_doc_merge(true).enable_mail_merge(true);
    let writes_before = f.ws.range_writes(&f.sheet);

    let err = run_merge_with_clock(&mut f.ws, &b.snapshot(), &clock()).unwrap_err();

    match err {
        MergeError::NotReady { missing } => assert_eq!(missing.len(), 7),
        other => panic!("expected NotReady, got {other:?}"),
    }
    assert_eq!(f.ws.range_writes(&f.sheet), writes_before);
    assert_eq!(f.ws.flush_count(), 0);
}

#[test]
fn test_tabular_template_writes_each_sheet_once() {
    let mut f = people();
    let invoice = f.ws.create_spreadsheet(
        &f.templates,
        "Invoice",
        [
            (
                "Invoice",
                vec![
                    row(&["To: {{Name}}", "{{Email}}"]),
                    row(&["Country: {{Country}}", "Total"]),
                    vec![CellValue::Int(42), CellValue::from("{{Unknown}}")],
                ],
            ),
            ("Notes", vec![row(&["no tags here"])]),
        ],
    );
    let mut b = builder(&mut f);
    b.enable_doc_merge(true)
        .set_doc_output_folder(f.out.clone())
        .set_doc_title(by_header("Email"))
        .expect("title");
    b.set_doc_template(&mut f.ws, &invoice).expect("template");
    let config = b.build().expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    let first = report.documents()[0];
    assert_eq!(first.kind, ArtifactKind::TabularDocument);
    assert_eq!(first.name, "alice@example.com");
    let sheet = SheetRef::new(first.id.clone(), "Invoice");
    assert_eq!(f.ws.range_writes(&sheet), 1);
    assert_eq!(f.ws.range_writes(&SheetRef::new(first.id.clone(), "Notes")), 0);
    assert_eq!(
        f.ws.sheet_values(&sheet).expect("sheet"),
        &vec![
            row(&["To: Alice", "alice@example.com"]),
            row(&["Country: NZ", "Total"]),
            vec![CellValue::Int(42), CellValue::from("{{Unknown}}")],
        ]
    );
}

#[test]
fn test_flow_document_pdf_replaces_intermediate() {
    let mut f = fixture(&[&["Name"], &["Alice"]]);
    let mut b = doc_builder(&mut f, "Certificate for {{Name}}");
    b.set_doc_as_pdf(true);
    let config = b.build().expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    let files = f.ws.files_in(&f.out);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].artifact.kind, ArtifactKind::Pdf);
    assert_eq!(files[0].artifact.name, "Alice");
    assert_eq!(report.documents()[0], &files[0].artifact);
    assert_eq!(cell(&f, 2, "Document URL"), files[0].artifact.url);
    assert_eq!(
        f.ws.document_text(&files[0].artifact.id).as_deref(),
        Some("Certificate for Alice")
    );
}

#[test]
fn test_tabular_pdf_is_rendered_next_to_copy() {
    let mut f = fixture(&[&["Name"], &["Alice"]]);
    let book = f
        .ws
        .create_spreadsheet(&f.templates, "Card", [("Card", vec![row(&["{{Name}}"])])]);
    let mut b = builder(&mut f);
    b.enable_doc_merge(true)
        .set_doc_output_folder(f.out.clone())
        .set_doc_as_pdf(true)
        .set_doc_title(by_header("Name"))
        .expect("title");
    b.set_doc_template(&mut f.ws, &book).expect("template");
    let config = b.build().expect("ready");

    run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    let files = f.ws.files_in(&f.out);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].artifact.kind, ArtifactKind::Pdf);
    assert!(f
        .ws
        .document_text(&files[0].artifact.id)
        .expect("pdf")
        .contains("Alice"));
}

#[test]
fn test_documents_are_shared_with_row_address() {
    let mut f = people();
    let mut b = doc_builder(&mut f, "{{Name}}");
    b.set_doc_shared_to(by_header("Email")).expect("shared to");
    let config = b.build().expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    let doc = report.documents()[1];
    assert_eq!(
        f.ws.file(&doc.id).expect("file").shared_with,
        vec!["bob@example.com".to_string()]
    );
}

#[test]
fn test_mail_merge_renders_body_and_discards_rendering() {
    let mut f = people();
    let config = mail_builder(&mut f, "Hello {{Name}},\nSee you in {{Country}}.")
        .build()
        .expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    assert_eq!(report.mails_sent(), 3);
    let outbox = f.ws.outbox();
    assert_eq!(outbox[0].to, "alice@example.com");
    assert_eq!(outbox[0].subject, "Hello");
    assert_eq!(outbox[0].body, "Hello Alice,\nSee you in NZ.");
    assert_eq!(outbox[0].from, USER);
    assert_eq!(outbox[0].cc, None);
    assert_eq!(outbox[0].bcc, None);
    assert!(outbox[0].attachments.is_empty());
    // only the template itself is left in its folder
    assert_eq!(f.ws.files_in(&f.templates).len(), 1);
    assert_eq!(cell(&f, 2, "Document URL"), "");
    assert_eq!(cell(&f, 2, "G Merge Status"), PROCESSED);
}

#[test]
fn test_mail_carries_cc_bcc_and_attachment() {
    let mut f = people();
    let doc_url = letter(&mut f, "Invoice for {{Name}}");
    let mut b = mail_builder(&mut f, "Hi {{Name}}");
    b.enable_doc_merge(true)
        .set_doc_output_folder(f.out.clone())
        .set_doc_title(by_header("Name"))
        .and_then(|b| b.set_mail_cc(Some(ColumnSelector::Specify("accounts@example.com".into()))))
        .and_then(|b| b.set_mail_bcc(Some(ColumnSelector::ByLetter("B".into()))))
        .and_then(|b| b.set_mail_subject(Some(ColumnSelector::ByHeader("Country".into()))))
        .expect("selectors");
    b.set_doc_template_by_locator(&mut f.ws, &doc_url)
        .expect("template");
    let config = b.build().expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    let mail = &f.ws.outbox()[2];
    assert_eq!(mail.subject, "NZ");
    assert_eq!(mail.cc.as_deref(), Some("accounts@example.com"));
    assert_eq!(mail.bcc.as_deref(), Some("carol@example.com"));
    assert_eq!(mail.attachments, vec![report.documents()[2].clone()]);
}

#[test]
fn test_mail_without_attachment_flag() {
    let mut f = people();
    let doc_url = letter(&mut f, "Invoice for {{Name}}");
    let mut b = mail_builder(&mut f, "Hi {{Name}}");
    b.enable_doc_merge(true)
        .set_doc_output_folder(f.out.clone())
        .set_mail_send_as_attachment(false)
        .set_doc_title(by_header("Name"))
        .expect("title");
    b.set_doc_template_by_locator(&mut f.ws, &doc_url)
        .expect("template");
    let config = b.build().expect("ready");

    run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    assert!(f.ws.outbox().iter().all(|mail| mail.attachments.is_empty()));
    assert_eq!(f.ws.files_in(&f.out).len(), 3);
}

#[test]
fn test_row_failure_keeps_earlier_rows_marked() {
    let mut f = people();
    f.ws.reject_mail_to("bob@example.com");
    let config = mail_builder(&mut f, "Hi {{Name}}").build().expect("ready");

    let err = run_merge_with_clock(&mut f.ws, &config, &clock()).unwrap_err();
    assert!(matches!(err, MergeError::Collaborator { .. }));

    assert_eq!(cell(&f, 2, "G Merge Status"), PROCESSED);
    assert_eq!(cell(&f, 3, "G Merge Status"), "");
    assert_eq!(cell(&f, 4, "G Merge Status"), "");
    assert_eq!(f.ws.flush_count(), 1);
    assert_eq!(f.ws.outbox().len(), 1);

    // A rerun starts again at the failed row.
    run_merge_with_clock(&mut f.ws, &config, &clock()).unwrap_err();
    assert_eq!(f.ws.outbox().len(), 1);
}

#[test]
fn test_header_row_below_title_rows() {
    let mut f = fixture(&[
        &["Quarterly letters", ""],
        &["Name", "Email"],
        &["Alice", "alice@example.com"],
    ]);
    let url = letter(&mut f, "{{Name}}");
    let mut b = MergeConfigBuilder::new();
    b.set_data_source_at(&mut f.ws, f.sheet.clone(), 2)
        .expect("data source");
    b.enable_doc_merge(true)
        .set_doc_output_folder(f.out.clone())
        .set_doc_title(by_header("Name"))
        .expect("title");
    b.set_doc_template_by_locator(&mut f.ws, &url)
        .expect("template");
    let config = b.build().expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].row(), 3);
    let values = f.ws.sheet_values(&f.sheet).expect("sheet");
    assert_eq!(values[2][2], CellValue::from(PROCESSED));
}

#[test]
fn test_split_tag_is_left_in_place() {
    let mut f = fixture(&[&["Name"], &["Alice"]]);
    let template = f.ws.create_document(
        &f.templates,
        "Split",
        Element::Body(vec![Element::paragraph(["Dear {{Na", "me}} and {{Name}}"])]),
    );
    let mut b = builder(&mut f);
    b.enable_doc_merge(true)
        .set_doc_output_folder(f.out.clone())
        .set_doc_title(by_header("Name"))
        .expect("title");
    b.set_doc_template(&mut f.ws, &template).expect("template");
    let config = b.build().expect("ready");

    let report = run_merge_with_clock(&mut f.ws, &config, &clock()).expect("run");

    assert_eq!(
        f.ws.document_text(&report.documents()[0].id).as_deref(),
        Some("Dear {{Name}} and Alice")
    );
}
