use dq_pipeline::constants::ROLE_FUNCTION_COLUMN;
use dq_pipeline::dataset::read_csv;
use dq_pipeline::pipeline::processing::correctors::suggest_company_fix;
use dq_pipeline::pipeline::processing::email::fix_email;
use dq_pipeline::pipeline::processing::phone::validate_phone;
use dq_pipeline::pipeline::processing::scorer::quality_score;
use dq_pipeline::pipeline::ReportFormat;
use dq_pipeline::{run_pipeline, ChangeStatus, FixType, InputError};

const CONTACTS: &[u8] = b"company,email,phone,job_title\n\
acme corp,ann@acme.com,+14155551234,cto\n\
acme corp,ann@acme.com,+14155551234,cto\n\
Initech,bob@initech,+14155550000,sales manager\n";

#[test]
fn us_phone_is_formatted_as_e164() {
    let check = validate_phone(Some("4155551234"), "US");
    assert!(check.valid);
    assert_eq!(check.formatted.as_deref(), Some("+14155551234"));
    assert_eq!(check.confidence, 1.0);
}

#[test]
fn provider_typo_is_repaired() {
    let fix = fix_email(Some("user@gmial.com"), None);
    assert_eq!(fix.email, "user@gmail.com");
    assert_eq!(fix.confidence, 0.8);
}

#[test]
fn misspelled_company_hits_dictionary() {
    assert_eq!(suggest_company_fix("gogle"), ("Google".to_string(), 1.0));
}

#[test]
fn score_edges() {
    assert_eq!(quality_score(0, 5), 100.0);
    assert_eq!(quality_score(10, 0), 100.0);
    assert_eq!(quality_score(10, 25), 0.0);
    assert_eq!(quality_score(3, 1), 66.67);
}

#[test]
fn identical_contact_rows_are_flagged_for_review() {
    let outcome = run_pipeline(read_csv(CONTACTS).unwrap(), true, false).unwrap();
    let duplicates: Vec<_> = outcome.report.changes_of(FixType::Duplicate).collect();

    assert_eq!(duplicates.len(), 2);
    assert_eq!(duplicates[0].row_index, 0);
    assert_eq!(duplicates[1].row_index, 1);
    for change in duplicates {
        assert_eq!(change.status, ChangeStatus::NeedsReview);
        assert_eq!(change.confidence, 1.0);
        assert!(!change.applied);
    }
}

#[test]
fn rows_are_never_added_or_dropped() {
    let input = read_csv(CONTACTS).unwrap();
    let outcome = run_pipeline(input.clone(), true, false).unwrap();

    assert_eq!(outcome.dataset.len(), input.len());
    assert_eq!(outcome.report.rows_processed, 3);
    assert_eq!(outcome.report.original_data.len(), 3);
    assert_eq!(outcome.report.cleaned_data.len(), 3);
    assert!(outcome.dataset.column_index(ROLE_FUNCTION_COLUMN).is_some());
}

#[test]
fn malformed_email_counts_as_issue() {
    let report = run_pipeline(read_csv(CONTACTS).unwrap(), false, false).unwrap().report;
    let emails: Vec<_> = report.changes_of(FixType::Email).collect();

    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].row_index, 2);
    assert_eq!(emails[0].original_value.as_deref(), Some("bob@initech"));
    assert_eq!(report.issue_breakdown.invalid_emails, 1);
}

#[test]
fn second_pass_over_cleaned_output_is_stable() {
    let first = run_pipeline(read_csv(CONTACTS).unwrap(), true, false).unwrap();
    let second = run_pipeline(first.dataset.clone(), true, false).unwrap();

    for row in 0..first.dataset.len() {
        for col in first.dataset.columns() {
            assert_eq!(second.dataset.get(row, col), first.dataset.get(row, col), "row {} column {}", row, col);
        }
    }
    assert!(second
        .report
        .changes
        .iter()
        .filter(|c| c.fix_type != FixType::Duplicate)
        .all(|c| c.status != ChangeStatus::AutoAccepted));
}

#[test]
fn row_records_carry_status_columns() {
    let outcome = run_pipeline(read_csv(CONTACTS).unwrap(), false, false).unwrap();
    let rendered = ReportFormat::RowRecords.render(&outcome.dataset, &outcome.report).unwrap();
    let rows = rendered.as_array().unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["row"], 1);
    assert_eq!(rows[2]["email_status"], "INVALID");
}

#[test]
fn header_only_file_is_rejected() {
    assert_eq!(read_csv(b"company,email\n").unwrap_err(), InputError::Empty);
    let doc = InputError::Empty.to_document();
    assert_eq!(doc["error"], "CSV file is empty");
}
