use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::pipeline::processing::ColumnRoles;
use crate::types::{Change, Dataset, FixType};

/// Per-field verification counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStats {
    pub phone_verified: usize,
    pub phone_invalid: usize,
    pub email_verified: usize,
    pub email_invalid: usize,
    pub duplicates: usize,
}

/// Issue counts by category, used for run comparisons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBreakdown {
    pub invalid_emails: usize,
    pub invalid_phones: usize,
    pub missing_fields: usize,
    pub duplicates: usize,
    pub company_fixes: usize,
    pub domain_fixes: usize,
    pub job_title_fixes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFunctionSummary {
    pub job_function: String,
    pub job_titles: Vec<String>,
    pub count: usize,
}

/// Everything a cleaning pass learned about one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "issues_found")]
    pub total_issues: usize,
    /// Changes written into the working dataset during the pass
    #[serde(rename = "fixes_applied")]
    pub total_fixes: usize,
    pub quality_score: f64,
    pub rows_processed: usize,
    pub columns: Vec<String>,
    #[serde(default)]
    pub column_roles: ColumnRoles,
    pub changes: Vec<Change>,
    pub original_data: Vec<Value>,
    pub cleaned_data: Vec<Value>,
    pub total_changes: usize,
    pub auto_accepted_count: usize,
    pub needs_review_count: usize,
    pub duplicates_found: usize,
    pub verification_stats: VerificationStats,
    pub issue_breakdown: IssueBreakdown,
    pub job_function_summary: Vec<JobFunctionSummary>,
}

impl Report {
    pub fn changes_of(&self, fix_type: FixType) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.fix_type == fix_type)
    }
}

/// Group rows by their derived function. Titles are listed sorted and unique;
/// groups are ordered by size, largest first, ties in order of first appearance.
pub fn summarize_job_functions(
    dataset: &Dataset,
    job_column: &str,
    function_column: &str,
) -> Vec<JobFunctionSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<String>, usize)> = HashMap::new();

    for row in 0..dataset.len() {
        let function = dataset.get(row, function_column).unwrap_or("Other").to_string();
        let title = dataset.get(row, job_column).unwrap_or("Unknown").to_string();

        let entry = groups.entry(function.clone()).or_insert_with(|| {
            order.push(function);
            (Vec::new(), 0)
        });
        if !entry.0.contains(&title) {
            entry.0.push(title);
        }
        entry.1 += 1;
    }

    let mut summary: Vec<JobFunctionSummary> = order
        .into_iter()
        .filter_map(|function| {
            let (mut titles, count) = groups.remove(&function)?;
            titles.sort();
            Some(JobFunctionSummary {
                job_function: function,
                job_titles: titles,
                count,
            })
        })
        .collect();
    // stable: equal counts keep first-appearance order
    summary.sort_by(|a, b| b.count.cmp(&a.count));
    summary
}

/// How a finished pass is rendered for a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// The whole report as one document
    #[default]
    Document,
    /// One enriched object per cleaned row
    RowRecords,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "document" | "json" => Some(ReportFormat::Document),
            "rows" | "records" => Some(ReportFormat::RowRecords),
            _ => None,
        }
    }

    pub fn render(&self, dataset: &Dataset, report: &Report) -> serde_json::Result<Value> {
        match self {
            ReportFormat::Document => serde_json::to_value(report),
            ReportFormat::RowRecords => Ok(Value::Array(row_records(dataset, report))),
        }
    }
}

fn changed(change: &Change) -> bool {
    change.original_value.as_deref() != Some(change.cleaned_value.as_str())
}

fn verification(change: &Change) -> Option<&str> {
    change.extra_info.as_ref().and_then(|d| d.verification.as_deref())
}

/// Cleaned rows enriched with per-row email/phone status derived from the ledger
pub fn row_records(dataset: &Dataset, report: &Report) -> Vec<Value> {
    let mut by_row: HashMap<usize, Vec<&Change>> = HashMap::new();
    for change in &report.changes {
        by_row.entry(change.row_index).or_default().push(change);
    }

    let job_column = report.column_roles.job_title.as_deref();

    dataset
        .to_records()
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            let mut obj = match record {
                Value::Object(map) => map,
                _ => Map::new(),
            };

            if let Some(col) = job_column {
                if !obj.contains_key("job_title") {
                    let title = obj.get(col).cloned().unwrap_or(Value::Null);
                    obj.insert("job_title".to_string(), title);
                }
            }

            let mut email_status = "VALID";
            let mut email_fix = Value::Null;
            let mut email_confidence = 0.0;
            let mut phone_status = "VALID";
            let mut formatted_phone = Value::Null;

            for change in by_row.get(&idx).map(Vec::as_slice).unwrap_or(&[]) {
                match change.fix_type {
                    FixType::Email => {
                        email_status = "INVALID";
                        if changed(change) {
                            email_fix = Value::String(change.cleaned_value.clone());
                            email_confidence = change.confidence;
                            if change.applied {
                                email_status = "FIXED";
                            }
                        }
                    }
                    FixType::Phone => {
                        if verification(change) == Some("valid") {
                            formatted_phone = Value::String(change.cleaned_value.clone());
                        } else {
                            phone_status = "INVALID";
                            if changed(change) {
                                formatted_phone = Value::String(change.cleaned_value.clone());
                                if change.applied {
                                    phone_status = "FIXED";
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }

            obj.insert("row".to_string(), Value::from(idx + 1));
            obj.insert("email_status".to_string(), Value::from(email_status));
            obj.insert("email_fix".to_string(), email_fix);
            obj.insert("email_confidence".to_string(), Value::from(email_confidence));
            obj.insert("phone_status".to_string(), Value::from(phone_status));
            obj.insert("formatted_phone".to_string(), formatted_phone);
            Value::Object(obj)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeDiagnostics, ChangeStatus};

    fn titled_dataset() -> Dataset {
        let mut ds = Dataset::new(vec!["title".into(), "role_function".into()]);
        for (t, f) in [
            ("Senior Developer", "IT"),
            ("Founder", "Other"),
            ("Software Engineer", "Engineering"),
            ("Senior Developer", "IT"),
            ("Data Analyst", "IT"),
        ] {
            ds.push_row(vec![Some(t.into()), Some(f.into())]);
        }
        ds
    }

    #[test]
    fn job_summary_groups_and_sorts() {
        let summary = summarize_job_functions(&titled_dataset(), "title", "role_function");
        assert_eq!(summary[0].job_function, "IT");
        assert_eq!(summary[0].count, 3);
        assert_eq!(summary[0].job_titles, vec!["Data Analyst".to_string(), "Senior Developer".to_string()]);
        // ties keep first appearance
        assert_eq!(summary[1].job_function, "Other");
        assert_eq!(summary[2].job_function, "Engineering");
    }

    #[test]
    fn row_records_reflect_ledger() {
        let mut ds = Dataset::new(vec!["email".into(), "phone".into()]);
        ds.push_row(vec![Some("user@gmail.com".into()), Some("+14155551234".into())]);
        ds.push_row(vec![Some("bad".into()), Some("12".into())]);

        let phone_ok = Change::new(0, "phone", Some("4155551234"), "+14155551234".into(), 1.0, FixType::Phone, ChangeStatus::AutoAccepted)
            .with_diagnostics(ChangeDiagnostics {
                verification: Some("valid".into()),
                ..Default::default()
            });
        let email_fixed = Change::new(0, "email", Some("user@gmial.com"), "user@gmail.com".into(), 0.8, FixType::Email, ChangeStatus::AutoAccepted);
        let phone_bad = Change::new(1, "phone", Some("12"), "12".into(), 0.1, FixType::Phone, ChangeStatus::NeedsReview)
            .with_diagnostics(ChangeDiagnostics {
                verification: Some("invalid".into()),
                ..Default::default()
            });
        let email_bad = Change::new(1, "email", Some("bad"), "bad".into(), 0.2, FixType::Email, ChangeStatus::NeedsReview);

        let report = Report {
            changes: vec![phone_ok, email_fixed, phone_bad, email_bad],
            ..Default::default()
        };

        let rows = row_records(&ds, &report);
        assert_eq!(rows[0]["row"], 1);
        assert_eq!(rows[0]["email_status"], "FIXED");
        assert_eq!(rows[0]["email_fix"], "user@gmail.com");
        assert_eq!(rows[0]["formatted_phone"], "+14155551234");
        assert_eq!(rows[0]["phone_status"], "VALID");

        assert_eq!(rows[1]["email_status"], "INVALID");
        assert_eq!(rows[1]["email_fix"], Value::Null);
        assert_eq!(rows[1]["phone_status"], "INVALID");
    }

    #[test]
    fn format_names() {
        assert_eq!(ReportFormat::parse("rows"), Some(ReportFormat::RowRecords));
        assert_eq!(ReportFormat::parse("Document"), Some(ReportFormat::Document));
        assert_eq!(ReportFormat::parse("xml"), None);
    }
}
