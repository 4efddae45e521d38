use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::pipeline::report::{IssueBreakdown, Report, VerificationStats};

/// An ordered table of string cells. Row identity is the positional index
/// assigned at decode time and is never changed afterwards: rows are only
/// ever appended during decode, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with empty cells and dropping
    /// surplus cells so every row matches the header width.
    pub fn push_row(&mut self, mut cells: Vec<Option<String>>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Cell value by column name; `None` for an empty cell or unknown column.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Write a cell, adding the column when it does not exist yet.
    /// Returns false when the row index is out of range.
    pub fn set(&mut self, row: usize, column: &str, value: Option<String>) -> bool {
        if row >= self.rows.len() {
            return false;
        }
        let col = self.ensure_column(column);
        self.rows[row][col] = value;
        true
    }

    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }

    /// Row-oriented snapshot, one JSON object per row with nulls for empty cells.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (name, cell) in self.columns.iter().zip(row) {
                    let v = match cell {
                        Some(s) => Value::String(s.clone()),
                        None => Value::Null,
                    };
                    obj.insert(name.clone(), v);
                }
                Value::Object(obj)
            })
            .collect()
    }
}

/// Which corrector produced a change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    Company,
    Domain,
    Phone,
    Email,
    JobTitle,
    Duplicate,
}

impl FixType {
    pub const ALL: [FixType; 6] = [
        FixType::Company,
        FixType::Domain,
        FixType::Phone,
        FixType::Email,
        FixType::JobTitle,
        FixType::Duplicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FixType::Company => "company",
            FixType::Domain => "domain",
            FixType::Phone => "phone",
            FixType::Email => "email",
            FixType::JobTitle => "job_title",
            FixType::Duplicate => "duplicate",
        }
    }

    pub fn parse(s: &str) -> Option<FixType> {
        match s.trim().to_lowercase().as_str() {
            "company" | "unify" => Some(FixType::Company),
            "domain" | "fake_domain" => Some(FixType::Domain),
            "phone" => Some(FixType::Phone),
            "email" => Some(FixType::Email),
            "job_title" | "job_normalization" => Some(FixType::JobTitle),
            "duplicate" => Some(FixType::Duplicate),
            _ => None,
        }
    }
}

impl fmt::Display for FixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a change in the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    AutoAccepted,
    NeedsReview,
    Accepted,
    Overridden,
    Rejected,
    Pending,
}

impl ChangeStatus {
    /// Only these states accept a reviewer decision
    pub fn is_reviewable(&self) -> bool {
        matches!(self, ChangeStatus::NeedsReview | ChangeStatus::Pending)
    }

    /// A decision may still change the outcome: open review states, plus
    /// auto-accepted changes a reviewer may revert
    pub fn accepts_decision(&self) -> bool {
        matches!(
            self,
            ChangeStatus::NeedsReview | ChangeStatus::Pending | ChangeStatus::AutoAccepted
        )
    }

    /// Whether the suggested (or override) value ends up in the data
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            ChangeStatus::AutoAccepted | ChangeStatus::Accepted | ChangeStatus::Overridden
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::AutoAccepted => "auto_accepted",
            ChangeStatus::NeedsReview => "needs_review",
            ChangeStatus::Accepted => "accepted",
            ChangeStatus::Overridden => "overridden",
            ChangeStatus::Rejected => "rejected",
            ChangeStatus::Pending => "pending",
        }
    }
}

/// Diagnostics attached to a change by the verifier that produced it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChangeDiagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_applied: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_based_on: Vec<String>,
}

/// One proposed field-level fix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Change {
    pub id: String,
    pub row_index: usize,
    pub column: String,
    pub original_value: Option<String>,
    pub cleaned_value: String,
    pub confidence: f64,
    pub fix_type: FixType,
    pub status: ChangeStatus,
    pub applied: bool,
    pub timestamp: DateTime<Utc>,
    pub manual_override: Option<String>,
    pub override_reason: Option<String>,
    pub modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<ChangeDiagnostics>,
}

impl Change {
    pub fn new(
        row_index: usize,
        column: &str,
        original_value: Option<&str>,
        cleaned_value: String,
        confidence: f64,
        fix_type: FixType,
        status: ChangeStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            row_index,
            column: column.to_string(),
            original_value: original_value.map(str::to_string),
            cleaned_value,
            confidence,
            fix_type,
            applied: status == ChangeStatus::AutoAccepted,
            status,
            timestamp: Utc::now(),
            manual_override: None,
            override_reason: None,
            modified_by: None,
            extra_info: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: ChangeDiagnostics) -> Self {
        self.extra_info = Some(diagnostics);
        self
    }

    /// Duplicate flags address the whole row and never touch a cell
    pub fn is_row_level(&self) -> bool {
        self.fix_type == FixType::Duplicate
    }
}

/// A reviewer's verdict on one change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Accept,
    Override,
    Reject,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Accept => "accept",
            ReviewAction::Override => "override",
            ReviewAction::Reject => "reject",
        }
    }
}

/// Entry of the externally supplied decision list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewDecision {
    pub change_id: String,
    pub action: ReviewAction,
    #[serde(default)]
    pub override_value: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, alias = "modified_by")]
    pub actor: Option<String>,
}

impl ReviewDecision {
    pub fn accept(change_id: &str) -> Self {
        Self {
            change_id: change_id.to_string(),
            action: ReviewAction::Accept,
            override_value: None,
            reason: None,
            actor: None,
        }
    }

    pub fn reject(change_id: &str) -> Self {
        Self {
            action: ReviewAction::Reject,
            ..Self::accept(change_id)
        }
    }

    pub fn override_with(change_id: &str, value: &str) -> Self {
        Self {
            action: ReviewAction::Override,
            override_value: Some(value.to_string()),
            ..Self::accept(change_id)
        }
    }
}

/// What the audit trail records as having happened to a change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoggedAction {
    Accept,
    Override,
    Reject,
    AutoAccept,
}

impl From<ReviewAction> for LoggedAction {
    fn from(action: ReviewAction) -> Self {
        match action {
            ReviewAction::Accept => LoggedAction::Accept,
            ReviewAction::Override => LoggedAction::Override,
            ReviewAction::Reject => LoggedAction::Reject,
        }
    }
}

/// Write-once audit record for one reviewed change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeLogEntry {
    pub change_id: String,
    pub row_index: usize,
    pub column: String,
    pub original_value: Option<String>,
    pub suggested_value: String,
    pub final_value: Option<String>,
    pub action: LoggedAction,
    pub reason: Option<String>,
    pub modified_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Auto,
    Review,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    PendingReview,
    Failed,
}

/// Execution record binding a report to a project and its stored artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub project: String,
    pub run_number: u32,
    pub file_name: String,
    pub file_size: u64,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub quality_score: f64,
    pub total_issues: usize,
    pub total_fixes: usize,
    pub issue_breakdown: IssueBreakdown,
    pub total_changes: usize,
    pub auto_accepted_count: usize,
    pub needs_review_count: usize,
    pub manual_overrides: usize,
    pub mode: RunMode,
    pub status: RunStatus,
    pub original_ref: String,
    pub cleaned_ref: Option<String>,
    pub changelog_ref: Option<String>,
    pub report: Report,
    pub verification_stats: VerificationStats,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub run_by: Option<String>,
    pub notes: Option<String>,
}
