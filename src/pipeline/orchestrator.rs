use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::{ColumnKeywords, Config, PipelineConfig};
use crate::constants::{DUPLICATE_ORIGINAL_VALUE, DUPLICATE_SUGGESTED_VALUE, ROLE_FUNCTION_COLUMN, ROW_COLUMN};
use crate::dataset::read_csv;
use crate::error::InputError;
use crate::observability::metrics;
use crate::pipeline::processing::correctors::{
    fix_invalid_email, standardize_job_title, suggest_company_fix, suggest_domain_fix,
};
use crate::pipeline::processing::duplicates::{dedup_key, find_duplicate_rows};
use crate::pipeline::processing::email::{fix_email, validate_email, DeliverabilityCheck};
use crate::pipeline::processing::job_mapper::{map_job_title, UNKNOWN_FUNCTION};
use crate::pipeline::processing::phone::validate_phone;
use crate::pipeline::processing::scorer::quality_score;
use crate::pipeline::processing::validators::is_missing;
use crate::pipeline::processing::{resolve_roles, AutoApplyPolicy, ColumnRoles, FixKind};
use crate::pipeline::report::{summarize_job_functions, IssueBreakdown, Report, VerificationStats};
use crate::types::{Change, ChangeDiagnostics, ChangeStatus, Dataset};

/// Per-run switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Write high-confidence suggestions into the working dataset
    pub auto_apply: bool,
    /// Ask the deliverability service about well-formed emails
    pub verify_emails_api: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub dataset: Dataset,
    pub report: Report,
}

/// Single-pass cleaner. Holds no per-run state, so one instance can serve
/// any number of independent runs.
#[derive(Clone)]
pub struct Orchestrator {
    policy: AutoApplyPolicy,
    default_region: String,
    keywords: ColumnKeywords,
    deliverability: Option<Arc<dyn DeliverabilityCheck>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(&PipelineConfig::default(), ColumnKeywords::default())
    }
}

impl Orchestrator {
    pub fn new(pipeline: &PipelineConfig, keywords: ColumnKeywords) -> Self {
        Self {
            policy: AutoApplyPolicy::new(pipeline.confidence_threshold),
            default_region: pipeline.default_region.clone(),
            keywords,
            deliverability: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.pipeline, config.columns.clone())
    }

    pub fn with_deliverability_check(mut self, checker: Arc<dyn DeliverabilityCheck>) -> Self {
        self.deliverability = Some(checker);
        self
    }

    pub fn policy(&self) -> AutoApplyPolicy {
        self.policy
    }

    /// Decode CSV bytes and clean them
    pub fn run_bytes(&self, bytes: &[u8], options: RunOptions) -> Result<PipelineOutcome, InputError> {
        let dataset = read_csv(bytes)?;
        self.run(dataset, options)
    }

    #[instrument(skip_all, fields(rows = dataset.len(), auto_apply = options.auto_apply, verify_emails_api = options.verify_emails_api))]
    pub fn run(&self, dataset: Dataset, options: RunOptions) -> Result<PipelineOutcome, InputError> {
        if dataset.is_empty() {
            return Err(InputError::Empty);
        }

        let api: Option<&dyn DeliverabilityCheck> = if options.verify_emails_api {
            if self.deliverability.is_none() {
                warn!("Email API verification requested but no deliverability client is configured, using format rules");
            }
            self.deliverability.as_deref()
        } else {
            None
        };

        let original = dataset.clone();
        let original_columns: Vec<String> = dataset.columns().to_vec();
        let roles = resolve_roles(&original_columns, &self.keywords);
        debug!(?roles, "Resolved column roles");

        let mut pass = Pass {
            policy: self.policy,
            auto_apply: options.auto_apply,
            region: &self.default_region,
            api,
            roles: &roles,
            dataset,
            tally: Tally::default(),
        };

        for row in 0..original.len() {
            pass.clean_row(row);
        }

        let mut tally = pass.tally;
        let dataset = pass.dataset;

        // Missing cells are counted over the input columns only
        for row in original.rows() {
            tally.breakdown.missing_fields += row.iter().filter(|c| is_missing(c.as_deref())).count();
        }
        tally.issues += tally.breakdown.missing_fields;

        if let Some(key) = dedup_key(&roles) {
            let flagged = find_duplicate_rows(&dataset, &key);
            for row in &flagged {
                let change = Change::new(
                    *row,
                    ROW_COLUMN,
                    Some(DUPLICATE_ORIGINAL_VALUE),
                    DUPLICATE_SUGGESTED_VALUE.to_string(),
                    1.0,
                    FixKind::Duplicate.fix_type(),
                    self.policy.decide(FixKind::Duplicate, 1.0, options.auto_apply),
                )
                .with_diagnostics(ChangeDiagnostics {
                    duplicate_based_on: key.clone(),
                    ..Default::default()
                });
                tally.changes.push(change);
            }
            tally.stats.duplicates = flagged.len();
            tally.breakdown.duplicates = flagged.len();
            tally.issues += flagged.len();
        } else {
            debug!("No email, phone, company or name column; skipping duplicate detection");
        }

        let job_function_summary = match &roles.job_title {
            Some(col) => summarize_job_functions(&dataset, col, ROLE_FUNCTION_COLUMN),
            None => Vec::new(),
        };

        // input columns only; the derived role column is not scored
        let total_cells = original.len() * original_columns.len();
        let score = quality_score(total_cells, tally.issues);

        let auto_accepted_count = count_status(&tally.changes, ChangeStatus::AutoAccepted);
        let needs_review_count = count_status(&tally.changes, ChangeStatus::NeedsReview);

        for change in &tally.changes {
            metrics::pipeline::change_recorded(change.fix_type.as_str(), change.status.as_str());
        }
        metrics::pipeline::rows_processed(original.len());
        metrics::pipeline::quality_score(score);
        metrics::pipeline::duplicates_found(tally.stats.duplicates);
        metrics::pipeline::run_completed(options.auto_apply);

        info!(
            rows = original.len(),
            issues = tally.issues,
            fixes = tally.fixes,
            changes = tally.changes.len(),
            auto_accepted = auto_accepted_count,
            needs_review = needs_review_count,
            quality_score = score,
            "Pipeline pass finished"
        );

        let report = Report {
            total_issues: tally.issues,
            total_fixes: tally.fixes,
            quality_score: score,
            rows_processed: dataset.len(),
            columns: dataset.columns().to_vec(),
            column_roles: roles,
            total_changes: tally.changes.len(),
            auto_accepted_count,
            needs_review_count,
            duplicates_found: tally.stats.duplicates,
            original_data: original.to_records(),
            cleaned_data: dataset.to_records(),
            changes: tally.changes,
            verification_stats: tally.stats,
            issue_breakdown: tally.breakdown,
            job_function_summary,
        };

        Ok(PipelineOutcome { dataset, report })
    }
}

/// Clean a dataset with default settings
pub fn run_pipeline(dataset: Dataset, auto_apply: bool, verify_emails_api: bool) -> Result<PipelineOutcome, InputError> {
    Orchestrator::default().run(
        dataset,
        RunOptions {
            auto_apply,
            verify_emails_api,
        },
    )
}

fn count_status(changes: &[Change], status: ChangeStatus) -> usize {
    changes.iter().filter(|c| c.status == status).count()
}

#[derive(Default)]
struct Tally {
    changes: Vec<Change>,
    fixes: usize,
    issues: usize,
    stats: VerificationStats,
    breakdown: IssueBreakdown,
}

/// Mutable state of one run over one dataset
struct Pass<'a> {
    policy: AutoApplyPolicy,
    auto_apply: bool,
    region: &'a str,
    api: Option<&'a dyn DeliverabilityCheck>,
    roles: &'a ColumnRoles,
    dataset: Dataset,
    tally: Tally,
}

impl<'a> Pass<'a> {
    fn present(&self, row: usize, column: &Option<String>) -> Option<(String, String)> {
        let col = column.as_ref()?;
        let value = self.dataset.get(row, col);
        if is_missing(value) {
            return None;
        }
        value.map(|v| (col.clone(), v.to_string()))
    }

    /// Record a change and, when the policy allows, write it into the working copy
    fn propose(&mut self, change: Change) {
        if change.status == ChangeStatus::AutoAccepted {
            self.dataset
                .set(change.row_index, &change.column, Some(change.cleaned_value.clone()));
            self.tally.fixes += 1;
        }
        self.tally.changes.push(change);
    }

    fn suggest(&mut self, row: usize, column: &str, original: Option<&str>, cleaned: String, confidence: f64, kind: FixKind) -> Change {
        let status = self.policy.decide(kind, confidence, self.auto_apply);
        Change::new(row, column, original, cleaned, confidence, kind.fix_type(), status)
    }

    /// Field order matters: email repair reads the domain written just before it
    fn clean_row(&mut self, row: usize) {
        self.clean_company(row);
        let domain_hint = self.clean_domain(row);
        self.clean_phone(row);
        self.clean_email(row, domain_hint.as_deref());
        self.clean_job_title(row);
        self.map_role(row);
    }

    fn clean_company(&mut self, row: usize) {
        let Some((col, value)) = self.present(row, &self.roles.company) else {
            return;
        };
        let (fixed, conf) = suggest_company_fix(&value);
        if fixed != value {
            let change = self.suggest(row, &col, Some(&value), fixed, conf, FixKind::Company);
            self.tally.breakdown.company_fixes += 1;
            self.propose(change);
        }
    }

    /// Returns the domain later fields should trust, if any
    fn clean_domain(&mut self, row: usize) -> Option<String> {
        let (col, value) = self.present(row, &self.roles.domain)?;
        let (fixed, conf) = suggest_domain_fix(&value);
        if fixed == value {
            return Some(value);
        }

        let change = self.suggest(row, &col, Some(&value), fixed.clone(), conf, FixKind::Domain);
        self.tally.breakdown.domain_fixes += 1;
        self.propose(change);

        if self.policy.trusts(conf) {
            Some(fixed)
        } else {
            Some(value)
        }
    }

    fn clean_phone(&mut self, row: usize) {
        let Some((col, value)) = self.present(row, &self.roles.phone) else {
            return;
        };
        let check = validate_phone(Some(&value), self.region);

        if check.valid {
            self.tally.stats.phone_verified += 1;
            if let Some(formatted) = check.formatted.filter(|f| *f != value) {
                let change = self
                    .suggest(row, &col, Some(&value), formatted, check.confidence, FixKind::PhoneReformat)
                    .with_diagnostics(ChangeDiagnostics {
                        country: check.country,
                        verification: Some("valid".to_string()),
                        ..Default::default()
                    });
                self.propose(change);
            }
            return;
        }

        self.tally.stats.phone_invalid += 1;
        self.tally.breakdown.invalid_phones += 1;
        self.tally.issues += 1;
        let change = self
            .suggest(row, &col, Some(&value), value.clone(), check.confidence, FixKind::PhoneInvalid)
            .with_diagnostics(ChangeDiagnostics {
                error: check.error,
                verification: Some("invalid".to_string()),
                ..Default::default()
            });
        self.propose(change);
    }

    fn clean_email(&mut self, row: usize, domain_hint: Option<&str>) {
        let Some(col) = self.roles.email.clone() else {
            return;
        };
        let value = self.dataset.get(row, &col).map(str::to_string);

        // Missing: offer a placeholder for a reviewer to confirm; the empty
        // cell itself is already counted as a missing value
        if is_missing(value.as_deref()) {
            let (placeholder, conf) = fix_invalid_email(None, domain_hint);
            let change = self
                .suggest(row, &col, value.as_deref(), placeholder, conf, FixKind::EmailPlaceholder)
                .with_diagnostics(ChangeDiagnostics {
                    error: Some("Missing email".to_string()),
                    fix_applied: Some("generated_placeholder".to_string()),
                    ..Default::default()
                });
            self.propose(change);
            return;
        }

        let value = value.unwrap_or_default();
        let check = validate_email(Some(&value), self.api);

        if check.is_disposable {
            self.tally.breakdown.invalid_emails += 1;
            self.tally.issues += 1;
            let change = self
                .suggest(row, &col, Some(&value), value.clone(), 0.5, FixKind::EmailDisposable)
                .with_diagnostics(ChangeDiagnostics {
                    warning: Some("Disposable email domain detected".to_string()),
                    verification: Some("disposable".to_string()),
                    ..Default::default()
                });
            self.propose(change);
            return;
        }

        if check.valid {
            self.tally.stats.email_verified += 1;
            return;
        }

        self.tally.stats.email_invalid += 1;
        self.tally.breakdown.invalid_emails += 1;
        self.tally.issues += 1;

        let fix = fix_email(Some(&value), domain_hint);
        let change = self
            .suggest(row, &col, Some(&value), fix.email, fix.confidence, FixKind::EmailRepair)
            .with_diagnostics(ChangeDiagnostics {
                error: check.error,
                fix_applied: fix.fix_applied,
                verification: Some("invalid".to_string()),
                ..Default::default()
            });
        self.propose(change);
    }

    fn clean_job_title(&mut self, row: usize) {
        let Some((col, value)) = self.present(row, &self.roles.job_title) else {
            return;
        };
        let (fixed, conf) = standardize_job_title(&value);
        if fixed != value {
            let change = self.suggest(row, &col, Some(&value), fixed, conf, FixKind::JobTitle);
            self.tally.breakdown.job_title_fixes += 1;
            self.propose(change);
        }
    }

    /// Derived from the title as it stands after this row's fixes
    fn map_role(&mut self, row: usize) {
        let Some(col) = self.roles.job_title.as_deref() else {
            return;
        };
        let title = self.dataset.get(row, col);
        let function = if is_missing(title) {
            UNKNOWN_FUNCTION
        } else {
            map_job_title(title).0
        };
        self.dataset.set(row, ROLE_FUNCTION_COLUMN, Some(function.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::email::{DeliverabilityError, DeliverabilityVerdict};
    use crate::types::FixType;

    fn us_orchestrator() -> Orchestrator {
        let pipeline = PipelineConfig {
            default_region: "US".to_string(),
            ..Default::default()
        };
        Orchestrator::new(&pipeline, ColumnKeywords::default())
    }

    fn create_test_dataset(columns: &[&str], rows: &[&[Option<&str>]]) -> Dataset {
        let mut ds = Dataset::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            ds.push_row(row.iter().map(|c| c.map(str::to_string)).collect());
        }
        ds
    }

    fn contact_dataset() -> Dataset {
        create_test_dataset(
            &["company", "domain", "phone", "email", "job_title"],
            &[&[
                Some("gogle"),
                Some("gogle.com"),
                Some("4155551234"),
                Some("jane.doe@google.com"),
                Some("sr developer"),
            ]],
        )
    }

    const AUTO: RunOptions = RunOptions {
        auto_apply: true,
        verify_emails_api: false,
    };
    const REVIEW: RunOptions = RunOptions {
        auto_apply: false,
        verify_emails_api: false,
    };

    #[test]
    fn score_ignores_the_derived_role_column() {
        let ds = create_test_dataset(&["company", "job_title"], &[&[None, Some("cfo")]]);
        let outcome = us_orchestrator().run(ds, AUTO).unwrap();

        assert!(outcome.dataset.column_index(ROLE_FUNCTION_COLUMN).is_some());
        assert_eq!(outcome.report.issue_breakdown.missing_fields, 1);
        assert_eq!(outcome.report.total_issues, 1);
        // one issue over two input cells, not three
        assert_eq!(outcome.report.quality_score, 50.0);
    }

    #[test]
    fn auto_mode_applies_confident_fixes() {
        let outcome = us_orchestrator().run(contact_dataset(), AUTO).unwrap();
        let ds = &outcome.dataset;
        assert_eq!(ds.get(0, "company"), Some("Google"));
        assert_eq!(ds.get(0, "domain"), Some("google.com"));
        assert_eq!(ds.get(0, "phone"), Some("+14155551234"));
        assert_eq!(ds.get(0, "job_title"), Some("Senior Developer"));
        assert_eq!(ds.get(0, ROLE_FUNCTION_COLUMN), Some("IT"));

        let report = &outcome.report;
        assert_eq!(report.total_changes, 4);
        assert_eq!(report.auto_accepted_count, 4);
        assert_eq!(report.total_fixes, 4);
        assert_eq!(report.total_issues, 0);
        assert_eq!(report.quality_score, 100.0);
        assert_eq!(report.verification_stats.phone_verified, 1);
        assert_eq!(report.verification_stats.email_verified, 1);
        assert!(report.changes.iter().all(|c| c.applied));
    }

    #[test]
    fn review_mode_leaves_cells_untouched() {
        let input = contact_dataset();
        let outcome = us_orchestrator().run(input.clone(), REVIEW).unwrap();
        for col in input.columns() {
            assert_eq!(outcome.dataset.get(0, col), input.get(0, col));
        }
        // role mapping runs regardless of mode
        assert_eq!(outcome.dataset.get(0, ROLE_FUNCTION_COLUMN), Some("IT"));
        assert_eq!(outcome.report.needs_review_count, 4);
        assert_eq!(outcome.report.total_fixes, 0);
    }

    #[test]
    fn counts_issues_over_input_cells() {
        let ds = create_test_dataset(
            &["name", "email", "phone"],
            &[
                &[Some("Ann"), Some("a@x.com"), Some("+14155551234")],
                &[Some("Ann"), Some("a@x.com"), Some("+14155551234")],
                &[Some("Bob"), None, Some("12")],
            ],
        );
        let report = us_orchestrator().run(ds, AUTO).unwrap().report;

        // invalid phone + missing email + two duplicate rows
        assert_eq!(report.total_issues, 4);
        assert_eq!(report.quality_score, 55.56);
        assert_eq!(report.issue_breakdown.missing_fields, 1);
        assert_eq!(report.issue_breakdown.invalid_phones, 1);
        assert_eq!(report.duplicates_found, 2);

        let duplicates: Vec<&Change> = report.changes_of(FixType::Duplicate).collect();
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].row_index, 0);
        assert_eq!(duplicates[1].row_index, 1);
        for dup in duplicates {
            assert_eq!(dup.status, ChangeStatus::NeedsReview);
            assert_eq!(dup.confidence, 1.0);
            assert_eq!(dup.column, ROW_COLUMN);
        }
    }

    #[test]
    fn broken_phone_is_never_auto_applied() {
        let ds = create_test_dataset(&["phone"], &[&[Some("12")]]);
        let outcome = us_orchestrator().run(ds, AUTO).unwrap();
        let change = &outcome.report.changes[0];
        assert_eq!(change.fix_type, FixType::Phone);
        assert_eq!(change.status, ChangeStatus::NeedsReview);
        assert_eq!(outcome.dataset.get(0, "phone"), Some("12"));
    }

    #[test]
    fn missing_email_gets_placeholder_from_domain() {
        let ds = create_test_dataset(&["domain", "email"], &[&[Some("google.com"), None]]);
        let outcome = us_orchestrator().run(ds, AUTO).unwrap();
        let change = outcome.report.changes_of(FixType::Email).next().unwrap();
        assert_eq!(change.cleaned_value, "unknown@google.com");
        assert_eq!(change.status, ChangeStatus::NeedsReview);
        assert_eq!(outcome.dataset.get(0, "email"), None);
        // counted once, as a missing cell
        assert_eq!(outcome.report.total_issues, 1);
    }

    #[test]
    fn disposable_email_is_flagged_not_changed() {
        let ds = create_test_dataset(&["email"], &[&[Some("me@mailinator.com")]]);
        let outcome = us_orchestrator().run(ds, AUTO).unwrap();
        let change = &outcome.report.changes[0];
        assert_eq!(change.cleaned_value, "me@mailinator.com");
        assert_eq!(change.status, ChangeStatus::NeedsReview);
        assert_eq!(change.confidence, 0.5);
    }

    struct Undeliverable;

    impl DeliverabilityCheck for Undeliverable {
        fn check(&self, _email: &str) -> Result<DeliverabilityVerdict, DeliverabilityError> {
            Ok(DeliverabilityVerdict {
                reason: Some("no such domain".to_string()),
                ..Default::default()
            })
        }
    }

    #[test]
    fn api_rejection_routes_to_typo_repair() {
        let orchestrator = us_orchestrator().with_deliverability_check(Arc::new(Undeliverable));
        let ds = create_test_dataset(&["email"], &[&[Some("user@gmial.com")]]);
        let options = RunOptions {
            auto_apply: true,
            verify_emails_api: true,
        };
        let outcome = orchestrator.run(ds, options).unwrap();
        let change = &outcome.report.changes[0];
        assert_eq!(change.cleaned_value, "user@gmail.com");
        assert_eq!(change.confidence, 0.8);
        assert_eq!(change.status, ChangeStatus::AutoAccepted);
        assert_eq!(outcome.dataset.get(0, "email"), Some("user@gmail.com"));
        assert_eq!(outcome.report.verification_stats.email_invalid, 1);
    }

    #[test]
    fn repeated_runs_propose_the_same_changes() {
        let key = |c: &Change| {
            (
                c.row_index,
                c.column.clone(),
                c.original_value.clone(),
                c.cleaned_value.clone(),
                c.fix_type,
                c.status,
            )
        };
        let first = us_orchestrator().run(contact_dataset(), AUTO).unwrap();
        let second = us_orchestrator().run(contact_dataset(), AUTO).unwrap();
        let a: Vec<_> = first.report.changes.iter().map(key).collect();
        let b: Vec<_> = second.report.changes.iter().map(key).collect();
        assert_eq!(a, b);
        assert_eq!(first.dataset.len(), contact_dataset().len());
    }

    #[test]
    fn empty_input_is_an_input_error() {
        let ds = Dataset::new(vec!["email".to_string()]);
        assert_eq!(us_orchestrator().run(ds, AUTO).unwrap_err(), InputError::Empty);
        assert!(matches!(
            us_orchestrator().run_bytes(b"", AUTO),
            Err(InputError::Unreadable(_))
        ));
    }

    #[test]
    fn no_role_column_without_job_titles() {
        let ds = create_test_dataset(&["email"], &[&[Some("a@b.com")]]);
        let outcome = run_pipeline(ds, true, false).unwrap();
        assert!(outcome.dataset.column_index(ROLE_FUNCTION_COLUMN).is_none());
        assert!(outcome.report.job_function_summary.is_empty());
    }
}
