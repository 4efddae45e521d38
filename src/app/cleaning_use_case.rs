use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app::ports::{ArtifactStorePort, PendingReview, RunRepositoryPort, SessionStorePort};
use crate::config::Config;
use crate::dataset::{read_csv, write_csv};
use crate::error::{DqError, Result};
use crate::observability::metrics;
use crate::pipeline::report::Report;
use crate::pipeline::preview::{data_page, DataFilters, DataPage, DataSource};
use crate::pipeline::review::apply_review;
use crate::pipeline::{Orchestrator, RunOptions};
use crate::types::{Change, ChangeLogEntry, ChangeStatus, Dataset, FixType, ReviewDecision, RunMode, RunRecord, RunStatus};

/// An uploaded file to clean
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub project: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mode: RunMode,
    pub run_by: Option<String>,
    /// Ask the deliverability service even if the project default is off
    pub verify_emails_api: bool,
}

#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub run: RunRecord,
    /// Working dataset after the pass, for rendering
    pub dataset: Dataset,
}

/// What a reviewer sees for one session
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub session_id: Uuid,
    pub file_name: String,
    pub changes: Vec<Change>,
    pub original_data: Vec<Value>,
    pub cleaned_data: Vec<Value>,
    pub columns: Vec<String>,
}

/// Progress figures for the review screen; percentages are whole numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewStats {
    pub potential_duplicates_pct: u32,
    pub pending_reviews_pct: u32,
    pub suggestions_pct: u32,
    pub job_titles_pct: u32,
    pub avg_confidence_pct: u32,
    pub review_progress_pct: u32,
    pub remaining_issues: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub run: RunRecord,
    pub accepted: usize,
    pub overridden: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub cleaned_ref: String,
    pub changelog_ref: String,
}

fn pct(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Submit, review and apply cleaning runs
pub struct CleaningService {
    config: Config,
    orchestrator: Orchestrator,
    sessions: Arc<dyn SessionStorePort>,
    runs: Arc<dyn RunRepositoryPort>,
    artifacts: Arc<dyn ArtifactStorePort>,
}

impl CleaningService {
    pub fn new(
        config: Config,
        orchestrator: Orchestrator,
        sessions: Arc<dyn SessionStorePort>,
        runs: Arc<dyn RunRepositoryPort>,
        artifacts: Arc<dyn ArtifactStorePort>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            sessions,
            runs,
            artifacts,
        }
    }

    /// Store the upload, clean it on a blocking worker and record the run.
    /// Review-mode runs also open a review session keyed by the run id.
    #[instrument(skip_all, fields(project = %request.project, file = %request.file_name, mode = ?request.mode))]
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitResult> {
        let original_ref = self.artifacts.put(&request.bytes).await?;
        let run_number = self.runs.next_run_number(&request.project).await?;

        let options = RunOptions {
            auto_apply: request.mode == RunMode::Auto && self.config.pipeline.auto_apply_high_confidence,
            verify_emails_api: request.verify_emails_api || self.config.pipeline.email_verification_api,
        };

        let orchestrator = self.orchestrator.clone();
        let bytes = request.bytes.clone();
        let result = tokio::task::spawn_blocking(move || orchestrator.run_bytes(&bytes, options))
            .await
            .map_err(|e| DqError::Task(e.to_string()))?;

        let mut run = RunRecord {
            id: Uuid::new_v4(),
            project: request.project.clone(),
            run_number,
            file_name: request.file_name.clone(),
            file_size: request.bytes.len() as u64,
            row_count: 0,
            column_count: 0,
            columns: Vec::new(),
            quality_score: 0.0,
            total_issues: 0,
            total_fixes: 0,
            issue_breakdown: Default::default(),
            total_changes: 0,
            auto_accepted_count: 0,
            needs_review_count: 0,
            manual_overrides: 0,
            mode: request.mode,
            status: RunStatus::Failed,
            original_ref,
            cleaned_ref: None,
            changelog_ref: None,
            report: Report::default(),
            verification_stats: Default::default(),
            created_at: Utc::now(),
            completed_at: None,
            run_by: request.run_by.clone(),
            notes: None,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(input_error) => {
                run.notes = Some(input_error.to_string());
                self.runs.save(&run).await?;
                return Err(input_error.into());
            }
        };

        let report = &outcome.report;
        run.row_count = report.rows_processed;
        run.column_count = report.columns.len();
        run.columns = report.columns.clone();
        run.quality_score = report.quality_score;
        run.total_issues = report.total_issues;
        run.total_fixes = report.total_fixes;
        run.issue_breakdown = report.issue_breakdown.clone();
        run.total_changes = report.total_changes;
        run.auto_accepted_count = report.auto_accepted_count;
        run.needs_review_count = report.needs_review_count;
        run.verification_stats = report.verification_stats.clone();

        match request.mode {
            RunMode::Auto => {
                let cleaned = write_csv(&outcome.dataset)?;
                run.cleaned_ref = Some(self.artifacts.put(&cleaned).await?);
                run.status = RunStatus::Completed;
                run.completed_at = Some(Utc::now());
            }
            RunMode::Review => {
                run.status = RunStatus::PendingReview;
            }
        }
        run.report = outcome.report.clone();
        self.runs.save(&run).await?;

        if run.mode == RunMode::Review {
            let pending = PendingReview {
                run_id: run.id,
                file_name: run.file_name.clone(),
                original_ref: run.original_ref.clone(),
                changes: run.report.changes.clone(),
                original_data: run.report.original_data.clone(),
                cleaned_data: run.report.cleaned_data.clone(),
                columns: run.report.columns.clone(),
            };
            self.sessions.put(run.id, pending).await?;
        }

        info!(
            run_id = %run.id,
            run_number = run.run_number,
            status = ?run.status,
            quality_score = run.quality_score,
            "Run recorded"
        );

        Ok(SubmitResult {
            run,
            dataset: outcome.dataset,
        })
    }

    async fn load_run(&self, run_id: Uuid) -> Result<RunRecord> {
        self.runs.get(run_id).await?.ok_or(DqError::RunNotFound(run_id))
    }

    /// The live session, or a view rebuilt from the stored run when the session is gone
    async fn pending_or_stored(&self, session_id: Uuid) -> Result<PendingReview> {
        if let Some(pending) = self.sessions.get(session_id).await? {
            return Ok(pending);
        }
        let run = self
            .runs
            .get(session_id)
            .await?
            .ok_or(DqError::SessionNotFound(session_id))?;
        Ok(PendingReview {
            run_id: run.id,
            file_name: run.file_name,
            original_ref: run.original_ref,
            changes: run.report.changes,
            original_data: run.report.original_data,
            cleaned_data: run.report.cleaned_data,
            columns: run.report.columns,
        })
    }

    /// Changes for a session, optionally narrowed to some fix types.
    /// Row snapshots are never filtered so row indexes stay meaningful.
    pub async fn review(&self, session_id: Uuid, only: Option<&[FixType]>) -> Result<ReviewView> {
        let pending = self.pending_or_stored(session_id).await?;
        let changes = match only {
            Some(types) if !types.is_empty() => pending
                .changes
                .into_iter()
                .filter(|c| types.contains(&c.fix_type))
                .collect(),
            _ => pending.changes,
        };
        Ok(ReviewView {
            session_id,
            file_name: pending.file_name,
            changes,
            original_data: pending.original_data,
            cleaned_data: pending.cleaned_data,
            columns: pending.columns,
        })
    }

    pub async fn review_stats(&self, session_id: Uuid) -> Result<ReviewStats> {
        let pending = self.pending_or_stored(session_id).await?;
        let changes = &pending.changes;
        let total = changes.len();
        if total == 0 {
            return Ok(ReviewStats::default());
        }
        let rows = pending.original_data.len();

        let pending_count = changes.iter().filter(|c| c.status.is_reviewable()).count();
        let duplicates = changes.iter().filter(|c| c.fix_type == FixType::Duplicate).count();
        let job_titles = changes.iter().filter(|c| c.fix_type == FixType::JobTitle).count();
        let handled = total - pending_count;
        let confidence_sum: f64 = changes.iter().map(|c| c.confidence).sum();

        Ok(ReviewStats {
            potential_duplicates_pct: pct(duplicates, rows),
            pending_reviews_pct: pct(pending_count, total),
            suggestions_pct: pct(total, rows),
            job_titles_pct: pct(job_titles, total),
            avg_confidence_pct: (confidence_sum / total as f64 * 100.0).round() as u32,
            review_progress_pct: pct(handled, total),
            remaining_issues: pending_count,
        })
    }

    /// Apply decisions to the stored original and finalize the run
    #[instrument(skip_all, fields(session_id = %session_id, decisions = decisions.len()))]
    pub async fn apply(&self, session_id: Uuid, decisions: Vec<ReviewDecision>, actor: Option<String>) -> Result<ApplyResult> {
        let mut run = self.load_run(session_id).await?;
        if run.changelog_ref.is_some() {
            return Err(DqError::AlreadyFinalized(run.id));
        }

        let mut changes = match self.sessions.get(session_id).await? {
            Some(pending) => pending.changes,
            None => run.report.changes.clone(),
        };

        let original_bytes = self.artifacts.get(&run.original_ref).await?;
        let original = read_csv(&original_bytes)?;

        let decisions: Vec<ReviewDecision> = decisions
            .into_iter()
            .map(|mut d| {
                if d.actor.is_none() {
                    d.actor = actor.clone();
                }
                d
            })
            .collect();

        let outcome = apply_review(original, &mut changes, &decisions)?;

        let cleaned = write_csv(&outcome.dataset)?;
        let cleaned_ref = self.artifacts.put(&cleaned).await?;
        let changelog = serde_json::to_vec_pretty(&outcome.change_log)?;
        let changelog_ref = self.artifacts.put(&changelog).await?;

        run.status = RunStatus::Completed;
        run.completed_at = Some(Utc::now());
        run.cleaned_ref = Some(cleaned_ref.clone());
        run.changelog_ref = Some(changelog_ref.clone());
        run.total_fixes = outcome.total_fixes();
        run.manual_overrides = outcome.manual_overrides();
        run.needs_review_count = changes.iter().filter(|c| c.status == ChangeStatus::NeedsReview).count();
        run.report.changes = changes;
        run.report.cleaned_data = outcome.dataset.to_records();
        if run.run_by.is_none() {
            run.run_by = actor;
        }
        self.runs.save(&run).await?;
        self.sessions.delete(session_id).await?;
        metrics::review::session_finalized();

        info!(
            run_id = %run.id,
            accepted = outcome.accepted,
            overridden = outcome.overridden,
            rejected = outcome.rejected,
            "Review finalized"
        );

        Ok(ApplyResult {
            run,
            accepted: outcome.accepted,
            overridden: outcome.overridden,
            rejected: outcome.rejected,
            skipped: outcome.skipped,
            cleaned_ref,
            changelog_ref,
        })
    }

    /// Audit trail written by the apply step; empty until the review is finalized
    pub async fn changelog(&self, session_id: Uuid) -> Result<Vec<ChangeLogEntry>> {
        let run = self.load_run(session_id).await?;
        match run.changelog_ref {
            Some(reference) => {
                let bytes = self.artifacts.get(&reference).await?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn update_notes(&self, run_id: Uuid, notes: Option<String>) -> Result<RunRecord> {
        let mut run = self.load_run(run_id).await?;
        run.notes = notes;
        self.runs.save(&run).await?;
        Ok(run)
    }

    pub async fn run(&self, run_id: Uuid) -> Result<RunRecord> {
        self.load_run(run_id).await
    }

    pub async fn runs_for_project(&self, project: &str) -> Result<Vec<RunRecord>> {
        self.runs.list_by_project(project).await
    }

    /// A filtered page of a run's original or cleaned file.
    ///
    /// A run without a cleaned file yet (still pending review) yields an empty
    /// page carrying a message rather than an error.
    #[instrument(skip(self, filters))]
    pub async fn data(
        &self,
        run_id: Uuid,
        source: DataSource,
        filters: &DataFilters,
        offset: usize,
        limit: usize,
    ) -> Result<DataPage> {
        let run = self.load_run(run_id).await?;
        let reference = match source {
            DataSource::Original => &run.original_ref,
            DataSource::Cleaned => match &run.cleaned_ref {
                Some(reference) => reference,
                None => return Ok(DataPage::empty(offset, limit, "Cleaned file not found")),
            },
        };

        let bytes = self.artifacts.get(reference).await?;
        let dataset = read_csv(&bytes)?;
        Ok(data_page(&dataset, &run.report.changes, filters, offset, limit))
    }

    /// Artifact bytes behind a reference stored on a run
    pub async fn artifact(&self, reference: &str) -> Result<Vec<u8>> {
        self.artifacts.get(reference).await
    }
}
