//! Metrics for the cleaning pipeline and the review step
//!
//! Recording goes through the `metrics` facade, so every helper is a no-op
//! until a recorder is installed with [`init`].

use std::fmt;
use std::sync::OnceLock;
use tracing::info;

/// Every metric the crate records, so names are never spelled twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Pipeline
    PipelineRunsCompleted,
    PipelineRowsProcessed,
    PipelineChangesProposed,
    PipelineQualityScore,
    PipelineDuplicatesFound,
    PipelineEmailApiFallbacks,

    // Review
    ReviewDecisionsApplied,
    ReviewDecisionsSkipped,
    ReviewSessionsFinalized,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::PipelineRunsCompleted => "dq_pipeline_runs_completed_total",
            MetricName::PipelineRowsProcessed => "dq_pipeline_rows_processed_total",
            MetricName::PipelineChangesProposed => "dq_pipeline_changes_proposed_total",
            MetricName::PipelineQualityScore => "dq_pipeline_quality_score",
            MetricName::PipelineDuplicatesFound => "dq_pipeline_duplicates_found_total",
            MetricName::PipelineEmailApiFallbacks => "dq_pipeline_email_api_fallbacks_total",

            MetricName::ReviewDecisionsApplied => "dq_review_decisions_applied_total",
            MetricName::ReviewDecisionsSkipped => "dq_review_decisions_skipped_total",
            MetricName::ReviewSessionsFinalized => "dq_review_sessions_finalized_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            PipelineRunsCompleted,
            PipelineRowsProcessed,
            PipelineChangesProposed,
            PipelineQualityScore,
            PipelineDuplicatesFound,
            PipelineEmailApiFallbacks,
            ReviewDecisionsApplied,
            ReviewDecisionsSkipped,
            ReviewSessionsFinalized,
        ]
        .into_iter()
    }

    /// (stage, description)
    pub fn metadata(&self) -> (&'static str, &'static str) {
        match self {
            MetricName::PipelineRunsCompleted => ("pipeline", "Cleaning passes completed, by mode"),
            MetricName::PipelineRowsProcessed => ("pipeline", "Rows processed"),
            MetricName::PipelineChangesProposed => ("pipeline", "Changes proposed, by fix type and status"),
            MetricName::PipelineQualityScore => ("pipeline", "Quality score per pass"),
            MetricName::PipelineDuplicatesFound => ("pipeline", "Rows flagged as duplicates"),
            MetricName::PipelineEmailApiFallbacks => ("pipeline", "Email API calls that fell back to format rules"),
            MetricName::ReviewDecisionsApplied => ("review", "Reviewer decisions applied, by action"),
            MetricName::ReviewDecisionsSkipped => ("review", "Reviewer decisions skipped, by reason"),
            MetricName::ReviewSessionsFinalized => ("review", "Review sessions finalized"),
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static PROMETHEUS: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), String> {
    if PROMETHEUS.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = PROMETHEUS.set(handle);
    info!("Metrics recorder installed");
    Ok(())
}

/// Text exposition of everything recorded so far, if a recorder is installed
pub fn render() -> Option<String> {
    PROMETHEUS.get().map(|handle| handle.render())
}

pub mod pipeline {
    use super::MetricName;

    pub fn run_completed(auto_apply: bool) {
        let mode = if auto_apply { "auto" } else { "review" };
        ::metrics::counter!(MetricName::PipelineRunsCompleted.as_str(), "mode" => mode).increment(1);
    }

    pub fn rows_processed(rows: usize) {
        ::metrics::counter!(MetricName::PipelineRowsProcessed.as_str()).increment(rows as u64);
    }

    pub fn change_recorded(fix_type: &'static str, status: &'static str) {
        ::metrics::counter!(
            MetricName::PipelineChangesProposed.as_str(),
            "fix_type" => fix_type,
            "status" => status
        )
        .increment(1);
    }

    pub fn quality_score(score: f64) {
        ::metrics::histogram!(MetricName::PipelineQualityScore.as_str()).record(score);
    }

    pub fn duplicates_found(rows: usize) {
        ::metrics::counter!(MetricName::PipelineDuplicatesFound.as_str()).increment(rows as u64);
    }

    pub fn email_api_fallback(reason: &'static str) {
        ::metrics::counter!(MetricName::PipelineEmailApiFallbacks.as_str(), "reason" => reason).increment(1);
    }
}

pub mod review {
    use super::MetricName;

    pub fn decision_applied(action: &'static str) {
        ::metrics::counter!(MetricName::ReviewDecisionsApplied.as_str(), "action" => action).increment(1);
    }

    pub fn decision_skipped(reason: &'static str) {
        ::metrics::counter!(MetricName::ReviewDecisionsSkipped.as_str(), "reason" => reason).increment(1);
    }

    pub fn session_finalized() {
        ::metrics::counter!(MetricName::ReviewSessionsFinalized.as_str()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let names: HashSet<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), MetricName::all_metrics().count());
        assert!(names.iter().all(|n| n.starts_with("dq_")));
    }

    #[test]
    fn helpers_are_noops_without_recorder() {
        pipeline::rows_processed(3);
        review::decision_skipped("unknown_change");
    }
}
