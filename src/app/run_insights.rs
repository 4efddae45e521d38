use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::processing::scorer::round2;
use crate::types::{RunRecord, RunStatus};

/// Score movement under this many points counts as stable
const TREND_BAND: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: &'static str,
    pub run_a: f64,
    pub run_b: f64,
    pub difference: f64,
    pub improved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    pub run_a: u32,
    pub run_b: u32,
    pub metrics: Vec<MetricDelta>,
    pub improvements: usize,
    pub summary: String,
}

fn delta(metric: &'static str, a: f64, b: f64, improved: bool) -> MetricDelta {
    MetricDelta {
        metric,
        run_a: a,
        run_b: b,
        difference: round2(b - a),
        improved,
    }
}

fn invalid_pct(count: usize, rows: usize) -> f64 {
    round2(count as f64 / rows.max(1) as f64 * 100.0)
}

/// Side-by-side view of two runs, `b` being the one under evaluation
pub fn compare_runs(a: &RunRecord, b: &RunRecord) -> RunComparison {
    let emails_a = invalid_pct(a.issue_breakdown.invalid_emails, a.row_count);
    let emails_b = invalid_pct(b.issue_breakdown.invalid_emails, b.row_count);
    let phones_a = invalid_pct(a.issue_breakdown.invalid_phones, a.row_count);
    let phones_b = invalid_pct(b.issue_breakdown.invalid_phones, b.row_count);

    let metrics = vec![
        delta("Quality Score", a.quality_score, b.quality_score, b.quality_score > a.quality_score),
        delta(
            "Issues Found",
            a.total_issues as f64,
            b.total_issues as f64,
            b.total_issues < a.total_issues,
        ),
        delta("Invalid Emails %", emails_a, emails_b, emails_b < emails_a),
        delta("Invalid Phones %", phones_a, phones_b, phones_b < phones_a),
        // more manual attention is not a regression
        delta("Manual Overrides", a.manual_overrides as f64, b.manual_overrides as f64, true),
        delta(
            "Fixes Applied",
            a.total_fixes as f64,
            b.total_fixes as f64,
            b.total_fixes >= a.total_fixes,
        ),
    ];

    let improvements = metrics.iter().filter(|m| m.improved).count();
    let summary = if improvements >= 4 {
        format!("Run #{} shows significant improvement over Run #{}", b.run_number, a.run_number)
    } else if improvements >= 2 {
        format!("Run #{} shows mixed results compared to Run #{}", b.run_number, a.run_number)
    } else {
        format!("Run #{} shows some regression compared to Run #{}", b.run_number, a.run_number)
    };

    RunComparison {
        run_a: a.run_number,
        run_b: b.run_number,
        metrics,
        improvements,
        summary,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub run_number: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub quality_score: f64,
    pub issues_found: usize,
    pub fixes_applied: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub points: Vec<TimelinePoint>,
    pub average_quality: f64,
    pub trend: Trend,
}

fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn classify(diff: f64) -> Trend {
    if diff > TREND_BAND {
        Trend::Improving
    } else if diff < -TREND_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Quality history of a project over its completed runs
pub fn timeline(runs: &[RunRecord]) -> Timeline {
    let mut completed: Vec<&RunRecord> = runs.iter().filter(|r| r.status == RunStatus::Completed).collect();
    completed.sort_by_key(|r| r.run_number);

    let points: Vec<TimelinePoint> = completed
        .iter()
        .map(|r| TimelinePoint {
            run_number: r.run_number,
            run_id: r.id,
            created_at: r.created_at,
            quality_score: r.quality_score,
            issues_found: r.total_issues,
            fixes_applied: r.total_fixes,
        })
        .collect();

    let scores: Vec<f64> = points.iter().map(|p| p.quality_score).collect();
    if scores.len() < 2 {
        return Timeline {
            average_quality: scores.first().copied().unwrap_or(0.0),
            trend: Trend::Stable,
            points,
        };
    }

    let trend = if scores.len() >= 4 {
        let (first, second) = scores.split_at(scores.len() / 2);
        classify(mean(second) - mean(first))
    } else {
        classify(scores[scores.len() - 1] - scores[0])
    };

    Timeline {
        average_quality: round2(mean(&scores)),
        trend,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::report::Report;
    use crate::types::RunMode;

    fn run(number: u32, score: f64, status: RunStatus) -> RunRecord {
        RunRecord {
            id: Uuid::new_v4(),
            project: "acme".into(),
            run_number: number,
            file_name: "leads.csv".into(),
            file_size: 10,
            row_count: 10,
            column_count: 3,
            columns: vec![],
            quality_score: score,
            total_issues: 0,
            total_fixes: 0,
            issue_breakdown: Default::default(),
            total_changes: 0,
            auto_accepted_count: 0,
            needs_review_count: 0,
            manual_overrides: 0,
            mode: RunMode::Auto,
            status,
            original_ref: "cas:sha256:00".into(),
            cleaned_ref: None,
            changelog_ref: None,
            report: Report::default(),
            verification_stats: Default::default(),
            created_at: Utc::now(),
            completed_at: None,
            run_by: None,
            notes: None,
        }
    }

    #[test]
    fn better_second_run_is_significant_improvement() {
        let mut a = run(1, 60.0, RunStatus::Completed);
        a.total_issues = 12;
        a.issue_breakdown.invalid_emails = 4;
        a.issue_breakdown.invalid_phones = 3;
        let mut b = run(2, 80.5, RunStatus::Completed);
        b.total_issues = 5;
        b.issue_breakdown.invalid_emails = 1;

        let cmp = compare_runs(&a, &b);
        assert_eq!(cmp.metrics[0].difference, 20.5);
        assert_eq!(cmp.metrics[2].run_a, 40.0);
        assert_eq!(cmp.improvements, 6);
        assert_eq!(cmp.summary, "Run #2 shows significant improvement over Run #1");
    }

    #[test]
    fn worse_second_run_is_regression() {
        let mut a = run(1, 90.0, RunStatus::Completed);
        a.total_fixes = 5;
        let mut b = run(2, 70.0, RunStatus::Completed);
        b.total_issues = 3;
        b.issue_breakdown.invalid_emails = 2;
        b.issue_breakdown.invalid_phones = 1;

        let cmp = compare_runs(&a, &b);
        // only manual overrides count as improved
        assert_eq!(cmp.improvements, 1);
        assert_eq!(cmp.summary, "Run #2 shows some regression compared to Run #1");
    }

    #[test]
    fn timeline_skips_unfinished_runs_and_orders_by_number() {
        let runs = vec![
            run(3, 90.0, RunStatus::Completed),
            run(1, 70.0, RunStatus::Completed),
            run(2, 10.0, RunStatus::PendingReview),
        ];
        let t = timeline(&runs);
        let numbers: Vec<u32> = t.points.iter().map(|p| p.run_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(t.average_quality, 80.0);
        assert_eq!(t.trend, Trend::Improving);
    }

    #[test]
    fn long_timeline_compares_halves() {
        let runs: Vec<RunRecord> = [80.0, 82.0, 79.0, 81.0]
            .iter()
            .enumerate()
            .map(|(i, s)| run(i as u32 + 1, *s, RunStatus::Completed))
            .collect();
        assert_eq!(timeline(&runs).trend, Trend::Stable);

        let runs: Vec<RunRecord> = [90.0, 88.0, 70.0, 72.0]
            .iter()
            .enumerate()
            .map(|(i, s)| run(i as u32 + 1, *s, RunStatus::Completed))
            .collect();
        assert_eq!(timeline(&runs).trend, Trend::Declining);
    }

    #[test]
    fn single_run_timeline_is_stable() {
        let t = timeline(&[run(1, 64.5, RunStatus::Completed)]);
        assert_eq!(t.average_quality, 64.5);
        assert_eq!(t.trend, Trend::Stable);

        let t = timeline(&[]);
        assert_eq!(t.average_quality, 0.0);
        assert!(t.points.is_empty());
    }
}
