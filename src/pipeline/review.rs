use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

use crate::constants::SYSTEM_ACTOR;
use crate::error::{DqError, Result};
use crate::observability::metrics;
use crate::types::{Change, ChangeLogEntry, ChangeStatus, Dataset, LoggedAction, ReviewAction, ReviewDecision};

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub dataset: Dataset,
    /// One entry per applied decision, then one per carried-forward auto fix
    pub change_log: Vec<ChangeLogEntry>,
    pub accepted: usize,
    pub overridden: usize,
    pub rejected: usize,
    /// Decisions ignored because they referenced unknown or already decided changes
    pub skipped: usize,
}

impl ReviewOutcome {
    pub fn total_fixes(&self) -> usize {
        self.accepted + self.overridden
    }

    pub fn manual_overrides(&self) -> usize {
        self.overridden
    }
}

fn validate_decisions(decisions: &[ReviewDecision]) -> Result<()> {
    for decision in decisions {
        if decision.action == ReviewAction::Override && decision.override_value.is_none() {
            return Err(DqError::InvalidDecision {
                change_id: decision.change_id.clone(),
                message: "override requires an override_value".to_string(),
            });
        }
    }
    Ok(())
}

/// Apply reviewer decisions to a pristine copy of the input.
///
/// `original` must be the dataset as decoded from the source file, not the
/// working copy of a previous pass, so a rejection always leaves the original
/// cell in place. Ledger entries in `changes` are updated in place.
/// Auto-accepted changes without a decision are carried forward.
#[instrument(skip_all, fields(changes = changes.len(), decisions = decisions.len()))]
pub fn apply_review(mut original: Dataset, changes: &mut [Change], decisions: &[ReviewDecision]) -> Result<ReviewOutcome> {
    validate_decisions(decisions)?;

    let index: HashMap<String, usize> = changes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();

    let mut outcome = ReviewOutcome {
        dataset: Dataset::default(),
        change_log: Vec::with_capacity(decisions.len()),
        accepted: 0,
        overridden: 0,
        rejected: 0,
        skipped: 0,
    };
    let mut decided: HashSet<usize> = HashSet::new();

    for decision in decisions {
        let Some(&pos) = index.get(&decision.change_id) else {
            warn!(change_id = %decision.change_id, "Skipping decision for unknown change");
            outcome.skipped += 1;
            metrics::review::decision_skipped("unknown_change");
            continue;
        };
        let change = &mut changes[pos];

        if decided.contains(&pos) || !change.status.accepts_decision() {
            warn!(change_id = %change.id, status = change.status.as_str(), "Skipping decision for already decided change");
            outcome.skipped += 1;
            metrics::review::decision_skipped("already_decided");
            continue;
        }
        if change.row_index >= original.len() {
            warn!(change_id = %change.id, row = change.row_index, "Skipping decision for row outside the dataset");
            outcome.skipped += 1;
            metrics::review::decision_skipped("row_out_of_range");
            continue;
        }

        let final_value = match decision.action {
            ReviewAction::Accept => {
                outcome.accepted += 1;
                change.status = ChangeStatus::Accepted;
                change.applied = true;
                Some(change.cleaned_value.clone())
            }
            ReviewAction::Override => {
                outcome.overridden += 1;
                change.status = ChangeStatus::Overridden;
                change.applied = true;
                change.manual_override = decision.override_value.clone();
                change.override_reason = decision.reason.clone();
                decision.override_value.clone()
            }
            ReviewAction::Reject => {
                outcome.rejected += 1;
                change.status = ChangeStatus::Rejected;
                change.applied = false;
                change.original_value.clone()
            }
        };
        change.modified_by = decision.actor.clone();

        // Row-level flags are informational; rows are never removed
        if decision.action != ReviewAction::Reject && !change.is_row_level() {
            original.set(change.row_index, &change.column, final_value.clone());
        }

        metrics::review::decision_applied(decision.action.as_str());
        decided.insert(pos);
        outcome.change_log.push(ChangeLogEntry {
            change_id: change.id.clone(),
            row_index: change.row_index,
            column: change.column.clone(),
            original_value: change.original_value.clone(),
            suggested_value: change.cleaned_value.clone(),
            final_value,
            action: decision.action.into(),
            reason: decision.reason.clone(),
            modified_by: decision.actor.clone(),
            timestamp: Utc::now(),
        });
    }

    for (pos, change) in changes.iter().enumerate() {
        if decided.contains(&pos) || change.status != ChangeStatus::AutoAccepted {
            continue;
        }
        if change.row_index >= original.len() {
            continue;
        }
        if !change.is_row_level() {
            original.set(change.row_index, &change.column, Some(change.cleaned_value.clone()));
        }
        outcome.change_log.push(ChangeLogEntry {
            change_id: change.id.clone(),
            row_index: change.row_index,
            column: change.column.clone(),
            original_value: change.original_value.clone(),
            suggested_value: change.cleaned_value.clone(),
            final_value: Some(change.cleaned_value.clone()),
            action: LoggedAction::AutoAccept,
            reason: None,
            modified_by: Some(SYSTEM_ACTOR.to_string()),
            timestamp: Utc::now(),
        });
    }

    info!(
        accepted = outcome.accepted,
        overridden = outcome.overridden,
        rejected = outcome.rejected,
        skipped = outcome.skipped,
        logged = outcome.change_log.len(),
        "Review decisions applied"
    );

    outcome.dataset = original;
    Ok(outcome)
}
