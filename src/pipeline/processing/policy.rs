use crate::types::{ChangeStatus, FixType};

/// What kind of suggestion is being gated. Finer than [`FixType`] because
/// the same field can produce both auto-appliable and review-only changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixKind {
    Company,
    Domain,
    JobTitle,
    PhoneReformat,
    PhoneInvalid,
    EmailRepair,
    EmailDisposable,
    EmailPlaceholder,
    Duplicate,
}

/// How a kind compares its confidence to the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    AtLeast,
    Above,
    ReviewOnly,
}

impl FixKind {
    fn gate(self) -> Gate {
        match self {
            FixKind::Company | FixKind::JobTitle | FixKind::PhoneReformat | FixKind::EmailRepair => Gate::AtLeast,
            FixKind::Domain => Gate::Above,
            FixKind::PhoneInvalid | FixKind::EmailDisposable | FixKind::EmailPlaceholder | FixKind::Duplicate => {
                Gate::ReviewOnly
            }
        }
    }

    pub fn fix_type(self) -> FixType {
        match self {
            FixKind::Company => FixType::Company,
            FixKind::Domain => FixType::Domain,
            FixKind::JobTitle => FixType::JobTitle,
            FixKind::PhoneReformat | FixKind::PhoneInvalid => FixType::Phone,
            FixKind::EmailRepair | FixKind::EmailDisposable | FixKind::EmailPlaceholder => FixType::Email,
            FixKind::Duplicate => FixType::Duplicate,
        }
    }
}

/// Single place deciding whether a suggestion is written without review
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoApplyPolicy {
    pub threshold: f64,
}

impl AutoApplyPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn decide(&self, kind: FixKind, confidence: f64, auto_apply: bool) -> ChangeStatus {
        if !auto_apply {
            return ChangeStatus::NeedsReview;
        }
        let passes = match kind.gate() {
            Gate::AtLeast => confidence >= self.threshold,
            Gate::Above => confidence > self.threshold,
            Gate::ReviewOnly => false,
        };
        if passes {
            ChangeStatus::AutoAccepted
        } else {
            ChangeStatus::NeedsReview
        }
    }

    /// Confidence a value must reach before later fields may rely on it
    pub fn trusts(&self, confidence: f64) -> bool {
        confidence > self.threshold
    }
}

impl Default for AutoApplyPolicy {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_except_for_domains() {
        let policy = AutoApplyPolicy::default();
        assert_eq!(policy.decide(FixKind::Company, 0.7, true), ChangeStatus::AutoAccepted);
        assert_eq!(policy.decide(FixKind::EmailRepair, 0.7, true), ChangeStatus::AutoAccepted);
        assert_eq!(policy.decide(FixKind::Domain, 0.7, true), ChangeStatus::NeedsReview);
        assert_eq!(policy.decide(FixKind::Domain, 0.71, true), ChangeStatus::AutoAccepted);
        assert_eq!(policy.decide(FixKind::JobTitle, 0.69, true), ChangeStatus::NeedsReview);
    }

    #[test]
    fn review_only_kinds_ignore_confidence() {
        let policy = AutoApplyPolicy::default();
        for kind in [
            FixKind::PhoneInvalid,
            FixKind::EmailDisposable,
            FixKind::EmailPlaceholder,
            FixKind::Duplicate,
        ] {
            assert_eq!(policy.decide(kind, 1.0, true), ChangeStatus::NeedsReview);
        }
    }

    #[test]
    fn nothing_auto_applies_in_review_mode() {
        let policy = AutoApplyPolicy::new(0.0);
        assert_eq!(policy.decide(FixKind::PhoneReformat, 1.0, false), ChangeStatus::NeedsReview);
    }

    #[test]
    fn kinds_map_to_ledger_fix_types() {
        assert_eq!(FixKind::PhoneInvalid.fix_type(), FixType::Phone);
        assert_eq!(FixKind::EmailPlaceholder.fix_type(), FixType::Email);
        assert_eq!(FixKind::Duplicate.fix_type(), FixType::Duplicate);
    }
}
