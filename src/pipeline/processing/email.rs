use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{PLACEHOLDER_DOMAIN, PLACEHOLDER_LOCAL_PART};
use crate::observability::metrics;

static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email format regex is valid")
});

pub const DISPOSABLE_DOMAINS: &[&str] = &[
    "tempmail.com",
    "throwaway.email",
    "guerrillamail.com",
    "10minutemail.com",
    "mailinator.com",
    "temp-mail.org",
    "fakeinbox.com",
    "tempail.com",
    "dispostable.com",
];

/// Misspelled provider domain -> intended domain
pub const DOMAIN_TYPOS: &[(&str, &str)] = &[
    ("gmial.com", "gmail.com"),
    ("gmal.com", "gmail.com"),
    ("gmail.co", "gmail.com"),
    ("gmaill.com", "gmail.com"),
    ("outlok.com", "outlook.com"),
    ("outloo.com", "outlook.com"),
    ("hotmal.com", "hotmail.com"),
    ("hotmai.com", "hotmail.com"),
    ("yaho.com", "yahoo.com"),
    ("yahooo.com", "yahoo.com"),
];

/// How an email verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Format,
    Api,
    /// The API was requested but did not answer; format rules decided
    FormatFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailCheck {
    pub valid: bool,
    pub error: Option<String>,
    pub confidence: f64,
    pub is_disposable: bool,
    pub method: VerificationMethod,
}

/// Verdict returned by an external deliverability service. Providers
/// disagree on whether the flag is called `valid` or `deliverable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliverabilityVerdict {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub deliverable: bool,
    #[serde(default)]
    pub disposable: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl DeliverabilityVerdict {
    pub fn is_deliverable(&self) -> bool {
        self.valid || self.deliverable
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliverabilityError {
    #[error("timed out")]
    Timeout,
    #[error("{0}")]
    Request(String),
}

/// Blocking deliverability lookup. Implementations must bound the call
/// with a timeout and report it as [`DeliverabilityError::Timeout`].
pub trait DeliverabilityCheck: Send + Sync {
    fn check(&self, email: &str) -> std::result::Result<DeliverabilityVerdict, DeliverabilityError>;
}

fn domain_of(email: &str) -> Option<&str> {
    email.rsplit_once('@').map(|(_, d)| d)
}

pub fn is_disposable_domain(domain: &str) -> bool {
    DISPOSABLE_DOMAINS.contains(&domain)
}

/// Local rules only: shape plus the disposable-provider list
pub fn validate_email_format(email: Option<&str>) -> EmailCheck {
    let mut check = EmailCheck {
        valid: false,
        error: None,
        confidence: 0.0,
        is_disposable: false,
        method: VerificationMethod::Format,
    };

    let email = match email.map(|e| e.trim().to_lowercase()) {
        Some(e) if !e.is_empty() => e,
        _ => {
            check.error = Some("Missing email".to_string());
            return check;
        }
    };

    if !EMAIL_FORMAT.is_match(&email) {
        check.error = Some("Invalid email format".to_string());
        check.confidence = 0.2;
        return check;
    }

    if domain_of(&email).map(is_disposable_domain).unwrap_or(false) {
        check.error = Some("Disposable email domain detected".to_string());
        check.is_disposable = true;
        check.confidence = 0.4;
        return check;
    }

    check.valid = true;
    // Shape only, deliverability unproven
    check.confidence = 0.7;
    check
}

/// Format rules first, then the external lookup. A lookup that fails keeps
/// the format verdict at reduced confidence instead of failing the row.
pub fn validate_email_api(email: Option<&str>, checker: &dyn DeliverabilityCheck) -> EmailCheck {
    let basic = validate_email_format(email);
    if !basic.valid {
        return basic;
    }

    let normalized = email.map(|e| e.trim().to_lowercase()).unwrap_or_default();
    match checker.check(&normalized) {
        Ok(verdict) => {
            let deliverable = verdict.is_deliverable();
            EmailCheck {
                valid: deliverable,
                error: if deliverable {
                    None
                } else {
                    Some(verdict.reason.unwrap_or_else(|| "Email verification failed".to_string()))
                },
                confidence: if deliverable { 0.95 } else { 0.3 },
                is_disposable: verdict.disposable,
                method: VerificationMethod::Api,
            }
        }
        Err(DeliverabilityError::Timeout) => {
            warn!(email = %normalized, "Email verification API timed out, using format rules");
            metrics::pipeline::email_api_fallback("timeout");
            EmailCheck {
                error: Some("API timeout - using basic validation".to_string()),
                confidence: 0.6,
                method: VerificationMethod::FormatFallback,
                ..basic
            }
        }
        Err(DeliverabilityError::Request(reason)) => {
            warn!(email = %normalized, error = %reason, "Email verification API failed, using format rules");
            metrics::pipeline::email_api_fallback("request");
            EmailCheck {
                error: Some(format!("API error - using basic validation: {}", reason)),
                confidence: 0.5,
                method: VerificationMethod::FormatFallback,
                ..basic
            }
        }
    }
}

/// Use the API when one is configured and requested, format rules otherwise
pub fn validate_email(email: Option<&str>, api: Option<&dyn DeliverabilityCheck>) -> EmailCheck {
    match api {
        Some(checker) => validate_email_api(email, checker),
        None => validate_email_format(email),
    }
}

/// Result of [`fix_email`]
#[derive(Debug, Clone, PartialEq)]
pub struct EmailFix {
    pub email: String,
    pub confidence: f64,
    /// Which repair happened, if any
    pub fix_applied: Option<String>,
}

/// Repair provider typos, then fall back to the domain hint.
pub fn fix_email(email: Option<&str>, domain_hint: Option<&str>) -> EmailFix {
    let hint = domain_hint.map(str::trim).filter(|d| !d.is_empty());

    let original = match email.map(|e| e.trim().to_lowercase()) {
        Some(e) if !e.is_empty() => e,
        _ => {
            let (email, confidence) = match hint {
                Some(d) => (format!("{}@{}", PLACEHOLDER_LOCAL_PART, d), 0.1),
                None => (format!("{}@{}", PLACEHOLDER_LOCAL_PART, PLACEHOLDER_DOMAIN), 0.0),
            };
            return EmailFix {
                email,
                confidence,
                fix_applied: Some("generated_placeholder".to_string()),
            };
        }
    };

    let mut candidate = original.clone();
    let mut fix_applied = None;
    if let Some((local, domain)) = original.rsplit_once('@') {
        if let Some((typo, correct)) = DOMAIN_TYPOS.iter().find(|(typo, _)| *typo == domain) {
            candidate = format!("{}@{}", local, correct);
            fix_applied = Some(format!("fixed_typo:{}->{}", typo, correct));
        }
    }

    if validate_email_format(Some(&candidate)).valid {
        let confidence = if fix_applied.is_some() { 0.8 } else { 0.9 };
        return EmailFix {
            email: candidate,
            confidence,
            fix_applied,
        };
    }

    if let (Some(d), Some((local, _))) = (hint, original.split_once('@')) {
        return EmailFix {
            email: format!("{}@{}", local, d),
            confidence: 0.5,
            fix_applied: Some("domain_corrected".to_string()),
        };
    }

    EmailFix {
        email: original,
        confidence: 0.2,
        fix_applied: None,
    }
}
