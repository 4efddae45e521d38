use phonenumber::country;
use serde::{Deserialize, Serialize};

use super::validators::is_missing;

/// Outcome of checking one phone number against the numbering plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneCheck {
    pub valid: bool,
    /// E.164 form, only present for valid numbers
    pub formatted: Option<String>,
    /// ISO 3166-1 region detected for valid numbers
    pub country: Option<String>,
    pub error: Option<String>,
    pub confidence: f64,
}

impl PhoneCheck {
    fn failed(error: String, confidence: f64) -> Self {
        Self {
            valid: false,
            formatted: None,
            country: None,
            error: Some(error),
            confidence,
        }
    }
}

/// Drop the separators people type between digit groups
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

/// Parse `raw` against the numbering plan of `default_region` (used only
/// when the number carries no `+` country prefix) and check plan validity.
pub fn validate_phone(raw: Option<&str>, default_region: &str) -> PhoneCheck {
    let raw = match raw {
        Some(r) if !is_missing(Some(r)) => r,
        _ => return PhoneCheck::failed("Missing phone number".to_string(), 0.0),
    };

    let cleaned = normalize_phone(raw.trim());
    let region = default_region.trim().to_uppercase().parse::<country::Id>().ok();

    match phonenumber::parse(region, &cleaned) {
        Ok(number) if phonenumber::is_valid(&number) => PhoneCheck {
            valid: true,
            formatted: Some(number.format().mode(phonenumber::Mode::E164).to_string()),
            country: number.country().id().map(|id| format!("{:?}", id)),
            error: None,
            confidence: 1.0,
        },
        // Parses but is not an allocated number: most likely a typo
        Ok(_) => PhoneCheck::failed("Invalid phone number".to_string(), 0.3),
        Err(e) => PhoneCheck::failed(format!("Parse error: {}", e), 0.1),
    }
}

/// `(value, confidence, error)` where value is the E.164 form when valid and
/// the untouched input otherwise.
pub fn fix_phone_number(raw: Option<&str>, default_region: &str) -> (Option<String>, f64, Option<String>) {
    let check = validate_phone(raw, default_region);
    match check.formatted {
        Some(formatted) => (Some(formatted), check.confidence, None),
        None => (raw.map(str::to_string), check.confidence, check.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn us_number_formats_to_e164() {
        let check = validate_phone(Some("4155551234"), "US");
        assert!(check.valid);
        assert_eq!(check.formatted.as_deref(), Some("+14155551234"));
        assert_eq!(check.country.as_deref(), Some("US"));
        assert_eq!(check.confidence, 1.0);
    }

    #[test]
    fn separators_are_ignored() {
        let check = validate_phone(Some("(415) 555-1234"), "US");
        assert_eq!(check.formatted.as_deref(), Some("+14155551234"));
    }

    #[test]
    fn explicit_prefix_overrides_region_hint() {
        let check = validate_phone(Some("+1 415 555 1234"), "IN");
        assert!(check.valid);
        assert_eq!(check.formatted.as_deref(), Some("+14155551234"));
    }

    #[test]
    fn missing_number_has_zero_confidence() {
        for raw in [None, Some(""), Some("nan")] {
            let check = validate_phone(raw, "US");
            assert!(!check.valid);
            assert_eq!(check.confidence, 0.0);
            assert_eq!(check.error.as_deref(), Some("Missing phone number"));
        }
    }

    #[test]
    fn invalid_numbers_are_low_confidence() {
        let check = validate_phone(Some("12"), "US");
        assert!(!check.valid);
        assert!(check.formatted.is_none());
        assert!(check.confidence <= 0.3);

        let check = validate_phone(Some("not a number"), "US");
        assert!(!check.valid);
        assert!(check.confidence <= 0.3);
    }

    #[test]
    fn fix_keeps_original_when_invalid() {
        let (value, conf, err) = fix_phone_number(Some("12"), "US");
        assert_eq!(value.as_deref(), Some("12"));
        assert!(conf < 1.0);
        assert!(err.is_some());

        let (value, conf, err) = fix_phone_number(Some("415-555-1234"), "US");
        assert_eq!(value.as_deref(), Some("+14155551234"));
        assert_eq!(conf, 1.0);
        assert!(err.is_none());
    }
}
