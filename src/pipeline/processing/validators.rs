use once_cell::sync::Lazy;
use regex::Regex;

/// Conservative shape check: local part, `@`, a domain containing a dot.
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("email shape regex is valid")
});

/// True for empty cells, whitespace-only strings and the literal `nan`
/// (any case), which is how numeric exports spell a missing value.
pub fn is_missing(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(s) => {
            let trimmed = s.trim();
            trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
        }
    }
}

pub fn is_valid_email(value: Option<&str>) -> bool {
    value.map(|v| EMAIL_SHAPE.is_match(v)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values() {
        assert!(is_missing(None));
        assert!(is_missing(Some("")));
        assert!(is_missing(Some("   ")));
        assert!(is_missing(Some("NaN")));
        assert!(is_missing(Some("nan")));
        assert!(!is_missing(Some("0")));
        assert!(!is_missing(Some("nancy")));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email(Some("jane.doe+tag@example.co.uk")));
        assert!(!is_valid_email(Some("jane.doe@example")));
        assert!(!is_valid_email(Some("jane doe@example.com")));
        assert!(!is_valid_email(None));
    }
}
