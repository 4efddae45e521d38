//! Dictionary + fuzzy-match correctors for free-text fields.
//!
//! Every corrector returns `(suggestion, confidence)` and never fails: when
//! nothing in the reference list is close enough the input comes back
//! title-cased at a neutral confidence so the caller can still route it to review.

use crate::constants::{PLACEHOLDER_DOMAIN, PLACEHOLDER_LOCAL_PART};

/// Fuzzy matches must beat this similarity to replace the input.
pub const FUZZY_ACCEPT: f64 = 0.7;

/// Confidence given to a title-cased fallback
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

pub const KNOWN_DOMAINS: &[&str] = &[
    "google.com",
    "microsoft.com",
    "amazon.com",
    "meta.com",
    "apple.com",
    "netflix.com",
    "tesla.com",
    "salesforce.com",
];

/// Lowercased spelling -> canonical company name. Order is the fuzzy tie-break.
pub const KNOWN_COMPANIES: &[(&str, &str)] = &[
    ("google", "Google"),
    ("gogle", "Google"),
    ("googl", "Google"),
    ("microsoft", "Microsoft"),
    ("microsft", "Microsoft"),
    ("micosoft", "Microsoft"),
    ("amazon", "Amazon"),
    ("amazn", "Amazon"),
    ("meta", "Meta"),
    ("facebook", "Meta"),
    ("apple", "Apple"),
    ("aplle", "Apple"),
    ("aple", "Apple"),
    ("netflix", "Netflix"),
    ("netflx", "Netflix"),
    ("netfix", "Netflix"),
    ("tesla", "Tesla"),
    ("tesle", "Tesla"),
    ("salesforce", "Salesforce"),
    ("salesforcce", "Salesforce"),
];

pub const JOB_TITLE_STANDARDS: &[(&str, &str)] = &[
    ("ceo", "Chief Executive Officer"),
    ("chief executive officer", "Chief Executive Officer"),
    ("chief exec", "Chief Executive Officer"),
    ("cto", "Chief Technology Officer"),
    ("chief technology officer", "Chief Technology Officer"),
    ("chief tech officer", "Chief Technology Officer"),
    ("sr. developer", "Senior Developer"),
    ("sr developer", "Senior Developer"),
    ("senior developer", "Senior Developer"),
    ("sr. dev", "Senior Developer"),
    ("software engineer", "Software Engineer"),
    ("software dev", "Software Engineer"),
    ("sw engineer", "Software Engineer"),
    ("founder", "Founder"),
    ("co-founder", "Co-Founder"),
    ("cofounder", "Co-Founder"),
    ("account executive", "Account Executive"),
    ("account exec", "Account Executive"),
    ("ae", "Account Executive"),
    ("sales rep", "Sales Representative"),
    ("sales representative", "Sales Representative"),
    ("growth marketer", "Growth Marketer"),
    ("marketing manager", "Marketing Manager"),
    ("growth hacker", "Growth Marketer"),
    ("hr business partner", "HR Business Partner"),
    ("hr manager", "HR Manager"),
    ("human resources", "HR Manager"),
];

/// Indel similarity in [0, 1]: `2 * lcs / (len_a + len_b)` over chars.
/// Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * longest_common_subsequence(&a, &b) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    // single rolling row of the classic DP table
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb { diagonal + 1 } else { above.max(row[j]) };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Highest-scoring candidate; the earliest one wins ties.
pub fn best_match<'a, I>(needle: &str, candidates: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = similarity(needle, candidate);
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((candidate, score)),
        }
    }
    best
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

fn dictionary_fix(value: &str, table: &[(&str, &str)]) -> (String, f64) {
    if value.trim().is_empty() {
        return (value.to_string(), 0.0);
    }

    let lowered = value.trim().to_lowercase();
    if let Some((_, canonical)) = table.iter().find(|(k, _)| *k == lowered) {
        return (canonical.to_string(), 1.0);
    }

    if let Some((key, score)) = best_match(&lowered, table.iter().map(|(k, _)| *k)) {
        if score > FUZZY_ACCEPT {
            if let Some((_, canonical)) = table.iter().find(|(k, _)| *k == key) {
                return (canonical.to_string(), score);
            }
        }
    }

    (title_case(value), FALLBACK_CONFIDENCE)
}

pub fn suggest_company_fix(name: &str) -> (String, f64) {
    dictionary_fix(name, KNOWN_COMPANIES)
}

pub fn standardize_job_title(title: &str) -> (String, f64) {
    dictionary_fix(title, JOB_TITLE_STANDARDS)
}

/// Closest known corporate domain. No acceptance threshold here; the
/// auto-apply policy decides what the score is good for.
pub fn suggest_domain_fix(domain: &str) -> (String, f64) {
    if domain.trim().is_empty() {
        return (domain.to_string(), 0.0);
    }
    let lowered = domain.trim().to_lowercase();
    match best_match(&lowered, KNOWN_DOMAINS.iter().copied()) {
        Some((matched, score)) => (matched.to_string(), score),
        None => (lowered, 0.0),
    }
}

/// Placeholder generator for emails no typo table can rescue. A value that
/// already has an `@` and a dotted domain is returned untouched.
pub fn fix_invalid_email(email: Option<&str>, domain_hint: Option<&str>) -> (String, f64) {
    if let Some(raw) = email {
        let trimmed = raw.trim();
        if let Some((_, domain)) = trimmed.rsplit_once('@') {
            if domain.contains('.') {
                return (trimmed.to_string(), 1.0);
            }
        }
    }

    match domain_hint.map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => (format!("{}@{}", PLACEHOLDER_LOCAL_PART, domain), 0.3),
        None => (format!("{}@{}", PLACEHOLDER_LOCAL_PART, PLACEHOLDER_DOMAIN), 0.1),
    }
}
