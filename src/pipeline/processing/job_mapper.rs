/// Business function -> lowercase keywords. Scanned top to bottom, so a
/// title matching several functions lands in the first one listed.
pub const JOB_FUNCTIONS: &[(&str, &[&str])] = &[
    ("Engineering", &["engineer", "civil", "mechanical", "electrical"]),
    (
        "Management",
        &["manager", "director", "vp", "chief", "head", "lead", "president", "managing"],
    ),
    ("Sales", &["sales", "account", "business development", "ae", "sdr"]),
    ("Marketing", &["marketing", "growth", "seo", "content", "brand"]),
    ("IT", &["developer", "software", "it", "tech", "data", "sysadmin", "programmer"]),
    ("HR", &["hr", "human resource", "talent", "recruiter", "people", "payroll"]),
    ("Finance", &["finance", "accountant", "cfo", "financial", "audit", "tax"]),
    ("Legal", &["legal", "lawyer", "attorney", "counsel", "jurist"]),
    ("Medical", &["medical", "doctor", "nurse", "physician", "surgeon", "clinic"]),
    ("Education", &["teacher", "professor", "educator", "tutor", "academic", "lecturer"]),
    ("Operations", &["operations", "ops", "logistics", "supply chain"]),
    ("Admin", &["admin", "assistant", "clerk", "secretary", "receptionist"]),
    ("Production", &["production", "manufacturing", "plant", "operator"]),
    ("R&D", &["research", "scientist", "r&d", "lab"]),
    ("Consulting", &["consultant", "advisor"]),
];

pub const OTHER_FUNCTION: &str = "Other";
pub const UNKNOWN_FUNCTION: &str = "Unknown";

/// Classify a job title into a business function.
///
/// Keywords match as plain substrings of the lowercased title, so short
/// keywords such as `it` also hit inside longer words.
pub fn map_job_title(title: Option<&str>) -> (&'static str, f64) {
    let title = match title {
        Some(t) => t.to_lowercase(),
        None => return (UNKNOWN_FUNCTION, 0.0),
    };

    JOB_FUNCTIONS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| title.contains(k)))
        .map(|(function, _)| (*function, 0.9))
        .unwrap_or((OTHER_FUNCTION, 0.5))
}
