/// Shared constants so column names and defaults stay consistent across the
/// orchestrator, the review step and the CLI.

// Auto-apply gate used when no project configuration overrides it
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

// Region hint for numbers written without a country prefix
pub const DEFAULT_PHONE_REGION: &str = "IN";

pub const DEFAULT_EMAIL_API_URL: &str = "https://rapid-email-verifier.fly.dev/api/validate";

// Derived column appended to the working dataset when a job-title column exists
pub const ROLE_FUNCTION_COLUMN: &str = "role_function";

// Duplicate changes address a whole row rather than a cell
pub const ROW_COLUMN: &str = "ROW";
pub const DUPLICATE_ORIGINAL_VALUE: &str = "Duplicate Row";
pub const DUPLICATE_SUGGESTED_VALUE: &str = "Marked for Remove";

// Placeholder local part for emails that cannot be recovered
pub const PLACEHOLDER_LOCAL_PART: &str = "unknown";
pub const PLACEHOLDER_DOMAIN: &str = "example.com";

pub const SYSTEM_ACTOR: &str = "system";
