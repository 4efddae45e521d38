use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DqError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input rejected: {0}")]
    Input(#[from] InputError),

    #[error("Review session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Run not found: {0}")]
    RunNotFound(Uuid),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Review for run {0} was already finalized")]
    AlreadyFinalized(Uuid),

    #[error("Invalid decision for change {change_id}: {message}")]
    InvalidDecision { change_id: String, message: String },

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Dataset-level failures. These are the only conditions that abort a run;
/// everything row-level degrades to a low-confidence change instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Invalid CSV: {0}")]
    Unreadable(String),

    #[error("CSV file is empty")]
    Empty,
}

impl InputError {
    /// The `{"error": "..."}` document handed back in place of a report.
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

pub type Result<T> = std::result::Result<T, DqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_renders_error_document() {
        let doc = InputError::Empty.to_document();
        assert_eq!(doc["error"], "CSV file is empty");

        let doc = InputError::Unreadable("missing header".into()).to_document();
        assert_eq!(doc["error"], "Invalid CSV: missing header");
    }
}
