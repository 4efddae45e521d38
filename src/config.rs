use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::{DqError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "dq.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_root: PathBuf,
    pub pipeline: PipelineConfig,
    pub email_api: EmailApiConfig,
    pub session: SessionConfig,
    pub columns: ColumnKeywords,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            pipeline: PipelineConfig::default(),
            email_api: EmailApiConfig::default(),
            session: SessionConfig::default(),
            columns: ColumnKeywords::default(),
        }
    }
}

/// Project-level knobs for a cleaning pass
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum confidence for a suggestion to be written without review
    pub confidence_threshold: f64,
    /// Whether auto mode is allowed to apply high-confidence fixes
    pub auto_apply_high_confidence: bool,
    /// Call the external deliverability check for well-formed emails
    pub email_verification_api: bool,
    /// Region hint used when a phone number has no country prefix
    pub default_region: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: constants::DEFAULT_CONFIDENCE_THRESHOLD,
            auto_apply_high_confidence: true,
            email_verification_api: false,
            default_region: constants::DEFAULT_PHONE_REGION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailApiConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl EmailApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmailApiConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_EMAIL_API_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

/// Header keywords used to infer which column plays which semantic role.
/// Matching is case-insensitive substring, first column in header order wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnKeywords {
    pub company: Vec<String>,
    pub domain: Vec<String>,
    pub phone: Vec<String>,
    pub email: Vec<String>,
    pub job_title: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for ColumnKeywords {
    fn default() -> Self {
        Self {
            company: owned(&["company", "name"]),
            domain: owned(&["domain"]),
            phone: owned(&["phone", "mobile", "cell"]),
            email: owned(&["email"]),
            job_title: owned(&["job", "title"]),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or `dq.toml`), falling back to defaults
    /// when the file does not exist, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path).map_err(|e| {
                DqError::Config(format!("Failed to read config file '{}': {}", config_path.display(), e))
            })?;
            toml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("DQ_DATA_ROOT") {
            if !root.trim().is_empty() {
                self.data_root = PathBuf::from(root);
            }
        }
        if let Ok(url) = std::env::var("DQ_EMAIL_API_URL") {
            if !url.trim().is_empty() {
                self.email_api.url = url;
            }
        }
        if let Ok(region) = std::env::var("DQ_DEFAULT_REGION") {
            if !region.trim().is_empty() {
                self.pipeline.default_region = region.trim().to_uppercase();
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let t = self.pipeline.confidence_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(DqError::Config(format!("confidence_threshold must be within [0, 1], got {}", t)));
        }
        if self.pipeline.default_region.len() != 2 {
            return Err(DqError::Config(format!(
                "default_region must be a two-letter region code, got '{}'",
                self.pipeline.default_region
            )));
        }
        Ok(())
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_root.join("artifacts")
    }

    pub fn runs_db_path(&self) -> PathBuf {
        self.data_root.join("runs.db")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_root.join("logs")
    }
}
