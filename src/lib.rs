pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub use error::{DqError, InputError, Result};
pub use pipeline::{run_pipeline, Orchestrator, Report, RunOptions};
pub use types::{Change, ChangeStatus, Dataset, FixType, ReviewDecision};
