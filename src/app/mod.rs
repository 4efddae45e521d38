pub mod cleaning_use_case;
pub mod ports;
pub mod run_insights;

pub use cleaning_use_case::{ApplyResult, CleaningService, ReviewStats, ReviewView, SubmitRequest, SubmitResult};
pub use run_insights::{compare_runs, timeline, RunComparison, Timeline, Trend};
