// Cleaning pipeline: per-field processing, the orchestrating pass,
// report rendering, data paging and the review/apply step

pub mod orchestrator;
pub mod preview;
pub mod processing;
pub mod report;
pub mod review;

pub use orchestrator::{run_pipeline, Orchestrator, PipelineOutcome, RunOptions};
pub use preview::{data_page, DataFilters, DataPage, DataSource, DEFAULT_PAGE_LIMIT};
pub use report::{Report, ReportFormat};
pub use review::{apply_review, ReviewOutcome};
