use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use dq_pipeline::app::{compare_runs, timeline, CleaningService, SubmitRequest};
use dq_pipeline::config::Config;
use dq_pipeline::infra::{CasFsStore, HttpDeliverabilityClient, InMemorySessionStore, SqliteRunStore};
use dq_pipeline::logging::init_logging;
use dq_pipeline::observability;
use dq_pipeline::pipeline::{DataFilters, DataSource, Orchestrator, ReportFormat, DEFAULT_PAGE_LIMIT};
use dq_pipeline::types::{FixType, ReviewDecision, RunMode};
use dq_pipeline::DqError;

#[derive(Parser)]
#[command(name = "dq_pipeline")]
#[command(about = "Clean tabular contact records and review the proposed fixes")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to dq.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a Prometheus text snapshot of this invocation's metrics
    #[arg(long, global = true)]
    metrics: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Review,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => RunMode::Auto,
            ModeArg::Review => RunMode::Review,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Original,
    Cleaned,
}

impl From<SourceArg> for DataSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Original => DataSource::Original,
            SourceArg::Cleaned => DataSource::Cleaned,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a cleaning pass over a CSV file
    Clean {
        #[arg(long)]
        project: String,
        /// CSV file to clean
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "review")]
        mode: ModeArg,
        /// Check well-formed emails against the deliverability service
        #[arg(long)]
        verify_emails: bool,
        /// Report shape: document or rows
        #[arg(long, default_value = "document")]
        format: String,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        run_by: Option<String>,
    },
    /// Show the changes proposed for a run
    Review {
        #[arg(long)]
        run: Uuid,
        /// Only these fix types (comma-separated), e.g. email,phone,unify
        #[arg(long)]
        only: Option<String>,
    },
    /// Review progress figures for a run
    Stats {
        #[arg(long)]
        run: Uuid,
    },
    /// Apply reviewer decisions and finalize a run
    Apply {
        #[arg(long)]
        run: Uuid,
        /// JSON array of decisions
        #[arg(long)]
        decisions: PathBuf,
        #[arg(long)]
        actor: Option<String>,
        /// Copy the cleaned CSV here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Page through the original or cleaned file of a run
    Data {
        #[arg(long)]
        run: Uuid,
        #[arg(long, value_enum, default_value = "cleaned")]
        source: SourceArg,
        /// JSON object of row filters, e.g. {"email":true,"missing_fields":true}
        #[arg(long)]
        filters: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: usize,
    },
    /// Print the audit trail of a finalized run
    Changelog {
        #[arg(long)]
        run: Uuid,
    },
    /// Compare two runs of a project by run number
    Compare {
        #[arg(long)]
        project: String,
        #[arg(long)]
        a: u32,
        #[arg(long)]
        b: u32,
    },
    /// Quality history of a project
    Timeline {
        #[arg(long)]
        project: String,
    },
    /// List the runs of a project
    Runs {
        #[arg(long)]
        project: String,
    },
    /// Attach free-form notes to a run
    Notes {
        #[arg(long)]
        run: Uuid,
        /// New notes; omit to clear
        #[arg(long)]
        text: Option<String>,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_fix_types(list: &str) -> Vec<FixType> {
    list.split(',')
        .filter_map(|s| {
            let parsed = FixType::parse(s);
            if parsed.is_none() {
                warn!(filter = s.trim(), "Ignoring unknown fix type filter");
            }
            parsed
        })
        .collect()
}

fn parse_data_filters(raw: Option<&str>) -> DataFilters {
    match raw {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring malformed data filters");
            DataFilters::default()
        }),
        None => DataFilters::default(),
    }
}

async fn build_orchestrator(config: &Config) -> Result<Orchestrator, DqError> {
    let orchestrator = Orchestrator::from_config(config);
    let api = config.email_api.clone();
    // the blocking client owns a runtime of its own and must be built off the async workers
    let client = tokio::task::spawn_blocking(move || HttpDeliverabilityClient::from_config(&api))
        .await
        .map_err(|e| DqError::Task(e.to_string()))?;
    match client {
        Ok(client) => Ok(orchestrator.with_deliverability_check(Arc::new(client))),
        Err(e) => {
            warn!(error = %e, "Deliverability client unavailable, emails will be checked by format only");
            Ok(orchestrator)
        }
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let db_path = config.runs_db_path();
    let runs = Arc::new(
        SqliteRunStore::open(&db_path).with_context(|| format!("Failed to open run store at {}", db_path.display()))?,
    );
    let artifacts = Arc::new(CasFsStore::new(config.artifacts_dir()));
    let sessions = Arc::new(InMemorySessionStore::new(config.session.ttl()));
    let orchestrator = build_orchestrator(&config).await?;
    let service = CleaningService::new(config, orchestrator, sessions, runs, artifacts);

    match cli.command {
        Commands::Clean {
            project,
            file,
            mode,
            verify_emails,
            format,
            output,
            run_by,
        } => {
            let format = ReportFormat::parse(&format).unwrap_or_else(|| {
                warn!(format = %format, "Unknown report format, using document");
                ReportFormat::Document
            });
            let bytes = std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());

            let request = SubmitRequest {
                project,
                file_name,
                bytes,
                mode: mode.into(),
                run_by,
                verify_emails_api: verify_emails,
            };
            let result = match service.submit(request).await {
                Ok(result) => result,
                Err(DqError::Input(e)) => {
                    print_json(&e.to_document())?;
                    return Err(DqError::Input(e).into());
                }
                Err(e) => return Err(e.into()),
            };

            let rendered = format.render(&result.dataset, &result.run.report)?;
            let text = serde_json::to_string_pretty(&rendered)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("📄 Report written to {}", path.display());
                }
                None => println!("{}", text),
            }
            println!(
                "✅ Run #{} ({}) quality score {} with {} changes, {} awaiting review",
                result.run.run_number,
                result.run.id,
                result.run.quality_score,
                result.run.total_changes,
                result.run.needs_review_count
            );
        }
        Commands::Review { run, only } => {
            let filter = only.as_deref().map(parse_fix_types);
            let view = service.review(run, filter.as_deref()).await?;
            print_json(&view)?;
        }
        Commands::Stats { run } => {
            print_json(&service.review_stats(run).await?)?;
        }
        Commands::Apply {
            run,
            decisions,
            actor,
            output,
        } => {
            let raw = std::fs::read(&decisions).with_context(|| format!("Failed to read {}", decisions.display()))?;
            let decisions: Vec<ReviewDecision> =
                serde_json::from_slice(&raw).context("Decisions file must be a JSON array of decisions")?;
            let result = service.apply(run, decisions, actor).await?;
            if let Some(path) = output {
                let cleaned = service.artifact(&result.cleaned_ref).await?;
                std::fs::write(&path, cleaned).with_context(|| format!("Failed to write {}", path.display()))?;
                println!("📄 Cleaned CSV written to {}", path.display());
            }
            println!(
                "✅ Applied: {} accepted, {} overridden, {} rejected, {} skipped",
                result.accepted, result.overridden, result.rejected, result.skipped
            );
        }
        Commands::Data {
            run,
            source,
            filters,
            offset,
            limit,
        } => {
            let filters = parse_data_filters(filters.as_deref());
            print_json(&service.data(run, source.into(), &filters, offset, limit).await?)?;
        }
        Commands::Changelog { run } => {
            print_json(&service.changelog(run).await?)?;
        }
        Commands::Compare { project, a, b } => {
            let runs = service.runs_for_project(&project).await?;
            let find = |n: u32| {
                runs.iter()
                    .find(|r| r.run_number == n)
                    .with_context(|| format!("Project '{}' has no run #{}", project, n))
            };
            print_json(&compare_runs(find(a)?, find(b)?))?;
        }
        Commands::Timeline { project } => {
            let runs = service.runs_for_project(&project).await?;
            print_json(&timeline(&runs))?;
        }
        Commands::Runs { project } => {
            for run in service.runs_for_project(&project).await? {
                println!(
                    "#{:<4} {}  {:<14} score {:>6}  {}",
                    run.run_number,
                    run.id,
                    format!("{:?}", run.status),
                    run.quality_score,
                    run.file_name
                );
            }
        }
        Commands::Notes { run, text } => {
            let updated = service.update_notes(run, text).await?;
            info!(run_id = %updated.id, "Notes updated");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logs_dir());

    let metrics_path = cli.metrics.clone();
    if metrics_path.is_some() {
        if let Err(e) = observability::init() {
            warn!(error = %e, "Metrics disabled");
        }
    }

    let outcome = run(cli, config).await;

    if let (Some(path), Some(snapshot)) = (metrics_path, observability::render()) {
        std::fs::write(&path, snapshot).with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    if let Err(e) = outcome {
        error!(error = %e, "Command failed");
        println!("❌ {:#}", e);
        return Err(e);
    }
    Ok(())
}
