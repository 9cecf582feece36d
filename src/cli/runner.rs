//! CLI runner - executes the pipeline and maps the outcome to an exit status

use crate::cli::commands::Cli;
use crate::config::load_config;
use crate::dataset::Table;
use crate::error::{Result, ResultExt};
use crate::output::arrow_to_json;
use crate::pipeline::{run_pipeline, PipelineSummary};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Daily statistics rows echoed at debug level after a run
const PREVIEW_ROWS: usize = 5;

/// Process exit status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Pipeline completed
    Success,
    /// Interrupted by the user
    Interrupted,
    /// Any other failure
    Failed,
}

impl ExitStatus {
    /// Numeric process exit code
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Interrupted => 130,
            ExitStatus::Failed => 1,
        }
    }
}

/// Install the global tracing subscriber
///
/// INFO by default, DEBUG with `verbose`; `RUST_LOG` directives are
/// applied on top.
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load the configuration and run the pipeline once
    pub async fn run(&self) -> Result<PipelineSummary> {
        let config = load_config(&self.cli.config)
            .with_context(|| format!("Cannot start pipeline from '{}'", self.cli.config.display()))?;
        run_pipeline(&config).await
    }

    /// Run the pipeline until it finishes or the user interrupts it
    pub async fn execute(self) -> ExitStatus {
        info!(
            "Starting ETL Pipeline in environment: {}",
            self.cli.env.label()
        );
        let started = Instant::now();
        let task = tokio::spawn(async move { self.run().await });

        tokio::select! {
            joined = task => match joined {
                Ok(Ok(summary)) => {
                    info!(
                        "Collisions: {} rows in, {} out; holidays: {} out; weather: {} out",
                        summary.collisions.input_rows,
                        summary.collisions.output_rows,
                        summary.holidays.output_rows,
                        summary.weather.output_rows
                    );
                    if tracing::enabled!(Level::DEBUG) {
                        match preview_rows(&summary.gold.dataset.table, PREVIEW_ROWS) {
                            Ok(rows) => {
                                for row in rows {
                                    debug!("daily_stats: {row}");
                                }
                            }
                            Err(e) => warn!("Cannot render daily statistics preview: {e}"),
                        }
                    }
                    info!(
                        "ETL Pipeline completed successfully in {:.2} seconds",
                        started.elapsed().as_secs_f64()
                    );
                    ExitStatus::Success
                }
                Ok(Err(e)) => {
                    error!("Pipeline failed: {e}");
                    error!("{e:?}");
                    ExitStatus::Failed
                }
                Err(e) => {
                    error!("Pipeline task aborted: {e}");
                    ExitStatus::Failed
                }
            },
            () = interrupted() => {
                warn!("Pipeline execution interrupted by user");
                ExitStatus::Interrupted
            }
        }
    }
}

/// First `limit` rows of `table` as JSON objects
fn preview_rows(table: &Table, limit: usize) -> Result<Vec<Value>> {
    let mut rows = Vec::with_capacity(limit);
    for batch in table.batches() {
        if rows.len() >= limit {
            break;
        }
        let take = batch.num_rows().min(limit - rows.len());
        rows.extend(arrow_to_json(&batch.slice(0, take))?);
    }
    Ok(rows)
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for interrupts: {e}");
        std::future::pending::<()>().await;
    }
}
