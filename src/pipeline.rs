//! Pipeline orchestration
//!
//! Runs the three layers in order: raw ingestion, standardization and
//! aggregation. Each phase completes before the next begins; the
//! configured [`Handoff`](crate::types::Handoff) decides whether a phase
//! passes its in-memory tables or its persisted locations forward.

use crate::aggregate::{GoldOutput, GoldProcessor};
use crate::config::{ensure_directories, PipelineConfig};
use crate::engine::CsvOptions;
use crate::error::Result;
use crate::ingest::RawExtractor;
use crate::standardize::{SilverProcessor, StandardizeReport, COLLISION_TEXT_COLUMNS};
use tracing::info;

/// Row counts and outputs of a complete run
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    /// Collisions standardization counts
    pub collisions: StandardizeReport,
    /// Holidays standardization counts
    pub holidays: StandardizeReport,
    /// Weather standardization counts
    pub weather: StandardizeReport,
    /// Daily statistics
    pub gold: GoldOutput,
}

/// Run raw ingestion, standardization and aggregation
///
/// Query work runs on the blocking pool so the caller's runtime stays
/// responsive to interrupts.
pub async fn run_pipeline(config: &PipelineConfig) -> Result<PipelineSummary> {
    ensure_directories(&config.paths)?;
    let options = &config.pipeline;
    let sources = &config.sources;
    let bronze = &config.paths.bronze;

    info!("--- Phase 1: Raw ingestion ---");
    let extractor = RawExtractor::new(&config.http)?.with_parse_policy(options.parse_policy);
    let collisions = extractor
        .fetch_file(
            &sources.collisions.url,
            bronze.join(&sources.collisions.filename),
            CsvOptions::new().text_columns(COLLISION_TEXT_COLUMNS),
        )
        .await?;
    let holidays = extractor
        .fetch_paginated_api(
            &sources.holidays.url_base,
            &sources.holidays.country_code,
            sources.holidays.years.as_slice(),
            bronze.join(&sources.holidays.filename),
        )
        .await?;
    let weather = extractor
        .fetch_file(
            &sources.weather.url,
            bronze.join(&sources.weather.filename),
            CsvOptions::new().all_varchar(),
        )
        .await?;

    info!("--- Phase 2: Standardization ---");
    let silver = SilverProcessor::new(&config.paths.silver)
        .with_parse_policy(options.parse_policy)
        .with_start_date(options.start_date);
    let raw_inputs = [
        collisions.to_input(options.handoff),
        holidays.to_input(options.handoff),
        weather.to_input(options.handoff),
    ];
    let (collisions, holidays, weather) = tokio::task::spawn_blocking(move || {
        let [c, h, w] = raw_inputs;
        Ok::<_, crate::Error>((
            silver.process_collisions(&c)?,
            silver.process_holidays(&h)?,
            silver.process_weather(&w)?,
        ))
    })
    .await??;

    info!("--- Phase 3: Aggregation ---");
    let gold = GoldProcessor::new(&config.paths.gold)
        .with_start_date(options.start_date)
        .with_holiday_join(options.holiday_join);
    let silver_inputs = [
        collisions.dataset.to_input(options.handoff),
        holidays.dataset.to_input(options.handoff),
        weather.dataset.to_input(options.handoff),
    ];
    let gold = tokio::task::spawn_blocking(move || {
        let [c, h, w] = silver_inputs;
        gold.process(&c, &h, &w)
    })
    .await??;

    Ok(PipelineSummary {
        collisions: collisions.report,
        holidays: holidays.report,
        weather: weather.report,
        gold,
    })
}
