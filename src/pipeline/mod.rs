//! Linear cleaning pipeline: load, five in-memory stages, save.

pub mod loader;
pub mod steps;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::app::ports::{TableSinkPort, WriteSummary};
use crate::config::{CoercionPolicy, Config};
use crate::constants::PREVIEW_ROWS;
use crate::error::Result;
use crate::infra::csv_file_sink::CsvFileSink;
use crate::infra::http_client::ReqwestHttp;
use crate::metrics::MetricName;
use crate::table::{ColumnType, RecordTable};

pub use loader::{LoadedTable, Loader, Source};
pub use steps::{
    BinaryValuesStep, CleaningStep, MissingValuesStep, RangeFilterStep, StepResult,
    TextNormalizeStep, TypeStandardizeStep,
};

/// The seven states a run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Load,
    FillMissing,
    Standardize,
    Normalize,
    Filter,
    StandardizeBinary,
    Save,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 7] = [
        PipelineStage::Load,
        PipelineStage::FillMissing,
        PipelineStage::Standardize,
        PipelineStage::Normalize,
        PipelineStage::Filter,
        PipelineStage::StandardizeBinary,
        PipelineStage::Save,
    ];

    /// 1-based position in the run
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).map_or(0, |i| i + 1)
    }

    pub fn title(&self) -> &'static str {
        match self {
            PipelineStage::Load => "Loading Dataset",
            PipelineStage::FillMissing => "Handling Missing Values",
            PipelineStage::Standardize => "Standardizing Data Types",
            PipelineStage::Normalize => "Normalizing Text Data",
            PipelineStage::Filter => "Filtering Age Range",
            PipelineStage::StandardizeBinary => "Standardizing Binary Values",
            PipelineStage::Save => "Saving Cleaned Data",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}: {}", self.number(), self.title())
    }
}

/// Outcome of the in-memory stages.
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutcome {
    pub steps: Vec<StepResult>,
    pub warnings: Vec<String>,
}

impl CleanOutcome {
    fn changed_by(&self, step: &str) -> usize {
        self.steps
            .iter()
            .filter(|s| s.step == step)
            .map(|s| s.changed_count)
            .sum()
    }

    pub fn cells_filled(&self) -> usize {
        self.changed_by(steps::missing_values::STEP_NAME)
    }

    pub fn rows_removed(&self) -> usize {
        self.changed_by(steps::range_filter::STEP_NAME)
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub source: String,
    pub input_sha256: String,
    pub rows_loaded: usize,
    pub cells_filled: usize,
    pub rows_removed: usize,
    pub rows_written: usize,
    pub output: WriteSummary,
    pub dtypes: Vec<(String, ColumnType)>,
    pub steps: Vec<StepResult>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Pipeline {
    config: Config,
    loader: Loader,
    sink: Box<dyn TableSinkPort>,
}

impl Pipeline {
    pub fn new(config: Config, loader: Loader, sink: Box<dyn TableSinkPort>) -> Self {
        Self { config, loader, sink }
    }

    /// Reqwest-backed loader and a CSV file sink at the configured output path.
    pub fn from_config(config: Config) -> Result<Self> {
        let http = ReqwestHttp::new(Duration::from_secs(config.source.timeout_seconds))?;
        let sink = CsvFileSink::new(config.output.path.clone());
        Ok(Self::new(config, Loader::new(Box::new(http)), Box::new(sink)))
    }

    /// Stages 2 through 6 in run order.
    pub fn steps(&self) -> Vec<(PipelineStage, Box<dyn CleaningStep>)> {
        let c = &self.config;
        let mut steps: Vec<(PipelineStage, Box<dyn CleaningStep>)> = Vec::with_capacity(5);
        steps.push((PipelineStage::FillMissing, Box::new(MissingValuesStep::new(c.fill.clone()))));
        steps.push((PipelineStage::Standardize, Box::new(TypeStandardizeStep::new(&c.types))));
        steps.push((PipelineStage::Normalize, Box::new(TextNormalizeStep::new(c.text.columns.clone()))));
        steps.push((PipelineStage::Filter, Box::new(RangeFilterStep::new(&c.filter))));
        steps.push((
            PipelineStage::StandardizeBinary,
            Box::new(BinaryValuesStep::new(c.binary.columns.clone())),
        ));
        steps
    }

    /// Stage 1 on its own.
    pub fn load(&self) -> Result<LoadedTable> {
        let source = Source::parse(&self.config.source.input);
        announce(PipelineStage::Load);
        let loaded = self.loader.load(&source, &self.config.required_columns())?;

        let (rows, cols) = loaded.table.shape();
        println!("Dataset loaded successfully!");
        println!("\nInitial shape: ({rows}, {cols})");
        println!("\nColumns: {:?}", loaded.table.columns());
        println!("\nData Preview:\n{}", loaded.table.preview(PREVIEW_ROWS));
        Ok(loaded)
    }

    /// Run stages 2 through 6 over `table`, applying the coercion policy.
    pub fn clean(&self, table: &mut RecordTable) -> Result<CleanOutcome> {
        let mut outcome = CleanOutcome { steps: Vec::new(), warnings: Vec::new() };

        for (stage, step) in self.steps() {
            announce(stage);
            if stage == PipelineStage::FillMissing {
                print_missing(table);
            }

            let t_stage = Instant::now();
            let executed = step.execute(table);
            metrics::histogram!(MetricName::StageDuration.as_str(), "stage" => step.step_name())
                .record(t_stage.elapsed().as_secs_f64());

            match executed {
                Ok(result) => {
                    info!(step = result.step, changed = result.changed_count, "{}", result.message);
                    println!("\n{}", result.message);
                    if stage == PipelineStage::Standardize {
                        println!("\nCurrent data types:\n{}", table.dtype_listing());
                    }
                    outcome.steps.push(result);
                }
                Err(e) if e.is_coercion() => {
                    metrics::counter!(MetricName::CoercionFailures.as_str()).increment(1);
                    match self.config.types.on_error {
                        CoercionPolicy::Abort => {
                            error!("Error standardizing data types: {}", e);
                            return Err(e);
                        }
                        CoercionPolicy::KeepUnconverted => {
                            let msg = format!("Data types left unconverted: {e}");
                            warn!("{}", msg);
                            println!("\n{msg}");
                            outcome.warnings.push(msg);
                        }
                    }
                }
                Err(e) => {
                    error!("{} failed: {}", step.step_name(), e);
                    return Err(e);
                }
            }
        }
        Ok(outcome)
    }

    /// Stage 7 on its own.
    pub fn save(&self, table: &RecordTable) -> Result<WriteSummary> {
        announce(PipelineStage::Save);
        match self.sink.write(table) {
            Ok(summary) => {
                metrics::counter!(MetricName::RowsWritten.as_str()).increment(summary.rows as u64);
                println!("\nCleaned dataset saved successfully to {}", summary.path.display());
                Ok(summary)
            }
            Err(e) => {
                error!("Error saving cleaned dataset: {}", e);
                Err(e)
            }
        }
    }

    /// Run all seven stages and optionally persist the JSON run report.
    pub fn run(&self) -> Result<PipelineResult> {
        self.run_with_id(Uuid::new_v4())
    }

    #[instrument(name = "clean_run", skip(self, run_id), fields(run_id = %run_id))]
    fn run_with_id(&self, run_id: Uuid) -> Result<PipelineResult> {
        let started_at = Utc::now();
        let t_pipeline = Instant::now();
        info!("Starting cleaning run for {}", self.config.source.input);

        let LoadedTable { mut table, sha256, .. } = self.load()?;
        let rows_loaded = table.len();

        let outcome = self.clean(&mut table)?;
        let output = self.save(&table)?;

        print_summary(&table);
        metrics::histogram!(MetricName::PipelineDuration.as_str())
            .record(t_pipeline.elapsed().as_secs_f64());

        let result = PipelineResult {
            run_id,
            source: self.config.source.input.clone(),
            input_sha256: sha256,
            rows_loaded,
            cells_filled: outcome.cells_filled(),
            rows_removed: outcome.rows_removed(),
            rows_written: output.rows,
            output,
            dtypes: table.dtypes(),
            steps: outcome.steps,
            warnings: outcome.warnings,
            started_at,
            finished_at: Utc::now(),
        };

        if let Some(report) = &self.config.output.report {
            persist_report(&result, report)?;
            info!("Saved run report to {}", report.display());
        }
        info!(
            "Cleaning run finished: {} loaded, {} removed, {} written",
            result.rows_loaded, result.rows_removed, result.rows_written
        );
        Ok(result)
    }
}

fn announce(stage: PipelineStage) {
    info!("{}", stage);
    println!("\n{stage}...");
}

fn print_missing(table: &RecordTable) {
    println!("\n=== Missing Values Analysis ===");
    println!("\nMissing values per column:");
    let width = table.columns().iter().map(|c| c.len()).max().unwrap_or(0);
    for (column, nulls) in table.null_counts() {
        println!("{column:<width$}  {nulls}");
    }
}

fn print_summary(table: &RecordTable) {
    println!("\n=== Final Data Summary ===");
    println!("Final number of records: {}", table.len());
    println!("\nSample of cleaned data:\n{}", table.preview(PREVIEW_ROWS));
    println!("\nColumn info:\n{}", table.dtype_listing());
}

/// Write the run report as pretty JSON.
pub fn persist_report(result: &PipelineResult, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json)?;
    Ok(path.to_path_buf())
}
