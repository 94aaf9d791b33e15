use tracing::{info, warn};

use super::{CleaningStep, StepResult};
use crate::config::FilterConfig;
use crate::error::Result;
use crate::metrics::MetricName;
use crate::table::RecordTable;

pub const STEP_NAME: &str = "filter_range";

/// Keeps rows whose numeric value in `column` lies in `[min, max]`. Null and
/// non-numeric cells fail the predicate.
pub struct RangeFilterStep {
    column: String,
    min: i64,
    max: i64,
}

impl RangeFilterStep {
    pub fn new(config: &FilterConfig) -> Self {
        Self { column: config.column.clone(), min: config.min, max: config.max }
    }
}

impl CleaningStep for RangeFilterStep {
    fn execute(&self, table: &mut RecordTable) -> Result<StepResult> {
        let idx = table.require_column(&self.column)?;
        let before = table.len();
        let (min, max) = (self.min as f64, self.max as f64);

        let mut non_numeric = 0;
        let removed = table.retain_rows(|row| match row[idx].as_f64() {
            Some(v) => v >= min && v <= max,
            None => {
                non_numeric += 1;
                false
            }
        });

        if non_numeric > 0 {
            warn!("{} rows had no numeric {} and were excluded", non_numeric, self.column);
        }
        info!(
            "Removed {} records with {} outside {}-{} range",
            removed, self.column, self.min, self.max
        );
        metrics::counter!(MetricName::RowsRemoved.as_str()).increment(removed as u64);

        Ok(StepResult::new(
            STEP_NAME,
            before,
            removed,
            format!(
                "Removed {} records with {} outside {}-{} range",
                removed, self.column, self.min, self.max
            ),
        )
        .with_metadata("removed", removed)
        .with_metadata("non_numeric", non_numeric))
    }

    fn step_name(&self) -> &'static str {
        STEP_NAME
    }
}
