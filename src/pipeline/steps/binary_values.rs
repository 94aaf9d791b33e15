use tracing::debug;

use super::{CleaningStep, StepResult};
use crate::constants::{NO_LABEL, NO_SPELLINGS, YES_LABEL, YES_SPELLINGS};
use crate::error::Result;
use crate::metrics::MetricName;
use crate::table::{RecordTable, Value};

pub const STEP_NAME: &str = "standardize_binary";

pub struct BinaryValuesStep {
    columns: Vec<String>,
}

impl BinaryValuesStep {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

/// Canonical label for a cell, or `None` when its spelling is not recognized.
pub fn recognize(value: &Value) -> Option<&'static str> {
    // Surrounding whitespace is ignored, so " yes " is Yes rather than unrecognized
    let key = value.to_string().trim().to_lowercase();
    if YES_SPELLINGS.contains(&key.as_str()) {
        Some(YES_LABEL)
    } else if NO_SPELLINGS.contains(&key.as_str()) {
        Some(NO_LABEL)
    } else {
        None
    }
}

/// Total mapping onto `"Yes"` / `"No"`; anything unrecognized is `"No"`.
pub fn standardize_label(value: &Value) -> &'static str {
    recognize(value).unwrap_or(NO_LABEL)
}

impl CleaningStep for BinaryValuesStep {
    fn execute(&self, table: &mut RecordTable) -> Result<StepResult> {
        let indices = self
            .columns
            .iter()
            .map(|c| table.require_column(c))
            .collect::<Result<Vec<_>>>()?;

        let mut changed = 0;
        let mut result = StepResult::new(STEP_NAME, table.len(), 0, String::new());
        for (column, idx) in self.columns.iter().zip(indices) {
            let mut unrecognized = 0;
            let labels: Vec<Value> = table
                .column_values(idx)
                .map(|v| {
                    let label = recognize(v).unwrap_or_else(|| {
                        unrecognized += 1;
                        NO_LABEL
                    });
                    Value::text(label)
                })
                .collect();
            changed += table
                .column_values(idx)
                .zip(&labels)
                .filter(|(old, new)| old != new)
                .count();
            table.replace_column(idx, labels);

            debug!("{} unrecognized {} values mapped to {}", unrecognized, column, NO_LABEL);
            metrics::counter!(MetricName::BinaryValuesUnrecognized.as_str(), "column" => column.clone())
                .increment(unrecognized as u64);
            result = result.with_metadata(format!("unrecognized.{column}"), unrecognized);
        }

        result.changed_count = changed;
        result.message = format!("Standardized {} binary values", changed);
        Ok(result)
    }

    fn step_name(&self) -> &'static str {
        STEP_NAME
    }
}
