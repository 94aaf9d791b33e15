use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{CleaningStep, StepResult};
use crate::config::{FillRule, FillStrategy};
use crate::error::Result;
use crate::metrics::MetricName;
use crate::table::{RecordTable, Value};

pub const STEP_NAME: &str = "fill_missing";

/// Replaces nulls in configured columns with a per-column default computed from
/// the column's non-null values.
pub struct MissingValuesStep {
    rules: Vec<FillRule>,
}

impl MissingValuesStep {
    pub fn new(rules: Vec<FillRule>) -> Self {
        Self { rules }
    }

    fn fill_value(table: &RecordTable, idx: usize, strategy: &FillStrategy) -> Option<Value> {
        match strategy {
            FillStrategy::Median => {
                let values: Vec<f64> = table.column_values(idx).filter_map(Value::as_f64).collect();
                median(values).map(|m| {
                    if m.fract() == 0.0 && m.abs() < i64::MAX as f64 {
                        Value::Int(m as i64)
                    } else {
                        Value::Float(m)
                    }
                })
            }
            FillStrategy::Mode => mode(table.column_values(idx)),
            FillStrategy::Constant { value } => Some(Value::Text(value.clone())),
        }
    }
}

/// Median of the given values; the mean of the middle pair for even counts.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent non-null value. Ties go to the value whose rendering sorts first.
pub fn mode<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: BTreeMap<String, (usize, &Value)> = BTreeMap::new();
    for value in values.filter(|v| !v.is_null()) {
        counts.entry(value.to_string()).or_insert((0, value)).0 += 1;
    }

    let mut best: Option<(usize, &Value)> = None;
    for (count, value) in counts.into_values() {
        if best.map_or(true, |(top, _)| count > top) {
            best = Some((count, value));
        }
    }
    best.map(|(_, v)| v.clone())
}

impl CleaningStep for MissingValuesStep {
    fn execute(&self, table: &mut RecordTable) -> Result<StepResult> {
        // Resolve every column up front so a bad rule leaves the table untouched
        let indices = self
            .rules
            .iter()
            .map(|rule| table.require_column(&rule.column))
            .collect::<Result<Vec<_>>>()?;

        let mut result = StepResult::new(STEP_NAME, table.len(), 0, String::new());
        let mut total_filled = 0;

        for (rule, idx) in self.rules.iter().zip(indices) {
            let missing: Vec<usize> = table
                .column_values(idx)
                .enumerate()
                .filter(|(_, v)| v.is_null())
                .map(|(row, _)| row)
                .collect();
            result = result.with_metadata(format!("missing.{}", rule.column), missing.len());

            if missing.is_empty() {
                debug!("No missing values in {}", rule.column);
                continue;
            }

            let Some(fill) = Self::fill_value(table, idx, &rule.strategy) else {
                warn!(
                    "Column {} has no non-null values to derive a {:?} default from; {} nulls left",
                    rule.column,
                    rule.strategy,
                    missing.len()
                );
                continue;
            };

            info!("Filling {} missing {} values with {}", missing.len(), rule.column, fill);
            result = result.with_metadata(format!("fill.{}", rule.column), &fill);
            for row in &missing {
                table.set(*row, idx, fill.clone());
            }
            metrics::counter!(MetricName::CellsFilled.as_str(), "column" => rule.column.clone())
                .increment(missing.len() as u64);
            total_filled += missing.len();
        }

        result.changed_count = total_filled;
        result.message = format!(
            "Filled {} missing values across {} columns",
            total_filled,
            self.rules.len()
        );
        Ok(result)
    }

    fn step_name(&self) -> &'static str {
        STEP_NAME
    }
}
