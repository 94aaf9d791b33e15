use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use super::{CleaningStep, StepResult};
use crate::config::TypesConfig;
use crate::error::{CleanerError, Result};
use crate::table::{RecordTable, Value};

pub const STEP_NAME: &str = "standardize_types";

/// Casts integer and date columns. Cells are converted into buffers first and
/// only written back once every configured column has converted cleanly.
pub struct TypeStandardizeStep {
    integer_columns: Vec<String>,
    date_columns: Vec<String>,
    date_formats: Vec<String>,
}

impl TypeStandardizeStep {
    pub fn new(config: &TypesConfig) -> Self {
        Self {
            integer_columns: config.integer_columns.clone(),
            date_columns: config.date_columns.clone(),
            date_formats: config.date_formats.clone(),
        }
    }

    fn convert_column<F>(
        table: &RecordTable,
        column: &str,
        target: &'static str,
        convert: F,
    ) -> Result<(usize, Vec<Value>)>
    where
        F: Fn(&Value) -> Option<Value>,
    {
        let idx = table.require_column(column)?;
        let converted = table
            .column_values(idx)
            .enumerate()
            .map(|(row, value)| {
                convert(value).ok_or_else(|| CleanerError::Coercion {
                    column: column.to_string(),
                    row,
                    value: value.to_string(),
                    target,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((idx, converted))
    }

    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        self.date_formats.iter().find_map(|fmt| {
            NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(raw, fmt).ok().map(|dt| dt.date()))
        })
    }
}

/// Integer view of a cell. Floats are truncated toward zero.
pub fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => truncate(*f),
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        Value::Null | Value::Date(_) => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

impl CleaningStep for TypeStandardizeStep {
    fn execute(&self, table: &mut RecordTable) -> Result<StepResult> {
        let mut staged: Vec<(String, usize, Vec<Value>)> = Vec::new();

        for column in &self.integer_columns {
            let (idx, values) =
                Self::convert_column(table, column, "integer", |v| to_integer(v).map(Value::Int))?;
            staged.push((column.clone(), idx, values));
        }
        for column in &self.date_columns {
            let (idx, values) = Self::convert_column(table, column, "date", |v| match v {
                Value::Date(d) => Some(Value::Date(*d)),
                Value::Text(s) => self.parse_date(s).map(Value::Date),
                _ => None,
            })?;
            staged.push((column.clone(), idx, values));
        }

        let mut changed = 0;
        let mut result = StepResult::new(STEP_NAME, table.len(), 0, String::new());
        for (column, idx, values) in staged {
            changed += table
                .column_values(idx)
                .zip(&values)
                .filter(|(old, new)| old != new)
                .count();
            table.replace_column(idx, values);
            let dtype = table.column_type(idx);
            debug!("Converted {} to {}", column, dtype);
            result = result.with_metadata(format!("dtype.{column}"), dtype);
        }

        info!("Data types standardized ({} cells rewritten)", changed);
        result.changed_count = changed;
        result.message = "Data types standardized successfully".to_string();
        Ok(result)
    }

    fn step_name(&self) -> &'static str {
        STEP_NAME
    }
}
