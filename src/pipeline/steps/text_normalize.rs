use tracing::debug;

use super::{CleaningStep, StepResult};
use crate::error::Result;
use crate::metrics::MetricName;
use crate::table::{RecordTable, Value};

pub const STEP_NAME: &str = "normalize_text";

pub struct TextNormalizeStep {
    columns: Vec<String>,
}

impl TextNormalizeStep {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

/// Trim, then uppercase every letter that follows a non-letter and lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.trim().chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

impl CleaningStep for TextNormalizeStep {
    fn execute(&self, table: &mut RecordTable) -> Result<StepResult> {
        let indices = self
            .columns
            .iter()
            .map(|c| table.require_column(c))
            .collect::<Result<Vec<_>>>()?;

        let mut changed = 0;
        for (column, idx) in self.columns.iter().zip(indices) {
            let mut column_changed = 0;
            for row in 0..table.len() {
                let normalized = match &table.rows()[row][idx] {
                    Value::Text(s) => {
                        let n = title_case(s);
                        (n != *s).then_some(n)
                    }
                    _ => None,
                };
                if let Some(n) = normalized {
                    table.set(row, idx, Value::Text(n));
                    column_changed += 1;
                }
            }
            debug!("Normalized {} {} values", column_changed, column);
            metrics::counter!(MetricName::TextCellsNormalized.as_str(), "column" => column.clone())
                .increment(column_changed as u64);
            changed += column_changed;
        }

        Ok(StepResult::new(
            STEP_NAME,
            table.len(),
            changed,
            format!("Normalized {} text values", changed),
        ))
    }

    fn step_name(&self) -> &'static str {
        STEP_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case(" computer science "), "Computer Science");
        assert_eq!(title_case("DATA   ANALYTICS"), "Data   Analytics");
        assert_eq!(title_case("o'neil studies"), "O'Neil Studies");
        assert_eq!(title_case("3d modeling"), "3D Modeling");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_only_text_cells_touched() {
        let mut table = RecordTable::from_rows(
            vec!["course".into()],
            vec![
                vec![Value::text("  machine learning")],
                vec![Value::text("Biology")],
                vec![Value::Int(101)],
                vec![Value::Null],
            ],
        )
        .unwrap();

        let result = TextNormalizeStep::new(vec!["course".into()]).execute(&mut table).unwrap();

        assert_eq!(result.changed_count, 1);
        assert_eq!(table.get(0, "course"), Some(&Value::text("Machine Learning")));
        assert_eq!(table.get(2, "course"), Some(&Value::Int(101)));
        assert_eq!(table.get(3, "course"), Some(&Value::Null));
    }
}
