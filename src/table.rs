use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::error::{CleanerError, Result};

/// A single cell of the record table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Text counts when it parses as a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    fn kind(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ColumnType::Int64),
            Value::Float(_) => Some(ColumnType::Float64),
            Value::Text(_) => Some(ColumnType::Text),
            Value::Date(_) => Some(ColumnType::Date),
        }
    }
}

impl fmt::Display for Value {
    /// CSV rendering: null is the empty string, dates are ISO `YYYY-MM-DD`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Summary type of a column, as reported in the dtype listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int64,
    Float64,
    Text,
    Date,
    Null,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Null => "null",
        }
    }

    fn merge(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (Null, t) | (t, Null) => t,
            (a, b) if a == b => a,
            (Int64, Float64) | (Float64, Int64) => Float64,
            _ => Text,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rows over an ordered set of named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CleanerError::RaggedRow {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| CleanerError::MissingColumn(name.to_string()))
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn set(&mut self, row: usize, idx: usize, value: Value) {
        self.rows[row][idx] = value;
    }

    /// Replace the whole column in one go. `values` must have one entry per row.
    pub fn replace_column(&mut self, idx: usize, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// Keep rows matching `keep`, returning how many were dropped.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Value]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    pub fn null_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let nulls = self.column_values(idx).filter(|v| v.is_null()).count();
                (name.clone(), nulls)
            })
            .collect()
    }

    pub fn column_type(&self, idx: usize) -> ColumnType {
        self.column_values(idx)
            .filter_map(Value::kind)
            .fold(ColumnType::Null, ColumnType::merge)
    }

    pub fn dtypes(&self) -> Vec<(String, ColumnType)> {
        (0..self.columns.len())
            .map(|idx| (self.columns[idx].clone(), self.column_type(idx)))
            .collect()
    }

    /// Plain-text rendering of the first `n` rows with a leading row index.
    pub fn preview(&self, n: usize) -> String {
        let shown: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(n)
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_null() { "null".to_string() } else { v.to_string() })
                    .collect()
            })
            .collect();

        let index_width = shown.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                shown
                    .iter()
                    .map(|cells| cells[idx].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (name, &width) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {name:>width$}"));
        }
        for (i, cells) in shown.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{i:<index_width$}"));
            for (cell, &width) in cells.iter().zip(&widths) {
                out.push_str(&format!("  {cell:>width$}"));
            }
        }
        out
    }

    pub fn dtype_listing(&self) -> String {
        let width = self.columns.iter().map(|c| c.len()).max().unwrap_or(0);
        self.dtypes()
            .iter()
            .map(|(name, ty)| format!("{name:<width$}  {ty}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordTable {
        RecordTable::from_rows(
            vec!["age".into(), "course".into()],
            vec![
                vec![Value::Int(20), Value::text("math")],
                vec![Value::Null, Value::text("art")],
                vec![Value::Float(31.5), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_columns() {
        let table = sample();
        assert_eq!(table.shape(), (3, 2));
        assert_eq!(table.column_index("course"), Some(1));
        assert!(matches!(
            table.require_column("missing"),
            Err(CleanerError::MissingColumn(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = sample();
        assert!(table.push_row(vec![Value::Int(1)]).is_err());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_column_type_merging() {
        let table = sample();
        assert_eq!(table.column_type(0), ColumnType::Float64);
        assert_eq!(table.column_type(1), ColumnType::Text);

        let empty = RecordTable::from_rows(vec!["x".into()], vec![vec![Value::Null]]).unwrap();
        assert_eq!(empty.column_type(0), ColumnType::Null);
    }

    #[test]
    fn test_null_counts() {
        let counts = sample().null_counts();
        assert_eq!(counts, vec![("age".to_string(), 1), ("course".to_string(), 1)]);
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(Value::text(" 42 ").as_f64(), Some(42.0));
        assert_eq!(Value::text("forty").as_f64(), None);
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_display_rendering() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-01-15");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Float(22.5).to_string(), "22.5");
    }

    #[test]
    fn test_retain_rows_reports_removed() {
        let mut table = sample();
        let removed = table.retain_rows(|row| !row[0].is_null());
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_preview_limits_rows() {
        let preview = sample().preview(2);
        assert_eq!(preview.lines().count(), 3);
        assert!(preview.contains("math"));
        assert!(!preview.contains("31.5"));
    }
}
