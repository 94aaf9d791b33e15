use std::io::{Read, Write};

use crate::constants::is_null_token;
use crate::error::{CleanerError, Result};
use crate::table::{RecordTable, Value};

#[derive(Clone, Copy, PartialEq)]
enum Inferred {
    Int,
    Float,
    Text,
}

/// Parse CSV with a header row into a table, inferring one type per column.
pub fn read_table<R: Read>(reader: R, source: &str) -> Result<RecordTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CleanerError::EmptyInput(source.to_string()));
    }

    let mut raw: Vec<Vec<Option<String>>> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        raw.push(
            record
                .iter()
                .map(|field| if is_null_token(field) { None } else { Some(field.to_string()) })
                .collect(),
        );
    }

    let kinds: Vec<Inferred> = (0..headers.len())
        .map(|idx| infer_column(raw.iter().filter_map(|row| row[idx].as_deref())))
        .collect();

    let mut table = RecordTable::new(headers);
    for row in raw {
        let cells = row
            .into_iter()
            .zip(&kinds)
            .map(|(cell, kind)| match cell {
                None => Value::Null,
                Some(s) => convert(s, *kind),
            })
            .collect();
        table.push_row(cells)?;
    }
    Ok(table)
}

fn infer_column<'a>(mut cells: impl Iterator<Item = &'a str> + Clone) -> Inferred {
    if cells.clone().all(|s| s.trim().parse::<i64>().is_ok()) {
        Inferred::Int
    } else if cells.all(|s| s.trim().parse::<f64>().is_ok()) {
        Inferred::Float
    } else {
        Inferred::Text
    }
}

fn convert(s: String, kind: Inferred) -> Value {
    match kind {
        Inferred::Int => s.trim().parse().map(Value::Int).unwrap_or(Value::Text(s)),
        Inferred::Float => s.trim().parse().map(Value::Float).unwrap_or(Value::Text(s)),
        Inferred::Text => Value::Text(s),
    }
}

/// Header row then one record per row, in the table's column order.
pub fn write_table<W: Write>(writer: W, table: &RecordTable) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}
