//! CSV loading with per-column type inference.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{Cell, CellType, Table};

/// Load a CSV file with a header row into a table.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = read_csv(file)?;
    debug!(
        path = %path.display(),
        rows = table.height(),
        columns = table.width(),
        "Parsed CSV file"
    );
    Ok(table)
}

/// Read CSV data with a header row into a table.
///
/// Column types: all integers stay `Int`, any float promotes the column to
/// `Float`, anything non-numeric makes it `Str`. Empty fields do not take
/// part in inference and load as the column's zero value.
pub fn read_csv<R: io::Read>(reader: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let column_names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if column_names.is_empty() || column_names.iter().all(String::is_empty) {
        return Err(Error::Csv("missing header row".to_string()));
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); column_names.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in raw.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let column_types: Vec<CellType> = raw.iter().map(|fields| infer_type(fields)).collect();
    let columns = raw
        .iter()
        .zip(&column_types)
        .map(|(fields, ty)| fields.iter().map(|f| convert(f, *ty)).collect())
        .collect();

    Table::new(column_names, column_types, columns)
}

fn is_integer(field: &str) -> bool {
    field.parse::<i64>().is_ok()
}

fn is_float(field: &str) -> bool {
    // Rejects "inf" and "NaN", which f64 parsing would otherwise accept
    field.bytes().any(|b| b.is_ascii_digit()) && field.parse::<f64>().is_ok()
}

fn infer_type(fields: &[String]) -> CellType {
    let mut inferred = None;
    for field in fields.iter().filter(|f| !f.is_empty()) {
        let field_type = if is_integer(field) {
            CellType::Int
        } else if is_float(field) {
            CellType::Float
        } else {
            return CellType::Str;
        };
        inferred = Some(match (inferred, field_type) {
            (Some(CellType::Float), _) | (_, CellType::Float) => CellType::Float,
            _ => CellType::Int,
        });
    }
    inferred.unwrap_or(CellType::Str)
}

fn convert(field: &str, ty: CellType) -> Cell {
    match ty {
        CellType::Int => Cell::Int(field.parse().unwrap_or(0)),
        CellType::Float => Cell::Float(field.parse().unwrap_or(0.0)),
        CellType::Str => Cell::Str(Arc::from(field)),
    }
}
