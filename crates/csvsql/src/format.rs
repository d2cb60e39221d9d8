//! Rendering of statement results.
//!
//! Rows are written either as CSV (header line, then comma-joined rows) or
//! as a fixed-width table. CSV streams straight from the view; the table
//! layout buffers rows to size its columns.

use std::io::{self, Write};

use csvsql_core::query::{LoadReport, QueryResult, TableSchema, TableView};
use csvsql_core::Cell;

use crate::OutputFormat;

/// Minimum width of a fixed-width table column
const MIN_COLUMN_WIDTH: usize = 10;
/// Width of each DESCRIBE column
const DESCRIBE_WIDTH: usize = 15;

/// Write one statement's result. `echo_timing` adds load times.
pub fn write_result<W: Write>(
    out: &mut W,
    result: QueryResult,
    format: OutputFormat,
    echo_timing: bool,
) -> io::Result<()> {
    match result {
        QueryResult::Exit => Ok(()),
        QueryResult::Described(schemas) => write_schemas(out, &schemas),
        QueryResult::Tables(names) => write_table_names(out, &names),
        QueryResult::Loaded(reports) => write_loaded(out, &reports, echo_timing),
        QueryResult::Rows(view) => write_rows(out, view, format).map(|_| ()),
    }
}

/// Drain `view` into `out`, returning the number of rows written.
pub fn write_rows<W: Write>(
    out: &mut W,
    mut view: TableView,
    format: OutputFormat,
) -> io::Result<usize> {
    let width = view.width();
    match format {
        OutputFormat::Csv => {
            writeln!(out, "{}", view.column_names().join(","))?;
            let mut count = 0;
            while !view.empty() {
                let row: Vec<String> = (0..width)
                    .map(|i| csv_field(&view.access_column(i)))
                    .collect();
                writeln!(out, "{}", row.join(","))?;
                view.advance_row();
                count += 1;
            }
            Ok(count)
        }
        OutputFormat::Table => {
            let header = view.column_names().to_vec();
            let mut rows: Vec<Vec<String>> = Vec::with_capacity(view.height());
            while !view.empty() {
                rows.push((0..width).map(|i| view.access_column(i).to_string()).collect());
                view.advance_row();
            }
            let widths: Vec<usize> = (0..width)
                .map(|i| {
                    rows.iter()
                        .map(|row| row[i].len())
                        .chain(std::iter::once(header[i].len()))
                        .fold(MIN_COLUMN_WIDTH, usize::max)
                })
                .collect();

            write_table_row(out, &header, &widths)?;
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            writeln!(out, "{}", rule.join("-+-"))?;
            for row in &rows {
                write_table_row(out, row, &widths)?;
            }
            Ok(rows.len())
        }
    }
}

fn write_table_row<W: Write>(out: &mut W, row: &[String], widths: &[usize]) -> io::Result<()> {
    let cells: Vec<String> = row
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:>width$}", cell, width = width))
        .collect();
    writeln!(out, "{}", cells.join(" | "))
}

/// Quote string fields that would otherwise break the row apart
fn csv_field(cell: &Cell) -> String {
    match cell {
        Cell::Str(s) if s.contains([',', '"', '\n', '\r']) => {
            format!("\"{}\"", s.replace('"', "\"\""))
        }
        other => other.to_string(),
    }
}

/// `Column | Type` listing for each described table
pub fn write_schemas<W: Write>(out: &mut W, schemas: &[TableSchema]) -> io::Result<()> {
    for schema in schemas {
        writeln!(out, "{}", schema.name)?;
        writeln!(
            out,
            "{:<w$} | {:<w$}",
            "Column",
            "Type",
            w = DESCRIBE_WIDTH
        )?;
        writeln!(
            out,
            "{}+{}",
            "-".repeat(DESCRIBE_WIDTH + 1),
            "-".repeat(DESCRIBE_WIDTH + 1)
        )?;
        for (name, ty) in &schema.columns {
            writeln!(
                out,
                "{:<w$} | {:<w$}",
                name,
                ty.to_string(),
                w = DESCRIBE_WIDTH
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// SHOW TABLES output
pub fn write_table_names<W: Write>(out: &mut W, names: &[String]) -> io::Result<()> {
    if names.is_empty() {
        return writeln!(out, "No tables loaded.");
    }
    writeln!(out, "TABLE NAMES")?;
    writeln!(out, "-----------")?;
    for name in names {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

/// One line per loaded table
pub fn write_loaded<W: Write>(
    out: &mut W,
    reports: &[LoadReport],
    echo_timing: bool,
) -> io::Result<()> {
    for report in reports {
        write!(
            out,
            "Loaded FILE {} as TABLE {} ({} rows, {} columns)",
            report.path.display(),
            report.name,
            report.rows,
            report.columns
        )?;
        if echo_timing {
            write!(out, " : {:.3}ms.", report.elapsed.as_secs_f64() * 1000.0)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
