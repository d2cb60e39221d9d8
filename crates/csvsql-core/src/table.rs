//! Column-major in-memory tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::query::view::TableView;

/// Static type of a column or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Int,
    Float,
    Str,
}

impl CellType {
    /// Int or Float
    pub fn is_numeric(self) -> bool {
        matches!(self, CellType::Int | CellType::Float)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellType::Int => write!(f, "int"),
            CellType::Float => write!(f, "float"),
            CellType::Str => write!(f, "string"),
        }
    }
}

/// A single typed value.
///
/// There is no NULL: absence is the zero value of the column type
/// (see [`Cell::null`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

impl Cell {
    /// Zero value standing in for a missing cell of type `ty`
    pub fn null(ty: CellType) -> Cell {
        match ty {
            CellType::Int => Cell::Int(0),
            CellType::Float => Cell::Float(0.0),
            CellType::Str => Cell::Str(Arc::from("")),
        }
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            Cell::Int(_) => CellType::Int,
            Cell::Float(_) => CellType::Float,
            Cell::Str(_) => CellType::Str,
        }
    }

    /// Integer view of the cell; floats truncate and strings read as 0
    pub fn int_value(&self) -> i64 {
        match self {
            Cell::Int(i) => *i,
            Cell::Float(x) => *x as i64,
            Cell::Str(_) => 0,
        }
    }

    /// Float view of the cell; ints widen and strings read as 0.0
    pub fn float_value(&self) -> f64 {
        match self {
            Cell::Int(i) => *i as f64,
            Cell::Float(x) => *x,
            Cell::Str(_) => 0.0,
        }
    }

    /// String payload; numeric cells read as ""
    pub fn str_value(&self) -> &str {
        match self {
            Cell::Str(s) => s,
            _ => "",
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Str(Arc::from(value))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Str(s) => write!(f, "{}", s),
        }
    }
}

/// An immutable, rectangular, column-major table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    column_names: Vec<String>,
    column_types: Vec<CellType>,
    columns: Vec<Vec<Cell>>,
    height: usize,
}

impl Table {
    /// Build a table from named, typed columns.
    ///
    /// Column names must be unique and all columns the same length.
    pub fn new(
        column_names: Vec<String>,
        column_types: Vec<CellType>,
        columns: Vec<Vec<Cell>>,
    ) -> Result<Self> {
        if column_names.len() != column_types.len() || column_names.len() != columns.len() {
            return Err(Error::InvalidInput(format!(
                "{} column names, {} column types and {} columns",
                column_names.len(),
                column_types.len(),
                columns.len()
            )));
        }
        for (i, name) in column_names.iter().enumerate() {
            if column_names[..i].contains(name) {
                return Err(Error::InvalidInput(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
        }
        let height = columns.first().map_or(0, Vec::len);
        if let Some(pos) = columns.iter().position(|c| c.len() != height) {
            return Err(Error::InvalidInput(format!(
                "column '{}' has {} rows, expected {}",
                column_names[pos],
                columns[pos].len(),
                height
            )));
        }

        Ok(Self {
            column_names,
            column_types,
            columns,
            height,
        })
    }

    /// Materialize every remaining row of a view.
    ///
    /// Column names keep the view's qualification so a loaded join still
    /// resolves `alias.column`. Unlike [`Table::new`], repeated names are
    /// kept: `SELECT x, x` and self-joins produce them, and resolution
    /// takes the first match.
    pub fn from_view(mut view: TableView) -> Self {
        let width = view.width();
        let mut columns: Vec<Vec<Cell>> = (0..width)
            .map(|_| Vec::with_capacity(view.height()))
            .collect();
        let mut height = 0;
        while !view.empty() {
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(view.access_column(i));
            }
            view.advance_row();
            height += 1;
        }
        Self {
            column_names: view.column_names().to_vec(),
            column_types: view.column_types().to_vec(),
            columns,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_types(&self) -> &[CellType] {
        &self.column_types
    }

    pub fn column(&self, index: usize) -> &[Cell] {
        &self.columns[index]
    }

    pub fn cell(&self, column: usize, row: usize) -> &Cell {
        &self.columns[column][row]
    }

    /// `(name, type)` pairs in column order
    pub fn schema(&self) -> Vec<(String, CellType)> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.column_types.iter().copied())
            .collect()
    }
}

/// Loaded tables by name
pub type TableMap = HashMap<String, Arc<Table>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::join::CrossJoin;
    use crate::query::view::TableIterator;

    fn sample() -> Table {
        Table::new(
            vec!["id".to_string(), "x".to_string()],
            vec![CellType::Int, CellType::Float],
            vec![
                vec![Cell::Int(1), Cell::Int(2)],
                vec![Cell::Float(0.5), Cell::Float(1.5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions() {
        let table = sample();
        assert_eq!(table.width(), 2);
        assert_eq!(table.height(), 2);
        assert_eq!(table.cell(1, 1), &Cell::Float(1.5));
        assert_eq!(
            table.schema(),
            vec![
                ("id".to_string(), CellType::Int),
                ("x".to_string(), CellType::Float)
            ]
        );
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = Table::new(
            vec!["a".to_string(), "b".to_string()],
            vec![CellType::Int, CellType::Int],
            vec![vec![Cell::Int(1)], vec![]],
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Table::new(
            vec!["a".to_string(), "a".to_string()],
            vec![CellType::Int, CellType::Int],
            vec![vec![], vec![]],
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_null_cells() {
        assert_eq!(Cell::null(CellType::Int), Cell::Int(0));
        assert_eq!(Cell::null(CellType::Float), Cell::Float(0.0));
        assert_eq!(Cell::null(CellType::Str), Cell::from(""));
    }

    #[test]
    fn test_cell_views() {
        assert_eq!(Cell::Int(3).float_value(), 3.0);
        assert_eq!(Cell::Float(2.7).int_value(), 2);
        assert_eq!(Cell::from("abc").str_value(), "abc");
        assert_eq!(Cell::from("abc").cell_type(), CellType::Str);
        assert_eq!(Cell::Float(20.0).to_string(), "20");
    }

    #[test]
    fn test_from_view_copies_rows() {
        let table = Arc::new(sample());
        let copy = Table::from_view(TableView::scan(table.clone()));
        assert_eq!(&copy, table.as_ref());
    }

    #[test]
    fn test_from_view_keeps_repeated_names() {
        let table = Arc::new(sample());
        let join = CrossJoin::new(
            TableIterator::new("t", table.clone()),
            TableIterator::new("t", table),
        );
        let copy = Table::from_view(TableView::CrossJoin(join));
        assert_eq!(copy.width(), 4);
        assert_eq!(copy.height(), 4);
        assert_eq!(copy.column_names()[0], copy.column_names()[2]);
    }
}
