//! # csvsql
//!
//! An embedded SQL-like query engine over in-memory tables loaded from CSV
//! files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use csvsql::Engine;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new();
//!     engine.load_csv("orders", "./orders.csv")?;
//!
//!     let result = engine.query("SELECT id, total * 2 AS doubled FROM orders WHERE total > 10;")?;
//!     for row in &result.rows {
//!         println!("{:?}", row);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Statements
//!
//! - `LOAD file AS name [, file AS name ...]`
//! - `SHOW TABLES`, `DESCRIBE name`, `EXIT`
//! - `SELECT items FROM view [WHERE predicate] [LIMIT n [OFFSET m]]`, where a
//!   view is a table, an aliased view, a parenthesised sub-select, or a join
//!   (`[INNER] JOIN`, `LEFT JOIN`, `RIGHT JOIN`, `FULL JOIN`, `CROSS JOIN`)
//!
//! Items are column expressions (`+ - * / %`, `*` for every column) or the
//! aggregates `max`, `min`, `average` and `median`, never both in one list.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

pub use csvsql_core::query::{LoadReport, QueryResult, TableSchema, TableView, Token};
pub use csvsql_core::{Cell, CellType, Error, Result, Table, TableMap};

use csvsql_core::loader;
use csvsql_core::query::{compile_query, parse, split_statements, Lexer};

pub mod format;
pub mod logging;
pub mod security;
pub mod shell;

pub use shell::Shell;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How SELECT results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Header line, then comma-separated rows
    #[default]
    Csv,
    /// Fixed-width columns separated by `|`
    Table,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Output format for SELECT results
    pub format: OutputFormat,
    /// Longest accepted query text, in bytes
    pub max_query_length: usize,
    /// Report load and query timings alongside results
    pub echo_timing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            max_query_length: security::DEFAULT_MAX_QUERY_LENGTH,
            echo_timing: false,
        }
    }
}

impl EngineConfig {
    /// Set the output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the maximum query length
    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    /// Enable or disable timing output
    pub fn with_echo_timing(mut self, echo_timing: bool) -> Self {
        self.echo_timing = echo_timing;
        self
    }
}

/// Materialised SELECT output
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    /// Output column names, in order
    pub column_names: Vec<String>,
    /// Rows in output order
    pub rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    /// Drain a view into memory
    pub fn from_view(mut view: TableView) -> Self {
        let column_names = view.column_names().to_vec();
        let mut rows = Vec::with_capacity(view.height());
        while !view.empty() {
            rows.push((0..column_names.len()).map(|i| view.access_column(i)).collect());
            view.advance_row();
        }
        Self { column_names, rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row was produced
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of the named output column
    pub fn column(&self, name: &str) -> Option<Vec<Cell>> {
        let index = self.column_names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|row| row[index].clone()).collect())
    }
}

/// The query engine: a table map plus the statement pipeline.
///
/// # Examples
///
/// ```rust
/// use csvsql::{Cell, CellType, Engine, Table};
///
/// let mut engine = Engine::new();
/// let table = Table::new(
///     vec!["id".to_string(), "x".to_string()],
///     vec![CellType::Int, CellType::Int],
///     vec![vec![Cell::Int(1), Cell::Int(2)], vec![Cell::Int(10), Cell::Int(20)]],
/// )?;
/// engine.register_table("t", table)?;
///
/// let result = engine.query("SELECT x FROM t WHERE id = 1")?;
/// assert_eq!(result.rows, vec![vec![Cell::Int(10)]]);
/// # Ok::<(), csvsql::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    tables: TableMap,
    config: EngineConfig,
}

impl Engine {
    /// Engine with the default configuration and no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            tables: TableMap::new(),
            config,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loaded tables by name
    pub fn tables(&self) -> &TableMap {
        &self.tables
    }

    /// Load a CSV file as table `name`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed name, `DuplicateTable` if the name is
    /// taken, and I/O or CSV errors from reading the file.
    pub fn load_csv(&mut self, name: &str, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        security::validate_table_name(name)?;
        if self.tables.contains_key(name) {
            return Err(Error::DuplicateTable(name.to_string()));
        }

        let start = Instant::now();
        let table = loader::load_csv(path)?;
        let elapsed = start.elapsed();
        info!(
            table = name,
            path = %path.display(),
            rows = table.height(),
            columns = table.width(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Loaded table"
        );

        let report = LoadReport {
            name: name.to_string(),
            path: path.to_path_buf(),
            rows: table.height(),
            columns: table.width(),
            elapsed,
        };
        self.tables.insert(name.to_string(), Arc::new(table));
        Ok(report)
    }

    /// Add an in-memory table under `name`.
    pub fn register_table(&mut self, name: &str, table: Table) -> Result<()> {
        security::validate_table_name(name)?;
        if self.tables.contains_key(name) {
            return Err(Error::DuplicateTable(name.to_string()));
        }
        self.tables.insert(name.to_string(), Arc::new(table));
        Ok(())
    }

    /// Parse, compile and run one statement's tokens.
    pub fn run_statement(&mut self, tokens: &[Token]) -> Result<QueryResult> {
        let tree = parse(tokens)?;
        let start = Instant::now();
        let query = compile_query(&tree, &self.tables)?;
        let result = query.run(&mut self.tables)?;
        debug!(
            statement = %tree.token,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Statement executed"
        );
        Ok(result)
    }

    /// Run every `;`-separated statement in `sql`, stopping after `EXIT`.
    ///
    /// The first failing statement aborts the rest; use
    /// [`Engine::execute_with`] to keep the results that came before it.
    pub fn execute(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        let mut results = Vec::new();
        self.execute_with(sql, |result| {
            results.push(result);
            Ok(())
        })?;
        Ok(results)
    }

    /// Like [`Engine::execute`], but hands each result to `each` as soon as
    /// its statement finishes, so earlier output survives a later failure.
    pub fn execute_with<F>(&mut self, sql: &str, mut each: F) -> Result<()>
    where
        F: FnMut(QueryResult) -> Result<()>,
    {
        security::validate_query(sql, self.config.max_query_length)?;
        let tokens = Lexer::new(sql).tokenize()?;

        for statement in split_statements(tokens) {
            let result = self.run_statement(&statement)?;
            let exit = matches!(result, QueryResult::Exit);
            each(result)?;
            if exit {
                break;
            }
        }
        Ok(())
    }

    /// Run `sql` and materialise the rows of its last statement, which must
    /// be a SELECT.
    pub fn query(&mut self, sql: &str) -> Result<ResultSet> {
        match self.execute(sql)?.pop() {
            Some(QueryResult::Rows(view)) => Ok(ResultSet::from_view(view)),
            Some(_) => Err(Error::InvalidInput(
                "last statement does not return rows".to_string(),
            )),
            None => Err(Error::InvalidInput("no statement to run".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> Table {
        Table::new(
            vec!["id".to_string(), "x".to_string()],
            vec![CellType::Int, CellType::Int],
            vec![
                vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)],
                vec![Cell::Int(10), Cell::Int(20), Cell::Int(30)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.3.0");
    }

    #[test]
    fn test_query_registered_table() {
        let mut engine = Engine::new();
        engine.register_table("t", sample()).unwrap();

        let result = engine.query("SELECT x FROM t WHERE id >= 2;").unwrap();
        assert_eq!(result.column_names, vec!["x".to_string()]);
        assert_eq!(result.column("x"), Some(vec![Cell::Int(20), Cell::Int(30)]));
        assert_eq!(result.column("missing"), None);
    }

    #[test]
    fn test_load_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "id,x\n1,10\n2,20\n").unwrap();

        let mut engine = Engine::new();
        let report = engine.load_csv("t", &path).unwrap();
        assert_eq!(report.rows, 2);
        assert!(engine.tables().contains_key("t"));
        assert!(matches!(
            engine.load_csv("t", &path),
            Err(Error::DuplicateTable(_))
        ));
        assert!(matches!(
            engine.load_csv("bad.name", &path),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_execute_multiple_statements() {
        let mut engine = Engine::new();
        engine.register_table("t", sample()).unwrap();

        let results = engine
            .execute("SHOW TABLES; SELECT max(x) FROM t; EXIT; SHOW TABLES;")
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], QueryResult::Tables(_)));
        assert!(matches!(results[2], QueryResult::Exit));
    }

    #[test]
    fn test_execute_with_keeps_earlier_results() {
        let mut engine = Engine::new();
        engine.register_table("t", sample()).unwrap();

        let mut seen = Vec::new();
        let result = engine.execute_with(
            "SELECT max(x) FROM t; SELECT nope FROM t; SHOW TABLES;",
            |result| {
                seen.push(result);
                Ok(())
            },
        );
        assert!(matches!(result, Err(Error::ColumnResolution(_))));
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], QueryResult::Rows(_)));
    }

    #[test]
    fn test_query_requires_rows() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.query("SHOW TABLES"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(engine.query("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_query_length_limit() {
        let mut engine = Engine::with_config(EngineConfig::default().with_max_query_length(8));
        assert!(matches!(
            engine.execute("SHOW TABLES;"),
            Err(Error::InvalidInput(_))
        ));
    }
}
