/// Query executor
///
/// Runs compiled statements against the table map. Nothing here prints;
/// results are handed back for presentation.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::error::{Error, Result};
use crate::loader;
use crate::table::{CellType, Table, TableMap};

use super::view::TableView;

/// One `file AS name` pair of a LOAD statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub path: PathBuf,
    pub name: String,
}

/// A compiled, runnable statement
#[derive(Debug)]
pub enum QueryObject {
    Exit,
    Describe(Vec<(String, Arc<Table>)>),
    Show,
    Load(Vec<LoadTarget>),
    Select(TableView),
}

/// Column layout of one table, as reported by DESCRIBE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<(String, CellType)>,
}

/// Outcome of loading one table
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub elapsed: Duration,
}

/// What a statement produced
#[derive(Debug)]
pub enum QueryResult {
    Exit,
    Described(Vec<TableSchema>),
    /// Loaded table names, sorted
    Tables(Vec<String>),
    Loaded(Vec<LoadReport>),
    /// Output rows, streamed through the view's cursor
    Rows(TableView),
}

impl QueryObject {
    /// Run the statement. LOAD reads every file before inserting any, so a
    /// failed load leaves `tables` untouched.
    pub fn run(self, tables: &mut TableMap) -> Result<QueryResult> {
        match self {
            QueryObject::Exit => Ok(QueryResult::Exit),
            QueryObject::Describe(described) => Ok(QueryResult::Described(
                described
                    .into_iter()
                    .map(|(name, table)| TableSchema {
                        name,
                        columns: table.schema(),
                    })
                    .collect(),
            )),
            QueryObject::Show => {
                let mut names: Vec<String> = tables.keys().cloned().collect();
                names.sort();
                Ok(QueryResult::Tables(names))
            }
            QueryObject::Load(targets) => {
                let mut loaded = Vec::with_capacity(targets.len());
                for target in targets {
                    // The map may have changed since compilation
                    if tables.contains_key(&target.name) {
                        return Err(Error::DuplicateTable(target.name));
                    }
                    let start = Instant::now();
                    let table = loader::load_csv(&target.path)?;
                    let elapsed = start.elapsed();
                    info!(
                        table = %target.name,
                        path = %target.path.display(),
                        rows = table.height(),
                        columns = table.width(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Loaded table"
                    );
                    let report = LoadReport {
                        name: target.name,
                        path: target.path,
                        rows: table.height(),
                        columns: table.width(),
                        elapsed,
                    };
                    loaded.push((report, table));
                }

                let mut reports = Vec::with_capacity(loaded.len());
                for (report, table) in loaded {
                    tables.insert(report.name.clone(), Arc::new(table));
                    reports.push(report);
                }
                Ok(QueryResult::Loaded(reports))
            }
            QueryObject::Select(view) => Ok(QueryResult::Rows(view)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{compile_query, parse_statement};
    use std::fs;
    use tempfile::TempDir;

    fn run(sql: &str, tables: &mut TableMap) -> Result<QueryResult> {
        compile_query(&parse_statement(sql)?, tables)?.run(tables)
    }

    fn write_csv(dir: &TempDir, file: &str, contents: &str) -> String {
        let path = dir.path().join(file);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_then_describe_and_show() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "t.csv", "id,x\n1,10\n2,20\n");
        let mut tables = TableMap::new();

        match run(&format!("LOAD '{}' AS t", path), &mut tables).unwrap() {
            QueryResult::Loaded(reports) => {
                assert_eq!(reports.len(), 1);
                assert_eq!(reports[0].rows, 2);
                assert_eq!(reports[0].columns, 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        match run("DESCRIBE t", &mut tables).unwrap() {
            QueryResult::Described(schemas) => assert_eq!(
                schemas,
                vec![TableSchema {
                    name: "t".to_string(),
                    columns: vec![
                        ("id".to_string(), CellType::Int),
                        ("x".to_string(), CellType::Int)
                    ],
                }]
            ),
            other => panic!("unexpected {:?}", other),
        }

        match run("SHOW TABLES", &mut tables).unwrap() {
            QueryResult::Tables(names) => assert_eq!(names, vec!["t".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failed_load_leaves_tables_unchanged() {
        let dir = TempDir::new().unwrap();
        let good = write_csv(&dir, "good.csv", "id\n1\n");
        let missing = dir.path().join("missing.csv");
        let mut tables = TableMap::new();

        let sql = format!(
            "LOAD '{}' AS good, '{}' AS missing",
            good,
            missing.display()
        );
        assert!(matches!(run(&sql, &mut tables), Err(Error::Io(_))));
        assert!(tables.is_empty());
    }

    #[test]
    fn test_duplicate_load_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "t.csv", "id\n1\n");
        let mut tables = TableMap::new();
        run(&format!("LOAD '{}' AS t", path), &mut tables).unwrap();

        assert!(matches!(
            run(&format!("LOAD '{}' AS t", path), &mut tables),
            Err(Error::DuplicateTable(name)) if name == "t"
        ));
    }

    #[test]
    fn test_show_sorts_names() {
        let table = Arc::new(Table::new(vec![], vec![], vec![]).unwrap());
        let mut tables = TableMap::new();
        for name in ["b", "c", "a"] {
            tables.insert(name.to_string(), Arc::clone(&table));
        }
        match run("SHOW TABLES", &mut tables).unwrap() {
            QueryResult::Tables(names) => assert_eq!(names, ["a", "b", "c"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exit() {
        let mut tables = TableMap::new();
        assert!(matches!(run("EXIT", &mut tables), Ok(QueryResult::Exit)));
    }
}
