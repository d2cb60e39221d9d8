/// Streaming table views
///
/// Every view exposes the same cursor protocol: read the current row with
/// `access_column`, step with `advance_row`, stop once `empty` is true.
/// `height` is an upper bound for joins and filtered selects.
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{Cell, CellType, Table};

use super::aggregate::Aggregator;
use super::expression::Expression;
use super::join::{CrossJoin, InnerJoin, OuterJoin, SideOuterJoin};
use super::predicate::Predicate;

/// A view over a shared table with a row cursor
#[derive(Debug, Clone)]
pub struct TableIterator {
    name: String,
    table: Arc<Table>,
    current_row: usize,
}

impl TableIterator {
    pub fn new(name: impl Into<String>, table: Arc<Table>) -> Self {
        Self {
            name: name.into(),
            table,
            current_row: 0,
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_row(&self) -> usize {
        self.current_row
    }

    pub fn access_column(&self, i: usize) -> Cell {
        self.table.cell(i, self.current_row).clone()
    }

    pub fn advance_row(&mut self) {
        self.current_row += 1;
    }

    /// Rewind to the first row
    pub fn reset(&mut self) {
        self.current_row = 0;
    }

    pub fn empty(&self) -> bool {
        self.current_row >= self.table.height()
    }

    pub fn width(&self) -> usize {
        self.table.width()
    }

    pub fn height(&self) -> usize {
        self.table.height()
    }

    pub fn resolve_column(&self, name: &str) -> Result<usize> {
        resolve_name(self.table.column_names(), &self.name, name)
    }

    /// Column names, prefixed with this view's alias when it has one
    pub fn qualified_names(&self) -> impl Iterator<Item = String> + '_ {
        self.table.column_names().iter().map(move |n| {
            if self.name.is_empty() {
                n.clone()
            } else {
                format!("{}.{}", self.name, n)
            }
        })
    }
}

/// A select's input: the FROM view with WHERE, LIMIT and OFFSET applied
#[derive(Debug)]
pub struct SelectSource {
    view: Box<TableView>,
    filters: Vec<Predicate>,
    limit: Option<usize>,
    offset: usize,
}

impl SelectSource {
    /// Position the cursor on the first row to emit: skip rows failing the
    /// filters, then skip `offset` matching rows.
    pub fn new(
        view: TableView,
        filters: Vec<Predicate>,
        limit: Option<usize>,
        offset: usize,
    ) -> Self {
        let mut source = Self {
            view: Box::new(view),
            filters,
            limit,
            offset,
        };
        source.skip_unmatched();
        for _ in 0..offset {
            if source.view.empty() {
                break;
            }
            source.view.advance_row();
            source.skip_unmatched();
        }
        source
    }

    /// The view that filters and projections are bound to
    pub fn view(&self) -> &TableView {
        &self.view
    }

    fn matches(&self) -> bool {
        self.filters.iter().all(|p| p.eval(&self.view))
    }

    fn skip_unmatched(&mut self) {
        while !self.view.empty() && !self.matches() {
            self.view.advance_row();
        }
    }

    pub fn advance_row(&mut self) {
        if let Some(limit) = self.limit.as_mut() {
            *limit = limit.saturating_sub(1);
        }
        self.view.advance_row();
        self.skip_unmatched();
    }

    pub fn empty(&self) -> bool {
        self.limit == Some(0) || self.view.empty()
    }

    /// Upper bound: `min(source height - offset, limit)`
    pub fn height(&self) -> usize {
        let height = self.view.height().saturating_sub(self.offset);
        self.limit.map_or(height, |limit| height.min(limit))
    }
}

/// Projection of plain column expressions, evaluated row by row
#[derive(Debug)]
pub struct ColumnSelect {
    name: String,
    source: SelectSource,
    columns: Vec<Expression>,
    column_names: Vec<String>,
    column_types: Vec<CellType>,
}

impl ColumnSelect {
    pub fn new(source: SelectSource, columns: Vec<Expression>, column_names: Vec<String>) -> Self {
        let column_types = columns.iter().map(Expression::return_type).collect();
        Self {
            name: String::new(),
            source,
            columns,
            column_names,
            column_types,
        }
    }
}

/// Aggregate projection: drives its source to exhaustion on construction
/// and yields a single row
#[derive(Debug)]
pub struct AggregateSelect {
    name: String,
    row: Vec<Cell>,
    column_names: Vec<String>,
    column_types: Vec<CellType>,
    emitted: bool,
}

impl AggregateSelect {
    pub fn new(
        mut source: SelectSource,
        mut aggregators: Vec<Aggregator>,
        column_names: Vec<String>,
    ) -> Result<Self> {
        let mut rows = 0usize;
        while !source.empty() {
            for aggregator in aggregators.iter_mut() {
                aggregator.accumulate(source.view());
            }
            source.advance_row();
            rows += 1;
        }
        debug!(rows, aggregates = aggregators.len(), "Aggregated select input");

        let column_types = aggregators.iter().map(Aggregator::return_type).collect();
        let row = aggregators
            .iter_mut()
            .map(Aggregator::value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: String::new(),
            row,
            column_names,
            column_types,
            emitted: false,
        })
    }
}

/// Every kind of streaming view
#[derive(Debug)]
pub enum TableView {
    Scan(TableIterator),
    InnerJoin(InnerJoin),
    OuterJoin(OuterJoin),
    LeftOuterJoin(SideOuterJoin),
    RightOuterJoin(SideOuterJoin),
    CrossJoin(CrossJoin),
    ColumnSelect(ColumnSelect),
    AggregateSelect(AggregateSelect),
}

impl TableView {
    /// Unaliased scan over a table
    pub fn scan(table: Arc<Table>) -> Self {
        TableView::Scan(TableIterator::new(String::new(), table))
    }

    /// Read column `i` of the current row; only meaningful while not `empty`
    pub fn access_column(&self, i: usize) -> Cell {
        match self {
            TableView::Scan(it) => it.access_column(i),
            TableView::InnerJoin(join) => join.access_column(i),
            TableView::OuterJoin(join) => join.access_column(i),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => {
                join.access_column(i)
            }
            TableView::CrossJoin(join) => join.access_column(i),
            TableView::ColumnSelect(select) => select.columns[i].eval(select.source.view()),
            TableView::AggregateSelect(select) => select.row[i].clone(),
        }
    }

    pub fn advance_row(&mut self) {
        match self {
            TableView::Scan(it) => it.advance_row(),
            TableView::InnerJoin(join) => join.advance_row(),
            TableView::OuterJoin(join) => join.advance_row(),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => {
                join.advance_row()
            }
            TableView::CrossJoin(join) => join.advance_row(),
            TableView::ColumnSelect(select) => select.source.advance_row(),
            TableView::AggregateSelect(select) => select.emitted = true,
        }
    }

    pub fn empty(&self) -> bool {
        match self {
            TableView::Scan(it) => it.empty(),
            TableView::InnerJoin(join) => join.empty(),
            TableView::OuterJoin(join) => join.empty(),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => join.empty(),
            TableView::CrossJoin(join) => join.empty(),
            TableView::ColumnSelect(select) => select.source.empty(),
            TableView::AggregateSelect(select) => select.emitted,
        }
    }

    pub fn width(&self) -> usize {
        self.column_names().len()
    }

    /// Row count; an upper bound for joins and filtered selects
    pub fn height(&self) -> usize {
        match self {
            TableView::Scan(it) => it.height(),
            TableView::InnerJoin(join) => join.height(),
            TableView::OuterJoin(join) => join.height(),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => join.height(),
            TableView::CrossJoin(join) => join.height(),
            TableView::ColumnSelect(select) => select.source.height(),
            TableView::AggregateSelect(_) => 1,
        }
    }

    /// View alias; empty when unnamed
    pub fn name(&self) -> &str {
        match self {
            TableView::Scan(it) => &it.name,
            TableView::InnerJoin(join) => join.name(),
            TableView::OuterJoin(join) => join.name(),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => join.name(),
            TableView::CrossJoin(join) => join.name(),
            TableView::ColumnSelect(select) => &select.name,
            TableView::AggregateSelect(select) => &select.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            TableView::Scan(it) => it.name = name,
            TableView::InnerJoin(join) => join.set_name(name),
            TableView::OuterJoin(join) => join.set_name(name),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => {
                join.set_name(name)
            }
            TableView::CrossJoin(join) => join.set_name(name),
            TableView::ColumnSelect(select) => select.name = name,
            TableView::AggregateSelect(select) => select.name = name,
        }
    }

    pub fn column_names(&self) -> &[String] {
        match self {
            TableView::Scan(it) => it.table.column_names(),
            TableView::InnerJoin(join) => join.column_names(),
            TableView::OuterJoin(join) => join.column_names(),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => {
                join.column_names()
            }
            TableView::CrossJoin(join) => join.column_names(),
            TableView::ColumnSelect(select) => &select.column_names,
            TableView::AggregateSelect(select) => &select.column_names,
        }
    }

    pub fn column_types(&self) -> &[CellType] {
        match self {
            TableView::Scan(it) => it.table.column_types(),
            TableView::InnerJoin(join) => join.column_types(),
            TableView::OuterJoin(join) => join.column_types(),
            TableView::LeftOuterJoin(join) | TableView::RightOuterJoin(join) => {
                join.column_types()
            }
            TableView::CrossJoin(join) => join.column_types(),
            TableView::ColumnSelect(select) => &select.column_types,
            TableView::AggregateSelect(select) => &select.column_types,
        }
    }

    /// Resolve a column name to its index.
    ///
    /// Tries `alias.column` against this view's alias first, then the bare
    /// name, then a unique `.column` suffix among qualified names.
    pub fn resolve_column(&self, name: &str) -> Result<usize> {
        resolve_name(self.column_names(), self.name(), name)
    }

    /// Random-access snapshot with its own cursor, materializing anything
    /// that is not already a table scan.
    pub fn load(self) -> Result<TableIterator> {
        match self {
            TableView::Scan(mut it) => {
                it.reset();
                Ok(it)
            }
            other => {
                let name = other.name().to_string();
                let table = Table::from_view(other);
                debug!(
                    view = %name,
                    rows = table.height(),
                    "Materialized view for random access"
                );
                Ok(TableIterator::new(name, Arc::new(table)))
            }
        }
    }
}

fn resolve_name(names: &[String], alias: &str, name: &str) -> Result<usize> {
    if !alias.is_empty() {
        let unqualified = name
            .strip_prefix(alias)
            .and_then(|rest| rest.strip_prefix('.'));
        if let Some(column) = unqualified {
            if let Some(i) = names.iter().position(|n| n == column) {
                return Ok(i);
            }
        }
    }

    if let Some(i) = names.iter().position(|n| n == name) {
        return Ok(i);
    }

    let suffix = format!(".{}", name);
    let mut candidates = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.ends_with(&suffix));
    match (candidates.next(), candidates.next()) {
        (Some((i, _)), None) => Ok(i),
        (Some(_), Some(_)) => Err(Error::ColumnResolution(format!(
            "'{}' is ambiguous",
            name
        ))),
        (None, _) => Err(Error::ColumnResolution(format!(
            "'{}' not found in {}",
            name,
            if alias.is_empty() { "view" } else { alias }
        ))),
    }
}
