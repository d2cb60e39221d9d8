/// Hash and cross joins over materialized sides
///
/// Indexed joins hash one side on its integer key column and stream the
/// other side (the iterator side) against that index.
use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{Cell, CellType};

use super::view::TableIterator;

/// Which input of a join is hashed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSide {
    Left,
    Right,
}

/// The two column names of an `ON a = b` clause, in written order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    pub left: String,
    pub right: String,
}

impl JoinKeys {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

fn joined_schema(left: &TableIterator, right: &TableIterator) -> (Vec<String>, Vec<CellType>) {
    let names = left.qualified_names().chain(right.qualified_names()).collect();
    let types = left
        .table()
        .column_types()
        .iter()
        .chain(right.table().column_types())
        .copied()
        .collect();
    (names, types)
}

/// Resolve the ON columns, accepting either operand order.
fn resolve_keys(
    left: &TableIterator,
    right: &TableIterator,
    keys: &JoinKeys,
) -> Result<(usize, usize)> {
    match (left.resolve_column(&keys.left), right.resolve_column(&keys.right)) {
        (Ok(l), Ok(r)) => Ok((l, r)),
        (Err(err), _) | (_, Err(err)) => {
            match (left.resolve_column(&keys.right), right.resolve_column(&keys.left)) {
                (Ok(l), Ok(r)) => Ok((l, r)),
                _ => Err(err),
            }
        }
    }
}

#[derive(Debug)]
struct IndexedJoin {
    name: String,
    left: TableIterator,
    right: TableIterator,
    left_key: usize,
    right_key: usize,
    side: IndexSide,
    index: HashMap<i64, Vec<usize>>,
    column_names: Vec<String>,
    column_types: Vec<CellType>,
}

impl IndexedJoin {
    /// Hash `side`, or the shorter input when no side is forced.
    fn new(
        left: TableIterator,
        right: TableIterator,
        keys: &JoinKeys,
        side: Option<IndexSide>,
    ) -> Result<Self> {
        let (left_key, right_key) = resolve_keys(&left, &right, keys)?;
        for (it, key) in [(&left, left_key), (&right, right_key)] {
            let ty = it.table().column_types()[key];
            if ty != CellType::Int {
                return Err(Error::Type(format!(
                    "join key '{}' is {}, expected int",
                    it.table().column_names()[key],
                    ty
                )));
            }
        }

        let side = side.unwrap_or(if left.height() > right.height() {
            IndexSide::Right
        } else {
            IndexSide::Left
        });
        let (indexed, key) = match side {
            IndexSide::Left => (&left, left_key),
            IndexSide::Right => (&right, right_key),
        };
        let mut index: HashMap<i64, Vec<usize>> = HashMap::new();
        for (row, cell) in indexed.table().column(key).iter().enumerate() {
            index.entry(cell.int_value()).or_default().push(row);
        }
        debug!(
            side = ?side,
            rows = indexed.height(),
            keys = index.len(),
            "Built join index"
        );

        let (column_names, column_types) = joined_schema(&left, &right);
        Ok(Self {
            name: String::new(),
            left,
            right,
            left_key,
            right_key,
            side,
            index,
            column_names,
            column_types,
        })
    }

    fn iter_height(&self) -> usize {
        match self.side {
            IndexSide::Left => self.right.height(),
            IndexSide::Right => self.left.height(),
        }
    }

    fn indexed_height(&self) -> usize {
        match self.side {
            IndexSide::Left => self.left.height(),
            IndexSide::Right => self.right.height(),
        }
    }

    /// Indexed rows matching the key of iterator row `row`
    fn bucket(&self, row: usize) -> &[usize] {
        let (it, key) = match self.side {
            IndexSide::Left => (&self.right, self.right_key),
            IndexSide::Right => (&self.left, self.left_key),
        };
        let value = it.table().cell(key, row).int_value();
        self.index.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Column `i` of the pairing (iterator row, indexed row); a missing
    /// side reads as the null cell of its column type.
    fn cell(&self, i: usize, iter_row: Option<usize>, indexed_row: Option<usize>) -> Cell {
        let (left_row, right_row) = match self.side {
            IndexSide::Left => (indexed_row, iter_row),
            IndexSide::Right => (iter_row, indexed_row),
        };
        let left_width = self.left.width();
        let (it, column, row) = if i < left_width {
            (&self.left, i, left_row)
        } else {
            (&self.right, i - left_width, right_row)
        };
        match row {
            Some(row) => it.table().cell(column, row).clone(),
            None => Cell::null(it.table().column_types()[column]),
        }
    }
}

/// Rows of the iterator side paired with each matching indexed row
#[derive(Debug)]
pub struct InnerJoin {
    base: IndexedJoin,
    iter_row: usize,
    bucket_pos: usize,
}

impl InnerJoin {
    pub fn new(left: TableIterator, right: TableIterator, keys: &JoinKeys) -> Result<Self> {
        let mut join = Self {
            base: IndexedJoin::new(left, right, keys, None)?,
            iter_row: 0,
            bucket_pos: 0,
        };
        join.seek_match();
        Ok(join)
    }

    fn seek_match(&mut self) {
        while self.iter_row < self.base.iter_height() && self.base.bucket(self.iter_row).is_empty()
        {
            self.iter_row += 1;
        }
    }

    pub fn access_column(&self, i: usize) -> Cell {
        let indexed = self.base.bucket(self.iter_row).get(self.bucket_pos).copied();
        self.base.cell(i, Some(self.iter_row), indexed)
    }

    pub fn advance_row(&mut self) {
        self.bucket_pos += 1;
        if self.bucket_pos >= self.base.bucket(self.iter_row).len() {
            self.bucket_pos = 0;
            self.iter_row += 1;
            self.seek_match();
        }
    }

    pub fn empty(&self) -> bool {
        self.base.index.is_empty() || self.iter_row >= self.base.iter_height()
    }

    pub fn height(&self) -> usize {
        self.base.left.height().min(self.base.right.height())
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn set_name(&mut self, name: String) {
        self.base.name = name;
    }

    pub fn column_names(&self) -> &[String] {
        &self.base.column_names
    }

    pub fn column_types(&self) -> &[CellType] {
        &self.base.column_types
    }
}

/// Left or right outer join: every row of the preserved side appears, with
/// null cells when nothing on the other side matches.
#[derive(Debug)]
pub struct SideOuterJoin {
    base: IndexedJoin,
    iter_row: usize,
    bucket_pos: usize,
}

impl SideOuterJoin {
    /// Keep every left row; the right side is hashed.
    pub fn left(left: TableIterator, right: TableIterator, keys: &JoinKeys) -> Result<Self> {
        Self::new(left, right, keys, IndexSide::Right)
    }

    /// Keep every right row; the left side is hashed.
    pub fn right(left: TableIterator, right: TableIterator, keys: &JoinKeys) -> Result<Self> {
        Self::new(left, right, keys, IndexSide::Left)
    }

    fn new(
        left: TableIterator,
        right: TableIterator,
        keys: &JoinKeys,
        side: IndexSide,
    ) -> Result<Self> {
        Ok(Self {
            base: IndexedJoin::new(left, right, keys, Some(side))?,
            iter_row: 0,
            bucket_pos: 0,
        })
    }

    pub fn access_column(&self, i: usize) -> Cell {
        let indexed = self.base.bucket(self.iter_row).get(self.bucket_pos).copied();
        self.base.cell(i, Some(self.iter_row), indexed)
    }

    pub fn advance_row(&mut self) {
        if self.bucket_pos + 1 < self.base.bucket(self.iter_row).len() {
            self.bucket_pos += 1;
        } else {
            self.bucket_pos = 0;
            self.iter_row += 1;
        }
    }

    pub fn empty(&self) -> bool {
        self.iter_row >= self.base.iter_height()
    }

    pub fn height(&self) -> usize {
        self.base.iter_height()
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn set_name(&mut self, name: String) {
        self.base.name = name;
    }

    pub fn column_names(&self) -> &[String] {
        &self.base.column_names
    }

    pub fn column_types(&self) -> &[CellType] {
        &self.base.column_types
    }
}

/// Full outer join.
///
/// Streams the iterator side like a side outer join while marking indexed
/// rows it matched, then emits the indexed rows that were never matched.
#[derive(Debug)]
pub struct OuterJoin {
    base: IndexedJoin,
    iter_row: usize,
    bucket_pos: usize,
    visited: Vec<bool>,
    next_unvisited: usize,
}

impl OuterJoin {
    pub fn new(left: TableIterator, right: TableIterator, keys: &JoinKeys) -> Result<Self> {
        let base = IndexedJoin::new(left, right, keys, None)?;
        let visited = vec![false; base.indexed_height()];
        let mut join = Self {
            base,
            iter_row: 0,
            bucket_pos: 0,
            visited,
            next_unvisited: 0,
        };
        join.position();
        Ok(join)
    }

    fn streaming(&self) -> bool {
        self.iter_row < self.base.iter_height()
    }

    fn position(&mut self) {
        if self.streaming() {
            if let Some(&row) = self.base.bucket(self.iter_row).get(self.bucket_pos) {
                self.visited[row] = true;
            }
        } else {
            while self.next_unvisited < self.visited.len() && self.visited[self.next_unvisited] {
                self.next_unvisited += 1;
            }
        }
    }

    pub fn access_column(&self, i: usize) -> Cell {
        if self.streaming() {
            let indexed = self.base.bucket(self.iter_row).get(self.bucket_pos).copied();
            self.base.cell(i, Some(self.iter_row), indexed)
        } else {
            self.base.cell(i, None, Some(self.next_unvisited))
        }
    }

    pub fn advance_row(&mut self) {
        if self.streaming() {
            if self.bucket_pos + 1 < self.base.bucket(self.iter_row).len() {
                self.bucket_pos += 1;
            } else {
                self.bucket_pos = 0;
                self.iter_row += 1;
            }
        } else {
            self.next_unvisited += 1;
        }
        self.position();
    }

    pub fn empty(&self) -> bool {
        !self.streaming() && self.next_unvisited >= self.visited.len()
    }

    pub fn height(&self) -> usize {
        self.base.left.height() + self.base.right.height()
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn set_name(&mut self, name: String) {
        self.base.name = name;
    }

    pub fn column_names(&self) -> &[String] {
        &self.base.column_names
    }

    pub fn column_types(&self) -> &[CellType] {
        &self.base.column_types
    }
}

/// Cartesian product; the left side is the inner loop.
#[derive(Debug)]
pub struct CrossJoin {
    name: String,
    left: TableIterator,
    right: TableIterator,
    column_names: Vec<String>,
    column_types: Vec<CellType>,
}

impl CrossJoin {
    pub fn new(mut left: TableIterator, mut right: TableIterator) -> Self {
        left.reset();
        right.reset();
        let (column_names, column_types) = joined_schema(&left, &right);
        Self {
            name: String::new(),
            left,
            right,
            column_names,
            column_types,
        }
    }

    pub fn access_column(&self, i: usize) -> Cell {
        let left_width = self.left.width();
        if i < left_width {
            self.left.access_column(i)
        } else {
            self.right.access_column(i - left_width)
        }
    }

    pub fn advance_row(&mut self) {
        self.left.advance_row();
        if self.left.empty() {
            self.left.reset();
            self.right.advance_row();
        }
    }

    pub fn empty(&self) -> bool {
        self.right.empty() || self.left.empty()
    }

    pub fn height(&self) -> usize {
        self.left.height() * self.right.height()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_types(&self) -> &[CellType] {
        &self.column_types
    }
}
