/// Aggregate functions: max, min, average and median
use std::fmt;

use crate::error::{Error, Result};
use crate::table::{Cell, CellType};

use super::arity_error;
use super::ast::ParseTreeNode;
use super::expression::Expression;
use super::view::TableView;

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Max,
    Min,
    Average,
    Median,
}

impl AggregateFunction {
    /// Case-insensitive lookup by function name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "max" => Some(AggregateFunction::Max),
            "min" => Some(AggregateFunction::Min),
            "average" => Some(AggregateFunction::Average),
            "median" => Some(AggregateFunction::Median),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Max => write!(f, "max"),
            AggregateFunction::Min => write!(f, "min"),
            AggregateFunction::Average => write!(f, "average"),
            AggregateFunction::Median => write!(f, "median"),
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    /// Running extremum for max and min
    Extremum { best: Cell, count: usize },
    Average { sum: f64, count: usize },
    /// Buffered values for median
    Values(Vec<f64>),
}

/// An aggregate accumulator bound to one view
#[derive(Debug, Clone)]
pub struct Aggregator {
    function: AggregateFunction,
    expression: Expression,
    state: State,
}

impl Aggregator {
    /// Compile a `FUNCTION` node against the schema of `view`.
    pub fn compile(node: &ParseTreeNode, view: &TableView) -> Result<Aggregator> {
        let name = node.token.text().unwrap_or_default();
        let function = AggregateFunction::from_name(name)
            .ok_or_else(|| Error::NotImplemented(format!("aggregate function '{}'", name)))?;

        let argument = match node.children.as_slice() {
            [argument] => argument,
            [] => return Err(arity_error(node, "1")),
            _ => {
                return Err(Error::NotImplemented(format!(
                    "multi-argument aggregate {}",
                    function
                )))
            }
        };
        let expression = Expression::compile(argument, view)?;
        let ty = expression.return_type();
        if !ty.is_numeric() {
            return Err(Error::Type(format!("{} over a string expression", function)));
        }

        let state = match function {
            AggregateFunction::Max => State::Extremum {
                best: match ty {
                    CellType::Int => Cell::Int(i64::MIN),
                    _ => Cell::Float(f64::NEG_INFINITY),
                },
                count: 0,
            },
            AggregateFunction::Min => State::Extremum {
                best: match ty {
                    CellType::Int => Cell::Int(i64::MAX),
                    _ => Cell::Float(f64::INFINITY),
                },
                count: 0,
            },
            AggregateFunction::Average => State::Average { sum: 0.0, count: 0 },
            AggregateFunction::Median => State::Values(Vec::with_capacity(view.height())),
        };

        Ok(Aggregator {
            function,
            expression,
            state,
        })
    }

    /// Max and min keep the argument's type; average and median are float.
    pub fn return_type(&self) -> CellType {
        match self.function {
            AggregateFunction::Max | AggregateFunction::Min => self.expression.return_type(),
            AggregateFunction::Average | AggregateFunction::Median => CellType::Float,
        }
    }

    /// Fold the current row of `view` into the aggregate.
    pub fn accumulate(&mut self, view: &TableView) {
        let value = self.expression.eval(view);
        match &mut self.state {
            State::Extremum { best, count } => {
                // The first row always replaces the seed
                let replace = *count == 0
                    || match self.function {
                        AggregateFunction::Max => greater(&value, best),
                        _ => greater(best, &value),
                    };
                if replace {
                    *best = value;
                }
                *count += 1;
            }
            State::Average { sum, count } => {
                *sum += value.float_value();
                *count += 1;
            }
            State::Values(values) => values.push(value.float_value()),
        }
    }

    /// Final value; fails when no row was accumulated.
    pub fn value(&mut self) -> Result<Cell> {
        let empty = || Error::EmptyAggregate(self.function.to_string());
        match &mut self.state {
            State::Extremum { best, count } => {
                if *count == 0 {
                    return Err(empty());
                }
                Ok(best.clone())
            }
            State::Average { sum, count } => {
                if *count == 0 {
                    return Err(empty());
                }
                Ok(Cell::Float(*sum / *count as f64))
            }
            State::Values(values) => median(values).map(Cell::Float).ok_or_else(empty),
        }
    }
}

fn greater(a: &Cell, b: &Cell) -> bool {
    match (a, b) {
        (Cell::Int(x), Cell::Int(y)) => x > y,
        _ => a.float_value() > b.float_value(),
    }
}

/// Median of `values`, reordering them in place. `None` when empty.
///
/// For an even count this is the mean of the two central order statistics.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let k = values.len() / 2;
    let upper = quickselect(values, k);
    if values.len() % 2 == 1 {
        return Some(upper);
    }
    // Everything left of k is <= the kth statistic after selection
    let lower = values[..k].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((lower + upper) / 2.0)
}

/// The `k`th smallest element (0-based) of a non-empty slice.
///
/// Lomuto partitioning around the last element of the active range; the
/// middle element is swapped into that slot first so sorted input does not
/// degrade to quadratic time.
pub fn quickselect(values: &mut [f64], k: usize) -> f64 {
    let mut lo = 0;
    let mut hi = values.len() - 1;
    loop {
        if lo == hi {
            return values[lo];
        }
        let mid = lo + (hi - lo) / 2;
        values.swap(mid, hi);
        let pivot = partition(values, lo, hi);
        match k.cmp(&pivot) {
            std::cmp::Ordering::Equal => return values[pivot],
            std::cmp::Ordering::Less => hi = pivot - 1,
            std::cmp::Ordering::Greater => lo = pivot + 1,
        }
    }
}

fn partition(values: &mut [f64], lo: usize, hi: usize) -> usize {
    let pivot = values[hi];
    let mut store = lo;
    for i in lo..hi {
        if values[i] < pivot {
            values.swap(i, store);
            store += 1;
        }
    }
    values.swap(store, hi);
    store
}
