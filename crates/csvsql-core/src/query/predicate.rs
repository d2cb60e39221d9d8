/// Boolean predicates for WHERE and ON clauses
use crate::error::{Error, Result};
use crate::table::{Cell, CellType};

use super::arity_error;
use super::ast::ParseTreeNode;
use super::expression::Expression;
use super::lexer::TokenKind;
use super::view::TableView;

/// Relative tolerance multiplier for float equality
const FLOAT_EQ_ULPS: f64 = 10.0;

/// Comparison of two cells of statically known types
pub type CompareFn = fn(&Cell, &Cell) -> bool;

/// Float equality with a relative epsilon tolerance.
///
/// Exactly equal values (including both zero) always compare equal.
pub fn float_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < f64::EPSILON * (a + b).abs() * FLOAT_EQ_ULPS
}

/// A compiled boolean expression
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare {
        op: CompareFn,
        left: Expression,
        right: Expression,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Compile a comparison or logical node against the schema of `view`.
    pub fn compile(node: &ParseTreeNode, view: &TableView) -> Result<Predicate> {
        let kind = node.kind();
        match kind {
            _ if kind.is_comparison() => {
                let [left, right] = node.children.as_slice() else {
                    return Err(arity_error(node, "2"));
                };
                let left = Expression::compile(left, view)?;
                let right = Expression::compile(right, view)?;
                let op = compare_fn(kind, left.return_type(), right.return_type())?;
                Ok(Predicate::Compare { op, left, right })
            }
            TokenKind::And | TokenKind::Or => {
                let [left, right] = node.children.as_slice() else {
                    return Err(arity_error(node, "2"));
                };
                let left = Box::new(Predicate::compile(left, view)?);
                let right = Box::new(Predicate::compile(right, view)?);
                Ok(match kind {
                    TokenKind::And => Predicate::And(left, right),
                    _ => Predicate::Or(left, right),
                })
            }
            TokenKind::Not => {
                let [operand] = node.children.as_slice() else {
                    return Err(arity_error(node, "1"));
                };
                Ok(Predicate::Not(Box::new(Predicate::compile(operand, view)?)))
            }
            _ => Err(Error::Type(format!(
                "{} is not a boolean expression",
                node.token
            ))),
        }
    }

    /// Evaluate against the current row of the view this was compiled for.
    pub fn eval(&self, view: &TableView) -> bool {
        match self {
            Predicate::Compare { op, left, right } => op(&left.eval(view), &right.eval(view)),
            Predicate::And(left, right) => left.eval(view) && right.eval(view),
            Predicate::Or(left, right) => left.eval(view) || right.eval(view),
            Predicate::Not(operand) => !operand.eval(view),
        }
    }
}

/// Pick the comparison for `left op right`.
///
/// Two ints compare exactly, any float operand compares as float with a
/// tolerant equality, and strings compare lexicographically with strings
/// only.
pub fn compare_fn(kind: TokenKind, left: CellType, right: CellType) -> Result<CompareFn> {
    let class = match (left, right) {
        (CellType::Int, CellType::Int) => CellType::Int,
        (CellType::Str, CellType::Str) => CellType::Str,
        (CellType::Str, _) | (_, CellType::Str) => {
            return Err(Error::Type(format!(
                "cannot compare {} with {}",
                left, right
            )))
        }
        _ => CellType::Float,
    };

    let op: CompareFn = match (class, kind) {
        (CellType::Int, TokenKind::Eq) => |a, b| a.int_value() == b.int_value(),
        (CellType::Int, TokenKind::Ne) => |a, b| a.int_value() != b.int_value(),
        (CellType::Int, TokenKind::Lt) => |a, b| a.int_value() < b.int_value(),
        (CellType::Int, TokenKind::Le) => |a, b| a.int_value() <= b.int_value(),
        (CellType::Int, TokenKind::Gt) => |a, b| a.int_value() > b.int_value(),
        (CellType::Int, TokenKind::Ge) => |a, b| a.int_value() >= b.int_value(),
        (CellType::Float, TokenKind::Eq) => |a, b| float_eq(a.float_value(), b.float_value()),
        (CellType::Float, TokenKind::Ne) => |a, b| !float_eq(a.float_value(), b.float_value()),
        (CellType::Float, TokenKind::Lt) => |a, b| {
            a.float_value() < b.float_value() && !float_eq(a.float_value(), b.float_value())
        },
        (CellType::Float, TokenKind::Le) => |a, b| {
            a.float_value() < b.float_value() || float_eq(a.float_value(), b.float_value())
        },
        (CellType::Float, TokenKind::Gt) => |a, b| {
            a.float_value() > b.float_value() && !float_eq(a.float_value(), b.float_value())
        },
        (CellType::Float, TokenKind::Ge) => |a, b| {
            a.float_value() > b.float_value() || float_eq(a.float_value(), b.float_value())
        },
        (_, TokenKind::Eq) => |a, b| a.str_value() == b.str_value(),
        (_, TokenKind::Ne) => |a, b| a.str_value() != b.str_value(),
        (_, TokenKind::Lt) => |a, b| a.str_value() < b.str_value(),
        (_, TokenKind::Le) => |a, b| a.str_value() <= b.str_value(),
        (_, TokenKind::Gt) => |a, b| a.str_value() > b.str_value(),
        (_, TokenKind::Ge) => |a, b| a.str_value() >= b.str_value(),
        (_, other) => {
            return Err(Error::NotImplemented(format!(
                "{} is not a comparison",
                other
            )))
        }
    };
    Ok(op)
}
