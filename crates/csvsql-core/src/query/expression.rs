/// Scalar expressions bound to a table view
///
/// Operand types are known once the expression is bound, so each
/// arithmetic node picks a concrete operation at compile time and
/// evaluation never branches on cell tags.
use crate::error::{Error, Result};
use crate::table::{Cell, CellType};

use super::arity_error;
use super::ast::ParseTreeNode;
use super::lexer::{Literal, TokenKind};
use super::view::TableView;

/// Binary operation on two cells of statically known types
pub type ArithmeticFn = fn(&Cell, &Cell) -> Cell;

/// A compiled scalar expression
#[derive(Debug, Clone)]
pub enum Expression {
    /// Column of the bound view
    Column { index: usize, ty: CellType },
    Constant(Cell),
    Arithmetic {
        op: ArithmeticFn,
        left: Box<Expression>,
        right: Box<Expression>,
        ty: CellType,
    },
    Negate {
        operand: Box<Expression>,
        ty: CellType,
    },
}

impl Expression {
    /// Compile a parse-tree node against the schema of `view`.
    pub fn compile(node: &ParseTreeNode, view: &TableView) -> Result<Expression> {
        match node.kind() {
            TokenKind::Identifier => {
                let name = node.token.text().unwrap_or_default();
                let index = view.resolve_column(name)?;
                Ok(Expression::column(index, view.column_types()[index]))
            }
            TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StrLiteral => {
                match &node.token.literal {
                    Some(Literal::Int(i)) => Ok(Expression::Constant(Cell::Int(*i))),
                    Some(Literal::Float(x)) => Ok(Expression::Constant(Cell::Float(*x))),
                    Some(Literal::Str(s)) => Ok(Expression::Constant(Cell::from(s.as_str()))),
                    None => Err(Error::Type(format!("literal without a value: {}", node.token))),
                }
            }
            TokenKind::Caret => Err(Error::NotImplemented("exponentiation (^)".to_string())),
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent => {
                let [left, right] = node.children.as_slice() else {
                    return Err(arity_error(node, "2"));
                };
                let left = Expression::compile(left, view)?;
                let right = Expression::compile(right, view)?;
                let (op, ty) =
                    arithmetic_fn(node.kind(), left.return_type(), right.return_type())?;
                Ok(Expression::Arithmetic {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty,
                })
            }
            TokenKind::Negate => {
                let [operand] = node.children.as_slice() else {
                    return Err(arity_error(node, "1"));
                };
                let operand = Expression::compile(operand, view)?;
                let ty = operand.return_type();
                if ty == CellType::Str {
                    return Err(Error::Type("cannot negate a string".to_string()));
                }
                Ok(Expression::Negate {
                    operand: Box::new(operand),
                    ty,
                })
            }
            _ => Err(Error::NotImplemented(format!(
                "{} in a column expression",
                node.token
            ))),
        }
    }

    /// Read column `index` of the bound view
    pub fn column(index: usize, ty: CellType) -> Expression {
        Expression::Column { index, ty }
    }

    pub fn return_type(&self) -> CellType {
        match self {
            Expression::Column { ty, .. } => *ty,
            Expression::Constant(cell) => cell.cell_type(),
            Expression::Arithmetic { ty, .. } => *ty,
            Expression::Negate { ty, .. } => *ty,
        }
    }

    /// Evaluate against the current row of the view this was compiled for.
    pub fn eval(&self, view: &TableView) -> Cell {
        match self {
            Expression::Column { index, .. } => view.access_column(*index),
            Expression::Constant(cell) => cell.clone(),
            Expression::Arithmetic {
                op, left, right, ..
            } => op(&left.eval(view), &right.eval(view)),
            Expression::Negate { operand, ty } => match ty {
                CellType::Int => Cell::Int(operand.eval(view).int_value().wrapping_neg()),
                _ => Cell::Float(-operand.eval(view).float_value()),
            },
        }
    }
}

/// Pick the concrete operation and result type for `left op right`.
///
/// int with int stays int (except `/`, which is always float); any float
/// operand promotes to float. `%` needs two ints.
pub fn arithmetic_fn(
    kind: TokenKind,
    left: CellType,
    right: CellType,
) -> Result<(ArithmeticFn, CellType)> {
    if !left.is_numeric() || !right.is_numeric() {
        return Err(Error::NotImplemented(format!(
            "arithmetic ({}) on string operands",
            kind
        )));
    }
    let ty = match kind {
        TokenKind::Slash => CellType::Float,
        _ if left == CellType::Int && right == CellType::Int => CellType::Int,
        _ => CellType::Float,
    };

    let op: ArithmeticFn = match (kind, ty) {
        (TokenKind::Plus, CellType::Int) => add_int,
        (TokenKind::Plus, _) => add_float,
        (TokenKind::Minus, CellType::Int) => sub_int,
        (TokenKind::Minus, _) => sub_float,
        (TokenKind::Star, CellType::Int) => mul_int,
        (TokenKind::Star, _) => mul_float,
        (TokenKind::Slash, _) => div_float,
        (TokenKind::Percent, CellType::Int) => rem_int,
        (TokenKind::Percent, _) => {
            return Err(Error::Type(format!(
                "% requires integer operands, found {} and {}",
                left, right
            )))
        }
        (TokenKind::Caret, _) => {
            return Err(Error::NotImplemented("exponentiation (^)".to_string()))
        }
        (other, _) => {
            return Err(Error::NotImplemented(format!(
                "{} is not an arithmetic operator",
                other
            )))
        }
    };
    Ok((op, ty))
}

fn add_int(a: &Cell, b: &Cell) -> Cell {
    Cell::Int(a.int_value().wrapping_add(b.int_value()))
}

fn sub_int(a: &Cell, b: &Cell) -> Cell {
    Cell::Int(a.int_value().wrapping_sub(b.int_value()))
}

fn mul_int(a: &Cell, b: &Cell) -> Cell {
    Cell::Int(a.int_value().wrapping_mul(b.int_value()))
}

// x % 0 yields the zero cell
fn rem_int(a: &Cell, b: &Cell) -> Cell {
    match b.int_value() {
        0 => Cell::Int(0),
        d => Cell::Int(a.int_value().wrapping_rem(d)),
    }
}

fn add_float(a: &Cell, b: &Cell) -> Cell {
    Cell::Float(a.float_value() + b.float_value())
}

fn sub_float(a: &Cell, b: &Cell) -> Cell {
    Cell::Float(a.float_value() - b.float_value())
}

fn mul_float(a: &Cell, b: &Cell) -> Cell {
    Cell::Float(a.float_value() * b.float_value())
}

fn div_float(a: &Cell, b: &Cell) -> Cell {
    Cell::Float(a.float_value() / b.float_value())
}
