/// Query planner
///
/// Binds a parse tree against the loaded tables and produces an executable
/// [`QueryObject`]. SELECT statements come out as a ready-to-stream
/// [`TableView`].
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::table::TableMap;

use super::aggregate::Aggregator;
use super::arity_error;
use super::ast::ParseTreeNode;
use super::executor::{LoadTarget, QueryObject};
use super::expression::Expression;
use super::join::{CrossJoin, InnerJoin, JoinKeys, OuterJoin, SideOuterJoin};
use super::lexer::{Literal, TokenKind};
use super::predicate::Predicate;
use super::view::{AggregateSelect, ColumnSelect, SelectSource, TableIterator, TableView};

/// Compile one statement.
pub fn compile_query(root: &ParseTreeNode, tables: &TableMap) -> Result<QueryObject> {
    debug!(statement = %root.token, "Compiling statement");
    match root.kind() {
        TokenKind::Exit => {
            if !root.children.is_empty() {
                return Err(arity_error(root, "0"));
            }
            Ok(QueryObject::Exit)
        }
        TokenKind::Show => compile_show(root),
        TokenKind::Describe => compile_describe(root, tables),
        TokenKind::Load => compile_load(root, tables),
        TokenKind::Select => Ok(QueryObject::Select(compile_select(root, tables)?)),
        _ => Err(Error::NotImplemented(format!(
            "statement starting with {}",
            root.token
        ))),
    }
}

fn compile_show(node: &ParseTreeNode) -> Result<QueryObject> {
    match node.children.as_slice() {
        [target] if target.kind() == TokenKind::Tables => Ok(QueryObject::Show),
        [target] => Err(Error::NotImplemented(format!("SHOW {}", target.token))),
        _ => Err(arity_error(node, "1")),
    }
}

fn compile_describe(node: &ParseTreeNode, tables: &TableMap) -> Result<QueryObject> {
    if node.children.is_empty() {
        return Err(arity_error(node, "at least 1"));
    }
    let described = node
        .children
        .iter()
        .map(|child| -> Result<_> {
            let name = table_name(child)?;
            let table = tables
                .get(name)
                .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
            Ok((name.to_string(), Arc::clone(table)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(QueryObject::Describe(described))
}

/// `LOAD source AS name, ...`; every target name must be new.
fn compile_load(node: &ParseTreeNode, tables: &TableMap) -> Result<QueryObject> {
    if node.children.is_empty() {
        return Err(arity_error(node, "at least 1"));
    }
    let mut targets: Vec<LoadTarget> = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let (TokenKind::As, [source, name]) = (child.kind(), child.children.as_slice()) else {
            return Err(Error::Type(format!(
                "LOAD expects 'file AS name', found {}",
                child.token
            )));
        };
        let path = match (source.kind(), &source.token.literal) {
            (TokenKind::Identifier | TokenKind::StrLiteral, Some(Literal::Str(path))) => {
                PathBuf::from(path)
            }
            _ => {
                return Err(Error::Type(format!(
                    "LOAD source must be a file name, found {}",
                    source.token
                )))
            }
        };
        let name = table_name(name)?;
        if tables.contains_key(name) || targets.iter().any(|t| t.name == name) {
            return Err(Error::DuplicateTable(name.to_string()));
        }
        targets.push(LoadTarget {
            path,
            name: name.to_string(),
        });
    }
    Ok(QueryObject::Load(targets))
}

fn table_name(node: &ParseTreeNode) -> Result<&str> {
    node.identifier()
        .ok_or_else(|| Error::Type(format!("expected a table name, found {}", node.token)))
}

/// The clauses following FROM
#[derive(Default)]
struct Clauses<'a> {
    filter: Option<&'a ParseTreeNode>,
    limit: Option<usize>,
    offset: usize,
}

fn clause_error(message: impl Into<String>) -> Error {
    Error::ClauseOrder(message.into())
}

/// Check clause order and pull WHERE, LIMIT and OFFSET out of the trailing
/// children of a SELECT.
fn scan_clauses(children: &[ParseTreeNode]) -> Result<Clauses<'_>> {
    let mut clauses = Clauses::default();
    let mut seen_limit = false;
    let mut seen_offset = false;
    for child in children {
        match child.kind() {
            TokenKind::Where => {
                if seen_limit || seen_offset {
                    return Err(clause_error("WHERE after LIMIT or OFFSET"));
                }
                if clauses.filter.is_some() {
                    return Err(clause_error("more than one WHERE"));
                }
                let [predicate] = child.children.as_slice() else {
                    return Err(arity_error(child, "1"));
                };
                clauses.filter = Some(predicate);
            }
            TokenKind::Limit => {
                if seen_offset {
                    return Err(clause_error("OFFSET before LIMIT"));
                }
                if seen_limit {
                    return Err(clause_error("more than one LIMIT"));
                }
                seen_limit = true;
                clauses.limit = Some(count_argument(child)?);
            }
            TokenKind::Offset => {
                if !seen_limit {
                    return Err(clause_error("OFFSET without LIMIT"));
                }
                if seen_offset {
                    return Err(clause_error("more than one OFFSET"));
                }
                seen_offset = true;
                clauses.offset = count_argument(child)?;
            }
            TokenKind::From => return Err(clause_error("more than one FROM")),
            _ => {
                return Err(clause_error(format!(
                    "{} after the FROM clause",
                    child.token
                )))
            }
        }
    }
    Ok(clauses)
}

/// Argument of LIMIT or OFFSET: a non-negative integer literal
fn count_argument(node: &ParseTreeNode) -> Result<usize> {
    let [argument] = node.children.as_slice() else {
        return Err(arity_error(node, "1"));
    };
    argument
        .token
        .as_int()
        .filter(|_| argument.kind() == TokenKind::IntLiteral)
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| {
            Error::Type(format!(
                "{} expects a non-negative integer, found {}",
                node.token, argument.token
            ))
        })
}

fn is_aggregate(item: &ParseTreeNode) -> bool {
    match item.kind() {
        TokenKind::Function => true,
        TokenKind::As => item
            .children
            .first()
            .is_some_and(|inner| inner.kind() == TokenKind::Function),
        _ => false,
    }
}

/// Split `expr AS name` into the expression and its output name.
fn output_name(item: &ParseTreeNode, index: usize) -> Result<(&ParseTreeNode, String)> {
    if item.kind() == TokenKind::As {
        let [expression, alias] = item.children.as_slice() else {
            return Err(arity_error(item, "2"));
        };
        let alias = alias.identifier().ok_or_else(|| {
            Error::Type(format!("column alias must be a name, found {}", alias.token))
        })?;
        return Ok((expression, alias.to_string()));
    }
    let name = match item.identifier() {
        Some(column) => column.to_string(),
        None => format!("col_{}", index),
    };
    Ok((item, name))
}

/// Compile a SELECT node into a streaming view.
pub fn compile_select(node: &ParseTreeNode, tables: &TableMap) -> Result<TableView> {
    let from = node
        .children
        .iter()
        .position(|child| child.kind() == TokenKind::From)
        .ok_or_else(|| clause_error("SELECT without FROM"))?;
    let (items, rest) = node.children.split_at(from);
    if items.is_empty() {
        return Err(clause_error("SELECT without a projection list"));
    }
    if let Some(clause) = items.iter().find(|item| {
        matches!(
            item.kind(),
            TokenKind::Where | TokenKind::Limit | TokenKind::Offset
        )
    }) {
        return Err(clause_error(format!("{} before FROM", clause.token)));
    }
    let clauses = scan_clauses(&rest[1..])?;

    let [source] = rest[0].children.as_slice() else {
        return Err(arity_error(&rest[0], "1"));
    };
    let view = compile_view(source, tables)?;
    let filters = match clauses.filter {
        Some(predicate) => vec![Predicate::compile(predicate, &view)?],
        None => Vec::new(),
    };

    let aggregates = items.iter().filter(|item| is_aggregate(item)).count();
    if aggregates == items.len() {
        let mut aggregators = Vec::with_capacity(items.len());
        let mut names = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let (call, name) = output_name(item, index)?;
            aggregators.push(Aggregator::compile(call, &view)?);
            names.push(name);
        }
        let source = SelectSource::new(view, filters, clauses.limit, clauses.offset);
        return Ok(TableView::AggregateSelect(AggregateSelect::new(
            source,
            aggregators,
            names,
        )?));
    }
    if aggregates > 0 {
        return Err(Error::MixedSelect);
    }

    let mut columns = Vec::new();
    let mut names = Vec::new();
    for item in items {
        if item.kind() == TokenKind::SelectAll {
            for (index, (name, ty)) in view
                .column_names()
                .iter()
                .zip(view.column_types())
                .enumerate()
            {
                columns.push(Expression::column(index, *ty));
                names.push(name.clone());
            }
            continue;
        }
        let (expression, name) = output_name(item, columns.len())?;
        columns.push(Expression::compile(expression, &view)?);
        names.push(name);
    }
    let source = SelectSource::new(view, filters, clauses.limit, clauses.offset);
    Ok(TableView::ColumnSelect(ColumnSelect::new(
        source, columns, names,
    )))
}

/// Compile the argument of FROM, or one side of a join.
pub fn compile_view(node: &ParseTreeNode, tables: &TableMap) -> Result<TableView> {
    match node.kind() {
        TokenKind::Identifier => {
            let name = table_name(node)?;
            let table = tables
                .get(name)
                .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
            Ok(TableView::Scan(TableIterator::new(name, Arc::clone(table))))
        }
        TokenKind::As => {
            let [inner, alias] = node.children.as_slice() else {
                return Err(arity_error(node, "2"));
            };
            let alias = alias.identifier().ok_or_else(|| {
                Error::Type(format!("table alias must be a name, found {}", alias.token))
            })?;
            let mut view = compile_view(inner, tables)?;
            view.set_name(alias.to_string());
            Ok(view)
        }
        kind if kind.is_indexed_join() => {
            let [on, right, left] = node.children.as_slice() else {
                return Err(arity_error(node, "3"));
            };
            let keys = join_keys(on)?;
            let left = compile_view(left, tables)?.load()?;
            let right = compile_view(right, tables)?.load()?;
            let view = match kind {
                TokenKind::InnerJoin => TableView::InnerJoin(InnerJoin::new(left, right, &keys)?),
                TokenKind::LeftJoin => {
                    TableView::LeftOuterJoin(SideOuterJoin::left(left, right, &keys)?)
                }
                TokenKind::RightJoin => {
                    TableView::RightOuterJoin(SideOuterJoin::right(left, right, &keys)?)
                }
                _ => TableView::OuterJoin(OuterJoin::new(left, right, &keys)?),
            };
            Ok(view)
        }
        TokenKind::CrossJoin => {
            let [left, right] = node.children.as_slice() else {
                return Err(arity_error(node, "2"));
            };
            let left = compile_view(left, tables)?.load()?;
            let right = compile_view(right, tables)?.load()?;
            Ok(TableView::CrossJoin(CrossJoin::new(left, right)))
        }
        TokenKind::Select => compile_select(node, tables),
        _ => Err(Error::Type(format!(
            "{} cannot be used as a table",
            node.token
        ))),
    }
}

/// Column names of `ON a = b`
fn join_keys(on: &ParseTreeNode) -> Result<JoinKeys> {
    let [predicate] = on.children.as_slice() else {
        return Err(Error::Type(format!(
            "join condition must be ON column = column, found {}",
            on.token
        )));
    };
    if on.kind() == TokenKind::On && predicate.kind() == TokenKind::Eq {
        if let [left, right] = predicate.children.as_slice() {
            if let (Some(left), Some(right)) = (left.identifier(), right.identifier()) {
                return Ok(JoinKeys::new(left, right));
            }
        }
    }
    Err(Error::NotImplemented(format!(
        "join condition other than column = column: {}",
        predicate.token
    )))
}
