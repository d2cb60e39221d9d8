//! Query engine module
//!
//! Lexing, parsing, binding and streaming execution of csvsql statements.

/// Aggregate functions
#[allow(missing_docs)]
pub mod aggregate;
/// Parse tree
#[allow(missing_docs)]
pub mod ast;
/// Statement execution
#[allow(missing_docs)]
pub mod executor;
/// Scalar expressions
#[allow(missing_docs)]
pub mod expression;
/// Hash and cross joins
#[allow(missing_docs)]
pub mod join;
/// SQL lexer
#[allow(missing_docs)]
pub mod lexer;
/// SQL parser
#[allow(missing_docs)]
pub mod parser;
/// Query planner
#[allow(missing_docs)]
pub mod planner;
/// Boolean predicates
#[allow(missing_docs)]
pub mod predicate;
/// Streaming table views
#[allow(missing_docs)]
pub mod view;

// Re-export main types
pub use ast::ParseTreeNode;
pub use executor::{LoadReport, LoadTarget, QueryObject, QueryResult, TableSchema};
pub use lexer::{split_statements, Lexer, LexerError, Token, TokenKind};
pub use parser::{parse, ParseError};
pub use planner::compile_query;
pub use view::{TableIterator, TableView};

use crate::error::{Error, Result};

/// Lex and parse a single statement.
pub fn parse_statement(input: &str) -> Result<ParseTreeNode> {
    let tokens = Lexer::new(input).tokenize()?;
    Ok(parse(&tokens)?)
}

/// Argument-count error for a node whose operator expects `expected`
/// arguments
pub(crate) fn arity_error(node: &ParseTreeNode, expected: &'static str) -> Error {
    Error::Parse(ParseError::ArgumentCount {
        operator: node.token.to_string(),
        expected,
        found: node.children.len(),
    })
}
