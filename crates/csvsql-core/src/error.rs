//! Error types for csvsql.

use std::fmt;

use crate::query::lexer::LexerError;
use crate::query::parser::ParseError;

/// The main error type for csvsql operations.
///
/// Every variant is terminal for the statement that raised it; callers
/// report it and move on to the next statement.
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Malformed CSV input
    Csv(String),

    /// Tokenizer rejected the query text
    Lex(LexerError),

    /// Malformed token stream (arity, parentheses, dangling values)
    Parse(ParseError),

    /// SELECT clauses in an illegal order or combination
    ClauseOrder(String),

    /// Column expressions and aggregate calls mixed in one projection list
    MixedSelect,

    /// Reference to a table that is not loaded
    UnknownTable(String),

    /// LOAD into a table name that is already taken
    DuplicateTable(String),

    /// Identifier does not name a column of the bound view
    ColumnResolution(String),

    /// Operand types not supported by the operation
    Type(String),

    /// Aggregate finalized without any accumulated rows
    EmptyAggregate(String),

    /// Recognized but unsupported construct
    NotImplemented(String),

    /// Rejected by API-level input validation
    InvalidInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Csv(msg) => write!(f, "CSV error: {}", msg),
            Error::Lex(e) => write!(f, "Lexer error: {}", e),
            Error::Parse(e) => write!(f, "Parse error: {}", e),
            Error::ClauseOrder(msg) => write!(f, "Clause order error: {}", msg),
            Error::MixedSelect => write!(
                f,
                "Cannot mix column expressions and aggregate functions in one SELECT"
            ),
            Error::UnknownTable(name) => write!(f, "Unknown table: {}", name),
            Error::DuplicateTable(name) => write!(f, "Table already loaded: {}", name),
            Error::ColumnResolution(msg) => write!(f, "Could not resolve column: {}", msg),
            Error::Type(msg) => write!(f, "Type error: {}", msg),
            Error::EmptyAggregate(name) => write!(f, "Aggregate {} over zero rows", name),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Lex(e) => Some(e),
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err.to_string())
    }
}

impl From<LexerError> for Error {
    fn from(err: LexerError) -> Self {
        Error::Lex(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

/// A specialized `Result` type for csvsql operations.
pub type Result<T> = std::result::Result<T, Error>;
