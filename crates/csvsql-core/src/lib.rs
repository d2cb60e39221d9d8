//! # csvsql Core
//!
//! Query compiler and streaming execution engine for csvsql.
//!
//! Statements flow through [`query::Lexer`], [`query::parse`] and
//! [`query::compile_query`]; the resulting [`query::QueryObject`] runs
//! against a [`TableMap`] of CSV tables loaded with [`loader`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
#[allow(missing_docs)]
pub mod loader;
pub mod query;
#[allow(missing_docs)]
pub mod table;

pub use error::{Error, Result};
pub use table::{Cell, CellType, Table, TableMap};
