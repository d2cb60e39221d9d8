/// Parse tree produced by the parser
///
/// Every node is a token plus its ordered children. Clauses and
/// expressions share the same shape: `SELECT` is a node whose children are
/// the projection list followed by its clause nodes.
use std::fmt;

use super::lexer::{Token, TokenKind};

/// A node of the parse tree
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTreeNode {
    pub token: Token,
    pub children: Vec<ParseTreeNode>,
}

impl ParseTreeNode {
    pub fn new(token: Token, children: Vec<ParseTreeNode>) -> Self {
        Self { token, children }
    }

    /// Node without children
    pub fn leaf(token: Token) -> Self {
        Self {
            token,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    /// Name carried by an identifier leaf
    pub fn identifier(&self) -> Option<&str> {
        match self.token.kind {
            TokenKind::Identifier => self.token.text(),
            _ => None,
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.token, indent = depth * 2)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ParseTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
