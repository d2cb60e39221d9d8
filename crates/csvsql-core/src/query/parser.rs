/// Parser for csvsql queries
///
/// Operator-precedence parsing over two stacks. Values (and echoed operator
/// markers) live on the value stack; pending operators live on the
/// operator stack. Clause keywords are ordinary operators with low
/// precedence, so `SELECT ... FROM ... WHERE ...` binds through the same
/// mechanism as `a + b * c`.
use super::ast::ParseTreeNode;
use super::lexer::{Token, TokenKind};
use std::fmt;

/// Operators with precedence at or below this bind a variadic argument
/// list; a comma binds everything above it.
pub const VARIADIC_THRESHOLD: u8 = 3;

/// How an operator collects its arguments when bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `left op right`
    Binary,
    /// `op a, b, c` down to the opening marker
    Variadic,
    /// `left op right ON predicate`, bound as `[on, right, left]`
    Join,
    /// `op operand`
    Unary,
}

/// Binding precedence of an operator, low to high
pub fn precedence(kind: TokenKind) -> Option<u8> {
    use TokenKind::*;
    let level = match kind {
        ParenOpen | Function => 0,
        Select | Show | Describe | Load => 1,
        Limit | Offset => 2,
        Where => 3,
        From => 4,
        As | InnerJoin | LeftJoin | RightJoin | OuterJoin | CrossJoin => 5,
        On => 6,
        Or => 7,
        And => 8,
        Eq | Ne | Lt | Le | Gt | Ge => 9,
        Plus | Minus => 10,
        Star | Slash | Percent => 11,
        Caret => 12,
        Negate | Not => 13,
        _ => return None,
    };
    Some(level)
}

/// Arity class of an operator
pub fn arity(kind: TokenKind) -> Option<Arity> {
    use TokenKind::*;
    let class = match kind {
        Plus | Minus | Star | Slash | Percent | Caret | Eq | Ne | Lt | Le | Gt | Ge | And | Or
        | As | CrossJoin => Arity::Binary,
        Select | From | Where | Limit | Load => Arity::Variadic,
        InnerJoin | LeftJoin | RightJoin | OuterJoin => Arity::Join,
        Offset | Show | Describe | On | Not | Negate => Arity::Unary,
        _ => return None,
    };
    Some(class)
}

/// Parse one statement into a parse tree.
///
/// A single trailing `END` token is accepted.
pub fn parse(tokens: &[Token]) -> Result<ParseTreeNode, ParseError> {
    let tokens = strip_terminator(tokens)?;
    let mut parser = Parser::default();
    for token in tokens {
        parser.push(token.clone())?;
    }
    parser.finish()
}

fn strip_terminator(tokens: &[Token]) -> Result<&[Token], ParseError> {
    match tokens.iter().position(|t| t.kind == TokenKind::End) {
        None => Ok(tokens),
        Some(i) if i + 1 == tokens.len() => Ok(&tokens[..i]),
        Some(i) => Err(ParseError::TrailingTokens(tokens[i + 1].clone())),
    }
}

/// Value stack entry
#[derive(Debug)]
enum StackEntry {
    /// A bound subtree
    Value(ParseTreeNode),
    /// Operator marker, open paren, function start or comma sentinel
    Operation(Token),
}

#[derive(Debug, Default)]
struct Parser {
    values: Vec<StackEntry>,
    operations: Vec<Token>,
}

impl Parser {
    fn push(&mut self, token: Token) -> Result<(), ParseError> {
        match token.kind {
            TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StrLiteral
            | TokenKind::Identifier
            | TokenKind::Tables
            | TokenKind::Exit => self.push_value(ParseTreeNode::leaf(token)),
            TokenKind::ParenOpen | TokenKind::Function => {
                if self.top_is_value() {
                    return Err(ParseError::UnexpectedToken(token));
                }
                self.operations.push(token.clone());
                self.values.push(StackEntry::Operation(token));
                Ok(())
            }
            TokenKind::ParenClose => self.close_paren(),
            TokenKind::Comma => {
                while let Some(top) = self.operations.last().map(|t| t.kind) {
                    if precedence(top).unwrap_or(0) <= VARIADIC_THRESHOLD {
                        break;
                    }
                    self.bind_next()?;
                }
                // Sentinel: keeps `f(a + b, * c)` from binding across the comma
                self.values.push(StackEntry::Operation(token));
                Ok(())
            }
            TokenKind::Minus if !self.top_is_value() => {
                self.push_prefix(token.with_kind(TokenKind::Negate))
            }
            TokenKind::Not => self.push_prefix(token),
            TokenKind::Star if !self.top_is_value() => {
                if self.values.is_empty() {
                    return Err(ParseError::UnresolvedStar);
                }
                self.values.push(StackEntry::Value(ParseTreeNode::leaf(
                    token.with_kind(TokenKind::SelectAll),
                )));
                Ok(())
            }
            TokenKind::Negate | TokenKind::SelectAll | TokenKind::End => {
                Err(ParseError::UnexpectedToken(token))
            }
            _ => self.push_operator(token),
        }
    }

    fn top_is_value(&self) -> bool {
        matches!(self.values.last(), Some(StackEntry::Value(_)))
    }

    fn push_value(&mut self, node: ParseTreeNode) -> Result<(), ParseError> {
        if self.top_is_value() {
            return Err(ParseError::UnexpectedValue(node.token));
        }
        self.values.push(StackEntry::Value(node));
        Ok(())
    }

    /// Prefix operators are pushed without binding anything below them.
    fn push_prefix(&mut self, token: Token) -> Result<(), ParseError> {
        if self.top_is_value() {
            return Err(ParseError::UnexpectedToken(token));
        }
        self.operations.push(token.clone());
        self.values.push(StackEntry::Operation(token));
        Ok(())
    }

    fn push_operator(&mut self, token: Token) -> Result<(), ParseError> {
        let incoming = match precedence(token.kind) {
            Some(level) => level,
            None => return Err(ParseError::UnexpectedToken(token)),
        };
        while let Some(top) = self.operations.last().map(|t| t.kind) {
            if precedence(top).unwrap_or(0) < incoming {
                break;
            }
            self.bind_next()?;
        }
        self.operations.push(token.clone());
        self.values.push(StackEntry::Operation(token));
        Ok(())
    }

    fn close_paren(&mut self) -> Result<(), ParseError> {
        loop {
            match self.operations.last().map(|t| t.kind) {
                Some(TokenKind::ParenOpen) => break,
                Some(_) => self.bind_next()?,
                None => return Err(ParseError::UnmatchedParenthesis),
            }
        }
        self.operations.pop();

        let mut args = Vec::new();
        loop {
            match self.values.pop() {
                Some(StackEntry::Operation(t)) if t.kind == TokenKind::ParenOpen => break,
                Some(StackEntry::Operation(t)) if t.kind == TokenKind::Comma => {}
                Some(StackEntry::Value(node)) => args.push(node),
                _ => return Err(ParseError::UnmatchedParenthesis),
            }
        }
        args.reverse();

        let is_call = matches!(
            self.values.last(),
            Some(StackEntry::Operation(t)) if t.kind == TokenKind::Function
        );
        if is_call {
            self.values.pop();
            let function = match self.operations.pop() {
                Some(t) if t.kind == TokenKind::Function => t,
                _ => return Err(ParseError::UnmatchedParenthesis),
            };
            self.values
                .push(StackEntry::Value(ParseTreeNode::new(function, args)));
            return Ok(());
        }

        // Tuples are not supported: one argument is a grouped expression
        match args.pop() {
            Some(node) if args.is_empty() => {
                self.values.push(StackEntry::Value(node));
                Ok(())
            }
            Some(_) => Err(ParseError::TooManyArguments(TokenKind::ParenOpen)),
            None => Err(ParseError::EmptyParentheses),
        }
    }

    /// Pop the top operator and bind it into a value
    fn bind_next(&mut self) -> Result<(), ParseError> {
        let op = match self.operations.pop() {
            Some(op) => op,
            None => return Err(ParseError::Empty),
        };
        self.bind_top(op)
    }

    fn bind_top(&mut self, op: Token) -> Result<(), ParseError> {
        let node = match arity(op.kind) {
            Some(Arity::Binary) => self.bind_binary(op)?,
            Some(Arity::Variadic) => self.bind_variadic(op)?,
            Some(Arity::Join) => self.bind_join(op)?,
            Some(Arity::Unary) => self.bind_unary(op)?,
            None if matches!(op.kind, TokenKind::ParenOpen | TokenKind::Function) => {
                return Err(ParseError::UnclosedParenthesis)
            }
            None => return Err(ParseError::UnexpectedToken(op)),
        };
        self.values.push(StackEntry::Value(node));
        Ok(())
    }

    fn pop_value(&mut self, kind: TokenKind) -> Result<ParseTreeNode, ParseError> {
        match self.values.pop() {
            Some(StackEntry::Value(node)) => Ok(node),
            _ => Err(ParseError::MissingOperand(kind)),
        }
    }

    fn pop_marker(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        match self.values.pop() {
            Some(StackEntry::Operation(t)) if t.kind == kind => Ok(()),
            _ => Err(ParseError::OperatorMismatch(kind)),
        }
    }

    fn bind_binary(&mut self, op: Token) -> Result<ParseTreeNode, ParseError> {
        let right = self.pop_value(op.kind)?;
        self.pop_marker(op.kind)?;
        let left = self.pop_value(op.kind)?;
        Ok(ParseTreeNode::new(op, vec![left, right]))
    }

    fn bind_variadic(&mut self, op: Token) -> Result<ParseTreeNode, ParseError> {
        let mut args = Vec::new();
        loop {
            match self.values.pop() {
                Some(StackEntry::Operation(t)) if t.kind == op.kind => break,
                Some(StackEntry::Operation(t)) if t.kind == TokenKind::Comma => {}
                Some(StackEntry::Value(node)) => args.push(node),
                _ => return Err(ParseError::OperatorMismatch(op.kind)),
            }
        }
        args.reverse();
        Ok(ParseTreeNode::new(op, args))
    }

    fn bind_join(&mut self, op: Token) -> Result<ParseTreeNode, ParseError> {
        let mut args = Vec::new();
        loop {
            match self.values.pop() {
                Some(StackEntry::Operation(t)) if t.kind == op.kind => break,
                Some(StackEntry::Value(node)) => args.push(node),
                _ => return Err(ParseError::OperatorMismatch(op.kind)),
            }
        }
        if args.len() > 2 {
            return Err(ParseError::TooManyArguments(op.kind));
        }
        let left = self.pop_value(op.kind)?;
        args.push(left);
        Ok(ParseTreeNode::new(op, args))
    }

    fn bind_unary(&mut self, op: Token) -> Result<ParseTreeNode, ParseError> {
        let operand = self.pop_value(op.kind)?;
        self.pop_marker(op.kind)?;
        Ok(ParseTreeNode::new(op, vec![operand]))
    }

    fn finish(mut self) -> Result<ParseTreeNode, ParseError> {
        while !self.operations.is_empty() {
            self.bind_next()?;
        }
        if self.values.len() > 1 {
            return Err(ParseError::UnboundExpressions(self.values.len()));
        }
        match self.values.pop() {
            Some(StackEntry::Value(node)) => Ok(node),
            Some(StackEntry::Operation(t)) => Err(ParseError::UnexpectedToken(t)),
            None => Err(ParseError::Empty),
        }
    }
}

/// Parser errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    UnexpectedToken(Token),
    UnexpectedValue(Token),
    UnresolvedStar,
    UnmatchedParenthesis,
    UnclosedParenthesis,
    EmptyParentheses,
    MissingOperand(TokenKind),
    OperatorMismatch(TokenKind),
    TooManyArguments(TokenKind),
    UnboundExpressions(usize),
    TrailingTokens(Token),
    /// Bound node has the wrong number of children for its binder
    ArgumentCount {
        operator: String,
        expected: &'static str,
        found: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "Empty statement"),
            ParseError::UnexpectedToken(t) => write!(f, "Unexpected token: {}", t),
            ParseError::UnexpectedValue(t) => {
                write!(f, "Attempting to push unbindable value: {}", t)
            }
            ParseError::UnresolvedStar => write!(f, "Could not resolve *"),
            ParseError::UnmatchedParenthesis => write!(f, "Unmatched close parenthesis"),
            ParseError::UnclosedParenthesis => write!(f, "Unclosed open parenthesis"),
            ParseError::EmptyParentheses => write!(f, "Empty parentheses"),
            ParseError::MissingOperand(kind) => {
                write!(f, "Not enough arguments to bind operator: {}", kind)
            }
            ParseError::OperatorMismatch(kind) => {
                write!(f, "Error when attempting to bind: {}", kind)
            }
            ParseError::TooManyArguments(kind) => {
                write!(f, "Too many arguments bound to: {}", kind)
            }
            ParseError::UnboundExpressions(n) => write!(
                f,
                "Unbound expressions after attempting to build parse tree ({} values left)",
                n
            ),
            ParseError::TrailingTokens(t) => {
                write!(f, "Unexpected token after end of statement: {}", t)
            }
            ParseError::ArgumentCount {
                operator,
                expected,
                found,
            } => write!(
                f,
                "{} expects {} argument(s), found {}",
                operator, expected, found
            ),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::Lexer;

    fn parse_str(input: &str) -> Result<ParseTreeNode, ParseError> {
        let mut lexer = Lexer::new(input);
        parse(&lexer.tokenize().unwrap())
    }

    fn kinds(node: &ParseTreeNode) -> Vec<TokenKind> {
        node.children.iter().map(|c| c.kind()).collect()
    }

    #[test]
    fn test_simple_select() {
        let tree = parse_str("SELECT x FROM t WHERE id = 1").unwrap();

        assert_eq!(tree.kind(), TokenKind::Select);
        assert_eq!(
            kinds(&tree),
            vec![TokenKind::Identifier, TokenKind::From, TokenKind::Where]
        );
        let where_clause = &tree.children[2];
        assert_eq!(where_clause.children[0].kind(), TokenKind::Eq);
        assert_eq!(where_clause.children[0].children[0].identifier(), Some("id"));
    }

    #[test]
    fn test_select_list_in_source_order() {
        let tree = parse_str("SELECT a, b + 1, c FROM t").unwrap();
        assert_eq!(tree.children[0].identifier(), Some("a"));
        assert_eq!(tree.children[1].kind(), TokenKind::Plus);
        assert_eq!(tree.children[2].identifier(), Some("c"));
        assert_eq!(tree.children[3].kind(), TokenKind::From);
    }

    #[test]
    fn test_arithmetic_precedence() {
        let tree = parse_str("1 + 2 * 3").unwrap();
        assert_eq!(tree.kind(), TokenKind::Plus);
        assert_eq!(tree.children[1].kind(), TokenKind::Star);

        let tree = parse_str("(1 + 2) * 3").unwrap();
        assert_eq!(tree.kind(), TokenKind::Star);
        assert_eq!(tree.children[0].kind(), TokenKind::Plus);
    }

    #[test]
    fn test_left_associative() {
        let tree = parse_str("1 - 2 - 3").unwrap();
        assert_eq!(tree.kind(), TokenKind::Minus);
        assert_eq!(tree.children[0].kind(), TokenKind::Minus);
        assert_eq!(tree.children[1].token, Token::int(3));
    }

    #[test]
    fn test_unary_negate() {
        let tree = parse_str("-x + 1").unwrap();
        assert_eq!(tree.kind(), TokenKind::Plus);
        assert_eq!(tree.children[0].kind(), TokenKind::Negate);

        let tree = parse_str("2 * - - 3").unwrap();
        assert_eq!(tree.children[1].kind(), TokenKind::Negate);
        assert_eq!(tree.children[1].children[0].kind(), TokenKind::Negate);
    }

    #[test]
    fn test_select_all() {
        let tree = parse_str("SELECT * FROM t").unwrap();
        assert_eq!(kinds(&tree), vec![TokenKind::SelectAll, TokenKind::From]);
    }

    #[test]
    fn test_star_without_context() {
        assert_eq!(parse_str("* 2"), Err(ParseError::UnresolvedStar));
    }

    #[test]
    fn test_function_call() {
        let tree = parse_str("SELECT median(x + 1) FROM t").unwrap();
        let call = &tree.children[0];
        assert_eq!(call.kind(), TokenKind::Function);
        assert_eq!(call.token.text(), Some("median"));
        assert_eq!(kinds(call), vec![TokenKind::Plus]);
    }

    #[test]
    fn test_function_args_in_source_order() {
        let tree = parse_str("f(a, b)").unwrap();
        assert_eq!(tree.children[0].identifier(), Some("a"));
        assert_eq!(tree.children[1].identifier(), Some("b"));
    }

    #[test]
    fn test_join_argument_order() {
        let tree = parse_str("SELECT * FROM a INNER JOIN b ON a.id = b.id").unwrap();
        let from = &tree.children[1];
        let join = &from.children[0];
        assert_eq!(join.kind(), TokenKind::InnerJoin);
        assert_eq!(
            kinds(join),
            vec![TokenKind::On, TokenKind::Identifier, TokenKind::Identifier]
        );
        assert_eq!(join.children[1].identifier(), Some("b"));
        assert_eq!(join.children[2].identifier(), Some("a"));
    }

    #[test]
    fn test_chained_joins_are_left_nested() {
        let tree =
            parse_str("SELECT * FROM a JOIN b ON a.id = b.id LEFT JOIN c ON b.id = c.id").unwrap();
        let outer = &tree.children[1].children[0];
        assert_eq!(outer.kind(), TokenKind::LeftJoin);
        assert_eq!(outer.children[2].kind(), TokenKind::InnerJoin);
    }

    #[test]
    fn test_cross_join_is_binary() {
        let tree = parse_str("SELECT * FROM a CROSS JOIN b").unwrap();
        let join = &tree.children[1].children[0];
        assert_eq!(join.kind(), TokenKind::CrossJoin);
        assert_eq!(join.children[0].identifier(), Some("a"));
        assert_eq!(join.children[1].identifier(), Some("b"));
    }

    #[test]
    fn test_limit_offset_clauses() {
        let tree = parse_str("SELECT x FROM t LIMIT 1 OFFSET 2").unwrap();
        assert_eq!(
            kinds(&tree),
            vec![
                TokenKind::Identifier,
                TokenKind::From,
                TokenKind::Limit,
                TokenKind::Offset
            ]
        );
        assert_eq!(tree.children[3].children[0].token, Token::int(2));
    }

    #[test]
    fn test_alias() {
        let tree = parse_str("SELECT a + b AS total FROM t").unwrap();
        let alias = &tree.children[0];
        assert_eq!(alias.kind(), TokenKind::As);
        assert_eq!(alias.children[0].kind(), TokenKind::Plus);
        assert_eq!(alias.children[1].identifier(), Some("total"));
    }

    #[test]
    fn test_logical_precedence() {
        let tree = parse_str("SELECT x FROM t WHERE a = 1 OR b = 2 AND c = 3").unwrap();
        let predicate = &tree.children[2].children[0];
        assert_eq!(predicate.kind(), TokenKind::Or);
        assert_eq!(predicate.children[1].kind(), TokenKind::And);
    }

    #[test]
    fn test_show_load_exit() {
        let tree = parse_str("SHOW TABLES").unwrap();
        assert_eq!(tree.kind(), TokenKind::Show);
        assert_eq!(kinds(&tree), vec![TokenKind::Tables]);

        let tree = parse_str("LOAD a.csv AS a, b.csv AS b").unwrap();
        assert_eq!(kinds(&tree), vec![TokenKind::As, TokenKind::As]);

        let tree = parse_str("EXIT;").unwrap();
        assert_eq!(tree.kind(), TokenKind::Exit);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_exit_with_arguments() {
        assert!(matches!(
            parse_str("EXIT now"),
            Err(ParseError::UnexpectedValue(_))
        ));
    }

    #[test]
    fn test_adjacent_values() {
        assert!(matches!(
            parse_str("SELECT x y FROM t"),
            Err(ParseError::UnexpectedValue(_))
        ));
    }

    #[test]
    fn test_unbound_expressions() {
        assert_eq!(parse_str("1, 2"), Err(ParseError::UnboundExpressions(3)));
    }

    #[test]
    fn test_parentheses_errors() {
        assert_eq!(parse_str("(1 + 2"), Err(ParseError::UnclosedParenthesis));
        assert_eq!(parse_str("1 + 2)"), Err(ParseError::UnmatchedParenthesis));
        assert_eq!(
            parse_str("SELECT (1, 2) FROM t"),
            Err(ParseError::TooManyArguments(TokenKind::ParenOpen))
        );
        assert_eq!(parse_str("()"), Err(ParseError::EmptyParentheses));
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(
            parse_str("1 +"),
            Err(ParseError::MissingOperand(TokenKind::Plus))
        );
    }

    #[test]
    fn test_tokens_after_end() {
        assert!(matches!(
            parse_str("SHOW TABLES; EXIT"),
            Err(ParseError::TrailingTokens(_))
        ));
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(parse(&[]), Err(ParseError::Empty));
    }

    #[test]
    fn test_precedence_ladder() {
        let ladder = [
            TokenKind::ParenOpen,
            TokenKind::Select,
            TokenKind::Limit,
            TokenKind::Where,
            TokenKind::From,
            TokenKind::As,
            TokenKind::On,
            TokenKind::Or,
            TokenKind::And,
            TokenKind::Eq,
            TokenKind::Plus,
            TokenKind::Star,
            TokenKind::Caret,
            TokenKind::Negate,
        ];
        for pair in ladder.windows(2) {
            assert!(precedence(pair[0]) < precedence(pair[1]), "{:?}", pair);
        }
        assert_eq!(precedence(TokenKind::InnerJoin), precedence(TokenKind::As));
        assert_eq!(precedence(TokenKind::Not), precedence(TokenKind::Negate));
        assert_eq!(precedence(TokenKind::Identifier), None);
    }

    #[test]
    fn test_arity_classes() {
        assert_eq!(arity(TokenKind::CrossJoin), Some(Arity::Binary));
        assert_eq!(arity(TokenKind::LeftJoin), Some(Arity::Join));
        assert_eq!(arity(TokenKind::Load), Some(Arity::Variadic));
        assert_eq!(arity(TokenKind::Offset), Some(Arity::Unary));
        assert_eq!(arity(TokenKind::Comma), None);
    }
}
