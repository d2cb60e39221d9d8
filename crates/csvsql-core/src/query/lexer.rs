/// Lexer for tokenizing csvsql queries
///
/// Converts raw query text into a stream of tokens for the parser. The
/// context-sensitive readings of `-` and `*` are left to the parser.
use std::fmt;

/// Token kinds produced by the lexer (and the two the parser rewrites to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Clause keywords
    Select,
    From,
    Where,
    Limit,
    Offset,
    As,
    Show,
    Tables,
    Describe,
    Load,
    Exit,

    // Joins
    InnerJoin,
    LeftJoin,
    RightJoin,
    OuterJoin,
    CrossJoin,
    On,

    // Logical
    And,
    Or,
    Not,

    // Comparisons
    Eq, // =
    Ne, // <> or !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    Caret,   // ^

    // Rewritten by the parser from Minus and Star
    Negate,
    SelectAll,

    // Punctuation
    ParenOpen,  // (
    ParenClose, // )
    Comma,      // ,

    /// Identifier immediately followed by `(`
    Function,

    // Literals
    IntLiteral,
    FloatLiteral,
    StrLiteral,
    Identifier,

    /// Statement terminator `;`
    End,
}

impl TokenKind {
    /// Whether this kind is one of the hash-indexed join kinds
    pub fn is_indexed_join(self) -> bool {
        matches!(
            self,
            TokenKind::InnerJoin | TokenKind::LeftJoin | TokenKind::RightJoin | TokenKind::OuterJoin
        )
    }

    /// Whether this kind is a comparison operator
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Gt
                | TokenKind::Ge
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Select => "SELECT",
            TokenKind::From => "FROM",
            TokenKind::Where => "WHERE",
            TokenKind::Limit => "LIMIT",
            TokenKind::Offset => "OFFSET",
            TokenKind::As => "AS",
            TokenKind::Show => "SHOW",
            TokenKind::Tables => "TABLES",
            TokenKind::Describe => "DESCRIBE",
            TokenKind::Load => "LOAD",
            TokenKind::Exit => "EXIT",
            TokenKind::InnerJoin => "INNER JOIN",
            TokenKind::LeftJoin => "LEFT JOIN",
            TokenKind::RightJoin => "RIGHT JOIN",
            TokenKind::OuterJoin => "OUTER JOIN",
            TokenKind::CrossJoin => "CROSS JOIN",
            TokenKind::On => "ON",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Eq => "=",
            TokenKind::Ne => "<>",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Negate => "NEGATE",
            TokenKind::SelectAll => "SELECT_ALL",
            TokenKind::ParenOpen => "(",
            TokenKind::ParenClose => ")",
            TokenKind::Comma => ",",
            TokenKind::Function => "FUNCTION",
            TokenKind::IntLiteral => "INT_LITERAL",
            TokenKind::FloatLiteral => "FLOAT_LITERAL",
            TokenKind::StrLiteral => "STR_LITERAL",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::End => "END",
        };
        f.write_str(text)
    }
}

/// Literal payload carried by literal, identifier and function tokens
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

/// A token: its kind plus an optional payload
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: Option<Literal>,
}

impl Token {
    /// Token without a payload
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            literal: None,
        }
    }

    pub fn int(value: i64) -> Self {
        Self {
            kind: TokenKind::IntLiteral,
            literal: Some(Literal::Int(value)),
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            kind: TokenKind::FloatLiteral,
            literal: Some(Literal::Float(value)),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::StrLiteral,
            literal: Some(Literal::Str(value.into())),
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Identifier,
            literal: Some(Literal::Str(name.into())),
        }
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Function,
            literal: Some(Literal::Str(name.into())),
        }
    }

    /// Same token under a different kind (used for the parser rewrites)
    pub fn with_kind(mut self, kind: TokenKind) -> Self {
        self.kind = kind;
        self
    }

    /// Text payload of identifiers, functions and string literals
    pub fn text(&self) -> Option<&str> {
        match &self.literal {
            Some(Literal::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer payload of an int literal
    pub fn as_int(&self) -> Option<i64> {
        match self.literal {
            Some(Literal::Int(i)) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.literal) {
            (TokenKind::StrLiteral, Some(Literal::Str(s))) => write!(f, "'{}'", s),
            (TokenKind::Function, Some(Literal::Str(s))) => write!(f, "{}()", s),
            (_, Some(Literal::Str(s))) => write!(f, "{}", s),
            (_, Some(Literal::Int(i))) => write!(f, "{}", i),
            (_, Some(Literal::Float(x))) => write!(f, "{}", x),
            (kind, None) => write!(f, "{}", kind),
        }
    }
}

/// Lexer state
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer from input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        self.skip_whitespace();

        if self.position >= self.input.len() {
            return Ok(None);
        }

        let ch = self.current_char();

        let kind = match ch {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '^' => Some(TokenKind::Caret),
            '(' => Some(TokenKind::ParenOpen),
            ')' => Some(TokenKind::ParenClose),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::End),
            '=' => Some(TokenKind::Eq),
            '&' => Some(TokenKind::And),
            '|' => Some(TokenKind::Or),
            _ => None,
        };
        if let Some(kind) = kind {
            self.advance();
            return Ok(Some(Token::new(kind)));
        }

        match ch {
            '<' => {
                self.advance();
                let kind = if self.peek_is('=') {
                    TokenKind::Le
                } else if self.peek_is('>') {
                    TokenKind::Ne
                } else {
                    return Ok(Some(Token::new(TokenKind::Lt)));
                };
                self.advance();
                return Ok(Some(Token::new(kind)));
            }
            '>' => {
                self.advance();
                if self.peek_is('=') {
                    self.advance();
                    return Ok(Some(Token::new(TokenKind::Ge)));
                }
                return Ok(Some(Token::new(TokenKind::Gt)));
            }
            '!' => {
                self.advance();
                if self.peek_is('=') {
                    self.advance();
                    return Ok(Some(Token::new(TokenKind::Ne)));
                }
                return Ok(Some(Token::new(TokenKind::Not)));
            }
            '\'' | '"' => return self.read_string(ch).map(Some),
            _ => {}
        }

        // Numbers
        if ch.is_ascii_digit() {
            return self.read_number().map(Some);
        }

        // Identifiers and keywords
        if ch.is_alphabetic() || ch == '_' {
            return self.read_identifier_or_keyword().map(Some);
        }

        Err(LexerError::UnexpectedCharacter(ch))
    }

    /// Tokenize entire input into vector of tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_is(&self, expected: char) -> bool {
        self.input.get(self.position) == Some(&expected)
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.position < self.input.len() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let mut has_dot = false;

        while self.position < self.input.len() {
            let ch = self.current_char();
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !has_dot && self.peek_char().is_some_and(|c| c.is_ascii_digit())
            {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let num_str: String = self.input[start..self.position].iter().collect();

        if has_dot {
            num_str
                .parse::<f64>()
                .map(Token::float)
                .map_err(|_| LexerError::InvalidNumber(num_str))
        } else {
            num_str
                .parse::<i64>()
                .map(Token::int)
                .map_err(|_| LexerError::InvalidNumber(num_str))
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, LexerError> {
        self.advance(); // skip opening quote
        let start = self.position;

        while self.position < self.input.len() && self.current_char() != quote {
            self.advance();
        }

        if self.position >= self.input.len() {
            return Err(LexerError::UnterminatedString);
        }

        let string: String = self.input[start..self.position].iter().collect();
        self.advance(); // skip closing quote

        Ok(Token::string(string))
    }

    /// Next alphabetic word after whitespace, without consuming it.
    /// Returns the word and the position just past it.
    fn peek_word(&self) -> Option<(String, usize)> {
        let mut pos = self.position;
        while pos < self.input.len() && self.input[pos].is_whitespace() {
            pos += 1;
        }
        let start = pos;
        while pos < self.input.len() && (self.input[pos].is_alphabetic() || self.input[pos] == '_')
        {
            pos += 1;
        }
        if pos == start {
            return None;
        }
        Some((self.input[start..pos].iter().collect(), pos))
    }

    /// Consume `words` if they follow in sequence; otherwise leave the
    /// position untouched.
    fn match_words(&mut self, words: &[&str]) -> bool {
        let saved = self.position;
        for word in words {
            match self.peek_word() {
                Some((text, end)) if text.eq_ignore_ascii_case(word) => self.position = end,
                _ => {
                    self.position = saved;
                    return false;
                }
            }
        }
        true
    }

    fn read_identifier_or_keyword(&mut self) -> Result<Token, LexerError> {
        let start = self.position;

        while self.position < self.input.len() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        let uppercase = text.to_uppercase();

        // Multi-word joins (LEFT OUTER JOIN, CROSS JOIN, ...)
        let join = match uppercase.as_str() {
            "JOIN" => Some(TokenKind::InnerJoin),
            "INNER" if self.match_words(&["JOIN"]) => Some(TokenKind::InnerJoin),
            "LEFT" if self.match_words(&["OUTER", "JOIN"]) || self.match_words(&["JOIN"]) => {
                Some(TokenKind::LeftJoin)
            }
            "RIGHT" if self.match_words(&["OUTER", "JOIN"]) || self.match_words(&["JOIN"]) => {
                Some(TokenKind::RightJoin)
            }
            "FULL" if self.match_words(&["OUTER", "JOIN"]) || self.match_words(&["JOIN"]) => {
                Some(TokenKind::OuterJoin)
            }
            "OUTER" if self.match_words(&["JOIN"]) => Some(TokenKind::OuterJoin),
            "CROSS" if self.match_words(&["JOIN"]) => Some(TokenKind::CrossJoin),
            _ => None,
        };
        if let Some(kind) = join {
            return Ok(Token::new(kind));
        }

        let kind = match uppercase.as_str() {
            "SELECT" => TokenKind::Select,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "LIMIT" => TokenKind::Limit,
            "OFFSET" => TokenKind::Offset,
            "AS" => TokenKind::As,
            "SHOW" => TokenKind::Show,
            "TABLES" => TokenKind::Tables,
            "DESCRIBE" => TokenKind::Describe,
            "LOAD" => TokenKind::Load,
            "EXIT" => TokenKind::Exit,
            "ON" => TokenKind::On,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "INNER_JOIN" => TokenKind::InnerJoin,
            "LEFT_JOIN" | "LEFT_OUTER_JOIN" => TokenKind::LeftJoin,
            "RIGHT_JOIN" | "RIGHT_OUTER_JOIN" => TokenKind::RightJoin,
            "OUTER_JOIN" | "FULL_JOIN" | "FULL_OUTER_JOIN" => TokenKind::OuterJoin,
            "CROSS_JOIN" => TokenKind::CrossJoin,
            _ => {
                // Function call: identifier followed by an open paren
                self.skip_whitespace();
                if self.peek_is('(') {
                    return Ok(Token::function(text));
                }
                return Ok(Token::identifier(text));
            }
        };

        Ok(Token::new(kind))
    }
}

/// Split a token stream into statements at each `END` token.
/// Empty statements are dropped.
pub fn split_statements(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token.kind == TokenKind::End {
            if !current.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        statements.push(current);
    }
    statements
}

/// Lexer errors
#[derive(Debug, Clone, PartialEq)]
pub enum LexerError {
    UnexpectedCharacter(char),
    InvalidNumber(String),
    UnterminatedString,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnexpectedCharacter(ch) => write!(f, "Unexpected character: '{}'", ch),
            LexerError::InvalidNumber(s) => write!(f, "Invalid number: '{}'", s),
            LexerError::UnterminatedString => write!(f, "Unterminated string literal"),
        }
    }
}

impl std::error::Error for LexerError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_select() {
        let mut lexer = Lexer::new("SELECT * FROM users");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Select),
                Token::new(TokenKind::Star),
                Token::new(TokenKind::From),
                Token::identifier("users"),
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("select x from t where y limit 1 offset 2"),
            vec![
                TokenKind::Select,
                TokenKind::Identifier,
                TokenKind::From,
                TokenKind::Identifier,
                TokenKind::Where,
                TokenKind::Identifier,
                TokenKind::Limit,
                TokenKind::IntLiteral,
                TokenKind::Offset,
                TokenKind::IntLiteral,
            ]
        );
    }

    #[test]
    fn test_multi_word_joins() {
        assert_eq!(kinds("a JOIN b"), kinds("a INNER JOIN b"));
        assert_eq!(kinds("a inner join b")[1], TokenKind::InnerJoin);
        assert_eq!(kinds("a LEFT OUTER JOIN b")[1], TokenKind::LeftJoin);
        assert_eq!(kinds("a LEFT JOIN b")[1], TokenKind::LeftJoin);
        assert_eq!(kinds("a RIGHT JOIN b")[1], TokenKind::RightJoin);
        assert_eq!(kinds("a FULL OUTER JOIN b")[1], TokenKind::OuterJoin);
        assert_eq!(kinds("a OUTER JOIN b")[1], TokenKind::OuterJoin);
        assert_eq!(kinds("a CROSS JOIN b")[1], TokenKind::CrossJoin);
        assert_eq!(kinds("a LEFT JOIN b").len(), 3);
    }

    #[test]
    fn test_single_word_joins() {
        assert_eq!(kinds("a left_outer_join b")[1], TokenKind::LeftJoin);
        assert_eq!(kinds("a RIGHT_JOIN b")[1], TokenKind::RightJoin);
        assert_eq!(kinds("a CROSS_JOIN b")[1], TokenKind::CrossJoin);
        assert_eq!(kinds("a INNER_JOIN b")[1], TokenKind::InnerJoin);
    }

    #[test]
    fn test_join_word_without_join_is_identifier() {
        let mut lexer = Lexer::new("SELECT left FROM t");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[1], Token::identifier("left"));
        assert_eq!(tokens[2].kind, TokenKind::From);
    }

    #[test]
    fn test_function_token() {
        let mut lexer = Lexer::new("SELECT median (x) FROM t");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[1], Token::function("median"));
        assert_eq!(tokens[2].kind, TokenKind::ParenOpen);
    }

    #[test]
    fn test_qualified_identifier() {
        let mut lexer = Lexer::new("a.id = b.id");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0], Token::identifier("a.id"));
        assert_eq!(tokens[2], Token::identifier("b.id"));
    }

    #[test]
    fn test_string_literals() {
        let mut lexer = Lexer::new("'John' \"data/t.csv\"");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![Token::string("John"), Token::string("data/t.csv")]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("SELECT 'abc");
        assert_eq!(lexer.tokenize(), Err(LexerError::UnterminatedString));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= <> != < <= > >= & | ! + - * / % ^ ( ) , ;"),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Ne,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Caret,
                TokenKind::ParenOpen,
                TokenKind::ParenClose,
                TokenKind::Comma,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 3.5");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(tokens, vec![Token::int(42), Token::float(3.5)]);
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("SELECT #");
        assert_eq!(
            lexer.tokenize(),
            Err(LexerError::UnexpectedCharacter('#'))
        );
    }

    #[test]
    fn test_split_statements() {
        let mut lexer = Lexer::new("SHOW TABLES; ; EXIT");
        let statements = split_statements(lexer.tokenize().unwrap());
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].len(), 2);
        assert_eq!(statements[1], vec![Token::new(TokenKind::Exit)]);
    }
}
