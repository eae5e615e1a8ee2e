//! Lexer and recursive-descent parser for PartiQL `SELECT` statements and
//! `SET`/`REMOVE` update expressions.
//!
//! Keywords are matched case-insensitively.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use dynorm_model::AttributeValue;

use super::ast::{
    AttributeRef, CompareOp, Condition, LogicalOp, Operand, Projection, SelectStatement,
    UpdateAction,
};

/// Errors produced while parsing or evaluating a statement.
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    /// An unexpected token was encountered.
    #[error("Statement wasn't well formed, can't be processed: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },
    /// A quoted literal or identifier was not closed.
    #[error("Statement wasn't well formed, can't be processed: unterminated {what}")]
    Unterminated {
        /// The kind of literal.
        what: &'static str,
    },
    /// A statement kind the memory store does not execute.
    #[error("Unsupported statement: {0}")]
    Unsupported(String),
    /// A `?` placeholder has no bound parameter.
    #[error("Number of parameters in request and statement don't match")]
    MissingParameter,
    /// A `#name` placeholder could not be resolved.
    #[error("An expression attribute name used in the document path is not defined; attribute name: #{0}")]
    UnresolvedName(String),
    /// A `:value` placeholder could not be resolved.
    #[error("An expression attribute value used in expression is not defined; attribute value: :{0}")]
    UnresolvedValue(String),
}

// ---------------------------------------------------------------------------
// Token type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    QuotedIdentifier(String),
    StringLiteral(String),
    NumberLiteral(String),
    Parameter,
    NamePlaceholder(String),
    ValuePlaceholder(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Star,
    Comma,
    LParen,
    RParen,
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    Set,
    Remove,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::QuotedIdentifier(s) => write!(f, "identifier \"{s}\""),
            Self::StringLiteral(s) => write!(f, "string '{s}'"),
            Self::NumberLiteral(n) => write!(f, "number {n}"),
            Self::Parameter => f.write_str("'?'"),
            Self::NamePlaceholder(s) => write!(f, "#{s}"),
            Self::ValuePlaceholder(s) => write!(f, ":{s}"),
            Self::Eq => f.write_str("'='"),
            Self::Ne => f.write_str("'<>'"),
            Self::Lt => f.write_str("'<'"),
            Self::Le => f.write_str("'<='"),
            Self::Gt => f.write_str("'>'"),
            Self::Ge => f.write_str("'>='"),
            Self::Star => f.write_str("'*'"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Select => f.write_str("SELECT"),
            Self::From => f.write_str("FROM"),
            Self::Where => f.write_str("WHERE"),
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Not => f.write_str("NOT"),
            Self::Set => f.write_str("SET"),
            Self::Remove => f.write_str("REMOVE"),
            Self::Eof => f.write_str("end of statement"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, StatementError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn bump(&mut self, tok: Token) -> Token {
        self.chars.next();
        tok
    }

    fn next_token(&mut self) -> Result<Token, StatementError> {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }

        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            '\'' => self.read_quoted('\'', "string literal").map(Token::StringLiteral),
            '"' => self.read_quoted('"', "quoted identifier").map(Token::QuotedIdentifier),
            '#' => {
                self.chars.next();
                self.read_placeholder('#').map(Token::NamePlaceholder)
            }
            ':' => {
                self.chars.next();
                self.read_placeholder(':').map(Token::ValuePlaceholder)
            }
            '?' => Ok(self.bump(Token::Parameter)),
            '*' => Ok(self.bump(Token::Star)),
            ',' => Ok(self.bump(Token::Comma)),
            '(' => Ok(self.bump(Token::LParen)),
            ')' => Ok(self.bump(Token::RParen)),
            '=' => Ok(self.bump(Token::Eq)),
            '<' => {
                self.chars.next();
                Ok(match self.chars.peek() {
                    Some('=') => self.bump(Token::Le),
                    Some('>') => self.bump(Token::Ne),
                    _ => Token::Lt,
                })
            }
            '>' => {
                self.chars.next();
                Ok(match self.chars.peek() {
                    Some('=') => self.bump(Token::Ge),
                    _ => Token::Gt,
                })
            }
            '!' => {
                self.chars.next();
                match self.chars.next() {
                    Some('=') => Ok(Token::Ne),
                    other => Err(StatementError::UnexpectedToken {
                        expected: "'=' after '!'".to_owned(),
                        found: other.map_or_else(|| "end of statement".to_owned(), String::from),
                    }),
                }
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => Ok(self.read_number()),
            c if is_ident_start(c) => Ok(self.read_identifier_or_keyword()),
            other => Err(StatementError::UnexpectedToken {
                expected: "valid token".to_owned(),
                found: format!("'{other}'"),
            }),
        }
    }

    /// Reads a literal delimited by `quote`, where a doubled quote escapes it.
    fn read_quoted(&mut self, quote: char, what: &'static str) -> Result<String, StatementError> {
        self.chars.next();
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => {
                    if self.chars.peek() == Some(&quote) {
                        self.chars.next();
                        s.push(quote);
                    } else {
                        return Ok(s);
                    }
                }
                Some(c) => s.push(c),
                None => return Err(StatementError::Unterminated { what }),
            }
        }
    }

    fn read_placeholder(&mut self, sigil: char) -> Result<String, StatementError> {
        let name = self.read_ident_chars();
        if name.is_empty() {
            return Err(StatementError::UnexpectedToken {
                expected: format!("name after '{sigil}'"),
                found: "nothing".to_owned(),
            });
        }
        Ok(name)
    }

    fn read_number(&mut self) -> Token {
        let mut s = String::new();
        if let Some(&sign) = self.chars.peek().filter(|c| matches!(c, '-' | '+')) {
            s.push(sign);
            self.chars.next();
        }
        while let Some(&c) = self.chars.peek() {
            let exponent_sign = matches!(c, '-' | '+') && s.ends_with(['e', 'E']);
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') || exponent_sign {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        Token::NumberLiteral(s)
    }

    fn read_ident_chars(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek().filter(|c| is_ident_continue(**c)) {
            s.push(c);
            self.chars.next();
        }
        s
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let ident = self.read_ident_chars();
        match ident.to_ascii_lowercase().as_str() {
            "select" => Token::Select,
            "from" => Token::From,
            "where" => Token::Where,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "set" => Token::Set,
            "remove" => Token::Remove,
            _ => Token::Identifier(ident),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    parameters: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            parameters: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), StatementError> {
        let tok = self.advance();
        if &tok == expected {
            Ok(())
        } else {
            Err(unexpected(&expected.to_string(), &tok))
        }
    }

    fn expect_end(&mut self) -> Result<(), StatementError> {
        let tok = self.advance();
        if tok == Token::Eof {
            Ok(())
        } else {
            Err(unexpected("end of statement", &tok))
        }
    }

    fn parse_name(&mut self, what: &str) -> Result<String, StatementError> {
        match self.advance() {
            Token::Identifier(name) | Token::QuotedIdentifier(name) => Ok(name),
            other => Err(unexpected(what, &other)),
        }
    }
}

fn unexpected(expected: &str, found: &Token) -> StatementError {
    StatementError::UnexpectedToken {
        expected: expected.to_owned(),
        found: found.to_string(),
    }
}

// ---------------------------------------------------------------------------
// SELECT
// ---------------------------------------------------------------------------

impl Parser {
    fn parse_select(&mut self) -> Result<SelectStatement, StatementError> {
        match self.peek() {
            Token::Select => {
                self.advance();
            }
            Token::Identifier(word) => {
                return Err(StatementError::Unsupported(word.to_ascii_uppercase()));
            }
            other => return Err(unexpected("SELECT", other)),
        }

        let projection = self.parse_projection()?;
        self.expect(&Token::From)?;
        let table = self.parse_name("table name")?;

        let condition = if matches!(self.peek(), Token::Where) {
            self.advance();
            Some(self.parse_or()?)
        } else {
            None
        };
        self.expect_end()?;

        Ok(SelectStatement {
            projection,
            table,
            condition,
        })
    }

    fn parse_projection(&mut self) -> Result<Projection, StatementError> {
        if matches!(self.peek(), Token::Star) {
            self.advance();
            return Ok(Projection::All);
        }
        let mut names = vec![self.parse_name("attribute name")?];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            names.push(self.parse_name("attribute name")?);
        }
        Ok(Projection::Attributes(names))
    }

    fn parse_or(&mut self) -> Result<Condition, StatementError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Condition::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, StatementError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Condition::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Condition, StatementError> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            return Ok(Condition::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Condition, StatementError> {
        if matches!(self.peek(), Token::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }

        let left = self.parse_operand()?;
        let op = match self.advance() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            other => return Err(unexpected("comparison operator", &other)),
        };
        let right = self.parse_operand()?;
        Ok(Condition::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, StatementError> {
        match self.advance() {
            Token::Identifier(name) | Token::QuotedIdentifier(name) => Ok(Operand::Attribute(name)),
            Token::StringLiteral(s) => Ok(Operand::Literal(AttributeValue::S(s))),
            Token::NumberLiteral(n) => {
                if n.parse::<f64>().is_err() {
                    return Err(unexpected("number", &Token::NumberLiteral(n)));
                }
                Ok(Operand::Literal(AttributeValue::N(n)))
            }
            Token::Parameter => {
                let index = self.parameters;
                self.parameters += 1;
                Ok(Operand::Parameter(index))
            }
            other => Err(unexpected("attribute, literal or '?'", &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Update expressions
// ---------------------------------------------------------------------------

impl Parser {
    fn parse_update(&mut self) -> Result<Vec<UpdateAction>, StatementError> {
        let mut actions = Vec::new();
        loop {
            match self.advance() {
                Token::Set => loop {
                    let attribute = self.parse_attribute_ref()?;
                    self.expect(&Token::Eq)?;
                    let value = match self.advance() {
                        Token::ValuePlaceholder(name) => name,
                        other => return Err(unexpected(":value", &other)),
                    };
                    actions.push(UpdateAction::Set { attribute, value });
                    if !self.eat_comma() {
                        break;
                    }
                },
                Token::Remove => loop {
                    let attribute = self.parse_attribute_ref()?;
                    actions.push(UpdateAction::Remove { attribute });
                    if !self.eat_comma() {
                        break;
                    }
                },
                Token::Eof if !actions.is_empty() => return Ok(actions),
                other => return Err(unexpected("SET or REMOVE", &other)),
            }
        }
    }

    fn eat_comma(&mut self) -> bool {
        if matches!(self.peek(), Token::Comma) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_attribute_ref(&mut self) -> Result<AttributeRef, StatementError> {
        match self.advance() {
            Token::Identifier(name) => Ok(AttributeRef::Name(name)),
            Token::NamePlaceholder(name) => Ok(AttributeRef::Placeholder(name)),
            other => Err(unexpected("attribute name", &other)),
        }
    }
}

/// Parse a PartiQL `SELECT` statement.
pub fn parse_select(statement: &str) -> Result<SelectStatement, StatementError> {
    let tokens = Lexer::new(statement).tokenize()?;
    Parser::new(tokens).parse_select()
}

/// Parse an update expression made of `SET` and `REMOVE` clauses.
pub fn parse_update(expression: &str) -> Result<Vec<UpdateAction>, StatementError> {
    let tokens = Lexer::new(expression).tokenize()?;
    Parser::new(tokens).parse_update()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_select_star() {
        let stmt = parse_select("SELECT * FROM \"Cookbooks\"").unwrap();
        assert_eq!(stmt.projection, Projection::All);
        assert_eq!(stmt.table, "Cookbooks");
        assert!(stmt.condition.is_none());
    }

    #[test]
    fn test_should_parse_projection_and_where() {
        let stmt = parse_select(
            "select title, author from Cookbooks where title = 'A' and author = 'B'",
        )
        .unwrap();
        assert_eq!(
            stmt.projection,
            Projection::Attributes(vec!["title".to_owned(), "author".to_owned()])
        );
        assert!(matches!(
            stmt.condition,
            Some(Condition::Logical {
                op: LogicalOp::And,
                ..
            })
        ));
    }

    #[test]
    fn test_should_bind_and_tighter_than_or() {
        let stmt =
            parse_select("SELECT * FROM t WHERE a = '1' OR b = '2' AND c = '3'").unwrap();
        let Some(Condition::Logical { op, right, .. }) = stmt.condition else {
            panic!("expected logical condition");
        };
        assert_eq!(op, LogicalOp::Or);
        assert!(matches!(
            *right,
            Condition::Logical {
                op: LogicalOp::And,
                ..
            }
        ));
    }

    #[test]
    fn test_should_unescape_doubled_quotes() {
        let stmt = parse_select("SELECT * FROM t WHERE title = 'Grandma''s Kitchen'").unwrap();
        let Some(Condition::Compare { right, .. }) = stmt.condition else {
            panic!("expected comparison");
        };
        assert_eq!(
            right,
            Operand::Literal(AttributeValue::S("Grandma's Kitchen".to_owned()))
        );
    }

    #[test]
    fn test_should_number_parameters_in_order() {
        let stmt = parse_select("SELECT * FROM t WHERE a = ? AND b != ?").unwrap();
        let Some(Condition::Logical { left, right, .. }) = stmt.condition else {
            panic!("expected logical condition");
        };
        assert!(matches!(*left, Condition::Compare { right: Operand::Parameter(0), .. }));
        assert!(matches!(
            *right,
            Condition::Compare {
                op: CompareOp::Ne,
                right: Operand::Parameter(1),
                ..
            }
        ));
    }

    #[test]
    fn test_should_parse_negative_numbers() {
        let stmt = parse_select("SELECT * FROM t WHERE reviews > -1.5e2").unwrap();
        let Some(Condition::Compare { right, .. }) = stmt.condition else {
            panic!("expected comparison");
        };
        assert_eq!(right, Operand::Literal(AttributeValue::N("-1.5e2".to_owned())));
    }

    #[test]
    fn test_should_reject_unsupported_statement() {
        let err = parse_select("DELETE FROM t WHERE a = '1'").unwrap_err();
        assert!(matches!(err, StatementError::Unsupported(ref s) if s == "DELETE"));
    }

    #[test]
    fn test_should_reject_unterminated_string() {
        let err = parse_select("SELECT * FROM t WHERE a = 'oops").unwrap_err();
        assert!(matches!(err, StatementError::Unterminated { .. }));
    }

    #[test]
    fn test_should_reject_trailing_tokens() {
        assert!(parse_select("SELECT * FROM t extra").is_err());
    }

    #[test]
    fn test_should_parse_update_expression() {
        let actions = parse_update("SET #title = :title, summary = :summary REMOVE #image").unwrap();
        assert_eq!(
            actions,
            vec![
                UpdateAction::Set {
                    attribute: AttributeRef::Placeholder("title".to_owned()),
                    value: "title".to_owned(),
                },
                UpdateAction::Set {
                    attribute: AttributeRef::Name("summary".to_owned()),
                    value: "summary".to_owned(),
                },
                UpdateAction::Remove {
                    attribute: AttributeRef::Placeholder("image".to_owned()),
                },
            ]
        );
    }

    #[test]
    fn test_should_reject_empty_update_expression() {
        assert!(parse_update("").is_err());
    }
}
