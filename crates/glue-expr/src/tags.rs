//! Tag expressions
//!
//! Boolean predicates over a scenario's tags, e.g.
//! `@smoke and not (@slow or @wip)`. Precedence is `not` > `and` > `or`.

use glue_core::{GlueError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagExpression {
    Tag(String),
    Not(Box<TagExpression>),
    And(Box<TagExpression>, Box<TagExpression>),
    Or(Box<TagExpression>, Box<TagExpression>),
}

impl TagExpression {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(GlueError::Configuration("empty tag expression".to_string()));
        }
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(&format!("unexpected {}", token)));
        }
        Ok(expr)
    }

    /// Whether a scenario carrying `tags` satisfies this expression
    pub fn evaluate<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        match self {
            Self::Tag(name) => tags.iter().any(|t| t.as_ref() == name),
            Self::Not(inner) => !inner.evaluate(tags),
            Self::And(left, right) => left.evaluate(tags) && right.evaluate(tags),
            Self::Or(left, right) => left.evaluate(tags) || right.evaluate(tags),
        }
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(name) => {
                for c in name.chars() {
                    if c == '(' || c == ')' || c == '\\' || c.is_whitespace() {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                Ok(())
            }
            Self::Not(inner) => write!(f, "not ( {} )", inner),
            Self::And(left, right) => write!(f, "( {} and {} )", left, right),
            Self::Or(left, right) => write!(f, "( {} or {} )", left, right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Not,
    Literal(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("'('"),
            Self::Close => f.write_str("')'"),
            Self::And => f.write_str("'and'"),
            Self::Or => f.write_str("'or'"),
            Self::Not => f.write_str("'not'"),
            Self::Literal(s) => write!(f, "tag {:?}", s),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut escaped = false;

    fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
        if literal.is_empty() {
            return;
        }
        let token = match literal.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Literal(literal.clone()),
        };
        tokens.push(token);
        literal.clear();
    }

    for c in source.chars() {
        if escaped {
            literal.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | ')' => {
                flush(&mut literal, &mut tokens);
                tokens.push(if c == '(' { Token::Open } else { Token::Close });
            }
            c if c.is_whitespace() => flush(&mut literal, &mut tokens),
            c => literal.push(c),
        }
    }

    if escaped {
        return Err(GlueError::Configuration(format!(
            "tag expression {:?} ends with a backslash",
            source
        )));
    }
    flush(&mut literal, &mut tokens);
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, msg: &str) -> GlueError {
        GlueError::Configuration(format!("invalid tag expression {:?}: {}", self.source, msg))
    }

    fn parse_or(&mut self) -> Result<TagExpression> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = TagExpression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<TagExpression> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = TagExpression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<TagExpression> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(TagExpression::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<TagExpression> {
        match self.advance() {
            Some(Token::Literal(tag)) => Ok(TagExpression::Tag(tag)),
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    Some(other) => Err(self.error(&format!("expected ')', found {}", other))),
                    None => Err(self.error("unclosed '('")),
                }
            }
            Some(other) => Err(self.error(&format!("expected a tag, found {}", other))),
            None => Err(self.error("expected a tag, found end of input")),
        }
    }
}
