//! Step expressions.
//!
//! Two pattern flavours are supported:
//! - placeholder text such as `I have {int} cucumber(s) in my belly/stomach`,
//!   compiled into an anchored regex whose `{name}` groups are typed through
//!   the [`ParameterTypeRegistry`];
//! - a plain [`Regex`], used as-is with every capture group becoming a
//!   string argument.

use crate::parameter_type::{ParameterType, ParameterTypeRegistry};
use glue_core::{GlueError, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A step pattern as authored, before compilation
#[derive(Debug, Clone)]
pub enum StepPattern {
    Text(String),
    Regex(Regex),
}

impl StepPattern {
    pub fn source(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Regex(regex) => regex.as_str(),
        }
    }
}

impl fmt::Display for StepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for StepPattern {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for StepPattern {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Regex> for StepPattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

/// A compiled step pattern
#[derive(Debug, Clone)]
pub enum Expression {
    Placeholder(PlaceholderExpression),
    Regular(Regex),
}

/// A placeholder pattern compiled into a regex
#[derive(Debug, Clone)]
pub struct PlaceholderExpression {
    pub source: String,
    pub regex: Regex,
    /// Parameter types in order of appearance, with their capture group index
    parameters: Vec<(Arc<ParameterType>, usize)>,
}

impl Expression {
    /// Compile `pattern`; placeholders are resolved against `registry` now
    pub fn compile(pattern: &StepPattern, registry: &ParameterTypeRegistry) -> Result<Self> {
        match pattern {
            StepPattern::Text(text) => Ok(Self::Placeholder(compile_placeholder(text, registry)?)),
            StepPattern::Regex(regex) => Ok(Self::Regular(regex.clone())),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Placeholder(expr) => &expr.source,
            Self::Regular(regex) => regex.as_str(),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Placeholder(expr) => expr.regex.is_match(text),
            Self::Regular(regex) => regex.is_match(text),
        }
    }

    /// `Ok(None)` when `text` does not match, otherwise the argument values
    pub fn match_text(&self, text: &str) -> Result<Option<Vec<Value>>> {
        match self {
            Self::Placeholder(expr) => expr.match_text(text),
            Self::Regular(regex) => Ok(regex.captures(text).map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|m| match m {
                        Some(m) => Value::String(m.as_str().to_string()),
                        None => Value::Null,
                    })
                    .collect()
            })),
        }
    }
}

impl PlaceholderExpression {
    pub fn parameter_types(&self) -> impl Iterator<Item = &Arc<ParameterType>> {
        self.parameters.iter().map(|(t, _)| t)
    }

    fn match_text(&self, text: &str) -> Result<Option<Vec<Value>>> {
        let Some(caps) = self.regex.captures(text) else {
            return Ok(None);
        };

        let mut values = Vec::with_capacity(self.parameters.len());
        for (parameter_type, group) in &self.parameters {
            let inner = parameter_type.inner_groups();
            let groups: Vec<Option<&str>> = if inner == 0 {
                vec![caps.get(*group).map(|m| m.as_str())]
            } else {
                (group + 1..=group + inner)
                    .map(|i| caps.get(i).map(|m| m.as_str()))
                    .collect()
            };
            values.push(parameter_type.transform(&groups)?);
        }
        Ok(Some(values))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(char),
    Whitespace(char),
    Slash,
    Optional(String),
    Parameter(String),
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().ok_or_else(|| {
                    GlueError::Configuration(format!("trailing backslash in {:?}", source))
                })?;
                tokens.push(Token::Text(escaped));
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c @ ('{' | '(' | ')')) => {
                            return Err(GlueError::Configuration(format!(
                                "unexpected {:?} inside parameter in {:?}",
                                c, source
                            )))
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(GlueError::Configuration(format!(
                                "unclosed parameter in {:?}",
                                source
                            )))
                        }
                    }
                }
                tokens.push(Token::Parameter(name));
            }
            '(' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => text.push(escaped),
                            None => {
                                return Err(GlueError::Configuration(format!(
                                    "trailing backslash in {:?}",
                                    source
                                )))
                            }
                        },
                        Some(c @ ('(' | '{')) => {
                            return Err(GlueError::Configuration(format!(
                                "{:?} is not allowed inside optional text in {:?}",
                                c, source
                            )))
                        }
                        Some(c) => text.push(c),
                        None => {
                            return Err(GlueError::Configuration(format!(
                                "unclosed optional text in {:?}",
                                source
                            )))
                        }
                    }
                }
                if text.is_empty() {
                    return Err(GlueError::Configuration(format!(
                        "empty optional text in {:?}",
                        source
                    )));
                }
                tokens.push(Token::Optional(text));
            }
            c @ (')' | '}') => {
                return Err(GlueError::Configuration(format!(
                    "unmatched {:?} in {:?}",
                    c, source
                )))
            }
            '/' => tokens.push(Token::Slash),
            c if c.is_whitespace() => tokens.push(Token::Whitespace(c)),
            c => tokens.push(Token::Text(c)),
        }
    }

    Ok(tokens)
}

struct Compiler<'r> {
    source: &'r str,
    registry: &'r ParameterTypeRegistry,
    regex: String,
    parameters: Vec<(Arc<ParameterType>, usize)>,
    next_group: usize,
}

impl<'r> Compiler<'r> {
    fn push_token(&mut self, token: &Token) -> Result<()> {
        match token {
            Token::Text(c) | Token::Whitespace(c) => {
                self.regex.push_str(&regex::escape(&c.to_string()))
            }
            Token::Slash => self.regex.push('/'),
            Token::Optional(text) => {
                self.regex.push_str(&format!("(?:{})?", regex::escape(text)))
            }
            Token::Parameter(name) => {
                let parameter_type = self.registry.lookup_by_type_name(name).ok_or_else(|| {
                    GlueError::Configuration(format!(
                        "undefined parameter type {{{}}} in {:?}",
                        name, self.source
                    ))
                })?;
                self.regex.push_str(&parameter_type.group_source());
                let group = self.next_group;
                self.next_group += 1 + parameter_type.inner_groups();
                self.parameters.push((parameter_type, group));
            }
        }
        Ok(())
    }

    /// A whitespace-free run of tokens; alternation when it holds a slash
    fn push_word(&mut self, word: &[Token]) -> Result<()> {
        if !word.contains(&Token::Slash) {
            for token in word {
                self.push_token(token)?;
            }
            return Ok(());
        }

        let mut alternatives = Vec::new();
        for alternative in word.split(|t| *t == Token::Slash) {
            if alternative.is_empty() {
                return Err(GlueError::Configuration(format!(
                    "empty alternative in {:?}",
                    self.source
                )));
            }
            if alternative.iter().any(|t| matches!(t, Token::Parameter(_))) {
                return Err(GlueError::Configuration(format!(
                    "parameters are not allowed in alternatives in {:?}",
                    self.source
                )));
            }
            let start = self.regex.len();
            for token in alternative {
                self.push_token(token)?;
            }
            alternatives.push(self.regex.split_off(start));
        }
        self.regex
            .push_str(&format!("(?:{})", alternatives.join("|")));
        Ok(())
    }
}

fn compile_placeholder(source: &str, registry: &ParameterTypeRegistry) -> Result<PlaceholderExpression> {
    let tokens = tokenize(source)?;
    let mut compiler = Compiler {
        source,
        registry,
        regex: String::from("^"),
        parameters: Vec::new(),
        next_group: 1,
    };

    let mut word: Vec<Token> = Vec::new();
    for token in tokens {
        if let Token::Whitespace(_) = token {
            compiler.push_word(&word)?;
            word.clear();
            compiler.push_token(&token)?;
        } else {
            word.push(token);
        }
    }
    compiler.push_word(&word)?;
    compiler.regex.push('$');

    let regex = Regex::new(&compiler.regex).map_err(|e| {
        GlueError::Configuration(format!("invalid expression {:?}: {}", source, e))
    })?;

    Ok(PlaceholderExpression {
        source: source.to_string(),
        regex,
        parameters: compiler.parameters,
    })
}
