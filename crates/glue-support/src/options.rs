//! Registration options and the options-or-code argument
use crate::code::{code, Argument, Code, CodeResult};
use crate::world::World;
use glue_expr::Transformer;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepDefinitionOptions {
    pub timeout: Option<Duration>,
    /// Passed verbatim to the definition function wrapper
    pub wrapper_options: Option<Value>,
}

impl StepDefinitionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_wrapper_options(mut self, options: Value) -> Self {
        self.wrapper_options = Some(options);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCaseHookOptions {
    /// Tag expression scoping the hook; absent means every scenario
    pub tags: Option<String>,
    pub timeout: Option<Duration>,
}

impl TestCaseHookOptions {
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&str> for TestCaseHookOptions {
    fn from(tags: &str) -> Self {
        Self::default().with_tags(tags)
    }
}

impl From<String> for TestCaseHookOptions {
    fn from(tags: String) -> Self {
        Self::default().with_tags(tags)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestRunHookOptions {
    pub timeout: Option<Duration>,
}

impl TestRunHookOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The argument in the options position of a registration call.
///
/// When it is code, default options are used and no further argument is
/// expected; otherwise a trailing `DefinitionArg::Code` must follow.
#[derive(Clone)]
pub enum DefinitionArg<O> {
    Options(O),
    Code(Code),
}

impl<O> DefinitionArg<O> {
    pub fn code<F>(f: F) -> Self
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        Self::Code(code(f))
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }
}

impl<O: fmt::Debug> fmt::Debug for DefinitionArg<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Options(options) => f.debug_tuple("Options").field(options).finish(),
            Self::Code(_) => f.write_str("Code(..)"),
        }
    }
}

impl<O> From<O> for DefinitionArg<O> {
    fn from(options: O) -> Self {
        Self::Options(options)
    }
}

impl From<&str> for DefinitionArg<TestCaseHookOptions> {
    fn from(tags: &str) -> Self {
        Self::Options(tags.into())
    }
}

/// Everything needed to define a parameter type
#[derive(Clone)]
pub struct ParameterTypeOptions {
    pub name: String,
    pub regexps: Vec<String>,
    pub transformer: Transformer,
    /// Defaults to `true`
    pub use_for_snippets: Option<bool>,
    /// Defaults to `false`
    pub prefer_for_regexp_match: Option<bool>,
}

impl ParameterTypeOptions {
    pub fn new(name: impl Into<String>, regexp: impl Into<String>, transformer: Transformer) -> Self {
        Self {
            name: name.into(),
            regexps: vec![regexp.into()],
            transformer,
            use_for_snippets: None,
            prefer_for_regexp_match: None,
        }
    }

    pub fn with_regexp(mut self, regexp: impl Into<String>) -> Self {
        self.regexps.push(regexp.into());
        self
    }

    pub fn use_for_snippets(mut self, value: bool) -> Self {
        self.use_for_snippets = Some(value);
        self
    }

    pub fn prefer_for_regexp_match(mut self, value: bool) -> Self {
        self.prefer_for_regexp_match = Some(value);
        self
    }
}

impl fmt::Debug for ParameterTypeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterTypeOptions")
            .field("name", &self.name)
            .field("regexps", &self.regexps)
            .field("use_for_snippets", &self.use_for_snippets)
            .field("prefer_for_regexp_match", &self.prefer_for_regexp_match)
            .finish_non_exhaustive()
    }
}
