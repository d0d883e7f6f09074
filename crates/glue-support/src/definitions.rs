//! Step and hook definitions
//!
//! A step is registered as a [`StepDefinitionConfig`] and only compiled into
//! a [`StepDefinition`] at finalize time. Hooks have nothing to resolve
//! against the parameter registry and are built directly.

use crate::code::{apply_wrapper, Argument, Code, CodeResult, DefinitionFunctionWrapper, DefinitionKind, WrapperContext};
use crate::options::{StepDefinitionOptions, TestCaseHookOptions, TestRunHookOptions};
use crate::world::World;
use glue_core::{Result, SourceLocation};
use glue_expr::{Expression, StepPattern, TagExpression};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Common view over every kind of definition
pub trait Definition {
    fn kind(&self) -> DefinitionKind;

    fn code(&self) -> &Code;

    fn location(&self) -> &SourceLocation;

    /// The definition's own timeout, if it declared one
    fn timeout(&self) -> Option<Duration>;

    fn wrapper_options(&self) -> Option<&Value> {
        None
    }

    /// Run the (possibly wrapped) code
    fn invoke(&self, world: &mut dyn World, args: &[Argument]) -> CodeResult {
        (self.code())(world, args)
    }
}

/// A step as registered, before compilation
#[derive(Clone)]
pub struct StepDefinitionConfig {
    pub pattern: StepPattern,
    pub options: StepDefinitionOptions,
    pub code: Code,
    pub location: SourceLocation,
}

impl fmt::Debug for StepDefinitionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinitionConfig")
            .field("pattern", &self.pattern)
            .field("options", &self.options)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct StepDefinition {
    pattern: StepPattern,
    expression: Expression,
    options: StepDefinitionOptions,
    code: Code,
    location: SourceLocation,
}

impl StepDefinition {
    pub(crate) fn new(config: StepDefinitionConfig, expression: Expression) -> Self {
        Self {
            pattern: config.pattern,
            expression,
            options: config.options,
            code: config.code,
            location: config.location,
        }
    }

    pub fn pattern(&self) -> &StepPattern {
        &self.pattern
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn options(&self) -> &StepDefinitionOptions {
        &self.options
    }

    pub fn matches(&self, text: &str) -> bool {
        self.expression.is_match(text)
    }

    /// Match `text` against this definition alone.
    ///
    /// On a match, returns the transformed captures followed by `extra`
    /// (the step's data table or doc string) when present.
    pub fn match_step(&self, text: &str, extra: Option<&Argument>) -> Result<Option<Vec<Argument>>> {
        let Some(values) = self.expression.match_text(text)? else {
            return Ok(None);
        };
        let mut args: Vec<Argument> = values.into_iter().map(Argument::Value).collect();
        args.extend(extra.cloned());
        Ok(Some(args))
    }

    pub(crate) fn wrap(&mut self, wrapper: &DefinitionFunctionWrapper) {
        let context = WrapperContext {
            kind: DefinitionKind::Step,
            location: &self.location,
            wrapper_options: self.options.wrapper_options.as_ref(),
        };
        apply_wrapper(&mut self.code, wrapper, &context);
    }
}

impl Definition for StepDefinition {
    fn kind(&self) -> DefinitionKind {
        DefinitionKind::Step
    }

    fn code(&self) -> &Code {
        &self.code
    }

    fn location(&self) -> &SourceLocation {
        &self.location
    }

    fn timeout(&self) -> Option<Duration> {
        self.options.timeout
    }

    fn wrapper_options(&self) -> Option<&Value> {
        self.options.wrapper_options.as_ref()
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("pattern", &self.pattern)
            .field("options", &self.options)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCaseHookKind {
    Before,
    After,
}

impl From<TestCaseHookKind> for DefinitionKind {
    fn from(kind: TestCaseHookKind) -> Self {
        match kind {
            TestCaseHookKind::Before => DefinitionKind::BeforeTestCase,
            TestCaseHookKind::After => DefinitionKind::AfterTestCase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestRunHookKind {
    BeforeAll,
    AfterAll,
}

impl From<TestRunHookKind> for DefinitionKind {
    fn from(kind: TestRunHookKind) -> Self {
        match kind {
            TestRunHookKind::BeforeAll => DefinitionKind::BeforeTestRun,
            TestRunHookKind::AfterAll => DefinitionKind::AfterTestRun,
        }
    }
}

/// A hook around each scenario, optionally scoped by a tag expression
#[derive(Clone)]
pub struct TestCaseHookDefinition {
    kind: TestCaseHookKind,
    tag_expression: Option<TagExpression>,
    options: TestCaseHookOptions,
    code: Code,
    location: SourceLocation,
}

impl TestCaseHookDefinition {
    pub(crate) fn new(
        kind: TestCaseHookKind,
        options: TestCaseHookOptions,
        code: Code,
        location: SourceLocation,
    ) -> Result<Self> {
        let tag_expression = match options.tags.as_deref().map(str::trim) {
            Some(tags) if !tags.is_empty() => Some(TagExpression::parse(tags)?),
            _ => None,
        };
        Ok(Self {
            kind,
            tag_expression,
            options,
            code,
            location,
        })
    }

    pub fn hook_kind(&self) -> TestCaseHookKind {
        self.kind
    }

    pub fn tag_expression(&self) -> Option<&TagExpression> {
        self.tag_expression.as_ref()
    }

    pub fn options(&self) -> &TestCaseHookOptions {
        &self.options
    }

    /// Whether the hook runs for a scenario carrying `tags`
    pub fn applies_to<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        self.tag_expression
            .as_ref()
            .map_or(true, |expr| expr.evaluate(tags))
    }

    pub(crate) fn wrap(&mut self, wrapper: &DefinitionFunctionWrapper) {
        let context = WrapperContext {
            kind: self.kind.into(),
            location: &self.location,
            wrapper_options: None,
        };
        apply_wrapper(&mut self.code, wrapper, &context);
    }
}

impl Definition for TestCaseHookDefinition {
    fn kind(&self) -> DefinitionKind {
        self.kind.into()
    }

    fn code(&self) -> &Code {
        &self.code
    }

    fn location(&self) -> &SourceLocation {
        &self.location
    }

    fn timeout(&self) -> Option<Duration> {
        self.options.timeout
    }
}

impl fmt::Debug for TestCaseHookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCaseHookDefinition")
            .field("kind", &self.kind)
            .field("tag_expression", &self.tag_expression)
            .field("options", &self.options)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// A hook run once before or after the whole run
#[derive(Clone)]
pub struct TestRunHookDefinition {
    kind: TestRunHookKind,
    options: TestRunHookOptions,
    code: Code,
    location: SourceLocation,
}

impl TestRunHookDefinition {
    pub(crate) fn new(
        kind: TestRunHookKind,
        options: TestRunHookOptions,
        code: Code,
        location: SourceLocation,
    ) -> Self {
        Self {
            kind,
            options,
            code,
            location,
        }
    }

    pub fn hook_kind(&self) -> TestRunHookKind {
        self.kind
    }

    pub fn options(&self) -> &TestRunHookOptions {
        &self.options
    }

    pub(crate) fn wrap(&mut self, wrapper: &DefinitionFunctionWrapper) {
        let context = WrapperContext {
            kind: self.kind.into(),
            location: &self.location,
            wrapper_options: None,
        };
        apply_wrapper(&mut self.code, wrapper, &context);
    }
}

impl Definition for TestRunHookDefinition {
    fn kind(&self) -> DefinitionKind {
        self.kind.into()
    }

    fn code(&self) -> &Code {
        &self.code
    }

    fn location(&self) -> &SourceLocation {
        &self.location
    }

    fn timeout(&self) -> Option<Duration> {
        self.options.timeout
    }
}

impl fmt::Debug for TestRunHookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRunHookDefinition")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
