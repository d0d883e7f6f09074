//! The finalized support code library handed to the runtime
use crate::code::Argument;
use crate::definitions::{Definition, StepDefinition, TestCaseHookDefinition, TestRunHookDefinition};
use crate::world::{World, WorldConstructor, WorldOptions};
use glue_attach::AttachmentManager;
use glue_core::Result;
use glue_expr::ParameterTypeRegistry;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Immutable snapshot produced by
/// [`SupportCodeLibraryBuilder::finalize`](crate::SupportCodeLibraryBuilder::finalize).
///
/// After-hook collections are already in execution order (reverse of
/// registration).
#[derive(Clone)]
pub struct SupportCodeLibrary {
    pub(crate) step_definitions: Vec<StepDefinition>,
    pub(crate) before_test_case_hook_definitions: Vec<TestCaseHookDefinition>,
    pub(crate) after_test_case_hook_definitions: Vec<TestCaseHookDefinition>,
    pub(crate) before_test_run_hook_definitions: Vec<TestRunHookDefinition>,
    pub(crate) after_test_run_hook_definitions: Vec<TestRunHookDefinition>,
    pub(crate) default_timeout: Duration,
    pub(crate) parameter_type_registry: ParameterTypeRegistry,
    pub(crate) world_constructor: WorldConstructor,
    pub(crate) world_parameters: Value,
}

/// A step definition matching some step text, with its arguments
#[derive(Debug, Clone)]
pub struct StepMatch<'a> {
    pub definition: &'a StepDefinition,
    pub arguments: Vec<Argument>,
}

impl SupportCodeLibrary {
    pub fn step_definitions(&self) -> &[StepDefinition] {
        &self.step_definitions
    }

    pub fn before_test_case_hook_definitions(&self) -> &[TestCaseHookDefinition] {
        &self.before_test_case_hook_definitions
    }

    pub fn after_test_case_hook_definitions(&self) -> &[TestCaseHookDefinition] {
        &self.after_test_case_hook_definitions
    }

    pub fn before_test_run_hook_definitions(&self) -> &[TestRunHookDefinition] {
        &self.before_test_run_hook_definitions
    }

    pub fn after_test_run_hook_definitions(&self) -> &[TestRunHookDefinition] {
        &self.after_test_run_hook_definitions
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn parameter_type_registry(&self) -> &ParameterTypeRegistry {
        &self.parameter_type_registry
    }

    pub fn world_constructor(&self) -> &WorldConstructor {
        &self.world_constructor
    }

    pub fn world_parameters(&self) -> &Value {
        &self.world_parameters
    }

    /// Before hooks whose tag expression accepts `tags`, in run order
    pub fn before_test_case_hooks_for<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&TestCaseHookDefinition> {
        applicable(&self.before_test_case_hook_definitions, tags)
    }

    /// After hooks whose tag expression accepts `tags`, in run order
    pub fn after_test_case_hooks_for<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&TestCaseHookDefinition> {
        applicable(&self.after_test_case_hook_definitions, tags)
    }

    /// Every step definition matching `text`.
    ///
    /// Zero matches is an undefined step and more than one is ambiguous;
    /// deciding what to do with either is left to the caller.
    pub fn matching_step_definitions(&self, text: &str, extra: Option<&Argument>) -> Result<Vec<StepMatch<'_>>> {
        let mut matches = Vec::new();
        for definition in &self.step_definitions {
            if let Some(arguments) = definition.match_step(text, extra)? {
                matches.push(StepMatch {
                    definition,
                    arguments,
                });
            }
        }
        Ok(matches)
    }

    /// The definition's own timeout, or the library default
    pub fn effective_timeout<D: Definition + ?Sized>(&self, definition: &D) -> Duration {
        definition.timeout().unwrap_or(self.default_timeout)
    }

    /// Build a fresh World for one scenario
    pub fn create_world(&self, attach: AttachmentManager) -> Box<dyn World> {
        (self.world_constructor)(WorldOptions {
            attach,
            parameters: self.world_parameters.clone(),
        })
    }
}

fn applicable<'a, S: AsRef<str>>(
    hooks: &'a [TestCaseHookDefinition],
    tags: &[S],
) -> Vec<&'a TestCaseHookDefinition> {
    hooks.iter().filter(|hook| hook.applies_to(tags)).collect()
}

impl fmt::Debug for SupportCodeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupportCodeLibrary")
            .field("step_definitions", &self.step_definitions)
            .field("before_test_case_hook_definitions", &self.before_test_case_hook_definitions)
            .field("after_test_case_hook_definitions", &self.after_test_case_hook_definitions)
            .field("before_test_run_hook_definitions", &self.before_test_run_hook_definitions)
            .field("after_test_run_hook_definitions", &self.after_test_run_hook_definitions)
            .field("default_timeout", &self.default_timeout)
            .field("parameter_type_registry", &self.parameter_type_registry)
            .field("world_parameters", &self.world_parameters)
            .finish_non_exhaustive()
    }
}
