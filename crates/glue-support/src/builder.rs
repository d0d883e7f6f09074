//! Registry orchestrator
//!
//! A [`SupportCodeLibraryBuilder`] collects definitions during a load phase
//! opened by [`reset`](SupportCodeLibraryBuilder::reset) and turns them into
//! an immutable [`SupportCodeLibrary`] on
//! [`finalize`](SupportCodeLibraryBuilder::finalize). Steps are buffered as
//! configs and compiled only at finalize, so a step may use a parameter type
//! that is defined after it.

use crate::builders::{
    build_parameter_type, build_step_definition_config, build_step_definition_from_config,
    build_test_case_hook_definition, build_test_run_hook_definition,
};
use crate::code::{code, wrapper, Argument, Code, CodeResult, DefinitionFunctionWrapper, WrapperContext};
use crate::definitions::{
    Definition, StepDefinition, StepDefinitionConfig, TestCaseHookDefinition, TestCaseHookKind,
    TestRunHookDefinition, TestRunHookKind,
};
use crate::library::SupportCodeLibrary;
use crate::options::{
    DefinitionArg, ParameterTypeOptions, StepDefinitionOptions, TestCaseHookOptions,
    TestRunHookOptions,
};
use crate::world::{default_world_constructor, world_constructor, World, WorldConstructor, WorldOptions};
use glue_core::{GlueConfig, GlueError, Result, SourceLocation};
use glue_expr::{ParameterTypeRegistry, StepPattern};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// State of one reset/finalize cycle
struct Cycle {
    cwd: PathBuf,
    step_configs: Vec<StepDefinitionConfig>,
    before_test_case_hooks: Vec<TestCaseHookDefinition>,
    after_test_case_hooks: Vec<TestCaseHookDefinition>,
    before_test_run_hooks: Vec<TestRunHookDefinition>,
    after_test_run_hooks: Vec<TestRunHookDefinition>,
    default_timeout: Duration,
    parameter_type_registry: ParameterTypeRegistry,
    world_constructor: Option<WorldConstructor>,
    wrapper: Option<DefinitionFunctionWrapper>,
}

impl Cycle {
    fn new(cwd: PathBuf, config: &GlueConfig) -> Self {
        Self {
            cwd,
            step_configs: Vec::new(),
            before_test_case_hooks: Vec::new(),
            after_test_case_hooks: Vec::new(),
            before_test_run_hooks: Vec::new(),
            after_test_run_hooks: Vec::new(),
            default_timeout: config.default_timeout(),
            parameter_type_registry: ParameterTypeRegistry::new(),
            world_constructor: None,
            wrapper: None,
        }
    }
}

enum CycleState {
    Idle,
    Loading(Box<Cycle>),
    Finalized,
}

pub struct SupportCodeLibraryBuilder {
    config: GlueConfig,
    state: CycleState,
}

impl Default for SupportCodeLibraryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SupportCodeLibraryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            CycleState::Idle => "idle",
            CycleState::Loading(_) => "loading",
            CycleState::Finalized => "finalized",
        };
        f.debug_struct("SupportCodeLibraryBuilder")
            .field("config", &self.config)
            .field("state", &state)
            .finish()
    }
}

impl SupportCodeLibraryBuilder {
    pub fn new() -> Self {
        Self::with_config(GlueConfig::default())
    }

    pub fn with_config(config: GlueConfig) -> Self {
        Self {
            config,
            state: CycleState::Idle,
        }
    }

    pub fn config(&self) -> &GlueConfig {
        &self.config
    }

    /// Working directory of the open cycle, if any
    pub fn cwd(&self) -> Option<&Path> {
        match &self.state {
            CycleState::Loading(cycle) => Some(&cycle.cwd),
            _ => None,
        }
    }

    /// Start a new load cycle, discarding everything registered before
    pub fn reset(&mut self, cwd: impl Into<PathBuf>) {
        let cwd = cwd.into();
        tracing::debug!(cwd = %cwd.display(), "support code registry reset");
        self.state = CycleState::Loading(Box::new(Cycle::new(cwd, &self.config)));
    }

    fn cycle_mut(&mut self, operation: &str) -> Result<&mut Cycle> {
        match &mut self.state {
            CycleState::Loading(cycle) => Ok(cycle.as_mut()),
            CycleState::Idle => Err(GlueError::Lifecycle(format!(
                "{} called before reset",
                operation
            ))),
            CycleState::Finalized => Err(GlueError::Lifecycle(format!(
                "{} called after finalize",
                operation
            ))),
        }
    }

    /// Validate and register a parameter type immediately
    pub fn define_parameter_type(&mut self, options: ParameterTypeOptions) -> Result<()> {
        let cycle = self.cycle_mut("define_parameter_type")?;
        let parameter_type = build_parameter_type(options)?;
        cycle
            .parameter_type_registry
            .define_parameter_type(parameter_type)
    }

    /// Register a step from the raw options-or-code form
    #[track_caller]
    pub fn define_step(
        &mut self,
        pattern: impl Into<StepPattern>,
        options_or_code: DefinitionArg<StepDefinitionOptions>,
        code: Option<DefinitionArg<StepDefinitionOptions>>,
    ) -> Result<()> {
        self.define_step_at(pattern, options_or_code, code, SourceLocation::caller())
    }

    pub fn define_step_at(
        &mut self,
        pattern: impl Into<StepPattern>,
        options_or_code: DefinitionArg<StepDefinitionOptions>,
        code: Option<DefinitionArg<StepDefinitionOptions>>,
        location: SourceLocation,
    ) -> Result<()> {
        let cycle = self.cycle_mut("define_step")?;
        let config = build_step_definition_config(pattern, options_or_code, code, location, &cycle.cwd)?;
        tracing::debug!(pattern = %config.pattern, location = %config.location, "step registered");
        cycle.step_configs.push(config);
        Ok(())
    }

    #[track_caller]
    pub fn step<F>(&mut self, pattern: impl Into<StepPattern>, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_step(pattern, DefinitionArg::Code(code(f)), None)
    }

    #[track_caller]
    pub fn step_with<F>(
        &mut self,
        pattern: impl Into<StepPattern>,
        options: StepDefinitionOptions,
        f: F,
    ) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_step(
            pattern,
            DefinitionArg::Options(options),
            Some(DefinitionArg::Code(code(f))),
        )
    }

    #[track_caller]
    pub fn given<F>(&mut self, pattern: impl Into<StepPattern>, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.step(pattern, f)
    }

    #[track_caller]
    pub fn when<F>(&mut self, pattern: impl Into<StepPattern>, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.step(pattern, f)
    }

    #[track_caller]
    pub fn then<F>(&mut self, pattern: impl Into<StepPattern>, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.step(pattern, f)
    }

    /// Registrar for Before or After hooks
    pub fn define_test_case_hook(&mut self, kind: TestCaseHookKind) -> TestCaseHookRegistrar<'_> {
        TestCaseHookRegistrar { builder: self, kind }
    }

    #[track_caller]
    pub fn before<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_case_hook(TestCaseHookKind::Before)
            .register(DefinitionArg::Code(code(f)), None)
    }

    /// Register a Before hook with options or a tag expression
    #[track_caller]
    pub fn before_with<F>(&mut self, options: impl Into<TestCaseHookOptions>, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_case_hook(TestCaseHookKind::Before).register(
            DefinitionArg::Options(options.into()),
            Some(DefinitionArg::Code(code(f))),
        )
    }

    #[track_caller]
    pub fn after<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_case_hook(TestCaseHookKind::After)
            .register(DefinitionArg::Code(code(f)), None)
    }

    #[track_caller]
    pub fn after_with<F>(&mut self, options: impl Into<TestCaseHookOptions>, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_case_hook(TestCaseHookKind::After).register(
            DefinitionArg::Options(options.into()),
            Some(DefinitionArg::Code(code(f))),
        )
    }

    /// Registrar for BeforeAll or AfterAll hooks
    pub fn define_test_run_hook(&mut self, kind: TestRunHookKind) -> TestRunHookRegistrar<'_> {
        TestRunHookRegistrar { builder: self, kind }
    }

    #[track_caller]
    pub fn before_all<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_run_hook(TestRunHookKind::BeforeAll)
            .register(DefinitionArg::Code(code(f)), None)
    }

    #[track_caller]
    pub fn before_all_with<F>(&mut self, options: TestRunHookOptions, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_run_hook(TestRunHookKind::BeforeAll).register(
            DefinitionArg::Options(options),
            Some(DefinitionArg::Code(code(f))),
        )
    }

    #[track_caller]
    pub fn after_all<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_run_hook(TestRunHookKind::AfterAll)
            .register(DefinitionArg::Code(code(f)), None)
    }

    #[track_caller]
    pub fn after_all_with<F>(&mut self, options: TestRunHookOptions, f: F) -> Result<()>
    where
        F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
    {
        self.define_test_run_hook(TestRunHookKind::AfterAll).register(
            DefinitionArg::Options(options),
            Some(DefinitionArg::Code(code(f))),
        )
    }

    /// Timeout for definitions that do not declare their own
    pub fn set_default_timeout(&mut self, timeout: Duration) -> Result<()> {
        let cycle = self.cycle_mut("set_default_timeout")?;
        cycle.default_timeout = timeout;
        Ok(())
    }

    /// Wrap the code of every definition at finalize. Last call wins.
    pub fn set_definition_function_wrapper<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(Code, &WrapperContext<'_>) -> Code + Send + Sync + 'static,
    {
        let cycle = self.cycle_mut("set_definition_function_wrapper")?;
        if cycle.wrapper.replace(wrapper(f)).is_some() {
            tracing::warn!("definition function wrapper replaced");
        }
        Ok(())
    }

    /// Last call wins
    pub fn set_world_constructor<F, W>(&mut self, f: F) -> Result<()>
    where
        F: Fn(WorldOptions) -> W + Send + Sync + 'static,
        W: World,
    {
        let cycle = self.cycle_mut("set_world_constructor")?;
        if cycle.world_constructor.replace(world_constructor(f)).is_some() {
            tracing::warn!("world constructor replaced");
        }
        Ok(())
    }

    /// Compile every step, apply the wrapper and freeze the library.
    ///
    /// The cycle ends here even when compilation fails; start another with
    /// [`reset`](Self::reset).
    pub fn finalize(&mut self) -> Result<SupportCodeLibrary> {
        let cycle = match std::mem::replace(&mut self.state, CycleState::Finalized) {
            CycleState::Loading(cycle) => *cycle,
            CycleState::Idle => {
                self.state = CycleState::Idle;
                return Err(GlueError::Lifecycle("finalize called before reset".to_string()));
            }
            CycleState::Finalized => {
                return Err(GlueError::Lifecycle("finalize called twice".to_string()));
            }
        };

        let mut step_definitions = cycle
            .step_configs
            .into_iter()
            .map(|config| build_step_definition_from_config(config, &cycle.parameter_type_registry))
            .collect::<Result<Vec<StepDefinition>>>()?;
        let mut before_test_case_hooks = cycle.before_test_case_hooks;
        let mut after_test_case_hooks = cycle.after_test_case_hooks;
        let mut before_test_run_hooks = cycle.before_test_run_hooks;
        let mut after_test_run_hooks = cycle.after_test_run_hooks;

        if let Some(wrapper) = &cycle.wrapper {
            step_definitions.iter_mut().for_each(|d| d.wrap(wrapper));
            before_test_case_hooks
                .iter_mut()
                .chain(after_test_case_hooks.iter_mut())
                .for_each(|d| d.wrap(wrapper));
            before_test_run_hooks
                .iter_mut()
                .chain(after_test_run_hooks.iter_mut())
                .for_each(|d| d.wrap(wrapper));
        }

        after_test_case_hooks.reverse();
        after_test_run_hooks.reverse();

        tracing::info!(
            steps = step_definitions.len(),
            before_test_case_hooks = before_test_case_hooks.len(),
            after_test_case_hooks = after_test_case_hooks.len(),
            before_test_run_hooks = before_test_run_hooks.len(),
            after_test_run_hooks = after_test_run_hooks.len(),
            parameter_types = cycle.parameter_type_registry.len(),
            "support code library finalized"
        );

        Ok(SupportCodeLibrary {
            step_definitions,
            before_test_case_hook_definitions: before_test_case_hooks,
            after_test_case_hook_definitions: after_test_case_hooks,
            before_test_run_hook_definitions: before_test_run_hooks,
            after_test_run_hook_definitions: after_test_run_hooks,
            default_timeout: cycle.default_timeout,
            parameter_type_registry: cycle.parameter_type_registry,
            world_constructor: cycle.world_constructor.unwrap_or_else(default_world_constructor),
            world_parameters: self.config.world_parameters.clone(),
        })
    }

    fn push_test_case_hook(&mut self, hook_args: HookArgs<TestCaseHookOptions>, kind: TestCaseHookKind) -> Result<()> {
        let cycle = self.cycle_mut(kind.operation())?;
        let hook = build_test_case_hook_definition(
            kind,
            hook_args.options_or_code,
            hook_args.code,
            hook_args.location,
            &cycle.cwd,
        )?;
        tracing::debug!(kind = ?kind, location = %hook.location(), "test case hook registered");
        match kind {
            TestCaseHookKind::Before => cycle.before_test_case_hooks.push(hook),
            TestCaseHookKind::After => cycle.after_test_case_hooks.push(hook),
        }
        Ok(())
    }

    fn push_test_run_hook(&mut self, hook_args: HookArgs<TestRunHookOptions>, kind: TestRunHookKind) -> Result<()> {
        let cycle = self.cycle_mut(kind.operation())?;
        let hook = build_test_run_hook_definition(
            kind,
            hook_args.options_or_code,
            hook_args.code,
            hook_args.location,
            &cycle.cwd,
        )?;
        tracing::debug!(kind = ?kind, location = %hook.location(), "test run hook registered");
        match kind {
            TestRunHookKind::BeforeAll => cycle.before_test_run_hooks.push(hook),
            TestRunHookKind::AfterAll => cycle.after_test_run_hooks.push(hook),
        }
        Ok(())
    }
}

struct HookArgs<O> {
    options_or_code: DefinitionArg<O>,
    code: Option<DefinitionArg<O>>,
    location: SourceLocation,
}

impl TestCaseHookKind {
    fn operation(self) -> &'static str {
        match self {
            Self::Before => "Before",
            Self::After => "After",
        }
    }
}

impl TestRunHookKind {
    fn operation(self) -> &'static str {
        match self {
            Self::BeforeAll => "BeforeAll",
            Self::AfterAll => "AfterAll",
        }
    }
}

/// Registers test-case hooks of one kind
pub struct TestCaseHookRegistrar<'b> {
    builder: &'b mut SupportCodeLibraryBuilder,
    kind: TestCaseHookKind,
}

impl TestCaseHookRegistrar<'_> {
    /// `options_or_code` may be a tag expression, options, or the code itself
    #[track_caller]
    pub fn register(
        self,
        options_or_code: DefinitionArg<TestCaseHookOptions>,
        code: Option<DefinitionArg<TestCaseHookOptions>>,
    ) -> Result<()> {
        self.register_at(options_or_code, code, SourceLocation::caller())
    }

    pub fn register_at(
        self,
        options_or_code: DefinitionArg<TestCaseHookOptions>,
        code: Option<DefinitionArg<TestCaseHookOptions>>,
        location: SourceLocation,
    ) -> Result<()> {
        let args = HookArgs {
            options_or_code,
            code,
            location,
        };
        self.builder.push_test_case_hook(args, self.kind)
    }
}

/// Registers test-run hooks of one kind
pub struct TestRunHookRegistrar<'b> {
    builder: &'b mut SupportCodeLibraryBuilder,
    kind: TestRunHookKind,
}

impl TestRunHookRegistrar<'_> {
    #[track_caller]
    pub fn register(
        self,
        options_or_code: DefinitionArg<TestRunHookOptions>,
        code: Option<DefinitionArg<TestRunHookOptions>>,
    ) -> Result<()> {
        self.register_at(options_or_code, code, SourceLocation::caller())
    }

    pub fn register_at(
        self,
        options_or_code: DefinitionArg<TestRunHookOptions>,
        code: Option<DefinitionArg<TestRunHookOptions>>,
        location: SourceLocation,
    ) -> Result<()> {
        let args = HookArgs {
            options_or_code,
            code,
            location,
        };
        self.builder.push_test_run_hook(args, self.kind)
    }
}
