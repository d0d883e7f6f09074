//! Definition builders: normalize raw registration arguments
use crate::code::Code;
use crate::definitions::{
    StepDefinition, StepDefinitionConfig, TestCaseHookDefinition, TestCaseHookKind,
    TestRunHookDefinition, TestRunHookKind,
};
use crate::options::{
    DefinitionArg, ParameterTypeOptions, StepDefinitionOptions, TestCaseHookOptions,
    TestRunHookOptions,
};
use glue_core::{GlueError, Result, SourceLocation};
use glue_expr::{Expression, ParameterType, ParameterTypeRegistry, StepPattern};
use std::path::Path;

/// Apply the options-or-code rule to a registration's trailing arguments
pub fn resolve_overload<O: Default>(
    options_or_code: DefinitionArg<O>,
    code: Option<DefinitionArg<O>>,
) -> Result<(O, Code)> {
    match (options_or_code, code) {
        (DefinitionArg::Code(code), None) => Ok((O::default(), code)),
        (DefinitionArg::Code(_), Some(_)) => Err(GlueError::Definition(
            "unexpected argument after the code".to_string(),
        )),
        (DefinitionArg::Options(options), Some(DefinitionArg::Code(code))) => Ok((options, code)),
        (DefinitionArg::Options(_), Some(DefinitionArg::Options(_))) => Err(GlueError::Definition(
            "invalid code: expected a function, got options".to_string(),
        )),
        (DefinitionArg::Options(_), None) => Err(GlueError::Definition(
            "invalid code: no function given after the options".to_string(),
        )),
    }
}

fn with_location(err: GlueError, location: &SourceLocation) -> GlueError {
    match err {
        GlueError::Definition(msg) => GlueError::Definition(format!("{} ({})", msg, location)),
        other => other,
    }
}

pub fn build_step_definition_config(
    pattern: impl Into<StepPattern>,
    options_or_code: DefinitionArg<StepDefinitionOptions>,
    code: Option<DefinitionArg<StepDefinitionOptions>>,
    location: SourceLocation,
    cwd: &Path,
) -> Result<StepDefinitionConfig> {
    let location = location.relative_to(cwd);
    let (options, code) =
        resolve_overload(options_or_code, code).map_err(|e| with_location(e, &location))?;
    Ok(StepDefinitionConfig {
        pattern: pattern.into(),
        options,
        code,
        location,
    })
}

/// Build a test-case hook; a malformed tag expression fails here
pub fn build_test_case_hook_definition(
    kind: TestCaseHookKind,
    options_or_code: DefinitionArg<TestCaseHookOptions>,
    code: Option<DefinitionArg<TestCaseHookOptions>>,
    location: SourceLocation,
    cwd: &Path,
) -> Result<TestCaseHookDefinition> {
    let location = location.relative_to(cwd);
    let (options, code) =
        resolve_overload(options_or_code, code).map_err(|e| with_location(e, &location))?;
    TestCaseHookDefinition::new(kind, options, code, location)
}

pub fn build_test_run_hook_definition(
    kind: TestRunHookKind,
    options_or_code: DefinitionArg<TestRunHookOptions>,
    code: Option<DefinitionArg<TestRunHookOptions>>,
    location: SourceLocation,
    cwd: &Path,
) -> Result<TestRunHookDefinition> {
    let location = location.relative_to(cwd);
    let (options, code) =
        resolve_overload(options_or_code, code).map_err(|e| with_location(e, &location))?;
    Ok(TestRunHookDefinition::new(kind, options, code, location))
}

pub fn build_parameter_type(options: ParameterTypeOptions) -> Result<ParameterType> {
    Ok(
        ParameterType::new(options.name, options.regexps, options.transformer)?
            .with_use_for_snippets(options.use_for_snippets.unwrap_or(true))
            .with_prefer_for_regexp_match(options.prefer_for_regexp_match.unwrap_or(false)),
    )
}

/// Compile a buffered step against the registry as it stands now
pub fn build_step_definition_from_config(
    config: StepDefinitionConfig,
    registry: &ParameterTypeRegistry,
) -> Result<StepDefinition> {
    let expression = Expression::compile(&config.pattern, registry).map_err(|e| match e {
        GlueError::Configuration(msg) => {
            GlueError::Configuration(format!("{} ({})", msg, config.location))
        }
        other => other,
    })?;
    Ok(StepDefinition::new(config, expression))
}
