//! Integration tests for glue-support: full reset/register/finalize cycles
//! as a runtime would drive them.

use futures::stream;
use glue_support::{
    code, transformer, Argument, AttachmentData, AttachmentManager, DefaultWorld, Definition, DefinitionArg,
    DefinitionKind, DocString, GlueConfig, ParameterTypeOptions, SourceLocation,
    StepDefinitionOptions, SupportCodeLibraryBuilder, TestCaseHookKind, TestCaseHookOptions,
    TestRunHookKind, World, WorldOptions,
};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<String>>>;

fn loaded() -> SupportCodeLibraryBuilder {
    let mut builder = SupportCodeLibraryBuilder::new();
    builder.reset("/project");
    builder
}

fn logging(
    journal: &Journal,
    entry: &'static str,
) -> impl Fn(&mut dyn World, &[Argument]) -> anyhow::Result<()> + Send + Sync + 'static {
    let journal = Arc::clone(journal);
    move |_, _| {
        journal.lock().unwrap().push(entry.to_string());
        Ok(())
    }
}

fn default_world() -> Box<dyn World> {
    Box::new(DefaultWorld::new(WorldOptions {
        attach: AttachmentManager::new(|_| {}),
        parameters: Value::Null,
    }))
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_after_hooks_run_in_reverse() {
    let journal: Journal = Arc::default();
    let mut builder = loaded();
    builder.before(logging(&journal, "before A")).unwrap();
    builder.before(logging(&journal, "before B")).unwrap();
    builder.after(logging(&journal, "after A")).unwrap();
    builder.after(logging(&journal, "after B")).unwrap();
    builder.before_all(logging(&journal, "before all A")).unwrap();
    builder.before_all(logging(&journal, "before all B")).unwrap();
    builder.after_all(logging(&journal, "after all A")).unwrap();
    builder.after_all(logging(&journal, "after all B")).unwrap();
    let library = builder.finalize().unwrap();

    let mut world = default_world();
    for hook in library.before_test_run_hook_definitions() {
        hook.invoke(world.as_mut(), &[]).unwrap();
    }
    for hook in library.before_test_case_hook_definitions() {
        hook.invoke(world.as_mut(), &[]).unwrap();
    }
    for hook in library.after_test_case_hook_definitions() {
        hook.invoke(world.as_mut(), &[]).unwrap();
    }
    for hook in library.after_test_run_hook_definitions() {
        hook.invoke(world.as_mut(), &[]).unwrap();
    }

    assert_eq!(
        *journal.lock().unwrap(),
        vec![
            "before all A",
            "before all B",
            "before A",
            "before B",
            "after B",
            "after A",
            "after all B",
            "after all A",
        ]
    );
}

#[test]
fn test_step_order_is_registration_order() {
    let mut builder = loaded();
    builder.given("first", |_, _| Ok(())).unwrap();
    builder.when("second", |_, _| Ok(())).unwrap();
    builder.then("third", |_, _| Ok(())).unwrap();
    let library = builder.finalize().unwrap();

    let patterns: Vec<String> = library
        .step_definitions()
        .iter()
        .map(|d| d.pattern().to_string())
        .collect();
    assert_eq!(patterns, ["first", "second", "third"]);
}

// =============================================================================
// Step Compilation
// =============================================================================

#[test]
fn test_parameter_type_defined_after_step() {
    let mut builder = loaded();
    builder
        .step("the light turns {color}", |world, args| {
            let world = world.downcast_mut::<DefaultWorld>().unwrap();
            world.parameters = args[0].as_value().cloned().unwrap_or_default();
            Ok(())
        })
        .unwrap();
    builder
        .define_parameter_type(ParameterTypeOptions::new(
            "color",
            "red|amber|green",
            transformer(|g| Ok(json!({ "color": g[0].unwrap_or_default() }))),
        ))
        .unwrap();
    let library = builder.finalize().unwrap();

    let matches = library
        .matching_step_definitions("the light turns amber", None)
        .unwrap();
    assert_eq!(matches.len(), 1);

    let mut world = default_world();
    matches[0]
        .definition
        .invoke(world.as_mut(), &matches[0].arguments)
        .unwrap();
    assert_eq!(
        world.downcast_ref::<DefaultWorld>().unwrap().parameters,
        json!({ "color": "amber" })
    );
}

#[test]
fn test_raw_and_typed_registration_are_equivalent() {
    let mut builder = loaded();
    builder
        .define_step("I eat {int}", DefinitionArg::code(|_, _| Ok(())), None)
        .unwrap();
    builder
        .define_step(
            "I eat {int}",
            DefinitionArg::Options(StepDefinitionOptions::default()),
            Some(DefinitionArg::code(|_, _| Ok(()))),
        )
        .unwrap();
    let library = builder.finalize().unwrap();

    let [a, b] = library.step_definitions() else {
        panic!("expected two step definitions");
    };
    assert_eq!(a.pattern().to_string(), b.pattern().to_string());
    assert_eq!(a.options(), b.options());
    assert_eq!(a.timeout(), b.timeout());
    assert_eq!(
        a.match_step("I eat 4", None).unwrap(),
        b.match_step("I eat 4", None).unwrap()
    );
}

#[test]
fn test_missing_code_is_definition_error() {
    let mut builder = loaded();
    let err = builder
        .define_step(
            "I eat {int}",
            DefinitionArg::Options(StepDefinitionOptions::default()),
            None,
        )
        .unwrap_err();
    assert!(err.is_definition());

    let err = builder
        .define_test_run_hook(TestRunHookKind::BeforeAll)
        .register(DefinitionArg::code(|_, _| Ok(())), Some(DefinitionArg::code(|_, _| Ok(()))))
        .unwrap_err();
    assert!(err.is_definition());
}

#[test]
fn test_regular_expression_steps() {
    let mut builder = loaded();
    builder
        .step(Regex::new(r"^I wait (\d+) (seconds?)( quietly)?$").unwrap(), |_, _| Ok(()))
        .unwrap();
    let library = builder.finalize().unwrap();

    let matches = library.matching_step_definitions("I wait 3 seconds", None).unwrap();
    assert_eq!(
        matches[0].arguments,
        vec![
            Argument::Value(json!("3")),
            Argument::Value(json!("seconds")),
            Argument::Value(Value::Null),
        ]
    );
}

#[test]
fn test_ambiguous_and_undefined_steps_are_reported_as_counts() {
    let mut builder = loaded();
    builder.step("I have {int} apples", |_, _| Ok(())).unwrap();
    builder.step("I have {word} apples", |_, _| Ok(())).unwrap();
    let library = builder.finalize().unwrap();

    assert_eq!(library.matching_step_definitions("I have 3 apples", None).unwrap().len(), 2);
    assert_eq!(library.matching_step_definitions("I have some apples", None).unwrap().len(), 1);
    assert!(library.matching_step_definitions("I have pears", None).unwrap().is_empty());
}

#[test]
fn test_transform_failure_surfaces_while_matching() {
    let mut builder = loaded();
    builder
        .define_parameter_type(ParameterTypeOptions::new(
            "even",
            r"\d+",
            transformer(|g| {
                let n: i64 = g[0].unwrap_or_default().parse().map_err(|_| "not a number".to_string())?;
                if n % 2 == 0 {
                    Ok(json!(n))
                } else {
                    Err(format!("{} is odd", n))
                }
            }),
        ))
        .unwrap();
    builder.step("{even} items", |_, _| Ok(())).unwrap();
    let library = builder.finalize().unwrap();

    assert!(library.matching_step_definitions("4 items", None).is_ok());
    let err = library.matching_step_definitions("3 items", None).unwrap_err();
    assert!(err.to_string().starts_with("TRANSFORM/"));
}

#[test]
fn test_doc_string_is_appended_to_arguments() {
    let mut builder = loaded();
    builder.step("the request body is:", |_, _| Ok(())).unwrap();
    let library = builder.finalize().unwrap();

    let doc = Argument::DocString(DocString {
        content: "{\"id\": 1}".into(),
        media_type: Some("application/json".into()),
    });
    let matches = library
        .matching_step_definitions("the request body is:", Some(&doc))
        .unwrap();
    assert_eq!(matches[0].arguments, vec![doc]);
}

// =============================================================================
// Hooks
// =============================================================================

#[test]
fn test_tagged_hooks_through_registrar() {
    let mut builder = loaded();
    builder
        .define_test_case_hook(TestCaseHookKind::Before)
        .register("@slow or @db".into(), Some(DefinitionArg::code(|_, _| Ok(()))))
        .unwrap();
    builder
        .before_with(TestCaseHookOptions::default().with_tags("@ui"), |_, _| Ok(()))
        .unwrap();
    let library = builder.finalize().unwrap();

    assert_eq!(library.before_test_case_hooks_for(&["@db"]).len(), 1);
    assert_eq!(library.before_test_case_hooks_for(&["@ui", "@slow"]).len(), 2);
    assert!(library.before_test_case_hooks_for(&["@api"]).is_empty());
}

#[test]
fn test_malformed_tag_expression_fails_registration() {
    let mut builder = loaded();
    let err = builder.after_with("@a and (@b", |_, _| Ok(())).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_explicit_location_is_relative_to_cwd() {
    let mut builder = loaded();
    builder
        .define_test_case_hook(TestCaseHookKind::After)
        .register_at(
            DefinitionArg::code(|_, _| Ok(())),
            None,
            SourceLocation::new("/project/support/hooks.rs", 12),
        )
        .unwrap();
    let library = builder.finalize().unwrap();

    assert_eq!(
        library.after_test_case_hook_definitions()[0].location().to_string(),
        "support/hooks.rs:12"
    );
}

// =============================================================================
// Wrapper
// =============================================================================

#[test]
fn test_wrapper_applies_to_steps_and_hooks() {
    let journal: Journal = Arc::default();
    let record = Arc::clone(&journal);

    let mut builder = loaded();
    builder
        .step_with(
            "a retried step",
            StepDefinitionOptions::default().with_wrapper_options(json!({ "retries": 3 })),
            |_, _| Ok(()),
        )
        .unwrap();
    builder.before(|_, _| Ok(())).unwrap();
    builder.after_all(|_, _| Ok(())).unwrap();
    builder
        .set_definition_function_wrapper(move |inner, context| {
            let record = Arc::clone(&record);
            let label = format!(
                "{:?} {}",
                context.kind,
                context.wrapper_options.map(Value::to_string).unwrap_or_default()
            );
            code(move |world, args| {
                record.lock().unwrap().push(label.clone());
                inner(world, args)
            })
        })
        .unwrap();
    let library = builder.finalize().unwrap();

    let mut world = default_world();
    library.step_definitions()[0].invoke(world.as_mut(), &[]).unwrap();
    library.before_test_case_hook_definitions()[0]
        .invoke(world.as_mut(), &[])
        .unwrap();
    library.after_test_run_hook_definitions()[0]
        .invoke(world.as_mut(), &[])
        .unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec![
            format!("{:?} {{\"retries\":3}}", DefinitionKind::Step),
            format!("{:?} ", DefinitionKind::BeforeTestCase),
            format!("{:?} ", DefinitionKind::AfterTestRun),
        ]
    );
}

#[test]
fn test_step_errors_propagate_through_wrapper() {
    let mut builder = loaded();
    builder
        .step("it fails", |_, _| Err(anyhow::anyhow!("boom")))
        .unwrap();
    builder
        .set_definition_function_wrapper(|inner, _| {
            code(move |world, args| inner(world, args).map_err(|e| e.context("wrapped")))
        })
        .unwrap();
    let library = builder.finalize().unwrap();

    let mut world = default_world();
    let err = library.step_definitions()[0]
        .invoke(world.as_mut(), &[])
        .unwrap_err();
    assert_eq!(format!("{:#}", err), "wrapped: boom");
}

// =============================================================================
// Cycles and World
// =============================================================================

#[test]
fn test_two_cycles_are_independent() {
    let mut builder = loaded();
    builder.step("only in the first cycle", |_, _| Ok(())).unwrap();
    builder.before(|_, _| Ok(())).unwrap();
    builder
        .define_parameter_type(ParameterTypeOptions::new(
            "flavor",
            "sweet|sour",
            transformer(|g| Ok(json!(g[0].unwrap_or_default()))),
        ))
        .unwrap();
    builder.step("a {flavor} drink", |_, _| Ok(())).unwrap();
    let first = builder.finalize().unwrap();

    builder.reset("/other");
    builder.step("a {flavor} drink", |_, _| Ok(())).unwrap();
    let err = builder.finalize().unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("{flavor}"));

    builder.reset("/other");
    builder.step("only in the second cycle", |_, _| Ok(())).unwrap();
    let second = builder.finalize().unwrap();

    assert_eq!(first.step_definitions().len(), 2);
    assert_eq!(first.before_test_case_hook_definitions().len(), 1);
    assert!(first.parameter_type_registry().lookup_by_type_name("flavor").is_some());
    assert!(second.parameter_type_registry().lookup_by_type_name("flavor").is_none());
    assert_eq!(second.step_definitions().len(), 1);
    assert!(second.before_test_case_hook_definitions().is_empty());
    assert!(second
        .matching_step_definitions("only in the first cycle", None)
        .unwrap()
        .is_empty());
}

#[test]
fn test_reset_discards_unfinalized_registrations() {
    let mut builder = loaded();
    builder.step("uses {missing}", |_, _| Ok(())).unwrap();
    builder.reset("/project");
    assert!(builder.finalize().unwrap().step_definitions().is_empty());
}

#[test]
fn test_default_world_gets_config_parameters_and_attach() {
    let config = GlueConfig::from_yaml("world_parameters:\n  base_url: http://localhost:8080\n").unwrap();
    let mut builder = SupportCodeLibraryBuilder::with_config(config);
    builder.reset("/project");
    builder
        .then("I log {string}", |world, args| {
            let world = world
                .downcast_mut::<DefaultWorld>()
                .ok_or_else(|| anyhow::anyhow!("unexpected world"))?;
            let text = args[0].as_str().unwrap_or_default().to_string();
            let _ = world.attach(text, None);
            Ok(())
        })
        .unwrap();
    let library = builder.finalize().unwrap();

    let seen: Arc<Mutex<Vec<glue_support::Attachment>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let mut world = library.create_world(AttachmentManager::new(move |a| sink.lock().unwrap().push(a)));
    assert_eq!(
        world.downcast_ref::<DefaultWorld>().unwrap().parameters["base_url"],
        "http://localhost:8080"
    );

    let matches = library
        .matching_step_definitions("I log \"ready\"", None)
        .unwrap();
    matches[0]
        .definition
        .invoke(world.as_mut(), &matches[0].arguments)
        .unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].data, "ready");
    assert_eq!(seen[0].media.media_type, "text/plain");
}

#[test]
fn test_custom_world_constructor() {
    struct Basket {
        apples: i64,
    }
    impl World for Basket {}

    let mut builder = loaded();
    builder.set_world_constructor(|_| Basket { apples: 0 }).unwrap();
    builder
        .given("I add {int} apples", |world, args| {
            let basket = world
                .downcast_mut::<Basket>()
                .ok_or_else(|| anyhow::anyhow!("expected a basket"))?;
            basket.apples += args[0].as_i64().unwrap_or_default();
            Ok(())
        })
        .unwrap();
    let library = builder.finalize().unwrap();

    let mut world = library.create_world(AttachmentManager::new(|_| {}));
    for text in ["I add 2 apples", "I add 5 apples"] {
        let matches = library.matching_step_definitions(text, None).unwrap();
        matches[0]
            .definition
            .invoke(world.as_mut(), &matches[0].arguments)
            .unwrap();
    }
    assert_eq!(world.downcast_ref::<Basket>().unwrap().apples, 7);
}

#[tokio::test]
async fn test_stream_attachment_from_step_world() {
    let seen: Arc<Mutex<Vec<glue_support::Attachment>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let manager = AttachmentManager::new(move |a| sink.lock().unwrap().push(a));

    let world = DefaultWorld::new(WorldOptions {
        attach: manager,
        parameters: Value::Null,
    });
    let chunks = stream::iter(vec![Ok(b"a".to_vec()), Ok(b"b".to_vec())]);
    world
        .attach(AttachmentData::from_stream(chunks), Some("application/octet-stream"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].data, "YWI=");
}
