//! GLUE-SUPPORT: the support-code registry
//!
//! Authoring code registers steps, hooks, parameter types and a World
//! constructor on a [`SupportCodeLibraryBuilder`]; `finalize` compiles them
//! into a [`SupportCodeLibrary`] the runtime queries for matching steps and
//! applicable hooks.
//!
//! # Example
//!
//! ```
//! use glue_support::{SupportCodeLibraryBuilder, DefaultWorld};
//!
//! let mut builder = SupportCodeLibraryBuilder::new();
//! builder.reset(".");
//! builder.given("I have {int} cucumbers", |world, args| {
//!     let count = args[0].as_i64().unwrap_or_default();
//!     let world = world.downcast_mut::<DefaultWorld>().expect("default world");
//!     world.parameters["count"] = count.into();
//!     Ok(())
//! }).unwrap();
//! builder.after(|_, _| Ok(())).unwrap();
//!
//! let library = builder.finalize().unwrap();
//! let matches = library.matching_step_definitions("I have 3 cucumbers", None).unwrap();
//! assert_eq!(matches.len(), 1);
//! ```

pub mod builder;
pub mod builders;
pub mod code;
pub mod definitions;
pub mod library;
pub mod options;
pub mod world;

pub use builder::{SupportCodeLibraryBuilder, TestCaseHookRegistrar, TestRunHookRegistrar};
pub use code::{code, wrapper, Argument, Code, CodeResult, DefinitionFunctionWrapper, DefinitionKind, DocString, WrapperContext};
pub use definitions::{
    Definition, StepDefinition, StepDefinitionConfig, TestCaseHookDefinition, TestCaseHookKind,
    TestRunHookDefinition, TestRunHookKind,
};
pub use library::{StepMatch, SupportCodeLibrary};
pub use options::{
    DefinitionArg, ParameterTypeOptions, StepDefinitionOptions, TestCaseHookOptions,
    TestRunHookOptions,
};
pub use world::{default_world_constructor, world_constructor, DefaultWorld, World, WorldConstructor, WorldOptions};

pub use glue_attach::{Attachment, AttachmentData, AttachmentManager, AttachmentTask};
pub use glue_core::{GlueConfig, GlueError, Result, SourceLocation};
pub use glue_expr::{transformer, StepPattern};
