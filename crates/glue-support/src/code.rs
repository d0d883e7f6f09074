//! The fixed invocation signature shared by steps and hooks.
//!
//! Every definition's code takes the scenario's World and the matched
//! arguments and returns `anyhow::Result<()>`. A definition function wrapper
//! maps one [`Code`] to another with the same signature, which is how
//! cross-cutting behavior is layered over every definition at finalize time.

use crate::world::World;
use glue_core::SourceLocation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub type CodeResult = anyhow::Result<()>;

pub type Code = Arc<dyn Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync>;

/// Wrap a closure as [`Code`]
pub fn code<F>(f: F) -> Code
where
    F: Fn(&mut dyn World, &[Argument]) -> CodeResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A value handed to step or hook code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Argument {
    /// A transformed capture, or a runtime-provided value for hooks
    Value(Value),
    DataTable(Vec<Vec<String>>),
    DocString(DocString),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocString {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Argument {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(v) => v.as_str(),
            Self::DocString(doc) => Some(&doc.content),
            Self::DataTable(_) => None,
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Step,
    BeforeTestCase,
    AfterTestCase,
    BeforeTestRun,
    AfterTestRun,
}

/// What the wrapper knows about the definition it is wrapping
#[derive(Debug, Clone, Copy)]
pub struct WrapperContext<'a> {
    pub kind: DefinitionKind,
    pub location: &'a SourceLocation,
    /// `wrapper_options` from the step's options; always `None` for hooks
    pub wrapper_options: Option<&'a Value>,
}

pub type DefinitionFunctionWrapper = Arc<dyn Fn(Code, &WrapperContext<'_>) -> Code + Send + Sync>;

/// Wrap a closure as a [`DefinitionFunctionWrapper`]
pub fn wrapper<F>(f: F) -> DefinitionFunctionWrapper
where
    F: Fn(Code, &WrapperContext<'_>) -> Code + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn apply_wrapper(
    code: &mut Code,
    wrapper: &DefinitionFunctionWrapper,
    context: &WrapperContext<'_>,
) {
    *code = wrapper(Arc::clone(code), context);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_argument_accessors() {
        assert_eq!(Argument::from(json!(7)).as_i64(), Some(7));
        assert_eq!(Argument::from(json!("x")).as_str(), Some("x"));
        let doc = Argument::DocString(DocString {
            content: "body".into(),
            media_type: None,
        });
        assert_eq!(doc.as_str(), Some("body"));
        assert_eq!(doc.as_value(), None);
    }

    #[test]
    fn test_argument_serialization() {
        let table = Argument::DataTable(vec![vec!["a".into(), "b".into()]]);
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!({ "kind": "data_table", "value": [["a", "b"]] })
        );
    }
}
