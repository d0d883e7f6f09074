//! Parameter types and their registry.
//!
//! A parameter type names one or more regular expressions and a transformer
//! turning the captured text into a JSON value. Step expressions refer to
//! them by name (`{int}`); the registry is consulted when the expression is
//! compiled, so a type only has to be registered before compilation.

use glue_core::{GlueError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Converts captured groups into a value.
///
/// Receives the parameter's inner capture groups, or the whole capture when
/// its regexps define no groups of their own.
pub type Transformer = Arc<dyn Fn(&[Option<&str>]) -> std::result::Result<Value, String> + Send + Sync>;

/// Wrap a closure as a [`Transformer`]
pub fn transformer<F>(f: F) -> Transformer
where
    F: Fn(&[Option<&str>]) -> std::result::Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(f)
}

static ILLEGAL_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[{}()\\/\s]").unwrap());

#[derive(Clone)]
pub struct ParameterType {
    pub name: String,
    pub regexps: Vec<String>,
    pub use_for_snippets: bool,
    pub prefer_for_regexp_match: bool,
    transformer: Transformer,
    inner_groups: usize,
}

impl ParameterType {
    /// Validate the regexps and build a parameter type with default flags
    pub fn new(
        name: impl Into<String>,
        regexps: Vec<String>,
        transformer: Transformer,
    ) -> Result<Self> {
        let name = name.into();
        if ILLEGAL_NAME_CHARS.is_match(&name) {
            return Err(GlueError::Configuration(format!(
                "illegal character in parameter type name {:?}",
                name
            )));
        }
        if regexps.is_empty() {
            return Err(GlueError::Configuration(format!(
                "parameter type {:?} must define at least one regexp",
                name
            )));
        }

        let mut inner_groups = 0;
        for source in &regexps {
            let regex = Regex::new(source).map_err(|e| {
                GlueError::Configuration(format!(
                    "invalid regexp for parameter type {:?}: {}",
                    name, e
                ))
            })?;
            inner_groups += regex.captures_len() - 1;
        }

        Ok(Self {
            name,
            regexps,
            use_for_snippets: true,
            prefer_for_regexp_match: false,
            transformer,
            inner_groups,
        })
    }

    pub fn with_use_for_snippets(mut self, value: bool) -> Self {
        self.use_for_snippets = value;
        self
    }

    pub fn with_prefer_for_regexp_match(mut self, value: bool) -> Self {
        self.prefer_for_regexp_match = value;
        self
    }

    /// Number of capture groups declared by this type's own regexps
    pub fn inner_groups(&self) -> usize {
        self.inner_groups
    }

    /// The capturing group used when this type appears in an expression
    pub(crate) fn group_source(&self) -> String {
        let alternatives: Vec<String> = self
            .regexps
            .iter()
            .map(|r| format!("(?:{})", r))
            .collect();
        format!("({})", alternatives.join("|"))
    }

    pub fn transform(&self, groups: &[Option<&str>]) -> Result<Value> {
        (self.transformer)(groups).map_err(|e| {
            GlueError::Transform(format!("parameter type {:?}: {}", self.name, e))
        })
    }
}

impl fmt::Debug for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterType")
            .field("name", &self.name)
            .field("regexps", &self.regexps)
            .field("use_for_snippets", &self.use_for_snippets)
            .field("prefer_for_regexp_match", &self.prefer_for_regexp_match)
            .finish()
    }
}

/// All parameter types visible to one registration cycle
#[derive(Debug, Clone)]
pub struct ParameterTypeRegistry {
    types: Vec<Arc<ParameterType>>,
    by_name: HashMap<String, usize>,
}

impl ParameterTypeRegistry {
    /// A registry holding the built-in types
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
        };
        for parameter_type in builtin_types() {
            registry.insert(parameter_type);
        }
        registry
    }

    pub fn define_parameter_type(&mut self, parameter_type: ParameterType) -> Result<()> {
        if self.by_name.contains_key(&parameter_type.name) {
            return Err(GlueError::Configuration(format!(
                "there is already a parameter type named {:?}",
                parameter_type.name
            )));
        }

        if parameter_type.prefer_for_regexp_match {
            for existing in self.types.iter().filter(|t| t.prefer_for_regexp_match) {
                if let Some(shared) = existing
                    .regexps
                    .iter()
                    .find(|r| parameter_type.regexps.contains(r))
                {
                    return Err(GlueError::Configuration(format!(
                        "parameter types {:?} and {:?} are both preferential for regexp {:?}",
                        existing.name, parameter_type.name, shared
                    )));
                }
            }
        }

        tracing::debug!(name = %parameter_type.name, "parameter type defined");
        self.insert(parameter_type);
        Ok(())
    }

    fn insert(&mut self, parameter_type: ParameterType) {
        self.by_name
            .insert(parameter_type.name.clone(), self.types.len());
        self.types.push(Arc::new(parameter_type));
    }

    pub fn lookup_by_type_name(&self, name: &str) -> Option<Arc<ParameterType>> {
        self.by_name.get(name).map(|&i| Arc::clone(&self.types[i]))
    }

    /// Types in registration order, built-ins first
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ParameterType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for ParameterTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn first_group<'a>(groups: &[Option<&'a str>]) -> std::result::Result<&'a str, String> {
    groups
        .iter()
        .flatten()
        .next()
        .copied()
        .ok_or_else(|| "nothing was captured".to_string())
}

fn builtin(name: &str, regexps: &[&str], transformer: Transformer) -> ParameterType {
    // Built-in regexps are static and known to compile
    ParameterType {
        name: name.to_string(),
        regexps: regexps.iter().map(|r| r.to_string()).collect(),
        use_for_snippets: true,
        prefer_for_regexp_match: false,
        inner_groups: regexps
            .iter()
            .map(|r| Regex::new(r).map(|re| re.captures_len() - 1).unwrap_or(0))
            .sum(),
        transformer,
    }
}

fn builtin_types() -> Vec<ParameterType> {
    vec![
        builtin(
            "int",
            &[r"-?\d+"],
            transformer(|groups| {
                let raw = first_group(groups)?;
                raw.parse::<i64>()
                    .map(Value::from)
                    .map_err(|e| format!("{:?} is not an int: {}", raw, e))
            }),
        )
        .with_prefer_for_regexp_match(true),
        builtin(
            "float",
            &[r"-?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][-+]?\d+)?"],
            transformer(|groups| {
                let raw = first_group(groups)?;
                let parsed = raw
                    .parse::<f64>()
                    .map_err(|e| format!("{:?} is not a float: {}", raw, e))?;
                serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| format!("{:?} is not a finite float", raw))
            }),
        ),
        builtin(
            "word",
            &[r"[^\s]+"],
            transformer(|groups| first_group(groups).map(|s| Value::String(s.to_string()))),
        ),
        builtin(
            "string",
            &[r#""([^"\\]*(?:\\.[^"\\]*)*)""#, r"'([^'\\]*(?:\\.[^'\\]*)*)'"],
            transformer(|groups| {
                let raw = groups.iter().flatten().next().copied().unwrap_or("");
                Ok(Value::String(
                    raw.replace("\\\"", "\"").replace("\\'", "'"),
                ))
            }),
        ),
        builtin(
            "",
            &[r".*"],
            transformer(|groups| first_group(groups).map(|s| Value::String(s.to_string()))),
        )
        .with_use_for_snippets(false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper() -> Transformer {
        transformer(|groups| first_group(groups).map(|s| Value::String(s.to_uppercase())))
    }

    #[test]
    fn test_builtins_present() {
        let registry = ParameterTypeRegistry::new();
        for name in ["int", "float", "word", "string", ""] {
            assert!(registry.lookup_by_type_name(name).is_some(), "missing {:?}", name);
        }
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_string_type_has_inner_groups() {
        let registry = ParameterTypeRegistry::new();
        let string = registry.lookup_by_type_name("string").unwrap();
        assert_eq!(string.inner_groups(), 2);
        assert_eq!(
            string.transform(&[None, Some("it\\'s")]).unwrap(),
            json!("it's")
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ParameterTypeRegistry::new();
        let color = ParameterType::new("color", vec!["red|blue".into()], upper()).unwrap();
        registry.define_parameter_type(color.clone()).unwrap();
        let err = registry.define_parameter_type(color).unwrap_err();
        assert!(err.is_configuration());

        let err = registry
            .define_parameter_type(ParameterType::new("int", vec![r"\d+".into()], upper()).unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("\"int\""));
    }

    #[test]
    fn test_illegal_name_and_regexp() {
        assert!(ParameterType::new("my type", vec!["x".into()], upper())
            .unwrap_err()
            .is_configuration());
        assert!(ParameterType::new("ok", vec!["(".into()], upper())
            .unwrap_err()
            .is_configuration());
        assert!(ParameterType::new("ok", vec![], upper())
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_conflicting_preferential_types() {
        let mut registry = ParameterTypeRegistry::new();
        let a = ParameterType::new("a", vec!["[a-z]+".into()], upper())
            .unwrap()
            .with_prefer_for_regexp_match(true);
        let b = ParameterType::new("b", vec!["[a-z]+".into()], upper())
            .unwrap()
            .with_prefer_for_regexp_match(true);
        let c = ParameterType::new("c", vec!["[a-z]+".into()], upper()).unwrap();
        registry.define_parameter_type(a).unwrap();
        assert!(registry.define_parameter_type(b).unwrap_err().is_configuration());
        registry.define_parameter_type(c).unwrap();
    }

    #[test]
    fn test_transform_failure_is_transform_error() {
        let registry = ParameterTypeRegistry::new();
        let int = registry.lookup_by_type_name("int").unwrap();
        let err = int.transform(&[Some("99999999999999999999")]).unwrap_err();
        assert!(matches!(err, GlueError::Transform(_)));
    }
}
