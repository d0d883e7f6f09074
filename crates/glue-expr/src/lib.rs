//! GLUE-EXPR: the matching collaborators of the registry
//!
//! - [`ParameterTypeRegistry`]: named, typed captures (`{int}`, `{word}`, ...)
//! - [`Expression`]: step patterns compiled against the registry
//! - [`TagExpression`]: boolean predicates over a scenario's tags
//!
//! # Example
//!
//! ```
//! use glue_expr::{Expression, ParameterTypeRegistry, StepPattern};
//!
//! let registry = ParameterTypeRegistry::new();
//! let expr = Expression::compile(&StepPattern::from("I have {int} cucumber(s)"), &registry).unwrap();
//! let args = expr.match_text("I have 42 cucumbers").unwrap().unwrap();
//! assert_eq!(args, vec![serde_json::json!(42)]);
//! ```

pub mod expression;
pub mod parameter_type;
pub mod tags;

pub use expression::{Expression, StepPattern};
pub use parameter_type::{transformer, ParameterType, ParameterTypeRegistry, Transformer};
pub use tags::TagExpression;
