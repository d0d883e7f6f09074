//! Glue Core: shared error model, source locations and configuration
//!
//! Every other crate in the workspace builds on these types.

pub mod config;
pub mod error;
pub mod location;
pub mod logging;

pub use config::GlueConfig;
pub use error::{GlueError, Result};
pub use location::SourceLocation;

/// Media type used when a text attachment does not name one
pub const DEFAULT_TEXT_MEDIA_TYPE: &str = "text/plain";
