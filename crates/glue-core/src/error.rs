//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlueError {
    /// Invalid or duplicate parameter type, unknown placeholder, malformed expression
    #[error("CONFIG/{0}")]
    Configuration(String),

    /// Code argument missing or not invocable
    #[error("DEFINITION/{0}")]
    Definition(String),

    /// Attachment input rejected
    #[error("ARGUMENT/{0}")]
    Argument(String),

    #[error("STREAM/{0}")]
    Stream(String),

    /// Registration outside of a reset cycle, or after finalize
    #[error("LIFECYCLE/{0}")]
    Lifecycle(String),

    /// A parameter transformer refused a captured value
    #[error("TRANSFORM/{0}")]
    Transform(String),
}

impl GlueError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_definition(&self) -> bool {
        matches!(self, Self::Definition(_))
    }

    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }
}

impl From<std::io::Error> for GlueError {
    fn from(err: std::io::Error) -> Self {
        Self::Stream(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GlueError>;
