//! Where a definition was authored
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// File and line of a definition, used for diagnostics and snippets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub uri: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(uri: impl Into<String>, line: u32) -> Self {
        Self {
            uri: uri.into(),
            line,
        }
    }

    /// Location of the function that called into a `#[track_caller]` chain
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self::new(loc.file(), loc.line())
    }

    /// Rewrite `uri` relative to `cwd` when it lives underneath it.
    ///
    /// Paths outside of `cwd`, or already relative, are kept as they are.
    pub fn relative_to(&self, cwd: &Path) -> Self {
        let uri = Path::new(&self.uri)
            .strip_prefix(cwd)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| self.uri.clone());
        Self {
            uri,
            line: self.line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uri, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to_cwd() {
        let loc = SourceLocation::new("/work/project/features/steps.rs", 12);
        let rel = loc.relative_to(Path::new("/work/project"));
        assert_eq!(rel.uri, "features/steps.rs");
        assert_eq!(rel.line, 12);
    }

    #[test]
    fn test_outside_cwd_is_untouched() {
        let loc = SourceLocation::new("/elsewhere/steps.rs", 3);
        assert_eq!(loc.relative_to(Path::new("/work/project")), loc);
    }

    #[test]
    fn test_caller_points_here() {
        let loc = SourceLocation::caller();
        assert!(loc.uri.ends_with("location.rs"));
        assert!(loc.line > 0);
        assert_eq!(loc.to_string(), format!("{}:{}", loc.uri, loc.line));
    }
}
