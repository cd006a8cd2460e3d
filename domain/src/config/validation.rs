//! Structured configuration issues.
//!
//! Loaders report problems as [`ConfigIssue`] values instead of failing, so
//! the binary can decide which ones to surface.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A model name field is blank.
    EmptyModelName { field: String },
    /// A string field holds a value outside its accepted set.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A numeric limit that must be positive is zero.
    ZeroValue { field: String },
    /// A configured file does not exist.
    MissingFile { field: String, path: String },
}

/// A detected issue in the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_severity() {
        let w = ConfigIssue::warning(
            ConfigIssueCode::ZeroValue {
                field: "database.row_cap".into(),
            },
            "row cap is zero",
        );
        assert!(!w.is_error());
        assert_eq!(w.to_string(), "row cap is zero");

        let e = ConfigIssue::error(
            ConfigIssueCode::EmptyModelName {
                field: "models.reasoning".into(),
            },
            "model name is empty",
        );
        assert!(e.is_error());
    }
}
