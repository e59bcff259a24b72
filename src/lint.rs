//! Core types for lint diagnostics.

use std::path::PathBuf;

use serde::Serialize;

/// Severity levels for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Error codes for everything the linter can flag.
///
/// The `H`-prefixed codes cover hook validation, the `T`-prefixed codes
/// cover template validation. Severity is derived from the code rather
/// than stored per diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "H001")]
    FileMissing,
    #[serde(rename = "H002")]
    ParseError,
    #[serde(rename = "H003")]
    DeclarationError,
    #[serde(rename = "H004")]
    ParentMissing,
    #[serde(rename = "H101")]
    ParentIncompatible,
    #[serde(rename = "H102")]
    VisibilityChanged,
    #[serde(rename = "H103")]
    IncompatibleReturnType,
    #[serde(rename = "H104")]
    MissingParameter,
    #[serde(rename = "H105")]
    ExtraRequiredParameter,
    #[serde(rename = "H106")]
    IncompatibleParameterType,
    #[serde(rename = "H107")]
    ParameterRenamed,
    #[serde(rename = "H201")]
    ParentMethodMissing,
    #[serde(rename = "T001")]
    InterpolationNotBraced,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileMissing => "H001",
            ErrorCode::ParseError => "H002",
            ErrorCode::DeclarationError => "H003",
            ErrorCode::ParentMissing => "H004",
            ErrorCode::ParentIncompatible => "H101",
            ErrorCode::VisibilityChanged => "H102",
            ErrorCode::IncompatibleReturnType => "H103",
            ErrorCode::MissingParameter => "H104",
            ErrorCode::ExtraRequiredParameter => "H105",
            ErrorCode::IncompatibleParameterType => "H106",
            ErrorCode::ParameterRenamed => "H107",
            ErrorCode::ParentMethodMissing => "H201",
            ErrorCode::InterpolationNotBraced => "T001",
        }
    }

    /// A hook assuming a base method that no longer exists is suspicious but
    /// not provably broken, so it is the one warning-level code.
    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::ParentMethodMissing => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub code: ErrorCode,
    /// Name of the resource (application or plugin) the finding belongs to.
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<usize>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, code: ErrorCode, resource: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            resource: resource.into(),
            file: None,
            line: None,
            col: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_method_missing_is_the_only_warning() {
        let codes = [
            ErrorCode::FileMissing,
            ErrorCode::ParseError,
            ErrorCode::DeclarationError,
            ErrorCode::ParentMissing,
            ErrorCode::ParentIncompatible,
            ErrorCode::VisibilityChanged,
            ErrorCode::IncompatibleReturnType,
            ErrorCode::MissingParameter,
            ErrorCode::ExtraRequiredParameter,
            ErrorCode::IncompatibleParameterType,
            ErrorCode::ParameterRenamed,
            ErrorCode::InterpolationNotBraced,
        ];
        for code in codes {
            assert_eq!(code.severity(), Severity::Error, "{code}");
        }
        assert_eq!(
            ErrorCode::ParentMethodMissing.severity(),
            Severity::Warning
        );
    }

    #[test]
    fn diagnostic_builder() {
        let diag = Diagnostic::new("something", ErrorCode::ParseError, "forums")
            .with_file("/tmp/hook.php")
            .with_line(12);
        assert_eq!(diag.code.as_str(), "H002");
        assert_eq!(diag.line, Some(12));
        assert_eq!(diag.severity(), Severity::Error);
    }
}
