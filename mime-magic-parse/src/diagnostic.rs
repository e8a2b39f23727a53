//! Compilation diagnostics.
//!
//! Malformed rule lines never abort compilation: each one becomes a
//! [`Diagnostic`] and the line is discarded. Callers decide whether a
//! partial forest is acceptable.

use serde::{Deserialize, Serialize};

/// One discarded-or-degraded rule line: where it came from and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Name of the rule document (file path, resource name, etc.).
    pub source: String,
    /// 1-based line number within the document.
    pub line: u32,
    /// Human-readable reason.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(source: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            source: source.into(),
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.source, self.line, self.message)
    }
}
