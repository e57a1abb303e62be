//! Diagnostic records and the context-resident log buffer.
//!
//! The frontend never throws on malformed source. Every problem found during
//! lexing, parsing, symbol entry, or attribution becomes a [`Diagnostic`]
//! buffered in the owning context's [`DiagnosticLog`]; the embedding pipeline
//! decides where (and whether) the buffer is routed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// One frontend diagnostic: severity, message, optional source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Display path of the originating unit, when known.
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn error(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            file: Some(file.to_owned()),
            line: Some(line),
        }
    }

    pub fn warning(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            file: Some(file.to_owned()),
            line: Some(line),
        }
    }

    /// A diagnostic with no source position (resolver problems, batch-level
    /// conditions).
    pub fn bare(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            file: None,
            line: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}:{}: {}: {}", file, line, self.severity, self.message)
            }
            (Some(file), None) => write!(f, "{}: {}: {}", file, self.severity, self.message),
            _ => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Append-only buffer of diagnostics owned by a compiler context.
///
/// Must be empty immediately after context construction and after every
/// successful reset.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        DiagnosticLog::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.entries.push(diag);
    }

    pub fn error(&mut self, file: &str, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::error(file, line, message));
    }

    pub fn warning(&mut self, file: &str, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::warning(file, line, message));
    }

    /// Remove and return everything buffered so far.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
