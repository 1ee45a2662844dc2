//! Structured diagnostic reports
//!
//! The contract between the frontend and whatever renders diagnostics: a
//! severity, a stable numeric code, an optional source position, the message,
//! and an optional note with a hint. Rendering (colors, file names, context
//! lines) is the host's business.

use crate::lexer::SourcePos;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One diagnostic, ready for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub severity: Severity,
    pub code: u32,
    pub position: Option<SourcePos>,
    pub message: String,
    pub note: Option<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[E{:03}]", self.severity, self.code)?;
        if let Some(pos) = self.position {
            write!(f, " at {}", pos)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(note) = &self.note {
            write!(f, "\n  note: {}", note)?;
        }
        Ok(())
    }
}
