//! # Error Types for the Netlist Frontend
//!
//! Every variant carries enough structure to render the diagnostic report of
//! [`crate::report`]: a severity, a stable numeric code, and (for everything
//! but whole-program errors) a source position. The frontend is fail-fast:
//! the first error aborts the pipeline.

use crate::lexer::SourcePos;
use crate::report::{Report, Severity};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    // ========== Lexical ==========
    #[error("Unknown character '{ch}' at {pos}")]
    UnknownCharacter { ch: char, pos: SourcePos },

    // ========== Syntax ==========
    #[error("Unexpected token at {pos}. Found: '{found}', expected: {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        pos: SourcePos,
    },

    #[error("Error parsing value '{text}' in base {base} at {pos}")]
    MalformedLiteral {
        text: String,
        base: u32,
        pos: SourcePos,
    },

    #[error("The value '{text}' is too large to fit in a bus of {width} bits at {pos}")]
    LiteralOverflow {
        text: String,
        width: u8,
        pos: SourcePos,
    },

    #[error("The decimal constant '{text}' requires a width specifier at {pos}")]
    MissingWidthSpec { text: String, pos: SourcePos },

    #[error("Bus width {width} at {pos} is out of range; widths must be between 1 and 64")]
    WidthOutOfRange { width: u64, pos: SourcePos },

    #[error("The variable '{name}' has already been marked as input at {prev} (again at {pos})")]
    DuplicateInput {
        name: String,
        pos: SourcePos,
        prev: SourcePos,
    },

    #[error("The variable '{name}' has already been marked as output at {prev} (again at {pos})")]
    DuplicateOutput {
        name: String,
        pos: SourcePos,
        prev: SourcePos,
    },

    #[error("The variable '{name}' has already been declared at {prev} (again at {pos})")]
    DuplicateVariable {
        name: String,
        pos: SourcePos,
        prev: SourcePos,
    },

    #[error("Missing declaration of input '{name}' in the variable section ({pos})")]
    MissingInputDeclaration { name: String, pos: SourcePos },

    #[error("Missing declaration of output '{name}' in the variable section ({pos})")]
    MissingOutputDeclaration { name: String, pos: SourcePos },

    #[error("Undeclared variable '{name}' at {pos}")]
    UndeclaredVariable { name: String, pos: SourcePos },

    #[error("The variable '{name}' already has an equation at {prev} (reassigned at {pos})")]
    Reassignment {
        name: String,
        pos: SourcePos,
        prev: SourcePos,
    },

    #[error("Missing expression for assignment at {pos}")]
    MissingExpression { pos: SourcePos },

    // ========== Type / size ==========
    #[error("The arguments '{lhs}' (bus size {lhs_width}) and '{rhs}' (bus size {rhs_width}) at {pos} should have the same bus size")]
    ArgumentWidthMismatch {
        lhs: String,
        lhs_width: u8,
        rhs: String,
        rhs_width: u8,
        pos: SourcePos,
    },

    #[error("The equation for '{name}' at {pos} has bus size {inferred}, but the variable is declared with bus size {declared}")]
    EquationWidthMismatch {
        name: String,
        declared: u8,
        inferred: u8,
        pos: SourcePos,
    },

    #[error("The argument '{arg}' (bus size {found}) at {pos} should have a bus size of {expected}")]
    ArgumentWidthNotEqual {
        arg: String,
        found: u8,
        expected: u8,
        pos: SourcePos,
    },

    #[error("SELECT index {index} at {pos} is out of range for a bus of {width} bits")]
    SelectOutOfRange {
        index: u64,
        width: u8,
        pos: SourcePos,
    },

    #[error("Invalid SLICE bounds [{first}..{end}] at {pos} on a bus of {width} bits")]
    SliceBounds {
        first: u64,
        end: u64,
        width: u8,
        pos: SourcePos,
    },

    // ========== Semantic ==========
    #[error("The input variable '{name}' cannot be assigned an equation ({pos})")]
    AssignmentToInput { name: String, pos: SourcePos },

    #[error("Declared variable '{name}' ({pos}) does not have an associated equation")]
    MissingEquation { name: String, pos: SourcePos },

    #[error("Combinational cycle detected between variables: {}", .names.join(" -> "))]
    CombinationalCycle { names: Vec<String> },
}

impl CompileError {
    /// Stable numeric diagnostic code.
    pub fn code(&self) -> u32 {
        match self {
            CompileError::UnknownCharacter { .. } => 101,
            CompileError::UnexpectedToken { .. } => 201,
            CompileError::MalformedLiteral { .. } => 202,
            CompileError::LiteralOverflow { .. } => 203,
            CompileError::MissingWidthSpec { .. } => 204,
            CompileError::WidthOutOfRange { .. } => 205,
            CompileError::DuplicateInput { .. } => 206,
            CompileError::DuplicateOutput { .. } => 207,
            CompileError::DuplicateVariable { .. } => 208,
            CompileError::MissingInputDeclaration { .. } => 209,
            CompileError::MissingOutputDeclaration { .. } => 210,
            CompileError::UndeclaredVariable { .. } => 211,
            CompileError::Reassignment { .. } => 212,
            CompileError::MissingExpression { .. } => 213,
            CompileError::ArgumentWidthMismatch { .. } => 301,
            CompileError::EquationWidthMismatch { .. } => 302,
            CompileError::ArgumentWidthNotEqual { .. } => 303,
            CompileError::SelectOutOfRange { .. } => 304,
            CompileError::SliceBounds { .. } => 305,
            CompileError::AssignmentToInput { .. } => 401,
            CompileError::MissingEquation { .. } => 402,
            CompileError::CombinationalCycle { .. } => 403,
        }
    }

    /// Source position of the offending construct, when one exists.
    pub fn position(&self) -> Option<SourcePos> {
        match self {
            CompileError::UnknownCharacter { pos, .. }
            | CompileError::UnexpectedToken { pos, .. }
            | CompileError::MalformedLiteral { pos, .. }
            | CompileError::LiteralOverflow { pos, .. }
            | CompileError::MissingWidthSpec { pos, .. }
            | CompileError::WidthOutOfRange { pos, .. }
            | CompileError::DuplicateInput { pos, .. }
            | CompileError::DuplicateOutput { pos, .. }
            | CompileError::DuplicateVariable { pos, .. }
            | CompileError::MissingInputDeclaration { pos, .. }
            | CompileError::MissingOutputDeclaration { pos, .. }
            | CompileError::UndeclaredVariable { pos, .. }
            | CompileError::Reassignment { pos, .. }
            | CompileError::MissingExpression { pos, .. }
            | CompileError::ArgumentWidthMismatch { pos, .. }
            | CompileError::EquationWidthMismatch { pos, .. }
            | CompileError::ArgumentWidthNotEqual { pos, .. }
            | CompileError::SelectOutOfRange { pos, .. }
            | CompileError::SliceBounds { pos, .. }
            | CompileError::AssignmentToInput { pos, .. }
            | CompileError::MissingEquation { pos, .. } => Some(*pos),
            CompileError::CombinationalCycle { .. } => None,
        }
    }

    fn note(&self) -> Option<String> {
        match self {
            CompileError::MissingWidthSpec { text, .. } => {
                Some(format!("write it as '0d{}:N' where N is the bus size", text))
            }
            CompileError::CombinationalCycle { .. } => Some(
                "break the loop with a REG, which reads the previous cycle's value".to_string(),
            ),
            _ => None,
        }
    }

    /// Structured report handed to the host for rendering.
    pub fn report(&self) -> Report {
        Report {
            severity: Severity::Error,
            code: self.code(),
            position: self.position(),
            message: self.to_string(),
            note: self.note(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = CompileError::UnknownCharacter {
            ch: '$',
            pos: SourcePos { line: 1, column: 2 },
        };
        assert_eq!(err.code(), 101);

        let err = CompileError::CombinationalCycle {
            names: vec!["x".into(), "y".into()],
        };
        assert_eq!(err.code(), 403);
        assert_eq!(err.position(), None);
    }

    #[test]
    fn test_cycle_display_names_participants() {
        let err = CompileError::CombinationalCycle {
            names: vec!["x".into(), "y".into()],
        };
        assert!(err.to_string().contains("x -> y"));
    }

    #[test]
    fn test_report_structure() {
        let err = CompileError::MissingWidthSpec {
            text: "10".into(),
            pos: SourcePos { line: 4, column: 9 },
        };
        let report = err.report();
        assert_eq!(report.severity, Severity::Error);
        assert_eq!(report.code, 204);
        assert_eq!(report.position, Some(SourcePos { line: 4, column: 9 }));
        assert!(report.note.as_deref().unwrap().contains("0d10:N"));
    }
}
