//! Runtime error types for the netlist simulator

use netlist_disassembler::DisassemblerError;
use netlist_spec::SpecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("No value supplied for input bus '{name}'")]
    MissingInput { name: String },

    #[error("Input value {value:#x} for bus '{name}' does not fit in {width} bits")]
    InputOverflow { name: String, width: u8, value: u64 },

    #[error("The ROM block '{name}' has no initial image")]
    MissingRomImage { name: String },

    #[error("Memory image for '{name}' has {found} words, the block holds {expected}")]
    ImageLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Memory image word {index} for '{name}' is {value:#x}, which does not fit in {width} bits")]
    ImageValueOverflow {
        name: String,
        index: usize,
        value: u64,
        width: u8,
    },

    #[error("Offset {offset} is not the start of an instruction")]
    InvalidBreakpoint { offset: usize },

    #[error("A breakpoint is already set at offset {offset}")]
    DuplicateBreakpoint { offset: usize },

    #[error("No breakpoint is set at offset {offset}")]
    UnknownBreakpoint { offset: usize },

    #[error("Decode error: {0}")]
    Decode(#[from] DisassemblerError),

    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),
}

impl RuntimeError {
    /// Stable numeric diagnostic code.
    pub fn code(&self) -> u32 {
        match self {
            RuntimeError::MissingInput { .. } => 501,
            RuntimeError::InputOverflow { .. } => 502,
            RuntimeError::MissingRomImage { .. } => 503,
            RuntimeError::ImageLengthMismatch { .. } => 504,
            RuntimeError::ImageValueOverflow { .. } => 505,
            RuntimeError::InvalidBreakpoint { .. }
            | RuntimeError::DuplicateBreakpoint { .. }
            | RuntimeError::UnknownBreakpoint { .. } => 506,
            RuntimeError::Decode(_) | RuntimeError::Spec(_) => 599,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
