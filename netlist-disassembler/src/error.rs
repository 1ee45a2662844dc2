//! Error types for netlist bytecode decoding

use netlist_spec::SpecError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisassemblerError {
    #[error("Unknown opcode byte {0:#04x}")]
    UnknownOpcode(u8),

    #[error("Invalid encoding at word {offset}: {reason}")]
    InvalidEncoding { offset: usize, reason: String },

    #[error("Truncated instruction at word {offset}: {opcode} needs {expected} words, {available} available")]
    Truncated {
        offset: usize,
        opcode: String,
        expected: usize,
        available: usize,
    },

    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;
