//! Error types for netlist bytecode validation and deserialization

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("Unknown opcode byte {0:#04x}")]
    InvalidOpcode(u8),

    #[error("Malformed instruction word at offset {offset}: upper bits of the opcode word must be zero")]
    MalformedWord { offset: usize },

    #[error("Truncated instruction at offset {offset}: {opcode} needs {expected} words, {available} available")]
    TruncatedInstruction {
        offset: usize,
        opcode: String,
        expected: usize,
        available: usize,
    },

    #[error("Register index {index} out of range (program has {count} registers)")]
    RegisterOutOfRange { index: u32, count: usize },

    #[error("Register {name:?} has width {width}, allowed range is 1 to 64")]
    WidthOutOfRange { name: String, width: u8 },

    #[error("Width mismatch at offset {offset}: operand {operand} has width {found}, expected {expected}")]
    OperandWidthMismatch {
        offset: usize,
        operand: u32,
        expected: u8,
        found: u8,
    },

    #[error("Bit index {index} out of range at offset {offset}: input register has width {width}")]
    BitIndexOutOfRange { offset: usize, index: u8, width: u8 },

    #[error("Invalid slice [{first}..{end}] at offset {offset} on a register of width {width}")]
    InvalidSlice {
        offset: usize,
        first: u8,
        end: u8,
        width: u8,
    },

    #[error("Constant {value:#x} at offset {offset} does not fit in {width} bits")]
    ConstantOverflow {
        offset: usize,
        value: u64,
        width: u8,
    },

    #[error("Memory block index {block} out of range (program has {count} blocks)")]
    MemoryBlockOutOfRange { block: u32, count: usize },

    #[error("Bad magic number {0:#010x} in persisted bytecode")]
    BadMagic(u32),

    #[error("Unsupported bytecode version {0:#010x}")]
    UnsupportedVersion(u32),

    #[error("Persisted bytecode ends unexpectedly at byte {offset}")]
    UnexpectedEof { offset: usize },

    #[error("Persisted register name at byte {offset} is not valid UTF-8")]
    InvalidName { offset: usize },
}

pub type Result<T> = std::result::Result<T, SpecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SpecError::InvalidOpcode(0xFE);
        assert_eq!(err.to_string(), "Unknown opcode byte 0xfe");

        let err = SpecError::RegisterOutOfRange { index: 9, count: 3 };
        assert!(err.to_string().contains("index 9"));
        assert!(err.to_string().contains("3 registers"));
    }

    #[test]
    fn test_result_type() {
        let ok: Result<u32> = Ok(7);
        assert!(ok.is_ok());

        let err: Result<u32> = Err(SpecError::BadMagic(0));
        assert!(err.is_err());
    }
}
