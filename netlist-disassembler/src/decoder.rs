//! Instruction decoder for netlist bytecode
//!
//! The inverse of the encoder in `netlist-spec`: reads one instruction from
//! the word stream at a given offset. The opcode in the low byte of the first
//! word determines the length; every operand sits in its own following word.

use crate::error::{DisassemblerError, Result};
use netlist_spec::encoding::imm_from_words;
use netlist_spec::{Instruction, Opcode, RegIndex};

/// Decode the instruction starting at word offset `pc`.
///
/// Returns the instruction and its length in words, so callers can walk the
/// stream by repeated calls.
pub fn decode_at(words: &[u32], pc: usize) -> Result<(Instruction, usize)> {
    let word = words[pc];
    if word >> 8 != 0 {
        return Err(DisassemblerError::InvalidEncoding {
            offset: pc,
            reason: "upper bits of the opcode word must be zero".to_string(),
        });
    }
    let opcode = Opcode::from_u8((word & Opcode::MASK) as u8)
        .ok_or(DisassemblerError::UnknownOpcode((word & Opcode::MASK) as u8))?;

    let len = opcode.word_count();
    if pc + len > words.len() {
        return Err(DisassemblerError::Truncated {
            offset: pc,
            opcode: opcode.to_string(),
            expected: len,
            available: words.len() - pc,
        });
    }

    let reg = |offset: usize| -> Result<RegIndex> {
        let value = words[offset];
        if value > RegIndex::MAX_INDEX {
            return Err(DisassemblerError::InvalidEncoding {
                offset,
                reason: format!("register index {:#x} exceeds 24 bits", value),
            });
        }
        Ok(RegIndex(value))
    };
    let small = |offset: usize| -> Result<u8> {
        let value = words[offset];
        if value > u8::MAX as u32 {
            return Err(DisassemblerError::InvalidEncoding {
                offset,
                reason: format!("field {:#x} exceeds 8 bits", value),
            });
        }
        Ok(value as u8)
    };

    let inst = match opcode {
        Opcode::Nop => Instruction::Nop,
        Opcode::Break => Instruction::Break,
        Opcode::Const => Instruction::Const {
            dst: reg(pc + 1)?,
            value: imm_from_words(words[pc + 2], words[pc + 3]),
        },
        Opcode::Not => Instruction::Not {
            dst: reg(pc + 1)?,
            src: reg(pc + 2)?,
        },
        Opcode::And => Instruction::And {
            dst: reg(pc + 1)?,
            lhs: reg(pc + 2)?,
            rhs: reg(pc + 3)?,
        },
        Opcode::Or => Instruction::Or {
            dst: reg(pc + 1)?,
            lhs: reg(pc + 2)?,
            rhs: reg(pc + 3)?,
        },
        Opcode::Nand => Instruction::Nand {
            dst: reg(pc + 1)?,
            lhs: reg(pc + 2)?,
            rhs: reg(pc + 3)?,
        },
        Opcode::Nor => Instruction::Nor {
            dst: reg(pc + 1)?,
            lhs: reg(pc + 2)?,
            rhs: reg(pc + 3)?,
        },
        Opcode::Xor => Instruction::Xor {
            dst: reg(pc + 1)?,
            lhs: reg(pc + 2)?,
            rhs: reg(pc + 3)?,
        },
        Opcode::Xnor => Instruction::Xnor {
            dst: reg(pc + 1)?,
            lhs: reg(pc + 2)?,
            rhs: reg(pc + 3)?,
        },
        Opcode::Concat => Instruction::Concat {
            dst: reg(pc + 1)?,
            lhs: reg(pc + 2)?,
            rhs: reg(pc + 3)?,
        },
        Opcode::Select => Instruction::Select {
            dst: reg(pc + 1)?,
            src: reg(pc + 2)?,
            bit: small(pc + 3)?,
        },
        Opcode::Slice => Instruction::Slice {
            dst: reg(pc + 1)?,
            src: reg(pc + 2)?,
            first: small(pc + 3)?,
            end: small(pc + 4)?,
        },
        Opcode::Mux => Instruction::Mux {
            dst: reg(pc + 1)?,
            choice: reg(pc + 2)?,
            a: reg(pc + 3)?,
            b: reg(pc + 4)?,
        },
        Opcode::Reg => Instruction::Reg {
            dst: reg(pc + 1)?,
            src: reg(pc + 2)?,
        },
        Opcode::Rom => Instruction::Rom {
            dst: reg(pc + 1)?,
            block: words[pc + 2],
            read_addr: reg(pc + 3)?,
        },
        Opcode::Ram => Instruction::Ram {
            dst: reg(pc + 1)?,
            block: words[pc + 2],
            read_addr: reg(pc + 3)?,
            write_enable: reg(pc + 4)?,
            write_addr: reg(pc + 5)?,
            write_data: reg(pc + 6)?,
        },
    };

    Ok((inst, len))
}

/// Decode a whole word stream into `(offset, instruction)` pairs.
pub fn decode_all(words: &[u32]) -> Result<Vec<(usize, Instruction)>> {
    let mut decoded = Vec::new();
    let mut pc = 0;
    while pc < words.len() {
        let (inst, len) = decode_at(words, pc)?;
        decoded.push((pc, inst));
        pc += len;
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlist_spec::encoding::encode_all;

    #[test]
    fn test_decode_roundtrip() {
        let instructions = vec![
            Instruction::Const {
                dst: RegIndex(0),
                value: 0xDEAD_BEEF_CAFE_F00D,
            },
            Instruction::Xor {
                dst: RegIndex(1),
                lhs: RegIndex(0),
                rhs: RegIndex(2),
            },
            Instruction::Slice {
                dst: RegIndex(3),
                src: RegIndex(1),
                first: 2,
                end: 6,
            },
            Instruction::Mux {
                dst: RegIndex(4),
                choice: RegIndex(3),
                a: RegIndex(1),
                b: RegIndex(2),
            },
            Instruction::Ram {
                dst: RegIndex(5),
                block: 0,
                read_addr: RegIndex(0),
                write_enable: RegIndex(3),
                write_addr: RegIndex(0),
                write_data: RegIndex(5),
            },
            Instruction::Nop,
        ];
        let words = encode_all(&instructions);
        let decoded = decode_all(&words).unwrap();
        let recovered: Vec<Instruction> = decoded.iter().map(|(_, inst)| *inst).collect();
        assert_eq!(recovered, instructions);
    }

    #[test]
    fn test_decode_reports_offsets() {
        let instructions = vec![
            Instruction::Nop,
            Instruction::Not {
                dst: RegIndex(0),
                src: RegIndex(1),
            },
            Instruction::Break,
        ];
        let words = encode_all(&instructions);
        let decoded = decode_all(&words).unwrap();
        assert_eq!(decoded[0].0, 0);
        assert_eq!(decoded[1].0, 1);
        assert_eq!(decoded[2].0, 4);
    }

    #[test]
    fn test_unknown_opcode() {
        let err = decode_at(&[0xFE], 0).unwrap_err();
        assert_eq!(err, DisassemblerError::UnknownOpcode(0xFE));
    }

    #[test]
    fn test_dirty_opcode_word_rejected() {
        let err = decode_at(&[0x0100_0003, 0, 0], 0).unwrap_err();
        assert!(matches!(err, DisassemblerError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_truncated_stream() {
        let words = vec![Opcode::Ram.to_u8() as u32, 1, 0];
        let err = decode_at(&words, 0).unwrap_err();
        assert!(matches!(
            err,
            DisassemblerError::Truncated {
                expected: 7,
                available: 3,
                ..
            }
        ));
    }
}
