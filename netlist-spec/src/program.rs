//! Program container for netlist bytecode
//!
//! A [`Program`] bundles the register table, the memory-block table, and the
//! flat word stream. It also implements the persisted binary format (all
//! integers little-endian) and whole-program validation of the bytecode
//! invariants that the writer is contractually required to uphold.

use crate::encoding::imm_from_words;
use crate::error::{Result, SpecError};
use crate::memory::{MemoryInfo, MemoryKind};
use crate::opcode::Opcode;
use crate::register::{RegFlags, RegIndex, RegisterInfo};
use crate::{bus_max_value, MAGIC, MAX_BUS_SIZE, VERSION};
use serde::{Deserialize, Serialize};

/// A compiled netlist program.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub registers: Vec<RegisterInfo>,
    pub memories: Vec<MemoryInfo>,
    pub words: Vec<u32>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of all INPUT-flagged registers, in table order.
    pub fn inputs(&self) -> Vec<RegIndex> {
        self.registers
            .iter()
            .enumerate()
            .filter(|(_, info)| info.is_input())
            .map(|(i, _)| RegIndex(i as u32))
            .collect()
    }

    /// Indices of all OUTPUT-flagged registers, in table order.
    pub fn outputs(&self) -> Vec<RegIndex> {
        self.registers
            .iter()
            .enumerate()
            .filter(|(_, info)| info.is_output())
            .map(|(i, _)| RegIndex(i as u32))
            .collect()
    }

    pub fn has_inputs(&self) -> bool {
        self.registers.iter().any(|info| info.is_input())
    }

    pub fn has_outputs(&self) -> bool {
        self.registers.iter().any(|info| info.is_output())
    }

    /// Display name of a register; unnamed temporaries get `__r{index}`.
    pub fn register_name(&self, reg: RegIndex) -> String {
        let info = &self.registers[reg.index()];
        if info.name.is_empty() {
            format!("__r{}", reg.0)
        } else {
            info.name.clone()
        }
    }

    /// Bus width of a register.
    #[inline]
    pub fn width(&self, reg: RegIndex) -> u8 {
        self.registers[reg.index()].width
    }

    /// Check the bytecode invariants over the whole program.
    ///
    /// Verifies the register and memory tables, instruction framing, operand
    /// register ranges, the width rules of every opcode, and constant fit.
    /// The bytecode writer enforces all of this at emit time; `validate` is
    /// the belt-and-suspenders entry point for bytecode loaded from disk.
    pub fn validate(&self) -> Result<()> {
        for info in &self.registers {
            if info.width == 0 || info.width > MAX_BUS_SIZE {
                return Err(SpecError::WidthOutOfRange {
                    name: info.name.clone(),
                    width: info.width,
                });
            }
        }
        for mem in &self.memories {
            if mem.addr_size == 0 || mem.addr_size > MAX_BUS_SIZE {
                return Err(SpecError::WidthOutOfRange {
                    name: mem.name.clone(),
                    width: mem.addr_size,
                });
            }
            if mem.word_size == 0 || mem.word_size > MAX_BUS_SIZE {
                return Err(SpecError::WidthOutOfRange {
                    name: mem.name.clone(),
                    width: mem.word_size,
                });
            }
        }

        let mut pc = 0;
        while pc < self.words.len() {
            let word = self.words[pc];
            if word >> 8 != 0 {
                return Err(SpecError::MalformedWord { offset: pc });
            }
            let opcode = Opcode::from_u8((word & Opcode::MASK) as u8)
                .ok_or(SpecError::InvalidOpcode((word & Opcode::MASK) as u8))?;
            let len = opcode.word_count();
            if pc + len > self.words.len() {
                return Err(SpecError::TruncatedInstruction {
                    offset: pc,
                    opcode: opcode.to_string(),
                    expected: len,
                    available: self.words.len() - pc,
                });
            }
            self.validate_at(opcode, pc)?;
            pc += len;
        }
        Ok(())
    }

    fn reg_width(&self, word: u32) -> Result<u8> {
        if (word as usize) < self.registers.len() {
            Ok(self.registers[word as usize].width)
        } else {
            Err(SpecError::RegisterOutOfRange {
                index: word,
                count: self.registers.len(),
            })
        }
    }

    fn small_field(&self, offset: usize) -> Result<u8> {
        let word = self.words[offset];
        if word > u8::MAX as u32 {
            return Err(SpecError::MalformedWord { offset });
        }
        Ok(word as u8)
    }

    fn validate_at(&self, opcode: Opcode, pc: usize) -> Result<()> {
        let w = &self.words;
        match opcode {
            Opcode::Nop | Opcode::Break => {}
            Opcode::Const => {
                let dst = self.reg_width(w[pc + 1])?;
                let value = imm_from_words(w[pc + 2], w[pc + 3]);
                if value > bus_max_value(dst) {
                    return Err(SpecError::ConstantOverflow {
                        offset: pc,
                        value,
                        width: dst,
                    });
                }
            }
            Opcode::Not | Opcode::Reg => {
                let dst = self.reg_width(w[pc + 1])?;
                let src = self.reg_width(w[pc + 2])?;
                if dst != src {
                    return Err(SpecError::OperandWidthMismatch {
                        offset: pc,
                        operand: w[pc + 2],
                        expected: dst,
                        found: src,
                    });
                }
            }
            Opcode::And | Opcode::Or | Opcode::Nand | Opcode::Nor | Opcode::Xor | Opcode::Xnor => {
                let dst = self.reg_width(w[pc + 1])?;
                for operand in [w[pc + 2], w[pc + 3]] {
                    let width = self.reg_width(operand)?;
                    if width != dst {
                        return Err(SpecError::OperandWidthMismatch {
                            offset: pc,
                            operand,
                            expected: dst,
                            found: width,
                        });
                    }
                }
            }
            Opcode::Concat => {
                let dst = self.reg_width(w[pc + 1])?;
                let lhs = self.reg_width(w[pc + 2])?;
                let rhs = self.reg_width(w[pc + 3])?;
                if dst as u16 != lhs as u16 + rhs as u16 {
                    return Err(SpecError::OperandWidthMismatch {
                        offset: pc,
                        operand: w[pc + 3],
                        expected: dst,
                        found: lhs.saturating_add(rhs),
                    });
                }
            }
            Opcode::Select => {
                let dst = self.reg_width(w[pc + 1])?;
                let src = self.reg_width(w[pc + 2])?;
                let bit = self.small_field(pc + 3)?;
                if dst != 1 {
                    return Err(SpecError::OperandWidthMismatch {
                        offset: pc,
                        operand: w[pc + 1],
                        expected: 1,
                        found: dst,
                    });
                }
                if bit >= src {
                    return Err(SpecError::BitIndexOutOfRange {
                        offset: pc,
                        index: bit,
                        width: src,
                    });
                }
            }
            Opcode::Slice => {
                let dst = self.reg_width(w[pc + 1])?;
                let src = self.reg_width(w[pc + 2])?;
                let first = self.small_field(pc + 3)?;
                let end = self.small_field(pc + 4)?;
                if first > end || end >= src {
                    return Err(SpecError::InvalidSlice {
                        offset: pc,
                        first,
                        end,
                        width: src,
                    });
                }
                if dst != end - first + 1 {
                    return Err(SpecError::OperandWidthMismatch {
                        offset: pc,
                        operand: w[pc + 1],
                        expected: end - first + 1,
                        found: dst,
                    });
                }
            }
            Opcode::Mux => {
                let dst = self.reg_width(w[pc + 1])?;
                let choice = self.reg_width(w[pc + 2])?;
                if choice != 1 {
                    return Err(SpecError::OperandWidthMismatch {
                        offset: pc,
                        operand: w[pc + 2],
                        expected: 1,
                        found: choice,
                    });
                }
                for operand in [w[pc + 3], w[pc + 4]] {
                    let width = self.reg_width(operand)?;
                    if width != dst {
                        return Err(SpecError::OperandWidthMismatch {
                            offset: pc,
                            operand,
                            expected: dst,
                            found: width,
                        });
                    }
                }
            }
            Opcode::Rom => {
                let mem = self.memory_at(pc, w[pc + 2])?;
                let (addr_size, word_size) = (mem.addr_size, mem.word_size);
                self.check_width(pc, w[pc + 1], word_size)?;
                self.check_width(pc, w[pc + 3], addr_size)?;
            }
            Opcode::Ram => {
                let mem = self.memory_at(pc, w[pc + 2])?;
                let (addr_size, word_size) = (mem.addr_size, mem.word_size);
                self.check_width(pc, w[pc + 1], word_size)?;
                self.check_width(pc, w[pc + 3], addr_size)?;
                self.check_width(pc, w[pc + 4], 1)?;
                self.check_width(pc, w[pc + 5], addr_size)?;
                self.check_width(pc, w[pc + 6], word_size)?;
            }
        }
        Ok(())
    }

    fn memory_at(&self, _pc: usize, block: u32) -> Result<&MemoryInfo> {
        self.memories
            .get(block as usize)
            .ok_or(SpecError::MemoryBlockOutOfRange {
                block,
                count: self.memories.len(),
            })
    }

    fn check_width(&self, pc: usize, operand: u32, expected: u8) -> Result<()> {
        let found = self.reg_width(operand)?;
        if found != expected {
            return Err(SpecError::OperandWidthMismatch {
                offset: pc,
                operand,
                expected,
                found,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Persisted format
    // ========================================================================

    /// Serialize to the persisted binary format.
    ///
    /// Layout: magic, version, register table, memory table, word count, raw
    /// word stream. All integers little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());

        out.extend_from_slice(&(self.registers.len() as u32).to_le_bytes());
        for info in &self.registers {
            out.push(info.width);
            out.push(info.flags.bits());
            out.extend_from_slice(&(info.name.len() as u32).to_le_bytes());
            out.extend_from_slice(info.name.as_bytes());
        }

        out.extend_from_slice(&(self.memories.len() as u32).to_le_bytes());
        for mem in &self.memories {
            out.push(match mem.kind {
                MemoryKind::Rom => 0,
                MemoryKind::Ram => 1,
            });
            out.push(mem.addr_size);
            out.push(mem.word_size);
            out.extend_from_slice(&(mem.name.len() as u32).to_le_bytes());
            out.extend_from_slice(mem.name.as_bytes());
        }

        out.extend_from_slice(&(self.words.len() as u32).to_le_bytes());
        for &word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Deserialize from the persisted binary format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };

        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(SpecError::BadMagic(magic));
        }
        let version = reader.u32()?;
        if version != VERSION {
            return Err(SpecError::UnsupportedVersion(version));
        }

        let n_registers = reader.u32()? as usize;
        let mut registers = Vec::with_capacity(n_registers);
        for _ in 0..n_registers {
            let width = reader.u8()?;
            let flags = RegFlags::from_bits(reader.u8()?);
            let name = reader.string()?;
            registers.push(RegisterInfo { name, width, flags });
        }

        let n_memories = reader.u32()? as usize;
        let mut memories = Vec::with_capacity(n_memories);
        for _ in 0..n_memories {
            let kind = match reader.u8()? {
                0 => MemoryKind::Rom,
                _ => MemoryKind::Ram,
            };
            let addr_size = reader.u8()?;
            let word_size = reader.u8()?;
            let name = reader.string()?;
            memories.push(MemoryInfo {
                name,
                kind,
                addr_size,
                word_size,
            });
        }

        let n_words = reader.u32()? as usize;
        let mut words = Vec::with_capacity(n_words);
        for _ in 0..n_words {
            words.push(reader.u32()?);
        }

        Ok(Program {
            registers,
            memories,
            words,
        })
    }

    /// SHA-256 hash of the persisted encoding; stable program identity.
    pub fn hash(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(SpecError::UnexpectedEof { offset: self.pos });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let slice = self.take(4)?;
        Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let offset = self.pos;
        let slice = self.take(len)?;
        String::from_utf8(slice.to_vec()).map_err(|_| SpecError::InvalidName { offset })
    }
}
