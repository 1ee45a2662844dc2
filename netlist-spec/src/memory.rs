//! Memory-block table entries for netlist bytecode
//!
//! Each `ROM` or `RAM` instruction owns exactly one memory block: a dense
//! array of `2^addr_size` words, each `word_size` bits wide. Blocks are named
//! after the variable whose equation created them so the host can key initial
//! memory images by variable name.

use serde::{Deserialize, Serialize};

/// Kind of a memory block: read-only or read-write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryKind {
    Rom,
    Ram,
}

/// Memory-block table entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// Name of the variable defined by the owning ROM/RAM instruction
    pub name: String,
    pub kind: MemoryKind,
    /// Address bus width in bits; the block holds `2^addr_size` words
    pub addr_size: u8,
    /// Width of each stored word in bits
    pub word_size: u8,
}

impl MemoryInfo {
    pub fn new(name: impl Into<String>, kind: MemoryKind, addr_size: u8, word_size: u8) -> Self {
        Self {
            name: name.into(),
            kind,
            addr_size,
            word_size,
        }
    }

    /// Number of words in the block.
    #[inline]
    pub fn len(&self) -> usize {
        1usize << self.addr_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false // addr_size >= 1, so a block always holds at least two words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_len() {
        let rom = MemoryInfo::new("table", MemoryKind::Rom, 4, 8);
        assert_eq!(rom.len(), 16);

        let ram = MemoryInfo::new("cells", MemoryKind::Ram, 1, 1);
        assert_eq!(ram.len(), 2);
    }

    #[test]
    fn test_kind() {
        let rom = MemoryInfo::new("t", MemoryKind::Rom, 2, 4);
        assert_eq!(rom.kind, MemoryKind::Rom);
        assert_ne!(rom.kind, MemoryKind::Ram);
    }
}
