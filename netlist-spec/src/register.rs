//! Register table entries for netlist bytecode
//!
//! A register is a named bus of 1 to 64 bits, identified by a dense index.
//! Source-level variables and compiler-introduced constant temporaries both
//! become registers; the flags record whether a register is wired to the
//! outside world.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Dense register index.
///
/// At most [`RegIndex::MAX_INDEX`] (24 significant bits) so an index always
/// fits one encoding word with room to spare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegIndex(pub u32);

impl RegIndex {
    /// Largest representable register index
    pub const MAX_INDEX: u32 = (1 << 24) - 1;

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Register flags: `INPUT` and `OUTPUT`, non-exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegFlags(u8);

impl RegFlags {
    pub const NONE: RegFlags = RegFlags(0);
    /// Register is fed by the external input provider each cycle
    pub const INPUT: RegFlags = RegFlags(1);
    /// Register value is observable after each cycle
    pub const OUTPUT: RegFlags = RegFlags(1 << 1);

    #[inline]
    pub const fn contains(self, other: RegFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reconstruct from a persisted byte; unknown bits are dropped.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        RegFlags(bits & 0b11)
    }
}

impl BitOr for RegFlags {
    type Output = RegFlags;

    fn bitor(self, rhs: RegFlags) -> RegFlags {
        RegFlags(self.0 | rhs.0)
    }
}

/// Register table entry: name, bus width, and I/O flags.
///
/// Compiler-introduced temporaries carry an empty name; display code falls
/// back to `__r{index}` for those.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterInfo {
    pub name: String,
    pub width: u8,
    pub flags: RegFlags,
}

impl RegisterInfo {
    pub fn new(name: impl Into<String>, width: u8, flags: RegFlags) -> Self {
        Self {
            name: name.into(),
            width,
            flags,
        }
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        self.flags.contains(RegFlags::INPUT)
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        self.flags.contains(RegFlags::OUTPUT)
    }
}
