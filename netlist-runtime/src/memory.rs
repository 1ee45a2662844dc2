//! Memory-block storage for the simulator
//!
//! One dense word array per ROM/RAM instruction, built from the program's
//! memory table and the host-supplied initial images (keyed by the defining
//! variable's name). A missing ROM image is fatal; a missing RAM image is a
//! warning and the block starts zeroed.

use crate::error::{Result, RuntimeError};
use netlist_spec::{bus_max_value, MemoryKind, Program};
use std::collections::HashMap;

/// Initial memory contents, keyed by the ROM/RAM variable name.
pub type MemoryImages = HashMap<String, Vec<u64>>;

#[derive(Debug, Clone)]
pub struct MemoryBlocks {
    blocks: Vec<Vec<u64>>,
}

impl MemoryBlocks {
    /// Build all blocks of `program`, filling them from `images`.
    pub fn from_images(program: &Program, images: &MemoryImages) -> Result<Self> {
        let mut blocks = Vec::with_capacity(program.memories.len());

        for mem in &program.memories {
            match images.get(&mem.name) {
                Some(image) => {
                    if image.len() != mem.len() {
                        return Err(RuntimeError::ImageLengthMismatch {
                            name: mem.name.clone(),
                            expected: mem.len(),
                            found: image.len(),
                        });
                    }
                    for (index, &value) in image.iter().enumerate() {
                        if value > bus_max_value(mem.word_size) {
                            return Err(RuntimeError::ImageValueOverflow {
                                name: mem.name.clone(),
                                index,
                                value,
                                width: mem.word_size,
                            });
                        }
                    }
                    blocks.push(image.clone());
                }
                None => match mem.kind {
                    MemoryKind::Rom => {
                        return Err(RuntimeError::MissingRomImage {
                            name: mem.name.clone(),
                        })
                    }
                    MemoryKind::Ram => {
                        tracing::warn!(
                            "RAM block '{}' has no initial image, starting zeroed",
                            mem.name
                        );
                        blocks.push(vec![0; mem.len()]);
                    }
                },
            }
        }

        for name in images.keys() {
            if !program.memories.iter().any(|mem| &mem.name == name) {
                tracing::warn!("memory image '{}' does not match any ROM or RAM block", name);
            }
        }

        Ok(Self { blocks })
    }

    #[inline]
    pub fn read(&self, block: u32, addr: usize) -> u64 {
        self.blocks[block as usize][addr]
    }

    #[inline]
    pub fn write(&mut self, block: u32, addr: usize, value: u64) {
        self.blocks[block as usize][addr] = value;
    }
}
