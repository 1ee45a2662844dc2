//! Word-level breakpoints
//!
//! A breakpoint patches the first word of an instruction with the encoded
//! `BREAK` opcode and remembers the original word. The interpreter halts the
//! cycle when it fetches `BREAK`, leaving the program counter at the patched
//! offset; stepping restores the word, executes the real instruction, and
//! re-arms (unless the breakpoint is oneshot).

use netlist_spec::encoding::BREAK_WORD;

#[derive(Debug, Clone)]
pub struct Breakpoint {
    /// Word offset of the patched instruction
    pub offset: usize,
    /// Remove instead of re-arming after the first hit
    pub oneshot: bool,
    saved_word: u32,
}

impl Breakpoint {
    pub fn new(offset: usize, oneshot: bool) -> Self {
        Self {
            offset,
            oneshot,
            saved_word: 0,
        }
    }

    /// Patch the word stream, saving the original word.
    pub fn activate(&mut self, words: &mut [u32]) {
        self.saved_word = words[self.offset];
        words[self.offset] = BREAK_WORD;
    }

    /// Restore the original word.
    pub fn deactivate(&self, words: &mut [u32]) {
        words[self.offset] = self.saved_word;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlist_spec::Opcode;

    #[test]
    fn test_activate_deactivate() {
        let mut words = vec![Opcode::Not.to_u8() as u32, 1, 0];
        let mut bp = Breakpoint::new(0, false);

        bp.activate(&mut words);
        assert_eq!(words[0], BREAK_WORD);

        bp.deactivate(&mut words);
        assert_eq!(words[0], Opcode::Not.to_u8() as u32);
        assert_eq!(words[1..], [1, 0]);
    }
}
