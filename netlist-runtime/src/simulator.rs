//! The bytecode interpreter
//!
//! One [`Simulator::cycle`] call is one clock tick of the simulated circuit:
//!
//! 1. the current register values are snapshotted into `prev`,
//! 2. the input registers take the host-supplied values,
//! 3. the word stream executes linearly from offset 0,
//! 4. the RAM writes queued during execution are committed.
//!
//! `REG` always reads the `prev` snapshot and `RAM` reads the start-of-cycle
//! memory, so evaluation order inside a cycle can never be observed. Every
//! register write is masked to its bus width, keeping stored values
//! canonical. Execution suspends mid-cycle only at a `BREAK` patched in by a
//! breakpoint; [`Simulator::step`] and [`Simulator::resume`] continue from
//! there.

use crate::breakpoint::Breakpoint;
use crate::error::{Result, RuntimeError};
use crate::io::{CycleInputs, InputFeed};
use crate::memory::{MemoryBlocks, MemoryImages};
use netlist_disassembler::{decode_all, decode_at};
use netlist_spec::{bus_mask, Instruction, Program, RegIndex};

#[cfg(feature = "pedantic")]
macro_rules! pedantic_assert {
    ($($arg:tt)*) => { assert!($($arg)*) };
}
#[cfg(not(feature = "pedantic"))]
macro_rules! pedantic_assert {
    ($($arg:tt)*) => {};
}

/// Simulator configuration.
#[derive(Debug, Clone, Default)]
pub struct SimulatorConfig {
    /// Log every executed instruction at debug level
    pub trace: bool,
}

/// Where a cycle stands after `cycle`, `step`, or `resume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Mid-cycle, more instructions to run (only returned by `step`)
    Running,
    /// Suspended at a breakpoint; the cycle is not finished
    AtBreakpoint,
    /// The cycle ran to the end and RAM writes are committed
    Completed,
}

/// A RAM write queued during step 3, committed in step 4.
///
/// The operand registers are recorded rather than their values: the write
/// decision uses end-of-cycle values, however the instructions were ordered.
#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    block: u32,
    write_enable: RegIndex,
    write_addr: RegIndex,
    write_data: RegIndex,
}

pub struct Simulator {
    program: Program,
    /// Cached register widths, indexed like `regs`
    widths: Vec<u8>,
    /// Word offsets of instruction starts, for breakpoint validation
    starts: Vec<usize>,
    regs: Vec<u64>,
    prev: Vec<u64>,
    mem: MemoryBlocks,
    pc: usize,
    in_cycle: bool,
    at_breakpoint: bool,
    breakpoints: Vec<Breakpoint>,
    pending: Vec<PendingWrite>,
    cycles: u64,
    config: SimulatorConfig,
}

impl Simulator {
    /// Build a simulator for a validated program and its memory images.
    pub fn new(program: Program, images: &MemoryImages, config: SimulatorConfig) -> Result<Self> {
        program.validate()?;
        let mem = MemoryBlocks::from_images(&program, images)?;
        let widths: Vec<u8> = program.registers.iter().map(|info| info.width).collect();
        let starts: Vec<usize> = decode_all(&program.words)?
            .iter()
            .map(|(offset, _)| *offset)
            .collect();
        let count = program.registers.len();

        Ok(Self {
            program,
            widths,
            starts,
            regs: vec![0; count],
            prev: vec![0; count],
            mem,
            pc: 0,
            in_cycle: false,
            at_breakpoint: false,
            breakpoints: Vec::new(),
            pending: Vec::new(),
            cycles: 0,
            config,
        })
    }

    // ========================================================================
    // The simulator API
    // ========================================================================

    /// Simulate one clock cycle.
    ///
    /// Returns [`CycleState::AtBreakpoint`] if execution stopped at a
    /// breakpoint; continue with [`Simulator::step`] or
    /// [`Simulator::resume`]. Must not be called while a cycle is suspended.
    pub fn cycle(&mut self, inputs: &CycleInputs) -> Result<CycleState> {
        assert!(!self.in_cycle, "cycle() called while a cycle is suspended");
        self.begin_cycle(inputs)?;
        self.run_to_stop()
    }

    /// Run `cycles` ticks, pulling inputs from `feed`.
    ///
    /// Breakpoints that fire are stepped through, so the observable behavior
    /// matches a run without breakpoints. Returns the per-cycle outputs.
    pub fn run(
        &mut self,
        feed: &mut dyn InputFeed,
        cycles: u64,
    ) -> Result<Vec<Vec<(String, u64)>>> {
        let mut all_outputs = Vec::with_capacity(cycles as usize);
        for _ in 0..cycles {
            let frame = feed.next_frame();
            let mut state = self.cycle(&frame)?;
            while state == CycleState::AtBreakpoint {
                state = self.resume()?;
            }
            all_outputs.push(self.outputs());
        }
        Ok(all_outputs)
    }

    /// Continue a suspended cycle to completion or to the next breakpoint.
    pub fn resume(&mut self) -> Result<CycleState> {
        assert!(self.in_cycle, "resume() called outside a cycle");
        if self.at_breakpoint {
            self.step_over_breakpoint()?;
            if self.pc >= self.program.words.len() {
                self.finish_cycle();
                return Ok(CycleState::Completed);
            }
        }
        self.run_to_stop()
    }

    /// Execute exactly one instruction of a suspended cycle.
    pub fn step(&mut self) -> Result<CycleState> {
        assert!(self.in_cycle, "step() called outside a cycle");
        if self.at_breakpoint {
            self.step_over_breakpoint()?;
        } else if !self.exec_one()? {
            return Ok(CycleState::AtBreakpoint);
        }
        if self.pc >= self.program.words.len() {
            self.finish_cycle();
            return Ok(CycleState::Completed);
        }
        Ok(CycleState::Running)
    }

    // ========================================================================
    // The debugger API
    // ========================================================================

    /// Arm a breakpoint at an instruction-start word offset.
    pub fn add_breakpoint(&mut self, offset: usize, oneshot: bool) -> Result<()> {
        if self.starts.binary_search(&offset).is_err() {
            return Err(RuntimeError::InvalidBreakpoint { offset });
        }
        if self.find_breakpoint(offset).is_some() {
            return Err(RuntimeError::DuplicateBreakpoint { offset });
        }
        let mut breakpoint = Breakpoint::new(offset, oneshot);
        breakpoint.activate(&mut self.program.words);
        self.breakpoints.push(breakpoint);
        Ok(())
    }

    /// Disarm and forget the breakpoint at `offset`.
    pub fn remove_breakpoint(&mut self, offset: usize) -> Result<()> {
        let index = self
            .find_breakpoint(offset)
            .ok_or(RuntimeError::UnknownBreakpoint { offset })?;
        self.breakpoints[index].deactivate(&mut self.program.words);
        self.breakpoints.remove(index);
        if self.at_breakpoint && self.pc == offset {
            self.at_breakpoint = false;
        }
        Ok(())
    }

    /// Linear scan; the breakpoint count is assumed small.
    fn find_breakpoint(&self, offset: usize) -> Option<usize> {
        self.breakpoints.iter().position(|bp| bp.offset == offset)
    }

    pub fn at_breakpoint(&self) -> bool {
        self.at_breakpoint
    }

    /// Word offset the interpreter is suspended at.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn register_count(&self) -> usize {
        self.regs.len()
    }

    /// Current value of a register (always masked to its width).
    pub fn register(&self, reg: RegIndex) -> u64 {
        self.regs[reg.index()]
    }

    /// Current value of a register looked up by name.
    pub fn register_by_name(&self, name: &str) -> Option<u64> {
        self.program
            .registers
            .iter()
            .position(|info| info.name == name)
            .map(|index| self.regs[index])
    }

    /// `(name, value)` of every OUTPUT register, in table order.
    pub fn outputs(&self) -> Vec<(String, u64)> {
        self.program
            .registers
            .iter()
            .enumerate()
            .filter(|(_, info)| info.is_output())
            .map(|(index, info)| (info.name.clone(), self.regs[index]))
            .collect()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    // ========================================================================
    // Cycle internals
    // ========================================================================

    fn begin_cycle(&mut self, inputs: &CycleInputs) -> Result<()> {
        self.prev.copy_from_slice(&self.regs);
        self.pending.clear();

        for (index, info) in self.program.registers.iter().enumerate() {
            if !info.is_input() {
                continue;
            }
            let value = *inputs
                .get(&info.name)
                .ok_or_else(|| RuntimeError::MissingInput {
                    name: info.name.clone(),
                })?;
            if value > bus_mask(info.width) {
                return Err(RuntimeError::InputOverflow {
                    name: info.name.clone(),
                    width: info.width,
                    value,
                });
            }
            self.regs[index] = value;
        }

        self.pc = 0;
        self.in_cycle = true;
        Ok(())
    }

    fn run_to_stop(&mut self) -> Result<CycleState> {
        while self.pc < self.program.words.len() {
            if !self.exec_one()? {
                return Ok(CycleState::AtBreakpoint);
            }
        }
        self.finish_cycle();
        Ok(CycleState::Completed)
    }

    /// Execute the instruction at `pc`. Returns false when fetching `BREAK`,
    /// leaving `pc` at the patched offset.
    fn exec_one(&mut self) -> Result<bool> {
        let (inst, len) = decode_at(&self.program.words, self.pc)?;
        if matches!(inst, Instruction::Break) {
            self.at_breakpoint = true;
            return Ok(false);
        }
        if self.config.trace {
            tracing::debug!("[{:6}] pc={:4} {:?}", self.cycles, self.pc, inst);
        }
        self.apply(inst);
        self.pc += len;
        Ok(true)
    }

    /// Temporarily restore the patched word, execute the real instruction,
    /// then re-arm (or drop a oneshot breakpoint).
    fn step_over_breakpoint(&mut self) -> Result<()> {
        let index = self
            .find_breakpoint(self.pc)
            .expect("BREAK opcode without a matching breakpoint record");

        self.breakpoints[index].deactivate(&mut self.program.words);
        self.at_breakpoint = false;
        let executed = self.exec_one()?;
        debug_assert!(executed, "restored instruction cannot be BREAK");

        if self.breakpoints[index].oneshot {
            self.breakpoints.remove(index);
        } else {
            self.breakpoints[index].activate(&mut self.program.words);
        }
        Ok(())
    }

    fn finish_cycle(&mut self) {
        for write in std::mem::take(&mut self.pending) {
            if self.regs[write.write_enable.index()] & 1 == 1 {
                let addr = self.regs[write.write_addr.index()] as usize;
                let value = self.regs[write.write_data.index()];
                self.mem.write(write.block, addr, value);
            }
        }
        self.in_cycle = false;
        self.cycles += 1;
    }

    #[inline]
    fn get(&self, reg: RegIndex) -> u64 {
        self.regs[reg.index()]
    }

    /// Masked register write; keeps P1 (`regs[r] < 2^width(r)`) invariant.
    #[inline]
    fn set(&mut self, reg: RegIndex, value: u64) {
        self.regs[reg.index()] = value & bus_mask(self.widths[reg.index()]);
    }

    fn apply(&mut self, inst: Instruction) {
        match inst {
            Instruction::Nop | Instruction::Break => {}
            Instruction::Const { dst, value } => self.set(dst, value),
            Instruction::Not { dst, src } => {
                pedantic_assert!(self.widths[dst.index()] == self.widths[src.index()]);
                self.set(dst, !self.get(src));
            }
            Instruction::And { dst, lhs, rhs } => self.set(dst, self.get(lhs) & self.get(rhs)),
            Instruction::Or { dst, lhs, rhs } => self.set(dst, self.get(lhs) | self.get(rhs)),
            Instruction::Nand { dst, lhs, rhs } => self.set(dst, !(self.get(lhs) & self.get(rhs))),
            Instruction::Nor { dst, lhs, rhs } => self.set(dst, !(self.get(lhs) | self.get(rhs))),
            Instruction::Xor { dst, lhs, rhs } => self.set(dst, self.get(lhs) ^ self.get(rhs)),
            Instruction::Xnor { dst, lhs, rhs } => self.set(dst, !(self.get(lhs) ^ self.get(rhs))),
            Instruction::Concat { dst, lhs, rhs } => {
                pedantic_assert!(
                    self.widths[dst.index()] as u16
                        == self.widths[lhs.index()] as u16 + self.widths[rhs.index()] as u16
                );
                // lhs in the low bits; lhs is at most 63 bits wide here, so
                // the shift cannot overflow.
                let low = self.get(lhs);
                let high = self.get(rhs) << self.widths[lhs.index()];
                self.set(dst, high | low);
            }
            Instruction::Select { dst, src, bit } => self.set(dst, (self.get(src) >> bit) & 1),
            Instruction::Slice {
                dst, src, first, ..
            } => {
                // set() masks to the destination width (end - first + 1).
                self.set(dst, self.get(src) >> first);
            }
            Instruction::Mux { dst, choice, a, b } => {
                pedantic_assert!(self.widths[choice.index()] == 1);
                let value = if self.get(choice) & 1 == 1 {
                    self.get(b)
                } else {
                    self.get(a)
                };
                self.set(dst, value);
            }
            Instruction::Reg { dst, src } => {
                pedantic_assert!(self.widths[dst.index()] == self.widths[src.index()]);
                self.set(dst, self.prev[src.index()]);
            }
            Instruction::Rom {
                dst,
                block,
                read_addr,
            } => {
                let addr = self.get(read_addr) as usize;
                self.set(dst, self.mem.read(block, addr));
            }
            Instruction::Ram {
                dst,
                block,
                read_addr,
                write_enable,
                write_addr,
                write_data,
            } => {
                // Read sees the start-of-cycle memory; the write commits at
                // the end of the cycle with end-of-cycle operand values.
                let addr = self.get(read_addr) as usize;
                self.set(dst, self.mem.read(block, addr));
                self.pending.push(PendingWrite {
                    block,
                    write_enable,
                    write_addr,
                    write_data,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlist_spec::encoding::encode_all;
    use netlist_spec::{RegFlags, RegisterInfo};

    fn simulator(registers: Vec<RegisterInfo>, instructions: Vec<Instruction>) -> Simulator {
        let program = Program {
            registers,
            memories: vec![],
            words: encode_all(&instructions),
        };
        Simulator::new(program, &MemoryImages::new(), SimulatorConfig::default()).unwrap()
    }

    #[test]
    fn test_not_is_masked() {
        let mut sim = simulator(
            vec![
                RegisterInfo::new("a", 4, RegFlags::INPUT),
                RegisterInfo::new("y", 4, RegFlags::OUTPUT),
            ],
            vec![Instruction::Not {
                dst: RegIndex(1),
                src: RegIndex(0),
            }],
        );
        let mut inputs = CycleInputs::new();
        inputs.insert("a".to_string(), 0b0101);
        assert_eq!(sim.cycle(&inputs).unwrap(), CycleState::Completed);
        // Without masking this would be !0b0101 with 60 high bits set.
        assert_eq!(sim.register(RegIndex(1)), 0b1010);
    }

    #[test]
    fn test_concat_lhs_in_low_bits() {
        let mut sim = simulator(
            vec![
                RegisterInfo::new("lo", 4, RegFlags::INPUT),
                RegisterInfo::new("hi", 4, RegFlags::INPUT),
                RegisterInfo::new("y", 8, RegFlags::OUTPUT),
            ],
            vec![Instruction::Concat {
                dst: RegIndex(2),
                lhs: RegIndex(0),
                rhs: RegIndex(1),
            }],
        );
        let mut inputs = CycleInputs::new();
        inputs.insert("lo".to_string(), 0x3);
        inputs.insert("hi".to_string(), 0xA);
        sim.cycle(&inputs).unwrap();
        assert_eq!(sim.register(RegIndex(2)), 0xA3);
    }

    #[test]
    fn test_missing_input_is_error() {
        let mut sim = simulator(
            vec![
                RegisterInfo::new("a", 1, RegFlags::INPUT),
                RegisterInfo::new("y", 1, RegFlags::NONE),
            ],
            vec![Instruction::Not {
                dst: RegIndex(1),
                src: RegIndex(0),
            }],
        );
        let err = sim.cycle(&CycleInputs::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::MissingInput { .. }));
    }

    #[test]
    fn test_input_overflow_is_error() {
        let mut sim = simulator(
            vec![
                RegisterInfo::new("a", 2, RegFlags::INPUT),
                RegisterInfo::new("y", 2, RegFlags::NONE),
            ],
            vec![Instruction::Not {
                dst: RegIndex(1),
                src: RegIndex(0),
            }],
        );
        let mut inputs = CycleInputs::new();
        inputs.insert("a".to_string(), 4);
        let err = sim.cycle(&inputs).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InputOverflow {
                width: 2,
                value: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_breakpoint_must_hit_instruction_start() {
        let mut sim = simulator(
            vec![
                RegisterInfo::new("a", 1, RegFlags::INPUT),
                RegisterInfo::new("y", 1, RegFlags::NONE),
            ],
            vec![
                Instruction::Not {
                    dst: RegIndex(1),
                    src: RegIndex(0),
                },
                Instruction::Nop,
            ],
        );
        // Word 1 is the NOT's dst operand, not an instruction start.
        assert!(matches!(
            sim.add_breakpoint(1, false),
            Err(RuntimeError::InvalidBreakpoint { offset: 1 })
        ));
        // Word 3 is the NOP.
        sim.add_breakpoint(3, false).unwrap();
        assert!(matches!(
            sim.add_breakpoint(3, true),
            Err(RuntimeError::DuplicateBreakpoint { offset: 3 })
        ));
    }
}
