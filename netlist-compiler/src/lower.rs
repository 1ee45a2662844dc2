//! Bytecode writer: lowers the scheduled IR to a packed word stream
//!
//! A single pass over the scheduled equation list. Every declared variable
//! gets one register (its declaration index), constant leaves each get one
//! unnamed temporary loaded by a `CONST` ahead of the consuming instruction,
//! and each equation lowers to exactly one instruction.
//!
//! The writer asserts the bytecode invariants at emit time. The parser is
//! contractually required to have rejected every program that could trip
//! them, so a failing assertion here is a programmer error, not user input.

use crate::ast::{Arg, BinaryOp, Expr, Netlist, VarId};
use netlist_spec::{
    bus_max_value, encoding, Instruction, MemoryInfo, MemoryKind, Opcode, Program, RegFlags,
    RegIndex, RegisterInfo,
};

/// Lower a scheduled netlist into a bytecode program.
pub fn lower(netlist: &Netlist, order: &[VarId]) -> Program {
    let mut writer = ByteCodeWriter::new();

    let regs: Vec<RegIndex> = netlist
        .vars
        .iter()
        .map(|var| {
            let mut flags = RegFlags::NONE;
            if var.is_input {
                flags = flags | RegFlags::INPUT;
            }
            if var.is_output {
                flags = flags | RegFlags::OUTPUT;
            }
            writer.register_reg(var.width, &var.name, flags)
        })
        .collect();

    for &var in order {
        let expr = netlist
            .equation(var)
            .expect("scheduled variable has an equation");
        emit(&mut writer, netlist, &regs, var, expr);
    }

    writer.finish()
}

fn emit(
    writer: &mut ByteCodeWriter,
    netlist: &Netlist,
    regs: &[RegIndex],
    var: VarId,
    expr: &Expr,
) {
    let dst = regs[var];
    match expr {
        // A constant assignment is a plain CONST; a variable copy has no
        // dedicated opcode and goes through OR with itself.
        Expr::Arg(Arg::Const(constant)) => writer.write_const(dst, constant.value),
        Expr::Arg(Arg::Var(src)) => writer.write_binary(Opcode::Or, dst, regs[*src], regs[*src]),
        Expr::Not(arg) => {
            let src = arg_reg(writer, regs, arg);
            writer.write_not(dst, src);
        }
        Expr::Binary { op, lhs, rhs } => {
            let opcode = match op {
                BinaryOp::And => Opcode::And,
                BinaryOp::Or => Opcode::Or,
                BinaryOp::Nand => Opcode::Nand,
                BinaryOp::Nor => Opcode::Nor,
                BinaryOp::Xor => Opcode::Xor,
                BinaryOp::Xnor => Opcode::Xnor,
            };
            let lhs = arg_reg(writer, regs, lhs);
            let rhs = arg_reg(writer, regs, rhs);
            writer.write_binary(opcode, dst, lhs, rhs);
        }
        Expr::Mux { choice, a, b } => {
            let choice = arg_reg(writer, regs, choice);
            let a = arg_reg(writer, regs, a);
            let b = arg_reg(writer, regs, b);
            writer.write_mux(dst, choice, a, b);
        }
        Expr::Reg(src) => writer.write_reg(dst, regs[*src]),
        Expr::Concat { lhs, rhs } => {
            let lhs = arg_reg(writer, regs, lhs);
            let rhs = arg_reg(writer, regs, rhs);
            writer.write_concat(dst, lhs, rhs);
        }
        Expr::Select { bit, arg } => {
            let src = arg_reg(writer, regs, arg);
            writer.write_select(dst, src, *bit);
        }
        Expr::Slice { first, end, arg } => {
            let src = arg_reg(writer, regs, arg);
            writer.write_slice(dst, src, *first, *end);
        }
        Expr::Rom {
            addr_size,
            word_size,
            read_addr,
        } => {
            let read_addr = arg_reg(writer, regs, read_addr);
            writer.write_rom(dst, &netlist.var(var).name, *addr_size, *word_size, read_addr);
        }
        Expr::Ram {
            addr_size,
            word_size,
            read_addr,
            write_enable,
            write_addr,
            write_data,
        } => {
            let read_addr = arg_reg(writer, regs, read_addr);
            let write_enable = arg_reg(writer, regs, write_enable);
            let write_addr = arg_reg(writer, regs, write_addr);
            let write_data = arg_reg(writer, regs, write_data);
            writer.write_ram(
                dst,
                &netlist.var(var).name,
                *addr_size,
                *word_size,
                read_addr,
                write_enable,
                write_addr,
                write_data,
            );
        }
    }
}

/// Register holding the argument's value: the variable's register, or a fresh
/// unnamed temporary loaded with the constant.
fn arg_reg(writer: &mut ByteCodeWriter, regs: &[RegIndex], arg: &Arg) -> RegIndex {
    match arg {
        Arg::Var(var) => regs[*var],
        Arg::Const(constant) => {
            let reg = writer.register_reg(constant.width, "", RegFlags::NONE);
            writer.write_const(reg, constant.value);
            reg
        }
    }
}

/// Low-level emitter over the register table, memory table, and word stream.
pub struct ByteCodeWriter {
    registers: Vec<RegisterInfo>,
    memories: Vec<MemoryInfo>,
    instructions: Vec<Instruction>,
}

impl ByteCodeWriter {
    pub fn new() -> Self {
        Self {
            registers: Vec::new(),
            memories: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Allocate a register of the given width.
    pub fn register_reg(&mut self, width: u8, name: &str, flags: RegFlags) -> RegIndex {
        assert!(
            (self.registers.len() as u32) < RegIndex::MAX_INDEX,
            "too many registers allocated"
        );
        assert!(width >= 1 && width <= 64, "register width out of range");
        let reg = RegIndex(self.registers.len() as u32);
        self.registers.push(RegisterInfo::new(name, width, flags));
        reg
    }

    fn check_reg(&self, reg: RegIndex) -> u8 {
        assert!(reg.index() < self.registers.len(), "register out of range");
        self.registers[reg.index()].width
    }

    pub fn write_nop(&mut self) {
        self.instructions.push(Instruction::Nop);
    }

    pub fn write_const(&mut self, dst: RegIndex, value: u64) {
        let width = self.check_reg(dst);
        assert!(value <= bus_max_value(width), "constant overflows register");
        self.instructions.push(Instruction::Const { dst, value });
    }

    pub fn write_not(&mut self, dst: RegIndex, src: RegIndex) {
        assert_eq!(self.check_reg(dst), self.check_reg(src));
        self.instructions.push(Instruction::Not { dst, src });
    }

    pub fn write_binary(&mut self, opcode: Opcode, dst: RegIndex, lhs: RegIndex, rhs: RegIndex) {
        assert!(opcode.is_binary(), "not a bitwise opcode");
        assert_eq!(self.check_reg(dst), self.check_reg(lhs));
        assert_eq!(self.check_reg(dst), self.check_reg(rhs));
        self.instructions.push(match opcode {
            Opcode::And => Instruction::And { dst, lhs, rhs },
            Opcode::Or => Instruction::Or { dst, lhs, rhs },
            Opcode::Nand => Instruction::Nand { dst, lhs, rhs },
            Opcode::Nor => Instruction::Nor { dst, lhs, rhs },
            Opcode::Xor => Instruction::Xor { dst, lhs, rhs },
            _ => Instruction::Xnor { dst, lhs, rhs },
        });
    }

    pub fn write_concat(&mut self, dst: RegIndex, lhs: RegIndex, rhs: RegIndex) {
        let total = self.check_reg(lhs) as u16 + self.check_reg(rhs) as u16;
        assert_eq!(self.check_reg(dst) as u16, total);
        self.instructions.push(Instruction::Concat { dst, lhs, rhs });
    }

    pub fn write_select(&mut self, dst: RegIndex, src: RegIndex, bit: u8) {
        assert_eq!(self.check_reg(dst), 1);
        assert!(bit < self.check_reg(src), "bit index out of range");
        self.instructions.push(Instruction::Select { dst, src, bit });
    }

    pub fn write_slice(&mut self, dst: RegIndex, src: RegIndex, first: u8, end: u8) {
        assert!(first <= end, "slice bounds reversed");
        assert!(end < self.check_reg(src), "slice end out of range");
        assert_eq!(self.check_reg(dst), end - first + 1);
        self.instructions.push(Instruction::Slice {
            dst,
            src,
            first,
            end,
        });
    }

    pub fn write_mux(&mut self, dst: RegIndex, choice: RegIndex, a: RegIndex, b: RegIndex) {
        assert_eq!(self.check_reg(choice), 1);
        assert_eq!(self.check_reg(dst), self.check_reg(a));
        assert_eq!(self.check_reg(dst), self.check_reg(b));
        self.instructions.push(Instruction::Mux { dst, choice, a, b });
    }

    pub fn write_reg(&mut self, dst: RegIndex, src: RegIndex) {
        assert_eq!(self.check_reg(dst), self.check_reg(src));
        self.instructions.push(Instruction::Reg { dst, src });
    }

    pub fn write_rom(
        &mut self,
        dst: RegIndex,
        name: &str,
        addr_size: u8,
        word_size: u8,
        read_addr: RegIndex,
    ) {
        assert_eq!(self.check_reg(read_addr), addr_size);
        assert_eq!(self.check_reg(dst), word_size);
        let block = self.add_memory(name, MemoryKind::Rom, addr_size, word_size);
        self.instructions.push(Instruction::Rom {
            dst,
            block,
            read_addr,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn write_ram(
        &mut self,
        dst: RegIndex,
        name: &str,
        addr_size: u8,
        word_size: u8,
        read_addr: RegIndex,
        write_enable: RegIndex,
        write_addr: RegIndex,
        write_data: RegIndex,
    ) {
        assert_eq!(self.check_reg(read_addr), addr_size);
        assert_eq!(self.check_reg(write_enable), 1);
        assert_eq!(self.check_reg(write_addr), addr_size);
        assert_eq!(self.check_reg(write_data), word_size);
        assert_eq!(self.check_reg(dst), word_size);
        let block = self.add_memory(name, MemoryKind::Ram, addr_size, word_size);
        self.instructions.push(Instruction::Ram {
            dst,
            block,
            read_addr,
            write_enable,
            write_addr,
            write_data,
        });
    }

    fn add_memory(&mut self, name: &str, kind: MemoryKind, addr_size: u8, word_size: u8) -> u32 {
        let block = self.memories.len() as u32;
        self.memories
            .push(MemoryInfo::new(name, kind, addr_size, word_size));
        block
    }

    /// Pack everything into a [`Program`].
    pub fn finish(self) -> Program {
        Program {
            registers: self.registers,
            memories: self.memories,
            words: encoding::encode_all(&self.instructions),
        }
    }
}

impl Default for ByteCodeWriter {
    fn default() -> Self {
        Self::new()
    }
}
