//! Instruction formatting back to netlist surface syntax
//!
//! Each instruction renders as the equation that produced it, using the
//! register names from the program's table. Constants print as zero-padded
//! binary literals of the destination width, so the text round-trips through
//! the parser with the same meaning.

use netlist_spec::{Instruction, Program, RegIndex};

fn reg_name(program: &Program, reg: RegIndex) -> String {
    program.register_name(reg)
}

/// Format one instruction as a source line.
pub fn format_instruction(program: &Program, inst: &Instruction) -> String {
    match *inst {
        // NOP and BREAK have no surface syntax; keep the listing reparseable.
        Instruction::Nop => "# nop".to_string(),
        Instruction::Break => "# break".to_string(),

        Instruction::Const { dst, value } => {
            let width = program.width(dst) as usize;
            format!(
                "{} = 0b{:0width$b}",
                reg_name(program, dst),
                value,
                width = width
            )
        }
        Instruction::Not { dst, src } => format!(
            "{} = NOT {}",
            reg_name(program, dst),
            reg_name(program, src)
        ),
        Instruction::And { dst, lhs, rhs } => format_binary(program, "AND", dst, lhs, rhs),
        Instruction::Or { dst, lhs, rhs } => format_binary(program, "OR", dst, lhs, rhs),
        Instruction::Nand { dst, lhs, rhs } => format_binary(program, "NAND", dst, lhs, rhs),
        Instruction::Nor { dst, lhs, rhs } => format_binary(program, "NOR", dst, lhs, rhs),
        Instruction::Xor { dst, lhs, rhs } => format_binary(program, "XOR", dst, lhs, rhs),
        Instruction::Xnor { dst, lhs, rhs } => format_binary(program, "XNOR", dst, lhs, rhs),
        Instruction::Concat { dst, lhs, rhs } => format_binary(program, "CONCAT", dst, lhs, rhs),
        Instruction::Select { dst, src, bit } => format!(
            "{} = SELECT {} {}",
            reg_name(program, dst),
            bit,
            reg_name(program, src)
        ),
        Instruction::Slice {
            dst,
            src,
            first,
            end,
        } => format!(
            "{} = SLICE {} {} {}",
            reg_name(program, dst),
            first,
            end,
            reg_name(program, src)
        ),
        Instruction::Mux { dst, choice, a, b } => format!(
            "{} = MUX {} {} {}",
            reg_name(program, dst),
            reg_name(program, choice),
            reg_name(program, a),
            reg_name(program, b)
        ),
        Instruction::Reg { dst, src } => format!(
            "{} = REG {}",
            reg_name(program, dst),
            reg_name(program, src)
        ),
        Instruction::Rom {
            dst,
            block,
            read_addr,
        } => {
            let mem = &program.memories[block as usize];
            format!(
                "{} = ROM {} {} {}",
                reg_name(program, dst),
                mem.addr_size,
                mem.word_size,
                reg_name(program, read_addr)
            )
        }
        Instruction::Ram {
            dst,
            block,
            read_addr,
            write_enable,
            write_addr,
            write_data,
        } => {
            let mem = &program.memories[block as usize];
            format!(
                "{} = RAM {} {} {} {} {} {}",
                reg_name(program, dst),
                mem.addr_size,
                mem.word_size,
                reg_name(program, read_addr),
                reg_name(program, write_enable),
                reg_name(program, write_addr),
                reg_name(program, write_data)
            )
        }
    }
}

fn format_binary(
    program: &Program,
    keyword: &str,
    dst: RegIndex,
    lhs: RegIndex,
    rhs: RegIndex,
) -> String {
    format!(
        "{} = {} {} {}",
        reg_name(program, dst),
        keyword,
        reg_name(program, lhs),
        reg_name(program, rhs)
    )
}
