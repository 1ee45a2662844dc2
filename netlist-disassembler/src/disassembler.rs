//! Whole-program listing in netlist surface syntax
//!
//! Renders the INPUT/OUTPUT/VAR declarations followed by one equation per
//! instruction, in bytecode order. The output reparses into a program with
//! the same observable simulation, which is what makes the listing usable
//! for debugging bytecode-level issues at the source level.

use crate::decoder::decode_all;
use crate::error::Result;
use crate::formatter::format_instruction;
use netlist_spec::Program;
use std::fmt::Write;

/// Disassemble a program into source text.
pub fn disassemble(program: &Program) -> Result<String> {
    let decoded = decode_all(&program.words)?;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "# netlist bytecode: {} registers, {} memory blocks, {} instructions",
        program.registers.len(),
        program.memories.len(),
        decoded.len()
    );

    let names = |regs: Vec<netlist_spec::RegIndex>| -> String {
        regs.iter()
            .map(|&reg| program.register_name(reg))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let _ = writeln!(out, "INPUT {}", names(program.inputs()));
    let _ = writeln!(out, "OUTPUT {}", names(program.outputs()));

    let vars = program
        .registers
        .iter()
        .enumerate()
        .map(|(i, info)| {
            format!(
                "{}:{}",
                program.register_name(netlist_spec::RegIndex(i as u32)),
                info.width
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "VAR {}", vars);
    let _ = writeln!(out, "IN");

    for (_, inst) in &decoded {
        let _ = writeln!(out, "{}", format_instruction(program, inst));
    }
    Ok(out)
}
