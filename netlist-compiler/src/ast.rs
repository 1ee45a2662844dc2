//! Typed intermediate representation of a parsed netlist
//!
//! One equation per non-input variable; every equation is a single operator
//! applied to leaves (variable references or constants). The IR is the input
//! to the scheduler and the bytecode writer and is not exposed past them.

use crate::lexer::SourcePos;
use std::collections::HashMap;

/// Dense index into [`Netlist::vars`].
pub type VarId = usize;

/// A declared variable.
#[derive(Clone, Debug)]
pub struct VarInfo {
    pub name: String,
    pub width: u8,
    pub is_input: bool,
    pub is_output: bool,
    /// Position of the declaration in the VAR section
    pub pos: SourcePos,
}

/// A literal constant with an explicit bus width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constant {
    pub width: u8,
    pub value: u64,
}

/// An operator leaf: a variable reference or a constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    Var(VarId),
    Const(Constant),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
}

/// The right-hand side of an equation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// Plain copy or constant assignment: `x = y`, `x = 0b01`
    Arg(Arg),
    Not(Arg),
    Binary {
        op: BinaryOp,
        lhs: Arg,
        rhs: Arg,
    },
    /// `choice = 1` selects `b`, `choice = 0` selects `a`
    Mux {
        choice: Arg,
        a: Arg,
        b: Arg,
    },
    /// Delayed reference: reads the previous cycle's value of the variable
    Reg(VarId),
    Concat {
        lhs: Arg,
        rhs: Arg,
    },
    Select {
        bit: u8,
        arg: Arg,
    },
    Slice {
        first: u8,
        end: u8,
        arg: Arg,
    },
    Rom {
        addr_size: u8,
        word_size: u8,
        read_addr: Arg,
    },
    Ram {
        addr_size: u8,
        word_size: u8,
        read_addr: Arg,
        write_enable: Arg,
        write_addr: Arg,
        write_data: Arg,
    },
}

/// The parsed program: declarations plus the equation list in source order.
#[derive(Clone, Debug, Default)]
pub struct Netlist {
    pub vars: Vec<VarInfo>,
    by_name: HashMap<String, VarId>,
    /// Input variables in declaration order
    pub inputs: Vec<VarId>,
    /// Output variables in declaration order
    pub outputs: Vec<VarId>,
    /// Equations in source order
    pub equations: Vec<(VarId, Expr)>,
    eq_of: Vec<Option<usize>>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable; returns `None` if the name is already taken.
    pub fn declare(&mut self, info: VarInfo) -> Option<VarId> {
        if self.by_name.contains_key(&info.name) {
            return None;
        }
        let id = self.vars.len();
        self.by_name.insert(info.name.clone(), id);
        self.vars.push(info);
        self.eq_of.push(None);
        Some(id)
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &VarInfo {
        &self.vars[id]
    }

    /// Attach an equation to a variable; returns the equation index.
    pub fn define(&mut self, var: VarId, expr: Expr) -> usize {
        let index = self.equations.len();
        self.equations.push((var, expr));
        self.eq_of[var] = Some(index);
        index
    }

    /// The equation defining `var`, if one exists.
    pub fn equation(&self, var: VarId) -> Option<&Expr> {
        self.eq_of[var].map(|index| &self.equations[index].1)
    }

    pub fn has_equation(&self, var: VarId) -> bool {
        self.eq_of[var].is_some()
    }

    /// Bus width of an argument.
    pub fn arg_width(&self, arg: &Arg) -> u8 {
        match arg {
            Arg::Var(id) => self.vars[*id].width,
            Arg::Const(constant) => constant.width,
        }
    }

    /// Bus width an expression produces.
    pub fn expr_width(&self, expr: &Expr) -> u8 {
        match expr {
            Expr::Arg(arg) | Expr::Not(arg) => self.arg_width(arg),
            Expr::Binary { lhs, .. } => self.arg_width(lhs),
            Expr::Mux { a, .. } => self.arg_width(a),
            Expr::Reg(var) => self.vars[*var].width,
            Expr::Concat { lhs, rhs } => self.arg_width(lhs) + self.arg_width(rhs),
            Expr::Select { .. } => 1,
            Expr::Slice { first, end, .. } => end - first + 1,
            Expr::Rom { word_size, .. } | Expr::Ram { word_size, .. } => *word_size,
        }
    }

    /// Source-syntax rendering of an argument, for diagnostics.
    pub fn arg_repr(&self, arg: &Arg) -> String {
        match arg {
            Arg::Var(id) => self.vars[*id].name.clone(),
            Arg::Const(constant) => format!("0b{:0width$b}", constant.value, width = constant.width as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, width: u8) -> VarInfo {
        VarInfo {
            name: name.to_string(),
            width,
            is_input: false,
            is_output: false,
            pos: SourcePos::default(),
        }
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut netlist = Netlist::new();
        let x = netlist.declare(var("x", 4)).unwrap();
        assert_eq!(netlist.lookup("x"), Some(x));
        assert_eq!(netlist.lookup("y"), None);
        // Redeclaration is refused.
        assert_eq!(netlist.declare(var("x", 1)), None);
    }

    #[test]
    fn test_define_equation() {
        let mut netlist = Netlist::new();
        let x = netlist.declare(var("x", 1)).unwrap();
        assert!(!netlist.has_equation(x));
        netlist.define(x, Expr::Arg(Arg::Const(Constant { width: 1, value: 1 })));
        assert!(netlist.has_equation(x));
        assert!(matches!(netlist.equation(x), Some(Expr::Arg(_))));
    }

    #[test]
    fn test_expr_widths() {
        let mut netlist = Netlist::new();
        let x = netlist.declare(var("x", 8)).unwrap();
        let y = netlist.declare(var("y", 3)).unwrap();

        assert_eq!(netlist.expr_width(&Expr::Not(Arg::Var(x))), 8);
        assert_eq!(
            netlist.expr_width(&Expr::Concat {
                lhs: Arg::Var(x),
                rhs: Arg::Var(y)
            }),
            11
        );
        assert_eq!(
            netlist.expr_width(&Expr::Select {
                bit: 2,
                arg: Arg::Var(x)
            }),
            1
        );
        assert_eq!(
            netlist.expr_width(&Expr::Slice {
                first: 2,
                end: 5,
                arg: Arg::Var(x)
            }),
            4
        );
        assert_eq!(netlist.expr_width(&Expr::Reg(y)), 3);
        assert_eq!(
            netlist.expr_width(&Expr::Rom {
                addr_size: 4,
                word_size: 7,
                read_addr: Arg::Var(y)
            }),
            7
        );
    }

    #[test]
    fn test_arg_repr_pads_constants() {
        let netlist = Netlist::new();
        let repr = netlist.arg_repr(&Arg::Const(Constant { width: 4, value: 2 }));
        assert_eq!(repr, "0b0010");
    }
}
