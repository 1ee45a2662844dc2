//! Topological scheduling of equations under synchronous semantics
//!
//! Orders the non-input variables so that every variable is computed before
//! all variables whose equations read it in the same cycle. Delayed
//! references (`REG`) and the write-side operands of `RAM` read
//! previous-cycle state and therefore do not constrain the order.
//!
//! The graph is held as adjacency lists of dense variable indices; a
//! three-color DFS walks variables in declaration order so the resulting
//! schedule is deterministic, and a back edge is reported as a fatal
//! combinational cycle naming the variables on the loop.

use crate::ast::{Arg, Expr, Netlist, VarId};
use crate::error::{CompileError, Result};

/// Compute a schedule for all variables that have an equation.
pub fn schedule(netlist: &Netlist) -> Result<Vec<VarId>> {
    let count = netlist.vars.len();
    let mut deps: Vec<Vec<VarId>> = vec![Vec::new(); count];
    for (var, expr) in &netlist.equations {
        comb_deps(expr, &mut deps[*var]);
    }

    let mut dfs = Dfs {
        netlist,
        deps,
        marks: vec![Mark::White; count],
        path: Vec::new(),
        order: Vec::with_capacity(netlist.equations.len()),
    };
    for var in 0..count {
        if netlist.has_equation(var) && dfs.marks[var] == Mark::White {
            dfs.visit(var)?;
        }
    }
    Ok(dfs.order)
}

/// Collect the combinational dependencies of one equation.
///
/// `REG` and the write-enable/address/data operands of `RAM` are skipped:
/// those read state that only has to be ready at the end of the cycle.
fn comb_deps(expr: &Expr, out: &mut Vec<VarId>) {
    match expr {
        Expr::Arg(arg) | Expr::Not(arg) | Expr::Select { arg, .. } | Expr::Slice { arg, .. } => {
            arg_dep(arg, out);
        }
        Expr::Binary { lhs, rhs, .. } | Expr::Concat { lhs, rhs } => {
            arg_dep(lhs, out);
            arg_dep(rhs, out);
        }
        Expr::Mux { choice, a, b } => {
            arg_dep(choice, out);
            arg_dep(a, out);
            arg_dep(b, out);
        }
        Expr::Reg(_) => {}
        Expr::Rom { read_addr, .. } | Expr::Ram { read_addr, .. } => {
            arg_dep(read_addr, out);
        }
    }
}

fn arg_dep(arg: &Arg, out: &mut Vec<VarId>) {
    if let Arg::Var(var) = arg {
        out.push(*var);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

struct Dfs<'a> {
    netlist: &'a Netlist,
    deps: Vec<Vec<VarId>>,
    marks: Vec<Mark>,
    path: Vec<VarId>,
    order: Vec<VarId>,
}

impl Dfs<'_> {
    fn visit(&mut self, var: VarId) -> Result<()> {
        self.marks[var] = Mark::Gray;
        self.path.push(var);

        for i in 0..self.deps[var].len() {
            let dep = self.deps[var][i];
            // Inputs have no equation and are roots of the order.
            if !self.netlist.has_equation(dep) {
                continue;
            }
            match self.marks[dep] {
                Mark::White => self.visit(dep)?,
                Mark::Gray => return Err(self.cycle_error(dep)),
                Mark::Black => {}
            }
        }

        self.path.pop();
        self.marks[var] = Mark::Black;
        self.order.push(var);
        Ok(())
    }

    fn cycle_error(&self, start: VarId) -> CompileError {
        let from = self
            .path
            .iter()
            .position(|&var| var == start)
            .unwrap_or(0);
        let names = self.path[from..]
            .iter()
            .map(|&var| self.netlist.var(var).name.clone())
            .collect();
        CompileError::CombinationalCycle { names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn positions(netlist: &Netlist, order: &[VarId]) -> Vec<(String, usize)> {
        order
            .iter()
            .enumerate()
            .map(|(i, &var)| (netlist.var(var).name.clone(), i))
            .collect()
    }

    fn position_of(netlist: &Netlist, order: &[VarId], name: &str) -> usize {
        let id = netlist.lookup(name).unwrap();
        order.iter().position(|&var| var == id).unwrap()
    }

    #[test]
    fn test_dependencies_precede_uses() {
        let netlist = parse(
            "INPUT a, b, cin OUTPUT s, cout
             VAR a, b, cin, s, cout, x, t1, t2
             IN
             cout = OR t1 t2
             t2 = AND cin x
             t1 = AND a b
             s = XOR x cin
             x = XOR a b",
        )
        .unwrap();
        let order = schedule(&netlist).unwrap();
        assert_eq!(order.len(), 5);

        assert!(position_of(&netlist, &order, "x") < position_of(&netlist, &order, "s"));
        assert!(position_of(&netlist, &order, "x") < position_of(&netlist, &order, "t2"));
        assert!(position_of(&netlist, &order, "t1") < position_of(&netlist, &order, "cout"));
        assert!(position_of(&netlist, &order, "t2") < position_of(&netlist, &order, "cout"));
    }

    #[test]
    fn test_reg_breaks_dependency() {
        // q reads n through REG, so n = NOT q and q = REG n is not a cycle.
        let netlist = parse("INPUT OUTPUT q VAR q, n IN q = REG n n = NOT q").unwrap();
        let order = schedule(&netlist).unwrap();
        assert!(position_of(&netlist, &order, "q") < position_of(&netlist, &order, "n"));
    }

    #[test]
    fn test_ram_write_operands_are_not_dependencies() {
        // The write data of the RAM comes from a variable computed after it.
        let netlist = parse(
            "INPUT a, we OUTPUT r VAR a, we, r, d
             IN
             r = RAM 1 1 a we a d
             d = NOT r",
        )
        .unwrap();
        let order = schedule(&netlist).unwrap();
        assert!(position_of(&netlist, &order, "r") < position_of(&netlist, &order, "d"));
    }

    #[test]
    fn test_combinational_cycle_rejected() {
        let netlist = parse(
            "INPUT OUTPUT VAR x, y IN x = OR y 0b0 y = AND x 0b1",
        )
        .unwrap();
        let err = schedule(&netlist).unwrap_err();
        match err {
            CompileError::CombinationalCycle { names } => {
                assert_eq!(names.len(), 2);
                assert!(names.contains(&"x".to_string()));
                assert!(names.contains(&"y".to_string()));
            }
            other => panic!("expected combinational cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_cycle_rejected() {
        let netlist = parse("INPUT OUTPUT VAR x IN x = NOT x").unwrap();
        let err = schedule(&netlist).unwrap_err();
        assert!(matches!(
            err,
            CompileError::CombinationalCycle { names } if names == vec!["x".to_string()]
        ));
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let source = "INPUT a OUTPUT z VAR a, z, m, n
                      IN z = AND m n m = NOT a n = NOT a";
        let netlist = parse(source).unwrap();
        let first = positions(&netlist, &schedule(&netlist).unwrap());
        for _ in 0..4 {
            let again = positions(&netlist, &schedule(&netlist).unwrap());
            assert_eq!(first, again);
        }
    }
}
