//! Disassembling and reparsing a program must preserve its observable
//! simulation.

use netlist_compiler::compile;
use netlist_disassembler::disassemble;
use netlist_runtime::{CycleInputs, MemoryImages, Simulator, SimulatorConfig};

fn run_trace(
    program: netlist_spec::Program,
    images: &MemoryImages,
    stimulus: &[Vec<(&str, u64)>],
) -> Vec<Vec<(String, u64)>> {
    let mut sim = Simulator::new(program, images, SimulatorConfig::default()).unwrap();
    let mut trace = Vec::new();
    for frame in stimulus {
        let inputs: CycleInputs = frame
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        sim.cycle(&inputs).unwrap();
        trace.push(sim.outputs());
    }
    trace
}

fn assert_roundtrip(source: &str, images: &MemoryImages, stimulus: &[Vec<(&str, u64)>]) {
    let program = compile(source).expect("compile");
    let listing = disassemble(&program).expect("disassemble");
    let reparsed = compile(&listing).expect("reparse listing");

    let original = run_trace(program, images, stimulus);
    let roundtripped = run_trace(reparsed, images, stimulus);
    assert_eq!(original, roundtripped, "listing:\n{}", listing);
}

#[test]
fn test_combinational_roundtrip() {
    let source = "INPUT a, b OUTPUT s, c VAR a:4, b:4, s:4, c:4
                  IN s = XOR a b c = AND a 0b1100";
    let stimulus: Vec<Vec<(&str, u64)>> = (0..16)
        .map(|i| vec![("a", i), ("b", 15 - i)])
        .collect();
    assert_roundtrip(source, &MemoryImages::new(), &stimulus);
}

#[test]
fn test_sequential_roundtrip() {
    let source = "INPUT d OUTPUT q, nq VAR d, q, nq
                  IN q = REG d nq = NOT q";
    let stimulus: Vec<Vec<(&str, u64)>> =
        [1, 1, 0, 1, 0, 0].iter().map(|&d| vec![("d", d)]).collect();
    assert_roundtrip(source, &MemoryImages::new(), &stimulus);
}

#[test]
fn test_memory_roundtrip() {
    let source = "INPUT a, we, d OUTPUT r VAR a:2, we, d:4, r:4
                  IN r = RAM 2 4 a we a d";
    let mut images = MemoryImages::new();
    images.insert("r".to_string(), vec![1, 2, 3, 4]);

    let stimulus: Vec<Vec<(&str, u64)>> = vec![
        vec![("a", 0), ("we", 1), ("d", 9)],
        vec![("a", 0), ("we", 0), ("d", 0)],
        vec![("a", 3), ("we", 1), ("d", 5)],
        vec![("a", 3), ("we", 0), ("d", 0)],
    ];
    assert_roundtrip(source, &images, &stimulus);
}

#[test]
fn test_mux_and_slice_roundtrip() {
    let source = "INPUT c, x OUTPUT y, b VAR c, x:8, y:4, b, lo:4, hi:4
                  IN lo = SLICE 0 3 x hi = SLICE 4 7 x y = MUX c lo hi b = SELECT 7 x";
    let stimulus: Vec<Vec<(&str, u64)>> = (0..16)
        .map(|i| vec![("c", i & 1), ("x", i * 17)])
        .collect();
    assert_roundtrip(source, &MemoryImages::new(), &stimulus);
}
