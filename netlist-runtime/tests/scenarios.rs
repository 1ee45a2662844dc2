//! End-to-end circuit scenarios: compile source, simulate, check outputs.

use netlist_compiler::{compile, CompileError};
use netlist_runtime::{
    CycleInputs, CycleState, FixedInputs, MemoryImages, Simulator, SimulatorConfig,
};

fn simulator(source: &str, images: &MemoryImages) -> Simulator {
    let program = compile(source).expect("compile");
    Simulator::new(program, images, SimulatorConfig::default()).expect("simulator")
}

fn frame(pairs: &[(&str, u64)]) -> CycleInputs {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

#[test]
fn test_flip_flop_lags_one_cycle() {
    let mut sim = simulator("INPUT d OUTPUT q VAR d, q IN q = REG d", &MemoryImages::new());
    let mut feed = FixedInputs::single("d", &[1, 0, 1]);
    let outputs = sim.run(&mut feed, 3).unwrap();

    // Cycle 0 sees the initial prev = 0.
    let q: Vec<u64> = outputs.iter().map(|cycle| cycle[0].1).collect();
    assert_eq!(q, vec![0, 1, 0]);
}

#[test]
fn test_full_adder() {
    let source = "INPUT a, b, cin
                  OUTPUT s, cout
                  VAR a, b, cin, s, cout, x, t1, t2
                  IN
                  x = XOR a b
                  s = XOR x cin
                  t1 = AND a b
                  t2 = AND cin x
                  cout = OR t1 t2";
    let mut sim = simulator(source, &MemoryImages::new());

    sim.cycle(&frame(&[("a", 1), ("b", 1), ("cin", 0)])).unwrap();
    assert_eq!(sim.register_by_name("s"), Some(0));
    assert_eq!(sim.register_by_name("cout"), Some(1));

    // Exhaustive truth table.
    for bits in 0..8u64 {
        let (a, b, cin) = (bits & 1, (bits >> 1) & 1, (bits >> 2) & 1);
        sim.cycle(&frame(&[("a", a), ("b", b), ("cin", cin)])).unwrap();
        let sum = a + b + cin;
        assert_eq!(sim.register_by_name("s"), Some(sum & 1));
        assert_eq!(sim.register_by_name("cout"), Some(sum >> 1));
    }
}

const COUNTER: &str = "INPUT
OUTPUT q
VAR q:4, n:4, b0, b1, b2, b3, c2, c3, n0, n1, n2, n3, lo:2, hi:2
IN
q = REG n
b0 = SELECT 0 q
b1 = SELECT 1 q
b2 = SELECT 2 q
b3 = SELECT 3 q
c2 = AND b1 b0
c3 = AND b2 c2
n0 = NOT b0
n1 = XOR b1 b0
n2 = XOR b2 c2
n3 = XOR b3 c3
lo = CONCAT n0 n1
hi = CONCAT n2 n3
n = CONCAT lo hi";

#[test]
fn test_four_bit_counter() {
    let mut sim = simulator(COUNTER, &MemoryImages::new());
    let empty = CycleInputs::new();

    let mut seen = Vec::new();
    for _ in 0..17 {
        sim.cycle(&empty).unwrap();
        seen.push(sim.register_by_name("q").unwrap());
    }

    // First four cycles count 0, 1, 2, 3; after 16 cycles q wraps to its
    // initial value.
    assert_eq!(&seen[..4], &[0, 1, 2, 3]);
    assert_eq!(seen[15], 15);
    assert_eq!(seen[16], seen[0]);
}

#[test]
fn test_slice_concat_roundtrip() {
    let source = "INPUT x
                  OUTPUT y
                  VAR x:8, lo:4, hi:4, y:8
                  IN
                  lo = SLICE 0 3 x
                  hi = SLICE 4 7 x
                  y = CONCAT lo hi";
    let mut sim = simulator(source, &MemoryImages::new());

    for x in 0..=255u64 {
        sim.cycle(&frame(&[("x", x)])).unwrap();
        assert_eq!(sim.register_by_name("y"), Some(x));
    }
}

#[test]
fn test_ram_read_before_write() {
    let source = "INPUT a, we, d
                  OUTPUT r
                  VAR a, we, d, r
                  IN
                  r = RAM 1 1 a we a d";
    let mut images = MemoryImages::new();
    images.insert("r".to_string(), vec![0, 0]);
    let mut sim = simulator(source, &images);

    // Cycle 0 writes mem[0] = 1 but reads the start-of-cycle value.
    sim.cycle(&frame(&[("a", 0), ("we", 1), ("d", 1)])).unwrap();
    assert_eq!(sim.register_by_name("r"), Some(0));

    // Cycle 1 observes the committed write.
    sim.cycle(&frame(&[("a", 0), ("we", 0), ("d", 0)])).unwrap();
    assert_eq!(sim.register_by_name("r"), Some(1));
}

#[test]
fn test_ram_write_disabled_leaves_memory() {
    let source = "INPUT a, we, d OUTPUT r VAR a, we, d, r IN r = RAM 1 1 a we a d";
    let mut images = MemoryImages::new();
    images.insert("r".to_string(), vec![0, 1]);
    let mut sim = simulator(source, &images);

    sim.cycle(&frame(&[("a", 1), ("we", 0), ("d", 0)])).unwrap();
    assert_eq!(sim.register_by_name("r"), Some(1));
    sim.cycle(&frame(&[("a", 1), ("we", 0), ("d", 0)])).unwrap();
    assert_eq!(sim.register_by_name("r"), Some(1));
}

#[test]
fn test_rom_lookup() {
    let source = "INPUT a
                  OUTPUT w
                  VAR a:2, w:8
                  IN
                  w = ROM 2 8 a";
    let mut images = MemoryImages::new();
    images.insert("w".to_string(), vec![10, 20, 30, 40]);
    let mut sim = simulator(source, &images);

    for (addr, expected) in [(0u64, 10u64), (1, 20), (2, 30), (3, 40), (1, 20)] {
        sim.cycle(&frame(&[("a", addr)])).unwrap();
        assert_eq!(sim.register_by_name("w"), Some(expected));
    }
}

#[test]
fn test_combinational_cycle_rejected() {
    let err = compile("INPUT OUTPUT VAR x, y IN x = OR y 0b0 y = AND x 0b1").unwrap_err();
    match err {
        CompileError::CombinationalCycle { names } => {
            assert!(names.contains(&"x".to_string()));
            assert!(names.contains(&"y".to_string()));
        }
        other => panic!("expected a combinational cycle error, got {:?}", other),
    }
}

#[test]
fn test_mux_selects_second_when_choice_is_one() {
    let source = "INPUT c, a, b OUTPUT m VAR c, a:4, b:4, m:4 IN m = MUX c a b";
    let mut sim = simulator(source, &MemoryImages::new());

    sim.cycle(&frame(&[("c", 0), ("a", 3), ("b", 12)])).unwrap();
    assert_eq!(sim.register_by_name("m"), Some(3));

    sim.cycle(&frame(&[("c", 1), ("a", 3), ("b", 12)])).unwrap();
    assert_eq!(sim.register_by_name("m"), Some(12));
}

#[test]
fn test_outputs_expose_every_output_register() {
    let source = "INPUT a OUTPUT s, t VAR a, s, t IN s = NOT a t = a";
    let mut sim = simulator(source, &MemoryImages::new());
    let state = sim.cycle(&frame(&[("a", 1)])).unwrap();
    assert_eq!(state, CycleState::Completed);

    let outputs = sim.outputs();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0], ("s".to_string(), 0));
    assert_eq!(outputs[1], ("t".to_string(), 1));
}

#[test]
fn test_missing_ram_image_warns_and_zero_fills() {
    // No image for the RAM block: the simulator starts it zeroed.
    let source = "INPUT a, we, d OUTPUT r VAR a, we, d, r IN r = RAM 1 1 a we a d";
    let mut sim = simulator(source, &MemoryImages::new());
    sim.cycle(&frame(&[("a", 0), ("we", 0), ("d", 0)])).unwrap();
    assert_eq!(sim.register_by_name("r"), Some(0));
}
