//! # Netlist Runtime
//!
//! Cycle-accurate interpreter for compiled netlist bytecode. The host feeds
//! per-cycle input values and initial memory images; the simulator advances
//! the circuit one synchronous clock cycle at a time and exposes the output
//! buses after each cycle.
//!
//! ## Example
//!
//! ```rust
//! use netlist_runtime::{FixedInputs, MemoryImages, Simulator, SimulatorConfig};
//!
//! // One-bit flip-flop: q lags d by one cycle.
//! let program = netlist_compiler::compile(
//!     "INPUT d OUTPUT q VAR d, q IN q = REG d",
//! ).unwrap();
//!
//! let mut sim = Simulator::new(program, &MemoryImages::new(), SimulatorConfig::default()).unwrap();
//! let mut feed = FixedInputs::single("d", &[1, 0, 1]);
//! let outputs = sim.run(&mut feed, 3).unwrap();
//!
//! let q: Vec<u64> = outputs.iter().map(|cycle| cycle[0].1).collect();
//! assert_eq!(q, vec![0, 1, 0]);
//! ```

pub mod breakpoint;
pub mod error;
pub mod io;
pub mod memory;
pub mod simulator;

pub use breakpoint::Breakpoint;
pub use error::{Result, RuntimeError};
pub use io::{CycleInputs, FixedInputs, InputFeed};
pub use memory::{MemoryBlocks, MemoryImages};
pub use simulator::{CycleState, Simulator, SimulatorConfig};
