//! Per-cycle input supply
//!
//! The simulator core does not read files or stdin; an [`InputFeed`] hands it
//! one name-keyed frame of input values per cycle. [`FixedInputs`] wraps a
//! pre-recorded vector of frames, which is what tests and batch drivers use.

use std::collections::HashMap;

/// Input values for one cycle, keyed by input bus name.
pub type CycleInputs = HashMap<String, u64>;

/// Supplies one input frame per cycle.
pub trait InputFeed {
    /// The next cycle's inputs. Returning a frame that misses a declared
    /// input bus makes the simulator abort that cycle with a runtime error.
    fn next_frame(&mut self) -> CycleInputs;
}

/// A pre-recorded input sequence; yields empty frames once exhausted.
#[derive(Debug, Clone, Default)]
pub struct FixedInputs {
    frames: Vec<CycleInputs>,
    pos: usize,
}

impl FixedInputs {
    pub fn new(frames: Vec<CycleInputs>) -> Self {
        Self { frames, pos: 0 }
    }

    /// Build a single-bus feed from plain values.
    pub fn single(name: &str, values: &[u64]) -> Self {
        Self::new(
            values
                .iter()
                .map(|&value| {
                    let mut frame = CycleInputs::new();
                    frame.insert(name.to_string(), value);
                    frame
                })
                .collect(),
        )
    }
}

impl InputFeed for FixedInputs {
    fn next_frame(&mut self) -> CycleInputs {
        let frame = self.frames.get(self.pos).cloned().unwrap_or_default();
        self.pos += 1;
        frame
    }
}
