//! CLI commands for the slate lineup engine.

pub mod optimize;
pub mod simulate;

pub use optimize::{run_optimize, OptimizeArgs};
pub use simulate::{run_simulate, SimulateArgs};
