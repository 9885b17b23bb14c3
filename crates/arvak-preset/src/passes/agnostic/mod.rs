//! Target-agnostic passes.
//!
//! These never consult a coupling map, basis or target and are safe to run
//! on any circuit.

pub mod cancel;
pub mod control_flow;
pub mod reset;

pub use cancel::{CancelInverses, MergeRotations, OptimizationLoop};
pub use control_flow::ControlFlowCheck;
pub use reset::RemoveResetInZeroState;
