//! Built-in passes used by the default factories and registry entries.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: passes that only look at the circuit
//! - [`target`]: passes bound to a coupling map, basis or target

pub mod agnostic;
pub mod target;

pub use agnostic::{
    CancelInverses, ControlFlowCheck, MergeRotations, OptimizationLoop, RemoveResetInZeroState,
};
pub use target::{
    BasicRouting, BasisTranslation, CheckRouting, DenseLayout, GateDirection, SabreRouting,
    Schedule, SchedulingPolicy, SetLayout, SynthesisSettings, TrivialLayout, Unroll3qOrMore,
};
