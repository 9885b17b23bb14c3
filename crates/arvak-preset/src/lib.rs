//! Arvak Preset Pipeline Assembler
//!
//! This crate decides which compilation stages a circuit needs for a given
//! device and assembles them into a [`StagedPipeline`]. The decision
//! follows the device description in the [`PresetConfig`]: connectivity,
//! direction asymmetry, user placement and the chosen stage methods.
//!
//! # Overview
//!
//! ```text
//! PresetConfig --> assemble --> StagedPipeline
//!                     |
//!                     +-- StageRegistry (layout, routing, translation, ...)
//!                     +-- default factories (wide-op reduction,
//!                                            pre-optimization,
//!                                            control-flow check)
//! ```
//!
//! A staged pipeline has seven slots, run in order:
//!
//! | Slot | Present when |
//! |------|--------------|
//! | init | always (control-flow check, then the init method or wide-op reduction) |
//! | layout | connectivity or an initial layout is given |
//! | routing | connectivity or an initial layout is given |
//! | translation | always |
//! | pre_optimization | always (direction fixing only on asymmetric devices) |
//! | optimization | always |
//! | scheduling | always |
//!
//! # Example
//!
//! ```rust
//! use arvak_ir::{Circuit, QubitId};
//! use arvak_preset::{BasisGates, CouplingMap, PresetConfig, StageRegistry, assemble};
//!
//! let config = PresetConfig::new()
//!     .with_coupling_map(CouplingMap::linear(3))
//!     .with_basis_gates(BasisGates::ibm());
//! let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();
//!
//! let mut circuit = Circuit::with_size("toffoli", 3, 0);
//! circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
//! let compiled = pipeline.apply(circuit).unwrap();
//!
//! assert_eq!(compiled.count_ops("ccx"), 0);
//! ```
//!
//! # Custom Stages
//!
//! Register a builder for a stage kind and method name, then select it in
//! the configuration:
//!
//! ```rust
//! use arvak_preset::{PresetConfig, StageKind, StagePipeline, StageRegistry, assemble};
//! use arvak_preset::passes::RemoveResetInZeroState;
//!
//! let mut registry = StageRegistry::with_builtins();
//! registry.register_fn(StageKind::Init, "resets", |_, _| {
//!     Ok(StagePipeline::new().with_pass(RemoveResetInZeroState))
//! });
//!
//! let config = PresetConfig::new().with_init_method("resets");
//! let pipeline = assemble(&config, &registry).unwrap();
//! assert_eq!(
//!     pipeline.init().as_pipeline().unwrap().pass_names(),
//!     vec!["ControlFlowCheck", "RemoveResetInZeroState"]
//! );
//! ```

pub mod assembler;
mod builtins;
pub mod config;
pub mod defaults;
pub mod error;
pub mod manager;
pub mod pass;
pub mod passes;
pub mod registry;
pub mod staged;
pub mod target;

pub use assembler::{PRESET_LEVEL, assemble};
pub use config::PresetConfig;
pub use error::{
    AssembleError, AssembleResult, ConfigError, ResolutionError, StageError, StageResult,
};
pub use manager::StagePipeline;
pub use pass::{Pass, PassKind};
pub use registry::{StageKind, StagePlugin, StageRegistry};
pub use staged::{STAGE_NAMES, StageSlot, StagedPipeline};
pub use target::{BasisGates, CouplingMap, InstructionProperties, MAX_DEVICE_QUBITS, Target};
