//! Arvak Circuit Representation
//!
//! This crate provides the circuit type that compilation stages consume and
//! produce. It is deliberately small: a circuit is a list of named
//! instructions over numbered qubits and classical bits, plus the layout and
//! schedule metadata that stages record along the way.
//!
//! # Core Components
//!
//! - [`QubitId`], [`ClbitId`]: operand identifiers
//! - [`Instruction`]: an operation name with its operands and parameters
//! - [`Circuit`]: the ordered instruction list with builder helpers
//! - [`Layout`]: virtual-to-physical qubit mapping
//! - [`IrError`]: structural mismatch errors
//!
//! # Example
//!
//! ```rust
//! use arvak_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("toffoli", 3, 0);
//! circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
//!
//! assert_eq!(circuit.max_width(), 3);
//! ```

pub mod circuit;
pub mod error;
pub mod instruction;
pub mod layout;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use instruction::{CONTROL_FLOW_OP_NAMES, Instruction};
pub use layout::Layout;
pub use qubit::{ClbitId, QubitId};
