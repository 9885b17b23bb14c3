//! Error types for the IR crate.
//!
//! Every variant describes a structural mismatch between a circuit and what
//! an operation on it expects. Compilation stages surface these unchanged.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Structural mismatch errors raised by IR operations and compilation passes.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index is not part of the circuit.
    #[error("Qubit {qubit} out of range for circuit with {num_qubits} qubits{}", format_gate_context(.gate_name))]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Number of qubits in the circuit.
        num_qubits: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit index is not part of the circuit.
    #[error("Classical bit {clbit} out of range for circuit with {num_clbits} bits")]
    ClbitOutOfRange {
        /// The offending classical bit.
        clbit: ClbitId,
        /// Number of classical bits in the circuit.
        num_clbits: u32,
    },

    /// The same qubit appears twice in one operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Operation has the wrong number of operands.
    #[error("'{name}' expects {expected} qubit(s), got {found}")]
    WrongArity {
        /// Name of the operation.
        name: String,
        /// Number of qubits the operation acts on.
        expected: usize,
        /// Number of qubits supplied.
        found: usize,
    },

    /// No rule exists to expand an operation into narrower operations.
    #[error("Cannot decompose '{name}' acting on {width} qubits into 1- and 2-qubit operations")]
    NoDecomposition {
        /// Name of the operation.
        name: String,
        /// Number of qubits it spans.
        width: usize,
    },

    /// Operation cannot be expressed in the target basis.
    #[error("Gate '{0}' cannot be translated to the target basis")]
    NotInBasis(String),

    /// Two-qubit interaction cannot be realized on the device connectivity.
    #[error("Cannot route '{name}' between physical qubits {qubit1} and {qubit2}")]
    Unroutable {
        /// Name of the operation.
        name: String,
        /// First physical qubit.
        qubit1: u32,
        /// Second physical qubit.
        qubit2: u32,
    },

    /// Layout does not fit the circuit or the device.
    #[error("Layout mismatch: {0}")]
    LayoutMismatch(String),

    /// Operation is not available in either direction on a qubit pair.
    #[error("Gate '{name}' is not supported on ({qubit1}, {qubit2}) in either direction")]
    UnsupportedDirection {
        /// Name of the operation.
        name: String,
        /// First physical qubit.
        qubit1: u32,
        /// Second physical qubit.
        qubit2: u32,
    },
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
