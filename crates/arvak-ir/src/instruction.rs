//! Circuit instructions combining an operation name with its operands.

use serde::{Deserialize, Serialize};

use crate::qubit::{ClbitId, QubitId};

/// Names of the control-flow constructs.
pub const CONTROL_FLOW_OP_NAMES: [&str; 4] = ["if_else", "while_loop", "for_loop", "switch_case"];

/// A single operation applied to a list of qubits.
///
/// Operations are identified by name (`"h"`, `"cx"`, `"measure"`, ...).
/// Gate parameters are plain angles; symbolic parameters must be bound
/// before compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Operation name.
    pub name: String,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction reads or writes.
    #[serde(default)]
    pub clbits: Vec<ClbitId>,
    /// Numeric parameters (angles, or the duration of a delay).
    #[serde(default)]
    pub params: Vec<f64>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        params: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self {
            name: name.into(),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
            params: params.into_iter().collect(),
        }
    }

    /// Create a parameterless single-qubit gate.
    pub fn single_qubit_gate(name: impl Into<String>, qubit: QubitId) -> Self {
        Self::gate(name, [qubit], [])
    }

    /// Create a parameterless two-qubit gate.
    pub fn two_qubit_gate(name: impl Into<String>, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(name, [q1, q2], [])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            name: "measure".into(),
            qubits: vec![qubit],
            clbits: vec![clbit],
            params: vec![],
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self::single_qubit_gate("reset", qubit)
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self::gate("barrier", qubits, [])
    }

    /// Create a delay instruction.
    #[allow(clippy::cast_precision_loss)]
    pub fn delay(qubit: QubitId, duration: u64) -> Self {
        Self::gate("delay", [qubit], [duration as f64])
    }

    /// Create a control-flow instruction (`if_else`, `while_loop`, ...).
    ///
    /// The body is opaque to the compiler; only its footprint on qubits and
    /// classical bits is recorded.
    pub fn control_flow(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        clbits: impl IntoIterator<Item = ClbitId>,
    ) -> Self {
        Self {
            name: name.into(),
            qubits: qubits.into_iter().collect(),
            clbits: clbits.into_iter().collect(),
            params: vec![],
        }
    }

    /// Get the operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubits this instruction spans.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        self.name == "measure"
    }

    /// Check if this is a reset.
    pub fn is_reset(&self) -> bool {
        self.name == "reset"
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        self.name == "barrier"
    }

    /// Check if this is a control-flow construct.
    pub fn is_control_flow(&self) -> bool {
        CONTROL_FLOW_OP_NAMES.contains(&self.name.as_str())
    }

    /// Check if this is a unitary gate (not a directive, measurement,
    /// reset, delay or control-flow construct).
    pub fn is_gate(&self) -> bool {
        !(self.is_measure()
            || self.is_reset()
            || self.is_barrier()
            || self.is_control_flow()
            || self.name == "delay")
    }

    /// Return a copy acting on different qubits.
    #[must_use]
    pub fn with_qubits(&self, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            qubits: qubits.into_iter().collect(),
            ..self.clone()
        }
    }
}
