//! Error types for pipeline assembly and stage execution.

use arvak_ir::{IrError, QubitId};
use thiserror::Error;

use crate::registry::StageKind;

/// The configuration is invalid or internally contradictory.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Approximation degree outside `[0, 1]`.
    #[error("Approximation degree must be within [0, 1], got {0}")]
    InvalidApproximationDegree(f64),

    /// A method name was given but is empty.
    #[error("Empty method name for the {0} stage")]
    EmptyMethodName(StageKind),

    /// The initial layout places a qubit outside the device.
    #[error(
        "Initial layout maps {virtual_qubit} to physical qubit {physical}, but the device has {num_qubits} qubits"
    )]
    LayoutOutOfRange {
        /// Virtual qubit being placed.
        virtual_qubit: QubitId,
        /// Requested physical position.
        physical: u32,
        /// Device size.
        num_qubits: u32,
    },

    /// The coupling map links a qubit to itself.
    #[error("Coupling map has a self-loop on qubit {0}")]
    SelfLoop(u32),

    /// The device description is larger than the supported maximum.
    #[error("Device with {requested} qubits exceeds the limit of {limit}")]
    DeviceTooLarge {
        /// Qubit count implied by the description.
        requested: u64,
        /// Largest supported device.
        limit: u32,
    },

    /// A target operation is defined on a qubit the device does not have.
    #[error("Target operation '{operation}' uses qubit {qubit} on a device with {num_qubits} qubits")]
    TargetQubitOutOfRange {
        /// Name of the operation.
        operation: String,
        /// Offending qubit.
        qubit: u32,
        /// Device size.
        num_qubits: u32,
    },

    /// A registered stage builder needs something the configuration lacks.
    #[error("{kind} method '{method}' requires {requirement}")]
    MissingRequirement {
        /// Stage kind of the builder.
        kind: StageKind,
        /// Method name of the builder.
        method: String,
        /// What is missing.
        requirement: &'static str,
    },

    /// Control flow is present but a selected method or the backend cannot handle it.
    #[error("{0}")]
    ControlFlowUnsupported(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(String),

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// No stage is registered for a stage kind and method name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No {kind} stage registered for method '{method}' (available: {})", format_available(.available))]
pub struct ResolutionError {
    /// Stage kind that was looked up.
    pub kind: StageKind,
    /// Method name that was requested.
    pub method: String,
    /// Methods registered for this kind, sorted.
    pub available: Vec<String>,
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

/// Errors that abort pipeline assembly.
///
/// Assembly is all-or-nothing: no partially built pipeline is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum AssembleError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unknown method name.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Errors raised while a stage runs over a circuit.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum StageError {
    /// Structural mismatch between the circuit and a pass. Passed through unchanged.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Raised by the validation stage when options conflict with the circuit.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for assembly operations.
pub type AssembleResult<T> = Result<T, AssembleError>;

/// Result type for stage execution.
pub type StageResult<T> = Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_message() {
        let err = ResolutionError {
            kind: StageKind::Routing,
            method: "lookahead".into(),
            available: vec!["basic".into(), "sabre".into()],
        };
        assert_eq!(
            err.to_string(),
            "No routing stage registered for method 'lookahead' (available: basic, sabre)"
        );
    }

    #[test]
    fn test_ir_error_passes_through() {
        let ir = IrError::NotInBasis("ccx".into());
        let err = StageError::from(ir.clone());
        assert_eq!(err.to_string(), ir.to_string());
        assert_eq!(err, StageError::Ir(ir));
    }
}
