//! Control-flow compatibility check.

use arvak_ir::Circuit;

use crate::error::{ConfigError, StageResult};
use crate::pass::{Pass, PassKind};

/// Rejects circuits with control flow when the chosen methods or the
/// backend cannot handle it.
///
/// Both lists are computed when the pass is built; the pass itself only
/// looks for control-flow instructions. Circuits without control flow
/// always pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlFlowCheck {
    /// `(option, method)` pairs known not to support control flow,
    /// e.g. `("routing_method", "basic")`.
    unsupported_methods: Vec<(String, String)>,
    /// Control-flow operations the backend does not support.
    unsupported_ops: Vec<String>,
}

impl ControlFlowCheck {
    /// Create a check from precomputed incompatibilities.
    pub fn new(unsupported_methods: Vec<(String, String)>, unsupported_ops: Vec<String>) -> Self {
        Self {
            unsupported_methods,
            unsupported_ops,
        }
    }

    /// Check if nothing is incompatible, in which case the pass never fails.
    pub fn is_permissive(&self) -> bool {
        self.unsupported_methods.is_empty() && self.unsupported_ops.is_empty()
    }

    fn message(&self) -> String {
        let mut parts = Vec::new();
        if !self.unsupported_methods.is_empty() {
            let options: Vec<String> = self
                .unsupported_methods
                .iter()
                .map(|(option, method)| format!("{option}='{method}'"))
                .collect();
            parts.push(format!(
                "Some options do not support control flow: {}",
                options.join(", ")
            ));
        }
        if !self.unsupported_ops.is_empty() {
            parts.push(format!(
                "The target does not support control-flow operations: {}",
                self.unsupported_ops.join(", ")
            ));
        }
        parts.join("; ")
    }
}

impl Pass for ControlFlowCheck {
    fn name(&self) -> &'static str {
        "ControlFlowCheck"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        if self.is_permissive() || !circuit.instructions().iter().any(|i| i.is_control_flow()) {
            return Ok(());
        }
        Err(ConfigError::ControlFlowUnsupported(self.message()).into())
    }
}
