//! Gate direction repair for directed couplings.

use arvak_ir::{Circuit, Instruction, IrError};

use crate::error::StageResult;
use crate::pass::{Pass, PassKind};
use crate::target::{CouplingMap, Target};

/// Two-qubit gates whose operands can be exchanged freely.
const SYMMETRIC_GATES: [&str; 5] = ["cz", "swap", "rzz", "rxx", "ryy"];

/// Flips two-qubit gates issued against the available direction.
///
/// Support is read from the target when one is bound, the coupling map
/// otherwise. A `cx` that only exists reversed is wrapped in Hadamards;
/// symmetric gates have their operands exchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateDirection {
    target: Option<Target>,
    coupling_map: Option<CouplingMap>,
}

impl GateDirection {
    /// Create the pass bound to a target and/or coupling map.
    pub fn new(target: Option<Target>, coupling_map: Option<CouplingMap>) -> Self {
        Self {
            target,
            coupling_map,
        }
    }

    fn supported(&self, name: &str, q0: u32, q1: u32) -> bool {
        match (&self.target, &self.coupling_map) {
            (Some(target), _) => target.instruction_supported(name, &[q0, q1]),
            (None, Some(map)) => map.has_edge(q0, q1),
            (None, None) => true,
        }
    }

    fn fix(&self, inst: Instruction, out: &mut Vec<Instruction>) -> StageResult<()> {
        if !inst.is_gate() || inst.num_qubits() != 2 {
            out.push(inst);
            return Ok(());
        }
        let (a, b) = (inst.qubits[0], inst.qubits[1]);
        if self.supported(&inst.name, a.0, b.0) {
            out.push(inst);
            return Ok(());
        }
        if self.supported(&inst.name, b.0, a.0) {
            if inst.name == "cx" {
                out.extend([
                    Instruction::single_qubit_gate("h", a),
                    Instruction::single_qubit_gate("h", b),
                    Instruction::two_qubit_gate("cx", b, a),
                    Instruction::single_qubit_gate("h", a),
                    Instruction::single_qubit_gate("h", b),
                ]);
                return Ok(());
            }
            if SYMMETRIC_GATES.contains(&inst.name.as_str()) {
                out.push(inst.with_qubits([b, a]));
                return Ok(());
            }
        }
        Err(IrError::UnsupportedDirection {
            name: inst.name,
            qubit1: a.0,
            qubit2: b.0,
        }
        .into())
    }
}

impl Pass for GateDirection {
    fn name(&self) -> &'static str {
        "GateDirection"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let mut out = Vec::with_capacity(circuit.num_ops());
        for inst in circuit.take_instructions() {
            self.fix(inst, &mut out)?;
        }
        circuit.set_instructions(out)?;
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit) -> bool {
        self.target.is_some() || self.coupling_map.is_some()
    }
}
