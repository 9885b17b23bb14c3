//! Decomposition of operations spanning three or more qubits.

use arvak_ir::{Circuit, Instruction, IrError, QubitId};
use serde_json::Value;

use crate::error::StageResult;
use crate::pass::{Pass, PassKind};
use crate::target::{BasisGates, Target};

/// Synthesis settings carried by the wide-operation reduction.
///
/// The built-in decompositions are exact, so these only travel with the
/// pass; they make two reductions built from different settings compare
/// unequal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisSettings {
    /// Approximation tolerance, `None` for exact synthesis.
    pub approximation_degree: Option<f64>,
    /// Unitary synthesis method.
    pub method: String,
    /// Opaque settings for the synthesis plugin.
    pub plugin_config: Value,
    /// Opaque high-level synthesis settings.
    pub hls_config: Value,
}

/// Rewrites every operation on three or more qubits into one- and
/// two-qubit gates.
///
/// Operations the target (or, without a target, the basis) supports
/// natively are kept, as are barriers and control-flow constructs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unroll3qOrMore {
    target: Option<Target>,
    basis_gates: Option<BasisGates>,
    settings: SynthesisSettings,
}

impl Unroll3qOrMore {
    /// Create the pass.
    pub fn new(
        target: Option<Target>,
        basis_gates: Option<BasisGates>,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            target,
            basis_gates,
            settings,
        }
    }

    /// The synthesis settings this pass was built with.
    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    fn is_native(&self, name: &str) -> bool {
        match (&self.target, &self.basis_gates) {
            (Some(target), _) => target.contains_operation(name),
            (None, Some(basis)) => basis.contains(name),
            (None, None) => false,
        }
    }

    fn unroll(&self, inst: Instruction, out: &mut Vec<Instruction>) -> StageResult<()> {
        if inst.num_qubits() < 3
            || inst.is_barrier()
            || inst.is_control_flow()
            || self.is_native(&inst.name)
        {
            out.push(inst);
            return Ok(());
        }

        let q = &inst.qubits;
        match (inst.name.as_str(), q.len()) {
            ("ccx", 3) => toffoli(q[0], q[1], q[2], out),
            ("ccz", 3) => {
                out.push(h(q[2]));
                toffoli(q[0], q[1], q[2], out);
                out.push(h(q[2]));
            }
            ("cswap", 3) => {
                out.push(cx(q[2], q[1]));
                toffoli(q[0], q[1], q[2], out);
                out.push(cx(q[2], q[1]));
            }
            (name, width) => {
                return Err(IrError::NoDecomposition {
                    name: name.to_string(),
                    width,
                }
                .into());
            }
        }
        Ok(())
    }
}

fn h(q: QubitId) -> Instruction {
    Instruction::single_qubit_gate("h", q)
}

fn t(q: QubitId) -> Instruction {
    Instruction::single_qubit_gate("t", q)
}

fn tdg(q: QubitId) -> Instruction {
    Instruction::single_qubit_gate("tdg", q)
}

fn cx(control: QubitId, target: QubitId) -> Instruction {
    Instruction::two_qubit_gate("cx", control, target)
}

/// Six-CNOT Toffoli.
fn toffoli(a: QubitId, b: QubitId, c: QubitId, out: &mut Vec<Instruction>) {
    out.extend([
        h(c),
        cx(b, c),
        tdg(c),
        cx(a, c),
        t(c),
        cx(b, c),
        tdg(c),
        cx(a, c),
        t(b),
        t(c),
        h(c),
        cx(a, b),
        t(a),
        tdg(b),
        cx(a, b),
    ]);
}

impl Pass for Unroll3qOrMore {
    fn name(&self) -> &'static str {
        "Unroll3qOrMore"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let mut out = Vec::with_capacity(circuit.num_ops());
        for inst in circuit.take_instructions() {
            self.unroll(inst, &mut out)?;
        }
        circuit.set_instructions(out)?;
        Ok(())
    }

    fn should_run(&self, circuit: &Circuit) -> bool {
        circuit.max_width() >= 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;

    #[test]
    fn test_toffoli_unrolled() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        Unroll3qOrMore::default().run(&mut circuit).unwrap();

        assert_eq!(circuit.max_width(), 2);
        assert_eq!(circuit.count_ops("cx"), 6);
        assert_eq!(circuit.num_ops(), 15);
    }

    #[test]
    fn test_cswap_unrolled() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cswap(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        Unroll3qOrMore::default().run(&mut circuit).unwrap();
        assert_eq!(circuit.count_ops("cx"), 8);
        assert_eq!(circuit.max_width(), 2);
    }

    #[test]
    fn test_native_wide_gate_kept() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        let pass = Unroll3qOrMore::new(
            None,
            Some(BasisGates::universal()),
            SynthesisSettings::default(),
        );
        pass.run(&mut circuit).unwrap();
        assert_eq!(circuit.count_ops("ccx"), 1);
    }

    #[test]
    fn test_barrier_and_control_flow_kept() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit
            .barrier([QubitId(0), QubitId(1), QubitId(2), QubitId(3)])
            .unwrap();
        circuit
            .control_flow("while_loop", [QubitId(0), QubitId(1), QubitId(2)], [])
            .unwrap();

        Unroll3qOrMore::default().run(&mut circuit).unwrap();
        assert_eq!(circuit.num_ops(), 2);
    }

    #[test]
    fn test_unknown_wide_gate_fails() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit
            .gate("mcx", [QubitId(0), QubitId(1), QubitId(2), QubitId(3)], [])
            .unwrap();

        let err = Unroll3qOrMore::default().run(&mut circuit).unwrap_err();
        assert_eq!(
            err,
            StageError::Ir(IrError::NoDecomposition {
                name: "mcx".into(),
                width: 4
            })
        );
    }

    #[test]
    fn test_settings_affect_equality() {
        let exact = Unroll3qOrMore::default();
        let approx = Unroll3qOrMore::new(
            None,
            None,
            SynthesisSettings {
                approximation_degree: Some(0.9),
                ..SynthesisSettings::default()
            },
        );
        assert_ne!(exact, approx);
        assert_eq!(approx.settings().approximation_degree, Some(0.9));
    }
}
