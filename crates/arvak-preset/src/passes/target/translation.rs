//! Basis translation through an equivalence-rule table.
//!
//! Each rule rewrites one gate into a short sequence of other gates. A gate
//! is translatable when it is in the basis or some rule for it only uses
//! translatable gates; rules are ranked by the round in which they first
//! become usable, so expansion always moves strictly towards the basis.

use std::collections::BTreeSet;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use arvak_ir::{Circuit, Instruction, IrError, QubitId};
use rustc_hash::FxHashMap;

use crate::error::StageResult;
use crate::pass::{Pass, PassKind};

type Expansion = fn(&[QubitId], &[f64]) -> Vec<Instruction>;

/// One equivalence: `source` on `width` qubits with `num_params` parameters.
struct Rule {
    source: &'static str,
    width: usize,
    num_params: usize,
    uses: &'static [&'static str],
    expand: Expansion,
}

fn g1(name: &str, q: QubitId) -> Instruction {
    Instruction::single_qubit_gate(name, q)
}

fn r1(name: &str, theta: f64, q: QubitId) -> Instruction {
    Instruction::gate(name, [q], [theta])
}

fn g2(name: &str, a: QubitId, b: QubitId) -> Instruction {
    Instruction::two_qubit_gate(name, a, b)
}

#[rustfmt::skip]
const RULES: &[Rule] = &[
    // Single-qubit Cliffords.
    Rule { source: "id", width: 1, num_params: 0, uses: &[], expand: |_, _| vec![] },
    Rule { source: "h", width: 1, num_params: 0, uses: &["rz", "sx"],
        expand: |q, _| vec![r1("rz", FRAC_PI_2, q[0]), g1("sx", q[0]), r1("rz", FRAC_PI_2, q[0])] },
    Rule { source: "h", width: 1, num_params: 0, uses: &["ry", "x"],
        expand: |q, _| vec![r1("ry", FRAC_PI_2, q[0]), g1("x", q[0])] },
    Rule { source: "h", width: 1, num_params: 0, uses: &["u"],
        expand: |q, _| vec![Instruction::gate("u", [q[0]], [FRAC_PI_2, 0.0, PI])] },
    Rule { source: "x", width: 1, num_params: 0, uses: &["sx"],
        expand: |q, _| vec![g1("sx", q[0]), g1("sx", q[0])] },
    Rule { source: "x", width: 1, num_params: 0, uses: &["rx"],
        expand: |q, _| vec![r1("rx", PI, q[0])] },
    Rule { source: "y", width: 1, num_params: 0, uses: &["ry"],
        expand: |q, _| vec![r1("ry", PI, q[0])] },
    Rule { source: "y", width: 1, num_params: 0, uses: &["rz", "x"],
        expand: |q, _| vec![r1("rz", PI, q[0]), g1("x", q[0])] },
    Rule { source: "z", width: 1, num_params: 0, uses: &["rz"],
        expand: |q, _| vec![r1("rz", PI, q[0])] },
    Rule { source: "s", width: 1, num_params: 0, uses: &["rz"],
        expand: |q, _| vec![r1("rz", FRAC_PI_2, q[0])] },
    Rule { source: "sdg", width: 1, num_params: 0, uses: &["rz"],
        expand: |q, _| vec![r1("rz", -FRAC_PI_2, q[0])] },
    Rule { source: "t", width: 1, num_params: 0, uses: &["rz"],
        expand: |q, _| vec![r1("rz", FRAC_PI_4, q[0])] },
    Rule { source: "tdg", width: 1, num_params: 0, uses: &["rz"],
        expand: |q, _| vec![r1("rz", -FRAC_PI_4, q[0])] },
    Rule { source: "sx", width: 1, num_params: 0, uses: &["rx"],
        expand: |q, _| vec![r1("rx", FRAC_PI_2, q[0])] },
    Rule { source: "sxdg", width: 1, num_params: 0, uses: &["rx"],
        expand: |q, _| vec![r1("rx", -FRAC_PI_2, q[0])] },
    // Rotations.
    Rule { source: "rx", width: 1, num_params: 1, uses: &["h", "rz"],
        expand: |q, p| vec![g1("h", q[0]), r1("rz", p[0], q[0]), g1("h", q[0])] },
    Rule { source: "rx", width: 1, num_params: 1, uses: &["prx"],
        expand: |q, p| vec![Instruction::gate("prx", [q[0]], [p[0], 0.0])] },
    Rule { source: "ry", width: 1, num_params: 1, uses: &["sdg", "rx", "s"],
        expand: |q, p| vec![g1("sdg", q[0]), r1("rx", p[0], q[0]), g1("s", q[0])] },
    Rule { source: "ry", width: 1, num_params: 1, uses: &["prx"],
        expand: |q, p| vec![Instruction::gate("prx", [q[0]], [p[0], FRAC_PI_2])] },
    Rule { source: "rz", width: 1, num_params: 1, uses: &["p"],
        expand: |q, p| vec![r1("p", p[0], q[0])] },
    Rule { source: "rz", width: 1, num_params: 1, uses: &["rx", "ry"],
        expand: |q, p| vec![r1("rx", -FRAC_PI_2, q[0]), r1("ry", p[0], q[0]), r1("rx", FRAC_PI_2, q[0])] },
    Rule { source: "p", width: 1, num_params: 1, uses: &["rz"],
        expand: |q, p| vec![r1("rz", p[0], q[0])] },
    Rule { source: "u", width: 1, num_params: 3, uses: &["rz", "ry"],
        expand: |q, p| vec![r1("rz", p[2], q[0]), r1("ry", p[0], q[0]), r1("rz", p[1], q[0])] },
    Rule { source: "prx", width: 1, num_params: 2, uses: &["rz", "rx"],
        expand: |q, p| vec![r1("rz", -p[1], q[0]), r1("rx", p[0], q[0]), r1("rz", p[1], q[0])] },
    // Two-qubit gates.
    Rule { source: "cx", width: 2, num_params: 0, uses: &["h", "cz"],
        expand: |q, _| vec![g1("h", q[1]), g2("cz", q[0], q[1]), g1("h", q[1])] },
    Rule { source: "cz", width: 2, num_params: 0, uses: &["h", "cx"],
        expand: |q, _| vec![g1("h", q[1]), g2("cx", q[0], q[1]), g1("h", q[1])] },
    Rule { source: "cy", width: 2, num_params: 0, uses: &["sdg", "cx", "s"],
        expand: |q, _| vec![g1("sdg", q[1]), g2("cx", q[0], q[1]), g1("s", q[1])] },
    Rule { source: "swap", width: 2, num_params: 0, uses: &["cx"],
        expand: |q, _| vec![g2("cx", q[0], q[1]), g2("cx", q[1], q[0]), g2("cx", q[0], q[1])] },
    Rule { source: "rzz", width: 2, num_params: 1, uses: &["cx", "rz"],
        expand: |q, p| vec![g2("cx", q[0], q[1]), r1("rz", p[0], q[1]), g2("cx", q[0], q[1])] },
    Rule { source: "cp", width: 2, num_params: 1, uses: &["p", "cx"],
        expand: |q, p| vec![
            r1("p", p[0] / 2.0, q[0]), g2("cx", q[0], q[1]), r1("p", -p[0] / 2.0, q[1]),
            g2("cx", q[0], q[1]), r1("p", p[0] / 2.0, q[1]),
        ] },
    Rule { source: "crz", width: 2, num_params: 1, uses: &["rz", "cx"],
        expand: |q, p| vec![
            r1("rz", p[0] / 2.0, q[1]), g2("cx", q[0], q[1]),
            r1("rz", -p[0] / 2.0, q[1]), g2("cx", q[0], q[1]),
        ] },
];

/// Basis translation pass.
///
/// Rewrites every gate outside the basis using the equivalence rules.
/// The basis is the target's operation names when a target is given,
/// the native gate set otherwise; with neither the pass does nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasisTranslation {
    basis: Option<BTreeSet<String>>,
}

impl BasisTranslation {
    /// Create the pass for a set of gate names. The default pass has no
    /// basis and leaves circuits unchanged.
    pub fn new(basis: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            basis: Some(basis.into_iter().map(Into::into).collect()),
        }
    }

    /// Round in which each gate first becomes expressible; basis gates are 0.
    fn levels(basis: &BTreeSet<String>) -> FxHashMap<&'static str, usize> {
        let mut levels: FxHashMap<&'static str, usize> = FxHashMap::default();
        let known = |levels: &FxHashMap<&'static str, usize>, name: &str| {
            basis.contains(name) || levels.contains_key(name)
        };
        for round in 1.. {
            let newly: Vec<&'static str> = RULES
                .iter()
                .filter(|r| !known(&levels, r.source))
                .filter(|r| r.uses.iter().all(|u| known(&levels, u)))
                .map(|r| r.source)
                .collect();
            if newly.is_empty() {
                break;
            }
            for name in newly {
                levels.entry(name).or_insert(round);
            }
        }
        levels
    }

    fn expand(
        &self,
        basis: &BTreeSet<String>,
        levels: &FxHashMap<&'static str, usize>,
        inst: Instruction,
        out: &mut Vec<Instruction>,
    ) -> StageResult<()> {
        if !inst.is_gate() || basis.contains(&inst.name) {
            out.push(inst);
            return Ok(());
        }
        let level_of = |name: &str| {
            if basis.contains(name) {
                Some(0)
            } else {
                levels.get(name).copied()
            }
        };
        let own = level_of(&inst.name).ok_or_else(|| IrError::NotInBasis(inst.name.clone()))?;
        let rule = RULES
            .iter()
            .filter(|r| {
                r.source == inst.name
                    && r.width == inst.num_qubits()
                    && r.num_params == inst.params.len()
            })
            .find(|r| r.uses.iter().all(|u| level_of(u).is_some_and(|l| l < own)))
            .ok_or_else(|| IrError::NotInBasis(inst.name.clone()))?;

        for step in (rule.expand)(&inst.qubits, &inst.params) {
            self.expand(basis, levels, step, out)?;
        }
        Ok(())
    }
}

impl Pass for BasisTranslation {
    fn name(&self) -> &'static str {
        "BasisTranslation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let Some(basis) = &self.basis else {
            return Ok(());
        };
        let levels = Self::levels(basis);
        let mut out = Vec::with_capacity(circuit.num_ops());
        for inst in circuit.take_instructions() {
            self.expand(basis, &levels, inst, &mut out)?;
        }
        circuit.set_instructions(out)?;
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit) -> bool {
        self.basis.is_some()
    }
}
