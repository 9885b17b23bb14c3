//! Peephole optimization passes.

use arvak_ir::{Circuit, Instruction};
use tracing::debug;

use crate::error::StageResult;
use crate::manager::StagePipeline;
use crate::pass::{Pass, PassKind};

/// Tolerance for angle comparisons.
const EPSILON: f64 = 1e-10;

const SELF_INVERSE: [&str; 9] = ["id", "x", "y", "z", "h", "cx", "cy", "cz", "swap"];
const INVERSE_PAIRS: [(&str, &str); 3] = [("s", "sdg"), ("t", "tdg"), ("sx", "sxdg")];
const MERGEABLE_ROTATIONS: [&str; 9] = ["rx", "ry", "rz", "p", "rxx", "ryy", "rzz", "cp", "crz"];
const SYMMETRIC_GATES: [&str; 5] = ["cz", "swap", "rzz", "rxx", "ryy"];

/// Outcome of combining two adjacent instructions.
enum Combined {
    /// Leave both in place.
    Keep,
    /// Both vanish.
    Cancel,
    /// Replace both by one instruction.
    Merge(Instruction),
}

/// Check that two instructions act on the same qubits, ignoring order for
/// symmetric gates.
fn same_operands(a: &Instruction, b: &Instruction) -> bool {
    if a.qubits == b.qubits {
        return true;
    }
    SYMMETRIC_GATES.contains(&a.name.as_str())
        && a.qubits.len() == 2
        && b.qubits.len() == 2
        && a.qubits[0] == b.qubits[1]
        && a.qubits[1] == b.qubits[0]
}

/// Walk the circuit once, combining each gate with the instruction directly
/// before it on all of its qubits.
///
/// Returns the number of rewrites applied.
fn peephole(
    circuit: &mut Circuit,
    combine: impl Fn(&Instruction, &Instruction) -> Combined,
) -> StageResult<usize> {
    let mut out: Vec<Option<Instruction>> = Vec::with_capacity(circuit.num_ops());
    // Per qubit, the indices into `out` of live instructions on that wire.
    let mut wires: Vec<Vec<usize>> = vec![vec![]; circuit.num_qubits() as usize];
    let mut rewrites = 0;

    for inst in circuit.take_instructions() {
        let previous = if inst.is_gate() && inst.clbits.is_empty() && !inst.qubits.is_empty() {
            let tops: Vec<Option<usize>> = inst
                .qubits
                .iter()
                .map(|q| wires[q.0 as usize].last().copied())
                .collect();
            match tops[0] {
                Some(k) if tops.iter().all(|t| *t == Some(k)) => Some(k),
                _ => None,
            }
        } else {
            None
        };

        if let Some(k) = previous {
            let action = match &out[k] {
                Some(prev) if prev.is_gate() && prev.qubits.len() == inst.qubits.len() => {
                    combine(prev, &inst)
                }
                _ => Combined::Keep,
            };
            match action {
                Combined::Keep => {}
                Combined::Cancel => {
                    for q in &inst.qubits {
                        wires[q.0 as usize].pop();
                    }
                    out[k] = None;
                    rewrites += 1;
                    continue;
                }
                Combined::Merge(merged) => {
                    out[k] = Some(merged);
                    rewrites += 1;
                    continue;
                }
            }
        }

        let index = out.len();
        for q in &inst.qubits {
            wires[q.0 as usize].push(index);
        }
        out.push(Some(inst));
    }

    circuit.set_instructions(out.into_iter().flatten().collect())?;
    Ok(rewrites)
}

/// Cancels adjacent pairs of mutually inverse gates (`h h`, `cx cx`,
/// `t tdg`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelInverses;

impl CancelInverses {
    fn are_inverse(a: &Instruction, b: &Instruction) -> bool {
        if !same_operands(a, b) {
            return false;
        }
        if a.name == b.name && SELF_INVERSE.contains(&a.name.as_str()) {
            return a.qubits == b.qubits || SYMMETRIC_GATES.contains(&a.name.as_str());
        }
        a.qubits == b.qubits
            && INVERSE_PAIRS
                .iter()
                .any(|&(x, y)| (a.name == x && b.name == y) || (a.name == y && b.name == x))
    }
}

impl Pass for CancelInverses {
    fn name(&self) -> &'static str {
        "CancelInverses"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let cancelled = peephole(circuit, |a, b| {
            if Self::are_inverse(a, b) {
                Combined::Cancel
            } else {
                Combined::Keep
            }
        })?;
        debug!("Cancelled {} inverse pairs", cancelled);
        Ok(())
    }
}

/// Merges adjacent rotations about the same axis, dropping those that sum
/// to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeRotations;

impl Pass for MergeRotations {
    fn name(&self) -> &'static str {
        "MergeRotations"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let merged = peephole(circuit, |a, b| {
            let mergeable = a.name == b.name
                && MERGEABLE_ROTATIONS.contains(&a.name.as_str())
                && same_operands(a, b)
                && a.params.len() == 1
                && b.params.len() == 1;
            if !mergeable {
                return Combined::Keep;
            }
            let angle = a.params[0] + b.params[0];
            if angle.abs() < EPSILON {
                Combined::Cancel
            } else {
                Combined::Merge(Instruction::gate(a.name.clone(), a.qubits.clone(), [angle]))
            }
        })?;
        debug!("Merged {} rotation pairs", merged);
        Ok(())
    }
}

/// Repeats a pipeline until the circuit stops shrinking.
///
/// Each round compares `(depth, ops)` before and after; the loop ends as
/// soon as neither decreases, or after `max_iterations` rounds.
#[derive(Debug, Clone)]
pub struct OptimizationLoop {
    body: StagePipeline,
    max_iterations: usize,
}

impl OptimizationLoop {
    /// Default round limit.
    pub const DEFAULT_MAX_ITERATIONS: usize = 20;

    /// Loop over `body` with the default round limit.
    pub fn new(body: StagePipeline) -> Self {
        Self {
            body,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the round limit.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Pass for OptimizationLoop {
    fn name(&self) -> &'static str {
        "OptimizationLoop"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let mut size = (circuit.depth(), circuit.num_ops());
        for round in 0..self.max_iterations {
            self.body.run(circuit)?;
            let next = (circuit.depth(), circuit.num_ops());
            if next.0 >= size.0 && next.1 >= size.1 {
                debug!("Optimization reached a fixed point after {} rounds", round + 1);
                return Ok(());
            }
            size = next;
        }
        Ok(())
    }
}
