//! Removal of resets acting on freshly initialized qubits.

use arvak_ir::Circuit;
use rustc_hash::FxHashSet;

use crate::error::StageResult;
use crate::pass::{Pass, PassKind};

/// Removes every `reset` that is the first instruction on its qubit.
///
/// Qubits start in |0⟩, so such a reset has no effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveResetInZeroState;

impl Pass for RemoveResetInZeroState {
    fn name(&self) -> &'static str {
        "RemoveResetInZeroState"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let mut touched = FxHashSet::default();
        let instructions: Vec<_> = circuit
            .take_instructions()
            .into_iter()
            .filter(|inst| {
                let leading_reset = inst.is_reset()
                    && inst.qubits.first().is_some_and(|q| !touched.contains(q));
                touched.extend(inst.qubits.iter().copied());
                !leading_reset
            })
            .collect();
        circuit.set_instructions(instructions)?;
        Ok(())
    }

    fn should_run(&self, circuit: &Circuit) -> bool {
        circuit.count_ops("reset") > 0
    }
}
