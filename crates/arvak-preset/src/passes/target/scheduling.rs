//! Start-time scheduling.

use arvak_ir::{Circuit, Instruction};

use crate::error::StageResult;
use crate::pass::{Pass, PassKind};
use crate::target::Target;

/// When instructions are started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingPolicy {
    /// As soon as all operands are free.
    Asap,
    /// As late as possible without delaying the end of the circuit.
    Alap,
}

/// Assigns a start time to every instruction.
///
/// Durations come from the target when calibrated; otherwise every
/// instruction takes one time unit, barriers take none and delays take
/// their own length. Classical bits serialize measurements and
/// control flow that share them.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    policy: SchedulingPolicy,
    target: Option<Target>,
}

impl Schedule {
    /// Create the pass.
    pub fn new(policy: SchedulingPolicy, target: Option<Target>) -> Self {
        Self { policy, target }
    }

    fn duration(&self, inst: &Instruction) -> f64 {
        if inst.is_barrier() {
            return 0.0;
        }
        if inst.name == "delay" {
            return inst.params.first().copied().unwrap_or(0.0);
        }
        let qargs: Vec<u32> = inst.qubits.iter().map(|q| q.0).collect();
        self.target
            .as_ref()
            .and_then(|t| t.duration(&inst.name, &qargs))
            .unwrap_or(1.0)
    }

    /// Earliest start of each instruction when walking `order`.
    fn earliest<'a>(
        &self,
        circuit: &Circuit,
        order: impl Iterator<Item = &'a Instruction>,
    ) -> Vec<(f64, f64)> {
        let mut qubit_free = vec![0.0_f64; circuit.num_qubits() as usize];
        let mut clbit_free = vec![0.0_f64; circuit.num_clbits() as usize];
        order
            .map(|inst| {
                let start = inst
                    .qubits
                    .iter()
                    .map(|q| qubit_free[q.0 as usize])
                    .chain(inst.clbits.iter().map(|c| clbit_free[c.0 as usize]))
                    .fold(0.0, f64::max);
                let end = start + self.duration(inst);
                for q in &inst.qubits {
                    qubit_free[q.0 as usize] = end;
                }
                for c in &inst.clbits {
                    clbit_free[c.0 as usize] = end;
                }
                (start, end)
            })
            .collect()
    }
}

impl Pass for Schedule {
    fn name(&self) -> &'static str {
        match self.policy {
            SchedulingPolicy::Asap => "AsapSchedule",
            SchedulingPolicy::Alap => "AlapSchedule",
        }
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let times = match self.policy {
            SchedulingPolicy::Asap => self
                .earliest(circuit, circuit.instructions().iter())
                .into_iter()
                .map(|(start, _)| start)
                .collect(),
            SchedulingPolicy::Alap => {
                let mut reversed = self.earliest(circuit, circuit.instructions().iter().rev());
                reversed.reverse();
                let makespan = reversed.iter().map(|&(_, end)| end).fold(0.0, f64::max);
                reversed
                    .into_iter()
                    .map(|(_, end)| makespan - end)
                    .collect()
            }
        };
        circuit.set_start_times(times)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::InstructionProperties;
    use arvak_ir::QubitId;

    fn sample() -> Circuit {
        // q0: h ─ cx ─
        // q1: ─── cx ─ x
        // q2: x ───────
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.x(QubitId(1)).unwrap();
        circuit.x(QubitId(2)).unwrap();
        circuit
    }

    #[test]
    fn test_asap_unit_durations() {
        let mut circuit = sample();
        Schedule::new(SchedulingPolicy::Asap, None)
            .run(&mut circuit)
            .unwrap();
        assert_eq!(circuit.start_times().unwrap(), &[0.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_alap_unit_durations() {
        let mut circuit = sample();
        Schedule::new(SchedulingPolicy::Alap, None)
            .run(&mut circuit)
            .unwrap();
        // The lone x on q2 is pushed to the last slot.
        assert_eq!(circuit.start_times().unwrap(), &[0.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_target_durations() {
        let mut target = Target::new(3);
        target.add_operation_with_properties(
            "cx",
            vec![InstructionProperties::on([0, 1]).with_duration(5.0)],
        );
        let mut circuit = sample();
        Schedule::new(SchedulingPolicy::Asap, Some(target))
            .run(&mut circuit)
            .unwrap();
        assert_eq!(circuit.start_times().unwrap(), &[0.0, 1.0, 6.0, 0.0]);
    }

    #[test]
    fn test_barrier_synchronizes() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.barrier([QubitId(0), QubitId(1)]).unwrap();
        circuit.x(QubitId(1)).unwrap();
        Schedule::new(SchedulingPolicy::Asap, None)
            .run(&mut circuit)
            .unwrap();
        assert_eq!(circuit.start_times().unwrap(), &[0.0, 1.0, 1.0]);
    }
}
