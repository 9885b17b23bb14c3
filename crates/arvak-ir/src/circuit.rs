//! Circuit container and builder API.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::Instruction;
use crate::layout::Layout;
use crate::qubit::{ClbitId, QubitId};

/// Non-gate operations that always act on exactly one qubit.
const SINGLE_QUBIT_DIRECTIVES: [&str; 3] = ["measure", "reset", "delay"];

/// A quantum circuit as a linear sequence of instructions.
///
/// Instructions are kept in program order. Compilation stages consume a
/// circuit by value and return the transformed circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CircuitRepr")]
pub struct Circuit {
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    instructions: Vec<Instruction>,
    /// Initial virtual-to-physical mapping, set once a layout is applied.
    #[serde(default)]
    layout: Option<Layout>,
    /// Final mapping after routing has permuted qubits.
    #[serde(default)]
    final_layout: Option<Layout>,
    /// Start time of each instruction, set by scheduling.
    #[serde(default)]
    start_times: Option<Vec<f64>>,
}

impl Circuit {
    /// Create an empty circuit with the given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            instructions: vec![],
            layout: None,
            final_layout: None,
            start_times: None,
        }
    }

    /// Append an instruction after checking its operands.
    pub fn push(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.check(&instruction)?;
        self.instructions.push(instruction);
        self.start_times = None;
        Ok(self)
    }

    fn check(&self, instruction: &Instruction) -> IrResult<()> {
        if SINGLE_QUBIT_DIRECTIVES.contains(&instruction.name.as_str())
            && instruction.qubits.len() != 1
        {
            return Err(IrError::WrongArity {
                name: instruction.name.clone(),
                expected: 1,
                found: instruction.qubits.len(),
            });
        }
        let mut seen = rustc_hash::FxHashSet::default();
        for &qubit in &instruction.qubits {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitOutOfRange {
                    qubit,
                    num_qubits: self.num_qubits,
                    gate_name: Some(instruction.name.clone()),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: Some(instruction.name.clone()),
                });
            }
        }
        if let Some(&clbit) = instruction.clbits.iter().find(|c| c.0 >= self.num_clbits) {
            return Err(IrError::ClbitOutOfRange {
                clbit,
                num_clbits: self.num_clbits,
            });
        }
        Ok(())
    }

    /// Every qubit a layout mentions, on either side, exists in the circuit.
    fn check_layout(&self, layout: &Layout) -> IrResult<()> {
        match layout
            .iter()
            .find(|&(v, p)| v.0 >= self.num_qubits || p >= self.num_qubits)
        {
            Some((v, p)) => Err(IrError::LayoutMismatch(format!(
                "{v} -> {p} does not fit a circuit with {} qubits",
                self.num_qubits
            ))),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Gates
    // =========================================================================

    /// Apply a named gate.
    pub fn gate(
        &mut self,
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        params: impl IntoIterator<Item = f64>,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(name, qubits, params))
    }

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate("h", qubit))
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate("x", qubit))
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate("t", qubit))
    }

    /// Apply RZ rotation.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate("rz", [qubit], [theta])
    }

    /// Apply CNOT.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate("cx", control, target))
    }

    /// Apply controlled-Z.
    pub fn cz(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate("cz", q1, q2))
    }

    /// Apply SWAP.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate("swap", q1, q2))
    }

    /// Apply Toffoli.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate("ccx", [c1, c2, target], [])
    }

    /// Apply Fredkin (controlled-SWAP).
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.gate("cswap", [control, t1, t2], [])
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.push(Instruction::measure(qubit, clbit))
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::reset(qubit))
    }

    /// Insert a barrier.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.push(Instruction::barrier(qubits))
    }

    /// Insert a control-flow construct with the given footprint.
    pub fn control_flow(
        &mut self,
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        clbits: impl IntoIterator<Item = ClbitId>,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::control_flow(name, qubits, clbits))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> u32 {
        self.num_clbits
    }

    /// Get the instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn num_ops(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the circuit has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Replace the instruction list, validating every instruction.
    ///
    /// Any schedule is dropped since it no longer matches.
    pub fn set_instructions(&mut self, instructions: Vec<Instruction>) -> IrResult<()> {
        for inst in &instructions {
            self.check(inst)?;
        }
        self.instructions = instructions;
        self.start_times = None;
        Ok(())
    }

    /// Take the instruction list out of the circuit, leaving it empty.
    pub fn take_instructions(&mut self) -> Vec<Instruction> {
        self.start_times = None;
        std::mem::take(&mut self.instructions)
    }

    /// Widen the circuit to `num_qubits` (used when mapping onto a larger device).
    ///
    /// Shrinking is rejected because existing operands could fall out of range.
    pub fn expand_qubits(&mut self, num_qubits: u32) -> IrResult<()> {
        if num_qubits < self.num_qubits {
            return Err(IrError::LayoutMismatch(format!(
                "cannot shrink circuit from {} to {} qubits",
                self.num_qubits, num_qubits
            )));
        }
        self.num_qubits = num_qubits;
        Ok(())
    }

    /// Get the initial layout, if one has been applied.
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// Record the applied initial layout.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = Some(layout);
    }

    /// Get the final layout after routing, if any.
    pub fn final_layout(&self) -> Option<&Layout> {
        self.final_layout.as_ref()
    }

    /// Record the layout reached after routing.
    pub fn set_final_layout(&mut self, layout: Layout) {
        self.final_layout = Some(layout);
    }

    /// Get the scheduled start times, parallel to [`Circuit::instructions`].
    pub fn start_times(&self) -> Option<&[f64]> {
        self.start_times.as_deref()
    }

    /// Record start times for every instruction.
    pub fn set_start_times(&mut self, times: Vec<f64>) -> IrResult<()> {
        if times.len() != self.instructions.len() {
            return Err(IrError::LayoutMismatch(format!(
                "schedule has {} entries for {} instructions",
                times.len(),
                self.instructions.len()
            )));
        }
        self.start_times = Some(times);
        Ok(())
    }

    /// Count instructions with the given name.
    pub fn count_ops(&self, name: &str) -> usize {
        self.instructions.iter().filter(|i| i.name == name).count()
    }

    /// Check whether any instruction has one of the given names.
    pub fn contains_any(&self, names: &[&str]) -> bool {
        self.instructions
            .iter()
            .any(|i| names.contains(&i.name.as_str()))
    }

    /// Widest operation in the circuit, in qubits.
    pub fn max_width(&self) -> usize {
        self.instructions
            .iter()
            .map(Instruction::num_qubits)
            .max()
            .unwrap_or(0)
    }

    /// Circuit depth counting every instruction as one layer on its qubits.
    pub fn depth(&self) -> usize {
        let mut levels = vec![0usize; self.num_qubits as usize];
        for inst in &self.instructions {
            let level = inst
                .qubits
                .iter()
                .map(|q| levels[q.0 as usize])
                .max()
                .unwrap_or(0)
                + 1;
            for q in &inst.qubits {
                levels[q.0 as usize] = level;
            }
        }
        levels.into_iter().max().unwrap_or(0)
    }

    // =========================================================================
    // Common circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?;
        circuit.measure(QubitId(0), ClbitId(0))?;
        circuit.measure(QubitId(1), ClbitId(1))?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit on `n` qubits.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size(format!("ghz_{n}"), n, n);
        if n == 0 {
            return Ok(circuit);
        }
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        for i in 0..n {
            circuit.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(circuit)
    }
}

/// Serialized form of a [`Circuit`], checked before it becomes one.
#[derive(Deserialize)]
struct CircuitRepr {
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    instructions: Vec<Instruction>,
    #[serde(default)]
    layout: Option<Layout>,
    #[serde(default)]
    final_layout: Option<Layout>,
    #[serde(default)]
    start_times: Option<Vec<f64>>,
}

impl TryFrom<CircuitRepr> for Circuit {
    type Error = IrError;

    fn try_from(repr: CircuitRepr) -> IrResult<Self> {
        let mut circuit = Circuit::with_size(repr.name, repr.num_qubits, repr.num_clbits);
        for instruction in repr.instructions {
            circuit.push(instruction)?;
        }
        for layout in repr.layout.iter().chain(&repr.final_layout) {
            circuit.check_layout(layout)?;
        }
        circuit.layout = repr.layout;
        circuit.final_layout = repr.final_layout;
        if let Some(times) = repr.start_times {
            circuit.set_start_times(times)?;
        }
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_with_size() {
        let circuit = Circuit::with_size("test", 5, 3);
        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.num_clbits(), 3);
        assert!(circuit.is_empty());
    }

    #[test]
    fn test_bell_state() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_ops(), 4);
        assert_eq!(circuit.count_ops("measure"), 2);
        assert_eq!(circuit.depth(), 3);
    }

    #[test]
    fn test_ghz_state() {
        let circuit = Circuit::ghz(4).unwrap();
        assert_eq!(circuit.count_ops("cx"), 3);
        assert_eq!(circuit.max_width(), 2);
    }

    #[test]
    fn test_push_rejects_out_of_range() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        let err = circuit.cx(QubitId(0), QubitId(2)).unwrap_err();
        assert!(matches!(err, IrError::QubitOutOfRange { qubit: QubitId(2), .. }));
    }

    #[test]
    fn test_push_rejects_duplicate_qubit() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        let err = circuit
            .ccx(QubitId(0), QubitId(1), QubitId(0))
            .unwrap_err();
        assert!(matches!(err, IrError::DuplicateQubit { .. }));
    }

    #[test]
    fn test_push_rejects_bad_clbit() {
        let mut circuit = Circuit::with_size("test", 1, 1);
        let err = circuit.measure(QubitId(0), ClbitId(1)).unwrap_err();
        assert!(matches!(err, IrError::ClbitOutOfRange { .. }));
    }

    #[test]
    fn test_contains_any_and_width() {
        let mut circuit = Circuit::with_size("test", 3, 1);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        circuit
            .control_flow("if_else", [QubitId(0)], [ClbitId(0)])
            .unwrap();

        assert!(circuit.contains_any(&["while_loop", "if_else"]));
        assert!(!circuit.contains_any(&["for_loop"]));
        assert_eq!(circuit.max_width(), 3);
    }

    #[test]
    fn test_schedule_invalidated_on_push() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.set_start_times(vec![0.0]).unwrap();
        assert!(circuit.start_times().is_some());

        circuit.x(QubitId(0)).unwrap();
        assert!(circuit.start_times().is_none());
        assert!(circuit.set_start_times(vec![0.0]).is_err());
    }

    #[test]
    fn test_expand_qubits() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.expand_qubits(5).unwrap();
        assert_eq!(circuit.num_qubits(), 5);
        assert!(circuit.expand_qubits(3).is_err());
    }

    #[test]
    fn test_push_rejects_operandless_reset() {
        let mut circuit = Circuit::with_size("test", 2, 1);
        let err = circuit
            .push(Instruction::gate("reset", Vec::<QubitId>::new(), []))
            .unwrap_err();
        assert_eq!(
            err,
            IrError::WrongArity {
                name: "reset".into(),
                expected: 1,
                found: 0,
            }
        );
        assert!(circuit.push(Instruction::gate("measure", [QubitId(0), QubitId(1)], [])).is_err());
    }

    #[test]
    fn test_deserialize_round_trip() {
        let mut circuit = Circuit::bell().unwrap();
        circuit.set_layout(Layout::trivial(2));
        circuit.set_start_times(vec![0.0, 1.0, 2.0, 2.0]).unwrap();

        let json = serde_json::to_string(&circuit).unwrap();
        let back: Circuit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, circuit);
    }

    #[test]
    fn test_deserialize_checks_instructions() {
        let empty_reset = r#"{"name":"c","num_qubits":1,"num_clbits":0,
            "instructions":[{"name":"reset","qubits":[]}]}"#;
        let err = serde_json::from_str::<Circuit>(empty_reset).unwrap_err();
        assert!(err.to_string().contains("'reset' expects 1 qubit(s), got 0"));

        let out_of_range = r#"{"name":"c","num_qubits":1,"num_clbits":0,
            "instructions":[{"name":"h","qubits":[5]}]}"#;
        let err = serde_json::from_str::<Circuit>(out_of_range).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_deserialize_checks_metadata() {
        let wide_layout = r#"{"name":"c","num_qubits":2,"num_clbits":0,
            "instructions":[],"layout":[[0, 7]]}"#;
        assert!(serde_json::from_str::<Circuit>(wide_layout).is_err());

        let short_schedule = r#"{"name":"c","num_qubits":1,"num_clbits":0,
            "instructions":[{"name":"h","qubits":[0]}],"start_times":[]}"#;
        assert!(serde_json::from_str::<Circuit>(short_schedule).is_err());
    }
}
