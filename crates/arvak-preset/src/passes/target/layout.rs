//! Layout passes for mapping virtual qubits to physical qubits.
//!
//! Each pass picks a placement and applies it: instructions are rewritten
//! onto physical qubits, the circuit is widened to the device size and the
//! placement is recorded with [`Circuit::set_layout`].

use std::collections::VecDeque;

use arvak_ir::{Circuit, IrError, Layout, QubitId};
use rustc_hash::FxHashSet;

use crate::error::StageResult;
use crate::pass::{Pass, PassKind};
use crate::target::CouplingMap;

/// Apply `layout` to the circuit on a device with `num_physical` qubits.
///
/// Virtual qubits the layout leaves unplaced take the lowest free physical
/// positions.
fn apply_layout(circuit: &mut Circuit, layout: &Layout, num_physical: u32) -> StageResult<()> {
    let num_virtual = circuit.num_qubits();
    let device = num_physical
        .max(num_virtual)
        .max(layout.max_physical().map_or(0, |p| p + 1));
    if num_virtual > num_physical {
        return Err(IrError::LayoutMismatch(format!(
            "circuit has {num_virtual} qubits but the device only {num_physical}"
        ))
        .into());
    }

    let mut full = Layout::new();
    let mut used = FxHashSet::default();
    for (v, p) in layout.iter().filter(|(v, _)| v.0 < num_virtual) {
        full.add(v, p);
        used.insert(p);
    }
    let mut free = (0..device).filter(|p| !used.contains(p));
    for v in (0..num_virtual).map(QubitId) {
        if full.physical(v).is_none() {
            let p = free.next().ok_or_else(|| {
                IrError::LayoutMismatch(format!("no free physical qubit left for {v}"))
            })?;
            full.add(v, p);
        }
    }

    let mut instructions = circuit.take_instructions();
    for inst in &mut instructions {
        for q in &mut inst.qubits {
            let p = full
                .physical(*q)
                .ok_or_else(|| IrError::LayoutMismatch(format!("{q} has no placement")))?;
            *q = QubitId(p);
        }
    }
    circuit.expand_qubits(device)?;
    circuit.set_instructions(instructions)?;
    circuit.set_layout(full);
    Ok(())
}

/// Applies a user-supplied placement.
#[derive(Debug, Clone, PartialEq)]
pub struct SetLayout {
    layout: Layout,
    num_physical: Option<u32>,
}

impl SetLayout {
    /// Create the pass for a device of `num_physical` qubits, if known.
    pub fn new(layout: Layout, num_physical: Option<u32>) -> Self {
        Self {
            layout,
            num_physical,
        }
    }
}

impl Pass for SetLayout {
    fn name(&self) -> &'static str {
        "SetLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let num_physical = self.num_physical.unwrap_or(circuit.num_qubits());
        apply_layout(circuit, &self.layout, num_physical)
    }
}

/// Trivial layout pass.
///
/// Maps virtual qubit i to physical qubit i.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrivialLayout {
    num_physical: Option<u32>,
}

impl TrivialLayout {
    /// Create the pass for a device of `num_physical` qubits, if known.
    pub fn new(num_physical: Option<u32>) -> Self {
        Self { num_physical }
    }
}

impl Pass for TrivialLayout {
    fn name(&self) -> &'static str {
        "TrivialLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let num_physical = self.num_physical.unwrap_or(circuit.num_qubits());
        apply_layout(circuit, &Layout::trivial(circuit.num_qubits()), num_physical)
    }
}

/// Dense layout pass.
///
/// Places the circuit on a connected region grown breadth-first from the
/// best-connected physical qubit.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayout {
    coupling_map: CouplingMap,
}

impl DenseLayout {
    /// Create the pass for a coupling map.
    pub fn new(coupling_map: CouplingMap) -> Self {
        Self { coupling_map }
    }

    /// Physical qubits in placement order.
    fn region(&self, size: u32) -> Vec<u32> {
        let n = self.coupling_map.num_qubits();
        let Some(start) = (0..n).max_by_key(|&q| (self.coupling_map.neighbors(q).len(), n - q))
        else {
            return vec![];
        };

        let mut order = Vec::with_capacity(size as usize);
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(q) = queue.pop_front() {
            order.push(q);
            for nb in self.coupling_map.neighbors(q) {
                if seen.insert(nb) {
                    queue.push_back(nb);
                }
            }
        }
        // Disconnected remainder, in index order.
        order.extend((0..n).filter(|q| !seen.contains(q)));
        order.truncate(size as usize);
        order
    }
}

impl Pass for DenseLayout {
    fn name(&self) -> &'static str {
        "DenseLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let num_physical = self.coupling_map.num_qubits();
        if circuit.num_qubits() > num_physical {
            return Err(IrError::LayoutMismatch(format!(
                "circuit has {} qubits but the device only {}",
                circuit.num_qubits(),
                num_physical
            ))
            .into());
        }
        let layout = Layout::from_pairs(
            self.region(circuit.num_qubits())
                .into_iter()
                .enumerate()
                .map(|(v, p)| (QubitId(v as u32), p)),
        );
        apply_layout(circuit, &layout, num_physical)
    }
}
