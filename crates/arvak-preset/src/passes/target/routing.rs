//! Routing passes for inserting SWAP gates.
//!
//! Routing runs on a circuit whose qubits are already physical. A running
//! permutation tracks where each input wire currently sits; when routing
//! finishes, the initial layout composed with that permutation is stored
//! as the circuit's final layout.

use arvak_ir::{Circuit, Instruction, IrError, Layout, QubitId};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::StageResult;
use crate::pass::{Pass, PassKind};
use crate::target::CouplingMap;

/// Wire-to-position permutation plus the routed instruction stream.
struct Router<'a> {
    coupling_map: &'a CouplingMap,
    /// Input wire (as virtual id) to current physical position.
    perm: Layout,
    out: Vec<Instruction>,
    swaps: usize,
}

impl<'a> Router<'a> {
    fn new(coupling_map: &'a CouplingMap, num_qubits: u32) -> Self {
        Self {
            coupling_map,
            perm: Layout::trivial(num_qubits),
            out: vec![],
            swaps: 0,
        }
    }

    fn position(&self, wire: QubitId) -> u32 {
        self.perm.physical(wire).unwrap_or(wire.0)
    }

    fn positions(&self, inst: &Instruction) -> Vec<u32> {
        inst.qubits.iter().map(|&q| self.position(q)).collect()
    }

    fn distance(&self, name: &str, p0: u32, p1: u32) -> StageResult<u32> {
        self.coupling_map.distance(p0, p1).ok_or_else(|| {
            IrError::Unroutable {
                name: name.to_string(),
                qubit1: p0,
                qubit2: p1,
            }
            .into()
        })
    }

    fn needs_routing(&self, inst: &Instruction) -> Option<(u32, u32)> {
        if !inst.is_gate() || inst.num_qubits() != 2 {
            return None;
        }
        let p = self.positions(inst);
        (!self.coupling_map.is_connected(p[0], p[1])).then_some((p[0], p[1]))
    }

    fn emit(&mut self, inst: &Instruction) {
        let positions = self.positions(inst);
        self.out
            .push(inst.with_qubits(positions.into_iter().map(QubitId)));
    }

    fn swap(&mut self, p0: u32, p1: u32) {
        self.out
            .push(Instruction::two_qubit_gate("swap", QubitId(p0), QubitId(p1)));
        self.perm.swap(p0, p1);
        self.swaps += 1;
    }

    /// Walk the shortest path from `p0` towards `p1`, leaving them adjacent.
    fn swap_along_path(&mut self, name: &str, p0: u32, p1: u32) -> StageResult<()> {
        let path = self
            .coupling_map
            .shortest_path(p0, p1)
            .ok_or_else(|| IrError::Unroutable {
                name: name.to_string(),
                qubit1: p0,
                qubit2: p1,
            })?;
        for pair in path[..path.len() - 1].windows(2) {
            self.swap(pair[0], pair[1]);
        }
        Ok(())
    }

    fn finish(self, circuit: &mut Circuit) -> StageResult<()> {
        let initial = circuit
            .layout()
            .cloned()
            .unwrap_or_else(|| Layout::trivial(circuit.num_qubits()));
        let final_layout = Layout::from_pairs(initial.iter().map(|(v, p)| {
            let wire = QubitId(p);
            (v, self.perm.physical(wire).unwrap_or(p))
        }));
        debug!("Routing inserted {} swaps", self.swaps);
        circuit.set_instructions(self.out)?;
        circuit.set_final_layout(final_layout);
        Ok(())
    }
}

/// Swaps may touch any physical qubit, so the circuit spans the whole device.
fn widen_to_device(circuit: &mut Circuit, coupling_map: &CouplingMap) -> StageResult<()> {
    if coupling_map.num_qubits() > circuit.num_qubits() {
        circuit.expand_qubits(coupling_map.num_qubits())?;
    }
    Ok(())
}

/// Record the identity permutation as the final layout.
fn route_all_to_all(circuit: &mut Circuit) {
    if let Some(layout) = circuit.layout().cloned() {
        circuit.set_final_layout(layout);
    }
}

/// Basic routing pass.
///
/// Inserts SWAP gates along a shortest path in front of every two-qubit
/// gate whose operands are not adjacent. Greedy and fast, not optimal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicRouting {
    coupling_map: Option<CouplingMap>,
}

impl BasicRouting {
    /// Create the pass. Without a coupling map the device is all-to-all.
    pub fn new(coupling_map: Option<CouplingMap>) -> Self {
        Self { coupling_map }
    }
}

impl Pass for BasicRouting {
    fn name(&self) -> &'static str {
        "BasicRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        let Some(coupling_map) = &self.coupling_map else {
            route_all_to_all(circuit);
            return Ok(());
        };
        widen_to_device(circuit, coupling_map)?;
        let mut router = Router::new(coupling_map, circuit.num_qubits());
        for inst in circuit.take_instructions() {
            if let Some((p0, p1)) = router.needs_routing(&inst) {
                router.swap_along_path(&inst.name, p0, p1)?;
            }
            router.emit(&inst);
        }
        router.finish(circuit)
    }
}

/// SABRE-style lookahead routing.
///
/// Gates are released from a dependency front layer as soon as their
/// operands are adjacent. When the whole front is blocked, the swap
/// minimizing the summed front-layer distance plus a weighted look-ahead
/// over the next gates (scaled by a per-qubit decay) is applied. If no
/// progress is made for too long, the oldest blocked gate is routed along
/// a shortest path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SabreRouting {
    coupling_map: Option<CouplingMap>,
}

impl SabreRouting {
    /// Gates considered for the look-ahead term.
    const EXTENDED_SET_SIZE: usize = 20;
    /// Weight of the look-ahead term.
    const EXTENDED_SET_WEIGHT: f64 = 0.5;
    /// Decay added to a qubit each time it is swapped.
    const DECAY_RATE: f64 = 0.001;
    /// Swaps between decay resets.
    const DECAY_RESET: usize = 5;

    /// Create the pass. Without a coupling map the device is all-to-all.
    pub fn new(coupling_map: Option<CouplingMap>) -> Self {
        Self { coupling_map }
    }

    fn route(&self, coupling_map: &CouplingMap, circuit: &mut Circuit) -> StageResult<()> {
        widen_to_device(circuit, coupling_map)?;
        let instructions = circuit.take_instructions();
        let num_qubits = circuit.num_qubits();
        let (successors, mut pending) = dependencies(&instructions, circuit.num_clbits());

        let mut router = Router::new(coupling_map, num_qubits);
        let mut front: Vec<usize> = (0..instructions.len()).filter(|&i| pending[i] == 0).collect();
        let mut decay = vec![1.0_f64; num_qubits as usize];
        let mut since_progress = 0usize;
        let release_valve = 10 * num_qubits.max(1) as usize;

        while !front.is_empty() {
            // Execute everything executable, repeating until the front stalls.
            let mut progressed = false;
            loop {
                let ready: Vec<usize> = front
                    .iter()
                    .copied()
                    .filter(|&i| router.needs_routing(&instructions[i]).is_none())
                    .collect();
                if ready.is_empty() {
                    break;
                }
                progressed = true;
                front.retain(|i| !ready.contains(i));
                for i in ready {
                    router.emit(&instructions[i]);
                    for &s in &successors[i] {
                        pending[s] -= 1;
                        if pending[s] == 0 {
                            front.push(s);
                        }
                    }
                }
                front.sort_unstable();
            }
            if front.is_empty() {
                break;
            }
            if progressed {
                since_progress = 0;
                decay.fill(1.0);
            }

            if since_progress >= release_valve {
                let first = &instructions[front[0]];
                if let Some((p0, p1)) = router.needs_routing(first) {
                    debug!("Release valve: routing {} along a shortest path", first.name);
                    router.swap_along_path(&first.name, p0, p1)?;
                }
                since_progress = 0;
                decay.fill(1.0);
                continue;
            }

            let front_pairs = Self::blocked_pairs(&router, &instructions, &front);
            let extended = Self::extended_pairs(&instructions, &front, &successors);
            let (a, b) = Self::best_swap(
                &router,
                &front_pairs,
                &extended,
                &instructions[front[0]],
                &decay,
            )?;
            router.swap(a, b);
            since_progress += 1;
            decay[a as usize] += Self::DECAY_RATE;
            decay[b as usize] += Self::DECAY_RATE;
            if router.swaps % Self::DECAY_RESET == 0 {
                decay.fill(1.0);
            }
        }

        router.finish(circuit)
    }

    /// Wire pairs of the blocked front-layer gates.
    fn blocked_pairs(
        router: &Router<'_>,
        instructions: &[Instruction],
        front: &[usize],
    ) -> Vec<(QubitId, QubitId)> {
        front
            .iter()
            .map(|&i| &instructions[i])
            .filter(|inst| router.needs_routing(inst).is_some())
            .map(|inst| (inst.qubits[0], inst.qubits[1]))
            .collect()
    }

    /// Wire pairs of the next two-qubit gates behind the front layer.
    fn extended_pairs(
        instructions: &[Instruction],
        front: &[usize],
        successors: &[Vec<usize>],
    ) -> Vec<(QubitId, QubitId)> {
        let mut seen: FxHashSet<usize> = front.iter().copied().collect();
        let mut queue: Vec<usize> = front.to_vec();
        let mut pairs = Vec::new();
        let mut head = 0;
        while head < queue.len() && pairs.len() < Self::EXTENDED_SET_SIZE {
            let i = queue[head];
            head += 1;
            for &s in &successors[i] {
                if seen.insert(s) {
                    let inst = &instructions[s];
                    if inst.is_gate() && inst.num_qubits() == 2 {
                        pairs.push((inst.qubits[0], inst.qubits[1]));
                    }
                    queue.push(s);
                }
            }
        }
        pairs.truncate(Self::EXTENDED_SET_SIZE);
        pairs
    }

    #[allow(clippy::cast_precision_loss)]
    fn best_swap(
        router: &Router<'_>,
        front: &[(QubitId, QubitId)],
        extended: &[(QubitId, QubitId)],
        first: &Instruction,
        decay: &[f64],
    ) -> StageResult<(u32, u32)> {
        let mut candidates: Vec<(u32, u32)> = front
            .iter()
            .flat_map(|&(a, b)| [router.position(a), router.position(b)])
            .flat_map(|p| {
                router
                    .coupling_map
                    .neighbors(p)
                    .into_iter()
                    .map(move |n| (p.min(n), p.max(n)))
            })
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let mut best: Option<((u32, u32), f64)> = None;
        for (a, b) in candidates {
            let after = |q: QubitId| {
                let p = router.position(q);
                if p == a {
                    b
                } else if p == b {
                    a
                } else {
                    p
                }
            };
            let cost = |pairs: &[(QubitId, QubitId)]| -> StageResult<f64> {
                let mut total = 0.0;
                for &(q0, q1) in pairs {
                    total += f64::from(router.distance(&first.name, after(q0), after(q1))?);
                }
                Ok(if pairs.is_empty() {
                    0.0
                } else {
                    total / pairs.len() as f64
                })
            };
            let score = decay[a as usize].max(decay[b as usize])
                * (cost(front)? + Self::EXTENDED_SET_WEIGHT * cost(extended)?);
            if best.is_none_or(|(_, s)| score < s) {
                best = Some(((a, b), score));
            }
        }

        best.map(|(swap, _)| swap).ok_or_else(|| {
            let p = router.positions(first);
            IrError::Unroutable {
                name: first.name.clone(),
                qubit1: p[0],
                qubit2: p[1],
            }
            .into()
        })
    }
}

/// Successor lists and predecessor counts of the instruction dependency
/// graph. Instructions depend on the previous instruction on each of their
/// qubits and classical bits.
fn dependencies(instructions: &[Instruction], num_clbits: u32) -> (Vec<Vec<usize>>, Vec<usize>) {
    let mut successors = vec![Vec::new(); instructions.len()];
    let mut pending = vec![0usize; instructions.len()];
    let mut last_qubit: rustc_hash::FxHashMap<QubitId, usize> = rustc_hash::FxHashMap::default();
    let mut last_clbit: Vec<Option<usize>> = vec![None; num_clbits as usize];

    for (i, inst) in instructions.iter().enumerate() {
        let mut preds: Vec<usize> = inst
            .qubits
            .iter()
            .filter_map(|q| last_qubit.insert(*q, i))
            .collect();
        for c in &inst.clbits {
            if let Some(slot) = last_clbit.get_mut(c.0 as usize) {
                if let Some(prev) = slot.replace(i) {
                    preds.push(prev);
                }
            }
        }
        preds.sort_unstable();
        preds.dedup();
        for p in preds {
            successors[p].push(i);
            pending[i] += 1;
        }
    }
    (successors, pending)
}

impl Pass for SabreRouting {
    fn name(&self) -> &'static str {
        "SabreRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        match &self.coupling_map {
            Some(coupling_map) => self.route(coupling_map, circuit),
            None => {
                route_all_to_all(circuit);
                Ok(())
            }
        }
    }
}

/// Routing check used when no routing is requested.
///
/// Fails on the first two-qubit gate whose operands are not adjacent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckRouting {
    coupling_map: Option<CouplingMap>,
}

impl CheckRouting {
    /// Create the pass. Without a coupling map every pair is adjacent.
    pub fn new(coupling_map: Option<CouplingMap>) -> Self {
        Self { coupling_map }
    }
}

impl Pass for CheckRouting {
    fn name(&self) -> &'static str {
        "CheckRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        if let Some(coupling_map) = &self.coupling_map {
            let unrouted = circuit.instructions().iter().find(|inst| {
                inst.is_gate()
                    && inst.num_qubits() == 2
                    && !coupling_map.is_connected(inst.qubits[0].0, inst.qubits[1].0)
            });
            if let Some(inst) = unrouted {
                return Err(IrError::Unroutable {
                    name: inst.name.clone(),
                    qubit1: inst.qubits[0].0,
                    qubit2: inst.qubits[1].0,
                }
                .into());
            }
        }
        route_all_to_all(circuit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::passes::TrivialLayout;

    fn apply(pass: &impl Pass, mut circuit: Circuit) -> Circuit {
        pass.run(&mut circuit).unwrap();
        circuit
    }

    fn laid_out(circuit: Circuit, n: u32) -> Circuit {
        apply(&TrivialLayout::new(Some(n)), circuit)
    }

    /// Every two-qubit gate acts on adjacent physical qubits.
    fn assert_routed(circuit: &Circuit, map: &CouplingMap) {
        for inst in circuit.instructions() {
            if inst.num_qubits() == 2 {
                assert!(
                    map.is_connected(inst.qubits[0].0, inst.qubits[1].0),
                    "{} on {:?} not adjacent",
                    inst.name,
                    inst.qubits
                );
            }
        }
    }

    #[test]
    fn test_basic_routing_connected() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let circuit = laid_out(circuit, 5);

        let routed = apply(&BasicRouting::new(Some(CouplingMap::linear(5))), circuit);
        assert_eq!(routed.num_ops(), 2);
        assert_eq!(routed.final_layout(), routed.layout());
    }

    #[test]
    fn test_basic_routing_needs_swap() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let circuit = laid_out(circuit, 5);

        let map = CouplingMap::linear(5);
        let routed = apply(&BasicRouting::new(Some(map.clone())), circuit);

        assert_eq!(routed.count_ops("swap"), 1);
        assert_routed(&routed, &map);
        // q0 moved from 0 to 1, q1 from 1 to 0.
        let final_layout = routed.final_layout().unwrap();
        assert_eq!(final_layout.physical(QubitId(0)), Some(1));
        assert_eq!(final_layout.physical(QubitId(1)), Some(0));
        assert_eq!(final_layout.physical(QubitId(2)), Some(2));
    }

    #[test]
    fn test_sabre_routes_ring() {
        let map = CouplingMap::ring(6);
        let mut circuit = Circuit::with_size("test", 6, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        circuit.cx(QubitId(1), QubitId(4)).unwrap();
        circuit.cx(QubitId(2), QubitId(5)).unwrap();
        circuit.h(QubitId(0)).unwrap();
        let circuit = laid_out(circuit, 6);

        let routed = apply(&SabreRouting::new(Some(map.clone())), circuit);
        assert_routed(&routed, &map);
        assert_eq!(routed.count_ops("cx"), 3);
        assert_eq!(routed.count_ops("h"), 1);
        assert!(routed.count_ops("swap") >= 1);
    }

    #[test]
    fn test_sabre_keeps_measure_order() {
        let map = CouplingMap::linear(4);
        let mut circuit = Circuit::with_size("test", 4, 1);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        circuit.measure(QubitId(3), arvak_ir::ClbitId(0)).unwrap();
        circuit
            .control_flow("if_else", [QubitId(1)], [arvak_ir::ClbitId(0)])
            .unwrap();
        let circuit = laid_out(circuit, 4);

        let routed = apply(&SabreRouting::new(Some(map.clone())), circuit);
        assert_routed(&routed, &map);
        let names: Vec<&str> = routed
            .instructions()
            .iter()
            .map(Instruction::name)
            .filter(|n| *n != "swap")
            .collect();
        assert_eq!(names, vec!["cx", "measure", "if_else"]);
    }

    #[test]
    fn test_disconnected_map_unroutable() {
        let map = CouplingMap::from_edges([(0, 1), (2, 3)]);
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        let mut circuit = laid_out(circuit, 4);

        let result = BasicRouting::new(Some(map)).run(&mut circuit);
        assert!(matches!(
            result,
            Err(StageError::Ir(IrError::Unroutable { .. }))
        ));
    }

    #[test]
    fn test_check_routing() {
        let map = CouplingMap::linear(3);
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut ok = laid_out(circuit.clone(), 3);
        CheckRouting::new(Some(map.clone())).run(&mut ok).unwrap();

        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let mut bad = laid_out(circuit, 3);
        let err = CheckRouting::new(Some(map)).run(&mut bad).unwrap_err();
        assert_eq!(
            err,
            StageError::Ir(IrError::Unroutable {
                name: "cx".into(),
                qubit1: 0,
                qubit2: 2,
            })
        );
    }

    #[test]
    fn test_routing_without_coupling_map() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let circuit = laid_out(circuit, 3);

        let routed = apply(&SabreRouting::new(None), circuit.clone());
        assert_eq!(routed.instructions(), circuit.instructions());
        assert_eq!(routed.final_layout(), circuit.layout());
    }
}
