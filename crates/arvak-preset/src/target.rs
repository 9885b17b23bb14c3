//! Target device description: connectivity, native gates and the
//! authoritative [`Target`] descriptor.
//!
//! # Examples
//!
//! ```
//! use arvak_preset::{CouplingMap, Target};
//!
//! // A ring where every link only works in one direction.
//! let ring = CouplingMap::from_edges([(0, 1), (1, 2), (2, 3), (3, 0)]);
//! assert!(!ring.is_symmetric());
//! assert!(ring.is_connected(1, 0));
//! assert_eq!(ring.distance(0, 2), Some(2));
//!
//! // A target whose `ecr` gate is only calibrated in one direction.
//! let mut target = Target::new(2);
//! target.add_global_operation("sx");
//! target.add_operation("cx", [vec![0, 1], vec![1, 0]]);
//! target.add_operation("ecr", [vec![0, 1]]);
//! assert_eq!(target.non_global_operation_names(true), vec!["ecr"]);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest device a deserialized coupling map or target may describe.
///
/// The coupling map keeps two dense `n x n` tables, so this bounds memory.
pub const MAX_DEVICE_QUBITS: u32 = 2048;

fn check_device_size(requested: u64) -> Result<(), ConfigError> {
    if requested > u64::from(MAX_DEVICE_QUBITS) {
        return Err(ConfigError::DeviceTooLarge {
            requested,
            limit: MAX_DEVICE_QUBITS,
        });
    }
    Ok(())
}

/// Target device coupling map.
///
/// A directed graph over physical qubits: an edge `(a, b)` means a
/// two-qubit operation can be issued with `a` as its first operand and `b`
/// as its second. Reachability queries ([`distance`](Self::distance),
/// [`shortest_path`](Self::shortest_path)) ignore direction, since routing
/// only needs adjacency and direction is repaired separately.
///
/// On construction an all-pairs distance matrix is computed with BFS from
/// each node, so distance lookups are O(1).
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "CouplingMapRepr", into = "CouplingMapRepr")]
pub struct CouplingMap {
    graph: DiGraphMap<u32, ()>,
    num_qubits: u32,
    /// `dist[from][to]`, or `u32::MAX` if unreachable.
    dist: Vec<Vec<u32>>,
    /// `pred[from][to]` is the node before `to` on a shortest path from `from`.
    pred: Vec<Vec<u32>>,
}

#[derive(Serialize, Deserialize)]
struct CouplingMapRepr {
    #[serde(default)]
    num_qubits: u32,
    edges: Vec<(u32, u32)>,
}

impl TryFrom<CouplingMapRepr> for CouplingMap {
    type Error = ConfigError;

    fn try_from(repr: CouplingMapRepr) -> Result<Self, ConfigError> {
        let widest = repr
            .edges
            .iter()
            .map(|&(a, b)| u64::from(a.max(b)) + 1)
            .max()
            .unwrap_or(0);
        check_device_size(widest.max(u64::from(repr.num_qubits)))?;

        let mut map = Self::from_edges(repr.edges);
        if repr.num_qubits > map.num_qubits {
            map.grow(repr.num_qubits);
            map.rebuild_distances();
        }
        Ok(map)
    }
}

impl From<CouplingMap> for CouplingMapRepr {
    fn from(map: CouplingMap) -> Self {
        Self {
            num_qubits: map.num_qubits,
            edges: map.edges(),
        }
    }
}

impl CouplingMap {
    /// Create a coupling map with `num_qubits` isolated qubits.
    pub fn new(num_qubits: u32) -> Self {
        let mut map = Self {
            graph: DiGraphMap::new(),
            num_qubits: 0,
            dist: vec![],
            pred: vec![],
        };
        map.grow(num_qubits);
        map.rebuild_distances();
        map
    }

    /// Create a coupling map from directed edges.
    ///
    /// The number of qubits is one past the largest index mentioned.
    pub fn from_edges(edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut map = Self::new(0);
        for (a, b) in edges {
            map.insert_edge(a, b);
        }
        map.rebuild_distances();
        map
    }

    /// Add a directed edge, growing the map if needed.
    pub fn add_edge(&mut self, from: u32, to: u32) {
        self.insert_edge(from, to);
        self.rebuild_distances();
    }

    fn insert_edge(&mut self, from: u32, to: u32) {
        self.grow(from.max(to).saturating_add(1));
        self.graph.add_edge(from, to, ());
    }

    fn grow(&mut self, num_qubits: u32) {
        for q in self.num_qubits..num_qubits {
            self.graph.add_node(q);
        }
        self.num_qubits = self.num_qubits.max(num_qubits);
    }

    /// Create a linear chain `0 - 1 - ... - (n-1)` with links in both directions.
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.insert_edge(i, i + 1);
            map.insert_edge(i + 1, i);
        }
        map.rebuild_distances();
        map
    }

    /// Create a ring with links in both directions.
    pub fn ring(n: u32) -> Self {
        let mut map = Self::linear(n);
        if n > 2 {
            map.insert_edge(n - 1, 0);
            map.insert_edge(0, n - 1);
            map.rebuild_distances();
        }
        map
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    map.insert_edge(i, j);
                }
            }
        }
        map.rebuild_distances();
        map
    }

    /// Create a star topology centred on qubit 0.
    pub fn star(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 1..n {
            map.insert_edge(0, i);
            map.insert_edge(i, 0);
        }
        map.rebuild_distances();
        map
    }

    /// Add the reverse of every edge.
    pub fn make_symmetric(&mut self) {
        for (a, b) in self.edges() {
            self.graph.add_edge(b, a, ());
        }
        self.rebuild_distances();
    }

    /// Check whether every edge is present in both directions.
    pub fn is_symmetric(&self) -> bool {
        self.graph
            .all_edges()
            .all(|(a, b, _)| self.graph.contains_edge(b, a))
    }

    /// Check for the directed edge `from -> to`.
    #[inline]
    pub fn has_edge(&self, from: u32, to: u32) -> bool {
        self.graph.contains_edge(from, to)
    }

    /// Check whether two qubits are linked in either direction.
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.has_edge(q1, q2) || self.has_edge(q2, q1)
    }

    /// Number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Directed edges, sorted.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<_> = self.graph.all_edges().map(|(a, b, _)| (a, b)).collect();
        edges.sort_unstable();
        edges
    }

    /// Qubits linked to `qubit` in either direction, sorted.
    pub fn neighbors(&self, qubit: u32) -> Vec<u32> {
        if !self.graph.contains_node(qubit) {
            return vec![];
        }
        let mut out: Vec<u32> = self
            .graph
            .neighbors_directed(qubit, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(qubit, Direction::Incoming))
            .filter(|&n| n != qubit)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Qubits with an edge to themselves.
    pub fn self_loops(&self) -> Vec<u32> {
        let mut loops: Vec<u32> = self
            .graph
            .all_edges()
            .filter(|&(a, b, _)| a == b)
            .map(|(a, _, _)| a)
            .collect();
        loops.sort_unstable();
        loops
    }

    fn rebuild_distances(&mut self) {
        let n = self.num_qubits as usize;
        self.dist = vec![vec![u32::MAX; n]; n];
        self.pred = vec![vec![u32::MAX; n]; n];

        for src in 0..n {
            self.dist[src][src] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(src as u32);

            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for neighbor in self.neighbors(current) {
                    let nb = neighbor as usize;
                    if self.dist[src][nb] == u32::MAX {
                        self.dist[src][nb] = self.dist[src][cur] + 1;
                        self.pred[src][nb] = current;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    /// Undirected shortest-path distance, `None` if unreachable.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        let d = *self.dist.get(from as usize)?.get(to as usize)?;
        (d != u32::MAX).then_some(d)
    }

    /// Undirected shortest path from `from` to `to`, both ends included.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        self.distance(from, to)?;

        let mut path = vec![to];
        let mut current = to;
        while current != from {
            let pred = self.pred[from as usize][current as usize];
            if pred == u32::MAX {
                return None;
            }
            path.push(pred);
            current = pred;
        }
        path.reverse();
        Some(path)
    }
}

impl fmt::Debug for CouplingMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouplingMap")
            .field("num_qubits", &self.num_qubits)
            .field("edges", &self.edges())
            .finish()
    }
}

impl PartialEq for CouplingMap {
    fn eq(&self, other: &Self) -> bool {
        self.num_qubits == other.num_qubits && self.edges() == other.edges()
    }
}

/// Native gate names of the target device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisGates {
    gates: Vec<String>,
}

impl BasisGates {
    /// Create a basis from gate names. Duplicates are dropped.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut seen = FxHashSet::default();
        Self {
            gates: gates
                .into_iter()
                .map(Into::<String>::into)
                .filter(|g: &String| seen.insert(g.clone()))
                .collect(),
        }
    }

    /// Check if a gate is in the basis.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    /// Get the basis gates.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }

    /// Check if the basis is empty.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// IQM basis (PRX + CZ).
    pub fn iqm() -> Self {
        Self::new(["prx", "cz", "measure", "reset", "barrier"])
    }

    /// IBM basis (RZ + SX + X + CX).
    pub fn ibm() -> Self {
        Self::new(["rz", "sx", "x", "cx", "measure", "reset", "barrier", "delay", "id"])
    }

    /// A broad basis covering all standard gates and control flow.
    pub fn universal() -> Self {
        Self::new([
            "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz", "p",
            "u", "cx", "cy", "cz", "swap", "rzz", "cp", "crz", "ccx", "cswap", "measure", "reset",
            "barrier", "delay", "if_else", "while_loop", "for_loop", "switch_case",
        ])
    }
}

impl<S: Into<String>> FromIterator<S> for BasisGates {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Calibration data for one operation on one qubit tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionProperties {
    /// Qubits the operation acts on, in issue order.
    pub qubits: Vec<u32>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Average error rate.
    #[serde(default)]
    pub error: Option<f64>,
}

impl InstructionProperties {
    /// Properties for a qubit tuple with no calibration data.
    pub fn on(qubits: impl Into<Vec<u32>>) -> Self {
        Self {
            qubits: qubits.into(),
            duration: None,
            error: None,
        }
    }

    /// Attach a duration.
    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Authoritative description of a target device.
///
/// Each operation is either *global* (`None`: available on any qubit
/// tuple of the right size) or restricted to an explicit list of ordered
/// qubit tuples. When present in a compile configuration the target
/// supersedes the raw basis gates and coupling map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TargetRepr")]
pub struct Target {
    num_qubits: u32,
    #[serde(default)]
    operations: BTreeMap<String, Option<Vec<InstructionProperties>>>,
}

#[derive(Deserialize)]
struct TargetRepr {
    num_qubits: u32,
    #[serde(default)]
    operations: BTreeMap<String, Option<Vec<InstructionProperties>>>,
}

impl TryFrom<TargetRepr> for Target {
    type Error = ConfigError;

    fn try_from(repr: TargetRepr) -> Result<Self, ConfigError> {
        check_device_size(u64::from(repr.num_qubits))?;
        for (name, props) in &repr.operations {
            let mut qubits = props.iter().flatten().flat_map(|p| &p.qubits);
            if let Some(&qubit) = qubits.find(|&&q| q >= repr.num_qubits) {
                return Err(ConfigError::TargetQubitOutOfRange {
                    operation: name.clone(),
                    qubit,
                    num_qubits: repr.num_qubits,
                });
            }
        }
        Ok(Self {
            num_qubits: repr.num_qubits,
            operations: repr.operations,
        })
    }
}

impl Target {
    /// Create a target with no operations.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            operations: BTreeMap::new(),
        }
    }

    /// Add an operation available on every qubit tuple.
    pub fn add_global_operation(&mut self, name: impl Into<String>) -> &mut Self {
        self.operations.insert(name.into(), None);
        self
    }

    /// Add an operation restricted to the given ordered qubit tuples.
    pub fn add_operation(
        &mut self,
        name: impl Into<String>,
        qargs: impl IntoIterator<Item = Vec<u32>>,
    ) -> &mut Self {
        let props = qargs.into_iter().map(InstructionProperties::on).collect();
        self.operations.insert(name.into(), Some(props));
        self
    }

    /// Add an operation with calibration data per qubit tuple.
    pub fn add_operation_with_properties(
        &mut self,
        name: impl Into<String>,
        properties: Vec<InstructionProperties>,
    ) -> &mut Self {
        self.operations.insert(name.into(), Some(properties));
        self
    }

    /// Number of qubits on the device.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Names of all operations, sorted.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.operations.keys().map(String::as_str)
    }

    /// Check if the target defines an operation at all.
    pub fn contains_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Check whether `name` can be issued on exactly `qargs` (order matters).
    pub fn instruction_supported(&self, name: &str, qargs: &[u32]) -> bool {
        match self.operations.get(name) {
            None => false,
            Some(None) => qargs.iter().all(|&q| q < self.num_qubits),
            Some(Some(props)) => props.iter().any(|p| p.qubits == qargs),
        }
    }

    /// Duration of `name` on `qargs`, if calibrated.
    pub fn duration(&self, name: &str, qargs: &[u32]) -> Option<f64> {
        self.operations
            .get(name)?
            .as_ref()?
            .iter()
            .find(|p| p.qubits == qargs)?
            .duration
    }

    /// Build the directed coupling map from every explicit two-qubit tuple.
    ///
    /// Returns `None` when no operation is restricted to explicit pairs, i.e.
    /// the device is unconstrained.
    pub fn build_coupling_map(&self) -> Option<CouplingMap> {
        let edges: Vec<(u32, u32)> = self
            .operations
            .values()
            .flatten()
            .flatten()
            .filter(|p| p.qubits.len() == 2)
            .map(|p| (p.qubits[0], p.qubits[1]))
            .collect();
        if edges.is_empty() {
            return None;
        }
        let mut map = CouplingMap::from_edges(edges);
        if map.num_qubits() < self.num_qubits {
            map.grow(self.num_qubits);
            map.rebuild_distances();
        }
        Some(map)
    }

    /// Names of operations not available on every qubit tuple of their size.
    ///
    /// For each arity the reference count is the number of distinct tuples
    /// defined anywhere in the target (the number of qubits for arity 1).
    /// With `strict_direction` tuples are compared in order, so an operation
    /// defined on `(0, 1)` but not `(1, 0)` is reported when some other
    /// operation uses `(1, 0)`. Global operations are never reported.
    pub fn non_global_operation_names(&self, strict_direction: bool) -> Vec<String> {
        let normalize = |qubits: &[u32]| -> Vec<u32> {
            let mut key = qubits.to_vec();
            if !strict_direction {
                key.sort_unstable();
            }
            key
        };

        let all_qargs: FxHashSet<Vec<u32>> = self
            .operations
            .values()
            .flatten()
            .flatten()
            .filter(|p| p.qubits.len() > 1)
            .map(|p| normalize(&p.qubits))
            .collect();

        let arity_total = |arity: usize| -> usize {
            if arity == 1 {
                self.num_qubits as usize
            } else {
                all_qargs.iter().filter(|q| q.len() == arity).count()
            }
        };

        self.operations
            .iter()
            .filter_map(|(name, props)| {
                let props = props.as_ref()?;
                let arity = props.first()?.qubits.len();
                let own: FxHashSet<Vec<u32>> =
                    props.iter().map(|p| normalize(&p.qubits)).collect();
                (own.len() != arity_total(arity)).then(|| name.clone())
            })
            .collect()
    }
}
