//! Virtual-to-physical qubit layouts.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::qubit::QubitId;

/// A mapping from virtual qubits to physical qubit positions.
///
/// Both directions are kept in sync so lookups are O(1) either way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(QubitId, u32)>", into = "Vec<(QubitId, u32)>")]
pub struct Layout {
    virtual_to_physical: FxHashMap<QubitId, u32>,
    physical_to_virtual: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (virtual qubit i -> physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_qubits {
            layout.add(QubitId(i), i);
        }
        layout
    }

    /// Create a layout from `(virtual, physical)` pairs.
    ///
    /// Later pairs override earlier ones. Use the `TryFrom` conversion when
    /// conflicting input must be rejected instead.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (QubitId, u32)>) -> Self {
        let mut layout = Self::new();
        for (v, p) in pairs {
            layout.add(v, p);
        }
        layout
    }

    /// Add a mapping from virtual to physical qubit.
    ///
    /// Any existing mapping of either side is dropped first so both maps
    /// stay consistent.
    pub fn add(&mut self, virtual_qubit: QubitId, physical: u32) {
        if let Some(&old_virtual) = self.physical_to_virtual.get(&physical) {
            if old_virtual != virtual_qubit {
                self.virtual_to_physical.remove(&old_virtual);
            }
        }
        if let Some(&old_physical) = self.virtual_to_physical.get(&virtual_qubit) {
            if old_physical != physical {
                self.physical_to_virtual.remove(&old_physical);
            }
        }
        self.virtual_to_physical.insert(virtual_qubit, physical);
        self.physical_to_virtual.insert(physical, virtual_qubit);
    }

    /// Get the physical position of a virtual qubit.
    pub fn physical(&self, virtual_qubit: QubitId) -> Option<u32> {
        self.virtual_to_physical.get(&virtual_qubit).copied()
    }

    /// Get the virtual qubit at a physical position.
    pub fn virtual_qubit(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_virtual.get(&physical).copied()
    }

    /// Exchange the virtual qubits held by two physical positions.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let v1 = self.physical_to_virtual.remove(&p1);
        let v2 = self.physical_to_virtual.remove(&p2);

        if let Some(v1) = v1 {
            self.virtual_to_physical.insert(v1, p2);
            self.physical_to_virtual.insert(p2, v1);
        }
        if let Some(v2) = v2 {
            self.virtual_to_physical.insert(v2, p1);
            self.physical_to_virtual.insert(p1, v2);
        }
    }

    /// Number of mapped qubits.
    pub fn len(&self) -> usize {
        self.virtual_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.virtual_to_physical.is_empty()
    }

    /// Largest physical position in use, if any.
    pub fn max_physical(&self) -> Option<u32> {
        self.physical_to_virtual.keys().copied().max()
    }

    /// Iterate over `(virtual, physical)` pairs in virtual-qubit order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        let mut pairs: Vec<_> = self
            .virtual_to_physical
            .iter()
            .map(|(&v, &p)| (v, p))
            .collect();
        pairs.sort_unstable();
        pairs.into_iter()
    }

    /// Check whether raw `(virtual, physical)` pairs map two virtual qubits
    /// to the same physical position (or one virtual qubit twice).
    pub fn has_conflicts(pairs: &[(QubitId, u32)]) -> bool {
        let mut seen_physical = rustc_hash::FxHashSet::default();
        let mut seen_virtual = rustc_hash::FxHashSet::default();
        pairs
            .iter()
            .any(|&(v, p)| !seen_virtual.insert(v) || !seen_physical.insert(p))
    }
}

impl TryFrom<Vec<(QubitId, u32)>> for Layout {
    type Error = IrError;

    fn try_from(pairs: Vec<(QubitId, u32)>) -> IrResult<Self> {
        if Self::has_conflicts(&pairs) {
            return Err(IrError::LayoutMismatch(
                "a virtual or physical qubit is mapped more than once".into(),
            ));
        }
        Ok(Self::from_pairs(pairs))
    }
}

impl From<Layout> for Vec<(QubitId, u32)> {
    fn from(layout: Layout) -> Self {
        layout.iter().collect()
    }
}
