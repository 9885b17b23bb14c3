//! The assembled staged pipeline.

use arvak_ir::Circuit;
use tracing::{debug, info, instrument};

use crate::error::StageResult;
use crate::manager::StagePipeline;

/// Slot names in execution order.
pub const STAGE_NAMES: [&str; 7] = [
    "init",
    "layout",
    "routing",
    "translation",
    "pre_optimization",
    "optimization",
    "scheduling",
];

/// One slot of a [`StagedPipeline`].
#[derive(Debug, Clone, Default)]
pub enum StageSlot {
    /// The stage runs this pipeline.
    Present(StagePipeline),
    /// The stage is skipped.
    #[default]
    Absent,
}

impl StageSlot {
    /// Check if the slot holds a pipeline.
    pub fn is_present(&self) -> bool {
        matches!(self, StageSlot::Present(_))
    }

    /// Check if the slot is explicitly empty.
    pub fn is_absent(&self) -> bool {
        matches!(self, StageSlot::Absent)
    }

    /// The pipeline, if present.
    pub fn as_pipeline(&self) -> Option<&StagePipeline> {
        match self {
            StageSlot::Present(pipeline) => Some(pipeline),
            StageSlot::Absent => None,
        }
    }

    /// Apply the slot. An absent slot returns the circuit unchanged.
    pub fn apply(&self, circuit: Circuit) -> StageResult<Circuit> {
        match self {
            StageSlot::Present(pipeline) => pipeline.apply(circuit),
            StageSlot::Absent => Ok(circuit),
        }
    }
}

impl From<StagePipeline> for StageSlot {
    fn from(pipeline: StagePipeline) -> Self {
        StageSlot::Present(pipeline)
    }
}

impl From<Option<StagePipeline>> for StageSlot {
    fn from(pipeline: Option<StagePipeline>) -> Self {
        pipeline.map_or(StageSlot::Absent, StageSlot::Present)
    }
}

/// Seven named stage slots produced by one assembly.
///
/// Immutable once built. Every pass is shared behind `Arc` and is
/// `Send + Sync`, so the whole pipeline can be handed to a concurrent
/// executor.
#[derive(Debug, Clone)]
pub struct StagedPipeline {
    init: StageSlot,
    layout: StageSlot,
    routing: StageSlot,
    translation: StageSlot,
    pre_optimization: StageSlot,
    optimization: StageSlot,
    scheduling: StageSlot,
}

impl StagedPipeline {
    /// Build from the seven slots in execution order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        init: StageSlot,
        layout: StageSlot,
        routing: StageSlot,
        translation: StageSlot,
        pre_optimization: StageSlot,
        optimization: StageSlot,
        scheduling: StageSlot,
    ) -> Self {
        Self {
            init,
            layout,
            routing,
            translation,
            pre_optimization,
            optimization,
            scheduling,
        }
    }

    /// Init slot.
    pub fn init(&self) -> &StageSlot {
        &self.init
    }

    /// Layout slot.
    pub fn layout(&self) -> &StageSlot {
        &self.layout
    }

    /// Routing slot.
    pub fn routing(&self) -> &StageSlot {
        &self.routing
    }

    /// Translation slot.
    pub fn translation(&self) -> &StageSlot {
        &self.translation
    }

    /// Pre-optimization slot.
    pub fn pre_optimization(&self) -> &StageSlot {
        &self.pre_optimization
    }

    /// Optimization slot.
    pub fn optimization(&self) -> &StageSlot {
        &self.optimization
    }

    /// Scheduling slot.
    pub fn scheduling(&self) -> &StageSlot {
        &self.scheduling
    }

    /// Look up a slot by name.
    pub fn slot(&self, name: &str) -> Option<&StageSlot> {
        self.slots().find(|(n, _)| *n == name).map(|(_, s)| s)
    }

    /// All slots with their names, in execution order.
    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &StageSlot)> + '_ {
        STAGE_NAMES.into_iter().zip([
            &self.init,
            &self.layout,
            &self.routing,
            &self.translation,
            &self.pre_optimization,
            &self.optimization,
            &self.scheduling,
        ])
    }

    /// Names of the present slots, in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.slots()
            .filter(|(_, slot)| slot.is_present())
            .map(|(name, _)| name)
            .collect()
    }

    /// Run every present slot in order.
    #[instrument(skip_all, fields(circuit = circuit.name()))]
    pub fn apply(&self, mut circuit: Circuit) -> StageResult<Circuit> {
        info!(
            "Running staged pipeline on circuit with {} qubits, {} ops",
            circuit.num_qubits(),
            circuit.num_ops()
        );
        for (name, slot) in self.slots() {
            if slot.is_absent() {
                debug!("Stage {} absent", name);
                continue;
            }
            debug!("Running stage: {}", name);
            circuit = slot.apply(circuit)?;
        }
        info!(
            "Staged pipeline completed, depth: {}, ops: {}",
            circuit.depth(),
            circuit.num_ops()
        );
        Ok(circuit)
    }
}
