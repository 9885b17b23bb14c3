//! Assembly of the staged preset pipeline.

use tracing::{debug, info, instrument};

use crate::config::PresetConfig;
use crate::defaults::{
    StageMethods, control_flow_validation, pre_optimization_defaults, reduce_wide_ops_for,
};
use crate::error::AssembleResult;
use crate::registry::{StageKind, StageRegistry};
use crate::staged::{StageSlot, StagedPipeline};

/// Optimization level every registry lookup is made at.
pub const PRESET_LEVEL: u8 = 2;

/// Assemble the staged pipeline for a configuration.
///
/// Which stages exist depends on the device description:
///
/// - layout and routing are only present when a coupling map (or a target
///   with restricted pairs) or an initial layout is given;
/// - pre-optimization fixes gate directions when the device is asymmetric
///   and otherwise only drops resets on fresh qubits;
/// - init is the control-flow check followed by the chosen init method,
///   or by the wide-operation reduction when mapping is needed.
///
/// Assembly either returns the complete pipeline or fails; nothing is
/// executed and the registry is only read.
///
/// # Example
///
/// ```rust
/// use arvak_preset::{PresetConfig, StageRegistry, assemble, CouplingMap};
///
/// let config = PresetConfig::new().with_coupling_map(CouplingMap::linear(5));
/// let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();
/// assert!(pipeline.layout().is_present());
/// ```
#[instrument(skip_all)]
pub fn assemble(config: &PresetConfig, registry: &StageRegistry) -> AssembleResult<StagedPipeline> {
    config.validate()?;

    // Resolved even when mapping turns out to be unnecessary.
    let routing = registry.lookup(
        StageKind::Routing,
        config.routing_method(),
        config,
        PRESET_LEVEL,
    )?;

    let coupling_map = config.effective_coupling_map();
    let mapping_needed = coupling_map.is_some() || config.initial_layout.is_some();
    debug!("Mapping needed: {}", mapping_needed);

    let (reduction, layout, routing) = if mapping_needed {
        let reduction = reduce_wide_ops_for(config);
        let layout = registry.lookup(
            StageKind::Layout,
            config.layout_method(),
            config,
            PRESET_LEVEL,
        )?;
        (Some(reduction), StageSlot::from(layout), StageSlot::from(routing))
    } else {
        (None, StageSlot::Absent, StageSlot::Absent)
    };

    let translation = registry.lookup(
        StageKind::Translation,
        config.translation_method(),
        config,
        PRESET_LEVEL,
    )?;

    let asymmetric = coupling_map.as_ref().is_some_and(|map| !map.is_symmetric())
        || config
            .target
            .as_ref()
            .is_some_and(|target| !target.non_global_operation_names(true).is_empty());
    debug!("Asymmetric device: {}", asymmetric);
    let pre_optimization = if asymmetric {
        pre_optimization_defaults(config.target.as_ref(), coupling_map.as_ref(), true, true)
    } else {
        pre_optimization_defaults(None, None, false, true)
    };

    let optimization = registry.lookup(
        StageKind::Optimization,
        config.optimization_method(),
        config,
        PRESET_LEVEL,
    )?;
    let scheduling = registry.lookup(
        StageKind::Scheduling,
        config.scheduling_method(),
        config,
        PRESET_LEVEL,
    )?;

    let mut init = control_flow_validation(
        &StageMethods::from_config(config),
        config.basis_gates.as_ref(),
        config.target.as_ref(),
    );
    match (config.init_method(), reduction) {
        (Some(method), _) => {
            debug!("Init uses method: {}", method);
            init += &registry.lookup(StageKind::Init, method, config, PRESET_LEVEL)?;
        }
        (None, Some(reduction)) => {
            debug!("Init uses wide-operation reduction");
            init += &reduction;
        }
        (None, None) => debug!("Init is validation only"),
    }

    let pipeline = StagedPipeline::new(
        init.into(),
        layout,
        routing,
        translation.into(),
        pre_optimization.into(),
        optimization.into(),
        scheduling.into(),
    );
    info!("Assembled stages: {}", pipeline.stage_names().join(", "));
    Ok(pipeline)
}
