//! Built-in registry entries.
//!
//! These cover every method name the assembler falls back to, so an
//! all-default configuration assembles without external stages.

use crate::config::PresetConfig;
use crate::defaults::reduce_wide_ops_for;
use crate::error::ConfigError;
use crate::manager::StagePipeline;
use crate::passes::{
    BasicRouting, BasisTranslation, CancelInverses, CheckRouting, DenseLayout, MergeRotations,
    OptimizationLoop, SabreRouting, Schedule, SchedulingPolicy, SetLayout, TrivialLayout,
};
use crate::registry::{StageKind, StageRegistry};
use crate::target::CouplingMap;

/// Install the built-in stages.
pub(crate) fn install(registry: &mut StageRegistry) {
    registry.register_fn(StageKind::Init, "default", |config, _| {
        Ok(reduce_wide_ops_for(config))
    });

    registry.register_fn(StageKind::Layout, "default", dense_layout);
    registry.register_fn(StageKind::Layout, "trivial", |config, _| {
        let num_physical = config.device_num_qubits();
        let stage = StagePipeline::new();
        Ok(match &config.initial_layout {
            Some(layout) => stage.with_pass(SetLayout::new(layout.clone(), num_physical)),
            None => stage.with_pass(TrivialLayout::new(num_physical)),
        })
    });

    registry.register_fn(StageKind::Routing, "sabre", |config, _| {
        Ok(StagePipeline::new().with_pass(SabreRouting::new(config.effective_coupling_map())))
    });
    registry.register_fn(StageKind::Routing, "basic", |config, _| {
        Ok(StagePipeline::new().with_pass(BasicRouting::new(config.effective_coupling_map())))
    });
    registry.register_fn(StageKind::Routing, "none", |config, _| {
        Ok(StagePipeline::new().with_pass(CheckRouting::new(config.effective_coupling_map())))
    });

    registry.register_fn(StageKind::Translation, "translator", |config, _| {
        Ok(StagePipeline::new().with_pass(translator(config)))
    });

    registry.register_fn(StageKind::Optimization, "default", optimization);

    registry.register_fn(StageKind::Scheduling, "default", |_, _| Ok(StagePipeline::new()));
    registry.register_fn(StageKind::Scheduling, "asap", |config, _| {
        let pass = Schedule::new(SchedulingPolicy::Asap, config.target.clone());
        Ok(StagePipeline::new().with_pass(pass))
    });
    registry.register_fn(StageKind::Scheduling, "alap", |config, _| {
        let pass = Schedule::new(SchedulingPolicy::Alap, config.target.clone());
        Ok(StagePipeline::new().with_pass(pass))
    });
}

/// User placement when given, dense layout over the device otherwise.
fn dense_layout(config: &PresetConfig, _level: u8) -> Result<StagePipeline, ConfigError> {
    if let Some(layout) = &config.initial_layout {
        return Ok(StagePipeline::new()
            .with_pass(SetLayout::new(layout.clone(), config.device_num_qubits())));
    }
    // An unconstrained target is all-to-all.
    let coupling_map = config
        .effective_coupling_map()
        .or_else(|| config.target.as_ref().map(|t| CouplingMap::full(t.num_qubits())))
        .ok_or_else(|| ConfigError::MissingRequirement {
            kind: StageKind::Layout,
            method: "default".into(),
            requirement: "a coupling map or target",
        })?;
    Ok(StagePipeline::new().with_pass(DenseLayout::new(coupling_map)))
}

/// Translation into the target's operations, or the native gate set.
fn translator(config: &PresetConfig) -> BasisTranslation {
    match (&config.target, &config.basis_gates) {
        (Some(target), _) => BasisTranslation::new(target.operation_names()),
        (None, Some(basis)) => BasisTranslation::new(basis.gates().iter().cloned()),
        (None, None) => BasisTranslation::default(),
    }
}

/// Peephole optimization scaled by level.
fn optimization(config: &PresetConfig, level: u8) -> Result<StagePipeline, ConfigError> {
    let mut stage = StagePipeline::new();
    match level {
        0 => {}
        1 => stage.push(CancelInverses),
        _ => {
            let body = StagePipeline::new()
                .with_pass(MergeRotations)
                .with_pass(CancelInverses);
            stage.push(OptimizationLoop::new(body));
            if config.target.is_some() || config.basis_gates.is_some() {
                stage.push(translator(config));
            }
        }
    }
    Ok(stage)
}
