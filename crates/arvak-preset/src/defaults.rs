//! Factories for the stages the assembler builds without the registry.

use arvak_ir::CONTROL_FLOW_OP_NAMES;
use serde_json::Value;

use crate::config::PresetConfig;
use crate::manager::StagePipeline;
use crate::passes::{
    ControlFlowCheck, GateDirection, RemoveResetInZeroState, SynthesisSettings, Unroll3qOrMore,
};
use crate::registry::StageKind;
use crate::target::{BasisGates, CouplingMap, Target};

/// Method names known not to handle control flow, per stage.
const CONTROL_FLOW_UNSUPPORTED: [(StageKind, &[&str]); 2] = [
    (StageKind::Routing, &["basic", "lookahead", "stochastic"]),
    (StageKind::Scheduling, &["asap", "alap"]),
];

/// Method selections seen by the control-flow check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageMethods {
    /// Layout method.
    pub layout: String,
    /// Routing method.
    pub routing: String,
    /// Translation method.
    pub translation: String,
    /// Optimization method.
    pub optimization: String,
    /// Scheduling method.
    pub scheduling: String,
    /// Init method, if chosen.
    pub init: Option<String>,
}

impl StageMethods {
    /// Effective method names of a configuration.
    pub fn from_config(config: &PresetConfig) -> Self {
        Self {
            layout: config.layout_method().to_string(),
            routing: config.routing_method().to_string(),
            translation: config.translation_method().to_string(),
            optimization: config.optimization_method().to_string(),
            scheduling: config.scheduling_method().to_string(),
            init: config.init_method().map(str::to_string),
        }
    }

    /// Every selected method with its stage kind, in pipeline order.
    /// An unset init method is skipped.
    pub fn selections(&self) -> impl Iterator<Item = (StageKind, &str)> {
        [
            (StageKind::Init, self.init.as_deref()),
            (StageKind::Layout, Some(self.layout.as_str())),
            (StageKind::Routing, Some(self.routing.as_str())),
            (StageKind::Translation, Some(self.translation.as_str())),
            (StageKind::Optimization, Some(self.optimization.as_str())),
            (StageKind::Scheduling, Some(self.scheduling.as_str())),
        ]
        .into_iter()
        .filter_map(|(kind, method)| Some((kind, method?)))
    }
}

fn synthesis_settings(config: &PresetConfig) -> SynthesisSettings {
    SynthesisSettings {
        approximation_degree: config.approximation_degree,
        method: config.unitary_synthesis_method().to_string(),
        plugin_config: config.unitary_synthesis_plugin_config.clone(),
        hls_config: config.hls_config.clone(),
    }
}

/// Stage rewriting every operation on three or more qubits into one- and
/// two-qubit gates.
pub fn reduce_wide_ops(
    target: Option<&Target>,
    basis_gates: Option<&BasisGates>,
    approximation_degree: Option<f64>,
    synthesis_method: &str,
    plugin_config: &Value,
    hls_config: &Value,
) -> StagePipeline {
    let settings = SynthesisSettings {
        approximation_degree,
        method: synthesis_method.to_string(),
        plugin_config: plugin_config.clone(),
        hls_config: hls_config.clone(),
    };
    StagePipeline::new().with_pass(Unroll3qOrMore::new(
        target.cloned(),
        basis_gates.cloned(),
        settings,
    ))
}

/// [`reduce_wide_ops`] with every parameter taken from `config`.
pub fn reduce_wide_ops_for(config: &PresetConfig) -> StagePipeline {
    let settings = synthesis_settings(config);
    reduce_wide_ops(
        config.target.as_ref(),
        config.basis_gates.as_ref(),
        settings.approximation_degree,
        &settings.method,
        &settings.plugin_config,
        &settings.hls_config,
    )
}

/// Stage run between translation and optimization.
///
/// With `fix_direction` two-qubit gates are turned to the direction the
/// target (or coupling map) supports; with `remove_zero_resets` resets on
/// qubits still in their initial state are dropped.
pub fn pre_optimization_defaults(
    target: Option<&Target>,
    coupling_map: Option<&CouplingMap>,
    fix_direction: bool,
    remove_zero_resets: bool,
) -> StagePipeline {
    let mut stage = StagePipeline::new();
    if fix_direction {
        stage.push(GateDirection::new(target.cloned(), coupling_map.cloned()));
    }
    if remove_zero_resets {
        stage.push(RemoveResetInZeroState);
    }
    stage
}

/// Stage rejecting control flow the selected methods or the backend
/// cannot handle.
pub fn control_flow_validation(
    methods: &StageMethods,
    basis_gates: Option<&BasisGates>,
    target: Option<&Target>,
) -> StagePipeline {
    let unsupported_methods = methods
        .selections()
        .filter(|&(kind, method)| {
            CONTROL_FLOW_UNSUPPORTED
                .iter()
                .any(|&(k, names)| k == kind && names.contains(&method))
        })
        .map(|(kind, method)| (format!("{kind}_method"), method.to_string()))
        .collect();

    let unsupported_ops = CONTROL_FLOW_OP_NAMES
        .into_iter()
        .filter(|op| match (target, basis_gates) {
            (Some(target), _) => !target.contains_operation(op),
            (None, Some(basis)) => !basis.contains(op),
            (None, None) => false,
        })
        .map(str::to_string)
        .collect();

    StagePipeline::new().with_pass(ControlFlowCheck::new(unsupported_methods, unsupported_ops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, StageError};
    use arvak_ir::{Circuit, ClbitId, QubitId};

    fn with_if_else() -> Circuit {
        let mut circuit = Circuit::with_size("test", 2, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        circuit
            .control_flow("if_else", [QubitId(1)], [ClbitId(0)])
            .unwrap();
        circuit
    }

    #[test]
    fn test_reduce_wide_ops_single_pass() {
        let stage = reduce_wide_ops(None, None, None, "default", &Value::Null, &Value::Null);
        assert_eq!(stage.pass_names(), vec!["Unroll3qOrMore"]);
    }

    #[test]
    fn test_reduce_wide_ops_for_config() {
        let config = PresetConfig::new()
            .with_basis_gates(BasisGates::ibm())
            .with_approximation_degree(0.9);
        let direct = reduce_wide_ops(
            None,
            Some(&BasisGates::ibm()),
            Some(0.9),
            "default",
            &Value::Null,
            &Value::Null,
        );
        assert_eq!(reduce_wide_ops_for(&config).describe(), direct.describe());

        let exact = reduce_wide_ops(
            None,
            Some(&BasisGates::ibm()),
            None,
            "default",
            &Value::Null,
            &Value::Null,
        );
        assert_ne!(reduce_wide_ops_for(&config).describe(), exact.describe());
    }

    #[test]
    fn test_pre_optimization_flags() {
        let map = CouplingMap::from_edges([(0, 1)]);
        assert!(pre_optimization_defaults(None, None, false, false).is_empty());
        assert_eq!(
            pre_optimization_defaults(None, None, false, true).pass_names(),
            vec!["RemoveResetInZeroState"]
        );
        assert_eq!(
            pre_optimization_defaults(None, Some(&map), true, true).pass_names(),
            vec!["GateDirection", "RemoveResetInZeroState"]
        );
    }

    #[test]
    fn test_control_flow_validation_permissive() {
        let methods = StageMethods::from_config(&PresetConfig::new());
        let stage = control_flow_validation(&methods, None, None);
        stage.apply(with_if_else()).unwrap();
    }

    #[test]
    fn test_control_flow_validation_rejects_methods() {
        let config = PresetConfig::new()
            .with_routing_method("basic")
            .with_scheduling_method("alap");
        let stage = control_flow_validation(&StageMethods::from_config(&config), None, None);

        let err = stage.apply(with_if_else()).unwrap_err();
        let StageError::Config(ConfigError::ControlFlowUnsupported(message)) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(message.contains("routing_method='basic'"));
        assert!(message.contains("scheduling_method='alap'"));
    }

    #[test]
    fn test_stage_methods_cover_every_selection() {
        let defaults = StageMethods::from_config(&PresetConfig::new());
        let kinds: Vec<_> = defaults.selections().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![
                StageKind::Layout,
                StageKind::Routing,
                StageKind::Translation,
                StageKind::Optimization,
                StageKind::Scheduling,
            ]
        );

        let config = PresetConfig::new().with_init_method("custom");
        let methods = StageMethods::from_config(&config);
        assert_eq!(methods.selections().next(), Some((StageKind::Init, "custom")));
        assert_eq!(methods.selections().count(), 6);
    }

    #[test]
    fn test_control_flow_validation_same_name_other_stage() {
        // "basic" only breaks control flow as a routing method.
        let config = PresetConfig::new()
            .with_init_method("basic")
            .with_layout_method("basic")
            .with_scheduling_method("basic");
        let stage = control_flow_validation(&StageMethods::from_config(&config), None, None);
        stage.apply(with_if_else()).unwrap();
    }

    #[test]
    fn test_control_flow_validation_rejects_basis() {
        let methods = StageMethods::from_config(&PresetConfig::new());
        let stage = control_flow_validation(&methods, Some(&BasisGates::ibm()), None);

        let err = stage.apply(with_if_else()).unwrap_err();
        assert!(err.to_string().contains("if_else"));

        // Circuits without control flow are never rejected.
        let mut plain = Circuit::with_size("test", 1, 0);
        plain.h(QubitId(0)).unwrap();
        stage.apply(plain).unwrap();
    }

    #[test]
    fn test_control_flow_validation_target_wins() {
        let mut target = Target::new(2);
        target.add_global_operation("h");
        for op in CONTROL_FLOW_OP_NAMES {
            target.add_global_operation(op);
        }
        let methods = StageMethods::from_config(&PresetConfig::new());
        let stage = control_flow_validation(&methods, Some(&BasisGates::ibm()), Some(&target));
        stage.apply(with_if_else()).unwrap();
    }
}
