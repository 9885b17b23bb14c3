//! Property-based tests for pipeline assembly.
//!
//! Configurations are generated with no device, a coupling map or a
//! target, with and without placement and an init method. The assembled
//! slots must follow from the device facts recorded alongside each
//! configuration.

use std::collections::BTreeSet;

use arvak_ir::{Layout, QubitId};
use arvak_preset::{
    CouplingMap, PresetConfig, StageKind, StagePipeline, StageRegistry, Target, assemble,
};
use proptest::prelude::*;

/// Registry where every default method and `init/custom` builds an empty stage.
fn registry() -> StageRegistry {
    let mut registry = StageRegistry::new();
    for (kind, method) in [
        (StageKind::Layout, "default"),
        (StageKind::Routing, "sabre"),
        (StageKind::Translation, "translator"),
        (StageKind::Optimization, "default"),
        (StageKind::Scheduling, "default"),
        (StageKind::Init, "custom"),
    ] {
        registry.register_fn(kind, method, |_, _| Ok(StagePipeline::new()));
    }
    registry
}

/// Directed edges between distinct qubits of a 5-qubit device.
fn arb_edges() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((0_u32..5, 0_u32..5), 1..=8).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(a, b)| if a == b { (a, (a + 1) % 5) } else { (a, b) })
            .collect()
    })
}

fn is_symmetric(edges: &BTreeSet<(u32, u32)>) -> bool {
    edges.iter().all(|&(a, b)| edges.contains(&(b, a)))
}

/// A generated configuration with the device facts it was built from.
#[derive(Debug, Clone)]
struct Case {
    config: PresetConfig,
    /// Some coupling map or restricted target pair exists.
    connectivity: bool,
    /// Direction has to be fixed before optimization.
    asymmetric: bool,
}

/// No device, a raw coupling map, or a target whose `cx` pairs define the
/// connectivity and whose `ecr` is calibrated on a subset of them.
fn arb_device() -> impl Strategy<Value = (Option<CouplingMap>, Option<Target>, bool, bool)> {
    prop_oneof![
        Just((None::<CouplingMap>, None::<Target>, false, false)),
        (arb_edges(), any::<bool>()).prop_map(|(edges, symmetric)| {
            let mut map = CouplingMap::from_edges(edges);
            if symmetric {
                map.make_symmetric();
            }
            let asymmetric = !is_symmetric(&map.edges().into_iter().collect());
            (Some(map), None, true, asymmetric)
        }),
        (
            prop::collection::vec((0_u32..5, 0_u32..5), 0..=8),
            any::<bool>(),
            prop::collection::vec(any::<bool>(), 16),
        )
            .prop_map(|(pairs, symmetric, ecr_mask)| {
                let mut cx: BTreeSet<(u32, u32)> =
                    pairs.into_iter().filter(|(a, b)| a != b).collect();
                if symmetric {
                    cx.extend(cx.clone().into_iter().map(|(a, b)| (b, a)));
                }
                let ecr: BTreeSet<(u32, u32)> = cx
                    .iter()
                    .zip(ecr_mask.iter().cycle())
                    .filter(|&(_, &keep)| keep)
                    .map(|(&pair, _)| pair)
                    .collect();

                let mut target = Target::new(5);
                target.add_global_operation("rz");
                target.add_global_operation("sx");
                let qargs = |set: &BTreeSet<(u32, u32)>| -> Vec<Vec<u32>> {
                    set.iter().map(|&(a, b)| vec![a, b]).collect()
                };
                if !cx.is_empty() {
                    target.add_operation("cx", qargs(&cx));
                }
                if !ecr.is_empty() {
                    target.add_operation("ecr", qargs(&ecr));
                }

                let connectivity = !cx.is_empty();
                let asymmetric = !is_symmetric(&cx) || (!ecr.is_empty() && ecr != cx);
                (None, Some(target), connectivity, asymmetric)
            }),
    ]
}

fn arb_case() -> impl Strategy<Value = Case> {
    (
        arb_device(),
        any::<bool>(),
        prop::option::of(0_u32..2),
        any::<bool>(),
    )
        .prop_map(
            |((coupling_map, target, connectivity, asymmetric), stale_map, placement, custom_init)| {
                let mut config = PresetConfig::new();
                if let Some(map) = coupling_map {
                    config = config.with_coupling_map(map);
                }
                if let Some(target) = target {
                    config = config.with_target(target);
                    if stale_map {
                        // Ignored: the target describes the device.
                        config = config.with_coupling_map(CouplingMap::linear(5));
                    }
                }
                if let Some(physical) = placement {
                    config = config.with_initial_layout(Layout::from_pairs([(QubitId(0), physical)]));
                }
                if custom_init {
                    config = config.with_init_method("custom");
                }
                Case {
                    config,
                    connectivity,
                    asymmetric,
                }
            },
        )
}

proptest! {
    #[test]
    fn layout_and_routing_follow_mapping(case in arb_case()) {
        let config = &case.config;
        let pipeline = assemble(config, &registry()).unwrap();
        let mapping = case.connectivity || config.initial_layout.is_some();

        prop_assert_eq!(pipeline.layout().is_present(), mapping);
        prop_assert_eq!(pipeline.routing().is_present(), mapping);
        for name in ["init", "translation", "pre_optimization", "optimization", "scheduling"] {
            prop_assert!(pipeline.slot(name).is_some_and(|slot| slot.is_present()));
        }
    }

    #[test]
    fn direction_fixing_follows_asymmetry(case in arb_case()) {
        let pipeline = assemble(&case.config, &registry()).unwrap();

        let pre = pipeline.pre_optimization().as_pipeline().unwrap();
        let expected: Vec<&str> = if case.asymmetric {
            vec!["GateDirection", "RemoveResetInZeroState"]
        } else {
            vec!["RemoveResetInZeroState"]
        };
        prop_assert_eq!(pre.pass_names(), expected);
    }

    #[test]
    fn init_composition(case in arb_case()) {
        let config = &case.config;
        let mut registry = registry();
        registry.register_fn(StageKind::Init, "custom", |_, _| {
            Ok(StagePipeline::new().with_pass(arvak_preset::passes::RemoveResetInZeroState))
        });
        let pipeline = assemble(config, &registry).unwrap();
        let init = pipeline.init().as_pipeline().unwrap();

        let mapping = case.connectivity || config.initial_layout.is_some();
        let expected: Vec<&str> = match (config.init_method(), mapping) {
            (Some(_), _) => vec!["ControlFlowCheck", "RemoveResetInZeroState"],
            (None, true) => vec!["ControlFlowCheck", "Unroll3qOrMore"],
            (None, false) => vec!["ControlFlowCheck"],
        };
        prop_assert_eq!(init.pass_names(), expected);
    }
}
