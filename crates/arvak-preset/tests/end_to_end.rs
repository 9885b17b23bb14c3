//! End-to-end tests: assemble with the built-in registry and run the
//! resulting pipeline over small circuits.

use arvak_ir::{Circuit, ClbitId, IrError, QubitId};
use arvak_preset::{
    BasisGates, ConfigError, CouplingMap, InstructionProperties, PresetConfig, StageError,
    StageRegistry, Target, assemble,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn toffoli() -> Circuit {
    let mut circuit = Circuit::with_size("toffoli", 3, 3);
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(1)).unwrap();
    circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
    for q in 0..3 {
        circuit.measure(QubitId(q), ClbitId(q)).unwrap();
    }
    circuit
}

/// Every two-qubit gate sits on an edge, in the edge's direction.
fn assert_respects(circuit: &Circuit, map: &CouplingMap) {
    for inst in circuit.instructions() {
        if inst.is_gate() && inst.num_qubits() == 2 {
            let (a, b) = (inst.qubits[0].0, inst.qubits[1].0);
            assert!(map.has_edge(a, b), "{} on ({a}, {b}) is not native", inst.name);
        }
    }
}

#[test]
fn test_toffoli_on_directed_ring() {
    init_tracing();
    let ring = CouplingMap::from_edges([(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
    let basis = BasisGates::ibm();
    let config = PresetConfig::new()
        .with_coupling_map(ring.clone())
        .with_basis_gates(basis.clone());

    let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();
    let compiled = pipeline.apply(toffoli()).unwrap();

    assert_eq!(compiled.num_qubits(), 5);
    assert_eq!(compiled.count_ops("ccx"), 0);
    assert_eq!(compiled.count_ops("measure"), 3);
    assert!(compiled.instructions().iter().all(|i| basis.contains(&i.name)));
    assert_respects(&compiled, &ring);
    assert!(compiled.layout().is_some());
    assert!(compiled.final_layout().is_some());
}

#[test]
fn test_toffoli_with_basic_routing_and_trivial_layout() {
    init_tracing();
    let line = CouplingMap::linear(4);
    let basis = BasisGates::iqm();
    let config = PresetConfig::new()
        .with_coupling_map(line.clone())
        .with_basis_gates(basis.clone())
        .with_layout_method("trivial")
        .with_routing_method("basic");

    let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();
    let compiled = pipeline.apply(toffoli()).unwrap();

    assert!(compiled.instructions().iter().all(|i| basis.contains(&i.name)));
    assert_respects(&compiled, &line);
}

#[test]
fn test_control_flow_rejected_before_routing() {
    init_tracing();
    let config = PresetConfig::new()
        .with_coupling_map(CouplingMap::linear(3))
        .with_routing_method("basic");
    let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();

    let mut circuit = Circuit::with_size("dynamic", 2, 1);
    circuit.h(QubitId(0)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit
        .control_flow("if_else", [QubitId(1)], [ClbitId(0)])
        .unwrap();

    let err = pipeline.apply(circuit).unwrap_err();
    let StageError::Config(ConfigError::ControlFlowUnsupported(message)) = err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(message.contains("routing_method='basic'"));
}

#[test]
fn test_zero_state_resets_removed() {
    init_tracing();
    let pipeline = assemble(&PresetConfig::new(), &StageRegistry::with_builtins()).unwrap();

    let mut circuit = Circuit::with_size("resets", 2, 0);
    circuit.reset(QubitId(0)).unwrap();
    circuit.reset(QubitId(1)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.reset(QubitId(0)).unwrap();

    let compiled = pipeline.apply(circuit).unwrap();
    assert_eq!(compiled.count_ops("reset"), 1);
    assert_eq!(compiled.instructions()[0].name, "h");
}

#[test]
fn test_unroutable_circuit_fails_with_ir_error() {
    init_tracing();
    // Two islands: qubits 0-1 and 2-3.
    let map = CouplingMap::from_edges([(0, 1), (1, 0), (2, 3), (3, 2)]);
    let config = PresetConfig::new()
        .with_coupling_map(map)
        .with_layout_method("trivial")
        .with_routing_method("none");
    let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();

    let mut circuit = Circuit::with_size("split", 4, 0);
    circuit.cx(QubitId(0), QubitId(3)).unwrap();

    let err = pipeline.apply(circuit).unwrap_err();
    assert!(matches!(err, StageError::Ir(IrError::Unroutable { .. })));
}

#[test]
fn test_asap_schedule_uses_target_durations() {
    init_tracing();
    let mut target = Target::new(2);
    target.add_global_operation("h");
    target.add_global_operation("measure");
    target.add_operation_with_properties(
        "cx",
        vec![
            InstructionProperties::on([0, 1]).with_duration(3.0),
            InstructionProperties::on([1, 0]).with_duration(3.0),
        ],
    );
    let config = PresetConfig::new()
        .with_target(target)
        .with_scheduling_method("asap");
    let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();

    let mut circuit = Circuit::with_size("bell", 2, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    let compiled = pipeline.apply(circuit).unwrap();

    let times = compiled.start_times().unwrap();
    assert_eq!(times.len(), compiled.num_ops());
    let cx = compiled
        .instructions()
        .iter()
        .position(|i| i.name == "cx")
        .unwrap();
    assert_eq!(times[cx], 1.0);
}

#[test]
fn test_yaml_config_end_to_end() {
    init_tracing();
    let yaml = r"
basis_gates: [rz, sx, x, cx, measure, reset, barrier]
coupling_map:
  edges: [[0, 1], [1, 2], [2, 3]]
routing_method: sabre
";
    let config = PresetConfig::from_yaml_str(yaml).unwrap();
    let pipeline = assemble(&config, &StageRegistry::with_builtins()).unwrap();
    assert!(
        pipeline
            .pre_optimization()
            .as_pipeline()
            .unwrap()
            .pass_names()
            .contains(&"GateDirection")
    );

    let compiled = pipeline.apply(Circuit::ghz(4).unwrap()).unwrap();
    assert_respects(&compiled, config.coupling_map.as_ref().unwrap());
}
