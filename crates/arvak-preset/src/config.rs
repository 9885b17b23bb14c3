//! Compile configuration consumed by the pipeline assembler.
//!
//! A [`PresetConfig`] can be built programmatically with the `with_*`
//! methods or loaded from YAML/JSON. Every field is optional; method names
//! fall back to the defaults of the preset.
//!
//! ```yaml
//! basis_gates: [rz, sx, x, cx, measure]
//! coupling_map:
//!   edges: [[0, 1], [1, 2], [2, 0]]
//! routing_method: basic
//! approximation_degree: 0.99
//! ```

use std::path::Path;

use arvak_ir::Layout;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::registry::StageKind;
use crate::target::{BasisGates, CouplingMap, Target};

/// Default layout method.
pub const DEFAULT_LAYOUT_METHOD: &str = "default";
/// Default routing method.
pub const DEFAULT_ROUTING_METHOD: &str = "sabre";
/// Default translation method.
pub const DEFAULT_TRANSLATION_METHOD: &str = "translator";
/// Default optimization method.
pub const DEFAULT_OPTIMIZATION_METHOD: &str = "default";
/// Default scheduling method.
pub const DEFAULT_SCHEDULING_METHOD: &str = "default";
/// Default unitary synthesis method.
pub const DEFAULT_SYNTHESIS_METHOD: &str = "default";

/// Configuration of one compile request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetConfig {
    /// Native gate names.
    #[serde(default)]
    pub basis_gates: Option<BasisGates>,

    /// Device connectivity, possibly directed.
    #[serde(default)]
    pub coupling_map: Option<CouplingMap>,

    /// User-supplied placement of virtual qubits.
    #[serde(default)]
    pub initial_layout: Option<Layout>,

    /// Layout stage method.
    #[serde(default)]
    pub layout_method: Option<String>,

    /// Routing stage method.
    #[serde(default)]
    pub routing_method: Option<String>,

    /// Translation stage method.
    #[serde(default)]
    pub translation_method: Option<String>,

    /// Optimization stage method.
    #[serde(default)]
    pub optimization_method: Option<String>,

    /// Scheduling stage method.
    #[serde(default)]
    pub scheduling_method: Option<String>,

    /// Init stage method. No default: when unset the init stage is built
    /// from the wide-operation reduction.
    #[serde(default)]
    pub init_method: Option<String>,

    /// Approximation tolerance in `[0, 1]`; `None` means exact.
    #[serde(default)]
    pub approximation_degree: Option<f64>,

    /// Unitary synthesis method.
    #[serde(default)]
    pub unitary_synthesis_method: Option<String>,

    /// Opaque settings for the unitary synthesis plugin.
    #[serde(default)]
    pub unitary_synthesis_plugin_config: Value,

    /// Opaque high-level synthesis settings.
    #[serde(default)]
    pub hls_config: Value,

    /// Authoritative device description.
    #[serde(default)]
    pub target: Option<Target>,
}

impl PresetConfig {
    /// Create an all-default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Set the native gate set.
    #[must_use]
    pub fn with_basis_gates(mut self, basis_gates: BasisGates) -> Self {
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set the coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMap) -> Self {
        self.coupling_map = Some(coupling_map);
        self
    }

    /// Set the initial layout.
    #[must_use]
    pub fn with_initial_layout(mut self, layout: Layout) -> Self {
        self.initial_layout = Some(layout);
        self
    }

    /// Set the layout method.
    #[must_use]
    pub fn with_layout_method(mut self, method: impl Into<String>) -> Self {
        self.layout_method = Some(method.into());
        self
    }

    /// Set the routing method.
    #[must_use]
    pub fn with_routing_method(mut self, method: impl Into<String>) -> Self {
        self.routing_method = Some(method.into());
        self
    }

    /// Set the translation method.
    #[must_use]
    pub fn with_translation_method(mut self, method: impl Into<String>) -> Self {
        self.translation_method = Some(method.into());
        self
    }

    /// Set the optimization method.
    #[must_use]
    pub fn with_optimization_method(mut self, method: impl Into<String>) -> Self {
        self.optimization_method = Some(method.into());
        self
    }

    /// Set the scheduling method.
    #[must_use]
    pub fn with_scheduling_method(mut self, method: impl Into<String>) -> Self {
        self.scheduling_method = Some(method.into());
        self
    }

    /// Set the init method.
    #[must_use]
    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method = Some(method.into());
        self
    }

    /// Set the approximation degree.
    #[must_use]
    pub fn with_approximation_degree(mut self, degree: f64) -> Self {
        self.approximation_degree = Some(degree);
        self
    }

    /// Set the unitary synthesis method and its plugin settings.
    #[must_use]
    pub fn with_unitary_synthesis(mut self, method: impl Into<String>, plugin_config: Value) -> Self {
        self.unitary_synthesis_method = Some(method.into());
        self.unitary_synthesis_plugin_config = plugin_config;
        self
    }

    /// Set the high-level synthesis settings.
    #[must_use]
    pub fn with_hls_config(mut self, hls_config: Value) -> Self {
        self.hls_config = hls_config;
        self
    }

    /// Set the target descriptor.
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    // =========================================================================
    // Effective values
    // =========================================================================

    /// Layout method, defaulting to `"default"`.
    pub fn layout_method(&self) -> &str {
        self.layout_method.as_deref().unwrap_or(DEFAULT_LAYOUT_METHOD)
    }

    /// Routing method, defaulting to `"sabre"`.
    pub fn routing_method(&self) -> &str {
        self.routing_method
            .as_deref()
            .unwrap_or(DEFAULT_ROUTING_METHOD)
    }

    /// Translation method, defaulting to `"translator"`.
    pub fn translation_method(&self) -> &str {
        self.translation_method
            .as_deref()
            .unwrap_or(DEFAULT_TRANSLATION_METHOD)
    }

    /// Optimization method, defaulting to `"default"`.
    pub fn optimization_method(&self) -> &str {
        self.optimization_method
            .as_deref()
            .unwrap_or(DEFAULT_OPTIMIZATION_METHOD)
    }

    /// Scheduling method, defaulting to `"default"`.
    pub fn scheduling_method(&self) -> &str {
        self.scheduling_method
            .as_deref()
            .unwrap_or(DEFAULT_SCHEDULING_METHOD)
    }

    /// Init method, if one was chosen.
    pub fn init_method(&self) -> Option<&str> {
        self.init_method.as_deref()
    }

    /// Unitary synthesis method, defaulting to `"default"`.
    pub fn unitary_synthesis_method(&self) -> &str {
        self.unitary_synthesis_method
            .as_deref()
            .unwrap_or(DEFAULT_SYNTHESIS_METHOD)
    }

    /// Connectivity the compiler must respect.
    ///
    /// The target wins when present: its two-qubit operations define the
    /// coupling map, and a target without any restricted pair means the
    /// device is all-to-all. Without a target the raw coupling map is used.
    pub fn effective_coupling_map(&self) -> Option<CouplingMap> {
        match &self.target {
            Some(target) => target.build_coupling_map(),
            None => self.coupling_map.clone(),
        }
    }

    /// Number of physical qubits, if the device size is known.
    pub fn device_num_qubits(&self) -> Option<u32> {
        match (&self.target, &self.coupling_map) {
            (Some(target), _) => Some(target.num_qubits()),
            (None, Some(map)) => Some(map.num_qubits()),
            (None, None) => None,
        }
    }

    // =========================================================================
    // Validation and loading
    // =========================================================================

    /// Check the configuration for invalid or contradictory values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(degree) = self.approximation_degree {
            if !degree.is_finite() || !(0.0..=1.0).contains(&degree) {
                return Err(ConfigError::InvalidApproximationDegree(degree));
            }
        }

        let methods = [
            (StageKind::Layout, &self.layout_method),
            (StageKind::Routing, &self.routing_method),
            (StageKind::Translation, &self.translation_method),
            (StageKind::Optimization, &self.optimization_method),
            (StageKind::Scheduling, &self.scheduling_method),
            (StageKind::Init, &self.init_method),
        ];
        for (kind, method) in methods {
            if method.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(ConfigError::EmptyMethodName(kind));
            }
        }

        if let Some(map) = &self.coupling_map {
            if let Some(&qubit) = map.self_loops().first() {
                return Err(ConfigError::SelfLoop(qubit));
            }
        }

        if let (Some(layout), Some(num_qubits)) = (&self.initial_layout, self.device_num_qubits()) {
            if let Some((virtual_qubit, physical)) =
                layout.iter().find(|&(_, p)| p >= num_qubits)
            {
                return Err(ConfigError::LayoutOutOfRange {
                    virtual_qubit,
                    physical,
                    num_qubits,
                });
            }
        }

        Ok(())
    }

    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file. `.json` files are parsed as JSON,
    /// anything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }
}
