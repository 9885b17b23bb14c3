//! Stage registry mapping `(stage kind, method name)` to stage builders.
//!
//! The [`StageRegistry`] is populated before assembly and only read while
//! a pipeline is assembled. Builders are plain functions of the
//! configuration and the optimization level, so resolving a stage has no
//! effect beyond producing the [`StagePipeline`].

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::config::PresetConfig;
use crate::error::{AssembleResult, ConfigError, ResolutionError};
use crate::manager::StagePipeline;

/// Registry-resolvable stage kinds.
///
/// Pre-optimization is absent on purpose: it is always built by a default
/// factory and never looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Circuit preparation before mapping.
    Init,
    /// Initial placement of virtual qubits.
    Layout,
    /// Swap insertion for connectivity.
    Routing,
    /// Rewriting into the native gate set.
    Translation,
    /// Gate-count reduction.
    Optimization,
    /// Timing assignment.
    Scheduling,
}

impl StageKind {
    /// All kinds in pipeline order.
    pub const ALL: [StageKind; 6] = [
        StageKind::Init,
        StageKind::Layout,
        StageKind::Routing,
        StageKind::Translation,
        StageKind::Optimization,
        StageKind::Scheduling,
    ];

    /// Lowercase stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Init => "init",
            StageKind::Layout => "layout",
            StageKind::Routing => "routing",
            StageKind::Translation => "translation",
            StageKind::Optimization => "optimization",
            StageKind::Scheduling => "scheduling",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown stage kind: {s}"))
    }
}

/// A stage implementation that can be installed in a [`StageRegistry`].
pub trait StagePlugin: Send + Sync {
    /// Method name the plugin is registered under.
    fn name(&self) -> &str;

    /// Build the stage for a configuration at an optimization level.
    fn build(&self, config: &PresetConfig, level: u8) -> Result<StagePipeline, ConfigError>;
}

/// Builder function type for registered stages.
type StageBuilder =
    Box<dyn Fn(&PresetConfig, u8) -> Result<StagePipeline, ConfigError> + Send + Sync>;

/// Lookup table from `(stage kind, method name)` to stage builders.
pub struct StageRegistry {
    builders: FxHashMap<(StageKind, String), StageBuilder>,
}

impl StageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            builders: FxHashMap::default(),
        }
    }

    /// Create a registry holding the built-in stages.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::install(&mut registry);
        registry
    }

    /// Register a builder function. Returns `true` if it replaced an entry.
    pub fn register_fn(
        &mut self,
        kind: StageKind,
        method: impl Into<String>,
        builder: impl Fn(&PresetConfig, u8) -> Result<StagePipeline, ConfigError>
        + Send
        + Sync
        + 'static,
    ) -> bool {
        let method = method.into();
        debug!("Registering {} stage: {}", kind, method);
        let replaced = self
            .builders
            .insert((kind, method.clone()), Box::new(builder))
            .is_some();
        if replaced {
            warn!("Replaced existing {} stage '{}'", kind, method);
        }
        replaced
    }

    /// Register a plugin under its own name.
    ///
    /// Returns the method name if an existing entry was replaced.
    pub fn register(&mut self, kind: StageKind, plugin: impl StagePlugin + 'static) -> Option<String> {
        let method = plugin.name().to_string();
        self.register_fn(kind, method.clone(), move |config, level| {
            plugin.build(config, level)
        })
        .then_some(method)
    }

    /// Resolve and build a stage.
    ///
    /// Fails with a resolution error if nothing is registered under
    /// `(kind, method)`, or with the builder's configuration error.
    pub fn lookup(
        &self,
        kind: StageKind,
        method: &str,
        config: &PresetConfig,
        level: u8,
    ) -> AssembleResult<StagePipeline> {
        let builder = self
            .builders
            .get(&(kind, method.to_string()))
            .ok_or_else(|| ResolutionError {
                kind,
                method: method.to_string(),
                available: self.methods(kind),
            })?;
        debug!("Resolved {} stage: {}", kind, method);
        Ok(builder(config, level)?)
    }

    /// Check if a method is registered for a stage kind.
    pub fn contains(&self, kind: StageKind, method: &str) -> bool {
        self.builders.contains_key(&(kind, method.to_string()))
    }

    /// Registered method names for a stage kind, sorted.
    pub fn methods(&self, kind: StageKind) -> Vec<String> {
        let mut methods: Vec<String> = self
            .builders
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect();
        methods.sort();
        methods
    }

    /// Total number of registered entries.
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .builders
            .keys()
            .map(|(k, m)| format!("{k}/{m}"))
            .collect();
        keys.sort();
        f.debug_struct("StageRegistry").field("stages", &keys).finish()
    }
}
