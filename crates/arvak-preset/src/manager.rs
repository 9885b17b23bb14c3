//! Stage pipelines: ordered pass sequences that run over a circuit.

use std::sync::Arc;

use tracing::{debug, instrument};

use arvak_ir::Circuit;

use crate::error::StageResult;
use crate::pass::Pass;

/// An ordered sequence of passes forming one compilation stage.
///
/// Cloning is cheap: passes are shared behind `Arc`, so a pipeline can be
/// handed to several executors at once.
#[derive(Debug, Clone, Default)]
pub struct StagePipeline {
    passes: Vec<Arc<dyn Pass>>,
}

impl StagePipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Create a pipeline from already shared passes.
    pub fn from_passes(passes: impl IntoIterator<Item = Arc<dyn Pass>>) -> Self {
        Self {
            passes: passes.into_iter().collect(),
        }
    }

    /// Add a pass at the end.
    pub fn push(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Arc::new(pass));
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with_pass(mut self, pass: impl Pass + 'static) -> Self {
        self.push(pass);
        self
    }

    /// Append every pass of `other`, sharing them.
    pub fn extend(&mut self, other: &StagePipeline) {
        self.passes.extend(other.passes.iter().cloned());
    }

    /// Number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the pipeline has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// The passes in order.
    pub fn passes(&self) -> &[Arc<dyn Pass>] {
        &self.passes
    }

    /// Names of the passes in order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Full `Debug` rendering of each pass, in order.
    ///
    /// Two pipelines with equal descriptions are built from identically
    /// parameterized passes.
    pub fn describe(&self) -> Vec<String> {
        self.passes.iter().map(|p| format!("{p:?}")).collect()
    }

    /// Run every pass in order on a borrowed circuit.
    #[instrument(skip_all, fields(passes = self.passes.len()))]
    pub fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
        for pass in &self.passes {
            if pass.should_run(circuit) {
                debug!("Running pass: {}", pass.name());
                pass.run(circuit)?;
                debug!("Pass {} completed, ops: {}", pass.name(), circuit.num_ops());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }
        Ok(())
    }

    /// Apply the pipeline, consuming the circuit and returning the result.
    pub fn apply(&self, mut circuit: Circuit) -> StageResult<Circuit> {
        self.run(&mut circuit)?;
        Ok(circuit)
    }
}

impl std::ops::AddAssign<&StagePipeline> for StagePipeline {
    fn add_assign(&mut self, rhs: &StagePipeline) {
        self.extend(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::PassKind;
    use arvak_ir::{IrError, QubitId};

    #[derive(Debug)]
    struct AppendX;

    impl Pass for AppendX {
        fn name(&self) -> &'static str {
            "AppendX"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, circuit: &mut Circuit) -> StageResult<()> {
            circuit.x(QubitId(0))?;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Fail;

    impl Pass for Fail {
        fn name(&self) -> &'static str {
            "Fail"
        }

        fn kind(&self) -> PassKind {
            PassKind::Analysis
        }

        fn run(&self, _circuit: &mut Circuit) -> StageResult<()> {
            Err(IrError::NotInBasis("h".into()).into())
        }
    }

    #[derive(Debug)]
    struct Never;

    impl Pass for Never {
        fn name(&self) -> &'static str {
            "Never"
        }

        fn kind(&self) -> PassKind {
            PassKind::Analysis
        }

        fn run(&self, _circuit: &mut Circuit) -> StageResult<()> {
            unreachable!("should_run is false")
        }

        fn should_run(&self, _circuit: &Circuit) -> bool {
            false
        }
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = StagePipeline::new();
        assert!(pipeline.is_empty());
        let circuit = Circuit::with_size("test", 1, 0);
        assert_eq!(pipeline.apply(circuit.clone()).unwrap(), circuit);
    }

    #[test]
    fn test_passes_run_in_order() {
        let pipeline = StagePipeline::new()
            .with_pass(AppendX)
            .with_pass(Never)
            .with_pass(AppendX);
        let out = pipeline.apply(Circuit::with_size("test", 1, 0)).unwrap();
        assert_eq!(out.count_ops("x"), 2);
        assert_eq!(pipeline.pass_names(), vec!["AppendX", "Never", "AppendX"]);
    }

    #[test]
    fn test_error_stops_pipeline() {
        let pipeline = StagePipeline::new().with_pass(Fail).with_pass(AppendX);
        let err = pipeline
            .apply(Circuit::with_size("test", 1, 0))
            .unwrap_err();
        assert_eq!(err, IrError::NotInBasis("h".into()).into());
    }

    #[test]
    fn test_add_assign_shares_passes() {
        let tail = StagePipeline::new().with_pass(AppendX);
        let mut head = StagePipeline::new().with_pass(Never);
        head += &tail;

        assert_eq!(head.len(), 2);
        assert!(Arc::ptr_eq(&head.passes()[1], &tail.passes()[0]));
        assert_eq!(head.describe(), vec!["Never", "AppendX"]);
    }
}
