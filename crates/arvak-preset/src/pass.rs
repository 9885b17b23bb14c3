//! Pass trait and types for compilation passes.

use std::fmt;

use arvak_ir::Circuit;

use crate::error::StageResult;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Inspects the circuit and may fail, but never modifies it.
    Analysis,
    /// Rewrites the circuit.
    Transformation,
}

/// An atomic compilation pass.
///
/// Passes are the fundamental unit a stage pipeline is made of. Each pass
/// carries everything it needs (target, coupling map, settings) from the
/// moment it is built, so running one only touches the circuit.
///
/// The `Debug` rendering of a pass must show its full parameterization;
/// two passes with equal renderings behave identically.
pub trait Pass: Send + Sync + fmt::Debug {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given circuit.
    fn run(&self, circuit: &mut Circuit) -> StageResult<()>;

    /// Check if this pass should run on the current circuit.
    fn should_run(&self, _circuit: &Circuit) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestPass;

    impl Pass for TestPass {
        fn name(&self) -> &'static str {
            "test"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, _circuit: &mut Circuit) -> StageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pass_kind() {
        let pass = TestPass;
        assert_eq!(pass.kind(), PassKind::Transformation);
        assert_eq!(pass.name(), "test");
        assert!(pass.should_run(&Circuit::with_size("empty", 0, 0)));
    }
}
