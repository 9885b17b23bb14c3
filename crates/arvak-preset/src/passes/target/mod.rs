//! Target-specific passes.
//!
//! Each pass is bound at construction to the device description it needs
//! (coupling map, basis gates or target).

pub mod direction;
pub mod layout;
pub mod routing;
pub mod scheduling;
pub mod translation;
pub mod unroll;

pub use direction::GateDirection;
pub use layout::{DenseLayout, SetLayout, TrivialLayout};
pub use routing::{BasicRouting, CheckRouting, SabreRouting};
pub use scheduling::{Schedule, SchedulingPolicy};
pub use translation::BasisTranslation;
pub use unroll::{SynthesisSettings, Unroll3qOrMore};
