//! Animation commands derived from a step trace
//!
//! The pipeline is:
//!
//! ```text
//! steps → AdapterRegistry (probe in priority order) → adapters → optimize → commands
//! ```
//!
//! - [`command`]: the [`AnimationCommand`] vocabulary consumed by renderers
//! - [`diff`]: snapshot diffing and the command optimizer
//! - [`adapters`]: one adapter per data shape
//! - [`registry`]: adapter selection with per-adapter failure isolation

pub mod adapters;
pub mod command;
pub mod diff;
pub mod registry;

pub use adapters::{AdapterError, VisualizationAdapter};
pub use command::{AnimationCommand, CommandType};
pub use registry::{run_adapter, AdapterInfo, AdapterKind, AdapterRegistry};

use crate::snapshot::ExecutionStep;
use indexmap::IndexMap;

/// [`AdapterRegistry::detect_and_animate`] on the default registry
pub fn detect_and_animate(
    steps: &[ExecutionStep],
    variable_hint: Option<&str>,
    speed_multiplier: f64,
) -> IndexMap<String, Vec<AnimationCommand>> {
    AdapterRegistry::default().detect_and_animate(steps, variable_hint, speed_multiplier)
}
