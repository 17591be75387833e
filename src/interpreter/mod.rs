//! Python-subset tracer
//!
//! This module runs a parsed program and records an [`ExecutionStep`] for
//! every observable event:
//! - [`engine`]: the [`Interpreter`] and the [`trace`] entry points
//! - [`context`]: namespaces, output buffers, limits and step creation
//! - [`config`]: [`TracerConfig`] presets and overrides
//! - [`errors`]: the [`TraceError`] taxonomy
//!
//! # Execution Model
//!
//! The interpreter walks the AST directly. Statements emit steps after they
//! complete (assignments, conditions, loop events, calls, prints). Each step
//! freezes the visible variables into immutable [`crate::snapshot::Data`]
//! trees, sharing containers that did not change since the previous step.
//!
//! # Leniency
//!
//! With `lenient` set, recoverable runtime faults are logged to stderr and
//! recorded as EXCEPTION steps; the failing sub-expression evaluates to a
//! fallback and execution continues. Resource and timeout faults always
//! abort the trace.
//!
//! [`ExecutionStep`]: crate::snapshot::ExecutionStep

pub mod builtins;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
mod expressions;
pub mod format;
pub mod limits;
mod loops;
mod memory_ops;
mod methods;
pub mod modules;
mod ops;
mod statements;

pub use config::{OptimizationLevel, TracerConfig, TracingMode};
pub use engine::{trace, trace_with_cancellation, Interpreter};
pub use errors::{ResourceKind, TraceError};
pub use limits::Watchdog;
