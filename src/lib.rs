//! # Introduction
//!
//! algotrace runs a subset of Python and records an [`ExecutionStep`] for
//! every observable event: assignments, conditions, loop iterations, calls,
//! returns, prints and exceptions. The recorded trace is then turned into
//! renderer-neutral [`AnimationCommand`]s by adapters that recognise common
//! data structures (arrays, stacks, queues, trees, graphs and so on).
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Interpreter → Steps → Adapters → Commands
//! ```
//!
//! 1. [`parser`]: tokenises the source (with INDENT/DEDENT) and builds an AST.
//! 2. [`interpreter`]: walks the AST under a [`TracerConfig`] and records
//!    steps, enforcing step, time, memory and recursion limits.
//! 3. [`memory`]: the live value model with identity-carrying containers.
//! 4. [`snapshot`]: immutable per-step state that outlives the interpreter.
//! 5. [`animation`]: adapter registry, snapshot diffing and the optimizer.
//! 6. [`service`]: validation plus trace plus animation in one call.
//! 7. [`ui`]: ratatui trace player; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use algotrace::{detect_and_animate, trace, TracerConfig};
//!
//! let steps = trace("a = [3, 1]\na[0], a[1] = a[1], a[0]\n", &TracerConfig::default()).unwrap();
//! let animations = detect_and_animate(&steps, None, 1.0);
//! assert!(animations.contains_key("ArrayAdapter"));
//! ```

pub mod animation;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod service;
pub mod snapshot;
pub mod ui;

pub use animation::{detect_and_animate, AnimationCommand, CommandType};
pub use interpreter::{trace, trace_with_cancellation, TraceError, TracerConfig, TracingMode};
pub use service::{ExecuteOptions, ExecutionReport, Visualizer};
pub use snapshot::ExecutionStep;
