//! Terminal trace player built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: player state, keyboard event loop and pane focus
//! - **[`panes`]**: stateless render functions for each visible pane (source,
//!   output, variables, call stack, heap, animation commands, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! Construct an [`App`] from a recorded trace and the primary adapter's
//! commands, then call [`App::run`] to start the event loop.
//!
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
