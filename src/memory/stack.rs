//! Call stack implementation
//!
//! This module provides the call stack for function execution:
//! - [`CallStack`]: The stack of active frames, bounded by the recursion limit
//! - [`CallFrame`]: An immutable activation record
//!
//! Frames are stored as `Arc<CallFrame>` so a step can capture the whole stack
//! by cloning pointers; frames never change after they are pushed.

use crate::interpreter::errors::TraceError;
use crate::snapshot::Data;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// Module name reported for every frame; the traced program is a single module
pub const MAIN_MODULE: &str = "__main__";

/// Activation record of a user function call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallFrame {
    pub function_name: String,
    pub module_name: String,
    /// Line of the call site
    pub line_number: usize,
    /// Local bindings at entry (parameters included)
    pub local_variables: IndexMap<String, Data>,
    /// Bound arguments in parameter order
    pub arguments: IndexMap<String, Data>,
}

impl CallFrame {
    pub fn new(
        function_name: &str,
        line_number: usize,
        arguments: IndexMap<String, Data>,
        local_variables: IndexMap<String, Data>,
    ) -> Self {
        CallFrame {
            function_name: function_name.to_string(),
            module_name: MAIN_MODULE.to_string(),
            line_number,
            local_variables,
            arguments,
        }
    }
}

/// The call stack
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<Arc<CallFrame>>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a frame, failing with `RecursionError` at the depth limit
    pub fn push(&mut self, frame: CallFrame) -> Result<(), TraceError> {
        if self.frames.len() >= self.max_depth {
            return Err(TraceError::execution(
                "RecursionError",
                format!(
                    "maximum recursion depth exceeded ({}) in '{}'",
                    self.max_depth, frame.function_name
                ),
                frame.line_number,
            ));
        }
        self.frames.push(Arc::new(frame));
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Arc<CallFrame>> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn current(&self) -> Option<&Arc<CallFrame>> {
        self.frames.last()
    }

    /// Frames outermost first; cloning only bumps reference counts
    pub fn frames(&self) -> Vec<Arc<CallFrame>> {
        self.frames.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = CallStack::new(10);
        stack
            .push(CallFrame::new("f", 3, IndexMap::new(), IndexMap::new()))
            .unwrap();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current().unwrap().function_name, "f");
        assert_eq!(stack.current().unwrap().module_name, MAIN_MODULE);
        assert!(stack.pop().is_some());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_depth_limit_raises_recursion_error() {
        let mut stack = CallStack::new(2);
        for _ in 0..2 {
            stack
                .push(CallFrame::new("f", 1, IndexMap::new(), IndexMap::new()))
                .unwrap();
        }
        let err = stack
            .push(CallFrame::new("f", 1, IndexMap::new(), IndexMap::new()))
            .unwrap_err();
        assert_eq!(err.cause(), Some("RecursionError"));
        assert_eq!(stack.depth(), 2);
    }
}
