//! Execution steps and trace recording
//!
//! - [`ExecutionStep`]: the immutable record of one traced event
//! - [`StepLog`]: the ordered step list, bounded by the step budget
//! - [`OutputBuffer`]: per-trace capture of `stdout`/`stderr`
//! - [`Data`]: frozen snapshot values (see [`data`])

pub mod data;

pub use data::Data;

use crate::interpreter::errors::{ResourceKind, TraceError};
use crate::memory::heap::HeapObject;
use crate::memory::stack::CallFrame;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Kind of traced event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    Assignment,
    FunctionCall,
    FunctionReturn,
    Condition,
    LoopStart,
    LoopIteration,
    LoopEnd,
    Expression,
    Import,
    Print,
    Exception,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Assignment => "ASSIGNMENT",
            StepType::FunctionCall => "FUNCTION_CALL",
            StepType::FunctionReturn => "FUNCTION_RETURN",
            StepType::Condition => "CONDITION",
            StepType::LoopStart => "LOOP_START",
            StepType::LoopIteration => "LOOP_ITERATION",
            StepType::LoopEnd => "LOOP_END",
            StepType::Expression => "EXPRESSION",
            StepType::Import => "IMPORT",
            StepType::Print => "PRINT",
            StepType::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One traced event. Never modified after construction.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStep {
    pub step_number: usize,
    pub timestamp_ns: u64,
    pub line_number: usize,
    pub column_number: usize,
    pub step_type: StepType,
    pub source_code: String,
    pub variables_state: IndexMap<String, Data>,
    pub stdout_snapshot: Arc<str>,
    pub stderr_snapshot: Arc<str>,
    pub call_stack: Vec<Arc<CallFrame>>,
    pub heap_state: BTreeMap<u64, Arc<HeapObject>>,
    pub expression_value: Option<Data>,
    pub condition_result: Option<bool>,
    pub memory_usage: usize,
    pub cpu_time_ns: u64,
}

impl ExecutionStep {
    pub fn variable(&self, name: &str) -> Option<&Data> {
        self.variables_state.get(name)
    }

    /// Integer-valued variables, used to resolve symbolic indices like `arr[j + 1]`
    pub fn int_variables(&self) -> impl Iterator<Item = (&str, i64)> {
        self.variables_state
            .iter()
            .filter_map(|(name, value)| match value {
                Data::Int(n) => Some((name.as_str(), *n)),
                _ => None,
            })
    }
}

/// Captured output stream.
///
/// The text grows by appending; [`OutputBuffer::snapshot`] hands out a shared
/// `Arc<str>` that is only rebuilt after a write.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    text: String,
    snapshot: Arc<str>,
    dirty: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer {
            text: String::new(),
            snapshot: Arc::from(""),
            dirty: false,
        }
    }

    pub fn write(&mut self, text: &str) {
        if !text.is_empty() {
            self.text.push_str(text);
            self.dirty = true;
        }
    }

    pub fn snapshot(&mut self) -> Arc<str> {
        if self.dirty {
            self.snapshot = Arc::from(self.text.as_str());
            self.dirty = false;
        }
        Arc::clone(&self.snapshot)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Output split into lines, without a trailing empty line
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.text.split('\n').map(|s| s.to_string()).collect();
        if lines.last().is_some_and(|s| s.is_empty()) {
            lines.pop();
        }
        lines
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered step history with a hard step budget
#[derive(Debug)]
pub struct StepLog {
    steps: Vec<ExecutionStep>,
    max_steps: usize,
}

impl StepLog {
    pub fn new(max_steps: usize) -> Self {
        StepLog {
            steps: Vec::new(),
            max_steps,
        }
    }

    /// Fail if one more step would exceed the budget
    pub fn check_budget(&self) -> Result<(), TraceError> {
        if self.steps.len() >= self.max_steps {
            return Err(TraceError::Resource {
                resource: ResourceKind::Steps,
                limit: self.max_steps as u64,
                message: format!(
                    "execution exceeded the maximum of {} steps",
                    self.max_steps
                ),
            });
        }
        Ok(())
    }

    /// Add a step to history
    pub fn push(&mut self, step: ExecutionStep) -> Result<(), TraceError> {
        self.check_budget()?;
        self.steps.push(step);
        Ok(())
    }

    /// Number the next step will carry (1-based)
    pub fn next_step_number(&self) -> usize {
        self.steps.len() + 1
    }

    pub fn get(&self, index: usize) -> Option<&ExecutionStep> {
        self.steps.get(index)
    }

    pub fn last(&self) -> Option<&ExecutionStep> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<ExecutionStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: usize) -> ExecutionStep {
        ExecutionStep {
            step_number: n,
            timestamp_ns: 0,
            line_number: 1,
            column_number: 1,
            step_type: StepType::Assignment,
            source_code: "x = 1".to_string(),
            variables_state: IndexMap::new(),
            stdout_snapshot: Arc::from(""),
            stderr_snapshot: Arc::from(""),
            call_stack: Vec::new(),
            heap_state: BTreeMap::new(),
            expression_value: Some(Data::Int(1)),
            condition_result: None,
            memory_usage: 0,
            cpu_time_ns: 0,
        }
    }

    #[test]
    fn test_step_budget() {
        let mut log = StepLog::new(2);
        log.push(step(1)).unwrap();
        log.push(step(2)).unwrap();
        let err = log.push(step(3)).unwrap_err();
        assert!(matches!(
            err,
            TraceError::Resource {
                resource: ResourceKind::Steps,
                limit: 2,
                ..
            }
        ));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_output_snapshot_is_shared_until_write() {
        let mut out = OutputBuffer::new();
        out.write("a\n");
        let first = out.snapshot();
        let second = out.snapshot();
        assert!(Arc::ptr_eq(&first, &second));
        out.write("b");
        assert_eq!(&*out.snapshot(), "a\nb");
        assert_eq!(&*first, "a\n");
        assert_eq!(out.lines(), vec!["a", "b"]);
    }

    #[test]
    fn test_step_json_tags() {
        let json = serde_json::to_value(step(1)).unwrap();
        assert_eq!(json["step_type"], "ASSIGNMENT");
        assert_eq!(json["expression_value"], 1);
        assert!(json["condition_result"].is_null());
    }
}
