//! Mutable per-trace state.
//!
//! An [`ExecutionContext`] is created for one trace and dropped with it. It
//! owns the namespaces, the call stack, the output buffers, the limits and
//! the step log. Steps are only ever produced by [`ExecutionContext::create_step`],
//! which freezes the live state into an immutable [`ExecutionStep`].

use super::builtins::Builtin;
use super::config::TracerConfig;
use super::errors::{ResourceKind, TraceError};
use super::limits::Deadline;
use crate::memory::heap::{Freezer, IdAllocator};
use crate::memory::stack::CallStack;
use crate::memory::value::Value;
use crate::snapshot::{Data, ExecutionStep, OutputBuffer, StepLog, StepType};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub struct ExecutionContext {
    pub config: TracerConfig,
    /// Current position (1-based)
    pub line: usize,
    pub column: usize,
    pub call_stack: CallStack,
    pub globals: IndexMap<String, Value>,
    /// Namespace of the running function, `None` at module level
    pub locals: Option<IndexMap<String, Value>>,
    pub ids: IdAllocator,
    freezer: Freezer,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    deadline: Deadline,
    log: StepLog,
    ignored: FxHashSet<String>,
}

impl ExecutionContext {
    pub fn new(config: TracerConfig, cancel: Option<Arc<AtomicBool>>) -> Self {
        let ignored = config.ignored_variables.iter().cloned().collect();
        ExecutionContext {
            line: 1,
            column: 1,
            call_stack: CallStack::new(config.max_recursion_depth),
            globals: IndexMap::new(),
            locals: None,
            ids: IdAllocator::new(),
            freezer: Freezer::new(config.sharing_enabled()),
            stdout: OutputBuffer::new(),
            stderr: OutputBuffer::new(),
            deadline: Deadline::new(config.max_execution_time_seconds, cancel),
            log: StepLog::new(config.max_steps),
            ignored,
            config,
        }
    }

    /// Poll the deadline without creating a step (loop back-edges)
    pub fn check_deadline(&self) -> Result<(), TraceError> {
        self.deadline.check(self.line)
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(locals) = &self.locals {
            if let Some(value) = locals.get(name) {
                return Some(value.clone());
            }
        }
        if let Some(value) = self.globals.get(name) {
            return Some(value.clone());
        }
        Builtin::from_name(name).map(Value::Builtin)
    }

    pub fn set_var(&mut self, name: &str, value: Value) {
        match &mut self.locals {
            Some(locals) => locals.insert(name.to_string(), value),
            None => self.globals.insert(name.to_string(), value),
        };
    }

    /// Remove a binding from the innermost namespace; `false` if it was unbound
    pub fn del_var(&mut self, name: &str) -> bool {
        match &mut self.locals {
            Some(locals) => locals.shift_remove(name).is_some(),
            None => self.globals.shift_remove(name).is_some(),
        }
    }

    /// Binding of `name` in the innermost namespace only
    pub fn innermost(&self, name: &str) -> Option<Value> {
        match &self.locals {
            Some(locals) => locals.get(name).cloned(),
            None => self.globals.get(name).cloned(),
        }
    }

    pub fn write_stdout(&mut self, text: &str) -> Result<(), TraceError> {
        if self.config.capture_stdout {
            self.stdout.write(text);
        }
        self.check_output()
    }

    pub fn write_stderr(&mut self, text: &str) -> Result<(), TraceError> {
        if self.config.capture_stderr {
            self.stderr.write(text);
        }
        self.check_output()
    }

    fn check_output(&self) -> Result<(), TraceError> {
        let limit = self.config.max_output_bytes();
        let used = self.stdout.len() + self.stderr.len();
        if used > limit {
            return Err(TraceError::Resource {
                resource: ResourceKind::Output,
                limit: limit as u64,
                message: format!("captured output reached {} bytes", used),
            });
        }
        Ok(())
    }

    /// Refuse to materialise `items` values (about 8 bytes each) past the memory limit.
    ///
    /// Runs before the allocation, so an oversized request becomes a
    /// resource fault instead of an allocator abort.
    pub fn check_allocation(&self, items: usize, what: &str) -> Result<(), TraceError> {
        let limit = self.config.max_memory_bytes();
        if items.saturating_mul(8) > limit {
            return Err(TraceError::Resource {
                resource: ResourceKind::Memory,
                limit: limit as u64,
                message: format!("{} would create {} items at line {}", what, items, self.line),
            });
        }
        Ok(())
    }

    pub fn stdout(&self) -> &OutputBuffer {
        &self.stdout
    }

    pub fn stderr(&self) -> &OutputBuffer {
        &self.stderr
    }

    pub fn freeze(&mut self, value: &Value) -> Data {
        self.freezer.freeze(value)
    }

    fn is_visible(&self, name: &str, value: &Value) -> bool {
        !value.is_callable_or_module()
            && !(name.starts_with("__") && name.ends_with("__"))
            && !self.ignored.contains(name)
    }

    /// Program data of a namespace: callables, modules, dunder names and
    /// ignored names are dropped
    pub fn visible_bindings(&self, namespace: &IndexMap<String, Value>) -> Vec<(String, Value)> {
        namespace
            .iter()
            .filter(|(name, value)| self.is_visible(name, value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Frozen copy of a namespace after filtering
    pub fn freeze_namespace(&mut self, namespace: &IndexMap<String, Value>) -> IndexMap<String, Data> {
        self.visible_bindings(namespace)
            .into_iter()
            .map(|(name, value)| {
                let data = self.freezer.freeze(&value);
                (name, data)
            })
            .collect()
    }

    /// Globals overlaid by the current locals
    fn live_bindings(&self) -> IndexMap<String, Value> {
        let mut merged: IndexMap<String, Value> =
            self.visible_bindings(&self.globals).into_iter().collect();
        if let Some(locals) = &self.locals {
            merged.extend(self.visible_bindings(locals));
        }
        merged
    }

    /// Record a step at the current position.
    ///
    /// Fails when the step budget, the deadline or the memory limit is
    /// exhausted; the step is not recorded in that case.
    pub fn create_step(
        &mut self,
        step_type: StepType,
        source_code: &str,
        expression_value: Option<&Value>,
        condition_result: Option<bool>,
    ) -> Result<(), TraceError> {
        self.log.check_budget()?;
        self.deadline.check(self.line)?;

        let bindings = self.live_bindings();
        let heap = self
            .freezer
            .heap_index(bindings.values(), self.config.capture_heap_state);
        let memory_limit = self.config.max_memory_bytes();
        if heap.memory_usage > memory_limit {
            return Err(TraceError::Resource {
                resource: ResourceKind::Memory,
                limit: memory_limit as u64,
                message: format!(
                    "live containers use an estimated {} bytes at line {}",
                    heap.memory_usage, self.line
                ),
            });
        }

        let mut variables_state = IndexMap::with_capacity(bindings.len());
        for (name, value) in &bindings {
            variables_state.insert(name.clone(), self.freezer.freeze(value));
        }
        let expression_value = expression_value.map(|v| self.freezer.freeze(v));
        let call_stack = if self.config.capture_call_stack {
            self.call_stack.frames()
        } else {
            Vec::new()
        };
        let source_code = if self.config.capture_line_execution {
            source_code.to_string()
        } else {
            String::new()
        };
        let elapsed = self.deadline.elapsed_ns();

        let step = ExecutionStep {
            step_number: self.log.next_step_number(),
            timestamp_ns: elapsed,
            line_number: self.line,
            column_number: self.column,
            step_type,
            source_code,
            variables_state,
            stdout_snapshot: self.stdout.snapshot(),
            stderr_snapshot: self.stderr.snapshot(),
            call_stack,
            heap_state: heap.objects,
            expression_value,
            condition_result,
            memory_usage: heap.memory_usage,
            cpu_time_ns: elapsed,
        };
        self.log.push(step)
    }

    pub fn step_count(&self) -> usize {
        self.log.len()
    }

    pub fn last_step(&self) -> Option<&ExecutionStep> {
        self.log.last()
    }

    pub fn into_steps(self) -> Vec<ExecutionStep> {
        self.log.into_steps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::ListObject;
    use std::rc::Rc;

    fn context(config: TracerConfig) -> ExecutionContext {
        ExecutionContext::new(config, None)
    }

    #[test]
    fn test_step_filters_non_data_bindings() {
        let mut ctx = context(TracerConfig {
            ignored_variables: vec!["secret".to_string()],
            ..TracerConfig::default()
        });
        ctx.set_var("x", Value::Int(1));
        ctx.set_var("secret", Value::Int(2));
        ctx.set_var("__name__", Value::str("__main__"));
        ctx.set_var("f", Value::Builtin(Builtin::Len));
        ctx.create_step(StepType::Assignment, "x = 1", Some(&Value::Int(1)), None)
            .unwrap();

        let step = ctx.last_step().unwrap();
        assert_eq!(step.step_number, 1);
        assert_eq!(step.variables_state.len(), 1);
        assert_eq!(step.variable("x"), Some(&Data::Int(1)));
    }

    #[test]
    fn test_locals_overlay_globals() {
        let mut ctx = context(TracerConfig::default());
        ctx.set_var("x", Value::Int(1));
        ctx.set_var("y", Value::Int(2));
        let mut locals = ctx.globals.clone();
        locals.insert("x".to_string(), Value::Int(10));
        locals.insert("z".to_string(), Value::Int(3));
        ctx.locals = Some(locals);
        ctx.create_step(StepType::FunctionCall, "f", None, None).unwrap();

        let step = ctx.last_step().unwrap();
        let names: Vec<&str> = step.variables_state.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(step.variable("x"), Some(&Data::Int(10)));
    }

    #[test]
    fn test_allocation_check_precedes_materialising() {
        let ctx = context(TracerConfig {
            max_memory_mb: 1,
            ..TracerConfig::default()
        });
        assert!(ctx.check_allocation(1000, "range").is_ok());
        let err = ctx.check_allocation(1 << 20, "range").unwrap_err();
        assert!(matches!(
            err,
            TraceError::Resource {
                resource: ResourceKind::Memory,
                limit: 1_048_576,
                ..
            }
        ));
    }

    #[test]
    fn test_memory_limit_raises_resource_fault() {
        let mut ctx = context(TracerConfig {
            max_memory_mb: 1,
            ..TracerConfig::default()
        });
        let items = vec![Value::Int(0); 200_000];
        let list = Rc::new(ListObject::new(ctx.ids.next_id(), items, false));
        ctx.set_var("big", Value::List(list));
        let err = ctx
            .create_step(StepType::Assignment, "", None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            TraceError::Resource {
                resource: ResourceKind::Memory,
                ..
            }
        ));
        assert_eq!(ctx.step_count(), 0);
    }

    #[test]
    fn test_output_limit_and_capture_toggle() {
        let mut ctx = context(TracerConfig {
            max_output_size_mb: 1,
            capture_stderr: false,
            ..TracerConfig::default()
        });
        ctx.write_stderr("ignored").unwrap();
        assert!(ctx.stderr().is_empty());

        let chunk = "x".repeat(600 * 1024);
        ctx.write_stdout(&chunk).unwrap();
        let err = ctx.write_stdout(&chunk).unwrap_err();
        assert!(matches!(
            err,
            TraceError::Resource {
                resource: ResourceKind::Output,
                ..
            }
        ));
    }

    #[test]
    fn test_line_capture_disabled_blanks_source() {
        let mut ctx = context(TracerConfig {
            capture_line_execution: false,
            ..TracerConfig::default()
        });
        ctx.create_step(StepType::Expression, "x + 1", None, None)
            .unwrap();
        assert_eq!(ctx.last_step().unwrap().source_code, "");
    }

    #[test]
    fn test_lookup_falls_back_to_builtins() {
        let mut ctx = context(TracerConfig::default());
        assert!(matches!(ctx.lookup("len"), Some(Value::Builtin(Builtin::Len))));
        ctx.set_var("len", Value::Int(3));
        assert!(matches!(ctx.lookup("len"), Some(Value::Int(3))));
        assert!(ctx.del_var("len"));
        assert!(!ctx.del_var("len"));
        assert!(ctx.lookup("missing").is_none());
    }
}
