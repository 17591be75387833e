// Execution engine for the traced language

use crate::interpreter::config::TracerConfig;
use crate::interpreter::context::ExecutionContext;
use crate::interpreter::errors::TraceError;
use crate::memory::stack::{CallFrame, MAIN_MODULE};
use crate::memory::value::{FunctionValue, Value};
use crate::parser::ast::{FunctionDef, Module, SourceLocation, Span, Stmt};
use crate::parser::parse_source;
use crate::snapshot::{ExecutionStep, StepType};
use indexmap::IndexMap;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Non-local control flow raised by `break`, `continue` and `return`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return,
}

/// Tree-walking interpreter for one trace
pub struct Interpreter {
    /// Namespaces, limits, output and step log
    pub(crate) ctx: ExecutionContext,

    /// Program text, sliced for step source excerpts
    pub(crate) source: Rc<str>,

    /// Pending control-flow signal of the statement just executed
    pub(crate) control_flow: ControlFlow,

    /// Value carried by a pending `return`
    pub(crate) return_value: Option<Value>,
}

impl Interpreter {
    pub fn new(source: &str, config: TracerConfig, cancel: Option<Arc<AtomicBool>>) -> Self {
        let mut ctx = ExecutionContext::new(config, cancel);
        ctx.globals
            .insert("__name__".to_string(), Value::str(MAIN_MODULE));
        Interpreter {
            ctx,
            source: Rc::from(source),
            control_flow: ControlFlow::Normal,
            return_value: None,
        }
    }

    /// Run the program from start to finish
    pub fn run(&mut self, module: &Module) -> Result<(), TraceError> {
        self.execute_block(&module.body)?;
        self.control_flow = ControlFlow::Normal;
        Ok(())
    }

    pub fn into_steps(self) -> Vec<ExecutionStep> {
        self.ctx.into_steps()
    }

    /// Execute statements until one raises a control-flow signal
    pub(crate) fn execute_block(&mut self, body: &[Stmt]) -> Result<(), TraceError> {
        for stmt in body {
            self.execute_statement(stmt)?;
            if self.control_flow != ControlFlow::Normal {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn set_position(&mut self, location: SourceLocation) {
        self.ctx.line = location.line;
        self.ctx.column = location.column;
    }

    pub(crate) fn span_text(&self, span: Span) -> String {
        span.text(&self.source).to_string()
    }

    /// Text of the current source line
    pub(crate) fn current_line_text(&self) -> String {
        self.ctx
            .line
            .checked_sub(1)
            .and_then(|i| self.source.lines().nth(i))
            .map(|l| l.trim().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn emit(
        &mut self,
        step_type: StepType,
        source_code: &str,
        value: Option<&Value>,
        condition: Option<bool>,
    ) -> Result<(), TraceError> {
        self.ctx
            .create_step(step_type, source_code, value, condition)
    }

    /// Execution fault at the current line
    pub(crate) fn fault(&self, cause: &str, message: impl Into<String>) -> TraceError {
        TraceError::execution(cause, message, self.ctx.line)
    }

    /// Absorb a recoverable fault when running leniently.
    ///
    /// The fault is written to captured stderr, recorded as an EXCEPTION
    /// step, and `fallback` is returned in place of the failed result.
    pub(crate) fn recover<T>(
        &mut self,
        result: Result<T, TraceError>,
        fallback: T,
    ) -> Result<T, TraceError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if self.ctx.config.lenient && err.is_recoverable() => {
                let text = err.stderr_text();
                tracing::trace!(line = self.ctx.line, error = %text, "lenient fallback");
                self.ctx.write_stderr(&text)?;
                self.ctx.write_stderr("\n")?;
                let source = self.current_line_text();
                self.emit(StepType::Exception, &source, Some(&Value::str(&text)), None)?;
                Ok(fallback)
            }
            Err(err) => Err(err),
        }
    }

    /// Call a user-defined function
    pub(crate) fn call_function(
        &mut self,
        func: &Rc<FunctionValue>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        let def = Rc::clone(&func.def);
        let bound = self.bind_arguments(func, args, kwargs)?;

        let mut locals = self.ctx.globals.clone();
        for (name, value) in &bound {
            locals.insert(name.clone(), value.clone());
        }

        let frame = if self.ctx.config.capture_call_stack {
            let arguments = bound
                .iter()
                .map(|(name, value)| (name.clone(), self.ctx.freeze(value)))
                .collect();
            let local_variables = self.ctx.freeze_namespace(&locals);
            CallFrame::new(&def.name, self.ctx.line, arguments, local_variables)
        } else {
            CallFrame::new(&def.name, self.ctx.line, IndexMap::new(), IndexMap::new())
        };
        self.ctx.call_stack.push(frame)?;

        let saved_locals = self.ctx.locals.replace(locals);
        let saved_position = (self.ctx.line, self.ctx.column);

        let result = self.run_function_body(&def);

        self.ctx.call_stack.pop();
        self.ctx.locals = saved_locals;
        self.ctx.line = saved_position.0;
        self.ctx.column = saved_position.1;
        result
    }

    fn run_function_body(&mut self, def: &FunctionDef) -> Result<Value, TraceError> {
        self.emit(StepType::FunctionCall, &def.name, None, None)?;
        self.execute_block(&def.body)?;

        let value = match self.control_flow {
            ControlFlow::Return => self.return_value.take().unwrap_or_default(),
            _ => Value::None,
        };
        self.control_flow = ControlFlow::Normal;

        self.emit(StepType::FunctionReturn, &def.name, Some(&value), None)?;
        Ok(value)
    }

    /// Bind call arguments to parameters in declaration order
    fn bind_arguments(
        &mut self,
        func: &FunctionValue,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<IndexMap<String, Value>, TraceError> {
        let def = &func.def;
        let params = &def.params;
        if args.len() > params.len() {
            return Err(self.fault(
                "TypeError",
                format!(
                    "{}() takes {} positional arguments but {} were given",
                    def.name,
                    params.len(),
                    args.len()
                ),
            ));
        }

        let mut slots: Vec<Option<Value>> = args.into_iter().map(Some).collect();
        slots.resize(params.len(), None);

        for (name, value) in kwargs {
            let Some(index) = params.iter().position(|p| p.name == name) else {
                return Err(self.fault(
                    "TypeError",
                    format!("{}() got an unexpected keyword argument '{}'", def.name, name),
                ));
            };
            if slots[index].is_some() {
                return Err(self.fault(
                    "TypeError",
                    format!("{}() got multiple values for argument '{}'", def.name, name),
                ));
            }
            slots[index] = Some(value);
        }

        let mut bound = IndexMap::with_capacity(params.len());
        for (i, (param, slot)) in params.iter().zip(slots).enumerate() {
            let value = match slot {
                Some(value) => value,
                None => match func.defaults.get(i).cloned().flatten() {
                    Some(default) => default,
                    None => {
                        let missing = Err(self.fault(
                            "TypeError",
                            format!(
                                "{}() missing required argument: '{}'",
                                def.name, param.name
                            ),
                        ));
                        self.recover(missing, Value::None)?
                    }
                },
            };
            bound.insert(param.name.clone(), value);
        }
        Ok(bound)
    }
}

/// Trace `source` under `config`, returning every recorded step.
///
/// Any fault ends the trace; no partial step list is returned.
pub fn trace(source: &str, config: &TracerConfig) -> Result<Vec<ExecutionStep>, TraceError> {
    trace_with_cancellation(source, config, None)
}

/// [`trace`] with an external cancellation flag, polled at every step and
/// loop back-edge. A raised flag ends the trace with a timeout fault.
pub fn trace_with_cancellation(
    source: &str,
    config: &TracerConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<Vec<ExecutionStep>, TraceError> {
    let errors = config.hard_errors();
    if !errors.is_empty() {
        return Err(TraceError::validation(errors.join("; ")));
    }
    for issue in config.validate() {
        if let Some(warning) = issue.strip_prefix("warning: ") {
            tracing::warn!("tracer config: {}", warning);
        }
    }
    if source.trim().is_empty() {
        return Err(TraceError::validation("empty source provided"));
    }
    let length = source.chars().count();
    if length > config.max_source_len {
        return Err(TraceError::validation(format!(
            "source length {} exceeds the maximum of {} characters",
            length, config.max_source_len
        )));
    }

    tracing::info!(mode = config.mode.as_str(), "starting trace");
    let module = parse_source(source).map_err(|e| TraceError::from_parse(e, source))?;

    let mut interpreter = Interpreter::new(source, config.clone(), cancel);
    if let Err(err) = interpreter.run(&module) {
        let err = err.with_source(source);
        tracing::info!(
            steps = interpreter.ctx.step_count(),
            error = %err,
            "trace aborted"
        );
        return Err(err);
    }

    let steps = interpreter.into_steps();
    tracing::info!(steps = steps.len(), "trace completed");
    Ok(steps)
}
