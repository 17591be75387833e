//! Loop statement execution (`while`, `for`).
//!
//! Adds `impl Interpreter` methods for the two loop forms. `break` and
//! `continue` are propagated via `LoopBodyResult` so the loop driver can
//! react without inspecting `control_flow` directly.
//!
//! Both loops poll the deadline at every back-edge, so a loop whose body
//! emits no steps still times out.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::TraceError;
use crate::memory::value::{ListObject, RangeValue, Value};
use crate::parser::ast::{Expr, SourceLocation, Span, Stmt};
use crate::snapshot::StepType;
use std::rc::Rc;

/// Result returned by [`Interpreter::execute_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit cleanly.
    Break,
    /// `return` was triggered; the loop driver should unwind and leave
    /// `self.control_flow` for the caller.
    Exit,
}

/// Items of a `for` loop, produced on demand.
///
/// Lists are read by position on every iteration, so appending to the list
/// being iterated extends the loop.
enum LoopItems {
    Range { range: RangeValue, next: usize },
    List { list: Rc<ListObject>, next: usize },
    Values { items: std::vec::IntoIter<Value> },
}

impl LoopItems {
    fn next_item(&mut self) -> Option<Value> {
        match self {
            LoopItems::Range { range, next } => {
                let value = range.get(*next)?;
                *next += 1;
                Some(Value::Int(value))
            }
            LoopItems::List { list, next } => {
                let value = list.items().get(*next).cloned()?;
                *next += 1;
                Some(value)
            }
            LoopItems::Values { items } => items.next(),
        }
    }
}

impl Interpreter {
    /// Executes all statements in `body`.
    ///
    /// Returns [`LoopBodyResult::Continue`] if the body ran to completion or hit
    /// `continue`, [`LoopBodyResult::Break`] on `break`, and
    /// [`LoopBodyResult::Exit`] on `return`.
    pub(crate) fn execute_loop_body(&mut self, body: &[Stmt]) -> Result<LoopBodyResult, TraceError> {
        self.execute_block(body)?;
        match self.control_flow {
            ControlFlow::Normal => Ok(LoopBodyResult::Continue),
            ControlFlow::Continue => {
                self.control_flow = ControlFlow::Normal;
                Ok(LoopBodyResult::Continue)
            }
            ControlFlow::Break => {
                self.control_flow = ControlFlow::Normal;
                Ok(LoopBodyResult::Break)
            }
            ControlFlow::Return => Ok(LoopBodyResult::Exit),
        }
    }

    /// Executes a `while test: body` loop.
    ///
    /// Emits LOOP_START once, LOOP_ITERATION after every completed pass and
    /// LOOP_END on exit, `break` included. A `return` leaves without LOOP_END.
    pub(crate) fn execute_while(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        location: SourceLocation,
        test_span: Span,
    ) -> Result<(), TraceError> {
        let header = self.span_text(test_span);
        self.emit(StepType::LoopStart, &header, None, None)?;

        loop {
            self.set_position(location);
            self.ctx.check_deadline()?;
            if !self.evaluate(test)?.truthy() {
                break;
            }

            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit => return Ok(()),
                LoopBodyResult::Break => break,
                LoopBodyResult::Continue => {}
            }

            self.set_position(location);
            self.emit(StepType::LoopIteration, &header, None, None)?;
        }

        self.set_position(location);
        self.emit(StepType::LoopEnd, &header, None, None)
    }

    /// Executes a `for target in iter: body` loop.
    ///
    /// A `None` iterable is skipped without any step when lenient.
    pub(crate) fn execute_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        location: SourceLocation,
        header_span: Span,
    ) -> Result<(), TraceError> {
        let iterable = self.evaluate(iter)?;
        let mut items = match iterable {
            Value::None if self.ctx.config.lenient => return Ok(()),
            Value::Range(range) => LoopItems::Range { range, next: 0 },
            Value::List(list) => LoopItems::List { list, next: 0 },
            other => LoopItems::Values {
                items: self.iter_values(&other)?.into_iter(),
            },
        };

        let header = self.span_text(header_span);
        self.set_position(location);
        self.emit(StepType::LoopStart, &header, None, None)?;

        while let Some(item) = items.next_item() {
            self.set_position(location);
            self.ctx.check_deadline()?;
            self.assign_target(target, item)?;

            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit => return Ok(()),
                LoopBodyResult::Break => break,
                LoopBodyResult::Continue => {}
            }

            self.set_position(location);
            self.emit(StepType::LoopIteration, &header, None, None)?;
        }

        self.set_position(location);
        self.emit(StepType::LoopEnd, &header, None, None)
    }
}
