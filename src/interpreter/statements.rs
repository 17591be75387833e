//! Statement execution implementation
//!
//! This module handles every statement kind of the traced language:
//!
//! - Expression statements and assignments (plain, augmented, annotated)
//! - `if`/`elif`/`else` (loops live in [`super::loops`])
//! - Function definitions and `return`
//! - `del`, `import`, `from ... import`
//! - `pass`, `break`, `continue`
//!
//! # Instrumentation
//!
//! Statements are where steps are emitted: an ASSIGNMENT after a binding
//! completes, a CONDITION once an `if` test is known, an EXPRESSION for a
//! bare expression (when enabled), and an IMPORT per import statement.
//!
//! # Control Flow
//!
//! `break`, `continue` and `return` only set `control_flow`; blocks stop
//! at the first non-normal signal and the enclosing loop or call consumes it.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::TraceError;
use crate::interpreter::modules::ModuleKind;
use crate::memory::value::{FunctionValue, Value};
use crate::parser::ast::{Alias, BinOp, Expr, FunctionDef, Span, Stmt};
use crate::snapshot::StepType;
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Result<(), TraceError> {
        self.set_position(stmt.location());

        match stmt {
            Stmt::Expr { value, span, .. } => {
                let result = self.evaluate(value)?;
                if self.ctx.config.capture_expressions && !value.is_print_call() {
                    let source = self.span_text(*span);
                    self.emit(StepType::Expression, &source, Some(&result), None)?;
                }
                Ok(())
            }

            Stmt::Assign {
                targets,
                value,
                span,
                ..
            } => {
                let value = self.evaluate(value)?;
                for target in targets {
                    self.assign_target(target, value.clone())?;
                }
                self.emit_assignment(*span, &value)
            }

            Stmt::AugAssign {
                target,
                op,
                value,
                span,
                ..
            } => self.execute_aug_assign(target, *op, value, *span),

            Stmt::AnnAssign {
                target,
                value,
                span,
                ..
            } => {
                // A bare annotation binds nothing
                let Some(value) = value else {
                    return Ok(());
                };
                let value = self.evaluate(value)?;
                self.assign_target(target, value.clone())?;
                self.emit_assignment(*span, &value)
            }

            Stmt::If {
                test,
                body,
                orelse,
                test_span,
                ..
            } => {
                let condition = self.evaluate(test)?.truthy();
                let source = self.span_text(*test_span);
                self.emit(StepType::Condition, &source, None, Some(condition))?;
                if condition {
                    self.execute_block(body)
                } else {
                    self.execute_block(orelse)
                }
            }

            Stmt::While {
                test,
                body,
                location,
                test_span,
            } => self.execute_while(test, body, *location, *test_span),

            Stmt::For {
                target,
                iter,
                body,
                location,
                header_span,
            } => self.execute_for(target, iter, body, *location, *header_span),

            Stmt::FunctionDef { def, .. } => self.execute_function_def(def),

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::None,
                };
                self.return_value = Some(value);
                self.control_flow = ControlFlow::Return;
                Ok(())
            }

            Stmt::Delete { targets, span, .. } => {
                for target in targets {
                    self.delete_target(target)?;
                }
                let source = self.span_text(*span);
                self.emit(StepType::Assignment, &source, None, None)
            }

            Stmt::Import { names, span, .. } => {
                for alias in names {
                    let module = self.resolve_module(&alias.name)?;
                    self.ctx.set_var(alias.bound_name(), Value::Module(module));
                }
                let source = self.span_text(*span);
                self.emit(StepType::Import, &source, None, None)
            }

            Stmt::ImportFrom {
                module,
                names,
                span,
                ..
            } => {
                let kind = self.resolve_module(module)?;
                for alias in names {
                    let value = self.import_name(kind, alias)?;
                    self.ctx.set_var(alias.bound_name(), value);
                }
                let source = self.span_text(*span);
                self.emit(StepType::Import, &source, None, None)
            }

            Stmt::Pass { .. } => Ok(()),

            Stmt::Break { .. } => {
                self.control_flow = ControlFlow::Break;
                Ok(())
            }

            Stmt::Continue { .. } => {
                self.control_flow = ControlFlow::Continue;
                Ok(())
            }
        }
    }

    fn emit_assignment(&mut self, span: Span, value: &Value) -> Result<(), TraceError> {
        let source = self.span_text(span);
        self.emit(StepType::Assignment, &source, Some(value), None)
    }

    fn execute_aug_assign(
        &mut self,
        target: &Expr,
        op: BinOp,
        value: &Expr,
        span: Span,
    ) -> Result<(), TraceError> {
        let result = match target {
            Expr::Name { id, .. } => {
                let current = self.evaluate(target)?;
                let operand = self.evaluate(value)?;
                let result = self.apply_augmented(op, &current, &operand)?;
                self.ctx.set_var(id, result.clone());
                result
            }
            Expr::Subscript {
                value: object,
                index,
                ..
            } => {
                // Container and key are evaluated once and reused for the store
                let container = self.evaluate(object)?;
                let key = self.evaluate(index)?;
                let read = self.get_item(&container, key.clone());
                let current = self.recover(read, Value::None)?;
                let operand = self.evaluate(value)?;
                let result = self.apply_augmented(op, &current, &operand)?;
                let write = self.set_item(&container, key, result.clone());
                self.recover(write, ())?;
                result
            }
            _ => {
                return Err(self.fault(
                    "SyntaxError",
                    "illegal expression for augmented assignment",
                ))
            }
        };
        self.emit_assignment(span, &result)
    }

    fn execute_function_def(&mut self, def: &Rc<FunctionDef>) -> Result<(), TraceError> {
        let mut defaults = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let default = match &param.default {
                Some(expr) => Some(self.evaluate(expr)?),
                None => None,
            };
            defaults.push(default);
        }
        let function = FunctionValue {
            def: Rc::clone(def),
            defaults,
        };
        self.ctx
            .set_var(&def.name, Value::Function(Rc::new(function)));
        Ok(())
    }

    fn delete_target(&mut self, target: &Expr) -> Result<(), TraceError> {
        match target {
            Expr::Name { id, .. } => {
                if self.ctx.del_var(id) {
                    return Ok(());
                }
                let missing = Err(self.fault("NameError", format!("name '{}' is not defined", id)));
                self.recover(missing, ())
            }
            Expr::Subscript {
                value: object,
                index,
                ..
            } => {
                let container = self.evaluate(object)?;
                let result = match index.as_ref() {
                    Expr::Slice {
                        lower, upper, step, ..
                    } => {
                        let bounds = self.evaluate_slice_bounds(lower, upper, step)?;
                        self.del_slice(&container, bounds)
                    }
                    key => {
                        let key = self.evaluate(key)?;
                        self.del_item(&container, key)
                    }
                };
                self.recover(result, ())
            }
            Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
                for elt in elts {
                    self.delete_target(elt)?;
                }
                Ok(())
            }
            _ => Err(self.fault("SyntaxError", "cannot delete expression")),
        }
    }

    /// Look a module up in the allow-list
    fn resolve_module(&self, name: &str) -> Result<ModuleKind, TraceError> {
        if !self.ctx.config.allow_imports {
            return Err(self.fault(
                "ImportError",
                format!("import of '{}' is not allowed: imports are disabled", name),
            ));
        }
        ModuleKind::from_name(name).ok_or_else(|| {
            self.fault(
                "ImportError",
                format!("import of '{}' is not allowed", name),
            )
        })
    }

    fn import_name(&self, module: ModuleKind, alias: &Alias) -> Result<Value, TraceError> {
        module.attribute(&alias.name).ok_or_else(|| {
            self.fault(
                "ImportError",
                format!(
                    "cannot import name '{}' from '{}'",
                    alias.name,
                    module.name()
                ),
            )
        })
    }
}
