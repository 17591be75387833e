//! Expression evaluation.
//!
//! Adds `impl Interpreter` methods that reduce an [`Expr`] to a [`Value`].
//! Lenient fallbacks are applied at the failing site (operators, subscripts,
//! attributes, names, unknown callees) through [`Interpreter::recover`], so
//! a fault deep inside an expression only replaces the sub-result that failed.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::Value;
use crate::parser::ast::{BoolOp, Constant, Expr, FStringPart, Keyword};
use indexmap::IndexMap;
use std::rc::Rc;

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::None => Value::None,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(n) => Value::Int(*n),
        Constant::Float(x) => Value::Float(*x),
        Constant::Str(s) => Value::Str(Rc::clone(s)),
    }
}

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expr: &Expr) -> Result<Value, TraceError> {
        match expr {
            Expr::Constant { value, .. } => Ok(constant_value(value)),

            Expr::Name { id, .. } => self.load_name(id),

            Expr::List { elts, .. } => {
                let items = self.evaluate_all(elts)?;
                Ok(self.new_list(items))
            }

            Expr::Tuple { elts, .. } => {
                let items = self.evaluate_all(elts)?;
                Ok(Value::tuple(items))
            }

            Expr::Set { elts, .. } => {
                let items = self.evaluate_all(elts)?;
                let set = self.collect_set(items)?;
                Ok(self.new_set(set))
            }

            Expr::Dict { keys, values, .. } => {
                let mut entries = IndexMap::with_capacity(keys.len());
                for (key, value) in keys.iter().zip(values) {
                    let key = self.evaluate(key)?;
                    let value = self.evaluate(value)?;
                    entries.insert(self.hash_key(key)?, value);
                }
                Ok(self.new_dict(entries))
            }

            Expr::BinOp { left, op, right, .. } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.apply_binary(*op, &left, &right)
            }

            Expr::UnaryOp { op, operand, .. } => {
                let operand = self.evaluate(operand)?;
                self.apply_unary(*op, &operand)
            }

            Expr::BoolOp { op, values, .. } => {
                let mut last = Value::None;
                for value in values {
                    last = self.evaluate(value)?;
                    let decided = match op {
                        BoolOp::And => !last.truthy(),
                        BoolOp::Or => last.truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }

            Expr::Compare {
                left,
                ops,
                comparators,
                ..
            } => {
                let mut left = self.evaluate(left)?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    let right = self.evaluate(comparator)?;
                    if !self.apply_compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }

            Expr::Subscript { value, index, .. } => {
                let container = self.evaluate(value)?;
                let result = match index.as_ref() {
                    Expr::Slice {
                        lower, upper, step, ..
                    } => {
                        let bounds = self.evaluate_slice_bounds(lower, upper, step)?;
                        self.get_slice(&container, bounds)
                    }
                    key => {
                        let key = self.evaluate(key)?;
                        self.get_item(&container, key)
                    }
                };
                self.recover(result, Value::None)
            }

            Expr::Slice { .. } => Err(self.fault("SyntaxError", "slice outside of a subscript")),

            Expr::Attribute { value, attr, .. } => {
                let object = self.evaluate(value)?;
                let result = self.get_attribute(&object, attr);
                self.recover(result, Value::None)
            }

            Expr::Call {
                func,
                args,
                keywords,
                ..
            } => self.evaluate_call(func, args, keywords),

            Expr::FString { parts, .. } => self.evaluate_fstring(parts),

            Expr::IfExp {
                test, body, orelse, ..
            } => {
                if self.evaluate(test)?.truthy() {
                    self.evaluate(body)
                } else {
                    self.evaluate(orelse)
                }
            }

            Expr::ListComp {
                elt,
                target,
                iter,
                ifs,
                ..
            } => self.evaluate_list_comp(elt, target, iter, ifs),
        }
    }

    pub(crate) fn evaluate_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, TraceError> {
        exprs.iter().map(|e| self.evaluate(e)).collect()
    }

    fn load_name(&mut self, id: &str) -> Result<Value, TraceError> {
        match self.ctx.lookup(id) {
            Some(value) => Ok(value),
            None => {
                let missing = Err(self.fault("NameError", format!("name '{}' is not defined", id)));
                self.recover(missing, Value::None)
            }
        }
    }

    fn evaluate_arguments(
        &mut self,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), TraceError> {
        let positional = self.evaluate_all(args)?;
        let mut named = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let value = self.evaluate(&keyword.value)?;
            named.push((keyword.name.clone(), value));
        }
        Ok((positional, named))
    }

    fn evaluate_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<Value, TraceError> {
        match func {
            Expr::Attribute { value, attr, .. } => {
                let receiver = self.evaluate(value)?;
                let (positional, named) = self.evaluate_arguments(args, keywords)?;
                if let Value::Module(module) = &receiver {
                    return match module.attribute(attr) {
                        Some(callee) => self.call_value(&callee, positional, named),
                        None => {
                            let missing = self.get_attribute(&receiver, attr).map(|_| Value::None);
                            self.recover(missing, Value::None)
                        }
                    };
                }
                if !Self::has_method(&receiver, attr) {
                    let missing = self.get_attribute(&receiver, attr);
                    return self.recover(missing, Value::None);
                }
                self.call_method(&receiver, attr, positional, named)
            }
            Expr::Name { id, .. } => {
                let callee = self.ctx.lookup(id);
                let (positional, named) = self.evaluate_arguments(args, keywords)?;
                match callee {
                    Some(callee) => self.call_value(&callee, positional, named),
                    None => {
                        let missing =
                            Err(self.fault("NameError", format!("name '{}' is not defined", id)));
                        self.recover(missing, Value::None)
                    }
                }
            }
            other => {
                let callee = self.evaluate(other)?;
                let (positional, named) = self.evaluate_arguments(args, keywords)?;
                self.call_value(&callee, positional, named)
            }
        }
    }

    /// Invoke any callable value
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        match callee {
            Value::Function(func) => {
                let func = Rc::clone(func);
                self.call_function(&func, args, kwargs)
            }
            Value::Builtin(builtin) => self.call_builtin(*builtin, args, kwargs),
            other => Err(self.fault(
                "TypeError",
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn evaluate_fstring(&mut self, parts: &[FStringPart]) -> Result<Value, TraceError> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Value {
                    expr,
                    conversion,
                    format_spec,
                } => {
                    let value = self.evaluate(expr)?;
                    let value = match conversion {
                        Some('r') | Some('a') => Value::str(&value.repr()),
                        Some(_) => Value::str(&value.py_str()),
                        None => value,
                    };
                    match format_spec {
                        Some(spec) => {
                            let text = self.format_with_spec(&value, spec)?;
                            out.push_str(&text);
                        }
                        None => out.push_str(&value.py_str()),
                    }
                }
            }
        }
        Ok(Value::str(&out))
    }

    fn evaluate_list_comp(
        &mut self,
        elt: &Expr,
        target: &Expr,
        iter: &Expr,
        ifs: &[Expr],
    ) -> Result<Value, TraceError> {
        let iterable = self.evaluate(iter)?;
        let items = match iterable {
            Value::None if self.ctx.config.lenient => Vec::new(),
            other => self.iter_values(&other)?,
        };

        let mut names = Vec::new();
        Self::target_names(target, &mut names);
        let saved: Vec<(String, Option<Value>)> = names
            .into_iter()
            .map(|name| {
                let previous = self.ctx.innermost(&name);
                (name, previous)
            })
            .collect();

        let result = self.run_comprehension(elt, target, items, ifs);

        for (name, previous) in saved {
            match previous {
                Some(value) => self.ctx.set_var(&name, value),
                None => {
                    self.ctx.del_var(&name);
                }
            }
        }

        let values = result?;
        Ok(self.new_list(values))
    }

    fn run_comprehension(
        &mut self,
        elt: &Expr,
        target: &Expr,
        items: Vec<Value>,
        ifs: &[Expr],
    ) -> Result<Vec<Value>, TraceError> {
        let mut values = Vec::with_capacity(items.len());
        'items: for item in items {
            self.ctx.check_deadline()?;
            self.assign_target(target, item)?;
            for condition in ifs {
                if !self.evaluate(condition)?.truthy() {
                    continue 'items;
                }
            }
            values.push(self.evaluate(elt)?);
        }
        Ok(values)
    }
}
