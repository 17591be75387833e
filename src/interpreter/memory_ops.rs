//! Container allocation, iteration and target assignment
//!
//! This module provides the object-level plumbing shared by statements,
//! expressions and builtins:
//!
//! - Allocation of lists, deques, dicts and sets with fresh object ids
//! - Materialising any iterable into a `Vec<Value>`
//! - Binding values to assignment targets (names, subscripts, unpacking)
//!
//! Every container is allocated through [`Interpreter::new_list`] and
//! friends so ids stay sequential in creation order.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::{DictKind, DictObject, HashKey, ListObject, SetObject, Value};
use crate::parser::ast::Expr;
use indexmap::{IndexMap, IndexSet};
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn new_list(&self, items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListObject::new(self.ctx.ids.next_id(), items, false)))
    }

    pub(crate) fn new_deque(&self, items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListObject::new(self.ctx.ids.next_id(), items, true)))
    }

    pub(crate) fn new_dict(&self, entries: IndexMap<HashKey, Value>) -> Value {
        Value::Dict(Rc::new(DictObject::new(self.ctx.ids.next_id(), entries)))
    }

    pub(crate) fn new_dict_of_kind(
        &self,
        entries: IndexMap<HashKey, Value>,
        kind: DictKind,
        default_factory: Option<Value>,
    ) -> Value {
        let dict = DictObject::new(self.ctx.ids.next_id(), entries).with_kind(kind, default_factory);
        Value::Dict(Rc::new(dict))
    }

    pub(crate) fn new_set(&self, items: IndexSet<HashKey>) -> Value {
        Value::Set(Rc::new(SetObject::new(self.ctx.ids.next_id(), items)))
    }

    /// Wrap a value as a dict key or set element
    pub(crate) fn hash_key(&self, value: Value) -> Result<HashKey, TraceError> {
        HashKey::new(value)
            .map_err(|type_name| self.fault("TypeError", format!("unhashable type: '{}'", type_name)))
    }

    /// Collect every item of an iterable
    pub(crate) fn iter_values(&self, value: &Value) -> Result<Vec<Value>, TraceError> {
        match value {
            Value::List(l) => Ok(l.to_vec()),
            Value::Tuple(items) => Ok(items.to_vec()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect()),
            Value::Dict(d) => Ok(d.keys()),
            Value::Set(s) => Ok(s.to_vec()),
            Value::Range(r) => {
                self.ctx.check_allocation(r.len(), "range")?;
                Ok(r.iter().map(Value::Int).collect())
            }
            other => Err(self.fault(
                "TypeError",
                format!("'{}' object is not iterable", other.type_name()),
            )),
        }
    }

    /// Build a set from an iterable
    pub(crate) fn collect_set(&self, items: Vec<Value>) -> Result<IndexSet<HashKey>, TraceError> {
        let mut set = IndexSet::with_capacity(items.len());
        for item in items {
            set.insert(self.hash_key(item)?);
        }
        Ok(set)
    }

    /// Build dict entries from a mapping or an iterable of pairs
    pub(crate) fn collect_entries(&self, source: &Value) -> Result<IndexMap<HashKey, Value>, TraceError> {
        if let Value::Dict(d) = source {
            return Ok(d.entries().clone());
        }
        let mut entries = IndexMap::new();
        for (i, item) in self.iter_values(source)?.into_iter().enumerate() {
            let pair = self.iter_values(&item).map_err(|_| {
                self.fault(
                    "TypeError",
                    format!("cannot convert dictionary update sequence element #{} to a sequence", i),
                )
            })?;
            let [key, value]: [Value; 2] = pair.try_into().map_err(|pair: Vec<Value>| {
                self.fault(
                    "ValueError",
                    format!(
                        "dictionary update sequence element #{} has length {}; 2 is required",
                        i,
                        pair.len()
                    ),
                )
            })?;
            entries.insert(self.hash_key(key)?, value);
        }
        Ok(entries)
    }

    /// Bind `value` to an assignment target
    pub(crate) fn assign_target(&mut self, target: &Expr, value: Value) -> Result<(), TraceError> {
        match target {
            Expr::Name { id, .. } => {
                self.ctx.set_var(id, value);
                Ok(())
            }
            Expr::Subscript { value: object, index, .. } => {
                let container = self.evaluate(object)?;
                let result = match index.as_ref() {
                    Expr::Slice { lower, upper, step, .. } => {
                        let bounds = self.evaluate_slice_bounds(lower, upper, step)?;
                        self.set_slice(&container, bounds, value)
                    }
                    other => {
                        let key = self.evaluate(other)?;
                        self.set_item(&container, key, value)
                    }
                };
                self.recover(result, ())
            }
            Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
                let items = self.iter_values(&value).map_err(|_| {
                    self.fault(
                        "TypeError",
                        format!("cannot unpack non-iterable {} object", value.type_name()),
                    )
                })?;
                if items.len() < elts.len() {
                    return Err(self.fault(
                        "ValueError",
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            elts.len(),
                            items.len()
                        ),
                    ));
                }
                if items.len() > elts.len() {
                    return Err(self.fault(
                        "ValueError",
                        format!("too many values to unpack (expected {})", elts.len()),
                    ));
                }
                for (elt, item) in elts.iter().zip(items) {
                    self.assign_target(elt, item)?;
                }
                Ok(())
            }
            _ => Err(self.fault("SyntaxError", "cannot assign to expression")),
        }
    }

    /// Names bound by a target, used to save and restore comprehension variables
    pub(crate) fn target_names(target: &Expr, out: &mut Vec<String>) {
        match target {
            Expr::Name { id, .. } => out.push(id.clone()),
            Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
                for elt in elts {
                    Self::target_names(elt, out);
                }
            }
            _ => {}
        }
    }

    /// Shallow copy of a container with a fresh identity
    pub(crate) fn shallow_copy(&self, value: &Value) -> Value {
        match value {
            Value::List(l) if l.is_deque => self.new_deque(l.to_vec()),
            Value::List(l) => self.new_list(l.to_vec()),
            Value::Dict(d) => self.new_dict_of_kind(d.entries().clone(), d.kind, d.default_factory.clone()),
            Value::Set(s) => self.new_set(s.items().clone()),
            other => other.clone(),
        }
    }

    /// Recursive copy; shared and cyclic references are preserved via `memo`
    pub(crate) fn deep_copy(&self, value: &Value, memo: &mut IndexMap<u64, Value>) -> Result<Value, TraceError> {
        if let Some(id) = value.object_id() {
            if let Some(done) = memo.get(&id) {
                return Ok(done.clone());
            }
        }
        let copy = match value {
            Value::List(l) => {
                let copy = if l.is_deque { self.new_deque(Vec::new()) } else { self.new_list(Vec::new()) };
                memo.insert(l.id, copy.clone());
                let mut items = Vec::with_capacity(l.len());
                for item in l.to_vec() {
                    items.push(self.deep_copy(&item, memo)?);
                }
                if let Value::List(new) = &copy {
                    new.update(|slot| *slot = items);
                }
                copy
            }
            Value::Dict(d) => {
                let copy = self.new_dict_of_kind(IndexMap::new(), d.kind, d.default_factory.clone());
                memo.insert(d.id, copy.clone());
                let mut entries = IndexMap::with_capacity(d.len());
                for (k, v) in d.pairs() {
                    entries.insert(self.hash_key(self.deep_copy(&k, memo)?)?, self.deep_copy(&v, memo)?);
                }
                if let Value::Dict(new) = &copy {
                    new.update(|slot| *slot = entries);
                }
                copy
            }
            Value::Set(s) => {
                let copy = self.new_set(s.items().clone());
                memo.insert(s.id, copy.clone());
                copy
            }
            Value::Tuple(items) => {
                let mut copied = Vec::with_capacity(items.len());
                for item in items.iter() {
                    copied.push(self.deep_copy(item, memo)?);
                }
                Value::tuple(copied)
            }
            other => other.clone(),
        };
        Ok(copy)
    }
}
