//! Subscript reads, writes and deletes, including slices

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::{repr_str, DictKind, Value};
use crate::parser::ast::Expr;

/// Evaluated `start:stop:step` of a slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SliceBounds {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceBounds {
    /// Positions selected from a sequence of `len` items, in selection order
    pub(crate) fn indices(&self, len: usize) -> Result<Vec<usize>, &'static str> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err("slice step cannot be zero");
        }
        let len = len as i64;
        let mut out = Vec::new();
        if step > 0 {
            let clamp = |bound: i64| {
                if bound < 0 {
                    (bound + len).max(0)
                } else {
                    bound.min(len)
                }
            };
            let start = self.start.map_or(0, clamp);
            let stop = self.stop.map_or(len, clamp);
            let mut i = start;
            while i < stop {
                out.push(i as usize);
                i += step;
            }
        } else {
            let clamp = |bound: i64| {
                if bound < 0 {
                    (bound + len).max(-1)
                } else {
                    bound.min(len - 1)
                }
            };
            let start = self.start.map_or(len - 1, clamp);
            let stop = self.stop.map_or(-1, clamp);
            let mut i = start;
            while i > stop {
                out.push(i as usize);
                i += step;
            }
        }
        Ok(out)
    }

    /// `(start, stop)` of a contiguous step-1 slice, clamped to `len`
    fn contiguous(&self, len: usize) -> (usize, usize) {
        let len = len as i64;
        let clamp = |bound: i64| {
            if bound < 0 {
                (bound + len).max(0)
            } else {
                bound.min(len)
            }
        };
        let start = self.start.map_or(0, clamp);
        let stop = self.stop.map_or(len, clamp).max(start);
        (start as usize, stop as usize)
    }
}

impl Interpreter {
    pub(crate) fn evaluate_slice_bounds(
        &mut self,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> Result<SliceBounds, TraceError> {
        Ok(SliceBounds {
            start: self.slice_bound(lower)?,
            stop: self.slice_bound(upper)?,
            step: self.slice_bound(step)?,
        })
    }

    fn slice_bound(&mut self, expr: &Option<Box<Expr>>) -> Result<Option<i64>, TraceError> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match self.evaluate(expr)? {
            Value::None => Ok(None),
            value => value.as_int().map(Some).ok_or_else(|| {
                self.fault(
                    "TypeError",
                    "slice indices must be integers or None or have an __index__ method",
                )
            }),
        }
    }

    /// Resolve a possibly negative index against `len`
    pub(crate) fn normalize_index(
        &self,
        index: &Value,
        len: usize,
        type_name: &str,
    ) -> Result<usize, TraceError> {
        let Some(i) = index.as_int() else {
            return Err(self.fault(
                "TypeError",
                format!(
                    "{} indices must be integers or slices, not {}",
                    type_name,
                    index.type_name()
                ),
            ));
        };
        let resolved = if i < 0 { i + len as i64 } else { i };
        if resolved < 0 || resolved >= len as i64 {
            return Err(self.fault("IndexError", format!("{} index out of range", type_name)));
        }
        Ok(resolved as usize)
    }

    /// `container[key]`
    pub(crate) fn get_item(&mut self, container: &Value, key: Value) -> Result<Value, TraceError> {
        match container {
            Value::List(l) => {
                let type_name = container.type_name();
                let items = l.items();
                let i = self.normalize_index(&key, items.len(), type_name)?;
                Ok(items[i].clone())
            }
            Value::Tuple(items) => {
                let i = self.normalize_index(&key, items.len(), "tuple")?;
                Ok(items[i].clone())
            }
            Value::Str(s) => {
                let count = s.chars().count();
                let i = self.normalize_index(&key, count, "string")?;
                let ch = s.chars().nth(i).unwrap_or_default();
                Ok(Value::str(ch.encode_utf8(&mut [0; 4])))
            }
            Value::Range(r) => {
                let i = self.normalize_index(&key, r.len(), "range object")?;
                Ok(r.get(i).map(Value::Int).unwrap_or_default())
            }
            Value::Dict(d) => {
                let hash_key = self.hash_key(key.clone())?;
                if let Some(value) = d.get(&hash_key) {
                    return Ok(value);
                }
                match (d.kind, d.default_factory.clone()) {
                    (DictKind::Counter, _) => Ok(Value::Int(0)),
                    (DictKind::DefaultDict, Some(factory)) => {
                        let value = self.call_value(&factory, Vec::new(), Vec::new())?;
                        d.update(|entries| entries.insert(hash_key, value.clone()));
                        Ok(value)
                    }
                    _ => Err(self.fault("KeyError", key.repr())),
                }
            }
            other => Err(self.fault(
                "TypeError",
                format!("'{}' object is not subscriptable", other.type_name()),
            )),
        }
    }

    /// `container[start:stop:step]`
    pub(crate) fn get_slice(&self, container: &Value, bounds: SliceBounds) -> Result<Value, TraceError> {
        let pick = |len: usize| {
            bounds
                .indices(len)
                .map_err(|message| self.fault("ValueError", message))
        };
        match container {
            Value::List(l) if !l.is_deque => {
                let items = l.to_vec();
                let picked = pick(items.len())?.into_iter().map(|i| items[i].clone()).collect();
                Ok(self.new_list(picked))
            }
            Value::Tuple(items) => {
                let picked = pick(items.len())?.into_iter().map(|i| items[i].clone()).collect();
                Ok(Value::tuple(picked))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let picked: String = pick(chars.len())?.into_iter().map(|i| chars[i]).collect();
                Ok(Value::str(&picked))
            }
            Value::Range(r) => {
                self.ctx.check_allocation(r.len(), "range slice")?;
                let picked = pick(r.len())?
                    .into_iter()
                    .filter_map(|i| r.get(i))
                    .map(Value::Int)
                    .collect();
                Ok(self.new_list(picked))
            }
            other => Err(self.fault(
                "TypeError",
                format!("'{}' object is not subscriptable by a slice", other.type_name()),
            )),
        }
    }

    /// `container[key] = value`
    pub(crate) fn set_item(&mut self, container: &Value, key: Value, value: Value) -> Result<(), TraceError> {
        match container {
            Value::List(l) => {
                let type_name = container.type_name();
                let i = self
                    .normalize_index(&key, l.len(), type_name)
                    .map_err(|err| match err.cause() {
                        Some("IndexError") => {
                            self.fault("IndexError", format!("{} assignment index out of range", type_name))
                        }
                        _ => err,
                    })?;
                l.update(|items| items[i] = value);
                Ok(())
            }
            Value::Dict(d) => {
                let hash_key = self.hash_key(key)?;
                d.update(|entries| entries.insert(hash_key, value));
                Ok(())
            }
            other => Err(self.fault(
                "TypeError",
                format!("'{}' object does not support item assignment", other.type_name()),
            )),
        }
    }

    /// `container[start:stop:step] = iterable`
    pub(crate) fn set_slice(&mut self, container: &Value, bounds: SliceBounds, value: Value) -> Result<(), TraceError> {
        let Value::List(l) = container else {
            return Err(self.fault(
                "TypeError",
                format!("'{}' object does not support slice assignment", container.type_name()),
            ));
        };
        let replacement = self.iter_values(&value)?;
        if bounds.step.unwrap_or(1) == 1 {
            let (start, stop) = bounds.contiguous(l.len());
            l.update(|items| {
                items.splice(start..stop, replacement);
            });
            return Ok(());
        }
        let indices = bounds
            .indices(l.len())
            .map_err(|message| self.fault("ValueError", message))?;
        if indices.len() != replacement.len() {
            return Err(self.fault(
                "ValueError",
                format!(
                    "attempt to assign sequence of size {} to extended slice of size {}",
                    replacement.len(),
                    indices.len()
                ),
            ));
        }
        l.update(|items| {
            for (i, item) in indices.into_iter().zip(replacement) {
                items[i] = item;
            }
        });
        Ok(())
    }

    /// `del container[key]`
    pub(crate) fn del_item(&mut self, container: &Value, key: Value) -> Result<(), TraceError> {
        match container {
            Value::List(l) => {
                let type_name = container.type_name();
                let i = self
                    .normalize_index(&key, l.len(), type_name)
                    .map_err(|err| match err.cause() {
                        Some("IndexError") => {
                            self.fault("IndexError", format!("{} assignment index out of range", type_name))
                        }
                        _ => err,
                    })?;
                l.update(|items| items.remove(i));
                Ok(())
            }
            Value::Dict(d) => {
                let hash_key = self.hash_key(key.clone())?;
                match d.update(|entries| entries.shift_remove(&hash_key)) {
                    Some(_) => Ok(()),
                    None => Err(self.fault("KeyError", key.repr())),
                }
            }
            other => Err(self.fault(
                "TypeError",
                format!("'{}' object doesn't support item deletion", other.type_name()),
            )),
        }
    }

    /// `del container[start:stop:step]`
    pub(crate) fn del_slice(&mut self, container: &Value, bounds: SliceBounds) -> Result<(), TraceError> {
        let Value::List(l) = container else {
            return Err(self.fault(
                "TypeError",
                format!("'{}' object doesn't support item deletion", container.type_name()),
            ));
        };
        let mut indices = bounds
            .indices(l.len())
            .map_err(|message| self.fault("ValueError", message))?;
        indices.sort_unstable_by(|a, b| b.cmp(a));
        l.update(|items| {
            for i in indices {
                items.remove(i);
            }
        });
        Ok(())
    }

    /// `obj.attr` outside a call
    pub(crate) fn get_attribute(&self, value: &Value, attr: &str) -> Result<Value, TraceError> {
        if self.ctx.config.sandboxed && attr.starts_with("__") {
            return Err(self.fault(
                "AttributeError",
                format!("access to attribute {} is blocked", repr_str(attr)),
            ));
        }
        if let Value::Module(module) = value {
            return module.attribute(attr).ok_or_else(|| {
                self.fault(
                    "AttributeError",
                    format!("module '{}' has no attribute '{}'", module.name(), attr),
                )
            });
        }
        if Self::has_method(value, attr) {
            return Err(self.fault(
                "TypeError",
                format!("method '{}' of '{}' objects must be called directly", attr, value.type_name()),
            ));
        }
        Err(self.fault(
            "AttributeError",
            format!("'{}' object has no attribute '{}'", value.type_name(), attr),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> SliceBounds {
        SliceBounds { start, stop, step }
    }

    #[test]
    fn test_slice_indices_forward() {
        assert_eq!(bounds(Some(1), Some(3), None).indices(5).unwrap(), vec![1, 2]);
        assert_eq!(bounds(None, None, Some(2)).indices(5).unwrap(), vec![0, 2, 4]);
        assert_eq!(bounds(Some(-2), None, None).indices(5).unwrap(), vec![3, 4]);
        assert_eq!(bounds(Some(10), None, None).indices(5).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_slice_indices_backward() {
        assert_eq!(bounds(None, None, Some(-1)).indices(4).unwrap(), vec![3, 2, 1, 0]);
        assert_eq!(bounds(Some(3), Some(0), Some(-2)).indices(5).unwrap(), vec![3, 1]);
        assert_eq!(bounds(None, None, Some(-1)).indices(0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_zero_step_rejected() {
        assert!(bounds(None, None, Some(0)).indices(3).is_err());
    }

    #[test]
    fn test_contiguous_clamps() {
        assert_eq!(bounds(Some(4), Some(2), None).contiguous(5), (4, 4));
        assert_eq!(bounds(Some(-10), Some(100), None).contiguous(5), (0, 5));
    }
}
