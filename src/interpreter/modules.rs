//! Allow-listed modules
//!
//! Only five standard modules can be imported by traced code. Each is a
//! fixed namespace of [`Builtin`] functions (plus a few `math` constants);
//! the functions themselves are implemented here on [`Interpreter`].
//!
//! `heapq` follows the classic binary-heap sift algorithms exactly, so heap
//! layouts match what learners see in textbooks and reference runs.

use crate::interpreter::builtins::Builtin;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::{DictKind, HashKey, ListObject, Value};
use indexmap::IndexMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Math,
    Heapq,
    Collections,
    Bisect,
    Copy,
}

impl ModuleKind {
    pub fn from_name(name: &str) -> Option<ModuleKind> {
        match name {
            "math" => Some(ModuleKind::Math),
            "heapq" => Some(ModuleKind::Heapq),
            "collections" => Some(ModuleKind::Collections),
            "bisect" => Some(ModuleKind::Bisect),
            "copy" => Some(ModuleKind::Copy),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModuleKind::Math => "math",
            ModuleKind::Heapq => "heapq",
            ModuleKind::Collections => "collections",
            ModuleKind::Bisect => "bisect",
            ModuleKind::Copy => "copy",
        }
    }

    /// Resolve `module.attr`
    pub fn attribute(&self, attr: &str) -> Option<Value> {
        let builtin = match (self, attr) {
            (ModuleKind::Math, "pi") => return Some(Value::Float(std::f64::consts::PI)),
            (ModuleKind::Math, "e") => return Some(Value::Float(std::f64::consts::E)),
            (ModuleKind::Math, "tau") => return Some(Value::Float(std::f64::consts::TAU)),
            (ModuleKind::Math, "inf") => return Some(Value::Float(f64::INFINITY)),
            (ModuleKind::Math, "nan") => return Some(Value::Float(f64::NAN)),
            (ModuleKind::Math, "sqrt") => Builtin::Sqrt,
            (ModuleKind::Math, "floor") => Builtin::Floor,
            (ModuleKind::Math, "ceil") => Builtin::Ceil,
            (ModuleKind::Math, "pow") => Builtin::MathPow,
            (ModuleKind::Math, "log") => Builtin::Log,
            (ModuleKind::Math, "log2") => Builtin::Log2,
            (ModuleKind::Math, "log10") => Builtin::Log10,
            (ModuleKind::Math, "gcd") => Builtin::Gcd,
            (ModuleKind::Math, "fabs") => Builtin::Fabs,
            (ModuleKind::Math, "isqrt") => Builtin::Isqrt,
            (ModuleKind::Heapq, "heappush") => Builtin::HeapPush,
            (ModuleKind::Heapq, "heappop") => Builtin::HeapPop,
            (ModuleKind::Heapq, "heapify") => Builtin::Heapify,
            (ModuleKind::Heapq, "heappushpop") => Builtin::HeapPushPop,
            (ModuleKind::Heapq, "heapreplace") => Builtin::HeapReplace,
            (ModuleKind::Heapq, "nlargest") => Builtin::NLargest,
            (ModuleKind::Heapq, "nsmallest") => Builtin::NSmallest,
            (ModuleKind::Collections, "deque") => Builtin::Deque,
            (ModuleKind::Collections, "Counter") => Builtin::Counter,
            (ModuleKind::Collections, "OrderedDict") => Builtin::OrderedDict,
            (ModuleKind::Collections, "defaultdict") => Builtin::DefaultDict,
            (ModuleKind::Bisect, "bisect_left") => Builtin::BisectLeft,
            (ModuleKind::Bisect, "bisect_right" | "bisect") => Builtin::BisectRight,
            (ModuleKind::Bisect, "insort" | "insort_right") => Builtin::Insort,
            (ModuleKind::Copy, "copy") => Builtin::ShallowCopy,
            (ModuleKind::Copy, "deepcopy") => Builtin::DeepCopy,
            _ => return None,
        };
        Some(Value::Builtin(builtin))
    }
}

impl Interpreter {
    fn expect_args(&self, builtin: Builtin, args: &[Value], min: usize, max: usize) -> Result<(), TraceError> {
        if args.len() < min || args.len() > max {
            return Err(self.fault(
                "TypeError",
                format!("{}() got {} arguments", builtin.name(), args.len()),
            ));
        }
        Ok(())
    }

    fn heap_list(&self, builtin: Builtin, value: &Value) -> Result<Rc<ListObject>, TraceError> {
        match value {
            Value::List(l) if !l.is_deque => Ok(Rc::clone(l)),
            other => Err(self.fault(
                "TypeError",
                format!(
                    "{}() argument 1 must be list, not {}",
                    builtin.name(),
                    other.type_name()
                ),
            )),
        }
    }

    fn math_domain(&self) -> TraceError {
        self.fault("ValueError", "math domain error")
    }

    fn integral_float(&self, x: f64) -> Result<Value, TraceError> {
        if x.is_nan() {
            return Err(self.fault("ValueError", "cannot convert float NaN to integer"));
        }
        if !x.is_finite() || x.abs() >= 9.223_372_036_854_775_807e18 {
            return Err(self.fault("OverflowError", "cannot convert float infinity to integer"));
        }
        Ok(Value::Int(x as i64))
    }

    /// Restore the heap invariant moving `heap[pos]` towards the root
    fn sift_down(&self, heap: &mut [Value], start: usize, mut pos: usize) -> Result<(), TraceError> {
        let item = heap[pos].clone();
        while pos > start {
            let parent = (pos - 1) >> 1;
            if self.less_than(&item, &heap[parent])? {
                heap[pos] = heap[parent].clone();
                pos = parent;
                continue;
            }
            break;
        }
        heap[pos] = item;
        Ok(())
    }

    /// Move the smaller child up until a leaf is reached, then sift down
    fn sift_up(&self, heap: &mut [Value], mut pos: usize) -> Result<(), TraceError> {
        let end = heap.len();
        let start = pos;
        let item = heap[pos].clone();
        let mut child = 2 * pos + 1;
        while child < end {
            let right = child + 1;
            if right < end && !self.less_than(&heap[child], &heap[right])? {
                child = right;
            }
            heap[pos] = heap[child].clone();
            pos = child;
            child = 2 * pos + 1;
        }
        heap[pos] = item;
        self.sift_down(heap, start, pos)
    }

    /// Leftmost (or rightmost) insertion point keeping `items` sorted
    fn bisect(
        &self,
        items: &[Value],
        target: &Value,
        lo: usize,
        hi: usize,
        right: bool,
    ) -> Result<usize, TraceError> {
        let (mut lo, mut hi) = (lo, hi.min(items.len()));
        while lo < hi {
            let mid = (lo + hi) / 2;
            let go_left = if right {
                self.less_than(target, &items[mid])?
            } else {
                !self.less_than(&items[mid], target)?
            };
            if go_left {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    fn bisect_bounds(
        &self,
        builtin: Builtin,
        args: &[Value],
        kwargs: Vec<(String, Value)>,
        len: usize,
    ) -> Result<(usize, usize), TraceError> {
        let mut kw = self.keyword_args(builtin.name(), kwargs, &["lo", "hi"])?;
        let lo = match args.get(2).cloned().or_else(|| kw.take("lo")) {
            Some(v) => self.int_arg(builtin.name(), &v)?,
            None => 0,
        };
        if lo < 0 {
            return Err(self.fault("ValueError", "lo must be non-negative"));
        }
        let hi = match args.get(3).cloned().or_else(|| kw.take("hi")) {
            Some(v) => self.int_arg(builtin.name(), &v)?.max(0) as usize,
            None => len,
        };
        Ok((lo as usize, hi))
    }

    pub(crate) fn counter_from(&self, source: Option<&Value>) -> Result<IndexMap<HashKey, Value>, TraceError> {
        let mut counts: IndexMap<HashKey, Value> = IndexMap::new();
        match source {
            None | Some(Value::None) => {}
            Some(Value::Dict(d)) => {
                for (key, value) in d.entries().iter() {
                    counts.insert(key.clone(), value.clone());
                }
            }
            Some(iterable) => {
                for item in self.iter_values(iterable)? {
                    let key = self.hash_key(item)?;
                    let entry = counts.entry(key).or_insert(Value::Int(0));
                    *entry = Value::Int(entry.as_int().unwrap_or(0) + 1);
                }
            }
        }
        Ok(counts)
    }

    /// Call a function exported by an allow-listed module
    pub(crate) fn call_module_function(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        let name = builtin.name();
        match builtin {
            Builtin::Sqrt => {
                self.expect_args(builtin, &args, 1, 1)?;
                let x = self.float_arg(name, &args[0])?;
                if x < 0.0 {
                    return Err(self.math_domain());
                }
                Ok(Value::Float(x.sqrt()))
            }
            Builtin::Floor | Builtin::Ceil => {
                self.expect_args(builtin, &args, 1, 1)?;
                if let Some(n) = args[0].as_int() {
                    return Ok(Value::Int(n));
                }
                let x = self.float_arg(name, &args[0])?;
                let rounded = if builtin == Builtin::Floor { x.floor() } else { x.ceil() };
                self.integral_float(rounded)
            }
            Builtin::MathPow => {
                self.expect_args(builtin, &args, 2, 2)?;
                let base = self.float_arg(name, &args[0])?;
                let exp = self.float_arg(name, &args[1])?;
                let result = base.powf(exp);
                if result.is_nan() && !base.is_nan() && !exp.is_nan() {
                    return Err(self.math_domain());
                }
                Ok(Value::Float(result))
            }
            Builtin::Log | Builtin::Log2 | Builtin::Log10 => {
                let max = if builtin == Builtin::Log { 2 } else { 1 };
                self.expect_args(builtin, &args, 1, max)?;
                let x = self.float_arg(name, &args[0])?;
                if x <= 0.0 {
                    return Err(self.math_domain());
                }
                let value = match (builtin, args.get(1)) {
                    (Builtin::Log2, _) => x.log2(),
                    (Builtin::Log10, _) => x.log10(),
                    (_, Some(base)) => {
                        let base = self.float_arg(name, base)?;
                        if base <= 0.0 || base == 1.0 {
                            return Err(self.math_domain());
                        }
                        x.ln() / base.ln()
                    }
                    _ => x.ln(),
                };
                Ok(Value::Float(value))
            }
            Builtin::Gcd => {
                let mut acc: i64 = 0;
                for arg in &args {
                    let mut b = self.int_arg(name, arg)?.unsigned_abs();
                    let mut a = acc.unsigned_abs();
                    while b != 0 {
                        (a, b) = (b, a % b);
                    }
                    acc = i64::try_from(a)
                        .map_err(|_| self.fault("OverflowError", "integer overflow in gcd()"))?;
                }
                Ok(Value::Int(acc))
            }
            Builtin::Fabs => {
                self.expect_args(builtin, &args, 1, 1)?;
                Ok(Value::Float(self.float_arg(name, &args[0])?.abs()))
            }
            Builtin::Isqrt => {
                self.expect_args(builtin, &args, 1, 1)?;
                let n = self.int_arg(name, &args[0])?;
                if n < 0 {
                    return Err(self.fault("ValueError", "isqrt() argument must be nonnegative"));
                }
                let mut root = (n as f64).sqrt() as i64;
                while root.checked_mul(root).map_or(true, |sq| sq > n) {
                    root -= 1;
                }
                while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
                    root += 1;
                }
                Ok(Value::Int(root))
            }

            Builtin::HeapPush => {
                self.expect_args(builtin, &args, 2, 2)?;
                let list = self.heap_list(builtin, &args[0])?;
                let mut heap = list.to_vec();
                heap.push(args[1].clone());
                let last = heap.len() - 1;
                self.sift_down(&mut heap, 0, last)?;
                list.update(|items| *items = heap);
                Ok(Value::None)
            }
            Builtin::HeapPop => {
                self.expect_args(builtin, &args, 1, 1)?;
                let list = self.heap_list(builtin, &args[0])?;
                let mut heap = list.to_vec();
                let Some(last) = heap.pop() else {
                    return Err(self.fault("IndexError", "index out of range"));
                };
                let popped = if heap.is_empty() {
                    last
                } else {
                    let top = std::mem::replace(&mut heap[0], last);
                    self.sift_up(&mut heap, 0)?;
                    top
                };
                list.update(|items| *items = heap);
                Ok(popped)
            }
            Builtin::Heapify => {
                self.expect_args(builtin, &args, 1, 1)?;
                let list = self.heap_list(builtin, &args[0])?;
                let mut heap = list.to_vec();
                for pos in (0..heap.len() / 2).rev() {
                    self.sift_up(&mut heap, pos)?;
                }
                list.update(|items| *items = heap);
                Ok(Value::None)
            }
            Builtin::HeapPushPop => {
                self.expect_args(builtin, &args, 2, 2)?;
                let list = self.heap_list(builtin, &args[0])?;
                let mut heap = list.to_vec();
                let mut item = args[1].clone();
                if !heap.is_empty() && self.less_than(&heap[0], &item)? {
                    item = std::mem::replace(&mut heap[0], item);
                    self.sift_up(&mut heap, 0)?;
                    list.update(|items| *items = heap);
                }
                Ok(item)
            }
            Builtin::HeapReplace => {
                self.expect_args(builtin, &args, 2, 2)?;
                let list = self.heap_list(builtin, &args[0])?;
                let mut heap = list.to_vec();
                if heap.is_empty() {
                    return Err(self.fault("IndexError", "index out of range"));
                }
                let top = std::mem::replace(&mut heap[0], args[1].clone());
                self.sift_up(&mut heap, 0)?;
                list.update(|items| *items = heap);
                Ok(top)
            }
            Builtin::NLargest | Builtin::NSmallest => {
                let mut kw = self.keyword_args(name, kwargs, &["key"])?;
                self.expect_args(builtin, &args, 2, 2)?;
                let n = self.int_arg(name, &args[0])?.max(0) as usize;
                let key = kw.take("key");
                let items = self.iter_values(&args[1])?;
                let mut sorted = self.sort_values(items, key.as_ref(), builtin == Builtin::NLargest)?;
                sorted.truncate(n);
                Ok(self.new_list(sorted))
            }

            Builtin::Deque => {
                self.expect_args(builtin, &args, 0, 1)?;
                let items = match args.first() {
                    Some(iterable) => self.iter_values(iterable)?,
                    None => Vec::new(),
                };
                Ok(self.new_deque(items))
            }
            Builtin::Counter => {
                self.expect_args(builtin, &args, 0, 1)?;
                let mut counts = self.counter_from(args.first())?;
                for (key, value) in kwargs {
                    counts.insert(HashKey(Value::str(&key)), value);
                }
                Ok(self.new_dict_of_kind(counts, DictKind::Counter, None))
            }
            Builtin::OrderedDict => {
                self.expect_args(builtin, &args, 0, 1)?;
                let mut entries = match args.first() {
                    Some(source) => self.collect_entries(source)?,
                    None => IndexMap::new(),
                };
                for (key, value) in kwargs {
                    entries.insert(HashKey(Value::str(&key)), value);
                }
                Ok(self.new_dict_of_kind(entries, DictKind::OrderedDict, None))
            }
            Builtin::DefaultDict => {
                self.expect_args(builtin, &args, 0, 2)?;
                let factory = match args.first() {
                    None | Some(Value::None) => None,
                    Some(f @ (Value::Function(_) | Value::Builtin(_))) => Some(f.clone()),
                    Some(_) => {
                        return Err(self.fault("TypeError", "first argument must be callable or None"))
                    }
                };
                let mut entries = match args.get(1) {
                    Some(source) => self.collect_entries(source)?,
                    None => IndexMap::new(),
                };
                for (key, value) in kwargs {
                    entries.insert(HashKey(Value::str(&key)), value);
                }
                Ok(self.new_dict_of_kind(entries, DictKind::DefaultDict, factory))
            }

            Builtin::BisectLeft | Builtin::BisectRight => {
                self.expect_args(builtin, &args, 2, 4)?;
                let items = self.iter_values(&args[0])?;
                let (lo, hi) = self.bisect_bounds(builtin, &args, kwargs, items.len())?;
                let index = self.bisect(&items, &args[1], lo, hi, builtin == Builtin::BisectRight)?;
                Ok(Value::Int(index as i64))
            }
            Builtin::Insort => {
                self.expect_args(builtin, &args, 2, 4)?;
                let list = self.heap_list(builtin, &args[0])?;
                let items = list.to_vec();
                let (lo, hi) = self.bisect_bounds(builtin, &args, kwargs, items.len())?;
                let index = self.bisect(&items, &args[1], lo, hi, true)?;
                let item = args[1].clone();
                list.update(|items| items.insert(index, item));
                Ok(Value::None)
            }

            Builtin::ShallowCopy => {
                self.expect_args(builtin, &args, 1, 1)?;
                Ok(self.shallow_copy(&args[0]))
            }
            Builtin::DeepCopy => {
                self.expect_args(builtin, &args, 1, 1)?;
                let mut memo = IndexMap::new();
                self.deep_copy(&args[0], &mut memo)
            }

            other => Err(self.fault(
                "TypeError",
                format!("'{}' is not a module function", other.name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        assert_eq!(ModuleKind::from_name("heapq"), Some(ModuleKind::Heapq));
        assert_eq!(ModuleKind::from_name("os"), None);
        assert_eq!(ModuleKind::from_name("sys"), None);
    }

    #[test]
    fn test_module_attributes() {
        assert!(matches!(
            ModuleKind::Math.attribute("sqrt"),
            Some(Value::Builtin(Builtin::Sqrt))
        ));
        assert!(matches!(ModuleKind::Math.attribute("inf"), Some(Value::Float(x)) if x.is_infinite()));
        assert!(matches!(
            ModuleKind::Bisect.attribute("bisect"),
            Some(Value::Builtin(Builtin::BisectRight))
        ));
        assert!(ModuleKind::Copy.attribute("pickle").is_none());
        assert!(ModuleKind::Heapq.attribute("sqrt").is_none());
    }
}
