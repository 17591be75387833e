//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all possible runtime
//! values of the traced language.
//!
//! # Value Types
//!
//! - Scalars: [`Value::None`], [`Value::Bool`], [`Value::Int`], [`Value::Float`],
//!   [`Value::Str`]. Copied (or `Rc`-shared and immutable) on assignment.
//! - Mutable containers: [`Value::List`] (also used for `deque`),
//!   [`Value::Dict`], [`Value::Set`]. Reference semantics: two names bound to
//!   the same list alias one [`ListObject`]. Each container carries a per-trace
//!   object id and a version counter bumped on every mutation, which the
//!   snapshot freezer uses to reuse unchanged snapshots.
//! - [`Value::Tuple`] and [`Value::Range`]: immutable sequences.
//! - Callables and namespaces: [`Value::Function`], [`Value::Builtin`],
//!   [`Value::Module`]. These are never captured in step snapshots.

use crate::interpreter::builtins::Builtin;
use crate::interpreter::modules::ModuleKind;
use crate::parser::ast::FunctionDef;
use indexmap::{IndexMap, IndexSet};
use std::cell::{Cell, Ref, RefCell};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Identity of a mutable container, allocated sequentially per trace
pub type ObjectId = u64;

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<ListObject>),
    Tuple(Rc<[Value]>),
    Dict(Rc<DictObject>),
    Set(Rc<SetObject>),
    Range(RangeValue),
    Function(Rc<FunctionValue>),
    Builtin(Builtin),
    Module(ModuleKind),
}

/// A list or deque. Both share the representation; `is_deque` only changes
/// the type name and the available methods.
#[derive(Debug)]
pub struct ListObject {
    pub id: ObjectId,
    pub is_deque: bool,
    items: RefCell<Vec<Value>>,
    version: Cell<u64>,
}

impl ListObject {
    pub fn new(id: ObjectId, items: Vec<Value>, is_deque: bool) -> Self {
        ListObject {
            id,
            is_deque,
            items: RefCell::new(items),
            version: Cell::new(0),
        }
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    /// Clone the current items out, releasing the borrow
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Mutate the items and bump the version
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        self.version.set(self.version.get() + 1);
        f(&mut self.items.borrow_mut())
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }
}

/// Dict flavours from the `collections` module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictKind {
    Plain,
    Counter,
    OrderedDict,
    DefaultDict,
}

#[derive(Debug)]
pub struct DictObject {
    pub id: ObjectId,
    pub kind: DictKind,
    /// Factory called for missing keys of a `defaultdict`
    pub default_factory: Option<Value>,
    entries: RefCell<IndexMap<HashKey, Value>>,
    version: Cell<u64>,
}

impl DictObject {
    pub fn new(id: ObjectId, entries: IndexMap<HashKey, Value>) -> Self {
        DictObject {
            id,
            kind: DictKind::Plain,
            default_factory: None,
            entries: RefCell::new(entries),
            version: Cell::new(0),
        }
    }

    pub fn with_kind(mut self, kind: DictKind, default_factory: Option<Value>) -> Self {
        self.kind = kind;
        self.default_factory = default_factory;
        self
    }

    pub fn entries(&self) -> Ref<'_, IndexMap<HashKey, Value>> {
        self.entries.borrow()
    }

    pub fn get(&self, key: &HashKey) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.borrow().keys().map(|k| k.0.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.borrow().values().cloned().collect()
    }

    pub fn pairs(&self) -> Vec<(Value, Value)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.0.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut IndexMap<HashKey, Value>) -> R) -> R {
        self.version.set(self.version.get() + 1);
        f(&mut self.entries.borrow_mut())
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }
}

/// A set; iteration follows insertion order so traces are reproducible
#[derive(Debug)]
pub struct SetObject {
    pub id: ObjectId,
    items: RefCell<IndexSet<HashKey>>,
    version: Cell<u64>,
}

impl SetObject {
    pub fn new(id: ObjectId, items: IndexSet<HashKey>) -> Self {
        SetObject {
            id,
            items: RefCell::new(items),
            version: Cell::new(0),
        }
    }

    pub fn items(&self) -> Ref<'_, IndexSet<HashKey>> {
        self.items.borrow()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().iter().map(|k| k.0.clone()).collect()
    }

    pub fn contains(&self, key: &HashKey) -> bool {
        self.items.borrow().contains(key)
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut IndexSet<HashKey>) -> R) -> R {
        self.version.set(self.version.get() + 1);
        f(&mut self.items.borrow_mut())
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }
}

/// `range(start, stop, step)`; step is never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            self.stop.saturating_sub(self.start)
        } else {
            self.start.saturating_sub(self.stop)
        };
        if span <= 0 {
            0
        } else {
            let step = self.step.unsigned_abs();
            ((span as u64).div_ceil(step)) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index < self.len() {
            Some(self.start + self.step * index as i64)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let range = *self;
        (0..range.len()).map(move |i| range.start + range.step * i as i64)
    }
}

/// User-defined function with its defaults evaluated at definition time
#[derive(Debug)]
pub struct FunctionValue {
    pub def: Rc<FunctionDef>,
    pub defaults: Vec<Option<Value>>,
}

/// Hashable wrapper used as dict key and set element.
///
/// Hashing is numeric-consistent: `1`, `1.0` and `True` are the same key.
#[derive(Debug, Clone)]
pub struct HashKey(pub Value);

impl HashKey {
    /// Wrap `value`, or return its type name if it is unhashable
    pub fn new(value: Value) -> Result<Self, &'static str> {
        if value.is_hashable() {
            Ok(HashKey(value))
        } else {
            Err(value.type_name())
        }
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.py_eq(&other.0)
    }
}

impl Eq for HashKey {}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::None => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            state.write_i64(*b as i64);
        }
        Value::Int(n) => {
            state.write_u8(1);
            state.write_i64(*n);
        }
        Value::Float(x) => {
            if x.fract() == 0.0 && x.abs() < 9.2e18 {
                state.write_u8(1);
                state.write_i64(*x as i64);
            } else {
                state.write_u8(2);
                state.write_u64(x.to_bits());
            }
        }
        Value::Str(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        Value::Tuple(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items.iter() {
                hash_value(item, state);
            }
        }
        Value::Range(r) => {
            state.write_u8(5);
            r.hash(state);
        }
        Value::Function(f) => {
            state.write_u8(6);
            std::ptr::hash(Rc::as_ptr(f), state);
        }
        Value::Builtin(b) => {
            state.write_u8(7);
            b.hash(state);
        }
        Value::Module(m) => {
            state.write_u8(8);
            m.hash(state);
        }
        // Unhashable; HashKey::new rejects these
        Value::List(_) | Value::Dict(_) | Value::Set(_) => state.write_u8(9),
    }
}

impl Hash for RangeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.hash(state);
        self.stop.hash(state);
        self.step.hash(state);
    }
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(l) if l.is_deque => "deque",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(d) => match d.kind {
                DictKind::Plain => "dict",
                DictKind::Counter => "Counter",
                DictKind::OrderedDict => "OrderedDict",
                DictKind::DefaultDict => "defaultdict",
            },
            Value::Set(_) => "set",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Module(_) => "module",
        }
    }

    /// Identity of a mutable container
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Value::List(l) => Some(l.id),
            Value::Dict(d) => Some(d.id),
            Value::Set(s) => Some(s.id),
            _ => None,
        }
    }

    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Dict(_) | Value::Set(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Callables and modules are not program data
    pub fn is_callable_or_module(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Builtin(_) | Value::Module(_)
        )
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::Set(s) => !s.is_empty(),
            Value::Range(r) => !r.is_empty(),
            Value::Function(_) | Value::Builtin(_) | Value::Module(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    /// Identity comparison (`is`)
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            _ => false,
        }
    }

    /// Value equality (`==`)
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_float() == b.as_float(),
            },
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.items(), b.items());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.py_eq(y))
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.py_eq(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.entries(), b.entries());
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.py_eq(other)))
            }
            (Value::Set(a), Value::Set(b)) => {
                let (a, b) = (a.items(), b.items());
                a.len() == b.len() && a.iter().all(|k| b.contains(k))
            }
            (Value::Range(a), Value::Range(b)) => a == b,
            _ => self.is_same(other),
        }
    }

    /// Ordering for `<`, `sorted`, `min`/`max`. `None` when unorderable.
    pub fn py_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (a, b) if a.is_number() && b.is_number() => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_float()?.partial_cmp(&b.as_float()?),
            },
            (Value::List(a), Value::List(b)) => {
                let (a, b) = (a.to_vec(), b.to_vec());
                compare_sequences(&a, &b)
            }
            (Value::Tuple(a), Value::Tuple(b)) => compare_sequences(a, b),
            (Value::Set(a), Value::Set(b)) => {
                // Subset ordering; only Equal/Less/Greater when comparable
                let (a, b) = (a.items(), b.items());
                if a.len() == b.len() && a.iter().all(|k| b.contains(k)) {
                    Some(Ordering::Equal)
                } else if a.len() < b.len() && a.iter().all(|k| b.contains(k)) {
                    Some(Ordering::Less)
                } else if a.len() > b.len() && b.iter().all(|k| a.contains(k)) {
                    Some(Ordering::Greater)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// `repr()` text
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Vec::new());
        out
    }

    /// `str()` text
    pub fn py_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            _ => self.repr(),
        }
    }

    fn write_repr(&self, out: &mut String, seen: &mut Vec<ObjectId>) {
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::Float(x) => out.push_str(&format_float(*x)),
            Value::Str(s) => out.push_str(&repr_str(s)),
            Value::List(l) => {
                if seen.contains(&l.id) {
                    out.push_str("[...]");
                    return;
                }
                seen.push(l.id);
                if l.is_deque {
                    out.push_str("deque(");
                }
                out.push('[');
                for (i, item) in l.to_vec().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, seen);
                }
                out.push(']');
                if l.is_deque {
                    out.push(')');
                }
                seen.pop();
            }
            Value::Tuple(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, seen);
                }
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Value::Dict(d) => {
                if seen.contains(&d.id) {
                    out.push_str("{...}");
                    return;
                }
                seen.push(d.id);
                let pairs = d.pairs();
                let wrapper = match d.kind {
                    DictKind::Plain => None,
                    DictKind::Counter => Some("Counter("),
                    DictKind::OrderedDict => Some("OrderedDict("),
                    DictKind::DefaultDict => Some("defaultdict("),
                };
                if let Some(prefix) = wrapper {
                    out.push_str(prefix);
                    if let Some(factory) = &d.default_factory {
                        factory.write_repr(out, seen);
                        out.push_str(", ");
                    }
                }
                out.push('{');
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    k.write_repr(out, seen);
                    out.push_str(": ");
                    v.write_repr(out, seen);
                }
                out.push('}');
                if wrapper.is_some() {
                    out.push(')');
                }
                seen.pop();
            }
            Value::Set(s) => {
                let items = s.to_vec();
                if items.is_empty() {
                    out.push_str("set()");
                    return;
                }
                out.push('{');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, seen);
                }
                out.push('}');
            }
            Value::Range(r) => {
                if r.step == 1 {
                    let _ = write!(out, "range({}, {})", r.start, r.stop);
                } else {
                    let _ = write!(out, "range({}, {}, {})", r.start, r.stop, r.step);
                }
            }
            Value::Function(f) => {
                let _ = write!(out, "<function {}>", f.def.name);
            }
            Value::Builtin(b) => {
                if let Some(class) = b.class_name() {
                    let _ = write!(out, "<class '{}'>", class);
                } else {
                    let _ = write!(out, "<built-in function {}>", b.name());
                }
            }
            Value::Module(m) => {
                let _ = write!(out, "<module '{}'>", m.name());
            }
        }
    }
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        if !x.py_eq(y) {
            return x.py_cmp(y);
        }
    }
    Some(a.len().cmp(&b.len()))
}

/// Quote a string the way `repr` does: single quotes unless the text
/// contains a single quote and no double quote.
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Shortest round-trip float text, switching to exponent form outside
/// `1e-4 <= |x| < 1e16`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. "1.2345e6"
    let sci = format!("{:e}", x);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut out = String::new();
    if negative {
        out.push('-');
    }

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let point = exponent as usize + 1;
            if digits.len() <= point {
                out.push_str(&digits);
                out.push_str(&"0".repeat(point - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..point]);
                out.push('.');
                out.push_str(&digits[point..]);
            }
        } else {
            out.push_str("0.");
            out.push_str(&"0".repeat((-exponent - 1) as usize));
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{}{:02}", sign, exponent.abs());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(-3.0), "-3.0");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(123456.789), "123456.789");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_repr_str_quotes() {
        assert_eq!(repr_str("abc"), "'abc'");
        assert_eq!(repr_str("it's"), "\"it's\"");
        assert_eq!(repr_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_numeric_keys_collide() {
        let mut map: IndexMap<HashKey, i32> = IndexMap::new();
        map.insert(HashKey(Value::Int(1)), 1);
        map.insert(HashKey(Value::Float(1.0)), 2);
        map.insert(HashKey(Value::Bool(true)), 3);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&HashKey(Value::Int(1))], 3);
    }

    #[test]
    fn test_list_repr_and_cycle() {
        let list = Rc::new(ListObject::new(1, vec![Value::Int(1), Value::str("a")], false));
        let value = Value::List(list.clone());
        assert_eq!(value.repr(), "[1, 'a']");
        list.update(|items| items.push(value.clone()));
        assert_eq!(value.repr(), "[1, 'a', [...]]");
        // Break the cycle so the test does not leak
        list.update(|items| items.clear());
    }

    #[test]
    fn test_version_bumps_on_update() {
        let list = ListObject::new(7, Vec::new(), false);
        assert_eq!(list.version(), 0);
        list.update(|items| items.push(Value::Int(3)));
        assert_eq!(list.version(), 1);
    }

    #[test]
    fn test_range_len_and_get() {
        let r = RangeValue {
            start: 10,
            stop: 0,
            step: -3,
        };
        assert_eq!(r.len(), 4);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![10, 7, 4, 1]);
        assert_eq!(r.get(4), None);
    }

    #[test]
    fn test_cross_type_equality_and_ordering() {
        assert!(Value::Int(2).py_eq(&Value::Float(2.0)));
        assert_eq!(
            Value::Int(1).py_cmp(&Value::Float(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Int(1).py_cmp(&Value::str("a")), None);
        let a = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::tuple(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(a.py_cmp(&b), Some(Ordering::Less));
    }
}
