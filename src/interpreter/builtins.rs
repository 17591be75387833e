//! Built-in functions
//!
//! [`Builtin`] names every native callable: the global builtins (`print`,
//! `len`, `sorted`, ...) and the functions exported by the allow-listed
//! modules (see [`super::modules`]). Core builtins are implemented here;
//! module functions are dispatched to [`Interpreter::call_module_function`].

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::{DictKind, HashKey, Value};
use crate::parser::ast::BinOp;
use crate::snapshot::StepType;
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A native callable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Global builtins
    Print,
    Len,
    Range,
    Int,
    Float,
    Str,
    Bool,
    List,
    Dict,
    Set,
    Tuple,
    Sum,
    Min,
    Max,
    Abs,
    Round,
    Sorted,
    Reversed,
    Enumerate,
    Zip,
    Map,
    Filter,
    Any,
    All,
    Isinstance,
    Type,
    Ord,
    Chr,
    Divmod,
    Pow,
    Hash,
    // math
    Sqrt,
    Floor,
    Ceil,
    MathPow,
    Log,
    Log2,
    Log10,
    Gcd,
    Fabs,
    Isqrt,
    // heapq
    HeapPush,
    HeapPop,
    Heapify,
    HeapPushPop,
    HeapReplace,
    NLargest,
    NSmallest,
    // collections
    Deque,
    Counter,
    OrderedDict,
    DefaultDict,
    // bisect
    BisectLeft,
    BisectRight,
    Insort,
    // copy
    ShallowCopy,
    DeepCopy,
}

const GLOBAL_BUILTINS: [Builtin; 31] = [
    Builtin::Print,
    Builtin::Len,
    Builtin::Range,
    Builtin::Int,
    Builtin::Float,
    Builtin::Str,
    Builtin::Bool,
    Builtin::List,
    Builtin::Dict,
    Builtin::Set,
    Builtin::Tuple,
    Builtin::Sum,
    Builtin::Min,
    Builtin::Max,
    Builtin::Abs,
    Builtin::Round,
    Builtin::Sorted,
    Builtin::Reversed,
    Builtin::Enumerate,
    Builtin::Zip,
    Builtin::Map,
    Builtin::Filter,
    Builtin::Any,
    Builtin::All,
    Builtin::Isinstance,
    Builtin::Type,
    Builtin::Ord,
    Builtin::Chr,
    Builtin::Divmod,
    Builtin::Pow,
    Builtin::Hash,
];

impl Builtin {
    /// Global builtin bound to `name`, if any
    pub fn from_name(name: &str) -> Option<Builtin> {
        GLOBAL_BUILTINS.iter().copied().find(|b| b.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Dict => "dict",
            Builtin::Set => "set",
            Builtin::Tuple => "tuple",
            Builtin::Sum => "sum",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Abs => "abs",
            Builtin::Round => "round",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Map => "map",
            Builtin::Filter => "filter",
            Builtin::Any => "any",
            Builtin::All => "all",
            Builtin::Isinstance => "isinstance",
            Builtin::Type => "type",
            Builtin::Ord => "ord",
            Builtin::Chr => "chr",
            Builtin::Divmod => "divmod",
            Builtin::Pow | Builtin::MathPow => "pow",
            Builtin::Hash => "hash",
            Builtin::Sqrt => "sqrt",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Log => "log",
            Builtin::Log2 => "log2",
            Builtin::Log10 => "log10",
            Builtin::Gcd => "gcd",
            Builtin::Fabs => "fabs",
            Builtin::Isqrt => "isqrt",
            Builtin::HeapPush => "heappush",
            Builtin::HeapPop => "heappop",
            Builtin::Heapify => "heapify",
            Builtin::HeapPushPop => "heappushpop",
            Builtin::HeapReplace => "heapreplace",
            Builtin::NLargest => "nlargest",
            Builtin::NSmallest => "nsmallest",
            Builtin::Deque => "deque",
            Builtin::Counter => "Counter",
            Builtin::OrderedDict => "OrderedDict",
            Builtin::DefaultDict => "defaultdict",
            Builtin::BisectLeft => "bisect_left",
            Builtin::BisectRight => "bisect_right",
            Builtin::Insort => "insort",
            Builtin::ShallowCopy => "copy",
            Builtin::DeepCopy => "deepcopy",
        }
    }

    /// Qualified class name for builtins that are types
    pub fn class_name(&self) -> Option<&'static str> {
        match self {
            Builtin::Int => Some("int"),
            Builtin::Float => Some("float"),
            Builtin::Str => Some("str"),
            Builtin::Bool => Some("bool"),
            Builtin::List => Some("list"),
            Builtin::Dict => Some("dict"),
            Builtin::Set => Some("set"),
            Builtin::Tuple => Some("tuple"),
            Builtin::Range => Some("range"),
            Builtin::Type => Some("type"),
            Builtin::Deque => Some("collections.deque"),
            Builtin::Counter => Some("collections.Counter"),
            Builtin::OrderedDict => Some("collections.OrderedDict"),
            Builtin::DefaultDict => Some("collections.defaultdict"),
            _ => None,
        }
    }

    /// The class of a runtime value, when it has a builtin class
    pub fn class_of(value: &Value) -> Option<Builtin> {
        match value {
            Value::Bool(_) => Some(Builtin::Bool),
            Value::Int(_) => Some(Builtin::Int),
            Value::Float(_) => Some(Builtin::Float),
            Value::Str(_) => Some(Builtin::Str),
            Value::List(l) if l.is_deque => Some(Builtin::Deque),
            Value::List(_) => Some(Builtin::List),
            Value::Tuple(_) => Some(Builtin::Tuple),
            Value::Dict(d) => Some(match d.kind {
                DictKind::Plain => Builtin::Dict,
                DictKind::Counter => Builtin::Counter,
                DictKind::OrderedDict => Builtin::OrderedDict,
                DictKind::DefaultDict => Builtin::DefaultDict,
            }),
            Value::Set(_) => Some(Builtin::Set),
            Value::Range(_) => Some(Builtin::Range),
            Value::Builtin(b) if b.class_name().is_some() => Some(Builtin::Type),
            _ => None,
        }
    }

    /// `isinstance(value, self)`, honouring bool <: int and dict subclasses
    pub fn is_instance(&self, value: &Value) -> bool {
        match (self, value) {
            (Builtin::Int, Value::Bool(_)) => true,
            (Builtin::Dict, Value::Dict(_)) => true,
            _ => Builtin::class_of(value) == Some(*self),
        }
    }
}

/// Keyword arguments of a native call, checked against the accepted names
pub(crate) struct Kwargs(IndexMap<String, Value>);

impl Kwargs {
    pub(crate) fn take(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name).filter(|v| !matches!(v, Value::None))
    }
}

/// Parse an integer literal the way `int(text, base)` does
pub(crate) fn parse_int_literal(text: &str, base: u32) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits = match base {
        16 => digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")).unwrap_or(digits),
        8 => digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")).unwrap_or(digits),
        2 => digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")).unwrap_or(digits),
        _ => digits,
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = i128::from_str_radix(&cleaned, base).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

impl Interpreter {
    fn arity(&self, builtin: Builtin, args: &[Value], min: usize, max: usize) -> Result<(), TraceError> {
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                format!("exactly {}", min)
            } else if max == usize::MAX {
                format!("at least {}", min)
            } else {
                format!("from {} to {}", min, max)
            };
            return Err(self.fault(
                "TypeError",
                format!(
                    "{}() takes {} arguments ({} given)",
                    builtin.name(),
                    expected,
                    args.len()
                ),
            ));
        }
        Ok(())
    }

    /// Validate keyword names against `allowed`
    pub(crate) fn keyword_args(
        &self,
        name: &str,
        kwargs: Vec<(String, Value)>,
        allowed: &[&str],
    ) -> Result<Kwargs, TraceError> {
        let mut map = IndexMap::with_capacity(kwargs.len());
        for (key, value) in kwargs {
            if !allowed.contains(&key.as_str()) {
                return Err(self.fault(
                    "TypeError",
                    format!("{}() got an unexpected keyword argument '{}'", name, key),
                ));
            }
            map.insert(key, value);
        }
        Ok(Kwargs(map))
    }

    pub(crate) fn int_arg(&self, builtin: &str, value: &Value) -> Result<i64, TraceError> {
        value.as_int().ok_or_else(|| {
            self.fault(
                "TypeError",
                format!(
                    "{}(): '{}' object cannot be interpreted as an integer",
                    builtin,
                    value.type_name()
                ),
            )
        })
    }

    pub(crate) fn float_arg(&self, builtin: &str, value: &Value) -> Result<f64, TraceError> {
        value.as_float().ok_or_else(|| {
            self.fault(
                "TypeError",
                format!("{}(): must be real number, not {}", builtin, value.type_name()),
            )
        })
    }

    fn optional_text(&self, value: Option<Value>, what: &str, default: &str) -> Result<String, TraceError> {
        match value {
            None => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.to_string()),
            Some(other) => Err(self.fault(
                "TypeError",
                format!("{} must be None or a string, not {}", what, other.type_name()),
            )),
        }
    }

    /// Apply an optional key function to every item
    pub(crate) fn sort_keys(&mut self, items: &[Value], key: Option<&Value>) -> Result<Vec<Value>, TraceError> {
        match key {
            None => Ok(items.to_vec()),
            Some(func) => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items {
                    keys.push(self.call_value(func, vec![item.clone()], Vec::new())?);
                }
                Ok(keys)
            }
        }
    }

    /// Stable sort by optional key; unorderable pairs raise `TypeError`
    pub(crate) fn sort_values(
        &mut self,
        items: Vec<Value>,
        key: Option<&Value>,
        reverse: bool,
    ) -> Result<Vec<Value>, TraceError> {
        let keys = self.sort_keys(&items, key)?;
        let mut order: Vec<usize> = (0..items.len()).collect();
        let mut failure: Option<(usize, usize)> = None;
        order.sort_by(|&a, &b| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            match keys[a].py_cmp(&keys[b]) {
                Some(ord) if reverse => ord.reverse(),
                Some(ord) => ord,
                None => {
                    failure = Some((a, b));
                    Ordering::Equal
                }
            }
        });
        if let Some((a, b)) = failure {
            self.order("<", &keys[a], &keys[b])?;
        }
        Ok(order.into_iter().map(|i| items[i].clone()).collect())
    }

    fn extremum(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        wanted: Ordering,
    ) -> Result<Value, TraceError> {
        let mut kw = self.keyword_args(builtin.name(), kwargs, &["key", "default"])?;
        let key = kw.take("key");
        let default = kw.0.shift_remove("default");
        let items = match args.len() {
            0 => {
                return Err(self.fault(
                    "TypeError",
                    format!("{} expected at least 1 argument, got 0", builtin.name()),
                ))
            }
            1 => self.iter_values(&args[0])?,
            _ => args,
        };
        if items.is_empty() {
            return default.ok_or_else(|| {
                self.fault(
                    "ValueError",
                    format!("{}() arg is an empty sequence", builtin.name()),
                )
            });
        }
        let keys = self.sort_keys(&items, key.as_ref())?;
        let symbol = if wanted == Ordering::Less { "<" } else { ">" };
        let mut best = 0;
        for i in 1..items.len() {
            if self.order(symbol, &keys[i], &keys[best])? == wanted {
                best = i;
            }
        }
        Ok(items[best].clone())
    }

    fn to_int(&self, value: &Value) -> Result<Value, TraceError> {
        match value {
            Value::Float(x) => {
                if x.is_nan() {
                    return Err(self.fault("ValueError", "cannot convert float NaN to integer"));
                }
                if x.is_infinite() || x.abs() >= 9.223_372_036_854_775_807e18 {
                    return Err(self.fault("OverflowError", "cannot convert float infinity to integer"));
                }
                Ok(Value::Int(x.trunc() as i64))
            }
            Value::Str(s) => parse_int_literal(s, 10).map(Value::Int).ok_or_else(|| {
                self.fault(
                    "ValueError",
                    format!("invalid literal for int() with base 10: {}", value.repr()),
                )
            }),
            other => other.as_int().map(Value::Int).ok_or_else(|| {
                self.fault(
                    "TypeError",
                    format!(
                        "int() argument must be a string or a number, not '{}'",
                        other.type_name()
                    ),
                )
            }),
        }
    }

    fn to_float(&self, value: &Value) -> Result<Value, TraceError> {
        match value {
            Value::Str(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
                cleaned.parse::<f64>().map(Value::Float).map_err(|_| {
                    self.fault(
                        "ValueError",
                        format!("could not convert string to float: {}", value.repr()),
                    )
                })
            }
            other => other.as_float().map(Value::Float).ok_or_else(|| {
                self.fault(
                    "TypeError",
                    format!(
                        "float() argument must be a string or a real number, not '{}'",
                        other.type_name()
                    ),
                )
            }),
        }
    }

    fn round_value(&self, value: &Value, ndigits: Option<&Value>) -> Result<Value, TraceError> {
        let ndigits = match ndigits {
            None | Some(Value::None) => None,
            Some(n) => Some(self.int_arg("round", n)?),
        };
        match (value, ndigits) {
            (Value::Float(x), None) => {
                let rounded = x.round_ties_even();
                if !rounded.is_finite() {
                    return Err(self.fault("OverflowError", "cannot convert float infinity to integer"));
                }
                Ok(Value::Int(rounded as i64))
            }
            (Value::Float(x), Some(n)) => {
                let factor = 10f64.powi(n.clamp(-308, 308) as i32);
                Ok(Value::Float((x * factor).round_ties_even() / factor))
            }
            (other, digits) => {
                let n = other.as_int().ok_or_else(|| {
                    self.fault(
                        "TypeError",
                        format!("type {} doesn't define __round__ method", other.type_name()),
                    )
                })?;
                match digits {
                    Some(d) if d < 0 => {
                        let factor = 10f64.powi((-d).min(18) as i32);
                        Ok(Value::Int(((n as f64 / factor).round_ties_even() * factor) as i64))
                    }
                    _ => Ok(Value::Int(n)),
                }
            }
        }
    }

    fn hash_value(&self, value: Value) -> Result<Value, TraceError> {
        let key = self.hash_key(value)?;
        let hashed = match &key.0 {
            Value::Int(n) => *n,
            Value::Bool(b) => *b as i64,
            Value::Float(x) if x.fract() == 0.0 && x.abs() < 9.0e18 => *x as i64,
            _ => {
                let mut hasher = FxHasher::default();
                key.hash(&mut hasher);
                hasher.finish() as i64
            }
        };
        Ok(Value::Int(hashed))
    }

    fn print(&mut self, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value, TraceError> {
        let mut kw = self.keyword_args("print", kwargs, &["sep", "end"])?;
        let sep = self.optional_text(kw.take("sep"), "sep", " ")?;
        let end = self.optional_text(kw.take("end"), "end", "\n")?;
        let text = args
            .iter()
            .map(Value::py_str)
            .collect::<Vec<_>>()
            .join(&sep);

        self.ctx.write_stdout(&text)?;
        self.ctx.write_stdout(&end)?;
        let source = self.current_line_text();
        self.emit(StepType::Print, &source, Some(&Value::str(&text)), None)?;
        Ok(Value::None)
    }

    /// Call a native function
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        match builtin {
            Builtin::Print => return self.print(args, kwargs),
            Builtin::Min => return self.extremum(builtin, args, kwargs, Ordering::Less),
            Builtin::Max => return self.extremum(builtin, args, kwargs, Ordering::Greater),
            _ => {}
        }

        match builtin {
            Builtin::Len => {
                self.arity(builtin, &args, 1, 1)?;
                let len = match &args[0] {
                    Value::Str(s) => s.chars().count(),
                    Value::List(l) => l.len(),
                    Value::Tuple(t) => t.len(),
                    Value::Dict(d) => d.len(),
                    Value::Set(s) => s.len(),
                    Value::Range(r) => r.len(),
                    other => {
                        return Err(self.fault(
                            "TypeError",
                            format!("object of type '{}' has no len()", other.type_name()),
                        ))
                    }
                };
                Ok(Value::Int(len as i64))
            }

            Builtin::Range => {
                self.arity(builtin, &args, 1, 3)?;
                let ints = args
                    .iter()
                    .map(|a| self.int_arg("range", a))
                    .collect::<Result<Vec<_>, _>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => (0, 0, 1),
                };
                if step == 0 {
                    return Err(self.fault("ValueError", "range() arg 3 must not be zero"));
                }
                Ok(Value::Range(crate::memory::value::RangeValue { start, stop, step }))
            }

            Builtin::Int => {
                let mut kw = self.keyword_args("int", kwargs, &["base"])?;
                self.arity(builtin, &args, 0, 2)?;
                let base = match args.get(1).cloned().or_else(|| kw.take("base")) {
                    Some(b) => Some(self.int_arg("int", &b)?),
                    None => None,
                };
                match (args.first(), base) {
                    (None, _) => Ok(Value::Int(0)),
                    (Some(value), None) => self.to_int(value),
                    (Some(Value::Str(s)), Some(base)) => {
                        if !(2..=36).contains(&base) {
                            return Err(self.fault("ValueError", "int() base must be >= 2 and <= 36"));
                        }
                        parse_int_literal(s, base as u32).map(Value::Int).ok_or_else(|| {
                            self.fault(
                                "ValueError",
                                format!(
                                    "invalid literal for int() with base {}: {}",
                                    base,
                                    args[0].repr()
                                ),
                            )
                        })
                    }
                    (Some(_), Some(_)) => Err(self.fault(
                        "TypeError",
                        "int() can't convert non-string with explicit base",
                    )),
                }
            }

            Builtin::Float => {
                self.arity(builtin, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::Float(0.0)),
                    Some(value) => self.to_float(value),
                }
            }

            Builtin::Str => {
                self.arity(builtin, &args, 0, 1)?;
                Ok(Value::str(&args.first().map(Value::py_str).unwrap_or_default()))
            }

            Builtin::Bool => {
                self.arity(builtin, &args, 0, 1)?;
                Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
            }

            Builtin::List => {
                self.arity(builtin, &args, 0, 1)?;
                let items = match args.first() {
                    Some(iterable) => self.iter_values(iterable)?,
                    None => Vec::new(),
                };
                Ok(self.new_list(items))
            }

            Builtin::Tuple => {
                self.arity(builtin, &args, 0, 1)?;
                let items = match args.first() {
                    Some(iterable) => self.iter_values(iterable)?,
                    None => Vec::new(),
                };
                Ok(Value::tuple(items))
            }

            Builtin::Set => {
                self.arity(builtin, &args, 0, 1)?;
                let items = match args.first() {
                    Some(iterable) => self.iter_values(iterable)?,
                    None => Vec::new(),
                };
                let set = self.collect_set(items)?;
                Ok(self.new_set(set))
            }

            Builtin::Dict => {
                self.arity(builtin, &args, 0, 1)?;
                let mut entries = match args.first() {
                    Some(source) => self.collect_entries(source)?,
                    None => IndexMap::new(),
                };
                for (key, value) in kwargs {
                    entries.insert(HashKey(Value::str(&key)), value);
                }
                Ok(self.new_dict(entries))
            }

            Builtin::Sum => {
                let mut kw = self.keyword_args("sum", kwargs, &["start"])?;
                self.arity(builtin, &args, 1, 2)?;
                let mut total = args.get(1).cloned().or_else(|| kw.take("start")).unwrap_or(Value::Int(0));
                for item in self.iter_values(&args[0])? {
                    total = self.binary_value(BinOp::Add, &total, &item)?;
                }
                Ok(total)
            }

            Builtin::Abs => {
                self.arity(builtin, &args, 1, 1)?;
                match &args[0] {
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    other => match other.as_int() {
                        Some(n) => n
                            .checked_abs()
                            .map(Value::Int)
                            .ok_or_else(|| self.fault("OverflowError", "integer overflow in abs()")),
                        None => Err(self.fault(
                            "TypeError",
                            format!("bad operand type for abs(): '{}'", other.type_name()),
                        )),
                    },
                }
            }

            Builtin::Round => {
                let mut kw = self.keyword_args("round", kwargs, &["ndigits"])?;
                self.arity(builtin, &args, 1, 2)?;
                let ndigits = args.get(1).cloned().or_else(|| kw.take("ndigits"));
                self.round_value(&args[0], ndigits.as_ref())
            }

            Builtin::Sorted => {
                let mut kw = self.keyword_args("sorted", kwargs, &["key", "reverse"])?;
                self.arity(builtin, &args, 1, 1)?;
                let key = kw.take("key");
                let reverse = kw.take("reverse").is_some_and(|v| v.truthy());
                let items = self.iter_values(&args[0])?;
                let sorted = self.sort_values(items, key.as_ref(), reverse)?;
                Ok(self.new_list(sorted))
            }

            Builtin::Reversed => {
                self.arity(builtin, &args, 1, 1)?;
                if let Value::Set(_) = &args[0] {
                    return Err(self.fault("TypeError", "'set' object is not reversible"));
                }
                let mut items = self.iter_values(&args[0])?;
                items.reverse();
                Ok(self.new_list(items))
            }

            Builtin::Enumerate => {
                let mut kw = self.keyword_args("enumerate", kwargs, &["start"])?;
                self.arity(builtin, &args, 1, 2)?;
                let start = match args.get(1).cloned().or_else(|| kw.take("start")) {
                    Some(v) => self.int_arg("enumerate", &v)?,
                    None => 0,
                };
                let pairs = self
                    .iter_values(&args[0])?
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Value::tuple(vec![Value::Int(start + i as i64), item]))
                    .collect();
                Ok(self.new_list(pairs))
            }

            Builtin::Zip => {
                let columns = args
                    .iter()
                    .map(|a| self.iter_values(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
                let zipped = (0..rows)
                    .map(|i| Value::tuple(columns.iter().map(|c| c[i].clone()).collect()))
                    .collect();
                Ok(self.new_list(zipped))
            }

            Builtin::Map => {
                self.arity(builtin, &args, 2, usize::MAX)?;
                let func = args[0].clone();
                let columns = args[1..]
                    .iter()
                    .map(|a| self.iter_values(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut mapped = Vec::with_capacity(rows);
                for i in 0..rows {
                    let call_args = columns.iter().map(|c| c[i].clone()).collect();
                    mapped.push(self.call_value(&func, call_args, Vec::new())?);
                }
                Ok(self.new_list(mapped))
            }

            Builtin::Filter => {
                self.arity(builtin, &args, 2, 2)?;
                let mut kept = Vec::new();
                for item in self.iter_values(&args[1])? {
                    let keep = match &args[0] {
                        Value::None => item.truthy(),
                        func => self.call_value(func, vec![item.clone()], Vec::new())?.truthy(),
                    };
                    if keep {
                        kept.push(item);
                    }
                }
                Ok(self.new_list(kept))
            }

            Builtin::Any => {
                self.arity(builtin, &args, 1, 1)?;
                Ok(Value::Bool(self.iter_values(&args[0])?.iter().any(Value::truthy)))
            }

            Builtin::All => {
                self.arity(builtin, &args, 1, 1)?;
                Ok(Value::Bool(self.iter_values(&args[0])?.iter().all(Value::truthy)))
            }

            Builtin::Isinstance => {
                self.arity(builtin, &args, 2, 2)?;
                let classes: Vec<Value> = match &args[1] {
                    Value::Tuple(items) => items.to_vec(),
                    other => vec![other.clone()],
                };
                let mut matched = false;
                for class in &classes {
                    match class {
                        Value::Builtin(b) if b.class_name().is_some() => {
                            matched |= b.is_instance(&args[0]);
                        }
                        _ => {
                            return Err(self.fault(
                                "TypeError",
                                "isinstance() arg 2 must be a type or tuple of types",
                            ))
                        }
                    }
                }
                Ok(Value::Bool(matched))
            }

            Builtin::Type => {
                self.arity(builtin, &args, 1, 1)?;
                Ok(match Builtin::class_of(&args[0]) {
                    Some(class) => Value::Builtin(class),
                    None => Value::str(&format!("<class '{}'>", args[0].type_name())),
                })
            }

            Builtin::Ord => {
                self.arity(builtin, &args, 1, 1)?;
                let text = args[0].as_str().ok_or_else(|| {
                    self.fault(
                        "TypeError",
                        format!(
                            "ord() expected string of length 1, but {} found",
                            args[0].type_name()
                        ),
                    )
                })?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Int(c as i64)),
                    _ => Err(self.fault(
                        "TypeError",
                        format!(
                            "ord() expected a character, but string of length {} found",
                            text.chars().count()
                        ),
                    )),
                }
            }

            Builtin::Chr => {
                self.arity(builtin, &args, 1, 1)?;
                let code = self.int_arg("chr", &args[0])?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| Value::str(c.encode_utf8(&mut [0; 4])))
                    .ok_or_else(|| self.fault("ValueError", "chr() arg not in range(0x110000)"))
            }

            Builtin::Divmod => {
                self.arity(builtin, &args, 2, 2)?;
                let quotient = self.binary_value(BinOp::FloorDiv, &args[0], &args[1])?;
                let remainder = self.binary_value(BinOp::Mod, &args[0], &args[1])?;
                Ok(Value::tuple(vec![quotient, remainder]))
            }

            Builtin::Pow => {
                self.arity(builtin, &args, 2, 3)?;
                match args.get(2) {
                    None | Some(Value::None) => self.binary_value(BinOp::Pow, &args[0], &args[1]),
                    Some(modulus) => {
                        let base = self.int_arg("pow", &args[0])?;
                        let exp = self.int_arg("pow", &args[1])?;
                        let modulus = self.int_arg("pow", modulus)?;
                        if modulus == 0 {
                            return Err(self.fault("ValueError", "pow() 3rd argument cannot be 0"));
                        }
                        if exp < 0 {
                            return Err(self.fault(
                                "ValueError",
                                "pow() 2nd argument cannot be negative when 3rd argument specified",
                            ));
                        }
                        Ok(Value::Int(mod_pow(base, exp, modulus)))
                    }
                }
            }

            Builtin::Hash => {
                self.arity(builtin, &args, 1, 1)?;
                let value = args.into_iter().next().unwrap_or_default();
                self.hash_value(value)
            }

            _ => self.call_module_function(builtin, args, kwargs),
        }
    }
}

/// `base ** exp % modulus` with the sign of the modulus
fn mod_pow(base: i64, exp: i64, modulus: i64) -> i64 {
    let m = modulus as i128;
    let mut result: i128 = 1;
    let mut b = (base as i128).rem_euclid(m.abs());
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = (result * b).rem_euclid(m.abs());
        }
        b = (b * b).rem_euclid(m.abs());
        e >>= 1;
    }
    let mut r = result.rem_euclid(m.abs());
    if m < 0 && r != 0 {
        r += m;
    }
    r as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_names_resolve() {
        assert_eq!(Builtin::from_name("sorted"), Some(Builtin::Sorted));
        assert_eq!(Builtin::from_name("pow"), Some(Builtin::Pow));
        // Module functions are not globals
        assert_eq!(Builtin::from_name("sqrt"), None);
        assert_eq!(Builtin::from_name("heappush"), None);
    }

    #[test]
    fn test_isinstance_rules() {
        assert!(Builtin::Int.is_instance(&Value::Bool(true)));
        assert!(!Builtin::Bool.is_instance(&Value::Int(1)));
        assert!(Builtin::Str.is_instance(&Value::str("x")));
        assert_eq!(Builtin::class_of(&Value::Float(1.0)), Some(Builtin::Float));
        assert_eq!(Builtin::class_of(&Value::None), None);
    }

    #[test]
    fn test_parse_int_literal() {
        assert_eq!(parse_int_literal(" 42 ", 10), Some(42));
        assert_eq!(parse_int_literal("-1_000", 10), Some(-1000));
        assert_eq!(parse_int_literal("ff", 16), Some(255));
        assert_eq!(parse_int_literal("0b101", 2), Some(5));
        assert_eq!(parse_int_literal("1.5", 10), None);
        assert_eq!(parse_int_literal("", 10), None);
    }

    #[test]
    fn test_mod_pow() {
        assert_eq!(mod_pow(2, 10, 1000), 24);
        assert_eq!(mod_pow(-2, 3, 5), 2);
        assert_eq!(mod_pow(3, 0, 7), 1);
    }
}
