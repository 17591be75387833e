//! Method calls on builtin containers and strings
//!
//! `receiver.name(args)` is dispatched on the receiver's runtime type. Mutating
//! methods go through the container's `update`, which bumps its version so the
//! snapshot freezer notices the change.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::{DictKind, DictObject, HashKey, ListObject, SetObject, Value};
use indexmap::IndexSet;
use std::rc::Rc;

const LIST_METHODS: &[&str] = &[
    "append", "pop", "insert", "remove", "extend", "index", "count", "sort", "reverse", "copy",
    "clear",
];

const DEQUE_METHODS: &[&str] = &[
    "append",
    "appendleft",
    "pop",
    "popleft",
    "extend",
    "extendleft",
    "insert",
    "remove",
    "index",
    "count",
    "reverse",
    "rotate",
    "copy",
    "clear",
];

const DICT_METHODS: &[&str] = &[
    "get",
    "keys",
    "values",
    "items",
    "pop",
    "popitem",
    "setdefault",
    "update",
    "copy",
    "clear",
];

const SET_METHODS: &[&str] = &[
    "add",
    "remove",
    "discard",
    "pop",
    "union",
    "intersection",
    "difference",
    "symmetric_difference",
    "issubset",
    "issuperset",
    "update",
    "copy",
    "clear",
];

const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "lstrip",
    "rstrip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
    "find",
    "rfind",
    "index",
    "count",
    "isdigit",
    "isalpha",
    "isalnum",
    "isspace",
    "format",
];

const TUPLE_METHODS: &[&str] = &["count", "index"];

/// Character-indexed search within `hay[start..end]`
fn char_find(hay: &str, needle: &str, start: usize, end: usize, last: bool) -> Option<usize> {
    let chars: Vec<char> = hay.chars().collect();
    let end = end.min(chars.len());
    if start > end {
        return None;
    }
    let window: String = chars[start..end].iter().collect();
    let byte = if last { window.rfind(needle)? } else { window.find(needle)? };
    Some(start + window[..byte].chars().count())
}

/// `str.split` without a separator: runs of whitespace, at most `maxsplit` cuts
fn split_whitespace(text: &str, maxsplit: i64) -> Vec<String> {
    if maxsplit < 0 {
        return text.split_whitespace().map(str::to_string).collect();
    }
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    let mut cuts = 0;
    while !rest.is_empty() {
        if cuts == maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(at) => {
                parts.push(rest[..at].to_string());
                rest = rest[at..].trim_start();
                cuts += 1;
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

impl Interpreter {
    /// Whether `value` has a callable method called `name`
    pub(crate) fn has_method(value: &Value, name: &str) -> bool {
        let table = match value {
            Value::List(l) if l.is_deque => DEQUE_METHODS,
            Value::List(_) => LIST_METHODS,
            Value::Dict(d) if d.kind == DictKind::Counter && name == "most_common" => return true,
            Value::Dict(_) => DICT_METHODS,
            Value::Set(_) => SET_METHODS,
            Value::Str(_) => STR_METHODS,
            Value::Tuple(_) => TUPLE_METHODS,
            _ => return false,
        };
        table.contains(&name)
    }

    fn method_arity(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
        min: usize,
        max: usize,
    ) -> Result<(), TraceError> {
        if args.len() >= min && args.len() <= max {
            return Ok(());
        }
        let expected = match (min, max) {
            (0, 0) => "no arguments".to_string(),
            (1, 1) => "exactly one argument".to_string(),
            (lo, hi) if lo == hi => format!("exactly {} arguments", lo),
            (lo, usize::MAX) => format!("at least {} arguments", lo),
            (lo, hi) => format!("from {} to {} arguments", lo, hi),
        };
        Err(self.fault(
            "TypeError",
            format!(
                "{}.{}() takes {} ({} given)",
                receiver.type_name(),
                name,
                expected,
                args.len()
            ),
        ))
    }

    fn str_arg<'a>(&self, method: &str, value: &'a Value) -> Result<&'a str, TraceError> {
        value.as_str().ok_or_else(|| {
            self.fault(
                "TypeError",
                format!("{}() argument must be str, not {}", method, value.type_name()),
            )
        })
    }

    /// Call `receiver.name(args, kwargs)`
    pub(crate) fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        match receiver {
            Value::List(list) => self.list_method(receiver, list, name, args, kwargs),
            Value::Dict(dict) => self.dict_method(receiver, dict, name, args, kwargs),
            Value::Set(set) => self.set_method(receiver, set, name, args, kwargs),
            Value::Str(text) => self.str_method(receiver, text, name, args, kwargs),
            Value::Tuple(items) => {
                self.keyword_args(name, kwargs, &[])?;
                self.sequence_query(receiver, items, name, &args)
            }
            other => Err(self.fault(
                "AttributeError",
                format!("'{}' object has no attribute '{}'", other.type_name(), name),
            )),
        }
    }

    /// `count` and `index` shared by lists, deques and tuples
    fn sequence_query(
        &self,
        receiver: &Value,
        items: &[Value],
        name: &str,
        args: &[Value],
    ) -> Result<Value, TraceError> {
        match name {
            "count" => {
                self.method_arity(receiver, name, args, 1, 1)?;
                Ok(Value::Int(items.iter().filter(|v| v.py_eq(&args[0])).count() as i64))
            }
            "index" => {
                self.method_arity(receiver, name, args, 1, 3)?;
                let len = items.len() as i64;
                let clamp = |v: i64| if v < 0 { (v + len).max(0) } else { v.min(len) } as usize;
                let start = match args.get(1) {
                    Some(v) => clamp(self.int_arg("index", v)?),
                    None => 0,
                };
                let end = match args.get(2) {
                    Some(v) => clamp(self.int_arg("index", v)?),
                    None => items.len(),
                };
                (start..end.max(start))
                    .find(|&i| items[i].py_eq(&args[0]))
                    .map(|i| Value::Int(i as i64))
                    .ok_or_else(|| {
                        self.fault(
                            "ValueError",
                            format!("{} is not in {}", args[0].repr(), receiver.type_name()),
                        )
                    })
            }
            _ => Err(self.fault(
                "AttributeError",
                format!("'{}' object has no attribute '{}'", receiver.type_name(), name),
            )),
        }
    }

    fn list_method(
        &mut self,
        receiver: &Value,
        list: &Rc<ListObject>,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        if name == "sort" {
            let mut kw = self.keyword_args("sort", kwargs, &["key", "reverse"])?;
            self.method_arity(receiver, name, &args, 0, 0)?;
            let key = kw.take("key");
            let reverse = kw.take("reverse").is_some_and(|v| v.truthy());
            let sorted = self.sort_values(list.to_vec(), key.as_ref(), reverse)?;
            list.update(|items| *items = sorted);
            return Ok(Value::None);
        }
        self.keyword_args(name, kwargs, &[])?;

        match name {
            "append" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let item = args.into_iter().next().unwrap_or_default();
                list.update(|items| items.push(item));
                Ok(Value::None)
            }
            "appendleft" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let item = args.into_iter().next().unwrap_or_default();
                list.update(|items| items.insert(0, item));
                Ok(Value::None)
            }
            "pop" if list.is_deque => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                list.update(|items| items.pop())
                    .ok_or_else(|| self.fault("IndexError", "pop from an empty deque"))
            }
            "pop" => {
                self.method_arity(receiver, name, &args, 0, 1)?;
                if list.is_empty() {
                    return Err(self.fault("IndexError", "pop from empty list"));
                }
                let len = list.len() as i64;
                let index = match args.first() {
                    Some(v) => self.int_arg("pop", v)?,
                    None => -1,
                };
                let resolved = if index < 0 { index + len } else { index };
                if !(0..len).contains(&resolved) {
                    return Err(self.fault("IndexError", "pop index out of range"));
                }
                Ok(list.update(|items| items.remove(resolved as usize)))
            }
            "popleft" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                if list.is_empty() {
                    return Err(self.fault("IndexError", "pop from an empty deque"));
                }
                Ok(list.update(|items| items.remove(0)))
            }
            "insert" => {
                self.method_arity(receiver, name, &args, 2, 2)?;
                let len = list.len() as i64;
                let index = self.int_arg("insert", &args[0])?;
                let at = if index < 0 { (index + len).max(0) } else { index.min(len) } as usize;
                let item = args[1].clone();
                list.update(|items| items.insert(at, item));
                Ok(Value::None)
            }
            "remove" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let position = list.items().iter().position(|v| v.py_eq(&args[0]));
                match position {
                    Some(i) => {
                        list.update(|items| items.remove(i));
                        Ok(Value::None)
                    }
                    None if list.is_deque => Err(self.fault(
                        "ValueError",
                        format!("{} is not in deque", args[0].repr()),
                    )),
                    None => Err(self.fault("ValueError", "list.remove(x): x not in list")),
                }
            }
            "extend" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let extra = self.iter_values(&args[0])?;
                list.update(|items| items.extend(extra));
                Ok(Value::None)
            }
            "extendleft" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let extra = self.iter_values(&args[0])?;
                list.update(|items| {
                    for item in extra {
                        items.insert(0, item);
                    }
                });
                Ok(Value::None)
            }
            "rotate" => {
                self.method_arity(receiver, name, &args, 0, 1)?;
                let steps = match args.first() {
                    Some(v) => self.int_arg("rotate", v)?,
                    None => 1,
                };
                list.update(|items| {
                    if !items.is_empty() {
                        let shift = steps.rem_euclid(items.len() as i64) as usize;
                        items.rotate_right(shift);
                    }
                });
                Ok(Value::None)
            }
            "reverse" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                list.update(|items| items.reverse());
                Ok(Value::None)
            }
            "copy" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                Ok(self.shallow_copy(receiver))
            }
            "clear" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                list.update(|items| items.clear());
                Ok(Value::None)
            }
            _ => {
                let items = list.to_vec();
                self.sequence_query(receiver, &items, name, &args)
            }
        }
    }

    fn dict_method(
        &mut self,
        receiver: &Value,
        dict: &Rc<DictObject>,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        if name == "update" {
            self.method_arity(receiver, name, &args, 0, 1)?;
            if dict.kind == DictKind::Counter {
                let counts = self.counter_from(args.first())?;
                for (key, value) in counts {
                    let current = dict.get(&key).unwrap_or(Value::Int(0));
                    let total = self.binary_value(crate::parser::ast::BinOp::Add, &current, &value)?;
                    dict.update(|entries| entries.insert(key, total));
                }
                return Ok(Value::None);
            }
            let mut entries = match args.first() {
                Some(source) => self.collect_entries(source)?,
                None => Default::default(),
            };
            for (key, value) in kwargs {
                entries.insert(HashKey(Value::str(&key)), value);
            }
            dict.update(|slot| slot.extend(entries));
            return Ok(Value::None);
        }
        self.keyword_args(name, kwargs, &[])?;

        match name {
            "get" => {
                self.method_arity(receiver, name, &args, 1, 2)?;
                let key = self.hash_key(args[0].clone())?;
                Ok(dict
                    .get(&key)
                    .or_else(|| args.get(1).cloned())
                    .unwrap_or_default())
            }
            "keys" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                Ok(self.new_list(dict.keys()))
            }
            "values" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                Ok(self.new_list(dict.values()))
            }
            "items" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                let pairs = dict
                    .pairs()
                    .into_iter()
                    .map(|(k, v)| Value::tuple(vec![k, v]))
                    .collect();
                Ok(self.new_list(pairs))
            }
            "pop" => {
                self.method_arity(receiver, name, &args, 1, 2)?;
                let key = self.hash_key(args[0].clone())?;
                match dict.update(|entries| entries.shift_remove(&key)) {
                    Some(value) => Ok(value),
                    None => args
                        .get(1)
                        .cloned()
                        .ok_or_else(|| self.fault("KeyError", args[0].repr())),
                }
            }
            "popitem" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                dict.update(|entries| entries.pop())
                    .map(|(k, v)| Value::tuple(vec![k.0, v]))
                    .ok_or_else(|| self.fault("KeyError", "'popitem(): dictionary is empty'"))
            }
            "setdefault" => {
                self.method_arity(receiver, name, &args, 1, 2)?;
                let key = self.hash_key(args[0].clone())?;
                if let Some(existing) = dict.get(&key) {
                    return Ok(existing);
                }
                let value = args.get(1).cloned().unwrap_or_default();
                dict.update(|entries| entries.insert(key, value.clone()));
                Ok(value)
            }
            "most_common" => {
                self.method_arity(receiver, name, &args, 0, 1)?;
                let limit = match args.first() {
                    None | Some(Value::None) => dict.len(),
                    Some(n) => self.int_arg("most_common", n)?.max(0) as usize,
                };
                let mut pairs = dict.pairs();
                pairs.sort_by(|(_, a), (_, b)| {
                    b.py_cmp(a).unwrap_or(std::cmp::Ordering::Equal)
                });
                let top = pairs
                    .into_iter()
                    .take(limit)
                    .map(|(k, v)| Value::tuple(vec![k, v]))
                    .collect();
                Ok(self.new_list(top))
            }
            "copy" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                Ok(self.shallow_copy(receiver))
            }
            "clear" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                dict.update(|entries| entries.clear());
                Ok(Value::None)
            }
            _ => Err(self.fault(
                "AttributeError",
                format!("'{}' object has no attribute '{}'", receiver.type_name(), name),
            )),
        }
    }

    fn set_method(
        &mut self,
        receiver: &Value,
        set: &Rc<SetObject>,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        self.keyword_args(name, kwargs, &[])?;
        let mut others: Vec<IndexSet<HashKey>> = Vec::new();
        if matches!(
            name,
            "union" | "intersection" | "difference" | "symmetric_difference" | "issubset" | "issuperset" | "update"
        ) {
            for arg in &args {
                let items = self.iter_values(arg)?;
                others.push(self.collect_set(items)?);
            }
        }

        match name {
            "add" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let key = self.hash_key(args[0].clone())?;
                set.update(|items| items.insert(key));
                Ok(Value::None)
            }
            "remove" | "discard" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let key = self.hash_key(args[0].clone())?;
                let removed = set.update(|items| items.shift_remove(&key));
                if !removed && name == "remove" {
                    return Err(self.fault("KeyError", args[0].repr()));
                }
                Ok(Value::None)
            }
            "pop" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                set.update(|items| items.shift_remove_index(0))
                    .map(|key| key.0)
                    .ok_or_else(|| self.fault("KeyError", "'pop from an empty set'"))
            }
            "union" => {
                let mut items = set.items().clone();
                for other in others {
                    items.extend(other);
                }
                Ok(self.new_set(items))
            }
            "intersection" => {
                let mut items = set.items().clone();
                for other in &others {
                    items.retain(|k| other.contains(k));
                }
                Ok(self.new_set(items))
            }
            "difference" => {
                let mut items = set.items().clone();
                for other in &others {
                    items.retain(|k| !other.contains(k));
                }
                Ok(self.new_set(items))
            }
            "symmetric_difference" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let mine = set.items().clone();
                let items = mine.symmetric_difference(&others[0]).cloned().collect();
                Ok(self.new_set(items))
            }
            "issubset" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                Ok(Value::Bool(set.items().is_subset(&others[0])))
            }
            "issuperset" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                Ok(Value::Bool(set.items().is_superset(&others[0])))
            }
            "update" => {
                set.update(|items| {
                    for other in others {
                        items.extend(other);
                    }
                });
                Ok(Value::None)
            }
            "copy" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                Ok(self.shallow_copy(receiver))
            }
            "clear" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                set.update(|items| items.clear());
                Ok(Value::None)
            }
            _ => Err(self.fault(
                "AttributeError",
                format!("'set' object has no attribute '{}'", name),
            )),
        }
    }

    fn str_method(
        &mut self,
        receiver: &Value,
        text: &str,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, TraceError> {
        if name == "format" {
            let formatted = self.format_template(text, &args, &kwargs)?;
            return Ok(Value::str(&formatted));
        }
        let mut kw = if name == "split" {
            self.keyword_args(name, kwargs, &["sep", "maxsplit"])?
        } else {
            self.keyword_args(name, kwargs, &[])?
        };

        match name {
            "upper" | "lower" | "isdigit" | "isalpha" | "isalnum" | "isspace" => {
                self.method_arity(receiver, name, &args, 0, 0)?;
                let non_empty = !text.is_empty();
                Ok(match name {
                    "upper" => Value::str(&text.to_uppercase()),
                    "lower" => Value::str(&text.to_lowercase()),
                    "isdigit" => Value::Bool(non_empty && text.chars().all(|c| c.is_ascii_digit())),
                    "isalpha" => Value::Bool(non_empty && text.chars().all(char::is_alphabetic)),
                    "isalnum" => Value::Bool(non_empty && text.chars().all(char::is_alphanumeric)),
                    _ => Value::Bool(non_empty && text.chars().all(char::is_whitespace)),
                })
            }
            "strip" | "lstrip" | "rstrip" => {
                self.method_arity(receiver, name, &args, 0, 1)?;
                let chars: Option<Vec<char>> = match args.first() {
                    None | Some(Value::None) => None,
                    Some(v) => Some(self.str_arg(name, v)?.chars().collect()),
                };
                let matches = |c: char| match &chars {
                    Some(set) => set.contains(&c),
                    None => c.is_whitespace(),
                };
                let stripped = match name {
                    "strip" => text.trim_matches(matches),
                    "lstrip" => text.trim_start_matches(matches),
                    _ => text.trim_end_matches(matches),
                };
                Ok(Value::str(stripped))
            }
            "split" => {
                self.method_arity(receiver, name, &args, 0, 2)?;
                let sep = args.first().cloned().or_else(|| kw.take("sep"));
                let maxsplit = match args.get(1).cloned().or_else(|| kw.take("maxsplit")) {
                    Some(v) => self.int_arg("split", &v)?,
                    None => -1,
                };
                let parts: Vec<String> = match &sep {
                    None | Some(Value::None) => split_whitespace(text, maxsplit),
                    Some(v) => {
                        let sep = self.str_arg("split", v)?;
                        if sep.is_empty() {
                            return Err(self.fault("ValueError", "empty separator"));
                        }
                        if maxsplit < 0 {
                            text.split(sep).map(str::to_string).collect()
                        } else {
                            text.splitn(maxsplit as usize + 1, sep).map(str::to_string).collect()
                        }
                    }
                };
                let parts = parts.iter().map(|p| Value::str(p)).collect();
                Ok(self.new_list(parts))
            }
            "join" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let items = self.iter_values(&args[0])?;
                let mut pieces = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => pieces.push(s.to_string()),
                        None => {
                            return Err(self.fault(
                                "TypeError",
                                format!(
                                    "sequence item {}: expected str instance, {} found",
                                    i,
                                    item.type_name()
                                ),
                            ))
                        }
                    }
                }
                Ok(Value::str(&pieces.join(text)))
            }
            "replace" => {
                self.method_arity(receiver, name, &args, 2, 3)?;
                let old = self.str_arg(name, &args[0])?;
                let new = self.str_arg(name, &args[1])?;
                let replaced = match args.get(2) {
                    Some(count) => {
                        let count = self.int_arg("replace", count)?;
                        if count < 0 {
                            text.replace(old, new)
                        } else {
                            text.replacen(old, new, count as usize)
                        }
                    }
                    None => text.replace(old, new),
                };
                Ok(Value::str(&replaced))
            }
            "startswith" | "endswith" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let candidates: Vec<Value> = match &args[0] {
                    Value::Tuple(items) => items.to_vec(),
                    other => vec![other.clone()],
                };
                let mut hit = false;
                for candidate in &candidates {
                    let affix = self.str_arg(name, candidate)?;
                    hit |= if name == "startswith" {
                        text.starts_with(affix)
                    } else {
                        text.ends_with(affix)
                    };
                }
                Ok(Value::Bool(hit))
            }
            "find" | "rfind" | "index" => {
                self.method_arity(receiver, name, &args, 1, 3)?;
                let needle = self.str_arg(name, &args[0])?;
                let len = text.chars().count() as i64;
                let clamp = |v: i64| if v < 0 { (v + len).max(0) } else { v.min(len) } as usize;
                let start = match args.get(1) {
                    Some(v) => clamp(self.int_arg(name, v)?),
                    None => 0,
                };
                let end = match args.get(2) {
                    Some(v) => clamp(self.int_arg(name, v)?),
                    None => len as usize,
                };
                let found = char_find(text, needle, start, end, name == "rfind");
                match (found, name) {
                    (Some(i), _) => Ok(Value::Int(i as i64)),
                    (None, "index") => Err(self.fault("ValueError", "substring not found")),
                    (None, _) => Ok(Value::Int(-1)),
                }
            }
            "count" => {
                self.method_arity(receiver, name, &args, 1, 1)?;
                let needle = self.str_arg(name, &args[0])?;
                let count = if needle.is_empty() {
                    text.chars().count() + 1
                } else {
                    text.matches(needle).count()
                };
                Ok(Value::Int(count as i64))
            }
            _ => Err(self.fault(
                "AttributeError",
                format!("'str' object has no attribute '{}'", name),
            )),
        }
    }

    /// `template.format(*args, **kwargs)`
    fn format_template(
        &self,
        template: &str,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<String, TraceError> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        let mut next_auto = 0;

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => {
                    return Err(self.fault("ValueError", "Single '}' encountered in format string"));
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(self.fault("ValueError", "expected '}' before end of string"));
                    }

                    let (head, spec) = match field.split_once(':') {
                        Some((head, spec)) => (head, Some(spec)),
                        None => (field.as_str(), None),
                    };
                    let (key, conversion) = match head.split_once('!') {
                        Some((key, conv)) => (key, conv.chars().next()),
                        None => (head, None),
                    };

                    let value = if key.is_empty() {
                        let value = args.get(next_auto).cloned();
                        next_auto += 1;
                        value.ok_or_else(|| {
                            self.fault(
                                "IndexError",
                                format!("Replacement index {} out of range for positional args tuple", next_auto - 1),
                            )
                        })?
                    } else if let Ok(index) = key.parse::<usize>() {
                        args.get(index).cloned().ok_or_else(|| {
                            self.fault(
                                "IndexError",
                                format!("Replacement index {} out of range for positional args tuple", index),
                            )
                        })?
                    } else {
                        kwargs
                            .iter()
                            .find(|(name, _)| name == key)
                            .map(|(_, v)| v.clone())
                            .ok_or_else(|| self.fault("KeyError", Value::str(key).repr()))?
                    };

                    let value = match conversion {
                        Some('r') | Some('a') => Value::str(&value.repr()),
                        Some(_) => Value::str(&value.py_str()),
                        None => value,
                    };
                    match spec {
                        Some(spec) => {
                            let text = self.format_with_spec(&value, spec)?;
                            out.push_str(&text);
                        }
                        None => out.push_str(&value.py_str()),
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_tables() {
        let text = Value::str("abc");
        assert!(Interpreter::has_method(&text, "split"));
        assert!(!Interpreter::has_method(&text, "append"));
        assert!(!Interpreter::has_method(&Value::Int(3), "bit_length"));
    }

    #[test]
    fn test_split_whitespace() {
        assert_eq!(split_whitespace("  a b  c ", -1), vec!["a", "b", "c"]);
        assert_eq!(split_whitespace(" a b c ", 1), vec!["a", "b c "]);
        assert!(split_whitespace("   ", -1).is_empty());
    }

    #[test]
    fn test_char_find() {
        assert_eq!(char_find("héllo", "l", 0, 5, false), Some(2));
        assert_eq!(char_find("héllo", "l", 0, 5, true), Some(3));
        assert_eq!(char_find("abc", "c", 0, 2, false), None);
        assert_eq!(char_find("abc", "a", 3, 1, false), None);
    }
}
