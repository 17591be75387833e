//! Frozen snapshot values
//!
//! [`Data`] is the immutable, thread-safe image of a runtime [`Value`](crate::memory::value::Value)
//! stored in steps. Containers are `Arc`-shared so an unchanged list can be
//! referenced by many consecutive steps without copying.

use crate::memory::value::{format_float, repr_str};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Data {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<Vec<Data>>),
    Tuple(Arc<Vec<Data>>),
    Set(Arc<Vec<Data>>),
    /// Ordered key/value pairs
    Dict(Arc<Vec<(Data, Data)>>),
    /// Textual fallback (ranges, cyclic back-references)
    Repr(Arc<str>),
}

impl Data {
    pub fn str(s: &str) -> Data {
        Data::Str(Arc::from(s))
    }

    pub fn list(items: Vec<Data>) -> Data {
        Data::List(Arc::new(items))
    }

    pub fn dict(pairs: Vec<(Data, Data)>) -> Data {
        Data::Dict(Arc::new(pairs))
    }

    /// Same value, and for containers the very same allocation
    pub fn ptr_eq(&self, other: &Data) -> bool {
        match (self, other) {
            (Data::List(a), Data::List(b))
            | (Data::Tuple(a), Data::Tuple(b))
            | (Data::Set(a), Data::Set(b)) => Arc::ptr_eq(a, b),
            (Data::Dict(a), Data::Dict(b)) => Arc::ptr_eq(a, b),
            (Data::Float(a), Data::Float(b)) => a.to_bits() == b.to_bits(),
            (Data::Str(a), Data::Str(b)) | (Data::Repr(a), Data::Repr(b)) => {
                Arc::ptr_eq(a, b) || a == b
            }
            (a, b) => a == b,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Data::List(_) | Data::Tuple(_) | Data::Set(_) | Data::Dict(_)
        )
    }

    /// Scalars usable as hash-map keys in visualizations
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Data::None | Data::Bool(_) | Data::Int(_) | Data::Float(_) | Data::Str(_)
        )
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Data::Int(n) => Some(*n),
            Data::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Data::Int(n) => Some(*n as f64),
            Data::Float(x) => Some(*x),
            Data::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a list (or deque)
    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    /// Items of any sequence-like container
    pub fn as_sequence(&self) -> Option<&[Data]> {
        match self {
            Data::List(items) | Data::Tuple(items) | Data::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Data]> {
        match self {
            Data::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Data, Data)]> {
        match self {
            Data::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a string key in a dict snapshot
    pub fn get(&self, key: &str) -> Option<&Data> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Text used as a JSON object key or a visual label
    pub fn key_text(&self) -> String {
        match self {
            Data::Str(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Data::None => "NoneType",
            Data::Bool(_) => "bool",
            Data::Int(_) => "int",
            Data::Float(_) => "float",
            Data::Str(_) => "str",
            Data::List(_) => "list",
            Data::Tuple(_) => "tuple",
            Data::Set(_) => "set",
            Data::Dict(_) => "dict",
            Data::Repr(_) => "object",
        }
    }
}

/// `repr`-style rendering
impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, items: &[Data]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            Data::None => write!(f, "None"),
            Data::Bool(true) => write!(f, "True"),
            Data::Bool(false) => write!(f, "False"),
            Data::Int(n) => write!(f, "{}", n),
            Data::Float(x) => write!(f, "{}", format_float(*x)),
            Data::Str(s) => write!(f, "{}", repr_str(s)),
            Data::List(items) => {
                write!(f, "[")?;
                seq(f, items)?;
                write!(f, "]")
            }
            Data::Tuple(items) => {
                write!(f, "(")?;
                seq(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Data::Set(items) if items.is_empty() => write!(f, "set()"),
            Data::Set(items) => {
                write!(f, "{{")?;
                seq(f, items)?;
                write!(f, "}}")
            }
            Data::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Data::Repr(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for Data {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Data::None => serializer.serialize_none(),
            Data::Bool(b) => serializer.serialize_bool(*b),
            Data::Int(n) => serializer.serialize_i64(*n),
            Data::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            Data::Float(x) => serializer.serialize_str(&format_float(*x)),
            Data::Str(s) | Data::Repr(s) => serializer.serialize_str(s),
            Data::List(items) | Data::Tuple(items) | Data::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Data::Dict(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs.iter() {
                    map.serialize_entry(&k.key_text(), v)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let value = Data::dict(vec![
            (Data::str("a"), Data::list(vec![Data::Int(1), Data::Float(2.5)])),
            (Data::Int(3), Data::None),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"a":[1,2.5],"3":null}"#);
    }

    #[test]
    fn test_non_finite_float_is_text() {
        let json = serde_json::to_value(Data::Float(f64::INFINITY)).unwrap();
        assert_eq!(json, serde_json::json!("inf"));
    }

    #[test]
    fn test_display_matches_repr() {
        let value = Data::Tuple(Arc::new(vec![Data::str("x")]));
        assert_eq!(value.to_string(), "('x',)");
        assert_eq!(Data::Set(Arc::new(Vec::new())).to_string(), "set()");
    }

    #[test]
    fn test_ptr_eq_requires_same_allocation() {
        let a = Data::list(vec![Data::Int(1)]);
        let b = Data::list(vec![Data::Int(1)]);
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
    }
}
