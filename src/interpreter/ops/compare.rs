//! Comparison and membership operators

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::Value;
use crate::parser::ast::CmpOp;
use std::cmp::Ordering;

impl Interpreter {
    /// Apply one link of a comparison chain; failures fall back to `False` when lenient
    pub(crate) fn apply_compare(&mut self, op: CmpOp, left: &Value, right: &Value) -> Result<bool, TraceError> {
        let result = self.compare_values(op, left, right);
        self.recover(result, false)
    }

    pub(crate) fn compare_values(&self, op: CmpOp, left: &Value, right: &Value) -> Result<bool, TraceError> {
        match op {
            CmpOp::Eq => Ok(left.py_eq(right)),
            CmpOp::NotEq => Ok(!left.py_eq(right)),
            CmpOp::Is => Ok(left.is_same(right)),
            CmpOp::IsNot => Ok(!left.is_same(right)),
            CmpOp::In => self.contains(right, left),
            CmpOp::NotIn => self.contains(right, left).map(|found| !found),
            CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => {
                if let (Value::Set(_), Value::Set(_)) = (left, right) {
                    // Subset ordering: incomparable sets are simply not ordered
                    return Ok(left.py_cmp(right).is_some_and(|ord| ordering_matches(op, ord)));
                }
                let ord = self.order(op.symbol(), left, right)?;
                Ok(ordering_matches(op, ord))
            }
        }
    }

    /// Total order for sorting and heaps; unorderable pairs raise `TypeError`
    pub(crate) fn order(&self, symbol: &str, left: &Value, right: &Value) -> Result<Ordering, TraceError> {
        left.py_cmp(right).ok_or_else(|| {
            self.fault(
                "TypeError",
                format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    symbol,
                    left.type_name(),
                    right.type_name()
                ),
            )
        })
    }

    /// `a < b` for heap and bisect algorithms
    pub(crate) fn less_than(&self, left: &Value, right: &Value) -> Result<bool, TraceError> {
        Ok(self.order("<", left, right)? == Ordering::Less)
    }

    /// `item in container`
    pub(crate) fn contains(&self, container: &Value, item: &Value) -> Result<bool, TraceError> {
        match container {
            Value::List(l) => Ok(l.items().iter().any(|v| v.py_eq(item))),
            Value::Tuple(items) => Ok(items.iter().any(|v| v.py_eq(item))),
            Value::Str(s) => match item {
                Value::Str(needle) => Ok(s.contains(&**needle)),
                other => Err(self.fault(
                    "TypeError",
                    format!("'in <string>' requires string as left operand, not {}", other.type_name()),
                )),
            },
            Value::Dict(d) => {
                let key = self.hash_key(item.clone())?;
                Ok(d.entries().contains_key(&key))
            }
            Value::Set(s) => {
                let key = self.hash_key(item.clone())?;
                Ok(s.contains(&key))
            }
            Value::Range(r) => {
                let integral = item.as_int().or_else(|| match item {
                    Value::Float(x) if x.fract() == 0.0 && x.abs() < 9.0e18 => Some(*x as i64),
                    _ => None,
                });
                Ok(match integral {
                    Some(n) if r.step > 0 => n >= r.start && n < r.stop && (n - r.start) % r.step == 0,
                    Some(n) => n <= r.start && n > r.stop && (r.start - n) % (-r.step) == 0,
                    None => false,
                })
            }
            other => Err(self.fault(
                "TypeError",
                format!("argument of type '{}' is not iterable", other.type_name()),
            )),
        }
    }
}

fn ordering_matches(op: CmpOp, ord: Ordering) -> bool {
    match op {
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::LtE => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::GtE => ord != Ordering::Less,
        _ => false,
    }
}
