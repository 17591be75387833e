use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::Value;
use crate::parser::ast::BinOp;

/// Floor division with the sign of the divisor, as the traced language defines it
#[inline]
pub(crate) fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Remainder with the sign of the divisor
#[inline]
pub(crate) fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

#[inline]
fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

impl Interpreter {
    /// Apply a binary operator, substituting the lenient fallback on failure
    pub(crate) fn apply_binary(&mut self, op: BinOp, left: &Value, right: &Value) -> Result<Value, TraceError> {
        let result = self.binary_value(op, left, right);
        let fallback = match &result {
            Err(err) if err.cause() == Some("ZeroDivisionError") => match op {
                BinOp::Div => Value::Float(0.0),
                _ => Value::Int(0),
            },
            _ => Value::None,
        };
        self.recover(result, fallback)
    }

    /// Augmented assignment: `+=` on a list extends it in place
    pub(crate) fn apply_augmented(&mut self, op: BinOp, current: &Value, operand: &Value) -> Result<Value, TraceError> {
        if let (BinOp::Add, Value::List(list)) = (op, current) {
            if matches!(operand, Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Range(_) | Value::Set(_) | Value::Dict(_)) {
                let extra = self.iter_values(operand)?;
                list.update(|items| items.extend(extra));
                return Ok(current.clone());
            }
        }
        if let (BinOp::BitOr, Value::Set(set), Value::Set(other)) = (op, current, operand) {
            let extra = other.items().clone();
            set.update(|items| items.extend(extra));
            return Ok(current.clone());
        }
        self.apply_binary(op, current, operand)
    }

    fn overflow(&self, op: BinOp) -> TraceError {
        self.fault("OverflowError", format!("integer overflow in '{}'", op.symbol()))
    }

    fn unsupported(&self, op: BinOp, left: &Value, right: &Value) -> TraceError {
        self.fault(
            "TypeError",
            format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )
    }

    /// Refuse sequence repetition that could not fit the memory limit
    fn check_repeat(&self, unit: usize, count: i64) -> Result<usize, TraceError> {
        let count = count.max(0) as usize;
        self.ctx.check_allocation(unit.saturating_mul(count), "repetition")?;
        Ok(count)
    }

    /// Raw binary operation without leniency
    pub(crate) fn binary_value(&mut self, op: BinOp, left: &Value, right: &Value) -> Result<Value, TraceError> {
        use Value::*;

        // Integer arithmetic (bools count as ints)
        if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
            if !matches!((left, right), (Bool(_), Bool(_))) || !matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) {
                return self.int_binary(op, a, b, left, right);
            }
            let (x, y) = (a != 0, b != 0);
            return Ok(Bool(match op {
                BinOp::BitAnd => x & y,
                BinOp::BitOr => x | y,
                _ => x ^ y,
            }));
        }

        if left.is_number() && right.is_number() {
            let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
                return Err(self.unsupported(op, left, right));
            };
            return self.float_binary(op, a, b, left, right);
        }

        match (op, left, right) {
            (BinOp::Add, Str(a), Str(b)) => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Ok(Value::str(&joined))
            }
            (BinOp::Add, List(a), List(b)) if a.is_deque == b.is_deque => {
                let mut items = a.to_vec();
                items.extend(b.to_vec());
                Ok(if a.is_deque { self.new_deque(items) } else { self.new_list(items) })
            }
            (BinOp::Add, Tuple(a), Tuple(b)) => {
                let mut items = a.to_vec();
                items.extend(b.iter().cloned());
                Ok(Value::tuple(items))
            }
            (BinOp::Mul, Str(s), n) | (BinOp::Mul, n, Str(s)) if n.as_int().is_some() => {
                let count = self.check_repeat(s.len(), n.as_int().unwrap_or(0))?;
                Ok(Value::str(&s.repeat(count)))
            }
            (BinOp::Mul, List(l), n) | (BinOp::Mul, n, List(l)) if n.as_int().is_some() => {
                let items = l.to_vec();
                let count = self.check_repeat(items.len(), n.as_int().unwrap_or(0))?;
                let repeated = items.iter().cloned().cycle().take(items.len() * count).collect();
                Ok(if l.is_deque { self.new_deque(repeated) } else { self.new_list(repeated) })
            }
            (BinOp::Mul, Tuple(t), n) | (BinOp::Mul, n, Tuple(t)) if n.as_int().is_some() => {
                let count = self.check_repeat(t.len(), n.as_int().unwrap_or(0))?;
                let repeated = t.iter().cloned().cycle().take(t.len() * count).collect();
                Ok(Value::tuple(repeated))
            }
            (BinOp::BitOr, Set(a), Set(b)) => {
                let mut items = a.items().clone();
                items.extend(b.items().iter().cloned());
                Ok(self.new_set(items))
            }
            (BinOp::BitAnd, Set(a), Set(b)) => {
                let other = b.items();
                let items = a.items().iter().filter(|k| other.contains(*k)).cloned().collect();
                Ok(self.new_set(items))
            }
            (BinOp::Sub, Set(a), Set(b)) => {
                let other = b.items();
                let items = a.items().iter().filter(|k| !other.contains(*k)).cloned().collect();
                Ok(self.new_set(items))
            }
            (BinOp::BitXor, Set(a), Set(b)) => {
                let (x, y) = (a.items(), b.items());
                let items = x.symmetric_difference(&*y).cloned().collect();
                Ok(self.new_set(items))
            }
            (BinOp::BitOr, Dict(a), Dict(b)) => {
                let mut entries = a.entries().clone();
                entries.extend(b.entries().iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(self.new_dict_of_kind(entries, a.kind, a.default_factory.clone()))
            }
            _ => Err(self.unsupported(op, left, right)),
        }
    }

    fn int_binary(&self, op: BinOp, a: i64, b: i64, left: &Value, right: &Value) -> Result<Value, TraceError> {
        let checked = |result: Option<i64>| result.map(Value::Int).ok_or_else(|| self.overflow(op));
        match op {
            BinOp::Add => checked(a.checked_add(b)),
            BinOp::Sub => checked(a.checked_sub(b)),
            BinOp::Mul => checked(a.checked_mul(b)),
            BinOp::Div => {
                if b == 0 {
                    return Err(self.fault("ZeroDivisionError", "division by zero"));
                }
                Ok(Value::Float(a as f64 / b as f64))
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    return Err(self.fault("ZeroDivisionError", "integer division or modulo by zero"));
                }
                checked(floor_div(a, b))
            }
            BinOp::Mod => {
                if b == 0 {
                    return Err(self.fault("ZeroDivisionError", "integer modulo by zero"));
                }
                checked(floor_mod(a, b))
            }
            BinOp::Pow => {
                if b < 0 {
                    if a == 0 {
                        return Err(self.fault(
                            "ZeroDivisionError",
                            "0.0 cannot be raised to a negative power",
                        ));
                    }
                    return Ok(Value::Float((a as f64).powf(b as f64)));
                }
                let exp = u32::try_from(b).map_err(|_| self.overflow(op))?;
                checked(a.checked_pow(exp))
            }
            BinOp::BitAnd => Ok(Value::Int(a & b)),
            BinOp::BitOr => Ok(Value::Int(a | b)),
            BinOp::BitXor => Ok(Value::Int(a ^ b)),
            BinOp::LShift | BinOp::RShift if b < 0 => Err(self.fault("ValueError", "negative shift count")),
            BinOp::LShift => {
                if a == 0 {
                    return Ok(Value::Int(0));
                }
                let shift = u32::try_from(b).ok().filter(|s| *s < 64).ok_or_else(|| self.overflow(op))?;
                let shifted = a << shift;
                if shifted >> shift != a {
                    return Err(self.overflow(op));
                }
                Ok(Value::Int(shifted))
            }
            BinOp::RShift => {
                let shift = b.min(63) as u32;
                Ok(Value::Int(a >> shift))
            }
            BinOp::MatMul => Err(self.unsupported(op, left, right)),
        }
    }

    fn float_binary(&self, op: BinOp, a: f64, b: f64, left: &Value, right: &Value) -> Result<Value, TraceError> {
        let value = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b == 0.0 {
                    return Err(self.fault("ZeroDivisionError", "float division by zero"));
                }
                a / b
            }
            BinOp::FloorDiv => {
                if b == 0.0 {
                    return Err(self.fault("ZeroDivisionError", "float floor division by zero"));
                }
                (a / b).floor()
            }
            BinOp::Mod => {
                if b == 0.0 {
                    return Err(self.fault("ZeroDivisionError", "float modulo"));
                }
                float_mod(a, b)
            }
            BinOp::Pow => {
                if a == 0.0 && b < 0.0 {
                    return Err(self.fault(
                        "ZeroDivisionError",
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                let result = a.powf(b);
                if result.is_nan() && !a.is_nan() && !b.is_nan() {
                    return Err(self.fault(
                        "ValueError",
                        "negative number cannot be raised to a fractional power",
                    ));
                }
                if result.is_infinite() && a.is_finite() && b.is_finite() {
                    return Err(self.fault("OverflowError", "numerical result out of range"));
                }
                result
            }
            _ => return Err(self.unsupported(op, left, right)),
        };
        Ok(Value::Float(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_semantics() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_mod(-7, 2), Some(1));
        assert_eq!(floor_mod(7, -2), Some(-1));
        assert_eq!(floor_div(i64::MIN, -1), None);
        assert_eq!(float_mod(-1.0, 3.0), 2.0);
    }
}
