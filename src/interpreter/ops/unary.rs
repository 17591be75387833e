//! Unary operator evaluation

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::TraceError;
use crate::memory::value::Value;
use crate::parser::ast::UnaryOp;

impl Interpreter {
    /// Apply a unary operator; failures fall back to `None` when lenient
    pub(crate) fn apply_unary(&mut self, op: UnaryOp, operand: &Value) -> Result<Value, TraceError> {
        let result = self.unary_value(op, operand);
        self.recover(result, Value::None)
    }

    fn unary_value(&self, op: UnaryOp, operand: &Value) -> Result<Value, TraceError> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
            UnaryOp::Neg => match operand {
                Value::Float(x) => Ok(Value::Float(-x)),
                other => match other.as_int() {
                    Some(n) => n
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| self.fault("OverflowError", format!("integer overflow in -{}", n))),
                    None => Err(self.bad_operand("-", other)),
                },
            },
            UnaryOp::Pos => match operand {
                Value::Float(x) => Ok(Value::Float(*x)),
                other => other
                    .as_int()
                    .map(Value::Int)
                    .ok_or_else(|| self.bad_operand("+", other)),
            },
            UnaryOp::Invert => operand
                .as_int()
                .map(|n| Value::Int(!n))
                .ok_or_else(|| self.bad_operand("~", operand)),
        }
    }

    fn bad_operand(&self, symbol: &str, operand: &Value) -> TraceError {
        self.fault(
            "TypeError",
            format!("bad operand type for unary {}: '{}'", symbol, operand.type_name()),
        )
    }
}
