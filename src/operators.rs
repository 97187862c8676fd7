//! Unary and binary operator semantics
//!
//! Numeric operands are promoted before arithmetic:
//! - any Float operand makes both sides Float;
//! - otherwise integer-like operands (Int, Uint, Duration) promote along
//!   `Uint < Int < Duration`, so mixing Int with Uint computes in Int and
//!   anything mixed with Duration yields a Duration.
//!
//! Integer arithmetic wraps at 64 bits.

use std::cmp::Ordering;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::duration::Duration;
use crate::error::{EvalError, Result};
use crate::host::time_add;
use crate::value::{Value, ValueKind};

/// Apply a binary operator to two evaluated operands
pub fn binary(op: BinaryOperator, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOperator::*;

    // Calendar arithmetic between an instant and a duration
    match (op, &lhs, &rhs) {
        (Add, Value::Time(t), Value::Duration(d)) | (Add, Value::Duration(d), Value::Time(t)) => {
            return Ok(Value::Time(time_add(*t, *d)?));
        }
        (Subtract, Value::Time(t), Value::Duration(d))
        | (Subtract, Value::Duration(d), Value::Time(t)) => {
            return Ok(Value::Time(time_add(*t, Duration(d.0.wrapping_neg()))?));
        }
        _ => {}
    }

    let (lk, rk) = (lhs.kind(), rhs.kind());
    if matches!(lk, ValueKind::Function | ValueKind::Namespace)
        || matches!(rk, ValueKind::Function | ValueKind::Namespace)
    {
        return Err(unsupported(op, &lhs, &rhs));
    }

    if lk != rk && !(lk.is_numeric() && rk.is_numeric()) {
        return Err(EvalError::IncompatibleTypes {
            op,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        });
    }

    if lk == ValueKind::Float || rk == ValueKind::Float {
        let (a, b) = (to_f64(&lhs), to_f64(&rhs));
        return float_op(op, a, b).ok_or_else(|| unsupported(op, &lhs, &rhs));
    }

    if lk.is_numeric() {
        return integer_op(op, &lhs, &rhs);
    }

    match (&lhs, &rhs) {
        (Value::String(a), Value::String(b)) => match op {
            Add | Subtract => Ok(Value::String(format!("{}{}", a, b))),
            _ => compare(op, a.cmp(b)).ok_or_else(|| unsupported(op, &lhs, &rhs)),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            Equal => Ok(Value::Bool(a == b)),
            NotEqual => Ok(Value::Bool(a != b)),
            And => Ok(Value::Bool(*a && *b)),
            Or => Ok(Value::Bool(*a || *b)),
            _ => Err(unsupported(op, &lhs, &rhs)),
        },
        (Value::Time(a), Value::Time(b)) => {
            compare(op, a.cmp(b)).ok_or_else(|| unsupported(op, &lhs, &rhs))
        }
        (Value::Aggregate(_), Value::Aggregate(_)) if lhs.type_name() == rhs.type_name() => {
            match op {
                Equal => Ok(Value::Bool(lhs == rhs)),
                NotEqual => Ok(Value::Bool(lhs != rhs)),
                _ => Err(unsupported(op, &lhs, &rhs)),
            }
        }
        _ => Err(unsupported(op, &lhs, &rhs)),
    }
}

/// Apply a unary operator
pub fn unary(op: UnaryOperator, operand: Value) -> Result<Value> {
    use UnaryOperator::*;

    let result = match (op, &operand) {
        (Plus, Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Duration(_)) => {
            Some(operand.clone())
        }
        (Negate, Value::Int(i)) => Some(Value::Int(i.wrapping_neg())),
        (Negate, Value::Uint(u)) => Some(Value::Uint(u.wrapping_neg())),
        (Negate, Value::Float(f)) => Some(Value::Float(-f)),
        (Negate, Value::Duration(d)) => Some(Value::Duration(Duration(d.0.wrapping_neg()))),
        (Complement | Ampersand, Value::Int(i)) => Some(Value::Int(!i)),
        (Complement | Ampersand, Value::Uint(u)) => Some(Value::Uint(!u)),
        (Complement | Ampersand, Value::Duration(d)) => Some(Value::Duration(Duration(!d.0))),
        (Not, Value::Bool(b)) => Some(Value::Bool(!b)),
        _ => None,
    };

    result.ok_or_else(|| EvalError::UnsupportedUnary {
        op,
        kind: operand.type_name(),
    })
}

fn unsupported(op: BinaryOperator, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::UnsupportedBinary {
        op,
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Uint(u) => *u as f64,
        Value::Float(f) => *f,
        Value::Duration(d) => d.0 as f64,
        _ => f64::NAN,
    }
}

fn compare(op: BinaryOperator, ordering: Ordering) -> Option<Value> {
    use BinaryOperator::*;

    let result = match op {
        Equal => ordering == Ordering::Equal,
        NotEqual => ordering != Ordering::Equal,
        LessThan => ordering == Ordering::Less,
        LessThanOrEqual => ordering != Ordering::Greater,
        GreaterThan => ordering == Ordering::Greater,
        GreaterThanOrEqual => ordering != Ordering::Less,
        _ => return None,
    };
    Some(Value::Bool(result))
}

fn float_op(op: BinaryOperator, a: f64, b: f64) -> Option<Value> {
    use BinaryOperator::*;

    let result = match op {
        Add => Value::Float(a + b),
        Subtract => Value::Float(a - b),
        Multiply => Value::Float(a * b),
        Divide => Value::Float(a / b),
        Equal => Value::Bool(a == b),
        NotEqual => Value::Bool(a != b),
        LessThan => Value::Bool(a < b),
        LessThanOrEqual => Value::Bool(a <= b),
        GreaterThan => Value::Bool(a > b),
        GreaterThanOrEqual => Value::Bool(a >= b),
        _ => return None,
    };
    Some(result)
}

/// Integer rank for promotion; the higher rank wins
fn rank(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::Uint => 0,
        ValueKind::Int => 1,
        _ => 2,
    }
}

fn as_bits(value: &Value) -> u64 {
    match value {
        Value::Int(i) => *i as u64,
        Value::Uint(u) => *u,
        Value::Duration(d) => d.0 as u64,
        _ => 0,
    }
}

fn integer_op(op: BinaryOperator, lhs: &Value, rhs: &Value) -> Result<Value> {
    let target = if rank(lhs.kind()) >= rank(rhs.kind()) {
        lhs.kind()
    } else {
        rhs.kind()
    };
    let (a, b) = (as_bits(lhs), as_bits(rhs));

    if matches!(op, BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight) {
        return shift(op, lhs.kind(), a, rhs);
    }

    if target == ValueKind::Uint {
        return unsigned_op(op, a, b).ok_or_else(|| unsupported(op, lhs, rhs))?;
    }

    let wrap = |n: i64| {
        if target == ValueKind::Duration {
            Value::Duration(Duration(n))
        } else {
            Value::Int(n)
        }
    };
    signed_op(op, a as i64, b as i64, wrap).ok_or_else(|| unsupported(op, lhs, rhs))?
}

fn unsigned_op(op: BinaryOperator, a: u64, b: u64) -> Option<Result<Value>> {
    use BinaryOperator::*;

    let value = match op {
        Add => Value::Uint(a.wrapping_add(b)),
        Subtract => Value::Uint(a.wrapping_sub(b)),
        Multiply => Value::Uint(a.wrapping_mul(b)),
        Divide | Modulo if b == 0 => return Some(Err(EvalError::DivisionByZero)),
        Divide => Value::Uint(a / b),
        Modulo => Value::Uint(a % b),
        BitAnd => Value::Uint(a & b),
        BitOr => Value::Uint(a | b),
        BitXor => Value::Uint(a ^ b),
        _ => return compare(op, a.cmp(&b)).map(Ok),
    };
    Some(Ok(value))
}

fn signed_op(
    op: BinaryOperator,
    a: i64,
    b: i64,
    wrap: impl Fn(i64) -> Value,
) -> Option<Result<Value>> {
    use BinaryOperator::*;

    let value = match op {
        Add => wrap(a.wrapping_add(b)),
        Subtract => wrap(a.wrapping_sub(b)),
        Multiply => wrap(a.wrapping_mul(b)),
        Divide | Modulo if b == 0 => return Some(Err(EvalError::DivisionByZero)),
        Divide => wrap(a.wrapping_div(b)),
        Modulo => wrap(a.wrapping_rem(b)),
        BitAnd => wrap(a & b),
        BitOr => wrap(a | b),
        BitXor => wrap(a ^ b),
        _ => return compare(op, a.cmp(&b)).map(Ok),
    };
    Some(Ok(value))
}

/// Shifts keep the left operand's kind; counts of 64 or more saturate
fn shift(op: BinaryOperator, kind: ValueKind, bits: u64, count: &Value) -> Result<Value> {
    let count = match count {
        Value::Uint(u) => *u,
        Value::Int(i) | Value::Duration(Duration(i)) => {
            if *i < 0 {
                return Err(EvalError::NegativeShift { count: *i });
            }
            *i as u64
        }
        _ => 0,
    };

    let value = match kind {
        ValueKind::Uint => {
            let shifted = if count >= 64 {
                0
            } else if op == BinaryOperator::ShiftLeft {
                bits << count
            } else {
                bits >> count
            };
            Value::Uint(shifted)
        }
        _ => {
            let signed = bits as i64;
            let shifted = if op == BinaryOperator::ShiftLeft {
                if count >= 64 {
                    0
                } else {
                    signed << count
                }
            } else if count >= 64 {
                if signed < 0 {
                    -1
                } else {
                    0
                }
            } else {
                signed >> count
            };
            if kind == ValueKind::Duration {
                Value::Duration(Duration(shifted))
            } else {
                Value::Int(shifted)
            }
        }
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use BinaryOperator::*;

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(binary(Add, Value::Int(2), Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(binary(Divide, Value::Int(-7), Value::Int(2)).unwrap(), Value::Int(-3));
        assert_eq!(binary(Modulo, Value::Int(-7), Value::Int(2)).unwrap(), Value::Int(-1));
        assert_eq!(
            binary(Add, Value::Int(i64::MAX), Value::Int(1)).unwrap(),
            Value::Int(i64::MIN)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            binary(Divide, Value::Int(1), Value::Int(0)).unwrap_err(),
            EvalError::DivisionByZero
        );
        assert_eq!(
            binary(Modulo, Value::Uint(1), Value::Uint(0)).unwrap_err(),
            EvalError::DivisionByZero
        );
        assert_eq!(
            binary(Divide, Value::Float(1.0), Value::Float(0.0)).unwrap(),
            Value::Float(f64::INFINITY)
        );
    }

    #[test]
    fn test_shifts() {
        assert_eq!(
            binary(ShiftLeft, Value::Int(1), Value::Int(32)).unwrap(),
            Value::Int(4_294_967_296)
        );
        assert_eq!(binary(ShiftRight, Value::Int(32), Value::Int(1)).unwrap(), Value::Int(16));
        assert_eq!(binary(ShiftLeft, Value::Int(1), Value::Int(64)).unwrap(), Value::Int(0));
        assert_eq!(binary(ShiftRight, Value::Int(-8), Value::Int(70)).unwrap(), Value::Int(-1));
        assert_eq!(
            binary(ShiftLeft, Value::Int(1), Value::Int(-1)).unwrap_err(),
            EvalError::NegativeShift { count: -1 }
        );
    }

    #[test]
    fn test_promotion() {
        assert_eq!(binary(Add, Value::Int(1), Value::Float(0.5)).unwrap(), Value::Float(1.5));
        assert_eq!(binary(Add, Value::Uint(1), Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(binary(Add, Value::Uint(1), Value::Uint(2)).unwrap(), Value::Uint(3));
        assert_eq!(
            binary(Multiply, Value::Int(-1), Value::Duration(Duration::MINUTE)).unwrap(),
            Value::Duration(Duration(-Duration::MINUTE.0))
        );
        assert_eq!(
            binary(LessThan, Value::Duration(Duration(5)), Value::Int(6)).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_time_and_duration() {
        let t = Value::Time(DateTime::from_timestamp(1_577_836_800, 0).unwrap().into());
        let minute = Value::Duration(Duration::MINUTE);
        let expected = Value::Time(DateTime::from_timestamp(1_577_836_740, 0).unwrap().into());
        assert_eq!(binary(Subtract, t.clone(), minute.clone()).unwrap(), expected);
        assert_eq!(
            binary(Add, minute, t.clone()).unwrap(),
            Value::Time(DateTime::from_timestamp(1_577_836_860, 0).unwrap().into())
        );
        assert_eq!(binary(LessThan, expected, t).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            binary(Add, Value::from("ab"), Value::from("cd")).unwrap(),
            Value::from("abcd")
        );
        assert_eq!(
            binary(Subtract, Value::from("ab"), Value::from("cd")).unwrap(),
            Value::from("abcd")
        );
        assert_eq!(
            binary(LessThan, Value::from("abc"), Value::from("abd")).unwrap(),
            Value::Bool(true)
        );
        assert!(matches!(
            binary(Multiply, Value::from("a"), Value::from("b")).unwrap_err(),
            EvalError::UnsupportedBinary { .. }
        ));
    }

    #[test]
    fn test_incompatible_and_unsupported() {
        assert!(matches!(
            binary(Add, Value::from("a"), Value::Int(1)).unwrap_err(),
            EvalError::IncompatibleTypes { .. }
        ));
        assert!(matches!(
            binary(Add, Value::Bool(true), Value::Bool(false)).unwrap_err(),
            EvalError::UnsupportedBinary { .. }
        ));
        assert!(matches!(
            binary(Modulo, Value::Float(1.0), Value::Float(2.0)).unwrap_err(),
            EvalError::UnsupportedBinary { .. }
        ));
        assert!(matches!(
            binary(Equal, Value::Namespace("fmt".into()), Value::Namespace("fmt".into()))
                .unwrap_err(),
            EvalError::UnsupportedBinary { .. }
        ));
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOperator::Negate, Value::Int(5)).unwrap(), Value::Int(-5));
        assert_eq!(unary(UnaryOperator::Complement, Value::Int(0)).unwrap(), Value::Int(-1));
        assert_eq!(unary(UnaryOperator::Ampersand, Value::Uint(0)).unwrap(), Value::Uint(u64::MAX));
        assert_eq!(unary(UnaryOperator::Not, Value::Bool(true)).unwrap(), Value::Bool(false));
        assert!(matches!(
            unary(UnaryOperator::Not, Value::Int(1)).unwrap_err(),
            EvalError::UnsupportedUnary { .. }
        ));
        assert!(unary(UnaryOperator::Negate, Value::from("x")).is_err());
    }
}
