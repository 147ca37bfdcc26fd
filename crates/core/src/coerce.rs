//! Value coercion between data kinds.
//!
//! Assignments go through `coerce`, which either returns a value of the
//! target kind or a `TypeMismatch`/`OutOfRange` error. The conversion set
//! is closed: anything not listed here is a mismatch.

use crate::error::{Error, Result};
use crate::types::DataKind;
use crate::value::{Decimal, Value, MAX_DECIMAL_SCALE};
use alloc::string::String;

/// Coerces a value to the target kind.
///
/// Null coerces to any kind. A value already of the target kind passes
/// through unchanged. Numeric kinds convert between each other with range
/// checks; every kind except Bytes renders to String; strings parse back
/// to scalar kinds.
pub fn coerce(value: Value, target: DataKind) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if value.kind() == Some(target) {
        return Ok(value);
    }
    match target {
        DataKind::Bool => to_bool(value),
        DataKind::Int8 | DataKind::Int16 | DataKind::Int32 | DataKind::Int64 => {
            to_integer(value, target)
        }
        DataKind::Float64 => to_float(value),
        DataKind::Decimal => to_decimal(value),
        DataKind::Char => to_char(value),
        DataKind::String => to_string_value(value),
        DataKind::DateTime => to_datetime(value),
        DataKind::Bytes => Err(mismatch(target, &value)),
    }
}

fn mismatch(target: DataKind, value: &Value) -> Error {
    Error::type_mismatch(target, value.kind())
}

/// Whether a finite float carries no fractional part. Values at or above
/// 2^53 in magnitude are whole by representation; below that, truncation
/// through i64 is exact and round-trips.
fn is_whole(f: f64) -> bool {
    const EXACT_LIMIT: f64 = 9007199254740992.0; // 2^53
    if !f.is_finite() {
        return false;
    }
    if f >= EXACT_LIMIT || f <= -EXACT_LIMIT {
        return true;
    }
    (f as i64) as f64 == f
}

fn to_string_value(value: Value) -> Result<Value> {
    // Bytes stay outside the conversion set in both directions.
    if matches!(value, Value::Bytes(_)) {
        return Err(mismatch(DataKind::String, &value));
    }
    Ok(Value::String(value.render()))
}

fn to_bool(value: Value) -> Result<Value> {
    match &value {
        Value::String(s) => match s.as_str() {
            "true" | "True" | "TRUE" => Ok(Value::Bool(true)),
            "false" | "False" | "FALSE" => Ok(Value::Bool(false)),
            _ => Err(mismatch(DataKind::Bool, &value)),
        },
        _ => match value.as_int() {
            Some(i) => Ok(Value::Bool(i != 0)),
            None => Err(mismatch(DataKind::Bool, &value)),
        },
    }
}

fn narrow_int(i: i64, target: DataKind, source: &Value) -> Result<Value> {
    let out_of_range = || Error::out_of_range(target, source.clone());
    match target {
        DataKind::Int8 => i8::try_from(i).map(Value::Int8).map_err(|_| out_of_range()),
        DataKind::Int16 => i16::try_from(i)
            .map(Value::Int16)
            .map_err(|_| out_of_range()),
        DataKind::Int32 => i32::try_from(i)
            .map(Value::Int32)
            .map_err(|_| out_of_range()),
        _ => Ok(Value::Int64(i)),
    }
}

fn to_integer(value: Value, target: DataKind) -> Result<Value> {
    if let Some(i) = value.as_int() {
        return narrow_int(i, target, &value);
    }
    match &value {
        Value::Bool(b) => narrow_int(*b as i64, target, &value),
        Value::Float64(f) => {
            // Whole values only, no silent fraction loss.
            if !is_whole(*f) {
                return Err(Error::out_of_range(target, value.clone()));
            }
            if *f < i64::MIN as f64 || *f > i64::MAX as f64 {
                return Err(Error::out_of_range(target, value.clone()));
            }
            narrow_int(*f as i64, target, &value)
        }
        Value::Decimal(d) => match d.to_int() {
            Some(i) => narrow_int(i, target, &value),
            None => Err(Error::out_of_range(target, value.clone())),
        },
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => narrow_int(i, target, &value),
            Err(_) => Err(mismatch(target, &value)),
        },
        Value::DateTime(ms) => narrow_int(*ms, target, &value),
        _ => Err(mismatch(target, &value)),
    }
}

fn to_float(value: Value) -> Result<Value> {
    if let Some(i) = value.as_int() {
        return Ok(Value::Float64(i as f64));
    }
    match &value {
        Value::Decimal(d) => Ok(Value::Float64(d.to_f64())),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|_| mismatch(DataKind::Float64, &value)),
        _ => Err(mismatch(DataKind::Float64, &value)),
    }
}

fn to_decimal(value: Value) -> Result<Value> {
    if let Some(i) = value.as_int() {
        return Ok(Value::Decimal(Decimal::from_int(i)));
    }
    match &value {
        Value::Float64(f) => float_to_decimal(*f)
            .map(Value::Decimal)
            .ok_or_else(|| Error::out_of_range(DataKind::Decimal, value.clone())),
        Value::String(s) => parse_decimal(s.trim())
            .map(Value::Decimal)
            .ok_or_else(|| mismatch(DataKind::Decimal, &value)),
        _ => Err(mismatch(DataKind::Decimal, &value)),
    }
}

fn float_to_decimal(f: f64) -> Option<Decimal> {
    if !f.is_finite() {
        return None;
    }
    // Scale up until the fraction disappears or precision runs out.
    let mut scaled = f;
    let mut scale = 0u32;
    while !is_whole(scaled) && scale < MAX_DECIMAL_SCALE {
        scaled *= 10.0;
        scale += 1;
    }
    if scaled < i128::MIN as f64 || scaled > i128::MAX as f64 {
        return None;
    }
    Some(Decimal::new(scaled as i128, scale))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if frac_part.len() as u32 > MAX_DECIMAL_SCALE {
        return None;
    }
    let (negative, digits) = match int_part.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, int_part.strip_prefix('+').unwrap_or(int_part)),
    };
    if digits.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut mantissa: i128 = 0;
    for c in digits.chars().chain(frac_part.chars()) {
        let d = c.to_digit(10)? as i128;
        mantissa = mantissa.checked_mul(10)?.checked_add(d)?;
    }
    if negative {
        mantissa = -mantissa;
    }
    Some(Decimal::new(mantissa, frac_part.len() as u32))
}

fn to_char(value: Value) -> Result<Value> {
    match &value {
        Value::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(mismatch(DataKind::Char, &value)),
            }
        }
        _ => Err(mismatch(DataKind::Char, &value)),
    }
}

fn to_datetime(value: Value) -> Result<Value> {
    if let Some(i) = value.as_int() {
        return Ok(Value::DateTime(i));
    }
    match &value {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::DateTime)
            .map_err(|_| mismatch(DataKind::DateTime, &value)),
        _ => Err(mismatch(DataKind::DateTime, &value)),
    }
}

/// Returns true when a stored value of kind `source` can potentially be
/// carried over to a column of kind `target` (used by schema merge).
pub fn is_coercible(source: DataKind, target: DataKind) -> bool {
    if source == target {
        return true;
    }
    match target {
        DataKind::Bool => source.is_integer() || source == DataKind::String,
        DataKind::Int8 | DataKind::Int16 | DataKind::Int32 | DataKind::Int64 => {
            source.is_numeric()
                || matches!(source, DataKind::Bool | DataKind::String | DataKind::DateTime)
        }
        DataKind::Float64 | DataKind::Decimal => {
            source.is_numeric() || source == DataKind::String
        }
        DataKind::Char => source == DataKind::String,
        DataKind::String => source != DataKind::Bytes,
        DataKind::DateTime => source.is_integer() || source == DataKind::String,
        DataKind::Bytes => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_null_coerces_to_anything() {
        assert_eq!(coerce(Value::Null, DataKind::Int32).unwrap(), Value::Null);
        assert_eq!(coerce(Value::Null, DataKind::Bytes).unwrap(), Value::Null);
    }

    #[test]
    fn test_same_kind_passthrough() {
        assert_eq!(
            coerce(Value::Int32(7), DataKind::Int32).unwrap(),
            Value::Int32(7)
        );
    }

    #[test]
    fn test_integer_widening_and_narrowing() {
        assert_eq!(
            coerce(Value::Int8(5), DataKind::Int64).unwrap(),
            Value::Int64(5)
        );
        assert_eq!(
            coerce(Value::Int64(127), DataKind::Int8).unwrap(),
            Value::Int8(127)
        );
        assert!(matches!(
            coerce(Value::Int64(128), DataKind::Int8),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_float_to_integer() {
        assert_eq!(
            coerce(Value::Float64(3.0), DataKind::Int32).unwrap(),
            Value::Int32(3)
        );
        assert!(coerce(Value::Float64(3.5), DataKind::Int32).is_err());
        assert!(coerce(Value::Float64(f64::NAN), DataKind::Int32).is_err());
        // Whole values beyond 2^53 convert; i64 range still applies
        assert_eq!(
            coerce(Value::Float64(9007199254740992.0), DataKind::Int64).unwrap(),
            Value::Int64(9007199254740992)
        );
        assert!(coerce(Value::Float64(2.0e19), DataKind::Int64).is_err());
    }

    #[test]
    fn test_string_parsing() {
        assert_eq!(
            coerce(Value::String("42".into()), DataKind::Int32).unwrap(),
            Value::Int32(42)
        );
        assert_eq!(
            coerce(Value::String(" -1.5 ".into()), DataKind::Float64).unwrap(),
            Value::Float64(-1.5)
        );
        assert_eq!(
            coerce(Value::String("true".into()), DataKind::Bool).unwrap(),
            Value::Bool(true)
        );
        assert!(coerce(Value::String("abc".into()), DataKind::Int32).is_err());
    }

    #[test]
    fn test_to_string_renders() {
        assert_eq!(
            coerce(Value::Int32(42), DataKind::String).unwrap(),
            Value::String("42".into())
        );
        assert_eq!(
            coerce(Value::Bool(false), DataKind::String).unwrap(),
            Value::String("false".into())
        );
    }

    #[test]
    fn test_decimal_conversions() {
        assert_eq!(
            coerce(Value::String("12.50".into()), DataKind::Decimal).unwrap(),
            Value::Decimal(Decimal::new(125, 1))
        );
        assert_eq!(
            coerce(Value::Int32(3), DataKind::Decimal).unwrap(),
            Value::Decimal(Decimal::from_int(3))
        );
        assert_eq!(
            coerce(Value::Decimal(Decimal::new(25, 1)), DataKind::Float64).unwrap(),
            Value::Float64(2.5)
        );
    }

    #[test]
    fn test_char_string() {
        assert_eq!(
            coerce(Value::String("x".into()), DataKind::Char).unwrap(),
            Value::Char('x')
        );
        assert!(coerce(Value::String("xy".into()), DataKind::Char).is_err());
        assert_eq!(
            coerce(Value::Char('x'), DataKind::String).unwrap(),
            Value::String("x".into())
        );
    }

    #[test]
    fn test_bytes_is_closed() {
        assert!(coerce(Value::String("ab".into()), DataKind::Bytes).is_err());
        assert!(coerce(Value::Bytes(vec![1]), DataKind::String).is_err());
        assert!(!is_coercible(DataKind::Bytes, DataKind::String));
        assert!(!is_coercible(DataKind::String, DataKind::Bytes));
    }

    #[test]
    fn test_is_coercible_matches_coerce() {
        assert!(is_coercible(DataKind::Int8, DataKind::Int64));
        assert!(is_coercible(DataKind::String, DataKind::Float64));
        assert!(!is_coercible(DataKind::Bool, DataKind::Char));
    }
}
