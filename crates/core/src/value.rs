//! Value type definitions for the rowset engine.
//!
//! This module defines the `Value` enum which represents any value that can
//! be stored in a table cell, plus the fixed-point `Decimal` type.
//!
//! `Null` is an ordinary enum case, not an identity-compared sentinel: two
//! nulls are always equal and nulls sort before every other value.

use crate::types::DataKind;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

/// A fixed-point decimal: `mantissa * 10^-scale`.
///
/// Values are normalized on construction (trailing zeros stripped from the
/// mantissa), so structural equality matches numeric equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

/// Maximum supported decimal scale.
pub const MAX_DECIMAL_SCALE: u32 = 28;

impl Decimal {
    /// Creates a decimal from a mantissa and scale, normalizing the result.
    pub fn new(mantissa: i128, scale: u32) -> Self {
        let mut mantissa = mantissa;
        let mut scale = scale.min(MAX_DECIMAL_SCALE);
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        Self { mantissa, scale }
    }

    /// Creates a decimal from an integer.
    pub fn from_int(v: i64) -> Self {
        Self::new(v as i128, 0)
    }

    /// Returns the mantissa.
    #[inline]
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Returns the scale.
    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Returns the closest f64 representation.
    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / pow10_f64(self.scale)
    }

    /// Returns the integer part if the decimal has no fractional digits.
    pub fn to_int(&self) -> Option<i64> {
        if self.scale == 0 {
            i64::try_from(self.mantissa).ok()
        } else {
            None
        }
    }
}

fn pow10_f64(scale: u32) -> f64 {
    let mut r = 1.0f64;
    for _ in 0..scale {
        r *= 10.0;
    }
    r
}

fn pow10_i128(scale: u32) -> Option<i128> {
    10i128.checked_pow(scale)
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        // Rescale both mantissas to the larger scale; fall back to float
        // comparison if the widening multiply would overflow.
        let widen = |d: &Decimal, to: u32| -> Option<i128> {
            pow10_i128(to - d.scale).and_then(|p| d.mantissa.checked_mul(p))
        };
        let scale = self.scale.max(other.scale);
        match (widen(self, scale), widen(other, scale)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }
}

/// A value that can be stored in a table cell.
#[derive(Clone, Debug)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// Fixed-point decimal
    Decimal(Decimal),
    /// Single character
    Char(char),
    /// UTF-8 string
    String(String),
    /// DateTime stored as Unix timestamp in milliseconds
    DateTime(i64),
    /// Binary data
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the data kind of this value, or None if it's Null.
    pub fn kind(&self) -> Option<DataKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataKind::Bool),
            Value::Int8(_) => Some(DataKind::Int8),
            Value::Int16(_) => Some(DataKind::Int16),
            Value::Int32(_) => Some(DataKind::Int32),
            Value::Int64(_) => Some(DataKind::Int64),
            Value::Float64(_) => Some(DataKind::Float64),
            Value::Decimal(_) => Some(DataKind::Decimal),
            Value::Char(_) => Some(DataKind::Char),
            Value::String(_) => Some(DataKind::String),
            Value::DateTime(_) => Some(DataKind::DateTime),
            Value::Bytes(_) => Some(DataKind::Bytes),
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a Bool, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value widened to i64 if this is any integer width.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the f64 value if this is a Float64, None otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the decimal if this is a Decimal, None otherwise.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the datetime timestamp if this is a DateTime, None otherwise.
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the bytes if this is Bytes, None otherwise.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Creates a non-null default value for the given data kind.
    pub fn default_for_kind(kind: DataKind) -> Self {
        match kind {
            DataKind::Bool => Value::Bool(false),
            DataKind::Int8 => Value::Int8(0),
            DataKind::Int16 => Value::Int16(0),
            DataKind::Int32 => Value::Int32(0),
            DataKind::Int64 => Value::Int64(0),
            DataKind::Float64 => Value::Float64(0.0),
            DataKind::Decimal => Value::Decimal(Decimal::from_int(0)),
            DataKind::Char => Value::Char('\0'),
            DataKind::String => Value::String(String::new()),
            DataKind::DateTime => Value::DateTime(0),
            DataKind::Bytes => Value::Null,
        }
    }

    /// Renders this value as a string (used by string coercion).
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) => {
                let mut s = String::new();
                core::fmt::write(&mut s, format_args!("{}", v)).ok();
                s
            }
            Value::Decimal(d) => {
                let mut s = String::new();
                if d.scale() == 0 {
                    core::fmt::write(&mut s, format_args!("{}", d.mantissa())).ok();
                } else {
                    let sign = if d.mantissa() < 0 { "-" } else { "" };
                    let abs = d.mantissa().unsigned_abs();
                    let div = 10u128.pow(d.scale());
                    core::fmt::write(
                        &mut s,
                        format_args!(
                            "{}{}.{:0width$}",
                            sign,
                            abs / div,
                            abs % div,
                            width = d.scale() as usize
                        ),
                    )
                    .ok();
                }
                s
            }
            Value::Char(c) => c.to_string(),
            Value::String(v) => v.clone(),
            Value::DateTime(v) => v.to_string(),
            Value::Bytes(_) => String::new(),
        }
    }

    fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int8(_) => 2,
            Value::Int16(_) => 3,
            Value::Int32(_) => 4,
            Value::Int64(_) => 5,
            Value::Float64(_) => 6,
            Value::Decimal(_) => 7,
            Value::Char(_) => 8,
            Value::String(_) => 9,
            Value::DateTime(_) => 10,
            Value::Bytes(_) => 11,
        }
    }
}

/// Compares two strings case-insensitively (per-char simple lowercasing).
pub fn cmp_str_ci(a: &str, b: &str) -> Ordering {
    let la = a.chars().flat_map(char::to_lowercase);
    let lb = b.chars().flat_map(char::to_lowercase);
    la.cmp(lb)
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    // NaN sorts after every other float.
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Compares two values with nulls-first total ordering.
///
/// `case_insensitive` controls string and char comparison; all integer
/// widths compare numerically against each other, floats, and decimals.
pub fn compare_values(a: &Value, b: &Value, case_insensitive: bool) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Float64(x), Value::Float64(y)) => cmp_f64(*x, *y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::Char(x), Value::Char(y)) => {
            if case_insensitive {
                cmp_str_ci(x.encode_utf8(&mut [0u8; 4]), y.encode_utf8(&mut [0u8; 4]))
            } else {
                x.cmp(y)
            }
        }
        (Value::String(x), Value::String(y)) => {
            if case_insensitive {
                cmp_str_ci(x, y)
            } else {
                x.cmp(y)
            }
        }
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ => {
            // Cross-kind numeric comparisons.
            if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
                return x.cmp(&y);
            }
            match (numeric_f64(a), numeric_f64(b)) {
                (Some(x), Some(y)) => cmp_f64(x, y),
                _ => a.type_order().cmp(&b.type_order()),
            }
        }
    }
}

fn numeric_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int8(x) => Some(*x as f64),
        Value::Int16(x) => Some(*x as f64),
        Value::Int32(x) => Some(*x as f64),
        Value::Int64(x) => Some(*x as f64),
        Value::Float64(x) => Some(*x),
        Value::Decimal(x) => Some(x.to_f64()),
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        compare_values(self, other, false) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_values(self, other, false)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Integer widths hash as their widened value so that cross-width
        // equality stays consistent with hashing.
        if let Some(i) = self.as_int() {
            1u8.hash(state);
            i.hash(state);
            return;
        }
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {}
            Value::Float64(f) => f.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::Char(c) => c.hash(state),
            Value::String(s) => s.hash(state),
            Value::DateTime(d) => d.hash(state),
            Value::Bytes(b) => b.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::Int64(42).kind(), Some(DataKind::Int64));
        assert_eq!(Value::Null.kind(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int8(5).as_int(), Some(5));
        assert_eq!(Value::Int64(100).as_int(), Some(100));
        assert_eq!(Value::Float64(3.5).as_f64(), Some(3.5));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::DateTime(1234567890).as_datetime(), Some(1234567890));
        assert_eq!(Value::Bytes(vec![1, 2]).as_bytes(), Some(&[1, 2][..]));
    }

    #[test]
    fn test_value_equality_across_widths() {
        assert_eq!(Value::Int8(42), Value::Int64(42));
        assert_eq!(Value::Int16(-1), Value::Int32(-1));
        assert_ne!(Value::Int32(42), Value::Int32(43));
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Int32(1) < Value::Int32(2));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        assert!(Value::Null < Value::Int32(i32::MIN));
        assert!(Value::Null < Value::String(String::new()));
    }

    #[test]
    fn test_case_insensitive_compare() {
        let a = Value::String("Alice".into());
        let b = Value::String("alice".into());
        assert_ne!(compare_values(&a, &b, false), Ordering::Equal);
        assert_eq!(compare_values(&a, &b, true), Ordering::Equal);

        let c = Value::Char('A');
        let d = Value::Char('a');
        assert_eq!(compare_values(&c, &d, true), Ordering::Equal);
    }

    #[test]
    fn test_decimal_normalization() {
        assert_eq!(Decimal::new(100, 2), Decimal::new(1, 0));
        assert_eq!(Decimal::new(1500, 3), Decimal::new(15, 1));
        assert_eq!(Decimal::new(1500, 3).to_f64(), 1.5);
    }

    #[test]
    fn test_decimal_ordering() {
        assert!(Decimal::new(15, 1) < Decimal::new(2, 0)); // 1.5 < 2
        assert!(Decimal::new(-1, 0) < Decimal::new(1, 2)); // -1 < 0.01
        assert_eq!(Decimal::new(25, 1).cmp(&Decimal::new(250, 2)), Ordering::Equal);
    }

    #[test]
    fn test_cross_kind_numeric_ordering() {
        assert!(Value::Int32(1) < Value::Float64(1.5));
        assert!(Value::Float64(0.5) < Value::Int64(1));
        assert!(Value::Decimal(Decimal::new(15, 1)) < Value::Int32(2));
        assert_eq!(
            compare_values(&Value::Decimal(Decimal::from_int(2)), &Value::Int8(2), false),
            Ordering::Equal
        );
    }

    #[test]
    fn test_nan_sorts_last() {
        assert!(Value::Float64(f64::NAN) > Value::Float64(1e300));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }

    #[test]
    fn test_default_for_kind() {
        assert_eq!(Value::default_for_kind(DataKind::Bool), Value::Bool(false));
        assert_eq!(Value::default_for_kind(DataKind::Int32), Value::Int32(0));
        assert_eq!(
            Value::default_for_kind(DataKind::String),
            Value::String(String::new())
        );
        assert!(Value::default_for_kind(DataKind::Bytes).is_null());
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::Int32(42).render(), "42");
        assert_eq!(Value::Bool(true).render(), "true");
        assert_eq!(Value::Decimal(Decimal::new(-1250, 2)).render(), "-12.5");
        assert_eq!(Value::Decimal(Decimal::from_int(7)).render(), "7");
    }

    #[test]
    fn test_from_impls() {
        let v: Value = 42i32.into();
        assert_eq!(v, Value::Int32(42));
        let v: Value = "hi".into();
        assert_eq!(v.as_str(), Some("hi"));
        let v: Value = None::<i64>.into();
        assert!(v.is_null());
    }
}
