//! Column definitions and typed per-record storage.

use crate::expr::RowExpr;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use rowset_core::{coerce, DataKind, Error, RecordId, Result, Value};

/// Auto-increment rule: seed, step, and the live counter.
#[derive(Clone, Copy, Debug)]
pub struct AutoIncrement {
    pub seed: i64,
    pub step: i64,
    next: i64,
}

impl AutoIncrement {
    pub fn new(seed: i64, step: i64) -> Self {
        Self {
            seed,
            step,
            next: seed,
        }
    }

    /// Returns the next value and advances the counter.
    pub fn take(&mut self) -> i64 {
        let v = self.next;
        self.next += self.step;
        v
    }

    /// Advances the counter past an explicitly assigned value, so imported
    /// keys never collide with generated ones. Direction follows the step.
    pub fn observe(&mut self, value: i64) {
        let beyond = if self.step >= 0 {
            value >= self.next
        } else {
            value <= self.next
        };
        if beyond {
            self.next = value + self.step;
        }
    }
}

/// A column definition.
///
/// Names are unique per table case-insensitively; ordinals are assigned by
/// the table and stay dense.
#[derive(Clone)]
pub struct ColumnDef {
    pub name: String,
    pub kind: DataKind,
    pub nullable: bool,
    pub default: Value,
    pub unique: bool,
    pub read_only: bool,
    pub max_length: Option<usize>,
    pub auto_increment: Option<AutoIncrement>,
    pub computed: Option<Rc<dyn RowExpr>>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            default: Value::Null,
            unique: false,
            read_only: false,
            max_length: None,
            auto_increment: None,
            computed: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn auto_increment(mut self, seed: i64, step: i64) -> Self {
        self.auto_increment = Some(AutoIncrement::new(seed, step));
        self
    }

    /// Marks the column computed. Computed columns are read-only to callers
    /// and re-evaluated by the engine when a row commits.
    pub fn computed(mut self, expr: Rc<dyn RowExpr>) -> Self {
        self.computed = Some(expr);
        self.read_only = true;
        self
    }
}

impl core::fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ColumnDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("default", &self.default)
            .field("unique", &self.unique)
            .field("read_only", &self.read_only)
            .field("max_length", &self.max_length)
            .field("computed", &self.computed.is_some())
            .finish()
    }
}

/// A column definition plus its per-record value vector.
#[derive(Clone, Debug)]
pub struct ColumnData {
    pub def: ColumnDef,
    values: Vec<Value>,
}

impl ColumnData {
    pub fn new(def: ColumnDef) -> Self {
        Self {
            def,
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn kind(&self) -> DataKind {
        self.def.kind
    }

    /// Grows the value vector to cover `capacity` record slots.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if self.values.len() < capacity {
            self.values.resize(capacity, self.def.default.clone());
        }
    }

    /// Reinitializes a recycled slot to the column default.
    pub fn reset_record(&mut self, record: RecordId) {
        self.values[record] = self.def.default.clone();
    }

    pub fn get(&self, record: RecordId) -> &Value {
        &self.values[record]
    }

    /// Coerces and bounds-checks a value for this column, without storing.
    pub fn check(&self, value: Value) -> Result<Value> {
        let value = coerce(value, self.def.kind)?;
        if let Some(max) = self.def.max_length {
            let actual = match &value {
                Value::String(s) => Some(s.chars().count()),
                Value::Bytes(b) => Some(b.len()),
                _ => None,
            };
            if let Some(actual) = actual {
                if actual > max {
                    return Err(Error::max_length_exceeded(&self.def.name, max, actual));
                }
            }
        }
        Ok(value)
    }

    /// Stores a checked value. Callers go through `check` first.
    pub fn store(&mut self, record: RecordId, value: Value) {
        self.values[record] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_auto_increment_take() {
        let mut ai = AutoIncrement::new(1, 2);
        assert_eq!(ai.take(), 1);
        assert_eq!(ai.take(), 3);
        assert_eq!(ai.take(), 5);
    }

    #[test]
    fn test_auto_increment_observe() {
        let mut ai = AutoIncrement::new(1, 1);
        ai.observe(10);
        assert_eq!(ai.take(), 11);
        // Values behind the counter do not move it
        ai.observe(3);
        assert_eq!(ai.take(), 12);
    }

    #[test]
    fn test_auto_increment_negative_step() {
        let mut ai = AutoIncrement::new(0, -1);
        assert_eq!(ai.take(), 0);
        ai.observe(-10);
        assert_eq!(ai.take(), -11);
    }

    #[test]
    fn test_check_coerces() {
        let col = ColumnData::new(ColumnDef::new("n", DataKind::Int64));
        assert_eq!(col.check(Value::Int8(5)).unwrap(), Value::Int64(5));
        assert!(col.check(Value::Bytes(vec![1])).is_err());
    }

    #[test]
    fn test_check_max_length() {
        let col = ColumnData::new(ColumnDef::new("s", DataKind::String).max_length(3));
        assert!(col.check(Value::String("abc".into())).is_ok());
        assert!(matches!(
            col.check(Value::String("abcd".into())),
            Err(Error::MaxLengthExceeded { .. })
        ));
    }

    #[test]
    fn test_capacity_and_defaults() {
        let def = ColumnDef::new("q", DataKind::Int32).default_value(Value::Int32(7));
        let mut col = ColumnData::new(def);
        col.ensure_capacity(3);
        assert_eq!(col.get(2), &Value::Int32(7));
        col.store(2, Value::Int32(9));
        assert_eq!(col.get(2), &Value::Int32(9));
        col.reset_record(2);
        assert_eq!(col.get(2), &Value::Int32(7));
    }
}
