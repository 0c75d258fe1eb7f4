//! Dynamic values the engine asserts over.

use std::cell::RefCell;
use std::rc::Rc;

/// A runtime value with reference identity for compound nodes.
///
/// Sequences and records are shared and interior-mutable so callers can
/// build aliased or cyclic structures; the generic operations guard
/// against the cycles. Scalars compare by value, compounds by pointer.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Sequence(Rc<RefCell<Vec<Value>>>),
    Record(Rc<RefCell<Vec<(String, Value)>>>),
}

impl Value {
    /// Build a sequence node.
    pub fn sequence(items: Vec<Value>) -> Self {
        Value::Sequence(Rc::new(RefCell::new(items)))
    }

    /// Build a record node. Insertion order is preserved; `sanitize`
    /// is the layer that sorts keys.
    pub fn record(fields: Vec<(String, Value)>) -> Self {
        Value::Record(Rc::new(RefCell::new(fields)))
    }

    /// Strict identity: value equality for scalars, pointer equality
    /// for compound nodes.
    pub fn same(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Text(x), Value::Text(y)) => x == y,
            (Value::Sequence(x), Value::Sequence(y)) => Rc::ptr_eq(x, y),
            (Value::Record(x), Value::Record(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Address of a compound node, used by the cycle guards. Scalars
    /// have no identity.
    pub fn ptr_id(&self) -> Option<usize> {
        match self {
            Value::Sequence(rc) => Some(Rc::as_ptr(rc) as usize),
            Value::Record(rc) => Some(Rc::as_ptr(rc) as usize),
            _ => None,
        }
    }

    /// Push onto a sequence node; returns false for other variants.
    pub fn push(&self, item: Value) -> bool {
        if let Value::Sequence(items) = self {
            items.borrow_mut().push(item);
            true
        } else {
            false
        }
    }

    /// Append a record field; returns false for other variants.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> bool {
        if let Value::Record(fields) = self {
            fields.borrow_mut().push((key.into(), value));
            true
        } else {
            false
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// Raw text rendering used by the built-in type's inspection.
    pub(crate) fn raw_text(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
            Value::Sequence(_) => "[sequence]".to_string(),
            Value::Record(_) => "[record]".to_string(),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::sequence(items)
    }
}
