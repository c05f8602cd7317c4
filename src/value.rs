//! Dynamic composite values: [`Value`], [`TableRef`].
//!
//! `Value` is the currency of configuration composition and of module
//! capability tables. Tables are reference-counted and interior-mutable so
//! that every holder of a table observes later insertions; the registry
//! relies on this to let imported modules "fill in" after the fact.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// The underlying mapping of a composite value. Insertion-ordered.
pub type Table = IndexMap<String, Value>;

/// Shared handle to a table. Cloning the handle aliases the same mapping.
pub type TableRef = Rc<RefCell<Table>>;

/// A dynamically-typed value: primitive, callable, or composite table.
#[derive(Clone)]
pub enum Value {
    /// Explicit null (e.g. decoded JSON `null`). Treated as a primitive.
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A shared, mutable, insertion-ordered mapping.
    Table(TableRef),
    /// A capability function. Compared by identity, not behavior.
    Func(Rc<dyn Fn(&[Value]) -> Value>),
}

impl Value {
    /// Create a fresh empty table value.
    pub fn table() -> Self {
        Value::Table(new_table())
    }

    /// Build a table value from key/value pairs.
    pub fn table_of<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let table: Table = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        Value::Table(Rc::new(RefCell::new(table)))
    }

    /// Returns the table handle if this value is composite.
    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this value is a composite table.
    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    /// Look up a key in a table value. Returns `None` for non-tables.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_table()?.borrow().get(key).cloned()
    }

    /// Walk a key path through nested tables.
    ///
    /// Returns `None` as soon as a segment is missing or the current value
    /// is not a table.
    pub fn get_path(&self, path: &[&str]) -> Option<Value> {
        let mut current = self.clone();
        for key in path {
            current = current.get(key)?;
        }
        Some(current)
    }
}

/// Create a fresh empty shared table.
pub fn new_table() -> TableRef {
    Rc::new(RefCell::new(Table::new()))
}

/// Walk a key path through nested tables, creating empty tables for any
/// missing or non-table segment, and return the deepest table.
pub fn ensure_path(root: &TableRef, path: &[&str]) -> TableRef {
    let mut current = root.clone();
    for key in path {
        let existing = current.borrow().get(*key).and_then(|v| match v {
            Value::Table(t) => Some(t.clone()),
            _ => None,
        });
        let next = match existing {
            Some(t) => t,
            None => {
                let fresh = new_table();
                current
                    .borrow_mut()
                    .insert((*key).to_owned(), Value::Table(fresh.clone()));
                fresh
            }
        };
        current = next;
    }
    current
}

/// Return the first present value, like a chain of `or_else` lookups.
pub fn first_defined(values: impl IntoIterator<Item = Option<Value>>) -> Option<Value> {
    values.into_iter().flatten().next()
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Table(t) => {
                // Recurses into the table. Do not Debug-print cyclic values.
                write!(f, "Table(")?;
                f.debug_map().entries(t.borrow().iter()).finish()?;
                write!(f, ")")
            }
            Value::Func(_) => write!(f, "Func(<fn>)"),
        }
    }
}

/// Deep structural equality. Tables compare by contents (not identity),
/// functions by identity. Not cycle-safe: do not compare cyclic tables.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v == w))
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<TableRef> for Value {
    fn from(t: TableRef) -> Self {
        Value::Table(t)
    }
}

impl From<serde_json::Value> for Value {
    /// Decode a JSON document into a value tree.
    ///
    /// Arrays become tables keyed by decimal index ("0", "1", ...) so that
    /// the merge engine can recurse into them like any other composite.
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                n.as_f64().map(Value::Number).unwrap_or(Value::Null)
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::table_of(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), Value::from(v))),
            ),
            serde_json::Value::Object(map) => {
                Value::table_of(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}
