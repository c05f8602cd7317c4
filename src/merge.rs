//! Recursive structural merge with aliasing and cycle safety.
//!
//! [`merge`] folds a right-hand value onto a left-hand accumulator: tables
//! merge key-by-key, primitives replace wholesale. An identity-keyed map of
//! already-visited tables (live only for one top-level call) makes the walk
//! terminate on self-referential input and keeps shared substructure shared
//! in the output.
//!
//! The accumulator table is mutated in place when both operands are
//! composite. Callers that need the left operand untouched pass a fresh
//! empty table as `left`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::{new_table, Table, TableRef, Value};

/// Identity key for a table cell. Pointer comparison, never dereferenced.
type CellPtr = *const RefCell<Table>;

/// Tables already visited during one top-level merge, mapped to the table
/// each of them resolved to.
type IgnoreMap = HashMap<CellPtr, TableRef>;

/// Merge `right` onto `left` and return the result.
///
/// - `right` primitive (including `Null` and functions): replaces `left`.
/// - `right` composite, `left` not: `left` is promoted to an empty table
///   first.
/// - Both composite: for every key in `right` (in order), the merged value
///   is `merge(left[key], right[key])`, computed depth-first; keys present
///   only in `left` are preserved. `left`'s table is mutated in place and
///   returned, so existing holders of the table observe the merge.
///
/// `right` is never modified. Terminates on cyclic or diamond-shared input;
/// a table encountered twice (on either side) resolves to the same output
/// table both times.
pub fn merge(left: Value, right: Value) -> Value {
    let mut seen = IgnoreMap::new();
    merge_into(Some(left), &right, &mut seen)
}

/// Fold any number of overlays onto `first`, left to right.
pub fn merge_all(first: Value, overlays: impl IntoIterator<Item = Value>) -> Value {
    overlays.into_iter().fold(first, merge)
}

fn merge_into(left: Option<Value>, right: &Value, seen: &mut IgnoreMap) -> Value {
    // Primitives replace the accumulator wholesale.
    let Value::Table(right_table) = right else {
        return right.clone();
    };

    // An operand we have already merged resolves to its recorded result,
    // whichever side of the pair it appears on this time.
    if let Some(done) = seen.get(&Rc::as_ptr(right_table)) {
        return Value::Table(done.clone());
    }
    if let Some(Value::Table(left_table)) = &left {
        if let Some(done) = seen.get(&Rc::as_ptr(left_table)) {
            return Value::Table(done.clone());
        }
    }

    // Merge into the left table in place; promote a non-composite
    // accumulator to a fresh empty table.
    let target = match left {
        Some(Value::Table(left_table)) => left_table,
        _ => new_table(),
    };

    // Record both operands before descending: any recursive encounter with
    // either of them short-circuits to `target` instead of recursing.
    seen.insert(Rc::as_ptr(&target), target.clone());
    seen.insert(Rc::as_ptr(right_table), target.clone());

    // Snapshot the entries first: child merges may re-enter either table,
    // and holding a borrow across the recursion would panic on aliases.
    let entries: Vec<(String, Value)> = right_table
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (key, right_value) in entries {
        let left_value = target.borrow().get(&key).cloned();
        let merged = merge_into(left_value, &right_value, seen);
        target.borrow_mut().insert(key, merged);
    }

    Value::Table(target)
}
