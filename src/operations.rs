//! Generic, cycle-safe operations over registered types.
//!
//! All three operations dispatch through the type registry and are
//! independent of the execution engine, so handlers and hosts can use
//! them on arbitrary values without knowing the value's type.

use crate::errors::{EngineError, EngineResult};
use crate::output::Document;
use crate::types::TypeRegistry;
use crate::value::Value;

/// Recursion ceiling for equality. Past this the structures are treated
/// as malformed rather than merely unequal.
const MAX_EQUAL_DEPTH: usize = 500;

/// Inspection depth when the caller does not give one.
const DEFAULT_INSPECT_DEPTH: usize = 3;

/// Compare two values through the first registered type identifying
/// both, falling back to the root identity comparison.
///
/// Cycle policy: every in-progress comparison of two compound nodes is
/// tracked as a pair; re-entering the same pair on the same path raises
/// [`EngineError::CircularStructure`]. The pair is released on exit, so
/// shared (acyclic) substructure may be compared repeatedly.
pub fn equal(types: &TypeRegistry, a: &Value, b: &Value) -> EngineResult<bool> {
    let mut in_progress = Vec::new();
    equal_guarded(types, a, b, 0, &mut in_progress)
}

fn equal_guarded(
    types: &TypeRegistry,
    a: &Value,
    b: &Value,
    depth: usize,
    in_progress: &mut Vec<(usize, usize)>,
) -> EngineResult<bool> {
    if depth > MAX_EQUAL_DEPTH {
        return Err(EngineError::CircularStructure);
    }
    let pair = match (a.ptr_id(), b.ptr_id()) {
        (Some(left), Some(right)) => Some((left, right)),
        _ => None,
    };
    if let Some(pair) = pair {
        if in_progress.contains(&pair) {
            return Err(EngineError::CircularStructure);
        }
        in_progress.push(pair);
    }
    let descriptor = types.common(a, b);
    let result = (descriptor.equal)(a, b, &mut |left, right| {
        equal_guarded(types, left, right, depth + 1, in_progress)
    });
    if pair.is_some() {
        in_progress.pop();
    }
    result
}

/// Render a value by delegating to the resolved type's inspection.
///
/// The nested-inspection callback renders `[Circular]` when a value
/// re-appears beneath itself and `...` once `depth` is exhausted.
/// `depth` defaults to 3.
pub fn inspect(
    types: &TypeRegistry,
    prototype: &Document,
    value: &Value,
    depth: Option<usize>,
) -> Document {
    let mut seen = Vec::new();
    inspect_guarded(
        types,
        prototype.clone(),
        value,
        depth.unwrap_or(DEFAULT_INSPECT_DEPTH),
        &mut seen,
    )
}

fn inspect_guarded(
    types: &TypeRegistry,
    out: Document,
    value: &Value,
    depth: usize,
    seen: &mut Vec<usize>,
) -> Document {
    if depth == 0 {
        return out.text("...");
    }
    if let Some(id) = value.ptr_id() {
        if seen.contains(&id) {
            return out.text("[Circular]");
        }
    }
    let descriptor = types.resolve(value);
    let parent = value.ptr_id();
    (descriptor.inspect)(
        out,
        value,
        &mut |nested_out, nested_value| {
            if let Some(id) = parent {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
            inspect_guarded(types, nested_out, nested_value, depth - 1, seen)
        },
        depth,
    )
}

/// Project a value to plain JSON for snapshotting and diffing.
///
/// Record keys come out sorted so output is deterministic regardless of
/// insertion order. Same-reference reentry renders the string
/// `"[Circular]"` (a JSON tree cannot hold the original reference).
pub fn sanitize(types: &TypeRegistry, value: &Value) -> serde_json::Value {
    let mut stack = Vec::new();
    sanitize_guarded(types, value, &mut stack)
}

fn sanitize_guarded(
    types: &TypeRegistry,
    value: &Value,
    stack: &mut Vec<usize>,
) -> serde_json::Value {
    if let Some(id) = value.ptr_id() {
        if stack.contains(&id) {
            return serde_json::Value::String("[Circular]".to_string());
        }
        stack.push(id);
    }
    let descriptor = types.resolve(value);
    let sanitized = (descriptor.to_json)(value, &mut |nested| {
        sanitize_guarded(types, nested, stack)
    });
    if value.ptr_id().is_some() {
        stack.pop();
    }
    sanitized
}
