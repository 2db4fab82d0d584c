// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deep attribute merge for markup-like components.

use alloc::format;
use alloc::vec::Vec;

use crate::value::{Callback, Key, Tree, Value};

/// Attributes concatenated with a space when both layers set them.
const CONCAT_KEYS: [&str; 2] = ["className", "class"];

/// Attribute shallow-merged when both layers set it to a map.
const STYLE_KEY: &str = "style";

/// Merges two attribute sets, `high` taking priority over `low`.
///
/// - Attributes `high` leaves unset (or sets to a falsy value) are taken
///   from `low`.
/// - `className`/`class` strings are joined as `"high low"`.
/// - `style` maps are shallow-merged, `high` winning per key.
/// - Two callbacks are combined into one that calls `high` then `low`.
/// - Anything else keeps the `high` value.
///
/// ```rust
/// use understory_custom::{merge_attributes, Tree, Value};
///
/// let high = Tree::new()
///     .with("className", "a")
///     .with("style", Tree::new().with("color", "red"));
/// let low = Tree::new()
///     .with("className", "b")
///     .with("style", Tree::new().with("color", "blue").with("fontSize", 1));
///
/// let merged = merge_attributes(&high, &low);
/// assert_eq!(merged.get("className"), Some(&Value::from("a b")));
/// assert_eq!(
///     merged.get("style"),
///     Some(&Value::from(Tree::new().with("color", "red").with("fontSize", 1)))
/// );
/// ```
#[must_use]
pub fn merge_attributes(high: &Tree, low: &Tree) -> Tree {
    let mut merged = high.clone();
    for (key, low_value) in low.iter() {
        let Some(high_value) = high.get(key).filter(|v| is_truthy(v)) else {
            merged.set(key.clone(), low_value.clone());
            continue;
        };
        let combined = match (high_value, low_value) {
            (Value::Str(a), Value::Str(b)) if CONCAT_KEYS.contains(&&**key) => {
                Some(Value::from(format!("{a} {b}")))
            }
            (Value::Tree(a), Value::Tree(b)) if &**key == STYLE_KEY => {
                Some(Value::Tree(shallow_merge(a, b)))
            }
            (Value::Callback(a), Value::Callback(b)) => Some(Value::Callback(chain(a, b))),
            _ => None,
        };
        if let Some(combined) = combined {
            merged.set(key.clone(), combined);
        }
    }
    merged
}

fn shallow_merge(high: &Tree, low: &Tree) -> Tree {
    let mut merged = low.clone();
    for (key, value) in high.iter() {
        merged.set(key.clone(), value.clone());
    }
    merged
}

fn chain(first: &Callback, second: &Callback) -> Callback {
    let (first, second) = (first.clone(), second.clone());
    Callback::new(move |args| {
        first.call(args);
        second.call(args);
        Value::Undefined
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
        _ => true,
    }
}

/// Removes `keys` from `props`, returning the original when none is present.
pub(crate) fn strip_keys(props: &Tree, keys: &[Key]) -> Tree {
    let present: Vec<_> = keys.iter().filter(|k| props.contains_key(k)).collect();
    if present.is_empty() {
        return props.clone();
    }
    let mut stripped = props.clone();
    for key in present {
        stripped.remove(key);
    }
    stripped
}
