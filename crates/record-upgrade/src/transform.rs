//! Building blocks for step bodies.
//!
//! Every helper checks for presence before touching a field, so a step built
//! from them is total over records that simply lack optional fields. Helpers
//! that can meet a field of the wrong kind return [`StepError`] instead of
//! guessing.

use serde_json::Value;

use crate::error::StepError;
use crate::record::{kind_of, Record};

/// Move the value at `from` to `to`. Returns whether anything moved.
///
/// An existing value at `to` is overwritten.
pub fn rename_field(rec: &mut Record, from: &str, to: &str) -> bool {
    match rec.remove(from) {
        Some(value) => {
            rec.insert(to.to_string(), value);
            true
        }
        None => false,
    }
}

/// Drop a field unconditionally.
pub fn remove_field(rec: &mut Record, key: &str) -> Option<Value> {
    rec.remove(key)
}

/// Drop a field whose value is an empty array.
pub fn remove_if_empty(rec: &mut Record, key: &str) -> bool {
    if matches!(rec.get(key), Some(Value::Array(items)) if items.is_empty()) {
        rec.remove(key);
        true
    } else {
        false
    }
}

/// Drop a field whose value is the empty string.
pub fn remove_if_blank(rec: &mut Record, key: &str) -> bool {
    if matches!(rec.get(key), Some(Value::String(s)) if s.is_empty()) {
        rec.remove(key);
        true
    } else {
        false
    }
}

/// Set `key` to `value` when it is absent. Returns whether it was set.
pub fn ensure_default(rec: &mut Record, key: &str, value: Value) -> bool {
    if rec.contains_key(key) {
        return false;
    }
    rec.insert(key.to_string(), value);
    true
}

/// Make sure `key` holds an array, replacing an absent or non-array value
/// with `[]`.
pub fn ensure_array(rec: &mut Record, key: &str) -> bool {
    if matches!(rec.get(key), Some(Value::Array(_))) {
        return false;
    }
    rec.insert(key.to_string(), Value::Array(Vec::new()));
    true
}

/// Replace a boolean with one of two words, and `null` with `null_default`.
///
/// Strings are assumed to be converted already and are left alone.
pub fn coerce_bool_to_str(
    rec: &mut Record,
    key: &str,
    true_word: &str,
    false_word: &str,
    null_default: &str,
) -> bool {
    let word = match rec.get(key) {
        Some(Value::Bool(true)) => true_word,
        Some(Value::Bool(false)) => false_word,
        Some(Value::Null) => null_default,
        _ => return false,
    };
    rec.insert(key.to_string(), Value::String(word.to_string()));
    true
}

/// Replace a number with its decimal text, and `null` with `null_default`.
pub fn coerce_number_to_str(rec: &mut Record, key: &str, null_default: &str) -> bool {
    let text = match rec.get(key) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) => null_default.to_string(),
        _ => return false,
    };
    rec.insert(key.to_string(), Value::String(text));
    true
}

/// Vocabulary remapping through an explicit lookup table.
///
/// For a value `x`:
/// 1. `x` already in `vocabulary` → unchanged,
/// 2. `x` a key of `table` → the mapped value,
/// 3. otherwise → `fallback`, or unchanged when the target vocabulary is open
///    (`fallback` is `None`).
///
/// # Example
///
/// ```
/// use record_upgrade::transform::EnumRemap;
///
/// const REMAP: EnumRemap = EnumRemap::new(&[("A", "X"), ("B", "Y")])
///     .vocabulary(&["X", "Y"])
///     .fallback("unspecified");
///
/// assert_eq!(REMAP.remap("A"), "X");
/// assert_eq!(REMAP.remap("X"), "X");
/// assert_eq!(REMAP.remap("C"), "unspecified");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EnumRemap {
    table: &'static [(&'static str, &'static str)],
    vocabulary: &'static [&'static str],
    fallback: Option<&'static str>,
    case_insensitive: bool,
}

impl EnumRemap {
    /// A remap with an open target vocabulary and case-sensitive keys.
    pub const fn new(table: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            table,
            vocabulary: &[],
            fallback: None,
            case_insensitive: false,
        }
    }

    /// Values that are already valid and must be kept as they are.
    pub const fn vocabulary(mut self, vocabulary: &'static [&'static str]) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Value for anything outside both the table and the vocabulary.
    pub const fn fallback(mut self, fallback: &'static str) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Match table keys ignoring ASCII case.
    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Map one value.
    pub fn remap<'v>(&self, value: &'v str) -> &'v str {
        if self.vocabulary.contains(&value) {
            return value;
        }
        let mapped = self.table.iter().find(|(old, _)| {
            if self.case_insensitive {
                old.eq_ignore_ascii_case(value)
            } else {
                *old == value
            }
        });
        match (mapped, self.fallback) {
            (Some((_, new)), _) => *new,
            (None, Some(fallback)) => fallback,
            (None, None) => value,
        }
    }

    fn remap_value(&self, field: &str, value: &Value) -> Result<Option<String>, StepError> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Null => String::new(),
            other => {
                return Err(StepError::UnexpectedType {
                    field: field.to_string(),
                    expected: "string",
                    found: kind_of(other),
                })
            }
        };
        let mapped = self.remap(&text);
        if mapped == text {
            Ok(None)
        } else {
            Ok(Some(mapped.to_string()))
        }
    }
}

/// Remap the scalar at `key`. Returns whether it changed.
///
/// Booleans, numbers and `null` are matched by their text (`null` as `""`)
/// and are only replaced when that text maps to something else.
pub fn remap_field(rec: &mut Record, key: &str, remap: &EnumRemap) -> Result<bool, StepError> {
    let Some(value) = rec.get(key) else {
        return Ok(false);
    };
    match remap.remap_value(key, value)? {
        Some(mapped) => {
            rec.insert(key.to_string(), Value::String(mapped));
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Remap every item of the array at `key`. Returns whether any item changed.
pub fn remap_array(rec: &mut Record, key: &str, remap: &EnumRemap) -> Result<bool, StepError> {
    let items = match rec.get_mut(key) {
        None => return Ok(false),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(StepError::UnexpectedType {
                field: key.to_string(),
                expected: "array",
                found: kind_of(other),
            })
        }
    };
    let mut changed = false;
    for item in items.iter_mut() {
        if let Some(mapped) = remap.remap_value(key, item)? {
            *item = Value::String(mapped);
            changed = true;
        }
    }
    Ok(changed)
}

/// Turn an array of scalars at `from` into an array of richer values at `to`.
///
/// Scalars go through `wrap`; items that are already objects or arrays are
/// kept. `from` is removed when it differs from `to`.
pub fn wrap_scalars<F>(rec: &mut Record, from: &str, to: &str, wrap: F) -> Result<bool, StepError>
where
    F: Fn(Value) -> Value,
{
    let Some(value) = rec.remove(from) else {
        return Ok(false);
    };
    let items = match value {
        Value::Array(items) => items,
        other => {
            let found = kind_of(&other);
            rec.insert(from.to_string(), other);
            return Err(StepError::UnexpectedType {
                field: from.to_string(),
                expected: "array",
                found,
            });
        }
    };
    let wrapped = items
        .into_iter()
        .map(|item| match item {
            Value::Object(_) | Value::Array(_) => item,
            scalar => wrap(scalar),
        })
        .collect();
    rec.insert(to.to_string(), Value::Array(wrapped));
    Ok(true)
}

/// Append a human-readable fragment to the text field `key`.
///
/// Fragments are joined with `separator`; a blank or absent field takes the
/// fragment alone. Every call appends, so repeated items are all kept.
pub fn append_note(
    rec: &mut Record,
    key: &str,
    fragment: &str,
    separator: &str,
) -> Result<bool, StepError> {
    let existing = note_text(rec, key)?;
    if fragment.is_empty() {
        return Ok(false);
    }
    let joined = if existing.trim().is_empty() {
        fragment.to_string()
    } else {
        format!("{existing}{separator}{fragment}")
    };
    rec.insert(key.to_string(), Value::String(joined));
    Ok(true)
}

/// Like [`append_note`], but skips a fragment the text already holds as a
/// whole `separator`-delimited piece, so re-running a derivation is harmless.
pub fn append_note_once(
    rec: &mut Record,
    key: &str,
    fragment: &str,
    separator: &str,
) -> Result<bool, StepError> {
    let existing = note_text(rec, key)?;
    if existing.split(separator).any(|piece| piece == fragment) {
        return Ok(false);
    }
    append_note(rec, key, fragment, separator)
}

fn note_text<'r>(rec: &'r Record, key: &str) -> Result<&'r str, StepError> {
    match rec.get(key) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(StepError::UnexpectedType {
            field: key.to_string(),
            expected: "string",
            found: kind_of(other),
        }),
    }
}

/// Move the items of `from` (an array, or a single value) into the array at
/// `into`, skipping empty values and items already present. `from` is removed.
pub fn merge_into_array(rec: &mut Record, from: &str, into: &str) -> bool {
    let Some(source) = rec.remove(from) else {
        return false;
    };
    let incoming = match source {
        Value::Array(items) => items,
        single if is_truthy(&single) => vec![single],
        _ => Vec::new(),
    };
    ensure_array(rec, into);
    if let Some(Value::Array(target)) = rec.get_mut(into) {
        for item in incoming {
            if is_truthy(&item) && !target.contains(&item) {
                target.push(item);
            }
        }
    }
    true
}

/// Whether a value carries content: not null, false, zero or empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
