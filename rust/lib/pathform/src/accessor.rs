//! get / set / unset on an arbitrary `serde_json::Value` tree.
//!
//! Objects are the mapping container, arrays the sequence container.
//! `set` creates whatever intermediate containers are missing and walks
//! through existing ones in place, so sibling subtrees are never rebuilt.
//!
//! An index segment on an object addresses the key spelled as that decimal
//! number. The value is shared, but `items.0` and `items.\0` stay distinct
//! dot-paths, so metadata and watchers registered under one are not seen
//! under the other.

use serde_json::{Map, Value};

use crate::error::FormError;
use crate::path::{Path, Segment};

/// How many `null`s a single write may pad an array with.
pub const MAX_INDEX_GAP: usize = 1024;

/// Read the value at `path`. Missing intermediates yield `None`.
pub fn get<'a>(tree: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut node = tree;
    for segment in path.segments() {
        node = match (node, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get(key)?,
            (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string())?,
            (Value::Array(items), Segment::Index(index)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Mutable counterpart of [`get`].
pub fn get_mut<'a>(tree: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut node = tree;
    for segment in path.segments() {
        node = match (node, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get_mut(key)?,
            (Value::Object(map), Segment::Index(index)) => map.get_mut(&index.to_string())?,
            (Value::Array(items), Segment::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Write `value` at `path`, creating containers on the way.
///
/// A missing or `null` slot becomes an object when the next segment is a
/// key and an array when it is an index; arrays are padded with `null`, by
/// at most [`MAX_INDEX_GAP`] elements. Walking through a primitive (or
/// through an array with a key) fails with [`FormError::NotAContainer`], and
/// an index too far past the end with [`FormError::IndexOutOfRange`], before
/// anything is modified.
pub fn set(tree: &mut Value, path: &Path, value: Value) -> Result<(), FormError> {
    check_writable(tree, path)?;

    let mut node = tree;
    for (depth, segment) in path.segments().iter().enumerate() {
        if node.is_null() {
            *node = empty_container(segment);
        }
        node = match (node, segment) {
            (Value::Object(map), Segment::Key(key)) => {
                map.entry(key.clone()).or_insert(Value::Null)
            }
            (Value::Object(map), Segment::Index(index)) => {
                map.entry(index.to_string()).or_insert(Value::Null)
            }
            (Value::Array(items), Segment::Index(index)) => {
                if items.len() <= *index {
                    let len = index
                        .checked_add(1)
                        .ok_or_else(|| out_of_range(path, *index))?;
                    items.resize(len, Value::Null);
                }
                &mut items[*index]
            }
            _ => {
                return Err(FormError::NotAContainer {
                    path: path.to_dot_path(),
                    at: Path::from(path.segments()[..depth].to_vec()).to_dot_path(),
                });
            }
        };
    }
    *node = value;
    Ok(())
}

/// Remove the leaf at `path`, returning what was there.
///
/// Object keys are removed; array elements are replaced by `null` so the
/// indices of siblings stay stable. Emptied ancestors are kept.
pub fn unset(tree: &mut Value, path: &Path) -> Option<Value> {
    let (last, parent) = match path.segments().split_last() {
        Some((last, rest)) => (last, Path::from(rest.to_vec())),
        None => return Some(std::mem::replace(tree, Value::Null)),
    };

    match (get_mut(tree, &parent)?, last) {
        (Value::Object(map), Segment::Key(key)) => map.remove(key),
        (Value::Object(map), Segment::Index(index)) => map.remove(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items
            .get_mut(*index)
            .map(|slot| std::mem::replace(slot, Value::Null)),
        _ => None,
    }
}

fn empty_container(next: &Segment) -> Value {
    match next {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

/// Walk `path` and make sure every node the write would pass through can
/// hold the next segment, and that no array would be over-padded.
fn check_writable(tree: &Value, path: &Path) -> Result<(), FormError> {
    let segments = path.segments();
    let mut node = Some(tree);
    for (depth, segment) in segments.iter().enumerate() {
        node = match (node, segment) {
            (None | Some(Value::Null), Segment::Key(_)) => None,
            (None | Some(Value::Null), Segment::Index(index)) => {
                check_gap(path, *index, 0)?;
                None
            }
            (Some(Value::Object(map)), Segment::Key(key)) => map.get(key),
            (Some(Value::Object(map)), Segment::Index(index)) => map.get(&index.to_string()),
            (Some(Value::Array(items)), Segment::Index(index)) => {
                check_gap(path, *index, items.len())?;
                items.get(*index)
            }
            _ => {
                return Err(FormError::NotAContainer {
                    path: path.to_dot_path(),
                    at: Path::from(segments[..depth].to_vec()).to_dot_path(),
                });
            }
        };
    }
    Ok(())
}

fn check_gap(path: &Path, index: usize, len: usize) -> Result<(), FormError> {
    if index > len.saturating_add(MAX_INDEX_GAP) {
        return Err(out_of_range(path, index));
    }
    Ok(())
}

fn out_of_range(path: &Path, index: usize) -> FormError {
    FormError::IndexOutOfRange {
        path: path.to_dot_path(),
        index,
    }
}
