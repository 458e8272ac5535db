use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::accessor;
use crate::error::FormError;
use crate::item::{ErrorMap, FieldMeta, StoreItem};
use crate::path::Path;

/// The form document plus per-field metadata.
///
/// Values live in one nested JSON document so that custom rules see plain
/// data (`store["someToggle"]`). Metadata sits beside it in a table keyed by
/// dot-path; a [`StoreItem`] is the pair of both at one path.
///
/// A value exists at a path only after it has been written (initial values
/// count as written). Metadata can exist before the value does.
#[derive(Debug, Clone)]
pub struct Store {
    document: Value,
    /// Metadata by dot-path. BTreeMap for a stable validation order.
    fields: BTreeMap<String, FieldSlot>,
}

#[derive(Debug, Clone)]
struct FieldSlot {
    path: Path,
    meta: FieldMeta,
}

impl Store {
    /// Create a store seeded with `initial` values and no metadata.
    pub fn new(initial: Map<String, Value>) -> Self {
        Self {
            document: Value::Object(initial),
            fields: BTreeMap::new(),
        }
    }

    /// The whole value document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Raw value at `path`; `None` when never written.
    pub fn value(&self, path: &Path) -> Option<&Value> {
        accessor::get(&self.document, path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.value(path).is_some()
    }

    pub fn meta(&self, path: &Path) -> Option<&FieldMeta> {
        self.fields.get(&path.to_dot_path()).map(|slot| &slot.meta)
    }

    /// Metadata at `path`, created empty when absent.
    pub fn meta_mut(&mut self, path: &Path) -> &mut FieldMeta {
        &mut self
            .fields
            .entry(path.to_dot_path())
            .or_insert_with(|| FieldSlot {
                path: path.clone(),
                meta: FieldMeta::default(),
            })
            .meta
    }

    /// Value and metadata at `path`, if a value has been written there.
    pub fn item(&self, path: &Path) -> Option<StoreItem> {
        let value = self.value(path)?.clone();
        Some(StoreItem {
            value,
            meta: self.meta(path).cloned().unwrap_or_default(),
        })
    }

    /// Write a value, leaving the path's metadata as it is.
    pub fn write(&mut self, path: &Path, value: Value) -> Result<(), FormError> {
        if path.is_root() {
            return Err(FormError::MalformedPath(
                "the store root cannot be written as a field".to_string(),
            ));
        }
        accessor::set(&mut self.document, path, value)
    }

    /// Drop the value at `path` and the metadata of `path` and every path
    /// below it. Returns the old value.
    pub fn remove(&mut self, path: &Path) -> Option<Value> {
        if path.is_root() {
            return None;
        }
        self.fields.retain(|_, slot| !slot.path.starts_with(path));
        accessor::unset(&mut self.document, path)
    }

    /// Whether `path` or any path below it carries an error.
    pub fn has_error_within(&self, path: &Path) -> bool {
        self.fields
            .values()
            .any(|slot| slot.meta.error.is_some() && slot.path.starts_with(path))
    }

    /// Paths the validation pipeline must visit: those holding rules, and
    /// those still carrying an error from rules that have since been removed.
    pub fn validated_paths(&self) -> Vec<Path> {
        self.fields
            .values()
            .filter(|slot| slot.meta.needs_validation())
            .map(|slot| slot.path.clone())
            .collect()
    }

    /// Current errors by dot-path.
    pub fn errors(&self) -> ErrorMap {
        self.fields
            .iter()
            .filter_map(|(dot_path, slot)| {
                slot.meta
                    .error
                    .as_ref()
                    .map(|error| (dot_path.clone(), error.clone()))
            })
            .collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FieldError;
    use crate::path;
    use crate::validation::Validation;
    use serde_json::json;

    fn seeded() -> Store {
        let initial = json!({"nested": {"items": [{"name": "Joey"}]}});
        match initial {
            Value::Object(map) => Store::new(map),
            _ => unreachable!(),
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    #[test]
    fn initial_values_are_readable() {
        let store = seeded();
        let p = path!["nested", "items", 0, "name"];
        assert_eq!(store.value(&p), Some(&json!("Joey")));
        assert!(store.contains(&p));
    }

    #[test]
    fn unset_path_is_absent() {
        let store = Store::default();
        assert!(store.value(&path!["x"]).is_none());
        assert!(store.item(&path!["x"]).is_none());
    }

    #[test]
    fn write_keeps_metadata() {
        let mut store = seeded();
        let p = path!["nested", "items", 0, "name"];
        store.meta_mut(&p).touched = true;

        store.write(&p, json!("Joe")).unwrap();

        let item = store.item(&p).unwrap();
        assert_eq!(item.value, json!("Joe"));
        assert!(item.meta.touched);
    }

    #[test]
    fn write_root_is_rejected() {
        let mut store = Store::default();
        assert!(matches!(
            store.write(&Path::root(), json!(1)),
            Err(FormError::MalformedPath(_))
        ));
    }

    #[test]
    fn write_through_primitive_fails() {
        let mut store = seeded();
        assert!(store
            .write(&path!["nested", "items", 0, "name", "first"], json!("J"))
            .is_err());
        assert_eq!(
            store.value(&path!["nested", "items", 0, "name"]),
            Some(&json!("Joey"))
        );
    }

    #[test]
    fn remove_drops_value_and_meta() {
        let mut store = seeded();
        let p = path!["nested", "items", 0, "name"];
        store.meta_mut(&p).dirty = true;

        assert_eq!(store.remove(&p), Some(json!("Joey")));
        assert!(store.value(&p).is_none());
        assert!(store.meta(&p).is_none());
        assert_eq!(store.document(), &json!({"nested": {"items": [{}]}}));
    }

    #[test]
    fn remove_drops_metadata_of_subtree() {
        let mut store = seeded();
        let name = path!["nested", "items", 0, "name"];
        let sibling = path!["nested", "items", 1];
        store.meta_mut(&name).error = Some(FieldError::new("bad", "custom", json!("Joey")));
        store.meta_mut(&sibling).touched = true;

        assert!(store.has_error_within(&path!["nested", "items", 0]));
        assert!(!store.has_error_within(&sibling));

        store.remove(&path!["nested", "items", 0]);
        assert!(store.meta(&name).is_none());
        assert!(store.errors().is_empty());
        assert!(store.validated_paths().is_empty());
        assert!(store.meta(&sibling).is_some());
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    #[test]
    fn meta_can_exist_without_value() {
        let mut store = Store::default();
        store.meta_mut(&path!["later"]).touched = true;
        assert!(store.meta(&path!["later"]).unwrap().touched);
        assert!(store.item(&path!["later"]).is_none());
    }

    #[test]
    fn item_defaults_meta_when_none_recorded() {
        let store = seeded();
        let item = store.item(&path!["nested", "items", 0, "name"]).unwrap();
        assert!(!item.meta.touched);
        assert!(item.meta.error.is_none());
    }

    #[test]
    fn validated_paths_include_rules_and_stale_errors() {
        let mut store = Store::default();
        store.meta_mut(&path!["b"]).validations = vec![Validation::required("req")];
        store.meta_mut(&path!["a"]).error = Some(FieldError::new("old", "required", json!("")));
        store.meta_mut(&path!["c"]).touched = true;

        assert_eq!(store.validated_paths(), vec![path!["a"], path!["b"]]);
    }

    #[test]
    fn errors_projection() {
        let mut store = Store::default();
        store.meta_mut(&path!["a", 0]).error = Some(FieldError::new("bad", "custom", json!(1)));
        store.meta_mut(&path!["b"]).touched = true;

        let errors = store.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["a.0"].message, "bad");
    }
}
