//! Rebuilds nested key trees from flat key names.
//!
//! The first key to claim a path wins. A later key that needs an existing leaf
//! to be a subtree, or an existing subtree to be a leaf, is rejected with
//! [`ItemErrorKind::KeyPathConflict`]. Insertion order is kept in the output.

use serde_json::{Map, Value};

use super::error::ItemErrorKind;

#[derive(Debug, Clone, Default)]
pub struct KeyTree {
    root: Map<String, Value>,
    delimiter: String,
}

impl KeyTree {
    /// Tree splitting keys on `delimiter`; an empty delimiter keeps keys flat
    pub fn new(delimiter: &str) -> Self {
        Self {
            root: Map::new(),
            delimiter: delimiter.to_string(),
        }
    }

    fn split<'k>(&self, key_name: &'k str) -> Vec<&'k str> {
        if self.delimiter.is_empty() {
            vec![key_name]
        } else {
            key_name.split(self.delimiter.as_str()).collect()
        }
    }

    pub fn insert(&mut self, key_name: &str, value: Value) -> Result<(), ItemErrorKind> {
        if key_name.is_empty() {
            return Err(ItemErrorKind::EmptyKeyName);
        }

        let segments = self.split(key_name);
        let Some((last, parents)) = segments.split_last() else {
            return Err(ItemErrorKind::EmptyKeyName);
        };

        let mut node = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match child {
                Value::Object(map) => map,
                _ => {
                    return Err(ItemErrorKind::KeyPathConflict {
                        conflicting_key: segments[..=depth].join(&self.delimiter),
                    })
                }
            };
        }

        if let Some(existing) = node.get(*last) {
            let prefix = segments.join(&self.delimiter);
            return Err(ItemErrorKind::KeyPathConflict {
                conflicting_key: first_leaf_path(existing, prefix, &self.delimiter),
            });
        }

        node.insert(last.to_string(), value);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

/// Full key name of the first leaf under `value`
fn first_leaf_path(value: &Value, prefix: String, delimiter: &str) -> String {
    match value {
        Value::Object(map) => match map.iter().next() {
            Some((segment, child)) => {
                first_leaf_path(child, format!("{}{}{}", prefix, delimiter, segment), delimiter)
            }
            None => prefix,
        },
        _ => prefix,
    }
}
