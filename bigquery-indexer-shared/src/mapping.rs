//! Nested-mapping declarations.
//!
//! Arrays of objects are flattened by the search engine unless their path is
//! declared `nested`. A `MappingTree` holds only the paths that need such a
//! declaration (or that contain one); every other field keeps the default
//! dynamic mapping.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// One mapping path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingEntry {
    /// Declare the path as `{"type": "nested"}`.
    pub nested: bool,
    /// Mappings of structured children.
    pub properties: Option<MappingTree>,
}

impl MappingEntry {
    pub fn nested() -> Self {
        Self {
            nested: true,
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: MappingTree) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Render as an index mapping property.
    pub fn to_json(&self) -> Value {
        let mut property = Map::new();
        if self.nested {
            property.insert("type".to_string(), json!("nested"));
        }
        if let Some(ref properties) = self.properties {
            property.insert("properties".to_string(), properties.to_json());
        }
        Value::Object(property)
    }
}

/// Field path to mapping entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTree {
    entries: BTreeMap<String, MappingEntry>,
}

impl MappingTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: MappingEntry) {
        self.entries.insert(path.into(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&MappingEntry> {
        self.entries.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MappingEntry)> {
        self.entries.iter()
    }

    /// Render as the value of a mapping's `properties` object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(path, entry)| (path.clone(), entry.to_json()))
                .collect(),
        )
    }

    /// Render as a complete put-mapping request body.
    pub fn to_mapping_body(&self) -> Value {
        json!({ "properties": self.to_json() })
    }
}
