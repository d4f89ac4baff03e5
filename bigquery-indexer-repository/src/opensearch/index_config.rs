//! OpenSearch index configuration.
//!
//! Entity documents use dynamic mappings: every scoped column becomes a field
//! the first time it is written. Only nested paths are declared explicitly,
//! per table, through put-mapping requests.

use serde_json::{json, Value};

use crate::config::StoreConfig;

/// Suffix of the index holding field lookup documents.
pub const FIELDS_INDEX_SUFFIX: &str = "_fields";

/// Name of the fields index that accompanies an entity index.
pub fn fields_index_name(index_name: &str) -> String {
    format!("{}{}", index_name, FIELDS_INDEX_SUFFIX)
}

/// Get the settings used when creating an index.
pub fn get_index_settings(config: &StoreConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas
        }
    })
}
