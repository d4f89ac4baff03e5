//! Nested mapping discovery.
//!
//! Walks a table's schema tree and collects the paths the entity index must
//! declare before any row of the table is written: every repeated record is
//! `nested`, and every record with such descendants carries a `properties`
//! block for them. Scalar leaves need nothing; the dynamic default applies.

use bigquery_indexer_shared::{MappingEntry, MappingTree, SchemaField, TableSchema, SAMPLES_FIELD};

/// Collect nested mappings for a list of fields.
///
/// Top-level paths are `<prefix>.<name>` when a prefix is given; paths inside
/// `properties` are relative to their parent. Returns an empty tree when no
/// field needs a declaration.
pub fn nested_mappings(fields: &[SchemaField], prefix: Option<&str>) -> MappingTree {
    let mut tree = MappingTree::new();

    for field in fields {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field.name),
            None => field.name.clone(),
        };

        let children = nested_mappings(&field.fields, None);
        let nested = field.is_repeated_record();

        if !nested && children.is_empty() {
            continue;
        }

        let mut entry = MappingEntry {
            nested,
            properties: None,
        };
        if !children.is_empty() {
            entry = entry.with_properties(children);
        }
        tree.insert(path, entry);
    }

    tree
}

/// The mapping to declare for a table, or `None` if it needs none.
///
/// Sample tables always declare `samples` as nested, with the table's own
/// nested paths underneath it, because their rows are merged into that array.
pub fn table_mappings(table: &TableSchema, sample_id_column: Option<&str>) -> Option<MappingTree> {
    let nested = nested_mappings(&table.fields, Some(&table.full_name));

    let is_sample_table = sample_id_column.is_some_and(|column| table.has_column(column));
    if is_sample_table {
        let mut samples = MappingEntry::nested();
        if !nested.is_empty() {
            samples = samples.with_properties(nested);
        }
        let mut tree = MappingTree::new();
        tree.insert(SAMPLES_FIELD, samples);
        return Some(tree);
    }

    if nested.is_empty() {
        None
    } else {
        Some(nested)
    }
}
