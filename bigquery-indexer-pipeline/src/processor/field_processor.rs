//! Field lookup documents for the `<index>_fields` index.

use bigquery_indexer_shared::{FieldDocument, SchemaField, TableSchema, SAMPLES_FIELD};

/// One lookup document per leaf field of the table.
///
/// Records are not emitted themselves; their leaves get dotted names such as
/// `address.city`. Fields of sample tables get ids under `samples.` so they do
/// not collide with entity fields of the same name.
pub fn field_documents(table: &TableSchema, sample_id_column: Option<&str>) -> Vec<FieldDocument> {
    let is_sample_table = sample_id_column.is_some_and(|column| table.has_column(column));
    let id_prefix = if is_sample_table {
        format!("{}.{}", SAMPLES_FIELD, table.full_name)
    } else {
        table.full_name.clone()
    };

    let mut documents = Vec::new();
    collect_fields(&table.fields, &id_prefix, None, &mut documents);
    documents
}

fn collect_fields(
    fields: &[SchemaField],
    id_prefix: &str,
    name_prefix: Option<&str>,
    documents: &mut Vec<FieldDocument>,
) {
    for field in fields {
        let id = format!("{}.{}", id_prefix, field.name);
        let name = match name_prefix {
            Some(prefix) => format!("{}.{}", prefix, field.name),
            None => field.name.clone(),
        };

        if field.field_type.is_record() {
            collect_fields(&field.fields, &id, Some(&name), documents);
        } else {
            documents.push(FieldDocument {
                id,
                name,
                description: field
                    .description
                    .clone()
                    .filter(|description| !description.is_empty()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigquery_indexer_shared::{FieldMode, FieldType};

    fn table() -> TableSchema {
        TableSchema::new(
            "proj.ds.people",
            vec![
                SchemaField::scalar("pid", FieldType::String),
                SchemaField::scalar("age", FieldType::Integer).with_description("Age in years"),
                SchemaField::record(
                    "addresses",
                    vec![
                        SchemaField::scalar("city", FieldType::String),
                        SchemaField::record("geo", vec![SchemaField::scalar("lat", FieldType::Float)]),
                    ],
                )
                .with_mode(FieldMode::Repeated),
            ],
        )
    }

    #[test]
    fn test_field_documents_flatten_records() {
        let documents = field_documents(&table(), None);

        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "proj.ds.people.pid",
                "proj.ds.people.age",
                "proj.ds.people.addresses.city",
                "proj.ds.people.addresses.geo.lat",
            ]
        );
        assert_eq!(names, vec!["pid", "age", "addresses.city", "addresses.geo.lat"]);
        assert_eq!(documents[1].description.as_deref(), Some("Age in years"));
        assert!(documents[0].description.is_none());
    }

    #[test]
    fn test_empty_description_is_omitted() {
        let table = TableSchema::new(
            "proj.ds.people",
            vec![SchemaField::scalar("pid", FieldType::String).with_description("")],
        );

        let documents = field_documents(&table, None);

        assert!(documents[0].description.is_none());
    }

    #[test]
    fn test_sample_table_ids_are_prefixed() {
        let mut table = table();
        table.fields.push(SchemaField::scalar("sid", FieldType::String));

        let documents = field_documents(&table, Some("sid"));

        assert!(documents.iter().all(|d| d.id.starts_with("samples.proj.ds.people.")));
        assert_eq!(documents[0].name, "pid");
    }

    #[test]
    fn test_sample_column_absent_keeps_plain_ids() {
        let documents = field_documents(&table(), Some("sid"));

        assert_eq!(documents[0].id, "proj.ds.people.pid");
    }
}
