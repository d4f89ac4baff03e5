//! Index documents and the operations that build them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A JSON document body.
pub type Document = Map<String, Value>;

/// Name of the array that holds sub-entities (samples) in an entity document.
pub const SAMPLES_FIELD: &str = "samples";

/// A write against a single entity document.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityOperation {
    /// Merge these fields into the document at the top level, creating the
    /// document if it does not exist. Fields not mentioned are left untouched.
    PartialUpdate(Document),
    /// Find the element of the `samples` array whose `key` field equals the
    /// sample's, and merge the sample's fields into it; append the sample if no
    /// element matches.
    MergeSample { key: String, sample: Document },
}

impl EntityOperation {
    /// Apply the operation to a document source.
    ///
    /// Returns how the sample array was changed for `MergeSample`, `None` for
    /// partial updates.
    pub fn apply(self, source: &mut Document) -> Option<SampleMerge> {
        match self {
            EntityOperation::PartialUpdate(fields) => {
                source.extend(fields);
                None
            }
            EntityOperation::MergeSample { key, sample } => {
                let samples = source
                    .entry(SAMPLES_FIELD.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match samples {
                    Value::Array(samples) => Some(merge_sample(samples, &key, sample)),
                    other => {
                        *other = Value::Array(vec![Value::Object(sample)]);
                        Some(SampleMerge::Append)
                    }
                }
            }
        }
    }
}

/// An operation addressed to an entity document.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    pub entity_id: String,
    pub operation: EntityOperation,
}

impl EntityUpdate {
    pub fn partial(entity_id: impl Into<String>, fields: Document) -> Self {
        Self {
            entity_id: entity_id.into(),
            operation: EntityOperation::PartialUpdate(fields),
        }
    }

    pub fn merge_sample(entity_id: impl Into<String>, key: impl Into<String>, sample: Document) -> Self {
        Self {
            entity_id: entity_id.into(),
            operation: EntityOperation::MergeSample {
                key: key.into(),
                sample,
            },
        }
    }
}

/// Outcome of merging one sample into a sample array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMerge {
    /// Fields were merged into the element at `position`. `coalesced` counts
    /// pre-existing duplicate elements with the same key that were folded into
    /// it and removed.
    UpdateExisting { position: usize, coalesced: usize },
    /// No element matched; the sample was appended.
    Append,
}

/// Find-or-append a sample by its key field, then merge fields into it.
///
/// Matching elements are merged in array order into the first one, so an
/// array never holds more than one element per key after a merge. The
/// incoming sample's fields are applied last and overwrite same-named fields.
/// A sample without the key field cannot match anything and is appended.
pub fn merge_sample(samples: &mut Vec<Value>, key: &str, sample: Document) -> SampleMerge {
    let Some(id) = sample.get(key).cloned() else {
        samples.push(Value::Object(sample));
        return SampleMerge::Append;
    };

    let matches: Vec<usize> = samples
        .iter()
        .enumerate()
        .filter(|(_, element)| element.get(key) == Some(&id))
        .map(|(position, _)| position)
        .collect();

    let Some((&first, duplicates)) = matches.split_first() else {
        samples.push(Value::Object(sample));
        return SampleMerge::Append;
    };

    // Remove back to front so earlier positions stay valid.
    let mut removed: Vec<Value> = duplicates
        .iter()
        .rev()
        .map(|&position| samples.remove(position))
        .collect();
    removed.reverse();

    let target = &mut samples[first];
    for duplicate in removed {
        if let Value::Object(fields) = duplicate {
            merge_fields(target, fields);
        }
    }
    merge_fields(target, sample);

    SampleMerge::UpdateExisting {
        position: first,
        coalesced: duplicates.len(),
    }
}

fn merge_fields(target: &mut Value, fields: Document) {
    match target {
        Value::Object(existing) => existing.extend(fields),
        other => *other = Value::Object(fields),
    }
}

/// Lookup document describing one schema field, stored in the fields index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDocument {
    /// Document id: `[samples.]<table>.<dotted path>`.
    #[serde(skip)]
    pub id: String,
    /// Dotted path of the field inside its table.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDocument {
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert("name".to_string(), json!(self.name));
        if let Some(ref description) = self.description {
            document.insert("description".to_string(), json!(description));
        }
        document
    }
}

/// One exported sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    #[serde(rename = "entityType")]
    pub entity_type: String,
    /// The sample id.
    pub name: Value,
    pub attributes: Map<String, Value>,
}
