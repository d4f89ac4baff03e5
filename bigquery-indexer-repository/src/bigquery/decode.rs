//! Decoding of BigQuery REST row cells.
//!
//! The REST API returns every row as `{"f": [{"v": ...}, ...]}` with cells in
//! schema order. Scalars arrive as strings, repeated fields as arrays of
//! `{"v": ...}`, and records as nested `{"f": [...]}` objects.

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Number, Value};

use crate::errors::SourceError;
use bigquery_indexer_shared::{FieldMode, FieldType, Row, SchemaField};

/// Decode one row against the table's top-level fields.
pub fn decode_row(fields: &[SchemaField], row: &Value) -> Result<Row, SourceError> {
    Ok(decode_record(fields, row)?.into())
}

fn decode_record(fields: &[SchemaField], record: &Value) -> Result<Map<String, Value>, SourceError> {
    let cells = record
        .get("f")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::decode("row has no cells"))?;

    if cells.len() != fields.len() {
        return Err(SourceError::decode(format!(
            "row has {} cells for {} fields",
            cells.len(),
            fields.len()
        )));
    }

    fields
        .iter()
        .zip(cells)
        .map(|(field, cell)| {
            let value = cell.get("v").unwrap_or(&Value::Null);
            Ok((field.name.clone(), decode_field(field, value)?))
        })
        .collect()
}

fn decode_field(field: &SchemaField, value: &Value) -> Result<Value, SourceError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    if field.mode == FieldMode::Repeated {
        let items = value
            .as_array()
            .ok_or_else(|| SourceError::decode(format!("{} is not an array", field.name)))?;
        return items
            .iter()
            .map(|item| decode_single(field, item.get("v").unwrap_or(&Value::Null)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    decode_single(field, value)
}

fn decode_single(field: &SchemaField, value: &Value) -> Result<Value, SourceError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    if field.field_type.is_record() {
        return decode_record(&field.fields, value).map(Value::Object);
    }

    let Some(text) = value.as_str() else {
        // Already typed (e.g. a JSON column); keep as is.
        return Ok(value.clone());
    };

    let decoded = match field.field_type {
        FieldType::Integer => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        // Non-finite floats have no JSON representation and are treated as missing.
        FieldType::Float | FieldType::Numeric => text
            .parse::<f64>()
            .ok()
            .map(|number| Number::from_f64(number).map_or(Value::Null, Value::Number))
            .unwrap_or_else(|| Value::String(text.to_string())),
        FieldType::Timestamp => decode_timestamp(text)
            .map(Value::String)
            .unwrap_or_else(|| Value::String(text.to_string())),
        FieldType::Boolean => match text {
            "true" | "TRUE" => Value::Bool(true),
            "false" | "FALSE" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        },
        _ => Value::String(text.to_string()),
    };

    Ok(decoded)
}

/// TIMESTAMP cells are float epoch seconds (`"1.5330816E9"`); render them as
/// RFC 3339 in UTC so the store maps them as dates.
fn decode_timestamp(text: &str) -> Option<String> {
    let seconds = text.parse::<f64>().ok().filter(|s| s.is_finite())?;
    let micros = (seconds * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros)
        .map(|timestamp| timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}
