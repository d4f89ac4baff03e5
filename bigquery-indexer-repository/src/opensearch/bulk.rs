//! Bulk request bodies and response parsing.
//!
//! Every entity operation becomes an `update` action. Partial documents are
//! sent with `doc_as_upsert`; sample merges run `MERGE_SAMPLE_SCRIPT` as a
//! scripted upsert so that the first write to a new entity goes through the
//! same find-or-append path as every later one.

use serde_json::{json, Value};

use crate::errors::StoreError;
use crate::opensearch::scripts::{MERGE_SAMPLE_SCRIPT, SCRIPT_LANG};
use crate::types::{BatchOperationResult, BatchOperationSummary};
use bigquery_indexer_shared::{EntityOperation, EntityUpdate};

/// Build the newline-delimited bulk body: one action line and one payload
/// line per update.
pub(crate) fn bulk_body(updates: &[EntityUpdate], retry_on_conflict: u32) -> Vec<Value> {
    let mut body = Vec::with_capacity(updates.len() * 2);

    for update in updates {
        body.push(json!({
            "update": {
                "_id": update.entity_id,
                "retry_on_conflict": retry_on_conflict
            }
        }));

        let payload = match &update.operation {
            EntityOperation::PartialUpdate(fields) => json!({
                "doc": fields,
                "doc_as_upsert": true
            }),
            EntityOperation::MergeSample { key, sample } => json!({
                "script": {
                    "source": MERGE_SAMPLE_SCRIPT,
                    "lang": SCRIPT_LANG,
                    "params": {
                        "key": key,
                        "sample": sample
                    }
                },
                "scripted_upsert": true,
                "upsert": {}
            }),
        };
        body.push(payload);
    }

    body
}

/// Map a bulk response onto per-item results.
///
/// Items are reported in request order, so each is matched to the update at
/// the same position.
pub(crate) fn parse_bulk_response(
    updates: &[EntityUpdate],
    response: &Value,
) -> Result<BatchOperationSummary, StoreError> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::parse("Bulk response has no items"))?;

    if items.len() != updates.len() {
        return Err(StoreError::parse(format!(
            "Bulk response has {} items for {} operations",
            items.len(),
            updates.len()
        )));
    }

    let results = items
        .iter()
        .zip(updates)
        .map(|(item, update)| {
            // Each item is keyed by its action name.
            let outcome = item
                .as_object()
                .and_then(|actions| actions.values().next())
                .unwrap_or(&Value::Null);

            let entity_id = outcome
                .get("_id")
                .and_then(Value::as_str)
                .unwrap_or(&update.entity_id);

            match outcome.get("error") {
                Some(error) => BatchOperationResult::failed(entity_id, describe_error(error)),
                None => BatchOperationResult::succeeded(entity_id),
            }
        })
        .collect();

    Ok(BatchOperationSummary::from_results(results))
}

fn describe_error(error: &Value) -> String {
    let kind = error.get("type").and_then(Value::as_str);
    let reason = error.get("reason").and_then(Value::as_str);
    let cause = error
        .get("caused_by")
        .and_then(|cause| cause.get("reason"))
        .and_then(Value::as_str);

    match (kind, reason, cause) {
        (Some(kind), Some(reason), Some(cause)) => format!("{}: {} ({})", kind, reason, cause),
        (Some(kind), Some(reason), None) => format!("{}: {}", kind, reason),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigquery_indexer_shared::Document;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_bulk_body_partial_update() {
        let updates = vec![EntityUpdate::partial(
            "P1",
            doc(json!({"proj.ds.weight.value": 70})),
        )];

        let body = bulk_body(&updates, 3);

        assert_eq!(body.len(), 2);
        assert_eq!(body[0], json!({"update": {"_id": "P1", "retry_on_conflict": 3}}));
        assert_eq!(
            body[1],
            json!({"doc": {"proj.ds.weight.value": 70}, "doc_as_upsert": true})
        );
    }

    #[test]
    fn test_bulk_body_merge_sample() {
        let updates = vec![EntityUpdate::merge_sample(
            "P1",
            "sid",
            doc(json!({"sid": "S1", "proj.ds.center.center": "A"})),
        )];

        let body = bulk_body(&updates, 0);

        assert_eq!(body[1]["script"]["lang"], "painless");
        assert_eq!(body[1]["script"]["params"]["key"], "sid");
        assert_eq!(
            body[1]["script"]["params"]["sample"],
            json!({"sid": "S1", "proj.ds.center.center": "A"})
        );
        assert_eq!(body[1]["scripted_upsert"], true);
        assert_eq!(body[1]["upsert"], json!({}));
    }

    #[test]
    fn test_parse_bulk_response_reports_failed_items() {
        let updates = vec![
            EntityUpdate::partial("P1", Document::new()),
            EntityUpdate::partial("P2", Document::new()),
        ];
        let response = json!({
            "took": 3,
            "errors": true,
            "items": [
                {"update": {"_id": "P1", "status": 200, "result": "updated"}},
                {"update": {
                    "_id": "P2",
                    "status": 400,
                    "error": {
                        "type": "mapper_parsing_exception",
                        "reason": "failed to parse field [proj.ds.t.x]",
                        "caused_by": {"type": "number_format_exception", "reason": "For input string: \"abc\""}
                    }
                }}
            ]
        });

        let summary = parse_bulk_response(&updates, &response).unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 1);
        let failure = summary.failures().next().unwrap();
        assert_eq!(failure.entity_id, "P2");
        assert_eq!(
            failure.error.as_deref(),
            Some("mapper_parsing_exception: failed to parse field [proj.ds.t.x] (For input string: \"abc\")")
        );
    }

    #[test]
    fn test_parse_bulk_response_item_count_mismatch() {
        let updates = vec![EntityUpdate::partial("P1", Document::new())];
        let response = json!({"errors": false, "items": []});

        assert!(matches!(
            parse_bulk_response(&updates, &response),
            Err(StoreError::ParseError(_))
        ));
    }
}
