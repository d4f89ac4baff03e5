//! Painless scripts executed by the store.

/// Find-or-append a sample by `params.key`, then merge `params.sample` into it.
///
/// Mirrors `bigquery_indexer_shared::merge_sample`: every element whose key
/// equals the incoming sample's is folded, in array order, into the first
/// match and removed; the incoming fields are merged last. Runs as a scripted
/// upsert, so it also initialises the `samples` array on new documents.
pub const MERGE_SAMPLE_SCRIPT: &str = r#"
String key = params.key;
Map incoming = params.sample;
def id = incoming.get(key);
if (!(ctx._source.samples instanceof List)) {
  ctx._source.samples = [incoming];
} else if (id == null) {
  ctx._source.samples.add(incoming);
} else {
  List samples = ctx._source.samples;
  int target = -1;
  int i = 0;
  while (i < samples.size()) {
    def element = samples.get(i);
    if (element instanceof Map && id.equals(element.get(key))) {
      if (target < 0) {
        target = i;
        i++;
      } else {
        Map duplicate = samples.remove(i);
        samples.get(target).putAll(duplicate);
      }
    } else {
      i++;
    }
  }
  if (target < 0) {
    samples.add(incoming);
  } else {
    samples.get(target).putAll(incoming);
  }
}
"#;

/// Script language of `MERGE_SAMPLE_SCRIPT`.
pub const SCRIPT_LANG: &str = "painless";
