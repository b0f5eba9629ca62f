use serde_yaml::{Mapping, Value};

/// Merge `overlay` on top of `base`, producing a new document.
///
/// Mappings merge key by key, sequences concatenate with `base` items first,
/// and for any other pairing the `overlay` value wins.
#[must_use]
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => Value::Mapping(merge_mappings(base_map, overlay_map)),
        (Value::Sequence(base_seq), Value::Sequence(overlay_seq)) => {
            Value::Sequence(base_seq.iter().chain(overlay_seq).cloned().collect())
        }
        (_, overlay) => overlay.clone(),
    }
}

fn merge_mappings(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let combined = match base.get(key) {
            Some(existing) => merge(existing, value),
            None => value.clone(),
        };
        let _ = merged.insert(key.clone(), combined);
    }

    merged
}

/// Merge documents left to right over an empty mapping.
#[must_use]
pub fn merge_all<'a>(documents: impl IntoIterator<Item = &'a Value>) -> Value {
    documents
        .into_iter()
        .fold(Value::Mapping(Mapping::new()), |acc, doc| merge(&acc, doc))
}
