//! Label maps, selectors, and label injection into YAML manifests.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::ApiError;
use crate::meta::ObjectMeta;

/// Render a label map as a `k=v,k2=v2` selector, sorted by key.
pub fn labels_to_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Replace the labels on `meta`, keeping the current values of `keep_keys`.
///
/// Used so that relabelling a resource never drops its `test-id`.
pub fn set_labels_preserving(
    meta: &mut ObjectMeta,
    labels: BTreeMap<String, String>,
    keep_keys: &[&str],
) {
    let mut next = labels;
    if let Some(current) = meta.labels.as_ref() {
        for key in keep_keys {
            if let Some(value) = current.get(*key) {
                next.insert((*key).to_string(), value.clone());
            }
        }
    }
    meta.labels = Some(next);
}

/// Merge `labels` into `metadata.labels` of every document in a YAML stream.
///
/// Empty documents are dropped; non-mapping documents pass through unchanged.
/// The output joins documents with `---` separators.
pub fn add_labels_to_yaml(
    yaml: &str,
    labels: &BTreeMap<String, String>,
) -> Result<String, ApiError> {
    let mut docs = Vec::new();

    for document in serde_yaml::Deserializer::from_str(yaml) {
        let mut value = Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        if let Value::Mapping(root) = &mut value {
            merge_labels(root, labels);
        }
        docs.push(serde_yaml::to_string(&value)?);
    }

    Ok(docs.join("---\n"))
}

fn merge_labels(root: &mut Mapping, labels: &BTreeMap<String, String>) {
    ensure_mapping(root, "metadata");
    let Some(Value::Mapping(metadata)) = root.get_mut("metadata") else {
        return;
    };
    ensure_mapping(metadata, "labels");
    if let Some(Value::Mapping(target)) = metadata.get_mut("labels") {
        for (k, v) in labels {
            target.insert(Value::String(k.clone()), Value::String(v.clone()));
        }
    }
}

/// Make `parent[key]` a mapping, replacing a missing or scalar value.
fn ensure_mapping(parent: &mut Mapping, key: &str) {
    if !matches!(parent.get(key), Some(Value::Mapping(_))) {
        parent.insert(Value::String(key.to_string()), Value::Mapping(Mapping::new()));
    }
}
