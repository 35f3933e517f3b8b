#[cfg(test)]
pub(crate) mod memory;
pub mod pinecone;
pub mod qdrant;

pub use pinecone::{PineconeStore, ServerlessSpec};
pub use qdrant::QdrantStore;

use crate::{IndexSpec, StoreError, VectorMetadata};
use serde_json::{json, Value};

pub(crate) fn metadata_to_value(metadata: &VectorMetadata) -> Value {
    json!({
        "text": metadata.text,
        "source": metadata.source,
        "page": metadata.page,
    })
}

/// Stores may hand numbers back as floats, so `page` accepts both.
pub(crate) fn metadata_from_value(value: &Value) -> Option<VectorMetadata> {
    let text = value.pointer("/text").and_then(Value::as_str)?.to_string();
    let source = value
        .pointer("/source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let page = value
        .pointer("/page")
        .and_then(|page| page.as_u64().or_else(|| page.as_f64().map(|page| page as u64)))
        .unwrap_or(0) as u32;

    Some(VectorMetadata { text, source, page })
}

/// An adapter is bound to one index at construction; any other name is a caller bug.
pub(crate) fn check_index_name(bound: &str, spec: &IndexSpec) -> Result<(), StoreError> {
    if spec.name != bound {
        return Err(StoreError::Request(format!(
            "store is bound to index {bound}, not {}",
            spec.name
        )));
    }
    Ok(())
}
