use crate::traits::VectorStore;
use crate::{StoreError, VectorRecord};
use tracing::info;

pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// Upserts `records` in order, `batch_size` at a time. Returns the number of batches sent.
///
/// Each batch is submitted independently; a failure leaves earlier batches in place.
pub async fn upsert_batched<S>(
    store: &S,
    records: &[VectorRecord],
    batch_size: usize,
) -> Result<usize, StoreError>
where
    S: VectorStore + ?Sized,
{
    if batch_size == 0 {
        return Err(StoreError::Request("batch size must be positive".to_string()));
    }

    let mut batches = 0usize;
    for batch in records.chunks(batch_size) {
        store.upsert(batch).await?;
        batches += 1;
        info!(batch = batches, vectors = batch.len(), "uploaded batch");
    }

    Ok(batches)
}
