use serde_json::json;

use crate::database::{DocumentStore, StoreError};
use crate::filter::Filter;
use crate::types::collections;

/// Delete a bootcamp together with its courses and reviews.
///
/// Children go first so a failure never leaves orphans pointing at a
/// missing bootcamp. Returns false when the bootcamp did not exist.
pub async fn cascade_delete(store: &dyn DocumentStore, bootcamp_id: &str) -> Result<bool, StoreError> {
    let children = Filter::new().eq("bootcamp", json!(bootcamp_id));
    let courses = store.delete_many(collections::COURSES, &children).await?;
    let reviews = store.delete_many(collections::REVIEWS, &children).await?;
    let deleted = store.delete(collections::BOOTCAMPS, bootcamp_id).await?;

    tracing::info!(
        "Deleted bootcamp {} with {} courses and {} reviews",
        bootcamp_id,
        courses,
        reviews
    );
    Ok(deleted)
}
