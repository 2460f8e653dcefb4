use serde_json::{json, Map, Value};

use crate::database::{DocumentStore, StoreError};
use crate::filter::{Filter, FindQuery};
use crate::types::collections;

/// Mean of `field` over every document of `collection` that belongs to the
/// bootcamp; `None` when there are none
async fn mean_for_bootcamp(
    store: &dyn DocumentStore,
    collection: &str,
    bootcamp_id: &str,
    field: &str,
) -> Result<Option<f64>, StoreError> {
    let query = FindQuery::new(Filter::new().eq("bootcamp", json!(bootcamp_id)));
    let values: Vec<f64> = store
        .find(collection, &query)
        .await?
        .iter()
        .filter_map(|doc| doc.get(field).and_then(Value::as_f64))
        .collect();

    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

/// Average tuition rounded up to the next multiple of ten
pub fn round_cost(mean: f64) -> f64 {
    (mean / 10.0).ceil() * 10.0
}

async fn write_field(
    store: &dyn DocumentStore,
    bootcamp_id: &str,
    field: &str,
    value: Value,
) -> Result<(), StoreError> {
    let mut patch = Map::new();
    patch.insert(field.to_string(), value);
    if store.update(collections::BOOTCAMPS, bootcamp_id, patch).await?.is_none() {
        tracing::debug!("Bootcamp {} vanished before {} could be refreshed", bootcamp_id, field);
    }
    Ok(())
}

/// Recompute `averageCost` after a course of this bootcamp changed
pub async fn refresh_average_cost(store: &dyn DocumentStore, bootcamp_id: &str) -> Result<(), StoreError> {
    let mean = mean_for_bootcamp(store, collections::COURSES, bootcamp_id, "tuition").await?;
    let value = mean.map(|m| json!(round_cost(m))).unwrap_or(Value::Null);
    tracing::debug!("averageCost for bootcamp {} is now {}", bootcamp_id, value);
    write_field(store, bootcamp_id, "averageCost", value).await
}

/// Recompute `averageRating` after a review of this bootcamp changed
pub async fn refresh_average_rating(store: &dyn DocumentStore, bootcamp_id: &str) -> Result<(), StoreError> {
    let mean = mean_for_bootcamp(store, collections::REVIEWS, bootcamp_id, "rating").await?;
    let value = mean.map(|m| json!(m)).unwrap_or(Value::Null);
    tracing::debug!("averageRating for bootcamp {} is now {}", bootcamp_id, value);
    write_field(store, bootcamp_id, "averageRating", value).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Document, MemoryStore};

    async fn store_with(courses: &[f64]) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(collections::BOOTCAMPS, Document::from_value(json!({"id": "b1"})).unwrap())
            .await
            .unwrap();
        for tuition in courses {
            let course = json!({"title": "t", "tuition": tuition, "bootcamp": "b1"});
            store
                .insert(collections::COURSES, Document::from_value(course).unwrap())
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn cost_rounds_up_to_tens() {
        assert_eq!(round_cost(8333.33), 8340.0);
        assert_eq!(round_cost(1000.0), 1000.0);
        assert_eq!(round_cost(1.0), 10.0);
    }

    #[tokio::test]
    async fn average_cost_tracks_courses() {
        let store = store_with(&[10000.0, 12000.0, 8001.0]).await;
        refresh_average_cost(&store, "b1").await.unwrap();
        let b1 = store.find_by_id(collections::BOOTCAMPS, "b1").await.unwrap().unwrap();
        assert_eq!(b1.get("averageCost"), Some(&json!(10010.0)));
    }

    #[tokio::test]
    async fn no_courses_clears_the_average() {
        let store = store_with(&[]).await;
        refresh_average_cost(&store, "b1").await.unwrap();
        let b1 = store.find_by_id(collections::BOOTCAMPS, "b1").await.unwrap().unwrap();
        assert_eq!(b1.get("averageCost"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn average_rating_is_the_plain_mean() {
        let store = store_with(&[]).await;
        for rating in [8, 9, 4] {
            let review = json!({"title": "r", "rating": rating, "bootcamp": "b1"});
            store
                .insert(collections::REVIEWS, Document::from_value(review).unwrap())
                .await
                .unwrap();
        }
        refresh_average_rating(&store, "b1").await.unwrap();
        let b1 = store.find_by_id(collections::BOOTCAMPS, "b1").await.unwrap().unwrap();
        assert_eq!(b1.get("averageRating"), Some(&json!(7.0)));
    }
}
