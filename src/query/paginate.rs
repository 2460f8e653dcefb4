use serde::Serialize;
use serde_json::Value;

use crate::database::document::{Document, CREATED_AT_FIELD};
use crate::database::{DocumentStore, StoreError};
use crate::filter::{Filter, FindQuery, SortField};
use crate::query::descriptor::{Populate, QueryDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(rename = "prev", skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
}

impl Pagination {
    /// `previous` iff page > 1, `next` iff page * limit < total
    pub fn around(page: u64, limit: u64, total: u64) -> Self {
        Self {
            previous: (page > 1).then(|| PageRef { page: page - 1, limit }),
            next: (page.saturating_mul(limit) < total).then(|| PageRef { page: page + 1, limit }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub pagination: Pagination,
}

/// Run a descriptor against a collection: filtered count, one page of
/// sorted and projected documents, then populated relations.
pub async fn execute(
    store: &dyn DocumentStore,
    collection: &str,
    descriptor: &QueryDescriptor,
) -> Result<Page<Document>, StoreError> {
    let query = descriptor.find_query();
    let total = store.count(collection, &query.filter).await?;
    let mut items = store.find(collection, &query).await?;

    for populate in &descriptor.populate {
        populate_relation(store, &mut items, populate).await?;
    }

    tracing::debug!(
        "Page {} of {} ({} items, {} total)",
        descriptor.page(),
        collection,
        items.len(),
        total
    );

    Ok(Page {
        count: items.len(),
        items,
        pagination: Pagination::around(descriptor.page(), descriptor.limit(), total),
    })
}

/// Expand one relation on every item with a single `in` query, regardless
/// of how many items there are
pub async fn populate_relation(
    store: &dyn DocumentStore,
    items: &mut [Document],
    populate: &Populate,
) -> Result<(), StoreError> {
    let mut keys: Vec<Value> = Vec::new();
    for item in items.iter() {
        if let Some(key) = item.get_path(&populate.local_field) {
            if !key.is_null() && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }

    let related = if keys.is_empty() {
        vec![]
    } else {
        let query = FindQuery {
            filter: Filter::new().is_in(populate.foreign_field.clone(), keys),
            sort: vec![SortField::asc(CREATED_AT_FIELD)],
            ..Default::default()
        };
        store.find(&populate.collection, &query).await?
    };

    for item in items.iter_mut() {
        let key = item.get_path(&populate.local_field).cloned();
        let mut matches = related
            .iter()
            .filter(|r| key.is_some() && r.get_path(&populate.foreign_field) == key.as_ref())
            .map(|r| project(r, &populate.select));

        let value = if populate.many {
            Value::Array(matches.collect())
        } else {
            match matches.next() {
                Some(found) => found,
                None if key.is_none() => continue,
                None => Value::Null,
            }
        };
        item.set(populate.path.clone(), value);
    }
    Ok(())
}

fn project(doc: &Document, select: &[String]) -> Value {
    if select.is_empty() {
        doc.clone().into_value()
    } else {
        doc.project(select).into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::query::translate::{translate, QueryOptions};
    use serde_json::json;

    async fn seed(store: &MemoryStore, collection: &str, docs: Vec<Value>) {
        for doc in docs {
            store
                .insert(collection, Document::from_value(doc).unwrap())
                .await
                .unwrap();
        }
    }

    async fn courses() -> MemoryStore {
        let store = MemoryStore::new();
        seed(
            &store,
            "courses",
            vec![
                json!({"id": "c1", "title": "A", "tuition": 500, "bootcamp": "b1"}),
                json!({"id": "c2", "title": "B", "tuition": 1000, "bootcamp": "b1"}),
                json!({"id": "c3", "title": "C", "tuition": 4000, "bootcamp": "b2"}),
                json!({"id": "c4", "title": "D", "tuition": 2500, "bootcamp": "b2"}),
                json!({"id": "c5", "title": "E", "tuition": 8000, "bootcamp": "b1"}),
                json!({"id": "c6", "title": "F", "tuition": 6000, "bootcamp": "b3"}),
            ],
        )
        .await;
        seed(
            &store,
            "bootcamps",
            vec![
                json!({"id": "b1", "name": "Devworks", "description": "one", "housing": true}),
                json!({"id": "b2", "name": "ModernTech", "description": "two", "housing": false}),
            ],
        )
        .await;
        store
    }

    fn titles(page: &Page<Document>) -> Vec<&str> {
        page.items.iter().map(|d| d.get_str("title").unwrap()).collect()
    }

    #[test]
    fn pagination_edges() {
        assert_eq!(Pagination::around(1, 10, 10), Pagination::default());
        let middle = Pagination::around(2, 10, 25);
        assert_eq!(middle.previous, Some(PageRef { page: 1, limit: 10 }));
        assert_eq!(middle.next, Some(PageRef { page: 3, limit: 10 }));
        assert_eq!(Pagination::around(3, 10, 25).next, None);
        assert_eq!(Pagination::around(9, 10, 25).previous, Some(PageRef { page: 8, limit: 10 }));
    }

    #[tokio::test]
    async fn second_page_of_descending_tuition() {
        let store = courses().await;
        let d = translate(
            [("tuition[gte]", "1000"), ("sort", "-tuition"), ("limit", "2"), ("page", "2")],
            &QueryOptions::default(),
        );
        let page = execute(&store, "courses", &d).await.unwrap();

        // matches ranked 8000, 6000, 4000, 2500, 1000
        assert_eq!(titles(&page), vec!["C", "D"]);
        assert_eq!(page.count, 2);
        assert!(page.pagination.previous.is_some());
        assert!(page.pagination.next.is_some());
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let store = courses().await;
        let d = translate([("limit", "4"), ("page", "5")], &QueryOptions::default());
        let page = execute(&store, "courses", &d).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.count, 0);
        assert_eq!(page.pagination.next, None);
        assert_eq!(page.pagination.previous, Some(PageRef { page: 4, limit: 4 }));
    }

    #[tokio::test]
    async fn identical_descriptors_return_identical_pages() {
        let store = courses().await;
        let d = translate([("sort", "bootcamp"), ("limit", "3")], &QueryOptions::default());
        let first = execute(&store, "courses", &d).await.unwrap();
        let second = execute(&store, "courses", &d).await.unwrap();
        assert_eq!(first, second);
        // ties on bootcamp fall back to id order
        assert_eq!(titles(&first), vec!["A", "B", "E"]);
    }

    #[tokio::test]
    async fn never_returns_more_than_limit() {
        let store = courses().await;
        for limit in 1..=7u64 {
            let d = translate([("limit", limit.to_string())], &QueryOptions::default());
            let page = execute(&store, "courses", &d).await.unwrap();
            assert!(page.count as u64 <= limit);
            assert_eq!(page.pagination.next.is_some(), limit < 6);
        }
    }

    #[tokio::test]
    async fn populates_forward_references() {
        let store = courses().await;
        let d = translate([("sort", "title")], &QueryOptions::default())
            .with_populate(Populate::one("bootcamp", "bootcamps").select(&["name", "description"]));
        let page = execute(&store, "courses", &d).await.unwrap();

        assert_eq!(
            page.items[0].get("bootcamp"),
            Some(&json!({"id": "b1", "name": "Devworks", "description": "one"}))
        );
        // dangling reference
        assert_eq!(page.items[5].get("bootcamp"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn populates_reverse_relations() {
        let store = courses().await;
        let d = QueryDescriptor::default().with_populate(Populate::many("courses", "courses", "bootcamp"));
        let page = execute(&store, "bootcamps", &d).await.unwrap();

        let b1 = page.items.iter().find(|b| b.id() == Some("b1")).unwrap();
        assert_eq!(b1.get("courses").unwrap().as_array().unwrap().len(), 3);
        let b2 = page.items.iter().find(|b| b.id() == Some("b2")).unwrap();
        assert_eq!(b2.get("courses").unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn projection_keeps_only_selected_fields() {
        let store = courses().await;
        let d = translate([("select", "title"), ("tuition[lt]", "1000")], &QueryOptions::default());
        let page = execute(&store, "courses", &d).await.unwrap();
        assert_eq!(page.items[0].clone().into_value(), json!({"id": "c1", "title": "A"}));
    }
}
