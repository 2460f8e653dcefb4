pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::NewBootcamp;
pub use course::NewCourse;
pub use review::NewReview;
pub use user::NewUser;

use serde::Serialize;
use serde_json::{Map, Value};

use super::document::{Document, CREATED_AT_FIELD, ID_FIELD, OWNER_FIELD};

/// Fields no client payload may set directly
const SYSTEM_FIELDS: &[&str] = &[ID_FIELD, CREATED_AT_FIELD, OWNER_FIELD];

/// Drop system fields and any resource-specific protected fields from an
/// update payload
pub fn sanitize_patch(mut patch: Map<String, Value>, protected: &[&str]) -> Map<String, Value> {
    for field in SYSTEM_FIELDS.iter().chain(protected) {
        patch.remove(*field);
    }
    patch
}

/// Serialize a typed create payload into a document owned by `owner_id`
pub fn to_owned_document<T: Serialize>(payload: &T, owner_id: &str) -> Result<Document, serde_json::Error> {
    let mut doc = Document::from_value(serde_json::to_value(payload)?).unwrap_or_default();
    doc.set(OWNER_FIELD, Value::String(owner_id.to_string()));
    Ok(doc)
}
