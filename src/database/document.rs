use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const OWNER_FIELD: &str = "user";

/// A stored JSON document. Always an object; `id` and `createdAt` are
/// assigned by [`Document::stamp`] before insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str(ID_FIELD)
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.get_str(OWNER_FIELD)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Look up a dotted path such as `location.state`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Shallow merge; `id` and `createdAt` in the patch are ignored
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            if key == ID_FIELD || key == CREATED_AT_FIELD {
                continue;
            }
            self.0.insert(key, value);
        }
    }

    /// Assign `id` and `createdAt` when absent
    pub fn stamp(mut self) -> Self {
        if self.id().is_none() {
            self.set(ID_FIELD, Value::String(Uuid::new_v4().simple().to_string()));
        }
        if !self.0.contains_key(CREATED_AT_FIELD) {
            self.set(CREATED_AT_FIELD, Value::String(timestamp_now()));
        }
        self
    }

    /// Keep only the selected (possibly dotted) fields. `id` is always kept.
    pub fn project(&self, fields: &[String]) -> Document {
        if fields.is_empty() {
            return self.clone();
        }
        let mut out = Map::new();
        if let Some(id) = self.0.get(ID_FIELD) {
            out.insert(ID_FIELD.to_string(), id.clone());
        }
        for field in fields {
            if let Some(value) = self.get_path(field) {
                insert_path(&mut out, field, value.clone());
            }
        }
        Document(out)
    }
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Fixed-width UTC timestamp so lexical order matches chronological order
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        Document::from_value(v).unwrap()
    }

    #[test]
    fn stamp_assigns_id_and_created_at_once() {
        let d = Document::new().stamp();
        let id = d.id().unwrap().to_string();
        let again = d.clone().stamp();
        assert_eq!(again.id(), Some(id.as_str()));
        assert!(d.get_str(CREATED_AT_FIELD).unwrap().ends_with('Z'));
    }

    #[test]
    fn get_path_reads_nested_fields() {
        let d = doc(json!({"location": {"state": "MA", "city": "Boston"}}));
        assert_eq!(d.get_path("location.state"), Some(&json!("MA")));
        assert_eq!(d.get_path("location.zip"), None);
        assert_eq!(d.get_path("missing.deep"), None);
    }

    #[test]
    fn project_keeps_id_and_nested_selection() {
        let d = doc(json!({
            "id": "b1",
            "name": "Devworks",
            "housing": true,
            "location": {"state": "MA", "city": "Boston"}
        }));
        let p = d.project(&["name".to_string(), "location.city".to_string()]);
        assert_eq!(
            p.into_value(),
            json!({"id": "b1", "name": "Devworks", "location": {"city": "Boston"}})
        );
    }

    #[test]
    fn merge_never_overwrites_identity() {
        let mut d = doc(json!({"id": "b1", "createdAt": "t0", "name": "a"}));
        let patch = json!({"id": "evil", "createdAt": "t9", "name": "b"});
        d.merge(patch.as_object().unwrap().clone());
        assert_eq!(d.id(), Some("b1"));
        assert_eq!(d.get_str("createdAt"), Some("t0"));
        assert_eq!(d.get_str("name"), Some("b"));
    }
}
