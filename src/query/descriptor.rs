use std::collections::BTreeMap;

use serde_json::Value;

use crate::database::document::CREATED_AT_FIELD;
use crate::filter::{Filter, FilterOp, FindQuery, SortField};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;

/// A permissively parsed parameter: either the caller's value, or the
/// default that replaced it. `rejected` holds the raw input when the caller
/// sent something unusable, and is `None` when the key was omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param<T> {
    Provided(T),
    Defaulted { value: T, rejected: Option<String> },
}

impl<T: Copy> Param<T> {
    pub fn get(&self) -> T {
        match self {
            Param::Provided(v) => *v,
            Param::Defaulted { value, .. } => *value,
        }
    }

    pub fn omitted(value: T) -> Self {
        Param::Defaulted { value, rejected: None }
    }
}

/// Relation expanded inline on every item of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populate {
    /// Key written on each item
    pub path: String,
    pub collection: String,
    pub local_field: String,
    pub foreign_field: String,
    /// Array of matches when true, single document (or null) otherwise
    pub many: bool,
    pub select: Vec<String>,
}

impl Populate {
    /// Reverse relation: related documents whose `foreign_field` holds this item's id
    pub fn many(path: &str, collection: &str, foreign_field: &str) -> Self {
        Self {
            path: path.to_string(),
            collection: collection.to_string(),
            local_field: "id".to_string(),
            foreign_field: foreign_field.to_string(),
            many: true,
            select: vec![],
        }
    }

    /// Forward reference: replace the id stored under `path` with the document
    pub fn one(path: &str, collection: &str) -> Self {
        Self {
            path: path.to_string(),
            collection: collection.to_string(),
            local_field: path.to_string(),
            foreign_field: "id".to_string(),
            many: false,
            select: vec![],
        }
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

/// Filter/sort/page/selection intent for one read request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// field -> operator -> value
    pub filters: BTreeMap<String, BTreeMap<FilterOp, Value>>,
    pub sort: Vec<SortField>,
    pub select: Vec<String>,
    pub page: Param<u64>,
    pub limit: Param<u64>,
    pub populate: Vec<Populate>,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            sort: default_sort(),
            select: vec![],
            page: Param::omitted(DEFAULT_PAGE),
            limit: Param::omitted(DEFAULT_LIMIT),
            populate: vec![],
        }
    }
}

pub fn default_sort() -> Vec<SortField> {
    vec![SortField::desc(CREATED_AT_FIELD)]
}

impl QueryDescriptor {
    pub fn page(&self) -> u64 {
        self.page.get()
    }

    pub fn limit(&self) -> u64 {
        self.limit.get()
    }

    pub fn skip(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn with_populate(mut self, populate: Populate) -> Self {
        self.populate.push(populate);
        self
    }

    /// Pin a field to a value regardless of what the caller asked for
    pub fn with_condition(mut self, field: &str, value: Value) -> Self {
        let mut ops = BTreeMap::new();
        ops.insert(FilterOp::Eq, value);
        self.filters.insert(field.to_string(), ops);
        self
    }

    pub fn filter(&self) -> Filter {
        self.filters.iter().fold(Filter::new(), |filter, (field, ops)| {
            ops.iter()
                .fold(filter, |f, (op, value)| f.compare(field.clone(), *op, value.clone()))
        })
    }

    pub fn find_query(&self) -> FindQuery {
        FindQuery {
            filter: self.filter(),
            sort: self.sort.clone(),
            select: self.select.clone(),
            skip: self.skip(),
            limit: Some(self.limit()),
        }
    }

    /// Re-encode as query-string pairs; translating the output yields an
    /// equal descriptor (populate is never part of a query string)
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (field, ops) in &self.filters {
            for (op, value) in ops {
                let key = match op {
                    FilterOp::Eq => field.clone(),
                    other => format!("{}[{}]", field, other.suffix()),
                };
                pairs.push((key, encode_value(value)));
            }
        }
        if !self.select.is_empty() {
            pairs.push(("select".to_string(), self.select.join(",")));
        }
        let sort: Vec<String> = self.sort.iter().map(SortField::to_token).collect();
        pairs.push(("sort".to_string(), sort.join(",")));
        for (key, param) in [("page", &self.page), ("limit", &self.limit)] {
            match param {
                Param::Provided(v) => pairs.push((key.to_string(), v.to_string())),
                Param::Defaulted { rejected: Some(raw), .. } => pairs.push((key.to_string(), raw.clone())),
                Param::Defaulted { rejected: None, .. } => {}
            }
        }
        pairs
    }

    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_query_pairs())
            .finish()
    }
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(encode_value).collect::<Vec<_>>().join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
