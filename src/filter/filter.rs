use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::types::{Condition, FilterOp, Predicate, SortField};
use crate::database::document::Document;
use crate::geo::{GeoPoint, Region};

/// Conjunction of field conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn compare(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        let value = match (op, value) {
            (FilterOp::In, Value::Array(values)) => Value::Array(values),
            (FilterOp::In, single) => Value::Array(vec![single]),
            (_, v) => v,
        };
        self.conditions.push(Condition {
            field: field.into(),
            predicate: Predicate::Compare { op, value },
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: Value) -> Self {
        self.compare(field, FilterOp::Eq, value)
    }

    pub fn is_in(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.compare(field, FilterOp::In, Value::Array(values))
    }

    pub fn within(mut self, field: impl Into<String>, region: Region) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            predicate: Predicate::Within(region),
        });
        self
    }

    /// Evaluate against an in-memory document
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| condition_matches(c, doc))
    }

    pub fn validate_field(field: &str) -> Result<(), FilterError> {
        let valid = !field.is_empty()
            && field.split('.').all(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                    }
                    _ => false,
                }
            });
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidField(field.to_string()))
        }
    }
}

/// Everything a store needs to answer one read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Vec<SortField>,
    pub select: Vec<String>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self { filter, ..Default::default() }
    }
}

fn condition_matches(condition: &Condition, doc: &Document) -> bool {
    let actual = doc.get_path(&condition.field);
    match &condition.predicate {
        Predicate::Compare { op, value } => match actual {
            Some(actual) => compare_matches(*op, actual, value),
            None => false,
        },
        Predicate::Within(region) => actual
            .and_then(GeoPoint::from_geojson)
            .map(|point| region.contains(&point))
            .unwrap_or(false),
    }
}

fn compare_matches(op: FilterOp, actual: &Value, expected: &Value) -> bool {
    match op {
        FilterOp::Eq => equals_or_contains(actual, expected),
        FilterOp::In => match expected {
            Value::Array(candidates) => candidates.iter().any(|c| equals_or_contains(actual, c)),
            other => equals_or_contains(actual, other),
        },
        FilterOp::Gt => scalar_cmp(actual, expected) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(scalar_cmp(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => scalar_cmp(actual, expected) == Some(Ordering::Less),
        FilterOp::Lte => matches!(scalar_cmp(actual, expected), Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Array fields match when any element equals the value
fn equals_or_contains(actual: &Value, expected: &Value) -> bool {
    if values_equal(actual, expected) {
        return true;
    }
    match actual {
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Range comparison between scalars of the same JSON type only
pub(crate) fn scalar_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
