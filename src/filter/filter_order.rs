use std::cmp::Ordering;

use serde_json::Value;

use super::filter::scalar_cmp;
use super::types::{SortDirection, SortField, SqlParam};
use crate::database::document::{Document, ID_FIELD};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `-tuition,name` into descending tuition then ascending name
    pub fn parse(raw: &str) -> Vec<SortField> {
        raw.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty() && *token != "-")
            .map(|token| match token.strip_prefix('-') {
                Some(field) => SortField::desc(field),
                None => SortField::asc(token),
            })
            .collect()
    }

    /// Total order over documents: sort fields first, then `id` ascending
    pub fn compare(a: &Document, b: &Document, sort: &[SortField]) -> Ordering {
        for field in sort {
            let ord = compare_values(a.get_path(&field.field), b.get_path(&field.field));
            let ord = match field.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.id().cmp(&b.id())
    }

    /// ORDER BY clause over the `doc` column, paths bound as text[] parameters
    pub fn generate(sort: &[SortField], params: &mut Vec<SqlParam>) -> String {
        let mut parts: Vec<String> = sort
            .iter()
            .map(|s| {
                params.push(SqlParam::Path(s.field.split('.').map(str::to_string).collect()));
                format!("doc #> ${} {}", params.len(), s.direction.to_sql())
            })
            .collect();
        parts.push(format!("{} ASC", ID_FIELD));
        format!("ORDER BY {}", parts.join(", "))
    }
}

/// Missing < null < strings < numbers < booleans < arrays < objects, the same
/// cross-type order Postgres uses for jsonb
fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::Bool(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Some(x), Some(y)) => scalar_cmp(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}
