use sqlx::postgres::PgArguments;

use crate::filter::{Filter, FilterOrder, FilterWhere, FindQuery, SqlParam, SqlResult};
use super::store::{validate_collection, StoreError};

/// Builds parameterised statements against the `documents` table.
///
/// `$1` is always the collection name.
pub struct QueryBuilder {
    collection: String,
}

impl QueryBuilder {
    pub fn new(collection: impl Into<String>) -> Result<Self, StoreError> {
        let collection = collection.into();
        validate_collection(&collection)?;
        Ok(Self { collection })
    }

    fn base_params(&self) -> Vec<SqlParam> {
        vec![SqlParam::Text(self.collection.clone())]
    }

    pub fn select(&self, query: &FindQuery) -> Result<SqlResult, StoreError> {
        let mut params = self.base_params();
        let where_clause = FilterWhere::generate(&query.filter, &mut params)?;
        let order_clause = FilterOrder::generate(&query.sort, &mut params);

        let mut sql = format!(
            "SELECT doc FROM documents WHERE collection = $1 AND {} {}",
            where_clause, order_clause
        );
        if let Some(limit) = query.limit {
            params.push(SqlParam::BigInt(to_i64(limit)));
            sql.push_str(&format!(" LIMIT ${}", params.len()));
        }
        if query.skip > 0 {
            params.push(SqlParam::BigInt(to_i64(query.skip)));
            sql.push_str(&format!(" OFFSET ${}", params.len()));
        }
        Ok(SqlResult { query: sql, params })
    }

    pub fn count(&self, filter: &Filter) -> Result<SqlResult, StoreError> {
        let mut params = self.base_params();
        let where_clause = FilterWhere::generate(filter, &mut params)?;
        Ok(SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM documents WHERE collection = $1 AND {}",
                where_clause
            ),
            params,
        })
    }

    pub fn delete(&self, filter: &Filter) -> Result<SqlResult, StoreError> {
        let mut params = self.base_params();
        let where_clause = FilterWhere::generate(filter, &mut params)?;
        Ok(SqlResult {
            query: format!("DELETE FROM documents WHERE collection = $1 AND {}", where_clause),
            params,
        })
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

pub fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &[SqlParam],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for p in params {
        q = match p {
            SqlParam::Text(s) => q.bind(s.clone()),
            SqlParam::Path(segments) => q.bind(segments.clone()),
            SqlParam::Json(v) => q.bind(v.clone()),
            SqlParam::Float(f) => q.bind(*f),
            SqlParam::BigInt(i) => q.bind(*i),
        };
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOp, SortField};
    use serde_json::json;

    #[test]
    fn select_appends_limit_and_offset_params() {
        let query = FindQuery {
            filter: Filter::new().compare("tuition", FilterOp::Gte, json!(1000)),
            sort: vec![SortField::desc("tuition")],
            select: vec![],
            skip: 2,
            limit: Some(2),
        };
        let sql = QueryBuilder::new("courses").unwrap().select(&query).unwrap();
        assert!(sql.query.starts_with("SELECT doc FROM documents WHERE collection = $1 AND "));
        assert!(sql.query.contains("ORDER BY doc #> $4 DESC NULLS LAST, id ASC"));
        assert!(sql.query.ends_with("LIMIT $5 OFFSET $6"));
        assert_eq!(sql.params[0], SqlParam::Text("courses".into()));
        assert_eq!(sql.params[4], SqlParam::BigInt(2));
        assert_eq!(sql.params.len(), 6);
    }

    #[test]
    fn count_without_conditions() {
        let sql = QueryBuilder::new("reviews").unwrap().count(&Filter::new()).unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM documents WHERE collection = $1 AND TRUE"
        );
    }

    #[test]
    fn rejects_invalid_collection() {
        assert!(QueryBuilder::new("users;").is_err());
    }
}
