use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{Condition, FilterOp, Predicate, SqlParam};
use crate::geo::Region;

/// Compiles a [`Filter`] into a WHERE fragment over the JSONB `doc` column.
///
/// Field paths, values and geo parameters are always bound; only validated
/// operators end up in the SQL text.
pub struct FilterWhere<'a> {
    params: &'a mut Vec<SqlParam>,
}

impl<'a> FilterWhere<'a> {
    pub fn new(params: &'a mut Vec<SqlParam>) -> Self {
        Self { params }
    }

    pub fn generate(filter: &Filter, params: &mut Vec<SqlParam>) -> Result<String, FilterError> {
        let mut builder = FilterWhere::new(params);
        let mut parts = Vec::with_capacity(filter.conditions().len());
        for condition in filter.conditions() {
            parts.push(builder.build_condition(condition)?);
        }
        Ok(if parts.is_empty() { "TRUE".to_string() } else { parts.join(" AND ") })
    }

    fn build_condition(&mut self, condition: &Condition) -> Result<String, FilterError> {
        Filter::validate_field(&condition.field)?;
        let path = self.param(SqlParam::Path(
            condition.field.split('.').map(str::to_string).collect(),
        ));
        let field = format!("(doc #> {})", path);

        match &condition.predicate {
            Predicate::Compare { op: FilterOp::Eq, value } => {
                let v = self.param(SqlParam::Json(value.clone()));
                Ok(format!(
                    "({f} = {v}::jsonb OR (jsonb_typeof({f}) = 'array' AND {f} @> jsonb_build_array({v}::jsonb)))",
                    f = field,
                    v = v
                ))
            }
            Predicate::Compare { op: FilterOp::In, value } => {
                if !matches!(value, Value::Array(_)) {
                    return Err(FilterError::InvalidOperatorData("in requires a list".to_string()));
                }
                let v = self.param(SqlParam::Json(value.clone()));
                Ok(format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements({v}::jsonb) AS c(v) WHERE {f} = c.v OR (jsonb_typeof({f}) = 'array' AND {f} @> jsonb_build_array(c.v)))",
                    f = field,
                    v = v
                ))
            }
            Predicate::Compare { op, value } => {
                let v = self.param(SqlParam::Json(value.clone()));
                Ok(format!(
                    "(jsonb_typeof({f}) = jsonb_typeof({v}::jsonb) AND {f} {op} {v}::jsonb)",
                    f = field,
                    v = v,
                    op = op.to_sql()
                ))
            }
            Predicate::Within(region) => Ok(self.build_within(&field, region)),
        }
    }

    /// Haversine central angle between the stored point and the region center
    fn build_within(&mut self, field: &str, region: &Region) -> String {
        let lat = self.param(SqlParam::Float(region.center.latitude));
        let lng = self.param(SqlParam::Float(region.center.longitude));
        let radius = self.param(SqlParam::Float(region.radius));
        let point_lng = format!("(({} -> 'coordinates' ->> 0)::float8)", field);
        let point_lat = format!("(({} -> 'coordinates' ->> 1)::float8)", field);
        format!(
            "(jsonb_typeof({f} -> 'coordinates') = 'array' AND 2 * asin(sqrt(power(sin(radians({plat} - {lat}) / 2), 2) + cos(radians({lat})) * cos(radians({plat})) * power(sin(radians({plng} - {lng}) / 2), 2))) <= {r})",
            f = field,
            plat = point_lat,
            plng = point_lng,
            lat = lat,
            lng = lng,
            r = radius
        )
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}
