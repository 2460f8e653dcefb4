use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::filter::{Filter, FilterOp, FilterOrder};
use crate::query::descriptor::{default_sort, Param, QueryDescriptor, DEFAULT_LIMIT, DEFAULT_PAGE};

/// Keys that steer the query instead of filtering it
pub const RESERVED_KEYS: &[&str] = &["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub default_limit: u64,
    /// Upper bound on the effective limit, provided or defaulted; `None`
    /// leaves it uncapped
    pub max_limit: Option<u64>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: None,
        }
    }
}

/// Translate a raw query string (without the leading `?`)
pub fn translate_query_string(raw: Option<&str>, options: &QueryOptions) -> QueryDescriptor {
    let pairs = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes());
    translate(pairs, options)
}

/// Build a descriptor from decoded key/value pairs. Never fails: malformed
/// keys, unknown operators and unusable page/limit values fall back to
/// defaults. A repeated key keeps its last value.
pub fn translate<I, K, V>(pairs: I, options: &QueryOptions) -> QueryDescriptor
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut filters: BTreeMap<String, BTreeMap<FilterOp, Value>> = BTreeMap::new();
    let mut select = None;
    let mut sort = None;
    let mut page = None;
    let mut limit = None;

    for (key, value) in pairs {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            "select" => select = Some(value.to_string()),
            "sort" => sort = Some(value.to_string()),
            "page" => page = Some(value.to_string()),
            "limit" => limit = Some(value.to_string()),
            _ => {
                let Some((field, op)) = parse_filter_key(key) else {
                    tracing::debug!("Dropping query key '{}'", key);
                    continue;
                };
                filters
                    .entry(field.to_string())
                    .or_default()
                    .insert(op, coerce_operand(op, value));
            }
        }
    }

    let sort = sort
        .map(|s| FilterOrder::parse(&s))
        .filter(|fields| !fields.is_empty())
        .unwrap_or_else(default_sort);

    // A limit is always at least 1, whatever the configuration says
    let default_limit = options.default_limit.max(1);
    let max_limit = options.max_limit.map(|max| max.max(1));
    let limit = cap_limit(parse_positive(limit, default_limit), max_limit);

    QueryDescriptor {
        filters,
        sort,
        select: select.map(|s| split_list(&s)).unwrap_or_default(),
        page: parse_positive(page, DEFAULT_PAGE),
        limit,
        populate: vec![],
    }
}

/// `field` or `field[op]`; `None` for unknown operators and invalid field names
fn parse_filter_key(key: &str) -> Option<(&str, FilterOp)> {
    let (field, op) = match key.find('[') {
        None => (key, FilterOp::Eq),
        Some(open) => {
            let suffix = key[open + 1..].strip_suffix(']')?;
            (&key[..open], FilterOp::from_suffix(suffix)?)
        }
    };
    Filter::validate_field(field).ok()?;
    Some((field, op))
}

fn coerce_operand(op: FilterOp, raw: &str) -> Value {
    match op {
        FilterOp::In => Value::Array(split_list(raw).iter().map(|s| coerce_scalar(s)).collect()),
        _ => coerce_scalar(raw),
    }
}

/// Numbers and booleans become typed JSON; everything else stays a string.
/// Zero-padded digits such as postal codes are kept as text.
fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let digits = raw.trim_start_matches(['-', '+']);
    let zero_padded = digits.len() > 1 && digits.starts_with('0') && !digits[1..].starts_with('.');
    if raw.is_empty() || zero_padded || raw.trim() != raw {
        return Value::String(raw.to_string());
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    match raw.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) if raw.chars().all(|c| c.is_ascii_digit() || ".-+eE".contains(c)) => Value::Number(n),
        _ => Value::String(raw.to_string()),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive(raw: Option<String>, default: u64) -> Param<u64> {
    match raw {
        None => Param::omitted(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 => Param::Provided(n),
            _ => Param::Defaulted {
                value: default,
                rejected: Some(raw),
            },
        },
    }
}

/// Hold the limit to `max_limit`. A capped value is reported as defaulted,
/// keeping whatever the caller sent as the rejected text.
fn cap_limit(limit: Param<u64>, max_limit: Option<u64>) -> Param<u64> {
    let Some(max) = max_limit else {
        return limit;
    };
    if limit.get() <= max {
        return limit;
    }
    match limit {
        Param::Provided(requested) => {
            tracing::warn!("Limit {} exceeds maximum {}, using maximum", requested, max);
            Param::Defaulted {
                value: max,
                rejected: Some(requested.to_string()),
            }
        }
        Param::Defaulted { value, rejected } => {
            tracing::warn!("Default limit {} exceeds maximum {}, using maximum", value, max);
            Param::Defaulted { value: max, rejected }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortField;
    use serde_json::json;

    fn run(pairs: &[(&str, &str)]) -> QueryDescriptor {
        translate(pairs.iter().copied(), &QueryOptions::default())
    }

    #[test]
    fn operators_map_onto_typed_filters() {
        let d = run(&[("averageCost[lte]", "10000"), ("housing", "true"), ("careers[in]", "Business,UI/UX")]);
        assert_eq!(d.filters["averageCost"][&FilterOp::Lte], json!(10000));
        assert_eq!(d.filters["housing"][&FilterOp::Eq], json!(true));
        assert_eq!(d.filters["careers"][&FilterOp::In], json!(["Business", "UI/UX"]));
    }

    #[test]
    fn reserved_keys_never_become_filters() {
        let d = run(&[("select", "name,description"), ("sort", "name"), ("page", "2"), ("limit", "5")]);
        assert!(d.filters.is_empty());
        assert_eq!(d.select, vec!["name", "description"]);
        assert_eq!(d.sort, vec![SortField::asc("name")]);
        assert_eq!(d.page, Param::Provided(2));
        assert_eq!(d.limit, Param::Provided(5));
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let d = run(&[]);
        assert_eq!(d.page(), 1);
        assert_eq!(d.limit(), 100);
        assert_eq!(d.sort, vec![SortField::desc("createdAt")]);
        assert!(d.select.is_empty());
    }

    #[test]
    fn unusable_page_and_limit_fall_back_to_defaults() {
        let d = run(&[("page", "abc"), ("limit", "0")]);
        assert_eq!(d.page, Param::Defaulted { value: 1, rejected: Some("abc".into()) });
        assert_eq!(d.limit, Param::Defaulted { value: 100, rejected: Some("0".into()) });

        let d = run(&[("page", "-3"), ("limit", "2.5")]);
        assert_eq!(d.page(), 1);
        assert_eq!(d.limit(), 100);
    }

    #[test]
    fn unknown_operators_and_bad_fields_are_dropped() {
        let d = run(&[("tuition[regex]", "x"), ("name[gt", "a"), ("1abc", "z"), ("bad field", "q"), ("ok", "y")]);
        assert_eq!(d.filters.len(), 1);
        assert!(d.filters.contains_key("ok"));
    }

    #[test]
    fn later_values_override_earlier_ones() {
        let d = run(&[("tuition[gte]", "1"), ("tuition[gte]", "5"), ("limit", "3"), ("limit", "4")]);
        assert_eq!(d.filters["tuition"][&FilterOp::Gte], json!(5));
        assert_eq!(d.limit(), 4);
    }

    #[test]
    fn postal_codes_stay_textual() {
        let d = run(&[("location.zipcode", "02118"), ("weeks", "8"), ("name", "1 Code")]);
        assert_eq!(d.filters["location.zipcode"][&FilterOp::Eq], json!("02118"));
        assert_eq!(d.filters["weeks"][&FilterOp::Eq], json!(8));
        assert_eq!(d.filters["name"][&FilterOp::Eq], json!("1 Code"));
    }

    #[test]
    fn limit_is_capped_when_configured() {
        let options = QueryOptions {
            default_limit: 25,
            max_limit: Some(50),
        };
        let d = translate([("limit", "500")], &options);
        assert_eq!(d.limit, Param::Defaulted { value: 50, rejected: Some("500".into()) });
        let d = translate([("limit", "40")], &options);
        assert_eq!(d.limit, Param::Provided(40));
        let d = translate(Vec::<(String, String)>::new(), &options);
        assert_eq!(d.limit, Param::omitted(25));
    }

    #[test]
    fn capped_limit_survives_a_round_trip() {
        let options = QueryOptions {
            default_limit: 25,
            max_limit: Some(50),
        };
        let first = translate([("limit", "500")], &options);
        let again = translate(first.to_query_pairs(), &options);
        assert_eq!(first, again);
    }

    #[test]
    fn default_limit_above_maximum_is_capped() {
        let options = QueryOptions {
            default_limit: 100,
            max_limit: Some(30),
        };
        assert_eq!(translate(Vec::<(String, String)>::new(), &options).limit, Param::omitted(30));
        let d = translate([("limit", "nope")], &options);
        assert_eq!(d.limit, Param::Defaulted { value: 30, rejected: Some("nope".into()) });
    }

    #[test]
    fn zero_limits_from_configuration_become_one() {
        let zero_default = QueryOptions {
            default_limit: 0,
            max_limit: None,
        };
        assert_eq!(translate(Vec::<(String, String)>::new(), &zero_default).limit(), 1);

        let zero_max = QueryOptions {
            default_limit: 100,
            max_limit: Some(0),
        };
        let d = translate([("limit", "50")], &zero_max);
        assert_eq!(d.limit, Param::Defaulted { value: 1, rejected: Some("50".into()) });
    }

    #[test]
    fn uncapped_limit_is_honoured() {
        let d = run(&[("limit", "100000")]);
        assert_eq!(d.limit(), 100000);
    }

    #[test]
    fn parses_raw_query_strings() {
        let d = translate_query_string(
            Some("tuition%5Bgte%5D=1000&sort=-tuition&select=title,tuition"),
            &QueryOptions::default(),
        );
        assert_eq!(d.filters["tuition"][&FilterOp::Gte], json!(1000));
        assert_eq!(d.sort, vec![SortField::desc("tuition")]);
        assert_eq!(d.select, vec!["title", "tuition"]);
        assert_eq!(translate_query_string(None, &QueryOptions::default()), QueryDescriptor::default());
    }

    #[test]
    fn encoding_then_translating_is_stable() {
        let inputs: &[&[(&str, &str)]] = &[
            &[("tuition[gte]", "1000"), ("sort", "-tuition"), ("limit", "2"), ("page", "2")],
            &[("careers[in]", "Web Development,Business"), ("select", "name,careers"), ("housing", "false")],
            &[("averageRating[gt]", "7.5"), ("page", "oops"), ("location.state", "MA")],
            &[],
        ];
        for input in inputs {
            let first = run(input);
            let again = translate(first.to_query_pairs(), &QueryOptions::default());
            assert_eq!(first, again, "input {:?}", input);
            let encoded = first.to_query_string();
            let reparsed = translate_query_string(Some(&encoded), &QueryOptions::default());
            assert_eq!(first, reparsed, "query string {}", encoded);
        }
    }
}
