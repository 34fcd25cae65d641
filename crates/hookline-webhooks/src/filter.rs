//! Payload filter evaluation.
//!
//! Each endpoint owns zero or more filters; all active filters are
//! AND-combined. Evaluation is fail-closed: any filter that cannot be
//! evaluated (bad regex, type mismatch, missing field) counts as a
//! non-match rather than an error, so a misconfigured filter suppresses
//! delivery instead of crashing the pipeline.

use serde_json::Value;

use hookline_db::models::{EndpointFilter, FilterOperator};

/// Evaluate all filters against an event payload.
///
/// No active filters means the payload passes.
#[must_use]
pub fn evaluate_filters(filters: &[EndpointFilter], payload: &Value) -> bool {
    filters
        .iter()
        .filter(|f| f.active)
        .all(|f| evaluate_filter(f, payload))
}

/// Evaluate a single filter.
///
/// The raw operator result is compared against `include_on_match`:
/// with `include_on_match = false` the filter keeps payloads where the
/// predicate is false.
#[must_use]
pub fn evaluate_filter(filter: &EndpointFilter, payload: &Value) -> bool {
    let extracted = extract_path(payload, &filter.field_path);
    let raw = apply_operator(filter.operator, extracted, &filter.value);
    raw == filter.include_on_match
}

/// Walk a dot-separated path into the payload.
///
/// Returns `None` if any intermediate segment is missing or not an
/// object.
#[must_use]
pub fn extract_path<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = payload;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn apply_operator(operator: FilterOperator, extracted: Option<&Value>, expected: &Value) -> bool {
    match operator {
        FilterOperator::Exists => extracted.is_some(),
        FilterOperator::NotExists => extracted.is_none(),
        FilterOperator::Equals => extracted.is_some_and(|v| values_equal(v, expected)),
        FilterOperator::NotEquals => extracted.is_some_and(|v| !values_equal(v, expected)),
        FilterOperator::Contains => extracted.is_some_and(|v| contains(v, expected)),
        FilterOperator::NotContains => extracted.is_some_and(|v| !contains(v, expected)),
        FilterOperator::In => extracted.is_some_and(|v| in_set(v, expected)),
        FilterOperator::NotIn => extracted.is_some_and(|v| !in_set(v, expected)),
        FilterOperator::Gt => numeric_cmp(extracted, expected).is_some_and(|o| o > 0.0),
        FilterOperator::Lt => numeric_cmp(extracted, expected).is_some_and(|o| o < 0.0),
        FilterOperator::Gte => numeric_cmp(extracted, expected).is_some_and(|o| o >= 0.0),
        FilterOperator::Lte => numeric_cmp(extracted, expected).is_some_and(|o| o <= 0.0),
        FilterOperator::Regex => extracted.is_some_and(|v| regex_match(v, expected)),
    }
}

/// Loose equality: structural JSON equality, with a string-form
/// fallback so a configured `"100"` matches a payload `100`.
fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (scalar_string(a), scalar_string(b)) {
        (Some(sa), Some(sb)) => sa == sb,
        _ => false,
    }
}

/// String form of a scalar value; `None` for arrays and objects.
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

/// Substring match for strings, element match for arrays.
fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => scalar_string(needle).is_some_and(|n| s.contains(&n)),
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        _ => false,
    }
}

/// Membership of the extracted value in a configured value-set.
fn in_set(value: &Value, set: &Value) -> bool {
    match set {
        Value::Array(items) => items.iter().any(|item| values_equal(value, item)),
        _ => false,
    }
}

/// Difference `extracted - expected` when both parse as f64, else `None`
/// (which makes every numeric operator a non-match).
fn numeric_cmp(extracted: Option<&Value>, expected: &Value) -> Option<f64> {
    Some(as_f64(extracted?)? - as_f64(expected)?)
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Regex match on the string form of the extracted value. An invalid
/// pattern is a non-match, never an error.
fn regex_match(value: &Value, pattern: &Value) -> bool {
    let Some(pattern) = pattern.as_str() else {
        return false;
    };
    let Ok(re) = regex::Regex::new(pattern) else {
        return false;
    };
    scalar_string(value).is_some_and(|s| re.is_match(&s))
}
