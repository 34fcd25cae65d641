//! Per-endpoint payload filter model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Comparison operator applied to the value at `field_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    In,
    NotIn,
    Gt,
    Lt,
    Gte,
    Lte,
    Regex,
    Exists,
    NotExists,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not_equals",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "not_contains",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::Regex => "regex",
            FilterOperator::Exists => "exists",
            FilterOperator::NotExists => "not_exists",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equals" => Ok(FilterOperator::Equals),
            "not_equals" => Ok(FilterOperator::NotEquals),
            "contains" => Ok(FilterOperator::Contains),
            "not_contains" => Ok(FilterOperator::NotContains),
            "in" => Ok(FilterOperator::In),
            "not_in" => Ok(FilterOperator::NotIn),
            "gt" => Ok(FilterOperator::Gt),
            "lt" => Ok(FilterOperator::Lt),
            "gte" => Ok(FilterOperator::Gte),
            "lte" => Ok(FilterOperator::Lte),
            "regex" => Ok(FilterOperator::Regex),
            "exists" => Ok(FilterOperator::Exists),
            "not_exists" => Ok(FilterOperator::NotExists),
            _ => Err(format!("Unknown filter operator: {s}")),
        }
    }
}

/// A predicate over an event payload gating delivery to one endpoint.
///
/// All active filters on an endpoint are AND-combined. When
/// `include_on_match` is false the predicate result is negated before
/// combining.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct EndpointFilter {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    /// Dot-separated path into the payload, e.g. `data.amount`.
    pub field_path: String,
    pub operator: FilterOperator,
    /// Comparison value; an array for `in` / `not_in`.
    pub value: serde_json::Value,
    pub include_on_match: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a filter.
#[derive(Debug, Clone)]
pub struct CreateFilter {
    pub endpoint_id: Uuid,
    pub field_path: String,
    pub operator: FilterOperator,
    pub value: serde_json::Value,
    pub include_on_match: bool,
}
