//! OData `$filter` / `$orderby` subset for directory objects.
//!
//! `displayName` maps to the resource name; every other field is looked up
//! in `properties`. Like `where`, an expression no pattern recognizes is
//! logged and ignored.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use mazure_core::Resource;

fn eq_string_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"^(\w+)\s+eq\s+'(.+)'").unwrap())
}

fn eq_bool_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)^(\w+)\s+eq\s+(true|false)").unwrap())
}

fn startswith_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)^startswith\((\w+),\s*'(.+)'\)").unwrap())
}

fn endswith_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)^endswith\((\w+),\s*'(.+)'\)").unwrap())
}

fn ne_null_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)^(\w+)\s+ne\s+null").unwrap())
}

/// A recognized `$filter` expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ODataFilter {
    Eq { field: String, value: String },
    EqBool { field: String, value: bool },
    StartsWith { field: String, prefix: String },
    /// Only `displayName` is supported; other fields don't parse.
    EndsWithName { suffix: String },
    NotNull { field: String },
}

impl ODataFilter {
    /// Try each pattern in priority order. `None` if nothing matched.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if let Some(c) = eq_string_regex().captures(expr) {
            return Some(Self::Eq {
                field: c[1].to_string(),
                value: c[2].to_string(),
            });
        }
        if let Some(c) = eq_bool_regex().captures(expr) {
            return Some(Self::EqBool {
                field: c[1].to_string(),
                value: c[2].eq_ignore_ascii_case("true"),
            });
        }
        if let Some(c) = startswith_regex().captures(expr) {
            return Some(Self::StartsWith {
                field: c[1].to_string(),
                prefix: c[2].to_string(),
            });
        }
        if let Some(c) = endswith_regex().captures(expr) {
            if &c[1] == "displayName" {
                return Some(Self::EndsWithName {
                    suffix: c[2].to_string(),
                });
            }
        }
        if let Some(c) = ne_null_regex().captures(expr) {
            return Some(Self::NotNull {
                field: c[1].to_string(),
            });
        }
        None
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        match self {
            Self::Eq { field, value } if field == "displayName" => resource.name == *value,
            Self::Eq { field, value } => {
                property(resource, field).and_then(Value::as_str) == Some(value.as_str())
            }
            Self::EqBool { field, value } => {
                property(resource, field).and_then(Value::as_bool) == Some(*value)
            }
            Self::StartsWith { field, prefix } => {
                let prefix = prefix.to_lowercase();
                let subject = if field == "displayName" {
                    Some(resource.name.as_str())
                } else {
                    property(resource, field).and_then(Value::as_str)
                };
                subject.map_or(false, |s| s.to_lowercase().starts_with(&prefix))
            }
            Self::EndsWithName { suffix } => resource
                .name
                .to_lowercase()
                .ends_with(&suffix.to_lowercase()),
            Self::NotNull { field } => property(resource, field).map_or(false, |v| !v.is_null()),
        }
    }
}

fn property<'a>(resource: &'a Resource, field: &str) -> Option<&'a Value> {
    resource.properties.get(field)
}

/// Apply a `$filter` expression. Unrecognized expressions return `rows` unchanged.
pub fn apply_filter(rows: Vec<Resource>, expr: &str) -> Vec<Resource> {
    match ODataFilter::parse(expr) {
        Some(filter) => rows.into_iter().filter(|r| filter.matches(r)).collect(),
        None => {
            tracing::warn!(filter = %expr, "Unsupported filter expression, returning rows unfiltered");
            rows
        }
    }
}

/// Apply `$orderby` (`field [asc|desc]`). Stable; default ascending.
pub fn apply_order_by(mut rows: Vec<Resource>, expr: &str) -> Vec<Resource> {
    let mut parts = expr.split_whitespace();
    let Some(field) = parts.next() else {
        return rows;
    };
    let descending = parts.next().map_or(false, |d| d.eq_ignore_ascii_case("desc"));

    let key = |r: &Resource| -> Option<Value> {
        if field == "displayName" {
            Some(Value::String(r.name.clone()))
        } else {
            property(r, field).cloned()
        }
    };

    rows.sort_by(|a, b| {
        let ord = compare_values(key(a).as_ref(), key(b).as_ref());
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    rows
}

/// Rank of a value's type in document-store sort order.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over optional JSON values: null/absent < numbers < strings
/// < objects < arrays < booleans, then by value within a type.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ (Value::Object(_) | Value::Array(_))), Some(y)) => x.to_string().cmp(&y.to_string()),
        _ => Ordering::Equal,
    }
}
