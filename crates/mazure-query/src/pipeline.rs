//! Query text parsing: `Table | stage | stage ...`.
//!
//! Parsing never fails on stage syntax. Anything that doesn't fit one of the
//! supported shapes becomes a no-op (`Stage::Unknown`, or
//! `Condition::Unsupported` inside a `where`), so callers relying on lenient
//! pass-through keep working. Only the table name is strict.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::QueryError;

/// The collection a query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Resources,
    ResourceContainers,
}

impl Table {
    fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("Resources") {
            Some(Self::Resources)
        } else if name.eq_ignore_ascii_case("ResourceContainers") {
            Some(Self::ResourceContainers)
        } else {
            None
        }
    }
}

/// One `where` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `type =~ 'X'`
    TypeEqIgnoreCase(String),
    /// `type == 'X'`
    TypeEq(String),
    /// `location == 'X'`
    LocationEq(String),
    /// `name contains 'X'`
    NameContains(String),
    /// `tags['k'] == 'v'`
    TagEq { key: String, value: String },
    /// Clause text no pattern recognized. Applied as a pass-through.
    Unsupported(String),
}

/// Source expression of an `extend` stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendSource {
    /// `tags['k']`
    Tag(String),
    /// `properties.a.b`, stored without the `properties.` prefix.
    Property(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Where(Vec<Condition>),
    Project(Vec<String>),
    Take(usize),
    Extend { name: String, source: ExtendSource },
    /// `summarize count() by field`, or bare `summarize count()` when `by` is `None`.
    Count { by: Option<String> },
    OrderBy { field: String, descending: bool },
    Unknown(String),
}

/// A parsed query: table plus stages, applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPipeline {
    pub table: Table,
    pub stages: Vec<Stage>,
}

impl QueryPipeline {
    /// Parse query text.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidQuery` if the leading table is not
    /// `Resources` or `ResourceContainers`.
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let mut segments = text.split('|').map(str::trim);
        let table_name = segments
            .next()
            .and_then(|head| head.split_whitespace().next())
            .unwrap_or_default();

        let table = Table::from_name(table_name).ok_or_else(|| {
            QueryError::InvalidQuery(format!("Unsupported query table: {table_name}"))
        })?;

        Ok(Self {
            table,
            stages: segments.map(Stage::parse).collect(),
        })
    }
}

impl Stage {
    /// Classify one `|`-segment by its leading keyword (case-insensitive).
    pub fn parse(segment: &str) -> Self {
        if let Some(rest) = strip_keyword(segment, "where") {
            return Self::Where(parse_conditions(rest));
        }
        if let Some(rest) = strip_keyword(segment, "project") {
            let fields = rest
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
            return Self::Project(fields);
        }
        if let Some(rest) = strip_keyword(segment, "take").or_else(|| strip_keyword(segment, "limit")) {
            return match digits_regex().find(rest).and_then(|m| m.as_str().parse().ok()) {
                Some(n) => Self::Take(n),
                None => Self::Unknown(segment.to_string()),
            };
        }
        if let Some(rest) = strip_keyword(segment, "extend") {
            return parse_extend(rest).unwrap_or_else(|| Self::Unknown(segment.to_string()));
        }
        if let Some(rest) = strip_keyword(segment, "summarize") {
            return parse_summarize(rest).unwrap_or_else(|| Self::Unknown(segment.to_string()));
        }
        if let Some(rest) = strip_keyword(segment, "order by").or_else(|| strip_keyword(segment, "sort by")) {
            return parse_order_by(rest).unwrap_or_else(|| Self::Unknown(segment.to_string()));
        }
        Self::Unknown(segment.to_string())
    }
}

fn strip_keyword<'a>(segment: &'a str, keyword: &str) -> Option<&'a str> {
    let head = segment.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| segment[keyword.len()..].trim())
}

// ── where ────────────────────────────────────────────────────────

type ConditionBuilder = fn(&Captures<'_>) -> Condition;

/// Clause patterns, tried top to bottom; the first match wins.
fn condition_table() -> &'static [(Regex, ConditionBuilder)] {
    static INSTANCE: OnceLock<Vec<(Regex, ConditionBuilder)>> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let table: [(&str, ConditionBuilder); 5] = [
            (r#"\btype\s*=~\s*['"](.+?)['"]"#, |c| {
                Condition::TypeEqIgnoreCase(c[1].to_string())
            }),
            (r#"\btype\s*==\s*['"](.+?)['"]"#, |c| Condition::TypeEq(c[1].to_string())),
            (r#"\blocation\s*==\s*['"](.+?)['"]"#, |c| {
                Condition::LocationEq(c[1].to_string())
            }),
            (r#"(?i)\bname\s+contains\s+['"](.+?)['"]"#, |c| {
                Condition::NameContains(c[1].to_string())
            }),
            (r#"\btags\[['"]([^'"]+)['"]\]\s*==\s*['"](.+?)['"]"#, |c| Condition::TagEq {
                key: c[1].to_string(),
                value: c[2].to_string(),
            }),
        ];
        table
            .into_iter()
            .map(|(pattern, build)| (Regex::new(pattern).unwrap(), build))
            .collect()
    })
}

fn and_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)\s+and\s+").unwrap())
}

/// Split on `and` and classify each clause.
pub fn parse_conditions(text: &str) -> Vec<Condition> {
    and_regex()
        .split(text)
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(parse_condition)
        .collect()
}

fn parse_condition(clause: &str) -> Condition {
    condition_table()
        .iter()
        .find_map(|(pattern, build)| pattern.captures(clause).map(|c| build(&c)))
        .unwrap_or_else(|| Condition::Unsupported(clause.to_string()))
}

// ── take / extend / summarize / order by ─────────────────────────

fn digits_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn extend_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"^(\w+)\s*=\s*(.+)$").unwrap())
}

fn tag_ref_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r#"tags\[['"]([^'"]+)['"]\]"#).unwrap())
}

fn property_ref_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"properties\.([\w.]+)").unwrap())
}

fn summarize_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)^count\(\)(?:\s+by\s+([\w.]+))?\s*$").unwrap())
}

fn order_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)^([\w.]+)(?:\s+(asc|desc))?").unwrap())
}

fn parse_extend(text: &str) -> Option<Stage> {
    let caps = extend_regex().captures(text)?;
    let name = caps[1].to_string();
    let expr = &caps[2];

    let source = if let Some(tag) = tag_ref_regex().captures(expr) {
        ExtendSource::Tag(tag[1].to_string())
    } else {
        let prop = property_ref_regex().captures(expr)?;
        ExtendSource::Property(prop[1].to_string())
    };
    Some(Stage::Extend { name, source })
}

fn parse_summarize(text: &str) -> Option<Stage> {
    let caps = summarize_regex().captures(text)?;
    Some(Stage::Count {
        by: caps.get(1).map(|m| m.as_str().to_string()),
    })
}

fn parse_order_by(text: &str) -> Option<Stage> {
    let caps = order_regex().captures(text)?;
    let descending = caps
        .get(2)
        .map_or(false, |d| d.as_str().eq_ignore_ascii_case("desc"));
    Some(Stage::OrderBy {
        field: caps[1].to_string(),
        descending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_table_and_stages_in_order() {
        let p = QueryPipeline::parse(
            "Resources | where type =~ 'Microsoft.Compute/virtualMachines' | project name, properties.sku | take 2",
        )
        .unwrap();
        assert_eq!(p.table, Table::Resources);
        assert_eq!(
            p.stages,
            vec![
                Stage::Where(vec![Condition::TypeEqIgnoreCase(
                    "Microsoft.Compute/virtualMachines".into()
                )]),
                Stage::Project(vec!["name".into(), "properties.sku".into()]),
                Stage::Take(2),
            ]
        );
    }

    #[test]
    fn test_table_name_is_case_insensitive_and_strict() {
        assert_eq!(
            QueryPipeline::parse("resourcecontainers").unwrap().table,
            Table::ResourceContainers
        );
        let err = QueryPipeline::parse("AdvisorResources | take 1").unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(msg) if msg.contains("AdvisorResources")));
        assert!(QueryPipeline::parse("").is_err());
    }

    #[test]
    fn test_where_clauses_follow_pattern_priority() {
        assert_eq!(
            parse_conditions("type == 'A' and location == 'eastus' AND name contains 'web'"),
            vec![
                Condition::TypeEq("A".into()),
                Condition::LocationEq("eastus".into()),
                Condition::NameContains("web".into()),
            ]
        );
        assert_eq!(
            parse_conditions("tags['cost-center'] == \"42\""),
            vec![Condition::TagEq {
                key: "cost-center".into(),
                value: "42".into()
            }]
        );
        assert_eq!(
            parse_conditions("sku.tier startswith 'Prem'"),
            vec![Condition::Unsupported("sku.tier startswith 'Prem'".into())]
        );
    }

    #[test]
    fn test_resource_type_field_is_not_mistaken_for_type() {
        assert_eq!(
            parse_conditions("resource_type == 'x'"),
            vec![Condition::Unsupported("resource_type == 'x'".into())]
        );
    }

    #[test]
    fn test_take_uses_first_integer_and_limit_is_an_alias() {
        assert_eq!(Stage::parse("limit 5 rows or 7"), Stage::Take(5));
        assert_eq!(Stage::parse("TAKE 3"), Stage::Take(3));
        assert!(matches!(Stage::parse("take all"), Stage::Unknown(_)));
    }

    #[test]
    fn test_extend_recognizes_tags_and_properties() {
        assert_eq!(
            Stage::parse("extend env = tags['environment']"),
            Stage::Extend {
                name: "env".into(),
                source: ExtendSource::Tag("environment".into())
            }
        );
        assert_eq!(
            Stage::parse("extend size = properties.hardwareProfile.vmSize"),
            Stage::Extend {
                name: "size".into(),
                source: ExtendSource::Property("hardwareProfile.vmSize".into())
            }
        );
        assert!(matches!(Stage::parse("extend x = strlen(name)"), Stage::Unknown(_)));
    }

    #[test]
    fn test_summarize_and_order_by_forms() {
        assert_eq!(
            Stage::parse("summarize count() by type"),
            Stage::Count { by: Some("type".into()) }
        );
        assert_eq!(Stage::parse("summarize count()"), Stage::Count { by: None });
        assert!(matches!(Stage::parse("summarize avg(x) by type"), Stage::Unknown(_)));

        assert_eq!(
            Stage::parse("order by name desc"),
            Stage::OrderBy {
                field: "name".into(),
                descending: true
            }
        );
        assert_eq!(
            Stage::parse("sort by location"),
            Stage::OrderBy {
                field: "location".into(),
                descending: false
            }
        );
    }

    #[test]
    fn test_unknown_keywords_are_kept_as_no_ops() {
        assert_eq!(
            Stage::parse("mv-expand tags"),
            Stage::Unknown("mv-expand tags".into())
        );
    }
}
