//! Stage application over materialized rows.

use std::collections::HashMap;

use serde_json::{Map, Value};

use mazure_core::path::get_path;
use mazure_core::Row;

use crate::pipeline::{Condition, ExtendSource, Stage};

/// Apply one stage to the working set.
pub fn apply_stage(rows: Vec<Row>, stage: &Stage) -> Vec<Row> {
    match stage {
        Stage::Where(conditions) => conditions.iter().fold(rows, filter_where),
        Stage::Project(fields) => project(&rows, fields),
        Stage::Take(n) => take(rows, *n),
        Stage::Extend { name, source } => extend(rows, name, source),
        Stage::Count { by: Some(field) } => count_by(&rows, field),
        Stage::Count { by: None } => {
            let mut row = Map::new();
            row.insert("count".to_string(), Value::from(rows.len()));
            vec![row]
        }
        Stage::OrderBy { field, descending } => order_by(rows, field, *descending),
        Stage::Unknown(text) => {
            tracing::warn!(stage = %text, "Unsupported query stage, skipping");
            rows
        }
    }
}

/// Resolve a field on a row: an exact key first (projected rows carry
/// dotted keys verbatim), then a dotted path.
pub fn lookup<'a>(row: &'a Row, field: &str) -> Option<&'a Value> {
    row.get(field).or_else(|| {
        let (head, rest) = field.split_once('.')?;
        get_path(row.get(head)?, rest)
    })
}

fn str_field<'a>(row: &'a Row, field: &str) -> Option<&'a str> {
    row.get(field).and_then(Value::as_str)
}

/// Keep rows matching one `where` clause. Unsupported clauses pass everything through.
pub fn filter_where(rows: Vec<Row>, condition: &Condition) -> Vec<Row> {
    if let Condition::Unsupported(clause) = condition {
        tracing::warn!(%clause, "Unable to parse WHERE condition, passing rows through");
        return rows;
    }
    rows.into_iter().filter(|r| matches_condition(r, condition)).collect()
}

fn matches_condition(row: &Row, condition: &Condition) -> bool {
    match condition {
        Condition::TypeEqIgnoreCase(t) => {
            str_field(row, "type").map_or(false, |v| v.to_lowercase() == t.to_lowercase())
        }
        Condition::TypeEq(t) => str_field(row, "type") == Some(t.as_str()),
        Condition::LocationEq(l) => str_field(row, "location") == Some(l.as_str()),
        Condition::NameContains(s) => str_field(row, "name")
            .map_or(false, |n| n.to_lowercase().contains(&s.to_lowercase())),
        Condition::TagEq { key, value } => {
            row.get("tags")
                .and_then(|tags| tags.get(key))
                .and_then(Value::as_str)
                == Some(value.as_str())
        }
        Condition::Unsupported(_) => true,
    }
}

/// Rows containing exactly `fields`; missing paths become null.
pub fn project(rows: &[Row], fields: &[String]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            fields
                .iter()
                .map(|f| (f.clone(), lookup(row, f).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect()
}

pub fn take(mut rows: Vec<Row>, n: usize) -> Vec<Row> {
    rows.truncate(n);
    rows
}

fn extend(mut rows: Vec<Row>, name: &str, source: &ExtendSource) -> Vec<Row> {
    for row in &mut rows {
        let value = match source {
            ExtendSource::Tag(key) => row.get("tags").and_then(|tags| tags.get(key)).cloned(),
            ExtendSource::Property(path) => row
                .get("properties")
                .and_then(|props| get_path(props, path))
                .cloned(),
        };
        row.insert(name.to_string(), value.unwrap_or(Value::Null));
    }
    rows
}

/// `{field: value, count: n}` per distinct non-null value, in first-seen order.
pub fn count_by(rows: &[Row], field: &str) -> Vec<Row> {
    let mut groups: Vec<(Value, u64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in rows.iter().filter_map(|r| lookup(r, field)) {
        if value.is_null() {
            continue;
        }
        let key = value.to_string();
        match index.get(&key) {
            Some(&i) => groups[i].1 += 1,
            None => {
                index.insert(key, groups.len());
                groups.push((value.clone(), 1));
            }
        }
    }

    groups
        .into_iter()
        .map(|(value, count)| {
            let mut row = Map::new();
            row.insert(field.to_string(), value);
            row.insert("count".to_string(), Value::from(count));
            row
        })
        .collect()
}

/// Stable sort on the string form of `field` (missing sorts as `""`).
pub fn order_by(mut rows: Vec<Row>, field: &str, descending: bool) -> Vec<Row> {
    let sort_key = |row: &Row| match lookup(row, field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if descending {
        rows.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
    } else {
        rows.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        match v {
            Value::Object(map) => map,
            _ => unreachable!("test rows are objects"),
        }
    }

    fn sample() -> Vec<Row> {
        vec![
            row(json!({"name": "web-1", "type": "Microsoft.Compute/virtualMachines", "location": "eastus",
                       "tags": {"env": "prod"}, "properties": {"hardwareProfile": {"vmSize": "B2s"}}})),
            row(json!({"name": "db-1", "type": "microsoft.compute/virtualmachines", "location": "westus",
                       "tags": {"env": "dev"}, "properties": {}})),
            row(json!({"name": "WebStore", "type": "Microsoft.Storage/storageAccounts", "location": "eastus",
                       "tags": {}, "properties": {"sku": "Standard_LRS"}})),
        ]
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_type_match_respects_case_mode() {
        let ci = filter_where(
            sample(),
            &Condition::TypeEqIgnoreCase("MICROSOFT.COMPUTE/VIRTUALMACHINES".into()),
        );
        assert_eq!(names(&ci), vec!["web-1", "db-1"]);

        let cs = filter_where(sample(), &Condition::TypeEq("Microsoft.Compute/virtualMachines".into()));
        assert_eq!(names(&cs), vec!["web-1"]);
    }

    #[test]
    fn test_name_contains_is_case_insensitive() {
        let rows = filter_where(sample(), &Condition::NameContains("WEB".into()));
        assert_eq!(names(&rows), vec!["web-1", "WebStore"]);
    }

    #[test]
    fn test_tag_and_location_filters() {
        let rows = filter_where(
            sample(),
            &Condition::TagEq {
                key: "env".into(),
                value: "prod".into(),
            },
        );
        assert_eq!(names(&rows), vec!["web-1"]);

        let rows = filter_where(sample(), &Condition::LocationEq("eastus".into()));
        assert_eq!(names(&rows), vec!["web-1", "WebStore"]);
    }

    #[test]
    fn test_unsupported_clause_passes_through() {
        let rows = filter_where(sample(), &Condition::Unsupported("x > 1".into()));
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_project_emits_exact_fields_with_null_for_missing() {
        let rows = project(&sample(), &["name".into(), "properties.hardwareProfile.vmSize".into()]);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["properties.hardwareProfile.vmSize"], "B2s");
        assert_eq!(rows[1]["properties.hardwareProfile.vmSize"], Value::Null);
        assert_eq!(rows[2]["properties.hardwareProfile.vmSize"], Value::Null);
    }

    #[test]
    fn test_extend_overwrites_and_defaults_to_null() {
        let rows = apply_stage(
            sample(),
            &Stage::Extend {
                name: "env".into(),
                source: ExtendSource::Tag("env".into()),
            },
        );
        assert_eq!(rows[0]["env"], "prod");
        assert_eq!(rows[2]["env"], Value::Null);

        let rows = apply_stage(
            rows,
            &Stage::Extend {
                name: "name".into(),
                source: ExtendSource::Property("sku".into()),
            },
        );
        assert_eq!(rows[2]["name"], "Standard_LRS");
        assert_eq!(rows[0]["name"], Value::Null);
    }

    #[test]
    fn test_count_by_skips_null_and_keeps_first_seen_order() {
        let mut rows = sample();
        rows.push(row(json!({"name": "orphan", "location": null})));
        let counts = count_by(&rows, "location");
        assert_eq!(
            counts,
            vec![
                row(json!({"location": "eastus", "count": 2})),
                row(json!({"location": "westus", "count": 1})),
            ]
        );
    }

    #[test]
    fn test_bare_count_emits_single_row() {
        let rows = apply_stage(sample(), &Stage::Count { by: None });
        assert_eq!(rows, vec![row(json!({"count": 3}))]);
    }

    #[test]
    fn test_order_by_is_stable_and_missing_sorts_first() {
        let rows = vec![
            row(json!({"name": "b", "rank": "2"})),
            row(json!({"name": "a"})),
            row(json!({"name": "c", "rank": "1"})),
            row(json!({"name": "d", "rank": "1"})),
        ];
        let asc = order_by(rows.clone(), "rank", false);
        assert_eq!(names(&asc), vec!["a", "c", "d", "b"]);

        let desc = order_by(rows, "rank", true);
        assert_eq!(names(&desc), vec!["b", "c", "d", "a"]);
    }
}
