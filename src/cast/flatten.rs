//! Schema-free best-effort flattening.
//!
//! A convenience path for records nobody wrote a schema for: nested maps
//! collapse into `parent_child` columns, lists pass through (or stringify),
//! and nothing ever drops or fails.

use crate::cast::types::Row;
use serde_json::{Map, Value};

/// Options for schema-free flattening.
#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    /// Prepended to every column name.
    pub prefix: String,
    /// JSON-stringify list values instead of passing them through.
    pub stringify_lists: bool,
    /// Lowercase column names, prefix included.
    pub lowercase_keys: bool,
}

/// Lazy one-row-per-record flattening over an engine's record list.
///
/// Yields rows in input order; like any iterator it is finite and not
/// restartable once exhausted.
pub struct AutoFlatten<'a> {
    records: std::slice::Iter<'a, Value>,
    options: FlattenOptions,
}

impl<'a> AutoFlatten<'a> {
    pub(crate) fn new(records: &'a [Value], options: FlattenOptions) -> Self {
        AutoFlatten {
            records: records.iter(),
            options,
        }
    }
}

impl Iterator for AutoFlatten<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.records
            .next()
            .map(|record| flatten_record(record, &self.options))
    }
}

/// Flatten one record into a single-level row. Non-object records flatten to
/// an empty row.
pub fn flatten_record(record: &Value, options: &FlattenOptions) -> Row {
    let mut row = Row::new();
    if let Value::Object(map) = record {
        flatten_into(&mut row, map, &options.prefix, options);
    }
    row
}

fn flatten_into(row: &mut Row, map: &Map<String, Value>, prefix: &str, options: &FlattenOptions) {
    for (key, value) in map {
        let mut column = format!("{prefix}{key}");
        if options.lowercase_keys {
            column = column.to_lowercase();
        }

        match value {
            Value::Object(child) => {
                let child_prefix = format!("{column}_");
                flatten_into(row, child, &child_prefix, options);
            }
            Value::Array(items) => {
                if options.stringify_lists {
                    let text = serde_json::to_string(items).unwrap_or_default();
                    row.insert(column, Value::String(text));
                } else {
                    row.insert(column, value.clone());
                }
            }
            _ => {
                row.insert(column, value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_maps_collapse() {
        let row = flatten_record(&json!({"a": {"b": {"c": 1}}}), &FlattenOptions::default());

        assert_eq!(row.len(), 1);
        assert_eq!(row["a_b_c"], json!(1));
    }

    #[test]
    fn test_scalars_pass_through() {
        let row = flatten_record(
            &json!({"id": 1, "name": "Alice", "active": true}),
            &FlattenOptions::default(),
        );

        assert_eq!(row["id"], json!(1));
        assert_eq!(row["name"], json!("Alice"));
        assert_eq!(row["active"], json!(true));
    }

    #[test]
    fn test_lists_pass_through_by_default() {
        let row = flatten_record(&json!({"tags": ["a", "b"]}), &FlattenOptions::default());
        assert_eq!(row["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_stringify_lists() {
        let options = FlattenOptions {
            stringify_lists: true,
            ..FlattenOptions::default()
        };
        let row = flatten_record(&json!({"tags": ["a", "b"]}), &options);

        assert_eq!(row["tags"], json!("[\"a\",\"b\"]"));
    }

    #[test]
    fn test_stringify_applies_inside_nested_maps() {
        let options = FlattenOptions {
            stringify_lists: true,
            ..FlattenOptions::default()
        };
        let row = flatten_record(&json!({"outer": {"tags": [1, 2]}}), &options);

        assert_eq!(row["outer_tags"], json!("[1,2]"));
    }

    #[test]
    fn test_prefix_and_lowercase() {
        let options = FlattenOptions {
            prefix: "SRC_".to_string(),
            lowercase_keys: true,
            ..FlattenOptions::default()
        };
        let row = flatten_record(&json!({"Name": "Alice"}), &options);

        assert_eq!(row["src_name"], json!("Alice"));
    }

    #[test]
    fn test_non_object_record_yields_empty_row() {
        assert!(flatten_record(&json!(42), &FlattenOptions::default()).is_empty());
        assert!(flatten_record(&json!([1, 2]), &FlattenOptions::default()).is_empty());
    }

    #[test]
    fn test_iterator_is_lazy_and_ordered() {
        let records = vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})];
        let mut flat = AutoFlatten::new(&records, FlattenOptions::default());

        assert_eq!(flat.next().unwrap()["n"], json!(1));
        assert_eq!(flat.next().unwrap()["n"], json!(2));
        assert_eq!(flat.next().unwrap()["n"], json!(3));
        assert!(flat.next().is_none());
    }
}
