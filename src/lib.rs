//! # Smelter - schema-driven JSON tabulation
//!
//! A library for casting arbitrarily nested, heterogeneous JSON records into
//! flat tabular rows according to a declarative schema, with an optional
//! one-to-many fan-out over a single nested list per table.
//!
//! ## Quick Start
//!
//! ```rust
//! use smelter::{FieldSpec, Smelter};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> anyhow::Result<()> {
//! let records = vec![json!({
//!     "id": 1,
//!     "items": [{"x": "a"}, {"x": "b"}]
//! })];
//!
//! let mut schemas = BTreeMap::new();
//! schemas.insert(
//!     "orders".to_string(),
//!     vec![
//!         FieldSpec::new("root::id", "id"),
//!         FieldSpec::new("root::items[]::x", "x"),
//!     ],
//! );
//!
//! let smelter = Smelter::new(records, schemas);
//! let rows = smelter.records("orders")?;
//!
//! // Two rows, one per list element, sharing the flattened parent fields.
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0]["id"], 1);
//! assert_eq!(rows[0]["x"], "a");
//! assert_eq!(rows[1]["x"], "b");
//! # Ok(())
//! # }
//! ```
//!
//! ## Schema-free flattening
//!
//! ```rust
//! use smelter::{FlattenOptions, Smelter};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! let records = vec![json!({"a": {"b": {"c": 1}}})];
//! let smelter = Smelter::new(records, BTreeMap::new());
//!
//! let rows: Vec<_> = smelter.auto_flatten(FlattenOptions::default()).collect();
//! assert_eq!(rows[0]["a_b_c"], 1);
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::BufRead;

pub mod cast;

// Re-export commonly used types for convenience
pub use cast::{
    flatten_record, AutoFlatten, CastError, ConvertFn, FieldSpec, FlattenOptions, MissingElement,
    MissingPolicy, Row, Segment, Smelter,
};

/// Main entry point: read NDJSON records and cast them against one table.
pub fn cast_ndjson<R: BufRead>(
    reader: R,
    schemas: BTreeMap<String, Vec<FieldSpec>>,
    table: &str,
) -> Result<Vec<Row>> {
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).context("Failed to parse JSON")?;
        records.push(value);
    }

    let smelter = Smelter::new(records, schemas);
    let rows = smelter.records(table)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cast_ndjson() {
        let input = br#"{"id": 1, "items": [{"x": "a"}]}
{"id": 2, "items": [{"x": "b"}, {"x": "c"}]}
"#;

        let mut schemas = BTreeMap::new();
        schemas.insert(
            "orders".to_string(),
            vec![
                FieldSpec::new("root::id", "id"),
                FieldSpec::new("root::items[]::x", "x"),
            ],
        );

        let rows = cast_ndjson(&input[..], schemas, "orders").unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["x"], json!("a"));
        assert_eq!(rows[2]["id"], json!(2));
    }

    #[test]
    fn test_cast_ndjson_unknown_table() {
        let input = br#"{"id": 1}"#;
        let rows = cast_ndjson(&input[..], BTreeMap::new(), "orders");

        assert!(rows.is_err());
    }
}
