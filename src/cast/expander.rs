//! The casting engine: schema lookup plus the one-to-many fan-out loop.

use crate::cast::error::CastError;
use crate::cast::extractor::build_row;
use crate::cast::flatten::{AutoFlatten, FlattenOptions};
use crate::cast::path::Segment;
use crate::cast::plan::TablePlan;
use crate::cast::types::{FieldSpec, Row};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Casts a fixed list of records against named table schemas.
///
/// Records and schemas are supplied at construction and read-only afterwards;
/// every call allocates fresh rows owned by the caller. Each call is
/// independent and reentrant.
///
/// ```rust
/// use smelter::{FieldSpec, Smelter};
/// use serde_json::json;
/// use std::collections::BTreeMap;
///
/// # fn main() -> anyhow::Result<()> {
/// let records = vec![json!({"id": 1, "items": [{"x": "a"}, {"x": "b"}]})];
///
/// let mut schemas = BTreeMap::new();
/// schemas.insert(
///     "orders".to_string(),
///     vec![
///         FieldSpec::new("root::id", "id"),
///         FieldSpec::new("root::items[]::x", "x"),
///     ],
/// );
///
/// let rows = Smelter::new(records, schemas).records("orders")?;
/// assert_eq!(rows.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Smelter {
    records: Vec<Value>,
    schemas: BTreeMap<String, Vec<FieldSpec>>,
}

impl Smelter {
    pub fn new(records: Vec<Value>, schemas: BTreeMap<String, Vec<FieldSpec>>) -> Self {
        Smelter { records, schemas }
    }

    /// Table names defined in the schema set.
    pub fn table_names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Cast every record against the named table.
    pub fn records(&self, table: &str) -> Result<Vec<Row>, CastError> {
        self.records_with(table, &Row::new())
    }

    /// Like [`records`](Self::records), with caller-supplied extra data merged
    /// into every produced row (extra data wins over same-named columns).
    ///
    /// A `fail`-policy field aborts the whole call: rows already built for
    /// earlier records are discarded, all-or-nothing.
    pub fn records_with(&self, table: &str, extra: &Row) -> Result<Vec<Row>, CastError> {
        let specs = self.specs(table)?;
        let plan = TablePlan::build(specs)?;
        expand(&self.records, &plan, extra)
    }

    /// Declared types by column name, in schema order. Columns whose spec
    /// carried no declared type are omitted.
    pub fn column_types(&self, table: &str) -> Result<Row, CastError> {
        let specs = self.specs(table)?;

        let mut types = Row::new();
        for spec in specs {
            if let Some(declared) = &spec.declared_type {
                types.insert(spec.column_name.clone(), declared.clone());
            }
        }
        Ok(types)
    }

    /// Schema-free best-effort flattening: one row per record, lazily, in
    /// input order. Never drops or fails.
    pub fn auto_flatten(&self, options: FlattenOptions) -> AutoFlatten<'_> {
        AutoFlatten::new(&self.records, options)
    }

    fn specs(&self, table: &str) -> Result<&[FieldSpec], CastError> {
        self.schemas
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| CastError::UnknownTable {
                table: table.to_string(),
                known: self.table_names(),
            })
    }
}

/// Expand each record into zero or more rows according to the plan.
fn expand(records: &[Value], plan: &TablePlan<'_>, extra: &Row) -> Result<Vec<Row>, CastError> {
    let mut out = Vec::new();
    let extra = (!extra.is_empty()).then_some(extra);

    for record in records {
        let single_row = build_row(record, &plan.single, extra, false)?;

        let Some(base) = &plan.base else {
            // No fan-out axis: at most one row per record.
            if let Some(row) = single_row {
                if !row.is_empty() {
                    out.push(row);
                }
            }
            continue;
        };

        let elements = locate_list(record, &base.segments);

        if elements.is_empty() {
            // Absent or empty list: one row from an empty element, so nested
            // columns coalesce and the single-field data survives.
            let empty = Value::Object(Map::new());
            match build_row(&empty, &plan.nested, single_row.as_ref(), true)? {
                Some(row) => {
                    if !row.is_empty() {
                        out.push(row);
                    }
                }
                // Dropped: skip this record entirely.
                None => continue,
            }
        } else {
            let mut produced = Vec::new();
            for element in elements {
                if let Some(row) = build_row(element, &plan.nested, single_row.as_ref(), true)? {
                    produced.push(row);
                }
            }

            if produced.is_empty() {
                // Every element row was dropped; keep the single-field data
                // if there is any.
                if let Some(row) = single_row {
                    if !row.is_empty() {
                        out.push(row);
                    }
                }
            } else {
                out.append(&mut produced);
            }
        }
    }

    Ok(out)
}

/// Walk the record down the fan-out base location to its target list.
/// Absent segments and non-list targets read as an empty list.
fn locate_list<'a>(record: &'a Value, segments: &[Segment]) -> &'a [Value] {
    let mut current = record;

    for segment in segments {
        let next = match segment {
            Segment::Root => continue,
            Segment::Key(name) | Segment::FanOut(name) => {
                current.as_object().and_then(|map| map.get(name.as_str()))
            }
            Segment::Index { key, index } => current
                .as_object()
                .and_then(|map| map.get(key.as_str()))
                .and_then(|list| list.as_array())
                .and_then(|items| items.get(*index)),
        };

        match next {
            Some(value) => current = value,
            None => return &[],
        }
    }

    current.as_array().map(Vec::as_slice).unwrap_or(&[])
}
