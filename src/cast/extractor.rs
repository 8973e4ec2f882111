//! Field extraction and row building.
//!
//! One field, one record in; a tagged outcome out. The `drop` policy has to
//! travel from deep inside path resolution up through the row and out of the
//! expander, so it is an explicit variant rather than a sentinel value, and
//! the `fail` policy is the `Err` side of the `Result`.

use crate::cast::error::CastError;
use crate::cast::path;
use crate::cast::plan::PreparedField;
use crate::cast::types::{MissingPolicy, Row};
use serde_json::Value;

/// Outcome of extracting one field from one record.
pub(crate) enum Extracted {
    Value(Value),
    /// Resolution failed under `ignore`; the caller inserts the prepared
    /// coalesce value.
    UseDefault,
    /// Resolution failed under `drop`; the whole row is discarded.
    DropRow,
}

pub(crate) fn extract_field(
    record: &Value,
    field: &PreparedField<'_>,
    row: &Row,
    first_column: &str,
) -> Result<Extracted, CastError> {
    // Whole-record passthrough.
    if field.is_root_only() {
        return Ok(Extracted::Value(field.spec.apply_convert(record.clone())));
    }

    match path::resolve(
        record,
        &field.segments,
        &field.location,
        field.spec.try_decode_string,
    ) {
        Ok(value) => Ok(Extracted::Value(field.spec.apply_convert(value.into_owned()))),
        Err(missing) => match field.spec.on_missing {
            MissingPolicy::Ignore => Ok(Extracted::UseDefault),
            MissingPolicy::Drop => Ok(Extracted::DropRow),
            MissingPolicy::Fail => Err(CastError::RequiredElementMissing {
                segment: missing.segment,
                location: missing.location,
                first_column: first_column.to_string(),
                context: row
                    .get(first_column)
                    .map(Value::to_string)
                    .unwrap_or_else(|| "null".to_string()),
            }),
        },
    }
}

/// Build one flat row from a record. `Ok(None)` means the row was dropped.
///
/// `extra` merges before field processing when `extra_first` (so field values
/// can overwrite extra keys) or after (extra data wins). The fan-out engine
/// front-loads the single-fields row into each nested row; caller extra data
/// merges after.
pub(crate) fn build_row(
    record: &Value,
    fields: &[PreparedField<'_>],
    extra: Option<&Row>,
    extra_first: bool,
) -> Result<Option<Row>, CastError> {
    let mut row = Row::new();

    // A schema whose fields all live under the fan-out anchor builds its
    // single-row from nothing.
    if fields.is_empty() {
        return Ok(Some(row));
    }

    if extra_first {
        if let Some(extra) = extra {
            merge(&mut row, extra);
        }
    }

    let first_column = fields[0].spec.column_name.as_str();

    for field in fields {
        match extract_field(record, field, &row, first_column)? {
            Extracted::Value(value) => {
                row.insert(field.spec.column_name.clone(), value);
            }
            Extracted::UseDefault => {
                row.insert(field.spec.column_name.clone(), field.coalesce.clone());
            }
            Extracted::DropRow => return Ok(None),
        }
    }

    if !extra_first {
        if let Some(extra) = extra {
            merge(&mut row, extra);
        }
    }

    Ok(Some(row))
}

fn merge(row: &mut Row, extra: &Row) {
    for (key, value) in extra {
        row.insert(key.clone(), value.clone());
    }
}
