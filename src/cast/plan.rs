//! Pre-computed table plans.
//!
//! Before any record is touched, a schema's field specs are parsed once into
//! [`PreparedField`]s and partitioned into per-record ("single") and
//! per-list-element ("nested") groups. Fan-out base conflicts are schema
//! errors and are rejected here, before a single row is produced.

use crate::cast::error::CastError;
use crate::cast::path::{self, Segment};
use crate::cast::types::FieldSpec;
use serde_json::Value;
use std::collections::BTreeSet;

/// A field spec with its location parsed and its coalesce value converted.
///
/// The convert hook is pre-applied to the coalesce value exactly once per
/// call, so every missing case for the field sees the same default.
#[derive(Debug)]
pub(crate) struct PreparedField<'a> {
    pub spec: &'a FieldSpec,
    /// Location actually resolved: the fan-out anchor is stripped for nested
    /// fields, since they resolve against an individual list element.
    pub location: String,
    pub segments: Vec<Segment>,
    pub coalesce: Value,
}

impl<'a> PreparedField<'a> {
    fn new(spec: &'a FieldSpec, strip_anchor: Option<&str>) -> Self {
        let location = match strip_anchor {
            Some(anchor) => spec.location.replace(anchor, ""),
            None => spec.location.clone(),
        };
        let segments = path::parse_location(&location, &spec.delimiter);
        let coalesce = spec.apply_convert(spec.coalesce_value.clone());

        PreparedField {
            spec,
            location,
            segments,
            coalesce,
        }
    }

    /// Whole-record passthrough: the path is the single `root` segment.
    pub fn is_root_only(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::Root])
    }
}

/// Everything the expander needs to know about one table, derived from its
/// schema up front.
#[derive(Debug)]
pub(crate) struct TablePlan<'a> {
    pub single: Vec<PreparedField<'a>>,
    pub nested: Vec<PreparedField<'a>>,
    pub base: Option<FanOutBase>,
}

/// The one-to-many expansion axis shared by all nested fields of a schema.
#[derive(Debug)]
pub(crate) struct FanOutBase {
    /// Segments walked down the record to reach the target list.
    pub segments: Vec<Segment>,
    /// `base + "[]" + delimiter`, stripped from nested locations before they
    /// resolve against a list element.
    pub anchor: String,
}

impl<'a> TablePlan<'a> {
    pub fn build(specs: &'a [FieldSpec]) -> Result<Self, CastError> {
        let mut single_specs = Vec::new();
        let mut nested_specs = Vec::new();
        let mut bases = BTreeSet::new();
        let mut base_delimiter: Option<&str> = None;

        for spec in specs {
            let segments = path::parse_location(&spec.location, &spec.delimiter);
            if segments.iter().any(Segment::is_fan_out) {
                if let Some(idx) = spec.location.find("[]") {
                    bases.insert(spec.location[..idx].to_string());
                }
                base_delimiter = Some(spec.delimiter.as_str());
                nested_specs.push(spec);
            } else {
                single_specs.push(spec);
            }
        }

        if bases.len() > 1 {
            return Err(CastError::MultipleFanOutBases {
                bases: bases.into_iter().collect(),
            });
        }

        let base = bases.into_iter().next().map(|base_location| {
            let delimiter = base_delimiter.unwrap_or("::");
            FanOutBase {
                segments: path::parse_location(&base_location, delimiter),
                anchor: format!("{base_location}[]{delimiter}"),
            }
        });

        let anchor = base.as_ref().map(|base| base.anchor.as_str());

        Ok(TablePlan {
            single: single_specs
                .into_iter()
                .map(|spec| PreparedField::new(spec, None))
                .collect(),
            nested: nested_specs
                .into_iter()
                .map(|spec| PreparedField::new(spec, anchor))
                .collect(),
            base,
        })
    }
}
