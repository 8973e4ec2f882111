//! Casting - map nested JSON records into flat tabular rows
//!
//! This module turns heterogeneous nested records into rows suitable for
//! relational stores: a path mini-language addresses values inside the
//! record, per-field policies decide what a missing value means, and one
//! nested list per schema may fan a record out into multiple rows.

pub mod error;
pub mod expander;
pub mod flatten;
pub mod path;
pub mod types;

pub(crate) mod extractor;
pub(crate) mod plan;

pub use error::CastError;
pub use expander::Smelter;
pub use flatten::{flatten_record, AutoFlatten, FlattenOptions};
pub use path::{parse_location, MissingElement, Segment};
pub use types::{ConvertFn, FieldSpec, MissingPolicy, Row};
