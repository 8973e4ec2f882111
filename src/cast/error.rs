use thiserror::Error;

/// Errors surfaced by the casting engine.
///
/// Row drops and coalesced defaults are not errors: a `drop` outcome is
/// internal control flow (`Ok(None)` from the row builder) and `ignore`
/// recovers locally with the coalesce value.
#[derive(Debug, Error)]
pub enum CastError {
    /// Requested table name has no schema.
    #[error("table `{table}` is not defined in the schema set; known tables: {known:?}")]
    UnknownTable { table: String, known: Vec<String> },

    /// A schema referenced more than one distinct `name[]` base location.
    /// Only one fan-out axis per table is supported.
    #[error("multiple fan-out base locations in one schema are not supported; found {bases:?}")]
    MultipleFanOutBases { bases: Vec<String> },

    /// A field with the `fail` policy could not be resolved. Carries the
    /// offending segment, the full location, and the first column's current
    /// partial value for debugging.
    #[error(
        "required element `{segment}` does not exist in `{location}`; \
         first column is `{first_column}`, data is {context}"
    )]
    RequiredElementMissing {
        segment: String,
        location: String,
        first_column: String,
        context: String,
    },
}
