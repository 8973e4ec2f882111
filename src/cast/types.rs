use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A flat output row: column name to value, in insertion order.
pub type Row = Map<String, Value>;

/// Conversion hook applied to a field's final value and, once per call, to its
/// coalesce value.
pub type ConvertFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// What to do when a field's location cannot be resolved in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Raise a required-element error, aborting the whole call.
    Fail,
    /// Substitute the coalesce value and keep going.
    #[default]
    Ignore,
    /// Silently discard the entire row.
    Drop,
}

/// Declarative description of one output column: where to find the value in a
/// record, what to call it, and what to do when it isn't there.
///
/// Locations are delimited paths starting at `root`, e.g. `root::user::name`.
/// A segment may index into a list (`payments[0]`) or mark the single fan-out
/// axis of a schema (`items[]`).
#[derive(Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Delimited path to the value, `root`-relative.
    pub location: String,

    /// Output column name. Later duplicates within a schema overwrite earlier
    /// ones, so keep column names unique for deterministic output.
    pub column_name: String,

    /// Default substituted under the `ignore` policy.
    #[serde(default)]
    pub coalesce_value: Value,

    #[serde(default)]
    pub on_missing: MissingPolicy,

    /// Attempt to parse string values as JSON before descending further.
    #[serde(default = "default_decode")]
    pub try_decode_string: bool,

    /// Path segment separator.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Applied to the final value and pre-applied to `coalesce_value`.
    /// Code, not config: skipped by serde.
    #[serde(skip)]
    pub convert: Option<ConvertFn>,

    /// Opaque tag surfaced by `column_types`; no runtime effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<Value>,
}

fn default_decode() -> bool {
    true
}

fn default_delimiter() -> String {
    String::from("::")
}

impl FieldSpec {
    pub fn new(location: impl Into<String>, column_name: impl Into<String>) -> Self {
        FieldSpec {
            location: location.into(),
            column_name: column_name.into(),
            coalesce_value: Value::Null,
            on_missing: MissingPolicy::default(),
            try_decode_string: default_decode(),
            delimiter: default_delimiter(),
            convert: None,
            declared_type: None,
        }
    }

    pub fn with_coalesce(mut self, value: impl Into<Value>) -> Self {
        self.coalesce_value = value.into();
        self
    }

    pub fn with_policy(mut self, policy: MissingPolicy) -> Self {
        self.on_missing = policy;
        self
    }

    pub fn with_string_decoding(mut self, decode: bool) -> Self {
        self.try_decode_string = decode;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_convert(mut self, convert: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.convert = Some(Arc::new(convert));
        self
    }

    pub fn with_declared_type(mut self, declared_type: impl Into<Value>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// Run the value through the convert hook, if one is set.
    pub fn apply_convert(&self, value: Value) -> Value {
        match &self.convert {
            Some(convert) => convert(value),
            None => value,
        }
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("location", &self.location)
            .field("column_name", &self.column_name)
            .field("coalesce_value", &self.coalesce_value)
            .field("on_missing", &self.on_missing)
            .field("try_decode_string", &self.try_decode_string)
            .field("delimiter", &self.delimiter)
            .field("convert", &self.convert.as_ref().map(|_| "<fn>"))
            .field("declared_type", &self.declared_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let spec = FieldSpec::new("root::id", "id");

        assert_eq!(spec.on_missing, MissingPolicy::Ignore);
        assert_eq!(spec.coalesce_value, Value::Null);
        assert!(spec.try_decode_string);
        assert_eq!(spec.delimiter, "::");
        assert!(spec.convert.is_none());
        assert!(spec.declared_type.is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let spec: FieldSpec =
            serde_json::from_value(json!({"location": "root::id", "column_name": "id"})).unwrap();

        assert_eq!(spec.location, "root::id");
        assert_eq!(spec.on_missing, MissingPolicy::Ignore);
        assert!(spec.try_decode_string);
        assert_eq!(spec.delimiter, "::");
    }

    #[test]
    fn test_deserialize_policy_names() {
        let spec: FieldSpec = serde_json::from_value(json!({
            "location": "root::id",
            "column_name": "id",
            "on_missing": "drop",
            "coalesce_value": 0,
            "declared_type": "BIGINT"
        }))
        .unwrap();

        assert_eq!(spec.on_missing, MissingPolicy::Drop);
        assert_eq!(spec.coalesce_value, json!(0));
        assert_eq!(spec.declared_type, Some(json!("BIGINT")));
    }

    #[test]
    fn test_convert_hook() {
        let spec = FieldSpec::new("root::id", "id")
            .with_convert(|v| json!(format!("#{}", v)));

        assert_eq!(spec.apply_convert(json!(7)), json!("#7"));
    }
}
