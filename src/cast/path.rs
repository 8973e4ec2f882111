//! The path mini-language: `root::user::payments[0]::amount`.
//!
//! A location string splits on the spec's delimiter into segments, each of
//! which is a plain key, a fixed list index (`name[i]`), or the fan-out
//! marker (`name[]`). Walking keeps a cursor over the record and halts with
//! [`MissingElement`] the moment a segment cannot be resolved; what happens
//! then is the field's missing-value policy, not the resolver's business.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Leading segment naming the whole record.
pub const ROOT: &str = "root";

static INDEXED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<key>[^\[\]]+)\[(?P<index>[0-9]+)\]$").unwrap());

static FANOUT_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<key>[^\[\]]+)\[\]$").unwrap());

/// One parsed segment of a location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// The whole record; a no-op during traversal.
    Root,
    /// Plain key lookup on a map-like value.
    Key(String),
    /// Key lookup, then a fixed index into the resulting list.
    Index { key: String, index: usize },
    /// `name[]`: marks the fan-out anchor. Its presence in a schema, not its
    /// resolution, is what identifies the expansion axis.
    FanOut(String),
}

impl Segment {
    pub fn is_fan_out(&self) -> bool {
        matches!(self, Segment::FanOut(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Root => write!(f, "{ROOT}"),
            Segment::Key(key) => write!(f, "{key}"),
            Segment::Index { key, index } => write!(f, "{key}[{index}]"),
            Segment::FanOut(key) => write!(f, "{key}[]"),
        }
    }
}

/// Signal that a segment could not be resolved against the current value.
/// Carries the offending segment and the full path for diagnostics.
#[derive(Debug, Clone)]
pub struct MissingElement {
    pub segment: String,
    pub location: String,
}

/// Split a location string into classified segments.
pub fn parse_location(location: &str, delimiter: &str) -> Vec<Segment> {
    location
        .split(delimiter)
        .map(|piece| {
            if piece == ROOT {
                Segment::Root
            } else if let Some(caps) = INDEXED_SEGMENT.captures(piece) {
                Segment::Index {
                    key: caps["key"].to_string(),
                    // An index too large for usize can never be in range.
                    index: caps["index"].parse().unwrap_or(usize::MAX),
                }
            } else if let Some(caps) = FANOUT_SEGMENT.captures(piece) {
                Segment::FanOut(caps["key"].to_string())
            } else {
                Segment::Key(piece.to_string())
            }
        })
        .collect()
}

/// Walk `record` down `segments`, returning the value at the end of the path.
///
/// A string cursor is decoded as JSON before lookup when `decode_strings` is
/// set; an undecodable string counts as missing. Explicit nulls count as
/// missing too, so coalesce policies apply to them. The cursor stays borrowed
/// until a decode forces an owned value.
pub fn resolve<'a>(
    record: &'a Value,
    segments: &[Segment],
    location: &str,
    decode_strings: bool,
) -> Result<Cow<'a, Value>, MissingElement> {
    let mut current: Cow<'a, Value> = Cow::Borrowed(record);

    for segment in segments {
        current = match segment {
            Segment::Root => current,
            Segment::Key(name) | Segment::FanOut(name) => {
                let cursor = maybe_decode(current, decode_strings, segment, location)?;
                descend(cursor, segment, location, |value| {
                    value.as_object().and_then(|map| map.get(name.as_str()))
                })?
            }
            Segment::Index { key, index } => {
                let cursor = maybe_decode(current, decode_strings, segment, location)?;
                descend(cursor, segment, location, |value| {
                    value
                        .as_object()
                        .and_then(|map| map.get(key.as_str()))
                        .and_then(|list| list.as_array())
                        .and_then(|items| items.get(*index))
                })?
            }
        };
    }

    Ok(current)
}

fn missing(segment: &Segment, location: &str) -> MissingElement {
    MissingElement {
        segment: segment.to_string(),
        location: location.to_string(),
    }
}

fn maybe_decode<'a>(
    current: Cow<'a, Value>,
    decode_strings: bool,
    segment: &Segment,
    location: &str,
) -> Result<Cow<'a, Value>, MissingElement> {
    if !decode_strings {
        return Ok(current);
    }
    if let Value::String(text) = &*current {
        return match serde_json::from_str::<Value>(text) {
            Ok(decoded) => Ok(Cow::Owned(decoded)),
            Err(_) => Err(missing(segment, location)),
        };
    }
    Ok(current)
}

fn descend<'a>(
    current: Cow<'a, Value>,
    segment: &Segment,
    location: &str,
    lookup: impl Fn(&Value) -> Option<&Value>,
) -> Result<Cow<'a, Value>, MissingElement> {
    let child = match current {
        Cow::Borrowed(value) => lookup(value).map(Cow::Borrowed),
        Cow::Owned(value) => lookup(&value).map(|child| Cow::Owned(child.clone())),
    };

    match child {
        Some(child) if !child.is_null() => Ok(child),
        _ => Err(missing(segment, location)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve_str(record: &Value, location: &str) -> Result<Value, MissingElement> {
        let segments = parse_location(location, "::");
        resolve(record, &segments, location, true).map(Cow::into_owned)
    }

    #[test]
    fn test_parse_classification() {
        let segments = parse_location("root::payments[0]::items[]::x", "::");

        assert_eq!(segments[0], Segment::Root);
        assert_eq!(
            segments[1],
            Segment::Index {
                key: "payments".to_string(),
                index: 0
            }
        );
        assert_eq!(segments[2], Segment::FanOut("items".to_string()));
        assert_eq!(segments[3], Segment::Key("x".to_string()));
    }

    #[test]
    fn test_parse_custom_delimiter() {
        let segments = parse_location("root.user.name", ".");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], Segment::Key("user".to_string()));
    }

    #[test]
    fn test_resolve_nested_keys() {
        let record = json!({"user": {"name": "Alice"}});
        assert_eq!(resolve_str(&record, "root::user::name").unwrap(), json!("Alice"));
    }

    #[test]
    fn test_resolve_indexed_list() {
        let record = json!({"payments": [{"amount": 10}, {"amount": 20}]});
        assert_eq!(
            resolve_str(&record, "root::payments[1]::amount").unwrap(),
            json!(20)
        );
    }

    #[test]
    fn test_index_out_of_range_is_missing() {
        let record = json!({"payments": [{"amount": 10}]});
        let err = resolve_str(&record, "root::payments[5]::amount").unwrap_err();

        assert_eq!(err.segment, "payments[5]");
        assert_eq!(err.location, "root::payments[5]::amount");
    }

    #[test]
    fn test_missing_key_reports_segment() {
        let record = json!({"user": {"name": "Alice"}});
        let err = resolve_str(&record, "root::user::email").unwrap_err();

        assert_eq!(err.segment, "email");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let record = json!({"user": null});
        assert!(resolve_str(&record, "root::user").is_err());
    }

    #[test]
    fn test_decodes_json_strings_mid_path() {
        let record = json!({"payload": "{\"inner\": 42}"});
        assert_eq!(resolve_str(&record, "root::payload::inner").unwrap(), json!(42));
    }

    #[test]
    fn test_undecodable_string_is_missing() {
        let record = json!({"payload": "not json at all"});
        assert!(resolve_str(&record, "root::payload::inner").is_err());
    }

    #[test]
    fn test_decoding_disabled_treats_string_as_leaf() {
        let record = json!({"payload": "{\"inner\": 42}"});
        let segments = parse_location("root::payload::inner", "::");

        assert!(resolve(&record, &segments, "root::payload::inner", false).is_err());
    }

    #[test]
    fn test_traversal_into_scalar_is_missing() {
        let record = json!({"user": 7});
        assert!(resolve_str(&record, "root::user::name").is_err());
    }
}
