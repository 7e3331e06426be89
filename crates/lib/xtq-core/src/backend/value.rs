use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::Value;

const NDARRAY_TAG: &str = "__ndarray__";
const DATE_TAG: &str = "__date__";
const REPR_TAG: &str = "__repr__";

/// A value produced by a backend before it is made transport-safe.
///
/// Besides the JSON primitives this carries the non-JSON shapes native
/// market-data libraries hand back: dense numeric arrays, calendar values,
/// and opaque objects that only have a printable form.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Dense numeric array; `NaN` marks missing samples.
    Array(Vec<f64>),
    List(Vec<BackendValue>),
    Map(IndexMap<String, BackendValue>),
    Opaque(String),
}

impl BackendValue {
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_)
        )
    }

    /// Parses `YYYYMMDD` or `YYYY-MM-DD`.
    #[must_use]
    pub fn parse_date(raw: &str) -> Option<Self> {
        NaiveDate::parse_from_str(raw, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
            .ok()
            .map(Self::Date)
    }
}

impl From<Value> for BackendValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => number.as_i64().map_or_else(
                || Self::Float(number.as_f64().unwrap_or(f64::NAN)),
                Self::Int,
            ),
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(mut map) => {
                if map.len() == 1 {
                    if let Some(tagged) = decode_tagged(&mut map) {
                        return tagged;
                    }
                }
                Self::Map(map.into_iter().map(|(key, item)| (key, Self::from(item))).collect())
            }
        }
    }
}

fn decode_tagged(map: &mut serde_json::Map<String, Value>) -> Option<BackendValue> {
    if let Some(Value::Array(items)) = map.get(NDARRAY_TAG) {
        let values = items
            .iter()
            .map(|item| item.as_f64().unwrap_or(f64::NAN))
            .collect();
        return Some(BackendValue::Array(values));
    }
    if let Some(Value::String(raw)) = map.get(DATE_TAG) {
        return BackendValue::parse_date(raw)
            .or_else(|| Some(BackendValue::Text(raw.clone())));
    }
    if let Some(Value::String(repr)) = map.remove(REPR_TAG) {
        return Some(BackendValue::Opaque(repr));
    }
    None
}

impl fmt::Display for BackendValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Text(value) | Self::Opaque(value) => f.write_str(value),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(stamp) => write!(f, "{}", stamp.format("%Y-%m-%d %H:%M:%S")),
            Self::Array(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (index, (key, item)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}': {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_tagged_wire_values() {
        let value = BackendValue::from(json!({"__ndarray__": [1.5, null, 3]}));
        match value {
            BackendValue::Array(values) => {
                assert_eq!(values.len(), 3);
                assert!((values[0] - 1.5).abs() < f64::EPSILON);
                assert!(values[1].is_nan());
            }
            other => panic!("expected array, got {other:?}"),
        }

        assert_eq!(
            BackendValue::from(json!({"__date__": "20240102"})),
            BackendValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"))
        );
        assert_eq!(
            BackendValue::from(json!({"__repr__": "<Instrument>"})),
            BackendValue::Opaque("<Instrument>".to_string())
        );
    }

    #[test]
    fn plain_objects_keep_key_order() {
        let value = BackendValue::from(json!({"b": 1, "a": 2.5}));
        let BackendValue::Map(entries) = value else {
            panic!("expected map");
        };
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(entries["a"], BackendValue::Float(2.5));
    }

    #[test]
    fn display_matches_printable_forms() {
        assert_eq!(BackendValue::Array(vec![1.0, 2.5]).to_string(), "[1 2.5]");
        assert_eq!(
            BackendValue::List(vec![BackendValue::Int(1), BackendValue::Null]).to_string(),
            "[1, None]"
        );
        assert_eq!(BackendValue::Float(3.0).to_string(), "3.0");
    }
}
