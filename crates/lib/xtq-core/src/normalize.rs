//! Conversion of backend values into JSON-safe payloads.
//!
//! Non-finite floats become `null`, calendar values become ISO strings, and
//! opaque objects become their printable form.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::backend::{BackendValue, InstrumentDetail, MarketData};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("series {field} of {code} is not a sequence: {found}")]
    NotSequence {
        code: String,
        field: String,
        found: String,
    },
}

fn number(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Recursively converts a backend value into plain JSON.
#[must_use]
pub fn to_json(value: &BackendValue) -> Value {
    match value {
        BackendValue::Null => Value::Null,
        BackendValue::Bool(flag) => Value::Bool(*flag),
        BackendValue::Int(int) => Value::from(*int),
        BackendValue::Float(float) => number(*float),
        BackendValue::Text(text) | BackendValue::Opaque(text) => Value::String(text.clone()),
        BackendValue::Date(_) | BackendValue::DateTime(_) => Value::String(value.to_string()),
        BackendValue::Array(values) => Value::Array(values.iter().copied().map(number).collect()),
        BackendValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        BackendValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), to_json(item)))
                .collect(),
        ),
    }
}

/// Renders one trading date.
///
/// Eight-digit integers are read as `YYYYMMDD`; calendar values use
/// `YYYY-MM-DD`; anything else is printed as-is.
#[must_use]
pub fn format_trading_date(value: &BackendValue) -> String {
    match value {
        BackendValue::Int(int) => {
            let digits = int.to_string();
            if *int >= 0 && digits.len() == 8 {
                format!("{}-{}-{}", &digits[..4], &digits[4..6], &digits[6..])
            } else {
                digits
            }
        }
        BackendValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        BackendValue::DateTime(stamp) => stamp.format("%Y-%m-%d").to_string(),
        other => other.to_string(),
    }
}

/// Flattens instrument detail: scalars pass through, everything else is stringified.
#[must_use]
pub fn normalize_detail(detail: &InstrumentDetail) -> Map<String, Value> {
    detail
        .iter()
        .map(|(key, value)| {
            let normalized = if value.is_scalar() {
                to_json(value)
            } else {
                Value::String(value.to_string())
            };
            (key.clone(), normalized)
        })
        .collect()
}

fn normalize_series(code: &str, field: &str, series: &BackendValue) -> Result<Value, NormalizeError> {
    match series {
        BackendValue::Array(_) | BackendValue::List(_) => Ok(to_json(series)),
        other => Err(NormalizeError::NotSequence {
            code: code.to_string(),
            field: field.to_string(),
            found: other.to_string(),
        }),
    }
}

/// Converts per-code, per-field series into ordered JSON arrays.
///
/// # Errors
/// Returns [`NormalizeError::NotSequence`] if a series is a scalar or mapping.
pub fn normalize_market_data(data: &MarketData) -> Result<Value, NormalizeError> {
    let mut result = Map::new();
    for (code, fields) in data {
        let mut code_result = Map::new();
        for (field, series) in fields {
            code_result.insert(field.clone(), normalize_series(code, field, series)?);
        }
        result.insert(code.clone(), Value::Object(code_result));
    }
    Ok(Value::Object(result))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use serde_json::json;

    use super::*;

    #[test]
    fn non_finite_floats_become_null() {
        let value = BackendValue::Array(vec![1.0, f64::NAN, f64::INFINITY]);
        assert_eq!(to_json(&value), json!([1.0, null, null]));
    }

    #[test]
    fn trading_dates_format_by_shape() {
        assert_eq!(format_trading_date(&BackendValue::Int(20_240_102)), "2024-01-02");
        assert_eq!(format_trading_date(&BackendValue::Int(1_234)), "1234");
        let date = NaiveDate::from_ymd_opt(2023, 5, 6).expect("valid date");
        assert_eq!(format_trading_date(&BackendValue::Date(date)), "2023-05-06");
        assert_eq!(
            format_trading_date(&BackendValue::Text("2023-01-01".to_string())),
            "2023-01-01"
        );
    }

    #[test]
    fn detail_stringifies_non_scalars() {
        let mut detail = IndexMap::new();
        detail.insert("code".to_string(), BackendValue::Text("000001.SZ".to_string()));
        detail.insert("price".to_string(), BackendValue::Float(10.5));
        detail.insert("suspended".to_string(), BackendValue::Bool(false));
        detail.insert(
            "ticks".to_string(),
            BackendValue::List(vec![BackendValue::Int(1), BackendValue::Int(2)]),
        );
        let date = NaiveDate::from_ymd_opt(1991, 4, 3).expect("valid date");
        detail.insert("open_date".to_string(), BackendValue::Date(date));

        let flat = normalize_detail(&detail);
        assert_eq!(flat["code"], json!("000001.SZ"));
        assert_eq!(flat["price"], json!(10.5));
        assert_eq!(flat["suspended"], json!(false));
        assert_eq!(flat["ticks"], json!("[1, 2]"));
        assert_eq!(flat["open_date"], json!("1991-04-03"));
    }

    #[test]
    fn market_data_rejects_scalar_series() {
        let mut fields = IndexMap::new();
        fields.insert("close".to_string(), BackendValue::Float(1.0));
        let mut data = MarketData::new();
        data.insert("000001.SZ".to_string(), fields);

        let err = normalize_market_data(&data).expect_err("scalar series rejected");
        assert!(matches!(err, NormalizeError::NotSequence { ref field, .. } if field == "close"));
    }

    #[test]
    fn market_data_preserves_code_and_field_order() {
        let mut first = IndexMap::new();
        first.insert("open".to_string(), BackendValue::Array(vec![1.0]));
        first.insert("close".to_string(), BackendValue::List(vec![BackendValue::Int(2)]));
        let mut data = MarketData::new();
        data.insert("600519.SH".to_string(), first);
        data.insert("000001.SZ".to_string(), IndexMap::new());

        let value = normalize_market_data(&data).expect("normalizes");
        let object = value.as_object().expect("object");
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["600519.SH", "000001.SZ"]);
        assert_eq!(value["600519.SH"], json!({"open": [1.0], "close": [2]}));
    }
}
