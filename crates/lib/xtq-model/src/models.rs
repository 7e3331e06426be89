use std::fmt;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::schema::OHLCV_FIELDS;

/// Scalar indicator parameter parsed from caller-supplied text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Parses a positional chart parameter: all-digit tokens become integers.
    #[must_use]
    pub fn positional(token: &str) -> Self {
        if !token.is_empty() && token.chars().all(|ch| ch.is_ascii_digit()) {
            if let Ok(value) = token.parse::<i64>() {
                return Self::Int(value);
            }
        }
        Self::Text(token.to_string())
    }

    /// Parses a named layout parameter value.
    ///
    /// Tokens containing a `.` are tried as floats, everything else as an
    /// integer; anything that fails to parse stays text.
    #[must_use]
    pub fn coerce(token: &str) -> Self {
        if token.contains('.') {
            if let Ok(value) = token.parse::<f64>() {
                return Self::Float(value);
            }
        } else if let Ok(value) = token.parse::<i64>() {
            return Self::Int(value);
        }
        Self::Text(token.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Text(value) => write!(f, "'{value}'"),
        }
    }
}

/// One technical indicator and its named parameters.
///
/// Serializes as a single-entry map, `{"ma": {"n1": 5}}`, which is the shape
/// panel consumers expect inside `figures`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub indicator_name: String,
    pub parameters: IndexMap<String, ParamValue>,
}

impl IndicatorConfig {
    #[must_use]
    pub fn new(indicator_name: impl Into<String>) -> Self {
        Self {
            indicator_name: indicator_name.into(),
            parameters: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Builds the config for the chart-panel flavor from positional values.
    ///
    /// `ma` maps values to `n1..nK`; `macd` and `kdj` take fixed name triples
    /// when at least three values are given and fall back to an empty
    /// parameter set otherwise. Other indicators carry no parameters.
    #[must_use]
    pub fn from_positional(indicator: &str, values: &[ParamValue]) -> Self {
        let names: &[&str] = match indicator {
            "macd" => &["short", "long", "mid"],
            "kdj" => &["n", "m1", "m2"],
            _ => &[],
        };

        let mut config = Self::new(indicator);
        match indicator {
            "ma" => {
                for (index, value) in values.iter().enumerate() {
                    config
                        .parameters
                        .insert(format!("n{}", index + 1), value.clone());
                }
            }
            "macd" | "kdj" if values.len() >= names.len() => {
                for (name, value) in names.iter().zip(values) {
                    config.parameters.insert((*name).to_string(), value.clone());
                }
            }
            _ => {}
        }
        config
    }

    /// Builds the config for the custom-layout flavor by zipping names with values.
    ///
    /// Names without a corresponding value are dropped.
    #[must_use]
    pub fn from_named(indicator: &str, names: &[String], values: &[ParamValue]) -> Self {
        let mut config = Self::new(indicator);
        for (name, value) in names.iter().zip(values) {
            config.parameters.insert(name.clone(), value.clone());
        }
        config
    }
}

impl Serialize for IndicatorConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.indicator_name, &self.parameters)?;
        map.end()
    }
}

impl fmt::Display for IndicatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{'{}': {{", self.indicator_name)?;
        for (index, (name, value)) in self.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{name}': {value}")?;
        }
        f.write_str("}}")
    }
}

/// Request for the backend to display one instrument with its indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelDescriptor {
    pub stock: String,
    pub period: String,
    pub figures: Vec<IndicatorConfig>,
}

impl PanelDescriptor {
    #[must_use]
    pub fn new(stock: impl Into<String>, period: impl Into<String>, indicator: IndicatorConfig) -> Self {
        Self {
            stock: stock.into(),
            period: period.into(),
            figures: vec![indicator],
        }
    }
}

impl fmt::Display for PanelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UIPanel(stock={}, period={}, figures=[", self.stock, self.period)?;
        for (index, figure) in self.figures.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{figure}")?;
        }
        f.write_str("])")
    }
}

/// Parsed arguments shared by the market-data tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataRequest {
    pub codes: Vec<String>,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    pub fields: Vec<String>,
}

impl MarketDataRequest {
    /// Parses comma-separated codes and fields.
    ///
    /// Empty tokens are discarded; an empty field list becomes the OHLCV set.
    #[must_use]
    pub fn parse(codes: &str, period: &str, start_date: &str, end_date: &str, fields: &str) -> Self {
        let mut fields = split_list(fields);
        if fields.is_empty() {
            fields = ohlcv_fields();
        }
        Self {
            codes: split_list(codes),
            period: period.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            fields,
        }
    }

    /// Keeps only codes that look like exchange-qualified instrument codes.
    #[must_use]
    pub fn retain_instrument_codes(mut self) -> Self {
        self.codes.retain(|code| looks_like_instrument_code(code));
        self
    }
}

#[must_use]
pub fn ohlcv_fields() -> Vec<String> {
    OHLCV_FIELDS.iter().map(ToString::to_string).collect()
}

/// Splits a comma-separated list, trimming tokens and discarding empty ones.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// A code such as `000001.SZ`: has an exchange separator and at least 6 characters.
#[must_use]
pub fn looks_like_instrument_code(code: &str) -> bool {
    code.contains('.') && code.chars().count() >= 6
}

/// Parses positional chart parameters such as `5,10,20`.
#[must_use]
pub fn parse_positional_params(raw: &str) -> Vec<ParamValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ParamValue::positional)
        .collect()
}

/// Parses layout parameter values such as `5,abc,3.5`.
#[must_use]
pub fn parse_param_values(raw: &str) -> Vec<ParamValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ParamValue::coerce)
        .collect()
}
