use serde_json::{Map, Value, json};

/// JSON-Schema type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Boolean,
}

impl ParamType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }
}

/// Value applied when a caller omits a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Text(&'static str),
    Flag(bool),
    /// Filled in by the handler at call time (e.g. codes looked up from a sector).
    Derived,
}

/// Declared input of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<ParamDefault>,
}

impl ParamSpec {
    #[must_use]
    pub const fn required(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            kind: ParamType::String,
            description,
            required: true,
            default: None,
        }
    }

    #[must_use]
    pub const fn text(key: &'static str, description: &'static str, default: &'static str) -> Self {
        Self {
            key,
            kind: ParamType::String,
            description,
            required: false,
            default: Some(ParamDefault::Text(default)),
        }
    }

    #[must_use]
    pub const fn flag(key: &'static str, description: &'static str, default: bool) -> Self {
        Self {
            key,
            kind: ParamType::Boolean,
            description,
            required: false,
            default: Some(ParamDefault::Flag(default)),
        }
    }

    #[must_use]
    pub const fn derived(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            kind: ParamType::String,
            description,
            required: false,
            default: Some(ParamDefault::Derived),
        }
    }

    /// Default text for string parameters; empty when none is declared.
    #[must_use]
    pub const fn default_text(&self) -> &'static str {
        match self.default {
            Some(ParamDefault::Text(text)) => text,
            _ => "",
        }
    }

    #[must_use]
    pub const fn default_flag(&self) -> bool {
        matches!(self.default, Some(ParamDefault::Flag(true)))
    }

    fn schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.kind.as_str()));
        property.insert("description".to_string(), json!(self.description));
        match self.default {
            Some(ParamDefault::Text(text)) => {
                property.insert("default".to_string(), json!(text));
            }
            Some(ParamDefault::Flag(flag)) => {
                property.insert("default".to_string(), json!(flag));
            }
            Some(ParamDefault::Derived) | None => {}
        }
        Value::Object(property)
    }
}

/// A named, schema-described tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static [ParamSpec],
}

impl ToolSpec {
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|param| param.key == key)
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters
            .iter()
            .filter(|param| param.required)
            .map(|param| param.key)
    }

    /// JSON-Schema object describing the tool input.
    #[must_use]
    pub fn input_schema(&self) -> Map<String, Value> {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|param| (param.key.to_string(), param.schema()))
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        let required: Vec<&str> = self.required_keys().collect();
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &[ParamSpec] = &[
        ParamSpec::required("code", "股票代码"),
        ParamSpec::flag("iscomplete", "是否获取全部字段", false),
        ParamSpec::derived("codes", "股票代码列表"),
    ];

    const SPEC: ToolSpec = ToolSpec {
        name: "sample",
        description: "sample tool",
        parameters: PARAMS,
    };

    #[test]
    fn schema_lists_properties_in_declaration_order() {
        let schema = SPEC.input_schema();
        let properties = schema["properties"].as_object().expect("properties object");
        assert_eq!(
            properties.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["code", "iscomplete", "codes"]
        );
        assert_eq!(properties["iscomplete"]["default"], json!(false));
        assert!(properties["codes"].get("default").is_none());
        assert_eq!(schema["required"], json!(["code"]));
    }

    #[test]
    fn defaults_resolve_per_kind() {
        assert_eq!(ParamSpec::text("period", "周期", "1d").default_text(), "1d");
        assert_eq!(SPEC.param("code").map(ParamSpec::default_text), Some(""));
        assert!(!SPEC.param("iscomplete").is_some_and(ParamSpec::default_flag));
    }
}
