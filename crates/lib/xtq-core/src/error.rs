use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Structured failure returned by a tool handler in place of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{error}")]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<Value>,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            debug_info: None,
        }
    }

    #[must_use]
    pub fn with_debug_info(mut self, debug_info: Value) -> Self {
        self.debug_info = Some(debug_info);
        self
    }
}

pub type HandlerResult<T> = Result<T, ErrorPayload>;
