use std::borrow::Cow;

use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};

use crate::dispatch::{DispatchError, ToolOutcome};

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

pub fn dispatch_err(err: &DispatchError) -> ErrorData {
    match err {
        DispatchError::UnknownTool(_) => mcp_err(ErrorCode::INVALID_PARAMS, err.to_string()),
    }
}

pub fn unsupported_uri(uri: &str) -> ErrorData {
    mcp_err(ErrorCode::RESOURCE_NOT_FOUND, format!("Unsupported URI: {uri}"))
}

pub fn unknown_prompt(name: &str) -> ErrorData {
    mcp_err(ErrorCode::INVALID_PARAMS, format!("Unknown prompt: {name}"))
}

pub fn tool_result(outcome: &ToolOutcome) -> CallToolResult {
    let content = vec![Content::text(outcome.render())];
    if outcome.is_error() {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}
