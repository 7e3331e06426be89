//! MCP server implementation for xtq-mcp.
//!
//! This crate exposes the ordered tool catalog, routes tool calls through a
//! serializing dispatcher into the control plane, and provides stdio and
//! streamable-HTTP runners.

pub mod dispatch;
mod helpers;
pub mod registry;
pub mod server;

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult,
    Implementation, ListPromptsResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParams, ReadResourceRequestParams, ReadResourceResult, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use tracing::warn;

pub use dispatch::{DispatchError, RequestDispatcher, ToolArguments, ToolCall, ToolOutcome};

const SERVER_NAME: &str = "xtq-mcp";

const SERVER_INSTRUCTIONS: &str = r"xtq-mcp exposes a quantitative-trading market-data service as MCP tools.

Market data:
- `get_trading_dates` lists the most recent 30 trading dates of a market (default `SH`).
- `get_stock_list` lists up to 50 codes of a sector (default `沪深A股`).
- `get_instrument_detail` returns the attributes of one code such as `000001.SZ`.
- `get_history_market_data`, `get_latest_market_data`, and `get_full_market_data` return
  per-code, per-field series. Codes are comma-separated; fields default to open/high/low/close/volume.

Charting:
- `create_chart_panel` opens one panel per code with an indicator and positional parameters.
- `create_custom_layout` does the same with named indicator parameters.
  Both pick the first five codes of `沪深A股` when `codes` is omitted.

Notes:
- Errors are returned as tool content whose text starts with `错误` or as `{ error, debug_info }`.
- Panel results include `debug_info.method_results` describing which panel method ran.";

/// MCP server wrapper around the shared dispatcher.
#[derive(Clone)]
pub struct XtqMcp {
    dispatcher: Arc<RequestDispatcher>,
}

impl XtqMcp {
    /// Creates a new server on a shared dispatcher, so every session shares
    /// one backend and one lifecycle.
    #[must_use]
    pub const fn with_dispatcher(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl ServerHandler for XtqMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("xtquant market data".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = registry::list_tools()
            .iter()
            .map(registry::to_rmcp_tool)
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let call = ToolCall::new(request.name, request.arguments);
        let outcome = self
            .dispatcher
            .dispatch_call(&call)
            .await
            .map_err(|err| {
                warn!(error = %err, "rejected tool call");
                helpers::dispatch_err(&err)
            })?;
        Ok(helpers::tool_result(&outcome))
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(Vec::new()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        Err(helpers::unsupported_uri(&request.uri))
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        Ok(ListPromptsResult::with_all_items(Vec::new()))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        Err(helpers::unknown_prompt(&request.name))
    }
}
