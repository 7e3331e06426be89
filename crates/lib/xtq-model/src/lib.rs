//! Tool catalog types and panel/market-data models for xtq-mcp.
//!
//! This crate defines the plain data model shared by the control plane and the
//! MCP dispatcher: tool schemas, indicator and panel descriptors, and parsed
//! market-data requests.

pub mod models;
pub mod schema;
pub mod tools;

pub use models::*;
pub use tools::{ParamDefault, ParamSpec, ParamType, ToolSpec};
