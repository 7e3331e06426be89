//! Daemon entry point for the xtquant MCP server.
//!
//! Loads configuration from CLI arguments and the environment, selects the
//! market-data backend, and serves the MCP protocol over stdio and/or
//! streamable HTTP.

mod backend;
mod config;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use xtq_core::XtqControlPlane;
use xtq_mcp::RequestDispatcher;
use xtq_mcp::registry::list_tools;
use xtq_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};

use crate::backend::select_backend;
use crate::config::XtqConfig;

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = XtqConfig::from_args()?;
    init_tracing(&config.log_filter);

    for (index, tool) in list_tools().iter().enumerate() {
        info!(index = index + 1, name = tool.name, description = tool.description, "registered tool");
    }

    let backend = select_backend(&config).await;
    info!(
        backend = backend.name(),
        capabilities = ?backend.capabilities().method_names(),
        "backend selected"
    );
    let control = XtqControlPlane::new(backend).with_settle_delay(config.panel_settle);
    let dispatcher = Arc::new(RequestDispatcher::new(control));

    let http = config.mcp_serve.then(|| {
        let http_config = McpHttpServerConfig::new(config.mcp_http_addr);
        tokio::spawn(serve_streamable_http(dispatcher.clone(), http_config))
    });

    if config.enable_stdio {
        if let Err(err) = serve_stdio(dispatcher).await {
            error!(error = %err, "stdio server stopped");
            return Err(err);
        }
        return Ok(());
    }

    if let Some(handle) = http {
        handle.await??;
    }
    Ok(())
}
