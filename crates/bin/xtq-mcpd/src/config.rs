use clap::{Parser, builder::BoolishValueParser};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";
const DEFAULT_BRIDGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PANEL_SETTLE_MS: u64 = 500;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "xtq-mcpd", version, about = "xtquant market-data MCP daemon.")]
struct CliArgs {
    /// Base URL of the market-data bridge; the mock backend is used when unset.
    #[arg(long, env = "XTQ_BRIDGE_URL")]
    bridge_url: Option<String>,

    #[arg(
        long,
        env = "XTQ_BRIDGE_TIMEOUT_SECS",
        default_value_t = DEFAULT_BRIDGE_TIMEOUT_SECS
    )]
    bridge_timeout_secs: u64,

    #[arg(
        long = "mock",
        env = "XTQ_FORCE_MOCK",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    force_mock: bool,

    #[arg(
        long,
        env = "XTQ_PANEL_SETTLE_MS",
        default_value_t = DEFAULT_PANEL_SETTLE_MS
    )]
    panel_settle_ms: u64,

    #[arg(
        long = "stdio",
        env = "XTQ_ENABLE_STDIO",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long = "http",
        env = "XTQ_MCP_SERVE",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    mcp_serve: bool,

    #[arg(long, env = "XTQ_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(long, env = "XTQ_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct XtqConfig {
    pub bridge_url: Option<String>,
    pub bridge_timeout: Duration,
    pub force_mock: bool,
    pub panel_settle: Duration,
    pub enable_stdio: bool,
    pub mcp_serve: bool,
    pub mcp_http_addr: SocketAddr,
    pub log_filter: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
    #[error("unsupported {name} scheme in {value}: the bridge client speaks plain http only")]
    UnsupportedScheme { name: &'static str, value: String },
}

impl XtqConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for XtqConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let bridge_url = args
            .bridge_url
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if let Some(url) = &bridge_url {
            if url.starts_with("https://") {
                return Err(ConfigError::UnsupportedScheme {
                    name: "XTQ_BRIDGE_URL",
                    value: url.clone(),
                });
            }
            if !url.starts_with("http://") {
                return Err(ConfigError::InvalidSetting {
                    name: "XTQ_BRIDGE_URL",
                    value: url.clone(),
                });
            }
        }

        if args.bridge_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "XTQ_BRIDGE_TIMEOUT_SECS",
                value: args.bridge_timeout_secs.to_string(),
            });
        }

        if !args.enable_stdio && !args.mcp_serve {
            return Err(ConfigError::MissingSetting("XTQ_ENABLE_STDIO or XTQ_MCP_SERVE"));
        }

        let log_filter = if args.log_filter.trim().is_empty() {
            DEFAULT_LOG_FILTER.to_string()
        } else {
            args.log_filter
        };

        Ok(Self {
            bridge_url,
            bridge_timeout: Duration::from_secs(args.bridge_timeout_secs),
            force_mock: args.force_mock,
            panel_settle: Duration::from_millis(args.panel_settle_ms),
            enable_stdio: args.enable_stdio,
            mcp_serve: args.mcp_serve,
            mcp_http_addr: args.mcp_http_addr,
            log_filter,
        })
    }
}
