use std::sync::Arc;

use tracing::{info, warn};
use xtq_core::Backend;
use xtq_core::backend::{BridgeBackend, BridgeConfig, MockBackend};

use crate::config::XtqConfig;

/// Picks the backend once at startup; every failure path lands on the mock.
pub async fn select_backend(config: &XtqConfig) -> Arc<dyn Backend> {
    if config.force_mock {
        info!("mock backend forced by configuration");
        return Arc::new(MockBackend::new());
    }
    let Some(url) = config.bridge_url.as_deref() else {
        info!("no bridge URL configured; using mock backend");
        return Arc::new(MockBackend::new());
    };

    let bridge = match BridgeConfig::new(url) {
        Ok(bridge) => bridge.with_timeout(config.bridge_timeout),
        Err(err) => {
            warn!(url, error = %err, "invalid bridge URL; using mock backend");
            return Arc::new(MockBackend::new());
        }
    };
    match BridgeBackend::connect(bridge).await {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            warn!(url, error = %err, "market-data bridge unavailable; using mock backend");
            Arc::new(MockBackend::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use super::*;

    fn config(bridge_url: Option<&str>, force_mock: bool) -> XtqConfig {
        XtqConfig {
            bridge_url: bridge_url.map(ToString::to_string),
            bridge_timeout: Duration::from_millis(200),
            force_mock,
            panel_settle: Duration::ZERO,
            enable_stdio: true,
            mcp_serve: false,
            mcp_http_addr: SocketAddr::from(([127, 0, 0, 1], 4020)),
            log_filter: "info".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_url_selects_mock() {
        assert_eq!(select_backend(&config(None, false)).await.name(), "mock");
    }

    #[tokio::test]
    async fn forced_mock_skips_the_bridge() {
        let backend = select_backend(&config(Some("http://127.0.0.1:9"), true)).await;
        assert_eq!(backend.name(), "mock");
    }

    #[tokio::test]
    async fn unreachable_bridge_falls_back_to_mock() {
        let backend = select_backend(&config(Some("http://127.0.0.1:9"), false)).await;
        assert_eq!(backend.name(), "mock");
    }
}
