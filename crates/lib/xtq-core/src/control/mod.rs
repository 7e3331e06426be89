use std::sync::Arc;
use std::time::Duration;

use crate::backend::Backend;
use crate::lifecycle::{LifecycleState, ServiceLifecycle};

pub mod market;
pub mod panel;

pub use market::MarketDataKind;
pub use panel::{
    ChartPanelRequest, CustomLayoutRequest, EnvironmentSnapshot, PanelController, PanelReport,
};

/// Pause after panel control so asynchronous UI updates can land.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Error text for requests whose code list is empty after parsing.
pub const NO_VALID_CODES: &str = "未提供有效的股票代码";

/// Entry point for every tool handler.
///
/// Handlers never fail with a Rust error past this boundary: backend
/// failures come back as [`crate::ErrorPayload`] values.
#[derive(Clone)]
pub struct XtqControlPlane {
    lifecycle: Arc<ServiceLifecycle>,
    settle_delay: Duration,
}

impl XtqControlPlane {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_lifecycle(Arc::new(ServiceLifecycle::new(backend)))
    }

    #[must_use]
    pub const fn with_lifecycle(lifecycle: Arc<ServiceLifecycle>) -> Self {
        Self {
            lifecycle,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    #[must_use]
    pub const fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    #[must_use]
    pub fn lifecycle(&self) -> &ServiceLifecycle {
        &self.lifecycle
    }

    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.lifecycle.backend()
    }

    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub async fn ensure_ready(&self) -> LifecycleState {
        self.lifecycle.ensure_ready().await
    }
}
