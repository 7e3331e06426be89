//! One-shot backend startup guard.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::backend::{Backend, Capabilities};

/// Startup state of the backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    /// Startup failed; calls still reach the backend, which may answer degraded.
    FailedButContinuing,
}

/// Owns the backend and runs its optional startup routine at most once.
///
/// The capability set is resolved when the lifecycle is built and never
/// re-probed afterwards.
pub struct ServiceLifecycle {
    backend: Arc<dyn Backend>,
    capabilities: Capabilities,
    state: Mutex<LifecycleState>,
}

impl ServiceLifecycle {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let capabilities = backend.capabilities();
        Self {
            backend,
            capabilities,
            state: Mutex::new(LifecycleState::Uninitialized),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.lock().await
    }

    /// Starts the backend on first use. Later calls are no-ops whatever the
    /// first outcome was; failures are logged, never returned.
    pub async fn ensure_ready(&self) -> LifecycleState {
        let mut state = self.state.lock().await;
        if *state != LifecycleState::Uninitialized {
            return *state;
        }

        *state = if self.capabilities.start {
            match self.backend.start().await {
                Ok(()) => {
                    info!(backend = self.backend.name(), "market-data service started");
                    LifecycleState::Ready
                }
                Err(err) => {
                    error!(
                        backend = self.backend.name(),
                        error = %err,
                        "failed to start market-data service; continuing"
                    );
                    LifecycleState::FailedButContinuing
                }
            }
        } else {
            info!(backend = self.backend.name(), "market-data service ready");
            LifecycleState::Ready
        };
        *state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[tokio::test]
    async fn backend_without_start_hook_becomes_ready() {
        let lifecycle = ServiceLifecycle::new(Arc::new(MockBackend::new()));
        assert_eq!(lifecycle.state().await, LifecycleState::Uninitialized);
        assert_eq!(lifecycle.ensure_ready().await, LifecycleState::Ready);
        assert_eq!(lifecycle.ensure_ready().await, LifecycleState::Ready);
    }
}
