//! Core services for xtq-mcp.
//!
//! This crate owns the backend capability surface (with a deterministic mock
//! and an HTTP bridge adapter), the one-shot service lifecycle, result
//! normalization, and the control plane that implements every tool handler.

pub mod backend;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod normalize;

pub use backend::{Backend, BackendError, BackendResult, BackendValue, Capabilities, PanelMethod};
pub use control::XtqControlPlane;
pub use error::{ErrorPayload, HandlerResult};
pub use lifecycle::{LifecycleState, ServiceLifecycle};
