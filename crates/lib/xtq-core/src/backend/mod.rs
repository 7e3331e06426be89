//! Backend capability surface.
//!
//! A [`Backend`] supplies trading calendars, sector lists, instrument detail,
//! market data, and (optionally) panel control and lifecycle hooks. Optional
//! operations are advertised through [`Capabilities`], which callers resolve
//! once instead of probing at call time.

pub mod bridge;
pub mod mock;
mod value;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use xtq_model::PanelDescriptor;

pub use bridge::{BridgeBackend, BridgeConfig};
pub use mock::MockBackend;
pub use value::BackendValue;

pub type BackendResult<T> = Result<T, BackendError>;

/// Per-code, per-field series as returned by the backend.
pub type MarketData = IndexMap<String, IndexMap<String, BackendValue>>;

/// Instrument attributes keyed by field name.
pub type InstrumentDetail = IndexMap<String, BackendValue>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend does not support {operation}")]
    Unsupported { operation: String },

    #[error("backend transport error: {reason}")]
    Transport { reason: String },

    #[error("{reason}")]
    Remote { reason: String },

    #[error("failed to decode backend response: {reason}")]
    Decode { reason: String },
}

impl BackendError {
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn remote(reason: impl Into<String>) -> Self {
        Self::Remote {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }
}

/// Backend methods that can put a set of panels on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelMethod {
    ApplyUiPanelControl,
    ApplyPanelControl,
    CreatePanel,
    ShowPanel,
    DisplayPanel,
}

impl PanelMethod {
    pub const PRIMARY: Self = Self::ApplyUiPanelControl;

    /// Alternatives tried, in order, when the primary method is absent.
    pub const FALLBACKS: [Self; 4] = [
        Self::ApplyPanelControl,
        Self::CreatePanel,
        Self::ShowPanel,
        Self::DisplayPanel,
    ];

    pub const ALL: [Self; 5] = [
        Self::ApplyUiPanelControl,
        Self::ApplyPanelControl,
        Self::CreatePanel,
        Self::ShowPanel,
        Self::DisplayPanel,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ApplyUiPanelControl => "apply_ui_panel_control",
            Self::ApplyPanelControl => "apply_panel_control",
            Self::CreatePanel => "create_panel",
            Self::ShowPanel => "show_panel",
            Self::DisplayPanel => "display_panel",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.name() == name)
    }
}

pub const START_METHOD: &str = "start_xtdata";
pub const REFRESH_METHOD: &str = "refresh_ui";

/// Optional operations a backend implements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub start: bool,
    pub refresh: bool,
    pub panel_methods: Vec<PanelMethod>,
}

impl Capabilities {
    /// Builds a capability set from advertised method names; unknown names are ignored.
    #[must_use]
    pub fn from_method_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut capabilities = Self::default();
        for name in names {
            match name.as_ref() {
                START_METHOD => capabilities.start = true,
                REFRESH_METHOD => capabilities.refresh = true,
                other => {
                    if let Some(method) = PanelMethod::from_name(other) {
                        if !capabilities.panel_methods.contains(&method) {
                            capabilities.panel_methods.push(method);
                        }
                    }
                }
            }
        }
        capabilities
    }

    #[must_use]
    pub fn with_panel_method(mut self, method: PanelMethod) -> Self {
        if !self.panel_methods.contains(&method) {
            self.panel_methods.push(method);
        }
        self
    }

    #[must_use]
    pub const fn with_start(mut self) -> Self {
        self.start = true;
        self
    }

    #[must_use]
    pub const fn with_refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    #[must_use]
    pub fn supports_panel(&self, method: PanelMethod) -> bool {
        self.panel_methods.contains(&method)
    }

    /// Advertised optional method names, lifecycle hooks first.
    #[must_use]
    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.start {
            names.push(START_METHOD);
        }
        if self.refresh {
            names.push(REFRESH_METHOD);
        }
        names.extend(self.panel_methods.iter().map(|method| method.name()));
        names
    }
}

/// Arguments for a market-data query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketDataQuery {
    pub fields: Vec<String>,
    pub codes: Vec<String>,
    pub period: String,
    pub start_time: String,
    pub end_time: String,
    /// Row limit: `None` leaves the backend default, `-1` is unbounded.
    pub count: Option<i64>,
}

/// Panel in the backend's preferred form.
#[derive(Debug, Clone, PartialEq)]
pub struct NativePanel {
    pub type_name: String,
    pub body: Value,
    pub display: String,
}

impl NativePanel {
    /// The `UIPanel` shape understood by the native panel API.
    #[must_use]
    pub fn ui_panel(panel: &PanelDescriptor) -> Self {
        Self {
            type_name: "UIPanel".to_string(),
            body: serde_json::json!({
                "__type__": "UIPanel",
                "stock": panel.stock,
                "period": panel.period,
                "figures": panel.figures,
            }),
            display: panel.to_string(),
        }
    }
}

/// A panel handed to a panel-control method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PanelPayload {
    Native(Value),
    Plain(PanelDescriptor),
}

/// Capability surface of the market-data service.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs and environment snapshots.
    fn name(&self) -> &str;

    /// Optional operations this backend supports.
    fn capabilities(&self) -> Capabilities;

    async fn trading_dates(&self, market: &str) -> BackendResult<Vec<BackendValue>>;

    async fn stock_list_in_sector(&self, sector: &str) -> BackendResult<Vec<String>>;

    async fn instrument_detail(
        &self,
        code: &str,
        complete: bool,
    ) -> BackendResult<Option<InstrumentDetail>>;

    async fn market_data(&self, query: &MarketDataQuery) -> BackendResult<Option<MarketData>>;

    /// Converts a descriptor into the backend's preferred panel form.
    fn build_panel(&self, panel: &PanelDescriptor) -> BackendResult<NativePanel> {
        Ok(NativePanel::ui_panel(panel))
    }

    async fn apply_panels(
        &self,
        method: PanelMethod,
        panels: &[PanelPayload],
    ) -> BackendResult<BackendValue> {
        let _ = panels;
        Err(BackendError::unsupported(method.name()))
    }

    async fn start(&self) -> BackendResult<()> {
        Err(BackendError::unsupported(START_METHOD))
    }

    async fn refresh(&self) -> BackendResult<()> {
        Err(BackendError::unsupported(REFRESH_METHOD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_parse_known_method_names() {
        let caps = Capabilities::from_method_names(&[
            "refresh_ui",
            "show_panel",
            "get_market_data",
            "show_panel",
        ]);
        assert!(caps.refresh);
        assert!(!caps.start);
        assert_eq!(caps.panel_methods, vec![PanelMethod::ShowPanel]);
        assert_eq!(caps.method_names(), vec!["refresh_ui", "show_panel"]);
    }

    #[test]
    fn fallbacks_exclude_primary() {
        assert!(!PanelMethod::FALLBACKS.contains(&PanelMethod::PRIMARY));
        assert_eq!(
            PanelMethod::from_name("display_panel"),
            Some(PanelMethod::DisplayPanel)
        );
    }
}
