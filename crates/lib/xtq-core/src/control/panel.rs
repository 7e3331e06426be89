//! Chart-panel creation with capability negotiation.
//!
//! Panels are applied through the primary panel-control method when the
//! backend has it. Otherwise the available fallback methods are tried in
//! order until one succeeds, and when none does the request still succeeds
//! with every outcome recorded in `method_results`.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use xtq_model::schema::{
    DEFAULT_INDICATOR, DEFAULT_INDICATOR_PARAMS, DEFAULT_PARAM_NAMES, DEFAULT_PERIOD,
    DEFAULT_SECTOR, FALLBACK_PANEL_CODES, PANEL_DEFAULT_CODE_LIMIT,
};
use xtq_model::{
    IndicatorConfig, PanelDescriptor, ParamValue, parse_param_values, parse_positional_params,
    split_list,
};

use super::{NO_VALID_CODES, XtqControlPlane};
use crate::backend::{Backend, Capabilities, PanelMethod, PanelPayload};
use crate::error::{ErrorPayload, HandlerResult};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Arguments of `create_chart_panel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPanelRequest {
    /// Comma-separated codes; `None` selects defaults from the market.
    pub codes: Option<String>,
    pub period: String,
    pub indicator: String,
    /// Positional indicator values, e.g. `5,10,20`.
    pub params: String,
}

impl Default for ChartPanelRequest {
    fn default() -> Self {
        Self {
            codes: None,
            period: DEFAULT_PERIOD.to_string(),
            indicator: DEFAULT_INDICATOR.to_string(),
            params: DEFAULT_INDICATOR_PARAMS.to_string(),
        }
    }
}

/// Arguments of `create_custom_layout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLayoutRequest {
    pub codes: Option<String>,
    pub period: String,
    pub indicator_name: String,
    pub param_names: String,
    pub param_values: String,
}

impl Default for CustomLayoutRequest {
    fn default() -> Self {
        Self {
            codes: None,
            period: DEFAULT_PERIOD.to_string(),
            indicator_name: DEFAULT_INDICATOR.to_string(),
            param_names: DEFAULT_PARAM_NAMES.to_string(),
            param_values: DEFAULT_INDICATOR_PARAMS.to_string(),
        }
    }
}

/// Process and backend facts attached to panel results for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSnapshot {
    pub server_version: &'static str,
    pub platform: &'static str,
    pub arch: &'static str,
    pub cwd: String,
    pub pid: u32,
    pub user: String,
    pub backend: String,
    pub capabilities: Vec<&'static str>,
    pub has_apply_ui_panel_control: bool,
}

impl EnvironmentSnapshot {
    #[must_use]
    pub fn capture(backend: &dyn Backend, capabilities: &Capabilities) -> Self {
        let cwd = std::env::current_dir()
            .map_or_else(|_| "unknown".to_string(), |dir| dir.display().to_string());
        let user = std::env::var("USERNAME")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            server_version: SERVER_VERSION,
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cwd,
            pid: std::process::id(),
            user,
            backend: backend.name().to_string(),
            capabilities: capabilities.method_names(),
            has_apply_ui_panel_control: capabilities.supports_panel(PanelMethod::PRIMARY),
        }
    }
}

/// What happened while building and applying a batch of panels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PanelReport {
    pub panel_info: Vec<Value>,
    pub method_results: Map<String, Value>,
}

/// Drives one batch of panels through a backend.
pub struct PanelController<'a> {
    backend: &'a dyn Backend,
    capabilities: &'a Capabilities,
    settle_delay: Duration,
}

impl<'a> PanelController<'a> {
    #[must_use]
    pub const fn new(
        backend: &'a dyn Backend,
        capabilities: &'a Capabilities,
        settle_delay: Duration,
    ) -> Self {
        Self {
            backend,
            capabilities,
            settle_delay,
        }
    }

    /// Builds one panel per stock, applies them, refreshes, then waits for
    /// the UI to settle.
    pub async fn run(
        &self,
        stocks: &[String],
        period: &str,
        indicator: &IndicatorConfig,
    ) -> PanelReport {
        let mut report = PanelReport::default();
        let panels = self.build_panels(stocks, period, indicator, &mut report);
        self.apply(&panels, &mut report).await;
        self.refresh(&mut report).await;
        self.settle().await;
        report
    }

    /// Converts descriptors into the backend's native form, falling back to
    /// the plain descriptor when conversion fails.
    pub fn build_panels(
        &self,
        stocks: &[String],
        period: &str,
        indicator: &IndicatorConfig,
        report: &mut PanelReport,
    ) -> Vec<PanelPayload> {
        let figures = indicator.to_string();
        stocks
            .iter()
            .map(|stock| {
                let descriptor = PanelDescriptor::new(stock.clone(), period, indicator.clone());
                match self.backend.build_panel(&descriptor) {
                    Ok(native) => {
                        report.panel_info.push(json!({
                            "stock": stock,
                            "period": period,
                            "figures": figures,
                            "panel_type": native.type_name,
                            "panel_str": native.display,
                        }));
                        PanelPayload::Native(native.body)
                    }
                    Err(err) => {
                        warn!(stock = %stock, error = %err, "native panel unavailable; sending plain record");
                        report.panel_info.push(json!({
                            "stock": stock,
                            "period": period,
                            "figures": figures,
                            "panel_type": "plain",
                            "error": err.to_string(),
                        }));
                        PanelPayload::Plain(descriptor)
                    }
                }
            })
            .collect()
    }

    /// Applies panels through the primary method, or else tries each present
    /// fallback in order until one succeeds.
    pub async fn apply(&self, panels: &[PanelPayload], report: &mut PanelReport) {
        if self.capabilities.supports_panel(PanelMethod::PRIMARY) {
            self.attempt(PanelMethod::PRIMARY, panels, report).await;
            return;
        }

        report
            .method_results
            .insert(PanelMethod::PRIMARY.name().to_string(), json!({ "exists": false }));
        for method in PanelMethod::FALLBACKS {
            if !self.capabilities.supports_panel(method) {
                continue;
            }
            info!(method = method.name(), "primary panel method missing; trying fallback");
            if self.attempt(method, panels, report).await {
                return;
            }
        }

        warn!("no panel-control method succeeded");
        report
            .method_results
            .insert("no_method_found".to_string(), Value::Bool(true));
    }

    /// Calls one panel method and records its outcome. Returns whether it succeeded.
    async fn attempt(
        &self,
        method: PanelMethod,
        panels: &[PanelPayload],
        report: &mut PanelReport,
    ) -> bool {
        let started = Instant::now();
        let (succeeded, outcome) = match self.backend.apply_panels(method, panels).await {
            Ok(result) => {
                let time_taken = started.elapsed().as_secs_f64();
                debug!(method = method.name(), time_taken, "panel method returned");
                (true, json!({ "result": result.to_string(), "time_taken": time_taken }))
            }
            Err(err) => {
                error!(method = method.name(), error = %err, "panel method failed");
                (false, json!({ "error": err.to_string() }))
            }
        };
        report
            .method_results
            .insert(method.name().to_string(), outcome);
        succeeded
    }

    pub async fn refresh(&self, report: &mut PanelReport) {
        if !self.capabilities.refresh {
            return;
        }
        let outcome = match self.backend.refresh().await {
            Ok(()) => json!({ "called": true }),
            Err(err) => {
                warn!(error = %err, "UI refresh failed");
                json!({ "error": err.to_string() })
            }
        };
        report
            .method_results
            .insert("refresh_ui".to_string(), outcome);
    }

    pub async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PanelDetails {
    Chart {
        stocks: Vec<String>,
        period: String,
        indicator: String,
        parameters: Vec<ParamValue>,
    },
    Custom {
        stocks: Vec<String>,
        period: String,
        indicator: String,
        parameter_names: Vec<String>,
        parameter_values: Vec<ParamValue>,
    },
}

impl PanelDetails {
    fn stocks(&self) -> &[String] {
        match self {
            Self::Chart { stocks, .. } | Self::Custom { stocks, .. } => stocks,
        }
    }

    fn period(&self) -> &str {
        match self {
            Self::Chart { period, .. } | Self::Custom { period, .. } => period,
        }
    }

    fn success_message(&self) -> String {
        let count = self.stocks().len();
        match self {
            Self::Chart { .. } => format!("已成功创建 {count} 个图表面板"),
            Self::Custom { .. } => format!("已成功创建 {count} 个自定义布局面板"),
        }
    }
}

#[derive(Serialize)]
struct DebugInfo<'a> {
    env_info: &'a EnvironmentSnapshot,
    panel_info: &'a [Value],
    method_results: &'a Map<String, Value>,
}

#[derive(Serialize)]
struct PanelResponse<'a> {
    success: bool,
    message: String,
    details: &'a PanelDetails,
    debug_info: DebugInfo<'a>,
}

impl XtqControlPlane {
    /// Process snapshot for the current backend.
    #[must_use]
    pub fn environment_snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot::capture(self.backend(), self.lifecycle().capabilities())
    }

    #[must_use]
    pub fn panel_controller(&self) -> PanelController<'_> {
        PanelController::new(
            self.backend(),
            self.lifecycle().capabilities(),
            self.settle_delay(),
        )
    }

    /// Codes for a panel request: the caller's, else the first few codes of
    /// the default sector, else a fixed pair.
    pub async fn resolve_panel_codes(&self, codes: Option<&str>) -> String {
        if let Some(codes) = codes.filter(|codes| !codes.trim().is_empty()) {
            return codes.to_string();
        }

        let resolved = match self.sector_codes(DEFAULT_SECTOR).await {
            Ok(list) if !list.is_empty() => list
                .into_iter()
                .take(PANEL_DEFAULT_CODE_LIMIT)
                .collect::<Vec<_>>()
                .join(","),
            Ok(_) => FALLBACK_PANEL_CODES.to_string(),
            Err(err) => {
                warn!(error = %err, "default code lookup failed");
                FALLBACK_PANEL_CODES.to_string()
            }
        };
        info!(codes = %resolved, "no codes supplied; using defaults");
        resolved
    }

    /// # Errors
    /// Returns an [`ErrorPayload`] with `debug_info` if no codes resolve or
    /// the result cannot be assembled.
    pub async fn create_chart_panel(&self, request: ChartPanelRequest) -> HandlerResult<Value> {
        self.ensure_ready().await;
        let env_info = self.environment_snapshot();
        debug!(?env_info, "create_chart_panel");

        let codes = self.resolve_panel_codes(request.codes.as_deref()).await;
        let stocks = split_list(&codes);
        if stocks.is_empty() {
            return Err(no_codes(&env_info));
        }

        let parameters = parse_positional_params(&request.params);
        let indicator = IndicatorConfig::from_positional(&request.indicator, &parameters);
        let details = PanelDetails::Chart {
            stocks,
            period: request.period,
            indicator: request.indicator,
            parameters,
        };
        self.show_panels(&details, &indicator, &env_info).await
    }

    /// # Errors
    /// Returns an [`ErrorPayload`] with `debug_info` if no codes resolve or
    /// the result cannot be assembled.
    pub async fn create_custom_layout(&self, request: CustomLayoutRequest) -> HandlerResult<Value> {
        self.ensure_ready().await;
        let env_info = self.environment_snapshot();
        debug!(?env_info, "create_custom_layout");

        let codes = self.resolve_panel_codes(request.codes.as_deref()).await;
        let stocks = split_list(&codes);
        if stocks.is_empty() {
            return Err(no_codes(&env_info));
        }

        let parameter_names = split_list(&request.param_names);
        let parameter_values = parse_param_values(&request.param_values);
        let indicator =
            IndicatorConfig::from_named(&request.indicator_name, &parameter_names, &parameter_values);
        let details = PanelDetails::Custom {
            stocks,
            period: request.period,
            indicator: request.indicator_name,
            parameter_names,
            parameter_values,
        };
        self.show_panels(&details, &indicator, &env_info).await
    }

    async fn show_panels(
        &self,
        details: &PanelDetails,
        indicator: &IndicatorConfig,
        env_info: &EnvironmentSnapshot,
    ) -> HandlerResult<Value> {
        let report = self
            .panel_controller()
            .run(details.stocks(), details.period(), indicator)
            .await;
        info!(
            panels = details.stocks().len(),
            method_results = ?report.method_results,
            "panel request finished"
        );

        let response = PanelResponse {
            success: true,
            message: details.success_message(),
            details,
            debug_info: DebugInfo {
                env_info,
                panel_info: &report.panel_info,
                method_results: &report.method_results,
            },
        };
        serde_json::to_value(&response).map_err(|err| {
            error!(error = %err, "failed to assemble panel result");
            let mut debug_info = Map::new();
            debug_info.insert(
                "env_info".to_string(),
                serde_json::to_value(env_info).unwrap_or_default(),
            );
            debug_info.insert("panel_info".to_string(), Value::Array(report.panel_info.clone()));
            ErrorPayload::new(format!("创建或应用面板时出错: {err}"))
                .with_debug_info(Value::Object(debug_info))
        })
    }
}

fn no_codes(env_info: &EnvironmentSnapshot) -> ErrorPayload {
    let mut debug_info = Map::new();
    debug_info.insert(
        "env_info".to_string(),
        serde_json::to_value(env_info).unwrap_or_default(),
    );
    ErrorPayload::new(NO_VALID_CODES).with_debug_info(Value::Object(debug_info))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::MockBackend;

    fn plane() -> XtqControlPlane {
        XtqControlPlane::new(Arc::new(MockBackend::new())).with_settle_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn chart_panel_on_mock_uses_primary_method() {
        let result = plane()
            .create_chart_panel(ChartPanelRequest {
                codes: Some("000001.SZ".to_string()),
                ..ChartPanelRequest::default()
            })
            .await
            .expect("panel created");

        assert_eq!(result["success"], json!(true));
        assert_eq!(result["message"], json!("已成功创建 1 个图表面板"));
        assert_eq!(result["details"]["parameters"], json!([5, 10, 20]));
        let method = &result["debug_info"]["method_results"]["apply_ui_panel_control"];
        assert_eq!(method["result"], json!("True"));
        assert_eq!(
            result["debug_info"]["panel_info"][0]["panel_str"],
            json!("UIPanel(stock=000001.SZ, period=1d, figures=[{'ma': {'n1': 5, 'n2': 10, 'n3': 20}}])")
        );
    }

    #[tokio::test]
    async fn missing_codes_resolve_from_default_sector() {
        let codes = plane().resolve_panel_codes(None).await;
        assert_eq!(codes, "000001.SZ,600519.SH,300059.SZ");
        assert_eq!(plane().resolve_panel_codes(Some("  ")).await, codes);
    }

    #[tokio::test]
    async fn custom_layout_reports_named_parameters() {
        let result = plane()
            .create_custom_layout(CustomLayoutRequest {
                codes: Some("000001.SZ,600519.SH".to_string()),
                indicator_name: "macd".to_string(),
                param_names: "short,long,mid".to_string(),
                param_values: "12,26,9".to_string(),
                ..CustomLayoutRequest::default()
            })
            .await
            .expect("layout created");

        assert_eq!(result["message"], json!("已成功创建 2 个自定义布局面板"));
        assert_eq!(result["details"]["indicator"], json!("macd"));
        assert_eq!(result["details"]["parameter_names"], json!(["short", "long", "mid"]));
        assert_eq!(result["details"]["parameter_values"], json!([12, 26, 9]));
    }

    #[tokio::test]
    async fn comma_only_codes_are_rejected_with_environment() {
        let err = plane()
            .create_chart_panel(ChartPanelRequest {
                codes: Some(" , ".to_string()),
                ..ChartPanelRequest::default()
            })
            .await
            .expect_err("no codes");

        assert_eq!(err.error, NO_VALID_CODES);
        let debug_info = err.debug_info.expect("debug info");
        assert_eq!(debug_info["env_info"]["backend"], json!("mock"));
        assert_eq!(debug_info["env_info"]["has_apply_ui_panel_control"], json!(true));
    }
}
