//! Tool-call routing, argument validation, and result rendering.

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use xtq_core::control::{ChartPanelRequest, CustomLayoutRequest};
use xtq_core::{ErrorPayload, HandlerResult, XtqControlPlane};
use xtq_model::schema::{error_message, missing_argument_message};
use xtq_model::{MarketDataRequest, ToolSpec};

use crate::registry::ToolKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// One incoming tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Option<Map<String, Value>>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.unwrap_or_default(),
        }
    }
}

/// Arguments of one tool call, resolved against the tool's declared defaults.
#[derive(Debug, Clone, Copy)]
pub struct ToolArguments<'a> {
    spec: &'a ToolSpec,
    values: &'a Map<String, Value>,
}

impl<'a> ToolArguments<'a> {
    #[must_use]
    pub const fn new(spec: &'a ToolSpec, values: &'a Map<String, Value>) -> Self {
        Self { spec, values }
    }

    /// First required key that is absent, null, or an empty string.
    #[must_use]
    pub fn missing_required(&self) -> Option<&'static str> {
        self.spec.required_keys().find(|key| match self.values.get(*key) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.is_empty(),
            Some(_) => false,
        })
    }

    /// Caller-supplied text; non-string scalars are stringified.
    #[must_use]
    pub fn provided(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Caller-supplied text, else the declared default.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        self.provided(key).unwrap_or_else(|| {
            self.spec
                .param(key)
                .map(|param| param.default_text().to_string())
                .unwrap_or_default()
        })
    }

    /// Booleans pass through; strings count as true only for `true` in any case.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        match self.values.get(key) {
            None | Some(Value::Null) => self.spec.param(key).is_some_and(|param| param.default_flag()),
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
            Some(_) => false,
        }
    }

    fn market_request(&self) -> MarketDataRequest {
        MarketDataRequest::parse(
            &self.text("codes"),
            &self.text("period"),
            &self.text("start_date"),
            &self.text("end_date"),
            &self.text("fields"),
        )
    }
}

/// Result of a tool call that reached a registered tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failed(ErrorPayload),
    /// A required argument was missing; the backend was never called.
    Invalid(String),
}

impl ToolOutcome {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        !matches!(self, Self::Success(_))
    }

    /// Text content sent to the client.
    #[must_use]
    pub fn render(&self) -> String {
        let rendered = match self {
            Self::Success(value) => serde_json::to_string_pretty(value),
            Self::Failed(payload) => serde_json::to_string_pretty(payload),
            Self::Invalid(message) => return message.clone(),
        };
        rendered.unwrap_or_else(|err| error_message(err))
    }
}

impl From<HandlerResult<Value>> for ToolOutcome {
    fn from(result: HandlerResult<Value>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(payload) => Self::Failed(payload),
        }
    }
}

fn strings(result: HandlerResult<Vec<String>>) -> HandlerResult<Value> {
    result.map(|items| Value::Array(items.into_iter().map(Value::String).collect()))
}

/// Routes tool calls to the control plane one at a time.
pub struct RequestDispatcher {
    control: XtqControlPlane,
    gate: Mutex<()>,
}

impl RequestDispatcher {
    #[must_use]
    pub fn new(control: XtqControlPlane) -> Self {
        Self {
            control,
            gate: Mutex::new(()),
        }
    }

    /// # Errors
    /// Returns [`DispatchError::UnknownTool`] if the tool is not registered.
    pub async fn dispatch_call(&self, call: &ToolCall) -> Result<ToolOutcome, DispatchError> {
        self.dispatch(&call.name, &call.arguments).await
    }

    /// Runs one tool call.
    ///
    /// # Errors
    /// Returns [`DispatchError::UnknownTool`] if `name` is not registered.
    /// Every other failure is reported through the returned [`ToolOutcome`].
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutcome, DispatchError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
        let args = ToolArguments::new(kind.spec(), arguments);
        if let Some(key) = args.missing_required() {
            warn!(tool = name, key, "missing required argument");
            return Ok(ToolOutcome::Invalid(missing_argument_message(key)));
        }

        let _turn = self.gate.lock().await;
        self.control.ensure_ready().await;
        info!(tool = name, "dispatching tool call");
        let result = self.route(kind, &args).await;
        Ok(ToolOutcome::from(result))
    }

    async fn route(&self, kind: ToolKind, args: &ToolArguments<'_>) -> HandlerResult<Value> {
        let control = &self.control;
        match kind {
            ToolKind::TradingDates => strings(control.trading_dates(&args.text("market")).await),
            ToolKind::StockList => strings(control.stock_list(&args.text("sector")).await),
            ToolKind::InstrumentDetail => {
                control
                    .instrument_detail(&args.text("code"), args.flag("iscomplete"))
                    .await
            }
            ToolKind::HistoryMarketData => control.history_market_data(args.market_request()).await,
            ToolKind::LatestMarketData => {
                control
                    .latest_market_data(&args.text("codes"), &args.text("period"))
                    .await
            }
            ToolKind::FullMarketData => control.full_market_data(args.market_request()).await,
            ToolKind::ChartPanel => {
                control
                    .create_chart_panel(ChartPanelRequest {
                        codes: args.provided("codes"),
                        period: args.text("period"),
                        indicator: args.text("indicators"),
                        params: args.text("params"),
                    })
                    .await
            }
            ToolKind::CustomLayout => {
                control
                    .create_custom_layout(CustomLayoutRequest {
                        codes: args.provided("codes"),
                        period: args.text("period"),
                        indicator_name: args.text("indicator_name"),
                        param_names: args.text("param_names"),
                        param_values: args.text("param_values"),
                    })
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args_for<'a>(name: &str, values: &'a Map<String, Value>) -> ToolArguments<'a> {
        let kind = ToolKind::from_name(name).expect("registered");
        ToolArguments::new(kind.spec(), values)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn empty_and_null_required_values_are_missing() {
        let empty = object(json!({"code": ""}));
        assert_eq!(args_for("get_instrument_detail", &empty).missing_required(), Some("code"));
        let null = object(json!({"code": null}));
        assert_eq!(args_for("get_instrument_detail", &null).missing_required(), Some("code"));
        let present = object(json!({"code": "000001.SZ"}));
        assert_eq!(args_for("get_instrument_detail", &present).missing_required(), None);
    }

    #[test]
    fn flags_accept_bools_and_true_strings() {
        for (raw, expected) in [
            (json!(true), true),
            (json!("TRUE"), true),
            (json!("True"), true),
            (json!("yes"), false),
            (json!(1), false),
        ] {
            let values = object(json!({"iscomplete": raw}));
            assert_eq!(args_for("get_instrument_detail", &values).flag("iscomplete"), expected);
        }
        let values = Map::new();
        assert!(!args_for("get_instrument_detail", &values).flag("iscomplete"));
    }

    #[test]
    fn text_falls_back_to_declared_default() {
        let values = object(json!({"period": null, "indicators": "macd", "params": 5}));
        let args = args_for("create_chart_panel", &values);
        assert_eq!(args.text("period"), "1d");
        assert_eq!(args.text("indicators"), "macd");
        assert_eq!(args.text("params"), "5");
        assert_eq!(args.provided("codes"), None);
    }

    #[test]
    fn outcomes_render_pretty_json_without_escaping() {
        let outcome = ToolOutcome::Failed(ErrorPayload::new("未提供有效的股票代码"));
        assert!(outcome.is_error());
        assert_eq!(outcome.render(), "{\n  \"error\": \"未提供有效的股票代码\"\n}");

        let invalid = ToolOutcome::Invalid("错误: 缺少必要参数 'code'".to_string());
        assert_eq!(invalid.render(), "错误: 缺少必要参数 'code'");
        assert!(!ToolOutcome::Success(json!([])).is_error());
    }
}
