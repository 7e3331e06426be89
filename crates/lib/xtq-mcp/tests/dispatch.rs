use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use xtq_core::backend::{
    BackendResult, BackendValue, Capabilities, InstrumentDetail, MarketData, MarketDataQuery,
    MockBackend,
};
use xtq_core::{Backend, XtqControlPlane};
use xtq_mcp::registry::list_tools;
use xtq_mcp::{DispatchError, RequestDispatcher, ToolCall, ToolOutcome};

/// Counts every backend call.
#[derive(Default)]
struct CountingBackend {
    calls: AtomicUsize,
    queried_codes: std::sync::Mutex<Vec<Vec<String>>>,
}

impl CountingBackend {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn trading_dates(&self, _market: &str) -> BackendResult<Vec<BackendValue>> {
        self.touch();
        Ok(Vec::new())
    }

    async fn stock_list_in_sector(&self, _sector: &str) -> BackendResult<Vec<String>> {
        self.touch();
        Ok(Vec::new())
    }

    async fn instrument_detail(
        &self,
        _code: &str,
        _complete: bool,
    ) -> BackendResult<Option<InstrumentDetail>> {
        self.touch();
        Ok(None)
    }

    async fn market_data(&self, query: &MarketDataQuery) -> BackendResult<Option<MarketData>> {
        self.touch();
        self.queried_codes
            .lock()
            .expect("codes lock")
            .push(query.codes.clone());
        Ok(Some(MarketData::new()))
    }
}

fn mock_dispatcher() -> RequestDispatcher {
    RequestDispatcher::new(
        XtqControlPlane::new(Arc::new(MockBackend::new())).with_settle_delay(Duration::ZERO),
    )
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn success(outcome: ToolOutcome) -> Value {
    match outcome {
        ToolOutcome::Success(value) => value,
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_tools_are_protocol_errors() {
    let dispatcher = mock_dispatcher();
    let err = dispatcher
        .dispatch("get_quotes", &Map::new())
        .await
        .expect_err("unknown tool");
    assert_eq!(err, DispatchError::UnknownTool("get_quotes".to_string()));
    assert_eq!(err.to_string(), "Unknown tool: get_quotes");
}

#[tokio::test]
async fn every_registered_tool_returns_content() {
    let dispatcher = mock_dispatcher();
    let arguments = object(json!({"code": "000001.SZ", "codes": "000001.SZ"}));
    for tool in list_tools() {
        let outcome = dispatcher
            .dispatch(tool.name, &arguments)
            .await
            .unwrap_or_else(|err| panic!("{} failed: {err}", tool.name));
        assert!(!outcome.render().is_empty(), "{} rendered nothing", tool.name);
    }
}

#[tokio::test]
async fn missing_required_fields_skip_the_backend() {
    let backend = Arc::new(CountingBackend::default());
    let dispatcher = RequestDispatcher::new(XtqControlPlane::new(backend.clone()));

    for tool in list_tools() {
        for key in tool.required_keys() {
            for arguments in [Map::new(), object(json!({ key: "" }))] {
                let outcome = dispatcher
                    .dispatch(tool.name, &arguments)
                    .await
                    .expect("registered tool");
                assert!(outcome.is_error());
                assert!(outcome.render().contains(key));
            }
        }
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn instrument_detail_without_code_reports_the_key() {
    let outcome = mock_dispatcher()
        .dispatch("get_instrument_detail", &Map::new())
        .await
        .expect("registered tool");
    assert_eq!(
        outcome,
        ToolOutcome::Invalid("错误: 缺少必要参数 'code'".to_string())
    );
}

#[tokio::test]
async fn latest_market_data_queries_only_well_formed_codes() {
    let backend = Arc::new(CountingBackend::default());
    let dispatcher = RequestDispatcher::new(XtqControlPlane::new(backend.clone()));

    let outcome = dispatcher
        .dispatch(
            "get_latest_market_data",
            &object(json!({"codes": "000001.SZ,BAD"})),
        )
        .await
        .expect("registered tool");
    assert!(!outcome.is_error());
    assert_eq!(
        *backend.queried_codes.lock().expect("codes lock"),
        vec![vec!["000001.SZ".to_string()]]
    );

    let outcome = dispatcher
        .dispatch("get_latest_market_data", &object(json!({"codes": "BAD,X"})))
        .await
        .expect("registered tool");
    match outcome {
        ToolOutcome::Failed(payload) => assert_eq!(payload.error, "未提供有效的股票代码"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn mock_trading_dates_render_as_json_list() {
    let value = success(
        mock_dispatcher()
            .dispatch("get_trading_dates", &Map::new())
            .await
            .expect("registered tool"),
    );
    assert_eq!(value, json!(["2023-01-01", "2023-01-02", "2023-01-03"]));
}

#[tokio::test]
async fn mock_instrument_detail_accepts_string_flag() {
    let value = success(
        mock_dispatcher()
            .dispatch(
                "get_instrument_detail",
                &object(json!({"code": "600519.SH", "iscomplete": "True"})),
            )
            .await
            .expect("registered tool"),
    );
    assert_eq!(value["code"], json!("600519.SH"));
    assert_eq!(value["name"], json!("模拟股票"));
}

#[tokio::test]
async fn chart_panel_defaults_to_sector_codes() {
    let value = success(
        mock_dispatcher()
            .dispatch("create_chart_panel", &Map::new())
            .await
            .expect("registered tool"),
    );
    assert_eq!(
        value["details"]["stocks"],
        json!(["000001.SZ", "600519.SH", "300059.SZ"])
    );
    assert_eq!(value["details"]["indicator"], json!("ma"));
    assert_eq!(value["message"], json!("已成功创建 3 个图表面板"));
}

#[tokio::test]
async fn custom_layout_parses_mixed_values() {
    let value = success(
        mock_dispatcher()
            .dispatch(
                "create_custom_layout",
                &object(json!({"codes": "000001.SZ", "param_values": "5,abc,3.5"})),
            )
            .await
            .expect("registered tool"),
    );
    assert_eq!(value["details"]["parameter_values"], json!([5, "abc", 3.5]));
    assert_eq!(
        value["debug_info"]["panel_info"][0]["figures"],
        json!("{'ma': {'n1': 5, 'n2': 'abc', 'n3': 3.5}}")
    );
}

#[tokio::test]
async fn tool_call_without_arguments_uses_defaults() {
    let call = ToolCall::new("get_stock_list", None);
    let value = success(
        mock_dispatcher()
            .dispatch_call(&call)
            .await
            .expect("registered tool"),
    );
    assert_eq!(value, json!(["000001.SZ", "600519.SH", "300059.SZ"]));
}
