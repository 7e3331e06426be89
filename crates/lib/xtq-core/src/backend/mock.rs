//! Deterministic stand-in used when no real market-data service is reachable.

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::info;

use super::{
    Backend, BackendResult, BackendValue, Capabilities, InstrumentDetail, MarketData,
    MarketDataQuery, PanelMethod, PanelPayload,
};

const MOCK_TRADING_DATES: [&str; 3] = ["2023-01-01", "2023-01-02", "2023-01-03"];
const MOCK_SECTOR_CODES: [&str; 3] = ["000001.SZ", "600519.SH", "300059.SZ"];

/// Backend that fabricates fixed sample data.
#[derive(Debug, Clone, Default)]
pub struct MockBackend;

impl MockBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn sample_series(field: &str) -> BackendValue {
    match field {
        "close" => BackendValue::Array(vec![100.0, 101.0, 102.0]),
        "open" => BackendValue::Array(vec![99.0, 100.0, 101.0]),
        "high" => BackendValue::Array(vec![102.0, 103.0, 104.0]),
        "low" => BackendValue::Array(vec![98.0, 99.0, 100.0]),
        "volume" => BackendValue::List(vec![
            BackendValue::Int(10_000),
            BackendValue::Int(12_000),
            BackendValue::Int(15_000),
        ]),
        _ => BackendValue::Array(vec![0.0, 0.0, 0.0]),
    }
}

/// Keeps the most recent `count` rows when a positive limit is requested.
fn tail(series: BackendValue, count: Option<i64>) -> BackendValue {
    let Some(limit) = count.and_then(|count| usize::try_from(count).ok()) else {
        return series;
    };
    match series {
        BackendValue::Array(values) => {
            let start = values.len().saturating_sub(limit);
            BackendValue::Array(values[start..].to_vec())
        }
        BackendValue::List(items) => {
            let start = items.len().saturating_sub(limit);
            BackendValue::List(items[start..].to_vec())
        }
        other => other,
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default().with_panel_method(PanelMethod::ApplyUiPanelControl)
    }

    async fn trading_dates(&self, market: &str) -> BackendResult<Vec<BackendValue>> {
        info!(market, "mock get_trading_dates");
        Ok(MOCK_TRADING_DATES
            .iter()
            .map(|date| BackendValue::Text((*date).to_string()))
            .collect())
    }

    async fn stock_list_in_sector(&self, sector: &str) -> BackendResult<Vec<String>> {
        info!(sector, "mock get_stock_list_in_sector");
        Ok(MOCK_SECTOR_CODES.iter().map(ToString::to_string).collect())
    }

    async fn instrument_detail(
        &self,
        code: &str,
        complete: bool,
    ) -> BackendResult<Option<InstrumentDetail>> {
        info!(code, complete, "mock get_instrument_detail");
        let mut detail = IndexMap::new();
        detail.insert("code".to_string(), BackendValue::Text(code.to_string()));
        detail.insert("name".to_string(), BackendValue::Text("模拟股票".to_string()));
        detail.insert("price".to_string(), BackendValue::Float(100.0));
        Ok(Some(detail))
    }

    async fn market_data(&self, query: &MarketDataQuery) -> BackendResult<Option<MarketData>> {
        info!(
            fields = ?query.fields,
            codes = ?query.codes,
            period = %query.period,
            start_time = %query.start_time,
            end_time = %query.end_time,
            count = ?query.count,
            "mock get_market_data"
        );
        let data = query
            .codes
            .iter()
            .map(|code| {
                let series = query
                    .fields
                    .iter()
                    .map(|field| (field.clone(), tail(sample_series(field), query.count)))
                    .collect();
                (code.clone(), series)
            })
            .collect();
        Ok(Some(data))
    }

    async fn apply_panels(
        &self,
        method: PanelMethod,
        panels: &[PanelPayload],
    ) -> BackendResult<BackendValue> {
        info!(method = method.name(), panels = panels.len(), "mock panel control");
        Ok(BackendValue::Bool(true))
    }
}
