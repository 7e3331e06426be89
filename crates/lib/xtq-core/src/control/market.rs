use serde_json::{Value, json};
use tracing::{error, info};
use xtq_model::schema::{STOCK_LIST_LIMIT, TRADING_DATES_LIMIT, error_message};
use xtq_model::{MarketDataRequest, ohlcv_fields};

use super::{NO_VALID_CODES, XtqControlPlane};
use crate::backend::{BackendResult, MarketDataQuery};
use crate::error::{ErrorPayload, HandlerResult};
use crate::normalize::{format_trading_date, normalize_detail, normalize_market_data};

/// Flavor of market-data query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketDataKind {
    History,
    Latest,
    Full,
}

impl MarketDataKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::History => "历史行情数据",
            Self::Latest => "最新行情数据",
            Self::Full => "历史+最新行情数据",
        }
    }

    /// Row limit sent to the backend.
    #[must_use]
    pub const fn count(self) -> Option<i64> {
        match self {
            Self::History => None,
            Self::Latest => Some(1),
            Self::Full => Some(-1),
        }
    }

    // History queries pass codes through unfiltered.
    #[must_use]
    pub const fn filters_codes(self) -> bool {
        !matches!(self, Self::History)
    }
}

impl XtqControlPlane {
    /// Most recent trading dates of a market, oldest first, at most 30.
    ///
    /// # Errors
    /// Returns an [`ErrorPayload`] if the backend call fails.
    pub async fn trading_dates(&self, market: &str) -> HandlerResult<Vec<String>> {
        self.ensure_ready().await;
        info!(market, "get_trading_dates");
        let dates = self.backend().trading_dates(market).await.map_err(|err| {
            error!(market, error = %err, "failed to fetch trading dates");
            ErrorPayload::new(error_message(&err))
        })?;

        if dates.is_empty() {
            return Ok(vec!["未找到交易日期数据".to_string()]);
        }
        let start = dates.len().saturating_sub(TRADING_DATES_LIMIT);
        Ok(dates[start..].iter().map(format_trading_date).collect())
    }

    /// Up to the first 50 codes of a sector.
    pub(crate) async fn sector_codes(&self, sector: &str) -> BackendResult<Vec<String>> {
        let mut codes = self.backend().stock_list_in_sector(sector).await?;
        codes.truncate(STOCK_LIST_LIMIT);
        Ok(codes)
    }

    /// Codes of a sector, or a single descriptive message when it is empty.
    ///
    /// # Errors
    /// Returns an [`ErrorPayload`] if the backend call fails.
    pub async fn stock_list(&self, sector: &str) -> HandlerResult<Vec<String>> {
        self.ensure_ready().await;
        info!(sector, "get_stock_list_in_sector");
        let codes = self.sector_codes(sector).await.map_err(|err| {
            error!(sector, error = %err, "failed to fetch stock list");
            ErrorPayload::new(error_message(&err))
        })?;

        if codes.is_empty() {
            return Ok(vec![format!("未找到板块 {sector} 的股票列表")]);
        }
        Ok(codes)
    }

    /// Instrument attributes for `code`, passed to the backend verbatim.
    ///
    /// # Errors
    /// Returns an [`ErrorPayload`] if the backend call fails.
    pub async fn instrument_detail(&self, code: &str, complete: bool) -> HandlerResult<Value> {
        self.ensure_ready().await;
        info!(code, complete, "get_instrument_detail");
        let detail = self
            .backend()
            .instrument_detail(code, complete)
            .await
            .map_err(|err| {
                error!(code, error = %err, "failed to fetch instrument detail");
                ErrorPayload::new(err.to_string())
            })?;

        Ok(detail.map_or_else(
            || json!({ "message": format!("未找到股票代码 {code} 的详细信息") }),
            |detail| Value::Object(normalize_detail(&detail)),
        ))
    }

    /// # Errors
    /// Returns an [`ErrorPayload`] if no codes remain or the backend call fails.
    pub async fn history_market_data(&self, request: MarketDataRequest) -> HandlerResult<Value> {
        self.market_data(MarketDataKind::History, request).await
    }

    /// Latest OHLCV row for each well-formed code; caller fields are ignored.
    ///
    /// # Errors
    /// Returns an [`ErrorPayload`] if no valid codes remain or the backend call fails.
    pub async fn latest_market_data(&self, codes: &str, period: &str) -> HandlerResult<Value> {
        let request = MarketDataRequest::parse(codes, period, "", "", "");
        self.market_data(MarketDataKind::Latest, request).await
    }

    /// # Errors
    /// Returns an [`ErrorPayload`] if no valid codes remain or the backend call fails.
    pub async fn full_market_data(&self, request: MarketDataRequest) -> HandlerResult<Value> {
        self.market_data(MarketDataKind::Full, request).await
    }

    async fn market_data(
        &self,
        kind: MarketDataKind,
        request: MarketDataRequest,
    ) -> HandlerResult<Value> {
        self.ensure_ready().await;
        if request.codes.is_empty() {
            return Err(ErrorPayload::new(NO_VALID_CODES));
        }
        let request = if kind.filters_codes() {
            request.retain_instrument_codes()
        } else {
            request
        };
        if request.codes.is_empty() {
            return Err(ErrorPayload::new(NO_VALID_CODES));
        }

        let fields = if kind == MarketDataKind::Latest {
            ohlcv_fields()
        } else {
            request.fields
        };
        let query = MarketDataQuery {
            fields,
            codes: request.codes,
            period: request.period,
            start_time: request.start_date,
            end_time: request.end_date,
            count: kind.count(),
        };

        let label = kind.label();
        info!(
            kind = label,
            codes = ?query.codes,
            fields = ?query.fields,
            period = %query.period,
            start = %query.start_time,
            end = %query.end_time,
            "get_market_data"
        );

        let data = self.backend().market_data(&query).await.map_err(|err| {
            error!(kind = label, error = %err, "market data request failed");
            ErrorPayload::new(format!("获取{label}失败: {err}"))
        })?;
        let Some(data) = data else {
            return Err(ErrorPayload::new(format!("获取{label}失败")));
        };

        normalize_market_data(&data).map_err(|err| {
            error!(kind = label, error = %err, "market data could not be normalized");
            ErrorPayload::new(format!("获取{label}失败: {err}"))
        })
    }
}
