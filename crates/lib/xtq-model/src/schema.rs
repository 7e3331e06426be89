pub const TOOL_GET_TRADING_DATES: &str = "get_trading_dates";
pub const TOOL_GET_STOCK_LIST: &str = "get_stock_list";
pub const TOOL_GET_INSTRUMENT_DETAIL: &str = "get_instrument_detail";
pub const TOOL_GET_HISTORY_MARKET_DATA: &str = "get_history_market_data";
pub const TOOL_GET_LATEST_MARKET_DATA: &str = "get_latest_market_data";
pub const TOOL_GET_FULL_MARKET_DATA: &str = "get_full_market_data";
pub const TOOL_CREATE_CHART_PANEL: &str = "create_chart_panel";
pub const TOOL_CREATE_CUSTOM_LAYOUT: &str = "create_custom_layout";

pub const DEFAULT_MARKET: &str = "SH";
pub const DEFAULT_SECTOR: &str = "沪深A股";
pub const DEFAULT_PERIOD: &str = "1d";
pub const DEFAULT_INDICATOR: &str = "ma";
pub const DEFAULT_INDICATOR_PARAMS: &str = "5,10,20";
pub const DEFAULT_PARAM_NAMES: &str = "n1,n2,n3";

/// Codes used for panels when neither the caller nor the sector lookup supply any.
pub const FALLBACK_PANEL_CODES: &str = "000001.SZ,600519.SH";
pub const PANEL_DEFAULT_CODE_LIMIT: usize = 5;

pub const OHLCV_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

pub const TRADING_DATES_LIMIT: usize = 30;
pub const STOCK_LIST_LIMIT: usize = 50;

/// Prefix for human-readable error text returned as tool content.
pub const ERROR_PREFIX: &str = "错误";

#[must_use]
pub fn missing_argument_message(key: &str) -> String {
    format!("{ERROR_PREFIX}: 缺少必要参数 '{key}'")
}

#[must_use]
pub fn error_message(detail: impl std::fmt::Display) -> String {
    format!("{ERROR_PREFIX}: {detail}")
}
