//! Ordered tool catalog.
//!
//! Clients may present tools in the order listed here, so the order is part
//! of the protocol surface.

use std::sync::Arc;

use rmcp::model::Tool;
use xtq_model::schema::{
    DEFAULT_INDICATOR, DEFAULT_INDICATOR_PARAMS, DEFAULT_MARKET, DEFAULT_PARAM_NAMES,
    DEFAULT_PERIOD, DEFAULT_SECTOR, TOOL_CREATE_CHART_PANEL, TOOL_CREATE_CUSTOM_LAYOUT,
    TOOL_GET_FULL_MARKET_DATA, TOOL_GET_HISTORY_MARKET_DATA, TOOL_GET_INSTRUMENT_DETAIL,
    TOOL_GET_LATEST_MARKET_DATA, TOOL_GET_STOCK_LIST, TOOL_GET_TRADING_DATES,
};
use xtq_model::{ParamSpec, ToolSpec};

const CODES_DESCRIPTION: &str = "股票代码列表，用逗号分隔，例如 000001.SZ,600519.SH";
const PERIOD_DESCRIPTION: &str = "周期，例如 1d, 1m, 5m 等";
const START_DATE_DESCRIPTION: &str = "开始日期，格式为 YYYYMMDD";
const END_DATE_DESCRIPTION: &str = "结束日期，格式为 YYYYMMDD，为空表示当前日期";
const FIELDS_DESCRIPTION: &str = "字段列表，用逗号分隔，为空表示开高低收量";
const INDICATOR_DESCRIPTION: &str = "指标名称，例如 ma, macd, kdj 等";
const PANEL_CODES_DESCRIPTION: &str =
    "股票代码列表，用逗号分隔，例如 000001.SZ,600519.SH；为空时自动选取沪深A股前5只";

const TRADING_DATES_PARAMS: &[ParamSpec] = &[ParamSpec::text(
    "market",
    "市场代码，例如 SH 表示上海市场",
    DEFAULT_MARKET,
)];

const STOCK_LIST_PARAMS: &[ParamSpec] = &[ParamSpec::text(
    "sector",
    "板块名称，例如 沪深A股",
    DEFAULT_SECTOR,
)];

const INSTRUMENT_DETAIL_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("code", "股票代码，例如 000001.SZ"),
    ParamSpec::flag("iscomplete", "是否获取全部字段，默认为 false", false),
];

const RANGED_MARKET_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("codes", CODES_DESCRIPTION),
    ParamSpec::text("period", PERIOD_DESCRIPTION, DEFAULT_PERIOD),
    ParamSpec::text("start_date", START_DATE_DESCRIPTION, ""),
    ParamSpec::text("end_date", END_DATE_DESCRIPTION, ""),
    ParamSpec::text("fields", FIELDS_DESCRIPTION, ""),
];

const LATEST_MARKET_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("codes", CODES_DESCRIPTION),
    ParamSpec::text("period", PERIOD_DESCRIPTION, DEFAULT_PERIOD),
];

const CHART_PANEL_PARAMS: &[ParamSpec] = &[
    ParamSpec::derived("codes", PANEL_CODES_DESCRIPTION),
    ParamSpec::text("period", PERIOD_DESCRIPTION, DEFAULT_PERIOD),
    ParamSpec::text("indicators", INDICATOR_DESCRIPTION, DEFAULT_INDICATOR),
    ParamSpec::text(
        "params",
        "指标参数，用逗号分隔，例如 5,10,20",
        DEFAULT_INDICATOR_PARAMS,
    ),
];

const CUSTOM_LAYOUT_PARAMS: &[ParamSpec] = &[
    ParamSpec::derived("codes", PANEL_CODES_DESCRIPTION),
    ParamSpec::text("period", PERIOD_DESCRIPTION, DEFAULT_PERIOD),
    ParamSpec::text("indicator_name", INDICATOR_DESCRIPTION, DEFAULT_INDICATOR),
    ParamSpec::text(
        "param_names",
        "参数名称，用逗号分隔，例如 n1,n2,n3 或 short,long,mid",
        DEFAULT_PARAM_NAMES,
    ),
    ParamSpec::text(
        "param_values",
        "参数值，用逗号分隔，例如 5,10,20",
        DEFAULT_INDICATOR_PARAMS,
    ),
];

/// Every tool the server offers, in listing order.
pub const TOOLS: [ToolSpec; 8] = [
    ToolSpec {
        name: TOOL_GET_TRADING_DATES,
        description: "获取指定市场的交易日期列表",
        parameters: TRADING_DATES_PARAMS,
    },
    ToolSpec {
        name: TOOL_GET_STOCK_LIST,
        description: "获取指定板块的股票列表",
        parameters: STOCK_LIST_PARAMS,
    },
    ToolSpec {
        name: TOOL_GET_INSTRUMENT_DETAIL,
        description: "获取指定股票的详细信息",
        parameters: INSTRUMENT_DETAIL_PARAMS,
    },
    ToolSpec {
        name: TOOL_GET_HISTORY_MARKET_DATA,
        description: "获取历史行情数据",
        parameters: RANGED_MARKET_PARAMS,
    },
    ToolSpec {
        name: TOOL_GET_LATEST_MARKET_DATA,
        description: "获取最新行情数据",
        parameters: LATEST_MARKET_PARAMS,
    },
    ToolSpec {
        name: TOOL_GET_FULL_MARKET_DATA,
        description: "获取历史+最新行情数据",
        parameters: RANGED_MARKET_PARAMS,
    },
    ToolSpec {
        name: TOOL_CREATE_CHART_PANEL,
        description: "创建图表面板，显示指定股票的技术指标",
        parameters: CHART_PANEL_PARAMS,
    },
    ToolSpec {
        name: TOOL_CREATE_CUSTOM_LAYOUT,
        description: "创建自定义布局，可以指定指标名称、参数名和参数值",
        parameters: CUSTOM_LAYOUT_PARAMS,
    },
];

#[must_use]
pub const fn list_tools() -> &'static [ToolSpec] {
    &TOOLS
}

/// Registered tools, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    TradingDates,
    StockList,
    InstrumentDetail,
    HistoryMarketData,
    LatestMarketData,
    FullMarketData,
    ChartPanel,
    CustomLayout,
}

impl ToolKind {
    pub const ALL: [Self; 8] = [
        Self::TradingDates,
        Self::StockList,
        Self::InstrumentDetail,
        Self::HistoryMarketData,
        Self::LatestMarketData,
        Self::FullMarketData,
        Self::ChartPanel,
        Self::CustomLayout,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TradingDates => TOOL_GET_TRADING_DATES,
            Self::StockList => TOOL_GET_STOCK_LIST,
            Self::InstrumentDetail => TOOL_GET_INSTRUMENT_DETAIL,
            Self::HistoryMarketData => TOOL_GET_HISTORY_MARKET_DATA,
            Self::LatestMarketData => TOOL_GET_LATEST_MARKET_DATA,
            Self::FullMarketData => TOOL_GET_FULL_MARKET_DATA,
            Self::ChartPanel => TOOL_CREATE_CHART_PANEL,
            Self::CustomLayout => TOOL_CREATE_CUSTOM_LAYOUT,
        }
    }

    /// Catalog entry; `ALL` and `TOOLS` share one order.
    #[must_use]
    pub const fn spec(self) -> &'static ToolSpec {
        let tools: &'static [ToolSpec; 8] = &TOOLS;
        &tools[self as usize]
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Converts a catalog entry into its MCP listing form.
#[must_use]
pub fn to_rmcp_tool(spec: &ToolSpec) -> Tool {
    Tool::new(spec.name, spec.description, Arc::new(spec.input_schema()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_stable() {
        let names: Vec<&str> = list_tools().iter().map(|tool| tool.name).collect();
        assert_eq!(
            names,
            vec![
                "get_trading_dates",
                "get_stock_list",
                "get_instrument_detail",
                "get_history_market_data",
                "get_latest_market_data",
                "get_full_market_data",
                "create_chart_panel",
                "create_custom_layout",
            ]
        );
    }

    #[test]
    fn tool_kinds_line_up_with_catalog() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.spec().name, kind.name());
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::ALL.len(), list_tools().len());
    }

    #[test]
    fn listing_keeps_catalog_order() {
        let listed: Vec<String> = list_tools()
            .iter()
            .map(to_rmcp_tool)
            .map(|tool| tool.name.to_string())
            .collect();
        let expected: Vec<String> = ToolKind::ALL
            .iter()
            .map(|kind| kind.name().to_string())
            .collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn only_lookup_tools_require_codes() {
        let required: Vec<(&str, Vec<&str>)> = list_tools()
            .iter()
            .map(|tool| (tool.name, tool.required_keys().collect::<Vec<_>>()))
            .filter(|(_, keys)| !keys.is_empty())
            .collect();
        assert_eq!(
            required,
            vec![
                ("get_instrument_detail", vec!["code"]),
                ("get_history_market_data", vec!["codes"]),
                ("get_latest_market_data", vec!["codes"]),
                ("get_full_market_data", vec!["codes"]),
            ]
        );
    }

    #[test]
    fn rmcp_tool_carries_schema() {
        let tool = to_rmcp_tool(ToolKind::InstrumentDetail.spec());
        assert_eq!(tool.name, "get_instrument_detail");
        assert_eq!(tool.input_schema["required"], serde_json::json!(["code"]));
        assert_eq!(
            tool.input_schema["properties"]["iscomplete"]["type"],
            serde_json::json!("boolean")
        );
        assert!(ToolKind::from_name("get_quotes").is_none());
    }
}
