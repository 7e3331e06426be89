//! HTTP bridge to a process hosting the native market-data library.
//!
//! The bridge exposes two endpoints: `GET capabilities`, listing the optional
//! methods the native library provides, and `POST call`, which invokes one
//! library method with JSON arguments.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, Uri};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::timeout;
use tracing::{debug, info};

use super::{
    Backend, BackendError, BackendResult, BackendValue, Capabilities, InstrumentDetail,
    MarketData, MarketDataQuery, PanelMethod, PanelPayload, REFRESH_METHOD, START_METHOD,
};

/// Connection settings for the bridge.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    base_url: String,
    timeout: Duration,
}

impl BridgeConfig {
    /// Creates a configuration for the bridge at `base_url`.
    ///
    /// # Errors
    /// Returns [`BackendError::Transport`] if the URL is not an absolute plain http URL.
    pub fn new(base_url: impl AsRef<str>) -> BackendResult<Self> {
        Ok(Self {
            base_url: sanitize_base_url(base_url.as_ref())?,
            timeout: Duration::from_secs(30),
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Backend that forwards every call to the bridge.
pub struct BridgeBackend {
    client: Client<HttpConnector, Body>,
    call_endpoint: Uri,
    base_url: String,
    capabilities: Capabilities,
    timeout: Duration,
}

impl fmt::Debug for BridgeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBackend")
            .field("base_url", &self.base_url)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct CallRequest<'a> {
    method: &'a str,
    args: Value,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CapabilitiesResponse {
    #[serde(default)]
    methods: Vec<String>,
}

impl BridgeBackend {
    /// Connects to the bridge and resolves its capability set.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if the bridge is unreachable or its
    /// capability listing cannot be decoded.
    pub async fn connect(config: BridgeConfig) -> BackendResult<Self> {
        let client = Client::new();
        let capabilities_endpoint = parse_endpoint(&config.base_url, "capabilities")?;
        let call_endpoint = parse_endpoint(&config.base_url, "call")?;

        let bytes = fetch(
            &client,
            Request::get(capabilities_endpoint),
            Body::empty(),
            config.timeout,
        )
        .await?;
        let listing: CapabilitiesResponse = serde_json::from_slice(&bytes)
            .map_err(|err| BackendError::decode(format!("capabilities: {err}")))?;
        let capabilities = Capabilities::from_method_names(&listing.methods);
        info!(
            base_url = %config.base_url,
            methods = ?capabilities.method_names(),
            "connected to market-data bridge"
        );

        Ok(Self {
            client,
            call_endpoint,
            base_url: config.base_url,
            capabilities,
            timeout: config.timeout,
        })
    }

    async fn call(&self, method: &str, args: Value) -> BackendResult<Value> {
        let body = serde_json::to_vec(&CallRequest { method, args }).map_err(|err| {
            BackendError::transport(format!("failed to encode {method} call: {err}"))
        })?;
        debug!(method, "bridge call");

        let bytes = fetch(
            &self.client,
            Request::post(self.call_endpoint.clone()).header(CONTENT_TYPE, "application/json"),
            Body::from(body),
            self.timeout,
        )
        .await?;

        let response: CallResponse = serde_json::from_slice(&bytes)
            .map_err(|err| BackendError::decode(format!("{method}: {err}")))?;
        if let Some(error) = response.error {
            return Err(BackendError::remote(error));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

async fn fetch(
    client: &Client<HttpConnector, Body>,
    builder: hyper::http::request::Builder,
    body: Body,
    limit: Duration,
) -> BackendResult<hyper::body::Bytes> {
    let request = builder
        .body(body)
        .map_err(|err| BackendError::transport(format!("failed to build bridge request: {err}")))?;

    let response = timeout(limit, client.request(request))
        .await
        .map_err(|_| BackendError::transport("bridge request timed out"))?
        .map_err(|err| BackendError::transport(format!("bridge request failed: {err}")))?;

    let status = response.status();
    let bytes = to_bytes(response.into_body())
        .await
        .map_err(|err| BackendError::transport(format!("failed to read bridge response: {err}")))?;

    if !status.is_success() {
        let reason = String::from_utf8_lossy(&bytes).to_string();
        return Err(BackendError::transport(format!("bridge returned {status}: {reason}")));
    }
    Ok(bytes)
}

fn parse_endpoint(base_url: &str, path: &str) -> BackendResult<Uri> {
    format!("{base_url}{path}")
        .parse::<Uri>()
        .map_err(|err| BackendError::transport(format!("invalid bridge endpoint: {err}")))
}

fn sanitize_base_url(raw: &str) -> BackendResult<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("http://") {
        return Err(BackendError::transport(format!(
            "bridge URL must be absolute plain http: {trimmed}"
        )));
    }
    let mut base = trimmed.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| BackendError::transport(format!("invalid bridge URL: {err}")))?;
    Ok(base)
}

fn decode<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> BackendResult<T> {
    serde_json::from_value(value).map_err(|err| BackendError::decode(format!("{method}: {err}")))
}

fn decode_detail(value: Value) -> BackendResult<Option<InstrumentDetail>> {
    match BackendValue::from(value) {
        BackendValue::Null => Ok(None),
        BackendValue::Map(entries) => Ok(Some(entries)),
        other => Err(BackendError::decode(format!(
            "get_instrument_detail: expected an object, got {other}"
        ))),
    }
}

fn decode_market_data(value: Value) -> BackendResult<Option<MarketData>> {
    let codes = match value {
        Value::Object(codes) => codes,
        Value::Null => return Ok(None),
        _ => return Err(BackendError::decode("get_market_data: expected an object")),
    };

    let mut data = MarketData::new();
    for (code, fields) in codes {
        let Value::Object(fields) = fields else {
            return Err(BackendError::decode(format!(
                "get_market_data: series for {code} is not an object"
            )));
        };
        let series = fields
            .into_iter()
            .map(|(field, values)| (field, BackendValue::from(values)))
            .collect();
        data.insert(code, series);
    }
    Ok(Some(data))
}

#[async_trait]
impl Backend for BridgeBackend {
    fn name(&self) -> &str {
        "bridge"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities.clone()
    }

    async fn trading_dates(&self, market: &str) -> BackendResult<Vec<BackendValue>> {
        let value = self.call("get_trading_dates", json!({ "market": market })).await?;
        match BackendValue::from(value) {
            BackendValue::List(dates) => Ok(dates),
            BackendValue::Null => Ok(Vec::new()),
            other => Err(BackendError::decode(format!(
                "get_trading_dates: expected a list, got {other}"
            ))),
        }
    }

    async fn stock_list_in_sector(&self, sector: &str) -> BackendResult<Vec<String>> {
        let value = self
            .call("get_stock_list_in_sector", json!({ "sector": sector }))
            .await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        decode("get_stock_list_in_sector", value)
    }

    async fn instrument_detail(
        &self,
        code: &str,
        complete: bool,
    ) -> BackendResult<Option<InstrumentDetail>> {
        let value = self
            .call(
                "get_instrument_detail",
                json!({ "code": code, "iscomplete": complete }),
            )
            .await?;
        decode_detail(value)
    }

    async fn market_data(&self, query: &MarketDataQuery) -> BackendResult<Option<MarketData>> {
        let mut args = json!({
            "field_list": query.fields,
            "stock_list": query.codes,
            "period": query.period,
            "start_time": query.start_time,
            "end_time": query.end_time,
        });
        if let (Some(count), Some(object)) = (query.count, args.as_object_mut()) {
            object.insert("count".to_string(), json!(count));
        }
        let value = self.call("get_market_data", args).await?;
        decode_market_data(value)
    }

    async fn apply_panels(
        &self,
        method: PanelMethod,
        panels: &[PanelPayload],
    ) -> BackendResult<BackendValue> {
        if !self.capabilities.supports_panel(method) {
            return Err(BackendError::unsupported(method.name()));
        }
        let value = self.call(method.name(), json!({ "panels": panels })).await?;
        Ok(BackendValue::from(value))
    }

    async fn start(&self) -> BackendResult<()> {
        if !self.capabilities.start {
            return Err(BackendError::unsupported(START_METHOD));
        }
        self.call(START_METHOD, json!({})).await.map(|_| ())
    }

    async fn refresh(&self) -> BackendResult<()> {
        if !self.capabilities.refresh {
            return Err(BackendError::unsupported(REFRESH_METHOD));
        }
        self.call(REFRESH_METHOD, json!({})).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let config = BridgeConfig::new(" http://127.0.0.1:58610 ").expect("valid url");
        assert_eq!(config.base_url(), "http://127.0.0.1:58610/");
    }

    #[test]
    fn rejects_relative_urls() {
        assert!(BridgeConfig::new("127.0.0.1:58610").is_err());
        assert!(BridgeConfig::new("https://127.0.0.1:58610").is_err());
    }

    #[test]
    fn market_data_decodes_tagged_arrays() {
        let value = json!({
            "000001.SZ": {
                "close": {"__ndarray__": [10.5, 10.7]},
                "volume": [100, 200],
            }
        });
        let data = decode_market_data(value)
            .expect("decodes")
            .expect("has data");
        assert_eq!(
            data["000001.SZ"]["close"],
            BackendValue::Array(vec![10.5, 10.7])
        );
        assert_eq!(
            data["000001.SZ"]["volume"],
            BackendValue::List(vec![BackendValue::Int(100), BackendValue::Int(200)])
        );
    }

    #[test]
    fn null_detail_means_not_found() {
        assert!(decode_detail(Value::Null).expect("decodes").is_none());
        assert!(decode_detail(json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn connect_fails_when_bridge_is_unreachable() {
        let config = BridgeConfig::new("http://127.0.0.1:9/")
            .expect("valid url")
            .with_timeout(Duration::from_millis(200));
        assert!(BridgeBackend::connect(config).await.is_err());
    }
}
