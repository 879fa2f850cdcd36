use crate::config::{ConfigError, DhanConfig};
use crate::instruments::{InstrumentRecord, INSTRUMENT_MASTER_COMPACT_URL, INSTRUMENT_MASTER_DETAILED_URL};
use async_trait::async_trait;
use dhanmcp_core::*;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Errors surfaced by one API round trip.
#[derive(Debug, thiserror::Error)]
pub enum DhanError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

/// The Dhan endpoint surface, one method per upstream capability.
///
/// Lifted into a trait so the dispatch layer can run against a mocked
/// upstream in tests.
#[async_trait]
pub trait DhanApi: Send + Sync {
    async fn profile(&self) -> Result<Profile, DhanError>;
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderResponse, DhanError>;
    async fn modify_order(&self, request: &ModifyOrderRequest) -> Result<OrderResponse, DhanError>;
    async fn cancel_order(&self, order_id: &str) -> Result<OrderResponse, DhanError>;
    async fn slice_order(&self, request: &PlaceOrderRequest)
        -> Result<Vec<OrderResponse>, DhanError>;
    async fn orders(&self) -> Result<Vec<OrderDetail>, DhanError>;
    async fn order_by_id(&self, order_id: &str) -> Result<OrderDetail, DhanError>;
    async fn order_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> Result<OrderDetail, DhanError>;
    async fn trades(&self) -> Result<Vec<TradeDetail>, DhanError>;
    async fn trades_by_order_id(&self, order_id: &str) -> Result<Vec<TradeDetail>, DhanError>;
    async fn trade_history(
        &self,
        from_date: &str,
        to_date: &str,
        page: u32,
    ) -> Result<Vec<HistoricalTrade>, DhanError>;
    async fn ledger(&self, from_date: &str, to_date: &str) -> Result<Vec<LedgerEntry>, DhanError>;
    async fn fund_limit(&self) -> Result<FundLimit, DhanError>;
    async fn margin_calculator(&self, request: &MarginRequest)
        -> Result<MarginResponse, DhanError>;
    async fn positions(&self) -> Result<Vec<PositionDetail>, DhanError>;
    async fn holdings(&self) -> Result<Vec<HoldingDetail>, DhanError>;
    async fn ltp(
        &self,
        instruments: &HashMap<String, Vec<u64>>,
        client_id: &str,
    ) -> Result<MarketFeedResponse<TickerData>, DhanError>;
    async fn ohlc(
        &self,
        instruments: &HashMap<String, Vec<u64>>,
        client_id: &str,
    ) -> Result<MarketFeedResponse<OhlcData>, DhanError>;
    async fn quote(
        &self,
        instruments: &HashMap<String, Vec<u64>>,
        client_id: &str,
    ) -> Result<MarketFeedResponse<QuoteData>, DhanError>;
    async fn historical(&self, request: &HistoricalDataRequest)
        -> Result<ChartResponse, DhanError>;
    async fn intraday(&self, request: &IntradayDataRequest) -> Result<ChartResponse, DhanError>;
    async fn instruments_by_segment(
        &self,
        segment: ExchangeSegment,
    ) -> Result<Vec<InstrumentRecord>, DhanError>;
    async fn instrument_master_csv(&self, detailed: bool) -> Result<String, DhanError>;
}

/// Authenticated REST client for the Dhan API.
pub struct DhanClient {
    config: DhanConfig,
    http: reqwest::Client,
}

impl DhanClient {
    pub fn new(config: DhanConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&config.access_token)
            .map_err(|_| ConfigError::MalformedCredential("access_token"))?;
        headers.insert("access-token", token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DhanError> {
        debug!(method = "GET", path, "dhan request");
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        decode(response).await
    }

    async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DhanError> {
        debug!(method = "GET", path, "dhan request");
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DhanError> {
        debug!(method = "POST", path, "dhan request");
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        decode(response).await
    }

    async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DhanError> {
        debug!(method = "PUT", path, "dhan request");
        let response = self
            .http
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        decode(response).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DhanError> {
        debug!(method = "DELETE", path, "dhan request");
        let response = self
            .http
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        decode(response).await
    }

    /// Market feed calls carry the client id as an extra header.
    async fn post_feed<T: DeserializeOwned>(
        &self,
        path: &str,
        instruments: &HashMap<String, Vec<u64>>,
        client_id: &str,
    ) -> Result<T, DhanError> {
        debug!(method = "POST", path, "dhan market feed request");
        let header = HeaderValue::from_str(client_id)
            .map_err(|_| DhanError::Network("client id is not a valid header value".to_string()))?;
        let response = self
            .http
            .post(self.url(path))
            .header("client-id", header)
            .json(instruments)
            .send()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, DhanError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DhanError::Network(e.to_string()))?;
    if !status.is_success() {
        return Err(DhanError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| DhanError::Decode(e.to_string()))
}

#[async_trait]
impl DhanApi for DhanClient {
    async fn profile(&self) -> Result<Profile, DhanError> {
        self.get_json("/profile").await
    }

    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderResponse, DhanError> {
        self.post_json("/orders", request).await
    }

    async fn modify_order(&self, request: &ModifyOrderRequest) -> Result<OrderResponse, DhanError> {
        self.put_json(&format!("/orders/{}", request.order_id), request)
            .await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<OrderResponse, DhanError> {
        self.delete_json(&format!("/orders/{}", order_id)).await
    }

    async fn slice_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<Vec<OrderResponse>, DhanError> {
        self.post_json("/orders/slicing", request).await
    }

    async fn orders(&self) -> Result<Vec<OrderDetail>, DhanError> {
        self.get_json("/orders").await
    }

    async fn order_by_id(&self, order_id: &str) -> Result<OrderDetail, DhanError> {
        self.get_json(&format!("/orders/{}", order_id)).await
    }

    async fn order_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> Result<OrderDetail, DhanError> {
        self.get_json(&format!("/orders/external/{}", correlation_id))
            .await
    }

    async fn trades(&self) -> Result<Vec<TradeDetail>, DhanError> {
        self.get_json("/trades").await
    }

    async fn trades_by_order_id(&self, order_id: &str) -> Result<Vec<TradeDetail>, DhanError> {
        self.get_json(&format!("/trades/{}", order_id)).await
    }

    async fn trade_history(
        &self,
        from_date: &str,
        to_date: &str,
        page: u32,
    ) -> Result<Vec<HistoricalTrade>, DhanError> {
        self.get_json(&format!("/trades/{}/{}/{}", from_date, to_date, page))
            .await
    }

    async fn ledger(&self, from_date: &str, to_date: &str) -> Result<Vec<LedgerEntry>, DhanError> {
        self.get_json_query("/ledger", &[("from-date", from_date), ("to-date", to_date)])
            .await
    }

    async fn fund_limit(&self) -> Result<FundLimit, DhanError> {
        self.get_json("/fundlimit").await
    }

    async fn margin_calculator(
        &self,
        request: &MarginRequest,
    ) -> Result<MarginResponse, DhanError> {
        self.post_json("/margincalculator", &request.to_body()).await
    }

    async fn positions(&self) -> Result<Vec<PositionDetail>, DhanError> {
        self.get_json("/positions").await
    }

    async fn holdings(&self) -> Result<Vec<HoldingDetail>, DhanError> {
        self.get_json("/holdings").await
    }

    async fn ltp(
        &self,
        instruments: &HashMap<String, Vec<u64>>,
        client_id: &str,
    ) -> Result<MarketFeedResponse<TickerData>, DhanError> {
        self.post_feed("/marketfeed/ltp", instruments, client_id).await
    }

    async fn ohlc(
        &self,
        instruments: &HashMap<String, Vec<u64>>,
        client_id: &str,
    ) -> Result<MarketFeedResponse<OhlcData>, DhanError> {
        self.post_feed("/marketfeed/ohlc", instruments, client_id).await
    }

    async fn quote(
        &self,
        instruments: &HashMap<String, Vec<u64>>,
        client_id: &str,
    ) -> Result<MarketFeedResponse<QuoteData>, DhanError> {
        self.post_feed("/marketfeed/quote", instruments, client_id).await
    }

    async fn historical(
        &self,
        request: &HistoricalDataRequest,
    ) -> Result<ChartResponse, DhanError> {
        self.post_json("/charts/historical", request).await
    }

    async fn intraday(&self, request: &IntradayDataRequest) -> Result<ChartResponse, DhanError> {
        self.post_json("/charts/intraday", request).await
    }

    async fn instruments_by_segment(
        &self,
        segment: ExchangeSegment,
    ) -> Result<Vec<InstrumentRecord>, DhanError> {
        self.get_json(&format!("/instrument/{}", segment.as_str()))
            .await
    }

    async fn instrument_master_csv(&self, detailed: bool) -> Result<String, DhanError> {
        let url = if detailed {
            INSTRUMENT_MASTER_DETAILED_URL
        } else {
            INSTRUMENT_MASTER_COMPACT_URL
        };
        debug!(url, "downloading instrument master");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DhanError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(DhanError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DhanClient {
        let config = DhanConfig::new("1000000001", "test-token").unwrap();
        DhanClient::new(config).unwrap()
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let client = client();
        assert_eq!(client.url("/orders"), "https://api.dhan.co/v2/orders");
        assert_eq!(
            client.url("/orders/external/my-tag"),
            "https://api.dhan.co/v2/orders/external/my-tag"
        );
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let network = DhanError::Network("connection refused".to_string());
        let status = DhanError::Status {
            status: 401,
            body: "{\"errorMessage\":\"invalid token\"}".to_string(),
        };
        let decode = DhanError::Decode("missing field `orderId`".to_string());
        assert!(network.to_string().contains("network error"));
        assert!(status.to_string().contains("HTTP 401"));
        assert!(decode.to_string().contains("decode"));
    }
}
