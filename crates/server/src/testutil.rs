//! A canned-response `DhanApi` implementation for handler and protocol tests.

use async_trait::async_trait;
use dhanmcp_broker::{DhanApi, DhanError, InstrumentRecord};
use dhanmcp_core::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock upstream: returns one canned JSON payload (decoded through the same
/// typed schemas as the real client), or a canned HTTP failure. Counts calls
/// so tests can prove validation rejected a request before any dispatch.
#[derive(Default)]
pub struct MockApi {
    canned: Option<Value>,
    canned_csv: Mutex<Option<String>>,
    fail: Option<(u16, String)>,
    calls: AtomicUsize,
}

impl MockApi {
    pub fn with_canned(value: Value) -> Self {
        Self {
            canned: Some(value),
            ..Default::default()
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            fail: Some((status, body.to_string())),
            ..Default::default()
        }
    }

    pub fn set_csv(&self, csv: &str) {
        *self.canned_csv.lock().unwrap() = Some(csv.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond<T: DeserializeOwned>(&self) -> Result<T, DhanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((status, body)) = &self.fail {
            return Err(DhanError::Status {
                status: *status,
                body: body.clone(),
            });
        }
        match &self.canned {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| DhanError::Decode(e.to_string())),
            None => Err(DhanError::Decode("no canned response".to_string())),
        }
    }
}

#[async_trait]
impl DhanApi for MockApi {
    async fn profile(&self) -> Result<Profile, DhanError> {
        self.respond()
    }

    async fn place_order(&self, _request: &PlaceOrderRequest) -> Result<OrderResponse, DhanError> {
        self.respond()
    }

    async fn modify_order(
        &self,
        _request: &ModifyOrderRequest,
    ) -> Result<OrderResponse, DhanError> {
        self.respond()
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<OrderResponse, DhanError> {
        self.respond()
    }

    async fn slice_order(
        &self,
        _request: &PlaceOrderRequest,
    ) -> Result<Vec<OrderResponse>, DhanError> {
        self.respond()
    }

    async fn orders(&self) -> Result<Vec<OrderDetail>, DhanError> {
        self.respond()
    }

    async fn order_by_id(&self, _order_id: &str) -> Result<OrderDetail, DhanError> {
        self.respond()
    }

    async fn order_by_correlation_id(
        &self,
        _correlation_id: &str,
    ) -> Result<OrderDetail, DhanError> {
        self.respond()
    }

    async fn trades(&self) -> Result<Vec<TradeDetail>, DhanError> {
        self.respond()
    }

    async fn trades_by_order_id(&self, _order_id: &str) -> Result<Vec<TradeDetail>, DhanError> {
        self.respond()
    }

    async fn trade_history(
        &self,
        _from_date: &str,
        _to_date: &str,
        _page: u32,
    ) -> Result<Vec<HistoricalTrade>, DhanError> {
        self.respond()
    }

    async fn ledger(
        &self,
        _from_date: &str,
        _to_date: &str,
    ) -> Result<Vec<LedgerEntry>, DhanError> {
        self.respond()
    }

    async fn fund_limit(&self) -> Result<FundLimit, DhanError> {
        self.respond()
    }

    async fn margin_calculator(
        &self,
        _request: &MarginRequest,
    ) -> Result<MarginResponse, DhanError> {
        self.respond()
    }

    async fn positions(&self) -> Result<Vec<PositionDetail>, DhanError> {
        self.respond()
    }

    async fn holdings(&self) -> Result<Vec<HoldingDetail>, DhanError> {
        self.respond()
    }

    async fn ltp(
        &self,
        _instruments: &HashMap<String, Vec<u64>>,
        _client_id: &str,
    ) -> Result<MarketFeedResponse<TickerData>, DhanError> {
        self.respond()
    }

    async fn ohlc(
        &self,
        _instruments: &HashMap<String, Vec<u64>>,
        _client_id: &str,
    ) -> Result<MarketFeedResponse<OhlcData>, DhanError> {
        self.respond()
    }

    async fn quote(
        &self,
        _instruments: &HashMap<String, Vec<u64>>,
        _client_id: &str,
    ) -> Result<MarketFeedResponse<QuoteData>, DhanError> {
        self.respond()
    }

    async fn historical(
        &self,
        _request: &HistoricalDataRequest,
    ) -> Result<ChartResponse, DhanError> {
        self.respond()
    }

    async fn intraday(&self, _request: &IntradayDataRequest) -> Result<ChartResponse, DhanError> {
        self.respond()
    }

    async fn instruments_by_segment(
        &self,
        _segment: ExchangeSegment,
    ) -> Result<Vec<InstrumentRecord>, DhanError> {
        self.respond()
    }

    async fn instrument_master_csv(&self, _detailed: bool) -> Result<String, DhanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.canned_csv
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DhanError::Decode("no canned csv".to_string()))
    }
}
