use crate::enums::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Every schema here mirrors one upstream endpoint's payload. Unknown fields
// are a schema mismatch and fail deserialization instead of being dropped.

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Acknowledgement returned by place/modify/cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderResponse {
    pub order_id: String,
    /// Broker-reported status string; no lifecycle is modelled on top of it.
    pub order_status: String,
}

/// A single entry in the order book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderDetail {
    #[serde(default)]
    pub dhan_client_id: Option<String>,
    pub order_id: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub order_status: String,
    pub transaction_type: TransactionType,
    pub exchange_segment: ExchangeSegment,
    pub product_type: ProductType,
    pub order_type: OrderType,
    pub validity: Validity,
    #[serde(default)]
    pub trading_symbol: Option<String>,
    pub security_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub disclosed_quantity: Option<u32>,
    #[serde(default)]
    pub remaining_quantity: Option<u32>,
    #[serde(default)]
    pub filled_qty: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub trigger_price: Option<f64>,
    #[serde(default)]
    pub average_traded_price: Option<f64>,
    #[serde(default)]
    pub after_market_order: Option<bool>,
    #[serde(default)]
    pub amo_time: Option<AmoTime>,
    #[serde(default)]
    pub leg_name: Option<LegName>,
    #[serde(default)]
    pub bo_profit_value: Option<f64>,
    #[serde(default)]
    pub bo_stop_loss_value: Option<f64>,
    #[serde(default)]
    pub exchange_order_id: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub exchange_time: Option<String>,
    #[serde(default)]
    pub drv_expiry_date: Option<String>,
    #[serde(default)]
    pub drv_option_type: Option<String>,
    #[serde(default)]
    pub drv_strike_price: Option<f64>,
    #[serde(default)]
    pub oms_error_code: Option<String>,
    #[serde(default)]
    pub oms_error_description: Option<String>,
    #[serde(default)]
    pub algo_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// An executed trade for the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TradeDetail {
    #[serde(default)]
    pub dhan_client_id: Option<String>,
    pub order_id: String,
    #[serde(default)]
    pub exchange_order_id: Option<String>,
    #[serde(default)]
    pub exchange_trade_id: Option<String>,
    pub transaction_type: TransactionType,
    pub exchange_segment: ExchangeSegment,
    pub product_type: ProductType,
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub trading_symbol: Option<String>,
    #[serde(default)]
    pub custom_symbol: Option<String>,
    pub security_id: String,
    pub traded_quantity: u32,
    pub traded_price: f64,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub exchange_time: Option<String>,
    #[serde(default)]
    pub drv_expiry_date: Option<String>,
    #[serde(default)]
    pub drv_option_type: Option<String>,
    #[serde(default)]
    pub drv_strike_price: Option<f64>,
}

impl TradeDetail {
    pub fn traded_value(&self) -> f64 {
        f64::from(self.traded_quantity) * self.traded_price
    }
}

/// A trade from the historical trade report, including charges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HistoricalTrade {
    #[serde(default)]
    pub dhan_client_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub exchange_order_id: Option<String>,
    #[serde(default)]
    pub exchange_trade_id: Option<String>,
    pub transaction_type: TransactionType,
    pub exchange_segment: ExchangeSegment,
    pub product_type: ProductType,
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub trading_symbol: Option<String>,
    #[serde(default)]
    pub custom_symbol: Option<String>,
    pub security_id: String,
    pub traded_quantity: u32,
    pub traded_price: f64,
    #[serde(default)]
    pub isin: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub exchange_time: Option<String>,
    #[serde(default)]
    pub stt: Option<f64>,
    #[serde(default)]
    pub brokerage_charges: Option<f64>,
    #[serde(default)]
    pub service_tax: Option<f64>,
    #[serde(default)]
    pub sebi_tax: Option<f64>,
    #[serde(default)]
    pub stamp_duty: Option<f64>,
    #[serde(default)]
    pub exchange_transaction_charges: Option<f64>,
    #[serde(default)]
    pub drv_expiry_date: Option<String>,
    #[serde(default)]
    pub drv_option_type: Option<String>,
    #[serde(default)]
    pub drv_strike_price: Option<f64>,
}

impl HistoricalTrade {
    pub fn traded_value(&self) -> f64 {
        f64::from(self.traded_quantity) * self.traded_price
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// User profile and token information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Profile {
    pub dhan_client_id: String,
    pub token_validity: String,
    #[serde(default)]
    pub active_segment: Option<String>,
    #[serde(default)]
    pub ddpi: Option<String>,
    #[serde(default)]
    pub mtf: Option<String>,
    #[serde(default)]
    pub data_plan: Option<String>,
    #[serde(default)]
    pub data_validity: Option<String>,
}

/// Fund and margin limits for the trading account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FundLimit {
    pub dhan_client_id: String,
    /// The upstream field name really is misspelled.
    #[serde(rename = "availabelBalance", default)]
    pub available_balance: f64,
    #[serde(default)]
    pub withdrawable_balance: f64,
    #[serde(default)]
    pub sod_limit: f64,
    #[serde(default)]
    pub utilized_amount: f64,
    #[serde(default)]
    pub collateral_amount: f64,
    #[serde(default)]
    pub receiveable_amount: f64,
    #[serde(default)]
    pub blocked_payout_amount: f64,
}

impl FundLimit {
    /// Utilization of the start-of-day limit, as a percentage.
    pub fn utilization_percent(&self) -> Option<f64> {
        if self.sod_limit > 0.0 {
            Some(self.utilized_amount / self.sod_limit * 100.0)
        } else {
            None
        }
    }
}

/// Margin requirement for a prospective order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MarginResponse {
    #[serde(default)]
    pub total_margin: f64,
    #[serde(default)]
    pub span_margin: f64,
    #[serde(default)]
    pub exposure_margin: f64,
    #[serde(default)]
    pub available_balance: f64,
    #[serde(default)]
    pub variable_margin: f64,
    #[serde(default)]
    pub insufficient_balance: f64,
    #[serde(default)]
    pub brokerage: f64,
    #[serde(default)]
    pub leverage: Option<String>,
}

/// A ledger line. Amounts arrive as strings and are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerEntry {
    #[serde(rename = "dhanClientId", default)]
    pub dhan_client_id: Option<String>,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default)]
    pub voucherdate: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub voucherdesc: Option<String>,
    #[serde(default)]
    pub vouchernumber: Option<String>,
    #[serde(default)]
    pub debit: Option<String>,
    #[serde(default)]
    pub credit: Option<String>,
    #[serde(default)]
    pub runbal: Option<String>,
}

impl LedgerEntry {
    pub fn credit_amount(&self) -> f64 {
        parse_amount(self.credit.as_deref())
    }

    pub fn debit_amount(&self) -> f64 {
        parse_amount(self.debit.as_deref())
    }

    pub fn running_balance(&self) -> f64 {
        parse_amount(self.runbal.as_deref())
    }
}

fn parse_amount(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

/// An open position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PositionDetail {
    #[serde(default)]
    pub dhan_client_id: Option<String>,
    #[serde(default)]
    pub trading_symbol: Option<String>,
    pub security_id: String,
    /// LONG / SHORT / CLOSED, as reported by the broker.
    pub position_type: String,
    pub exchange_segment: ExchangeSegment,
    pub product_type: ProductType,
    #[serde(default)]
    pub buy_avg: f64,
    #[serde(default)]
    pub cost_price: Option<f64>,
    #[serde(default)]
    pub buy_qty: i64,
    #[serde(default)]
    pub sell_avg: f64,
    #[serde(default)]
    pub sell_qty: i64,
    #[serde(default)]
    pub net_qty: i64,
    #[serde(default)]
    pub realized_profit: f64,
    #[serde(default)]
    pub unrealized_profit: f64,
    #[serde(default)]
    pub rbi_reference_rate: Option<f64>,
    #[serde(default)]
    pub multiplier: Option<f64>,
    #[serde(default)]
    pub carry_forward_buy_qty: Option<i64>,
    #[serde(default)]
    pub carry_forward_sell_qty: Option<i64>,
    #[serde(default)]
    pub carry_forward_buy_value: Option<f64>,
    #[serde(default)]
    pub carry_forward_sell_value: Option<f64>,
    #[serde(default)]
    pub day_buy_qty: Option<i64>,
    #[serde(default)]
    pub day_sell_qty: Option<i64>,
    #[serde(default)]
    pub day_buy_value: Option<f64>,
    #[serde(default)]
    pub day_sell_value: Option<f64>,
    #[serde(default)]
    pub cross_currency: Option<bool>,
    #[serde(default)]
    pub drv_expiry_date: Option<String>,
    #[serde(default)]
    pub drv_option_type: Option<String>,
    #[serde(default)]
    pub drv_strike_price: Option<f64>,
}

/// A long-term holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HoldingDetail {
    #[serde(default)]
    pub exchange: Option<String>,
    pub trading_symbol: String,
    pub security_id: String,
    #[serde(default)]
    pub isin: Option<String>,
    #[serde(default)]
    pub total_qty: i64,
    #[serde(default)]
    pub dp_qty: i64,
    #[serde(default)]
    pub t1_qty: i64,
    #[serde(default)]
    pub available_qty: i64,
    #[serde(default)]
    pub collateral_qty: i64,
    #[serde(default)]
    pub avg_cost_price: f64,
}

// ---------------------------------------------------------------------------
// Market feed snapshots
// ---------------------------------------------------------------------------

/// Envelope for the market feed endpoints: segment name → security id → data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketFeedResponse<T> {
    pub data: HashMap<String, HashMap<String, T>>,
    pub status: String,
}

impl<T> MarketFeedResponse<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Last traded price only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickerData {
    pub last_price: f64,
}

/// Open/high/low/close values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OhlcValues {
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
}

/// Last price plus OHLC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OhlcData {
    pub last_price: f64,
    pub ohlc: OhlcValues,
}

/// A single level of the order book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepthLevel {
    pub quantity: i64,
    pub orders: i64,
    pub price: f64,
}

/// Buy and sell sides of the order book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepthData {
    pub buy: Vec<DepthLevel>,
    pub sell: Vec<DepthLevel>,
}

/// Full quote with depth for a single security.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuoteData {
    pub last_price: f64,
    #[serde(default)]
    pub average_price: Option<f64>,
    #[serde(default)]
    pub buy_quantity: Option<i64>,
    #[serde(default)]
    pub sell_quantity: Option<i64>,
    #[serde(default)]
    pub depth: Option<DepthData>,
    #[serde(default)]
    pub last_quantity: Option<i64>,
    #[serde(default)]
    pub last_trade_time: Option<String>,
    #[serde(default)]
    pub lower_circuit_limit: Option<f64>,
    #[serde(default)]
    pub upper_circuit_limit: Option<f64>,
    #[serde(default)]
    pub net_change: Option<f64>,
    #[serde(default)]
    pub ohlc: Option<OhlcValues>,
    #[serde(default)]
    pub oi: Option<i64>,
    #[serde(default)]
    pub oi_day_high: Option<i64>,
    #[serde(default)]
    pub oi_day_low: Option<i64>,
    #[serde(default)]
    pub volume: Option<i64>,
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Column-oriented candle arrays from the chart endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartResponse {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    /// Epoch seconds per candle.
    pub timestamp: Vec<f64>,
    #[serde(default, alias = "openInterest")]
    pub open_interest: Option<Vec<f64>>,
}

impl ChartResponse {
    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ltp_payload_maps_one_to_one() {
        let raw = r#"{
            "data": { "NSE_EQ": { "1333": { "last_price": 1450.5 } } },
            "status": "success"
        }"#;
        let parsed: MarketFeedResponse<TickerData> = serde_json::from_str(raw).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.data["NSE_EQ"]["1333"].last_price, 1450.5);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let raw = r#"{ "last_price": 1450.5, "surprise": true }"#;
        assert!(serde_json::from_str::<TickerData>(raw).is_err());
    }

    #[test]
    fn test_order_detail_round_trip() {
        let raw = serde_json::json!({
            "dhanClientId": "1000000001",
            "orderId": "112111182045",
            "correlationId": "oct-batch-7",
            "orderStatus": "PENDING",
            "transactionType": "BUY",
            "exchangeSegment": "NSE_EQ",
            "productType": "CNC",
            "orderType": "LIMIT",
            "validity": "DAY",
            "tradingSymbol": "HDFCBANK",
            "securityId": "1333",
            "quantity": 5,
            "price": 1450.5,
            "createTime": "2025-04-01 09:20:31"
        });
        let detail: OrderDetail = serde_json::from_value(raw).unwrap();
        assert_eq!(detail.order_id, "112111182045");
        assert_eq!(detail.correlation_id.as_deref(), Some("oct-batch-7"));
        assert_eq!(detail.order_type, OrderType::Limit);
        assert_eq!(detail.price, Some(1450.5));
        assert!(detail.trigger_price.is_none());
    }

    #[test]
    fn test_fund_limit_wire_misspelling() {
        let raw = serde_json::json!({
            "dhanClientId": "1000000001",
            "availabelBalance": 98500.25,
            "sodLimit": 100000.0,
            "utilizedAmount": 1499.75
        });
        let funds: FundLimit = serde_json::from_value(raw).unwrap();
        assert_eq!(funds.available_balance, 98500.25);
        let pct = funds.utilization_percent().unwrap();
        assert!((pct - 1.49975).abs() < 1e-9);
    }

    #[test]
    fn test_ledger_amounts_parse() {
        let raw = serde_json::json!({
            "narration": "Payment received",
            "voucherdate": "2025-04-01",
            "voucherdesc": "JOURNAL",
            "credit": "2500.00",
            "debit": "0.00",
            "runbal": "12500.00"
        });
        let entry: LedgerEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.credit_amount(), 2500.0);
        assert_eq!(entry.debit_amount(), 0.0);
        assert_eq!(entry.running_balance(), 12500.0);
    }

    #[test]
    fn test_quote_with_depth() {
        let raw = serde_json::json!({
            "last_price": 1450.5,
            "buy_quantity": 1200,
            "sell_quantity": 800,
            "volume": 524312,
            "ohlc": { "open": 1441.0, "close": 1439.2, "high": 1455.0, "low": 1438.6 },
            "depth": {
                "buy": [ { "quantity": 100, "orders": 3, "price": 1450.4 } ],
                "sell": [ { "quantity": 250, "orders": 5, "price": 1450.6 } ]
            }
        });
        let quote: QuoteData = serde_json::from_value(raw).unwrap();
        let depth = quote.depth.unwrap();
        assert_eq!(depth.buy[0].orders, 3);
        assert_eq!(depth.sell[0].price, 1450.6);
        assert_eq!(quote.ohlc.unwrap().high, 1455.0);
    }

    #[test]
    fn test_chart_columns() {
        let raw = serde_json::json!({
            "open": [100.0, 101.5],
            "high": [102.0, 103.0],
            "low": [99.5, 101.0],
            "close": [101.5, 102.5],
            "volume": [1200.0, 900.0],
            "timestamp": [1714536900.0, 1714536960.0]
        });
        let chart: ChartResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(chart.len(), 2);
        assert!(chart.open_interest.is_none());
    }
}
