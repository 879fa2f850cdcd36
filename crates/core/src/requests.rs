use crate::enums::*;
use crate::error::ValidationError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Body for placing (or slicing) a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub dhan_client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub transaction_type: TransactionType,
    pub exchange_segment: ExchangeSegment,
    pub product_type: ProductType,
    pub order_type: OrderType,
    pub validity: Validity,
    pub security_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosed_quantity: Option<u32>,
    #[serde(default)]
    pub after_market_order: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amo_time: Option<AmoTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bo_profit_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bo_stop_loss_value: Option<f64>,
}

impl PlaceOrderRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("dhanClientId", &self.dhan_client_id)?;
        require_non_empty("securityId", &self.security_id)?;
        if self.quantity == 0 {
            return Err(ValidationError::invalid("quantity", "must be greater than zero"));
        }
        if self.order_type == OrderType::Limit {
            match self.price {
                Some(p) if p > 0.0 => {}
                _ => {
                    return Err(ValidationError::invalid(
                        "price",
                        "a positive price is required for LIMIT orders",
                    ))
                }
            }
        }
        if self.order_type.is_stop() {
            match self.trigger_price {
                Some(p) if p > 0.0 => {}
                _ => {
                    return Err(ValidationError::invalid(
                        "triggerPrice",
                        "a positive trigger price is required for stop-loss orders",
                    ))
                }
            }
        }
        if self.after_market_order && self.amo_time.is_none() {
            return Err(ValidationError::MissingField("amoTime"));
        }
        Ok(())
    }
}

/// Body for modifying a pending order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyOrderRequest {
    pub dhan_client_id: String,
    pub order_id: String,
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leg_name: Option<LegName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosed_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    pub validity: Validity,
}

impl ModifyOrderRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("dhanClientId", &self.dhan_client_id)?;
        require_non_empty("orderId", &self.order_id)?;
        if self.quantity == Some(0) {
            return Err(ValidationError::invalid("quantity", "must be greater than zero"));
        }
        if self.order_type == OrderType::Limit && self.price.is_none() {
            return Err(ValidationError::invalid(
                "price",
                "a price is required when modifying to a LIMIT order",
            ));
        }
        if self.order_type.is_stop() && self.trigger_price.is_none() {
            return Err(ValidationError::invalid(
                "triggerPrice",
                "a trigger price is required when modifying to a stop-loss order",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Margin
// ---------------------------------------------------------------------------

/// Body for the margin calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRequest {
    pub dhan_client_id: String,
    pub exchange_segment: ExchangeSegment,
    pub transaction_type: TransactionType,
    pub quantity: u32,
    pub product_type: ProductType,
    pub security_id: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
}

impl MarginRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("dhanClientId", &self.dhan_client_id)?;
        require_non_empty("securityId", &self.security_id)?;
        if self.quantity == 0 {
            return Err(ValidationError::invalid("quantity", "must be greater than zero"));
        }
        if self.price <= 0.0 {
            return Err(ValidationError::invalid("price", "must be greater than zero"));
        }
        Ok(())
    }

    /// Wire body: the upstream endpoint expects triggerPrice to always be present.
    pub fn to_body(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.entry("triggerPrice")
                .or_insert_with(|| serde_json::json!(0.0));
        }
        value
    }
}

// ---------------------------------------------------------------------------
// Market feed
// ---------------------------------------------------------------------------

/// Arguments for the LTP / OHLC / depth snapshot tools: instruments grouped
/// by exchange segment, plus the client id header value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketFeedRequest {
    pub instruments: HashMap<ExchangeSegment, Vec<String>>,
    pub client_id: String,
}

impl MarketFeedRequest {
    /// Validate and convert to the wire body (segment name → numeric ids).
    pub fn feed_body(&self) -> Result<HashMap<String, Vec<u64>>, ValidationError> {
        require_non_empty("client_id", &self.client_id)?;
        if self.instruments.is_empty() {
            return Err(ValidationError::invalid(
                "instruments",
                "at least one exchange segment is required",
            ));
        }
        let mut body = HashMap::new();
        for (segment, ids) in &self.instruments {
            if ids.is_empty() {
                return Err(ValidationError::invalid(
                    "instruments",
                    format!("segment {} has no security ids", segment),
                ));
            }
            let mut numeric = Vec::with_capacity(ids.len());
            for id in ids {
                let parsed = id.parse::<u64>().map_err(|_| ValidationError::ParseFailed {
                    field: "instruments",
                    value: id.clone(),
                    expected: "numeric security id",
                })?;
                numeric.push(parsed);
            }
            body.insert(segment.as_str().to_string(), numeric);
        }
        Ok(body)
    }
}

/// Arguments for the symbol-based LTP lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtpBySymbolRequest {
    pub query: String,
    #[serde(rename = "exchangeSegment", default = "default_ltp_segment")]
    pub exchange_segment: ExchangeSegment,
    pub client_id: String,
}

fn default_ltp_segment() -> ExchangeSegment {
    ExchangeSegment::NseEq
}

impl LtpBySymbolRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("query", &self.query)?;
        require_non_empty("client_id", &self.client_id)
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Body for daily historical candles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDataRequest {
    pub security_id: String,
    pub exchange_segment: ExchangeSegment,
    pub instrument: InstrumentKind,
    pub from_date: String,
    pub to_date: String,
    #[serde(default)]
    pub expiry_code: i32,
    #[serde(default)]
    pub oi: bool,
}

impl HistoricalDataRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("securityId", &self.security_id)?;
        let from = parse_date("fromDate", &self.from_date)?;
        let to = parse_date("toDate", &self.to_date)?;
        check_order(from, to, &self.from_date, &self.to_date)
    }
}

/// Body for intraday minute candles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradayDataRequest {
    pub security_id: String,
    pub exchange_segment: ExchangeSegment,
    pub instrument: InstrumentKind,
    pub interval: ChartInterval,
    pub from_date: String,
    pub to_date: String,
    #[serde(default)]
    pub oi: bool,
}

impl IntradayDataRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("securityId", &self.security_id)?;
        let from = parse_datetime("fromDate", &self.from_date)?;
        let to = parse_datetime("toDate", &self.to_date)?;
        if from > to {
            return Err(ValidationError::ReversedRange {
                from: self.from_date.clone(),
                to: self.to_date.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// Date range for the ledger report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeRequest {
    pub from_date: String,
    pub to_date: String,
}

impl DateRangeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let from = parse_date("from_date", &self.from_date)?;
        let to = parse_date("to_date", &self.to_date)?;
        check_order(from, to, &self.from_date, &self.to_date)
    }
}

/// Date range plus page for the historical trade report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeHistoryRequest {
    pub from_date: String,
    pub to_date: String,
    #[serde(default)]
    pub page: u32,
}

impl TradeHistoryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let from = parse_date("from_date", &self.from_date)?;
        let to = parse_date("to_date", &self.to_date)?;
        check_order(from, to, &self.from_date, &self.to_date)
    }
}

// ---------------------------------------------------------------------------
// Instruments
// ---------------------------------------------------------------------------

/// Arguments for the instrument master tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentMasterRequest {
    #[serde(rename = "exchangeSegment", default)]
    pub exchange_segment: Option<ExchangeSegment>,
    #[serde(default)]
    pub detailed: bool,
}

/// Arguments for instrument search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSearchRequest {
    pub query: String,
    #[serde(rename = "exchangeSegment", default)]
    pub exchange_segment: Option<ExchangeSegment>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    20
}

pub const MAX_SEARCH_RESULTS: usize = 100;

impl InstrumentSearchRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("query", &self.query)?;
        if self.limit == 0 || self.limit > MAX_SEARCH_RESULTS {
            return Err(ValidationError::invalid(
                "limit",
                format!("must be between 1 and {}", MAX_SEARCH_RESULTS),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ValidationError::ParseFailed {
        field,
        value: value.to_string(),
        expected: "YYYY-MM-DD",
    })
}

fn parse_datetime(field: &'static str, value: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|_| {
        ValidationError::ParseFailed {
            field,
            value: value.to_string(),
            expected: "YYYY-MM-DD HH:MM:SS",
        }
    })
}

fn check_order(
    from: NaiveDate,
    to: NaiveDate,
    from_raw: &str,
    to_raw: &str,
) -> Result<(), ValidationError> {
    if from > to {
        Err(ValidationError::ReversedRange {
            from: from_raw.to_string(),
            to: to_raw.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> PlaceOrderRequest {
        PlaceOrderRequest {
            dhan_client_id: "1000000001".to_string(),
            correlation_id: None,
            transaction_type: TransactionType::Buy,
            exchange_segment: ExchangeSegment::NseEq,
            product_type: ProductType::Cnc,
            order_type: OrderType::Market,
            validity: Validity::Day,
            security_id: "1333".to_string(),
            quantity: 5,
            price: None,
            trigger_price: None,
            disclosed_quantity: None,
            after_market_order: false,
            amo_time: None,
            bo_profit_value: None,
            bo_stop_loss_value: None,
        }
    }

    #[test]
    fn test_market_order_valid() {
        assert!(sample_order().validate().is_ok());
    }

    #[test]
    fn test_limit_order_requires_price() {
        let mut order = sample_order();
        order.order_type = OrderType::Limit;
        assert!(order.validate().is_err());
        order.price = Some(1450.5);
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_stop_order_requires_trigger() {
        let mut order = sample_order();
        order.order_type = OrderType::StopLossMarket;
        assert!(order.validate().is_err());
        order.trigger_price = Some(1440.0);
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut order = sample_order();
        order.quantity = 0;
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_amo_requires_slot() {
        let mut order = sample_order();
        order.after_market_order = true;
        assert!(order.validate().is_err());
        order.amo_time = Some(AmoTime::PreOpen);
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_invalid_order_type_fails_deserialization() {
        let raw = serde_json::json!({
            "dhanClientId": "1000000001",
            "transactionType": "BUY",
            "exchangeSegment": "NSE_EQ",
            "productType": "CNC",
            "orderType": "BANANA",
            "validity": "DAY",
            "securityId": "1333",
            "quantity": 5
        });
        assert!(serde_json::from_value::<PlaceOrderRequest>(raw).is_err());
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let order = sample_order();
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["dhanClientId"], "1000000001");
        assert_eq!(value["transactionType"], "BUY");
        assert_eq!(value["securityId"], "1333");
        // Unset optionals are omitted from the wire body.
        assert!(value.get("price").is_none());
        assert!(value.get("correlationId").is_none());
    }

    #[test]
    fn test_modify_limit_requires_price() {
        let request = ModifyOrderRequest {
            dhan_client_id: "1000000001".to_string(),
            order_id: "112111182045".to_string(),
            order_type: OrderType::Limit,
            leg_name: None,
            quantity: Some(10),
            price: None,
            disclosed_quantity: None,
            trigger_price: None,
            validity: Validity::Day,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_margin_body_defaults_trigger_price() {
        let request = MarginRequest {
            dhan_client_id: "1000000001".to_string(),
            exchange_segment: ExchangeSegment::NseEq,
            transaction_type: TransactionType::Buy,
            quantity: 5,
            product_type: ProductType::Cnc,
            security_id: "1333".to_string(),
            price: 1450.5,
            trigger_price: None,
        };
        assert!(request.validate().is_ok());
        let body = request.to_body();
        assert_eq!(body["triggerPrice"], 0.0);
    }

    #[test]
    fn test_feed_body_converts_ids() {
        let mut instruments = HashMap::new();
        instruments.insert(ExchangeSegment::NseEq, vec!["1333".to_string()]);
        let request = MarketFeedRequest {
            instruments,
            client_id: "1000000001".to_string(),
        };
        let body = request.feed_body().unwrap();
        assert_eq!(body["NSE_EQ"], vec![1333]);
    }

    #[test]
    fn test_feed_body_rejects_non_numeric_id() {
        let mut instruments = HashMap::new();
        instruments.insert(ExchangeSegment::NseEq, vec!["RELIANCE".to_string()]);
        let request = MarketFeedRequest {
            instruments,
            client_id: "1000000001".to_string(),
        };
        assert!(request.feed_body().is_err());
    }

    #[test]
    fn test_feed_body_rejects_empty_map() {
        let request = MarketFeedRequest {
            instruments: HashMap::new(),
            client_id: "1000000001".to_string(),
        };
        assert!(request.feed_body().is_err());
    }

    #[test]
    fn test_date_range_sanity() {
        let range = DateRangeRequest {
            from_date: "2025-04-01".to_string(),
            to_date: "2025-03-01".to_string(),
        };
        assert!(range.validate().is_err());

        let range = DateRangeRequest {
            from_date: "2025-03-01".to_string(),
            to_date: "2025-04-01".to_string(),
        };
        assert!(range.validate().is_ok());
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let range = DateRangeRequest {
            from_date: "01/03/2025".to_string(),
            to_date: "2025-04-01".to_string(),
        };
        assert!(range.validate().is_err());
    }

    #[test]
    fn test_intraday_datetime_range() {
        let request = IntradayDataRequest {
            security_id: "1333".to_string(),
            exchange_segment: ExchangeSegment::NseEq,
            instrument: InstrumentKind::Equity,
            interval: ChartInterval::Min5,
            from_date: "2025-04-01 09:15:00".to_string(),
            to_date: "2025-04-01 15:30:00".to_string(),
            oi: false,
        };
        assert!(request.validate().is_ok());

        let reversed = IntradayDataRequest {
            from_date: "2025-04-01 15:30:00".to_string(),
            to_date: "2025-04-01 09:15:00".to_string(),
            ..request
        };
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn test_search_limit_bounds() {
        let request = InstrumentSearchRequest {
            query: "reliance".to_string(),
            exchange_segment: None,
            instrument: None,
            limit: 500,
        };
        assert!(request.validate().is_err());
    }
}
