use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Order enums
// ---------------------------------------------------------------------------

/// The trading side of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange and segment an instrument trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeSegment {
    NseEq,
    NseFno,
    NseCurr,
    BseEq,
    BseFno,
    BseCurr,
    McxComm,
}

impl ExchangeSegment {
    /// Wire name as used in endpoint paths and market feed keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeSegment::NseEq => "NSE_EQ",
            ExchangeSegment::NseFno => "NSE_FNO",
            ExchangeSegment::NseCurr => "NSE_CURR",
            ExchangeSegment::BseEq => "BSE_EQ",
            ExchangeSegment::BseFno => "BSE_FNO",
            ExchangeSegment::BseCurr => "BSE_CURR",
            ExchangeSegment::McxComm => "MCX_COMM",
        }
    }

    /// Exchange identifier as it appears in the instrument master (`SEM_EXM_EXCH_ID`).
    pub fn exchange_id(&self) -> &'static str {
        match self {
            ExchangeSegment::NseEq | ExchangeSegment::NseFno | ExchangeSegment::NseCurr => "NSE",
            ExchangeSegment::BseEq | ExchangeSegment::BseFno | ExchangeSegment::BseCurr => "BSE",
            ExchangeSegment::McxComm => "MCX",
        }
    }

    /// Segment code as it appears in the instrument master (`SEM_SEGMENT`).
    pub fn segment_code(&self) -> &'static str {
        match self {
            ExchangeSegment::NseEq | ExchangeSegment::BseEq => "E",
            ExchangeSegment::NseFno | ExchangeSegment::BseFno => "D",
            ExchangeSegment::NseCurr | ExchangeSegment::BseCurr => "C",
            ExchangeSegment::McxComm => "M",
        }
    }
}

impl std::fmt::Display for ExchangeSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product type for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Cnc,
    Intraday,
    Margin,
    Mtf,
    Co,
    Bo,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    StopLoss,
    StopLossMarket,
}

impl OrderType {
    /// Whether this order type is triggered off a stop price.
    pub fn is_stop(&self) -> bool {
        matches!(self, OrderType::StopLoss | OrderType::StopLossMarket)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
            OrderType::StopLoss => "STOP_LOSS",
            OrderType::StopLossMarket => "STOP_LOSS_MARKET",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long an order stays live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Validity {
    Day,
    Ioc,
}

/// Timing slot for after-market orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmoTime {
    #[serde(rename = "PRE_OPEN")]
    PreOpen,
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "OPEN_30")]
    Open30,
    #[serde(rename = "OPEN_60")]
    Open60,
}

/// Which leg of a bracket/cover order a modification targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegName {
    EntryLeg,
    TargetLeg,
    StopLossLeg,
}

// ---------------------------------------------------------------------------
// Chart enums
// ---------------------------------------------------------------------------

/// Instrument selector for the chart endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentKind {
    Equity,
    Derivatives,
}

/// Candle interval for intraday charts, serialized as the minute count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartInterval {
    #[serde(rename = "1")]
    Min1,
    #[serde(rename = "5")]
    Min5,
    #[serde(rename = "15")]
    Min15,
    #[serde(rename = "25")]
    Min25,
    #[serde(rename = "60")]
    Min60,
}

impl ChartInterval {
    pub fn minutes(&self) -> u32 {
        match self {
            ChartInterval::Min1 => 1,
            ChartInterval::Min5 => 5,
            ChartInterval::Min15 => 15,
            ChartInterval::Min25 => 25,
            ChartInterval::Min60 => 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionType::Buy).unwrap(),
            "\"BUY\""
        );
        assert_eq!(
            serde_json::to_string(&ExchangeSegment::NseFno).unwrap(),
            "\"NSE_FNO\""
        );
        assert_eq!(
            serde_json::to_string(&OrderType::StopLossMarket).unwrap(),
            "\"STOP_LOSS_MARKET\""
        );
        assert_eq!(serde_json::to_string(&AmoTime::Open30).unwrap(), "\"OPEN_30\"");
        assert_eq!(
            serde_json::to_string(&ChartInterval::Min15).unwrap(),
            "\"15\""
        );
    }

    #[test]
    fn test_invalid_enum_value_rejected() {
        let err = serde_json::from_str::<OrderType>("\"BANANA\"");
        assert!(err.is_err());
        let err = serde_json::from_str::<ExchangeSegment>("\"NASDAQ\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_segment_master_codes() {
        assert_eq!(ExchangeSegment::NseEq.exchange_id(), "NSE");
        assert_eq!(ExchangeSegment::NseEq.segment_code(), "E");
        assert_eq!(ExchangeSegment::BseFno.segment_code(), "D");
        assert_eq!(ExchangeSegment::McxComm.exchange_id(), "MCX");
    }

    #[test]
    fn test_stop_order_detection() {
        assert!(OrderType::StopLoss.is_stop());
        assert!(OrderType::StopLossMarket.is_stop());
        assert!(!OrderType::Limit.is_stop());
    }
}
