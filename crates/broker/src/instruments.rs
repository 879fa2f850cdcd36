use crate::client::{DhanApi, DhanError};
use dhanmcp_core::ExchangeSegment;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub const INSTRUMENT_MASTER_COMPACT_URL: &str =
    "https://images.dhan.co/api-data/api-scrip-master.csv";
pub const INSTRUMENT_MASTER_DETAILED_URL: &str =
    "https://images.dhan.co/api-data/api-scrip-master-detailed.csv";

/// One row of the instrument master.
///
/// Field names follow the scrip-master column headers, which the
/// `/instrument/{segment}` endpoint reuses as JSON keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    #[serde(rename = "SEM_SMST_SECURITY_ID", deserialize_with = "string_or_number")]
    pub security_id: String,
    #[serde(rename = "SEM_EXM_EXCH_ID")]
    pub exchange: String,
    #[serde(rename = "SEM_SEGMENT", default)]
    pub segment: Option<String>,
    #[serde(rename = "SEM_TRADING_SYMBOL", default)]
    pub trading_symbol: Option<String>,
    #[serde(rename = "SEM_CUSTOM_SYMBOL", default)]
    pub custom_symbol: Option<String>,
    #[serde(rename = "SM_SYMBOL_NAME", default)]
    pub symbol_name: Option<String>,
    #[serde(rename = "SEM_INSTRUMENT_NAME", default)]
    pub instrument_name: Option<String>,
    #[serde(
        rename = "SEM_LOT_UNITS",
        default,
        deserialize_with = "opt_string_or_number"
    )]
    pub lot_units: Option<String>,
}

impl InstrumentRecord {
    /// Case-insensitive substring match over the three name columns.
    /// `query` must already be lowercased.
    pub fn matches_query(&self, query: &str) -> bool {
        let hit = |field: &Option<String>| {
            field
                .as_deref()
                .map(|v| v.to_lowercase().contains(query))
                .unwrap_or(false)
        };
        hit(&self.symbol_name) || hit(&self.custom_symbol) || hit(&self.trading_symbol)
    }

    pub fn in_segment(&self, segment: ExchangeSegment) -> bool {
        self.exchange == segment.exchange_id()
            && self.segment.as_deref() == Some(segment.segment_code())
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Shortcut ids for a handful of heavily traded NSE equities, so symbol
/// lookups for them skip the master download.
pub fn well_known_security_id(query: &str) -> Option<&'static str> {
    match query {
        "reliance" => Some("2885"),
        "tcs" => Some("11536"),
        "infosys" => Some("1594"),
        "hdfcbank" => Some("1333"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

struct ColumnMap {
    security_id: usize,
    exchange: usize,
    segment: Option<usize>,
    trading_symbol: Option<usize>,
    custom_symbol: Option<usize>,
    symbol_name: Option<usize>,
    instrument_name: Option<usize>,
    lot_units: Option<usize>,
}

/// Parse the scrip-master CSV into records, resolving columns by header name
/// so column order does not matter.
pub fn parse_instrument_csv(text: &str) -> Result<Vec<InstrumentRecord>, DhanError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DhanError::Decode(format!("failed to read CSV headers: {}", e)))?
        .clone();

    let columns = resolve_columns(&headers)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let record =
            result.map_err(|e| DhanError::Decode(format!("CSV record error: {}", e)))?;
        let required = |idx: usize| record.get(idx).unwrap_or("").to_string();
        let optional = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let security_id = required(columns.security_id);
        if security_id.is_empty() {
            continue;
        }

        records.push(InstrumentRecord {
            security_id,
            exchange: required(columns.exchange),
            segment: optional(columns.segment),
            trading_symbol: optional(columns.trading_symbol),
            custom_symbol: optional(columns.custom_symbol),
            symbol_name: optional(columns.symbol_name),
            instrument_name: optional(columns.instrument_name),
            lot_units: optional(columns.lot_units),
        });
    }
    Ok(records)
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnMap, DhanError> {
    let security_id = find_column(headers, "SEM_SMST_SECURITY_ID").ok_or_else(|| {
        DhanError::Decode("instrument master has no SEM_SMST_SECURITY_ID column".to_string())
    })?;
    let exchange = find_column(headers, "SEM_EXM_EXCH_ID").ok_or_else(|| {
        DhanError::Decode("instrument master has no SEM_EXM_EXCH_ID column".to_string())
    })?;

    Ok(ColumnMap {
        security_id,
        exchange,
        segment: find_column(headers, "SEM_SEGMENT"),
        trading_symbol: find_column(headers, "SEM_TRADING_SYMBOL"),
        custom_symbol: find_column(headers, "SEM_CUSTOM_SYMBOL"),
        symbol_name: find_column(headers, "SM_SYMBOL_NAME"),
        instrument_name: find_column(headers, "SEM_INSTRUMENT_NAME"),
        lot_units: find_column(headers, "SEM_LOT_UNITS"),
    })
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Filter records by query and optional segment / instrument-type filters.
pub fn search_records(
    records: &[InstrumentRecord],
    query: &str,
    segment: Option<ExchangeSegment>,
    instrument: Option<&str>,
    limit: usize,
) -> Vec<InstrumentRecord> {
    let query = query.to_lowercase();
    let mut matches = Vec::new();
    for record in records {
        if !record.matches_query(&query) {
            continue;
        }
        if let Some(segment) = segment {
            if !record.in_segment(segment) {
                continue;
            }
        }
        if let Some(kind) = instrument {
            if record.instrument_name.as_deref() != Some(kind) {
                continue;
            }
        }
        matches.push(record.clone());
        if matches.len() >= limit {
            break;
        }
    }
    matches
}

/// Lazily downloaded, process-wide instrument master.
///
/// This is a read-only lookup table, not an API response cache: it is
/// fetched at most once per process.
#[derive(Default)]
pub struct InstrumentStore {
    cache: RwLock<Option<Arc<Vec<InstrumentRecord>>>>,
}

impl InstrumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached master, downloading and parsing it on first use.
    pub async fn records(
        &self,
        api: &dyn DhanApi,
    ) -> Result<Arc<Vec<InstrumentRecord>>, DhanError> {
        if let Some(records) = self.cache.read().await.as_ref() {
            return Ok(records.clone());
        }
        let text = api.instrument_master_csv(false).await?;
        let parsed = Arc::new(parse_instrument_csv(&text)?);
        info!(instruments = parsed.len(), "instrument master loaded");
        *self.cache.write().await = Some(parsed.clone());
        Ok(parsed)
    }

    pub async fn search(
        &self,
        api: &dyn DhanApi,
        query: &str,
        segment: Option<ExchangeSegment>,
        instrument: Option<&str>,
        limit: usize,
    ) -> Result<Vec<InstrumentRecord>, DhanError> {
        let records = self.records(api).await?;
        Ok(search_records(&records, query, segment, instrument, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
SEM_EXM_EXCH_ID,SEM_SEGMENT,SEM_SMST_SECURITY_ID,SEM_INSTRUMENT_NAME,SEM_TRADING_SYMBOL,SEM_LOT_UNITS,SEM_CUSTOM_SYMBOL,SM_SYMBOL_NAME
NSE,E,1333,EQUITY,HDFCBANK,1,HDFC Bank,HDFC BANK LTD
NSE,E,2885,EQUITY,RELIANCE,1,Reliance Industries,RELIANCE INDUSTRIES LTD
BSE,E,500180,EQUITY,HDFCBANK,1,HDFC Bank,HDFC BANK LTD
NSE,D,49081,FUTIDX,NIFTY-Jun2025-FUT,75,,NIFTY
";

    #[test]
    fn test_parse_master() {
        let records = parse_instrument_csv(SAMPLE_CSV).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].security_id, "1333");
        assert_eq!(records[0].exchange, "NSE");
        assert_eq!(records[3].lot_units.as_deref(), Some("75"));
        assert!(records[3].custom_symbol.is_none());
    }

    #[test]
    fn test_parse_rejects_missing_id_column() {
        let bad = "FOO,BAR\n1,2\n";
        assert!(parse_instrument_csv(bad).is_err());
    }

    #[test]
    fn test_search_case_insensitive() {
        let records = parse_instrument_csv(SAMPLE_CSV).unwrap();
        let hits = search_records(&records, "hdfc", None, None, 10);
        assert_eq!(hits.len(), 2);
        let hits = search_records(&records, "RELIANCE", None, None, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].security_id, "2885");
    }

    #[test]
    fn test_search_segment_filter() {
        let records = parse_instrument_csv(SAMPLE_CSV).unwrap();
        let hits = search_records(&records, "hdfc", Some(ExchangeSegment::BseEq), None, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].security_id, "500180");
        let hits = search_records(&records, "nifty", Some(ExchangeSegment::NseFno), None, 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_instrument_filter() {
        let records = parse_instrument_csv(SAMPLE_CSV).unwrap();
        let hits = search_records(&records, "nifty", None, Some("FUTIDX"), 10);
        assert_eq!(hits.len(), 1);
        let hits = search_records(&records, "nifty", None, Some("OPTIDX"), 10);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_limit() {
        let records = parse_instrument_csv(SAMPLE_CSV).unwrap();
        let hits = search_records(&records, "hdfc", None, None, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_well_known_ids() {
        assert_eq!(well_known_security_id("reliance"), Some("2885"));
        assert_eq!(well_known_security_id("hdfcbank"), Some("1333"));
        assert_eq!(well_known_security_id("unknown"), None);
    }

    #[test]
    fn test_record_from_json_with_numeric_id() {
        let raw = serde_json::json!({
            "SEM_SMST_SECURITY_ID": 2885,
            "SEM_EXM_EXCH_ID": "NSE",
            "SEM_SEGMENT": "E",
            "SEM_TRADING_SYMBOL": "RELIANCE",
            "SEM_LOT_UNITS": 1
        });
        let record: InstrumentRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.security_id, "2885");
        assert_eq!(record.lot_units.as_deref(), Some("1"));
    }
}
