use crate::protocol::CallToolResult;
use dhanmcp_broker::{
    search_records, well_known_security_id, DhanApi, DhanError, InstrumentRecord, InstrumentStore,
    INSTRUMENT_MASTER_COMPACT_URL, INSTRUMENT_MASTER_DETAILED_URL,
};
use dhanmcp_core::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

/// Failures while executing a tool call, each mapping to one of the error
/// kinds reported back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("invalid arguments: {0}")]
    Arguments(String),
    #[error("no instrument matched query '{0}'")]
    NoMatch(String),
    #[error("market feed request failed with status '{0}'")]
    FeedFailed(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] DhanError),
}

/// Translates validated tool calls into client calls and shapes the results.
pub struct ToolDispatcher {
    api: Arc<dyn DhanApi>,
    instruments: InstrumentStore,
}

impl ToolDispatcher {
    pub fn new(api: Arc<dyn DhanApi>) -> Self {
        Self {
            api,
            instruments: InstrumentStore::new(),
        }
    }

    /// Execute a tool. Failures come back as error results, never panics.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.dispatch(name, arguments).await {
            Ok(text) => CallToolResult::text(text),
            Err(err) => {
                warn!(tool = name, error = %err, "tool execution failed");
                CallToolResult::error(err.to_string())
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        match name {
            "get_profile" => self.get_profile().await,
            "validate_token" => self.validate_token().await,
            "place_order" => self.place_order(arguments).await,
            "modify_order" => self.modify_order(arguments).await,
            "cancel_order" => self.cancel_order(arguments).await,
            "slice_order" => self.slice_order(arguments).await,
            "get_orders" => self.get_orders().await,
            "get_order_by_id" => self.get_order_by_id(arguments).await,
            "get_order_by_correlation_id" => self.get_order_by_correlation_id(arguments).await,
            "get_trades" => self.get_trades().await,
            "get_trades_by_order_id" => self.get_trades_by_order_id(arguments).await,
            "get_historical_trades" => self.get_historical_trades(arguments).await,
            "get_positions" => self.get_positions().await,
            "get_holdings" => self.get_holdings().await,
            "get_fund_limits" => self.get_fund_limits().await,
            "calculate_margin" => self.calculate_margin(arguments).await,
            "get_ledger" => self.get_ledger(arguments).await,
            "get_market_ltp" => self.get_market_ltp(arguments).await,
            "get_market_ohlc" => self.get_market_ohlc(arguments).await,
            "get_market_depth" => self.get_market_depth(arguments).await,
            "get_historical_data" => self.get_historical_data(arguments).await,
            "get_intraday_data" => self.get_intraday_data(arguments).await,
            "get_instrument_master" => self.get_instrument_master(arguments).await,
            "search_instruments" => self.search_instruments(arguments).await,
            "get_ltp_by_symbol" => self.get_ltp_by_symbol(arguments).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Read a `dhan://` resource as pretty-printed JSON.
    pub async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        match uri {
            "dhan://profile" => Ok(pretty(&self.api.profile().await?)),
            "dhan://positions" => Ok(pretty(&self.api.positions().await?)),
            "dhan://holdings" => Ok(pretty(&self.api.holdings().await?)),
            "dhan://orders" => Ok(pretty(&self.api.orders().await?)),
            "dhan://trades" => Ok(pretty(&self.api.trades().await?)),
            "dhan://funds" => Ok(pretty(&self.api.fund_limit().await?)),
            other => Err(ToolError::UnknownResource(other.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Account
    // -----------------------------------------------------------------------

    async fn get_profile(&self) -> Result<String, ToolError> {
        let profile = self.api.profile().await?;
        Ok(format!("Profile Information:\n{}", pretty(&profile)))
    }

    async fn validate_token(&self) -> Result<String, ToolError> {
        let profile = self.api.profile().await?;
        Ok(format!(
            "Token Status:\nClient ID: {}\nValid until: {}\nActive Segments: {}",
            profile.dhan_client_id,
            profile.token_validity,
            profile.active_segment.as_deref().unwrap_or("Unknown"),
        ))
    }

    async fn get_fund_limits(&self) -> Result<String, ToolError> {
        let funds = self.api.fund_limit().await?;
        let mut out = String::new();
        let _ = writeln!(out, "Trading Account Fund Information:");
        let _ = writeln!(out, "Client ID: {}", funds.dhan_client_id);
        let _ = writeln!(out, "Available Balance: ₹{:.2}", funds.available_balance);
        let _ = writeln!(out, "Withdrawable Balance: ₹{:.2}", funds.withdrawable_balance);
        let _ = writeln!(out, "SOD Limit: ₹{:.2}", funds.sod_limit);
        let _ = writeln!(out, "Utilized Amount: ₹{:.2}", funds.utilized_amount);
        let _ = writeln!(out, "Collateral Amount: ₹{:.2}", funds.collateral_amount);
        let _ = writeln!(out, "Receiveable Amount: ₹{:.2}", funds.receiveable_amount);
        let _ = writeln!(out, "Blocked Payout: ₹{:.2}", funds.blocked_payout_amount);
        if let Some(pct) = funds.utilization_percent() {
            let _ = write!(out, "Utilization: {:.1}%", pct);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    async fn place_order(&self, arguments: Value) -> Result<String, ToolError> {
        let request: PlaceOrderRequest = parse_args(arguments)?;
        request.validate()?;
        let ack = self.api.place_order(&request).await?;
        Ok(format!(
            "Order Placed Successfully:\nOrder ID: {}\nStatus: {}",
            ack.order_id, ack.order_status
        ))
    }

    async fn modify_order(&self, arguments: Value) -> Result<String, ToolError> {
        let request: ModifyOrderRequest = parse_args(arguments)?;
        request.validate()?;
        let ack = self.api.modify_order(&request).await?;
        Ok(format!(
            "Order Modified Successfully:\nOrder ID: {}\nStatus: {}",
            ack.order_id, ack.order_status
        ))
    }

    async fn cancel_order(&self, arguments: Value) -> Result<String, ToolError> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            order_id: String,
        }
        let params: Params = parse_args(arguments)?;
        if params.order_id.trim().is_empty() {
            return Err(ValidationError::MissingField("orderId").into());
        }
        let ack = self.api.cancel_order(&params.order_id).await?;
        Ok(format!(
            "Order Cancelled:\nOrder ID: {}\nStatus: {}",
            ack.order_id, ack.order_status
        ))
    }

    async fn slice_order(&self, arguments: Value) -> Result<String, ToolError> {
        let request: PlaceOrderRequest = parse_args(arguments)?;
        request.validate()?;
        let acks = self.api.slice_order(&request).await?;
        let ids: Vec<&str> = acks.iter().map(|a| a.order_id.as_str()).collect();
        Ok(format!(
            "Orders Sliced Successfully:\n{}\nOrder IDs: {}",
            pretty(&acks),
            ids.join(", ")
        ))
    }

    async fn get_orders(&self) -> Result<String, ToolError> {
        let orders = self.api.orders().await?;
        if orders.is_empty() {
            return Ok("No orders found for today".to_string());
        }
        let mut out = String::new();
        let _ = writeln!(out, "Total Orders: {}\n", orders.len());
        for order in orders.iter().take(10) {
            let _ = writeln!(out, "Order ID: {}", order.order_id);
            let _ = writeln!(
                out,
                "Symbol: {}",
                order.trading_symbol.as_deref().unwrap_or("N/A")
            );
            let price = order
                .price
                .map(|p| format!("{}", p))
                .unwrap_or_else(|| "Market".to_string());
            let _ = writeln!(
                out,
                "Type: {} {} @ {}",
                order.transaction_type, order.quantity, price
            );
            let _ = writeln!(out, "Status: {}", order.order_status);
            let _ = writeln!(
                out,
                "Time: {}\n",
                order.create_time.as_deref().unwrap_or("N/A")
            );
        }
        if orders.len() > 10 {
            let _ = write!(out, "... and {} more orders", orders.len() - 10);
        }
        Ok(out)
    }

    async fn get_order_by_id(&self, arguments: Value) -> Result<String, ToolError> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            order_id: String,
        }
        let params: Params = parse_args(arguments)?;
        let order = self.api.order_by_id(&params.order_id).await?;
        Ok(format!("Order Details:\n{}", pretty(&order)))
    }

    async fn get_order_by_correlation_id(&self, arguments: Value) -> Result<String, ToolError> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            correlation_id: String,
        }
        let params: Params = parse_args(arguments)?;
        let order = self
            .api
            .order_by_correlation_id(&params.correlation_id)
            .await?;
        Ok(format!("Order Details:\n{}", pretty(&order)))
    }

    // -----------------------------------------------------------------------
    // Trades
    // -----------------------------------------------------------------------

    async fn get_trades(&self) -> Result<String, ToolError> {
        let trades = self.api.trades().await?;
        if trades.is_empty() {
            return Ok("No trades found for today".to_string());
        }
        let mut out = String::new();
        let _ = writeln!(out, "Total Trades: {}\n", trades.len());
        let mut total_value = 0.0;
        for trade in trades.iter().take(10) {
            total_value += trade.traded_value();
            let _ = writeln!(out, "Order ID: {}", trade.order_id);
            let _ = writeln!(
                out,
                "Symbol: {}",
                trade.trading_symbol.as_deref().unwrap_or("N/A")
            );
            let _ = writeln!(
                out,
                "Trade: {} {} @ ₹{}",
                trade.transaction_type, trade.traded_quantity, trade.traded_price
            );
            let _ = writeln!(out, "Value: ₹{:.2}", trade.traded_value());
            let _ = writeln!(
                out,
                "Time: {}\n",
                trade.exchange_time.as_deref().unwrap_or("N/A")
            );
        }
        if trades.len() > 10 {
            let _ = writeln!(out, "... and {} more trades", trades.len() - 10);
        }
        let _ = write!(out, "Total Value (first 10): ₹{:.2}", total_value);
        Ok(out)
    }

    async fn get_trades_by_order_id(&self, arguments: Value) -> Result<String, ToolError> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            order_id: String,
        }
        let params: Params = parse_args(arguments)?;
        let trades = self.api.trades_by_order_id(&params.order_id).await?;
        Ok(format!(
            "Trades for Order ID {}:\n{}",
            params.order_id,
            pretty(&trades)
        ))
    }

    async fn get_historical_trades(&self, arguments: Value) -> Result<String, ToolError> {
        let request: TradeHistoryRequest = parse_args(arguments)?;
        request.validate()?;
        let trades = self
            .api
            .trade_history(&request.from_date, &request.to_date, request.page)
            .await?;
        if trades.is_empty() {
            return Ok(format!(
                "No historical trades found for {} to {}",
                request.from_date, request.to_date
            ));
        }
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Historical Trades ({} to {}, Page {}):",
            request.from_date, request.to_date, request.page
        );
        let _ = writeln!(out, "Total Trades: {}\n", trades.len());
        let total_value: f64 = trades.iter().map(|t| t.traded_value()).sum();
        let _ = writeln!(out, "Total Trade Value: ₹{:.2}\n", total_value);
        let _ = writeln!(out, "Trade Details:");
        for trade in trades.iter().take(10) {
            let _ = writeln!(
                out,
                "Symbol: {}",
                trade.custom_symbol.as_deref().unwrap_or("N/A")
            );
            let _ = writeln!(
                out,
                "Trade: {} {} @ ₹{}",
                trade.transaction_type, trade.traded_quantity, trade.traded_price
            );
            let _ = writeln!(out, "Value: ₹{:.2}", trade.traded_value());
            let _ = writeln!(
                out,
                "Time: {}",
                trade.exchange_time.as_deref().unwrap_or("N/A")
            );
            let _ = writeln!(
                out,
                "Charges: STT: ₹{}, Brokerage: ₹{}\n",
                trade.stt.unwrap_or(0.0),
                trade.brokerage_charges.unwrap_or(0.0)
            );
        }
        if trades.len() > 10 {
            let _ = write!(out, "... and {} more trades", trades.len() - 10);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Portfolio
    // -----------------------------------------------------------------------

    async fn get_positions(&self) -> Result<String, ToolError> {
        let positions = self.api.positions().await?;
        if positions.is_empty() {
            return Ok("No open positions".to_string());
        }
        Ok(format!(
            "Open Positions: {}\n\n{}",
            positions.len(),
            pretty(&positions)
        ))
    }

    async fn get_holdings(&self) -> Result<String, ToolError> {
        let holdings = self.api.holdings().await?;
        if holdings.is_empty() {
            return Ok("No holdings found".to_string());
        }
        Ok(format!(
            "Holdings: {}\n\n{}",
            holdings.len(),
            pretty(&holdings)
        ))
    }

    // -----------------------------------------------------------------------
    // Funds & margin
    // -----------------------------------------------------------------------

    async fn calculate_margin(&self, arguments: Value) -> Result<String, ToolError> {
        let request: MarginRequest = parse_args(arguments)?;
        request.validate()?;
        let margin = self.api.margin_calculator(&request).await?;
        let mut out = String::new();
        let _ = writeln!(out, "Margin Calculation Result:");
        let _ = writeln!(out, "Total Margin Required: ₹{:.2}", margin.total_margin);
        let _ = writeln!(out, "Available Balance: ₹{:.2}", margin.available_balance);
        let _ = writeln!(out, "Span Margin: ₹{:.2}", margin.span_margin);
        let _ = writeln!(out, "Exposure Margin: ₹{:.2}", margin.exposure_margin);
        let _ = writeln!(out, "Variable Margin: ₹{:.2}", margin.variable_margin);
        let _ = writeln!(out, "Brokerage: ₹{:.2}", margin.brokerage);
        let _ = writeln!(
            out,
            "Leverage: {}x",
            margin.leverage.as_deref().unwrap_or("N/A")
        );
        if margin.insufficient_balance > 0.0 {
            let _ = write!(
                out,
                "Insufficient Balance: ₹{:.2}",
                margin.insufficient_balance
            );
        } else {
            let _ = write!(out, "Sufficient balance available");
        }
        Ok(out)
    }

    async fn get_ledger(&self, arguments: Value) -> Result<String, ToolError> {
        let request: DateRangeRequest = parse_args(arguments)?;
        request.validate()?;
        let entries = self
            .api
            .ledger(&request.from_date, &request.to_date)
            .await?;
        if entries.is_empty() {
            return Ok(format!(
                "No ledger entries found for {} to {}",
                request.from_date, request.to_date
            ));
        }
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Ledger Report ({} to {}):",
            request.from_date, request.to_date
        );
        let _ = writeln!(out, "Total Entries: {}\n", entries.len());

        let total_credits: f64 = entries.iter().map(|e| e.credit_amount()).sum();
        let total_debits: f64 = entries.iter().map(|e| e.debit_amount()).sum();
        let _ = writeln!(out, "Summary:");
        let _ = writeln!(out, "Total Credits: ₹{:.2}", total_credits);
        let _ = writeln!(out, "Total Debits: ₹{:.2}", total_debits);
        let _ = writeln!(out, "Net: ₹{:.2}\n", total_credits - total_debits);

        let _ = writeln!(out, "Recent Entries:");
        for entry in entries.iter().take(10) {
            let _ = writeln!(out, "Date: {}", entry.voucherdate.as_deref().unwrap_or("N/A"));
            let _ = writeln!(
                out,
                "Description: {}",
                entry.narration.as_deref().unwrap_or("N/A")
            );
            let _ = writeln!(out, "Type: {}", entry.voucherdesc.as_deref().unwrap_or("N/A"));
            if entry.credit_amount() > 0.0 {
                let _ = writeln!(out, "Credit: ₹{:.2}", entry.credit_amount());
            }
            if entry.debit_amount() > 0.0 {
                let _ = writeln!(out, "Debit: ₹{:.2}", entry.debit_amount());
            }
            let _ = writeln!(out, "Balance: ₹{:.2}\n", entry.running_balance());
        }
        if entries.len() > 10 {
            let _ = write!(out, "... and {} more entries", entries.len() - 10);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Market data
    // -----------------------------------------------------------------------

    async fn get_market_ltp(&self, arguments: Value) -> Result<String, ToolError> {
        let request: MarketFeedRequest = parse_args(arguments)?;
        let body = request.feed_body()?;
        let response = self.api.ltp(&body, &request.client_id).await?;
        if !response.is_success() {
            return Err(ToolError::FeedFailed(response.status));
        }
        let mut out = String::from("Market Data (LTP):\n\n");
        for (segment, securities) in &response.data {
            let _ = writeln!(out, "{}:", segment);
            for (security_id, ticker) in securities {
                let _ = writeln!(out, "  Security ID {}:", security_id);
                let _ = writeln!(out, "    LTP: ₹{}\n", ticker.last_price);
            }
        }
        Ok(out)
    }

    async fn get_market_ohlc(&self, arguments: Value) -> Result<String, ToolError> {
        let request: MarketFeedRequest = parse_args(arguments)?;
        let body = request.feed_body()?;
        let response = self.api.ohlc(&body, &request.client_id).await?;
        if !response.is_success() {
            return Err(ToolError::FeedFailed(response.status));
        }
        let mut out = String::from("Market Data (OHLC):\n\n");
        for (segment, securities) in &response.data {
            let _ = writeln!(out, "{}:", segment);
            for (security_id, data) in securities {
                let _ = writeln!(out, "  Security ID {}:", security_id);
                let _ = writeln!(out, "    LTP: ₹{}", data.last_price);
                let _ = writeln!(out, "    Open: ₹{}", data.ohlc.open);
                let _ = writeln!(out, "    High: ₹{}", data.ohlc.high);
                let _ = writeln!(out, "    Low: ₹{}", data.ohlc.low);
                let _ = writeln!(out, "    Close: ₹{}\n", data.ohlc.close);
            }
        }
        Ok(out)
    }

    async fn get_market_depth(&self, arguments: Value) -> Result<String, ToolError> {
        let request: MarketFeedRequest = parse_args(arguments)?;
        let body = request.feed_body()?;
        let response = self.api.quote(&body, &request.client_id).await?;
        if !response.is_success() {
            return Err(ToolError::FeedFailed(response.status));
        }
        let mut out = String::from("Market Data (DEPTH):\n\n");
        for (segment, securities) in &response.data {
            let _ = writeln!(out, "{}:", segment);
            for (security_id, quote) in securities {
                let _ = writeln!(out, "  Security ID {}:", security_id);
                let _ = writeln!(out, "    LTP: ₹{}", quote.last_price);
                if let Some(ohlc) = &quote.ohlc {
                    let _ = writeln!(out, "    Open: ₹{}", ohlc.open);
                    let _ = writeln!(out, "    High: ₹{}", ohlc.high);
                    let _ = writeln!(out, "    Low: ₹{}", ohlc.low);
                    let _ = writeln!(out, "    Close: ₹{}", ohlc.close);
                }
                if let Some(volume) = quote.volume {
                    let _ = writeln!(out, "    Volume: {}", volume);
                }
                if quote.depth.is_some() {
                    let _ = writeln!(
                        out,
                        "    Buy Qty: {}",
                        quote.buy_quantity.unwrap_or(0)
                    );
                    let _ = writeln!(
                        out,
                        "    Sell Qty: {}",
                        quote.sell_quantity.unwrap_or(0)
                    );
                }
                let _ = writeln!(out);
            }
        }
        Ok(out)
    }

    async fn get_ltp_by_symbol(&self, arguments: Value) -> Result<String, ToolError> {
        let request: LtpBySymbolRequest = parse_args(arguments)?;
        request.validate()?;
        let query = request.query.to_lowercase();

        let security_id = match well_known_security_id(&query) {
            Some(id) => id.to_string(),
            None => {
                let records = self.instruments.records(self.api.as_ref()).await?;
                let hits = search_records(&records, &query, None, None, 1);
                hits.first()
                    .map(|r| r.security_id.clone())
                    .ok_or_else(|| ToolError::NoMatch(request.query.clone()))?
            }
        };
        let numeric = security_id
            .parse::<u64>()
            .map_err(|_| ToolError::NoMatch(request.query.clone()))?;

        let segment = request.exchange_segment.as_str().to_string();
        let mut body = HashMap::new();
        body.insert(segment.clone(), vec![numeric]);

        let response = self.api.ltp(&body, &request.client_id).await?;
        if !response.is_success() {
            return Err(ToolError::FeedFailed(response.status));
        }
        let ltp = response
            .data
            .get(&segment)
            .and_then(|securities| securities.values().next())
            .map(|ticker| ticker.last_price);
        match ltp {
            Some(price) => Ok(format!("{} LTP: ₹{}", request.query.to_uppercase(), price)),
            None => Ok("No LTP data".to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Charts
    // -----------------------------------------------------------------------

    async fn get_historical_data(&self, arguments: Value) -> Result<String, ToolError> {
        let request: HistoricalDataRequest = parse_args(arguments)?;
        request.validate()?;
        let chart = self.api.historical(&request).await?;
        if chart.is_empty() {
            return Ok("No historical data found for the specified period".to_string());
        }
        let mut out = String::new();
        let _ = writeln!(out, "Historical Data ({}):", request.security_id);
        let _ = writeln!(out, "Period: {} to {}", request.from_date, request.to_date);
        let _ = writeln!(out, "Data Points: {}\n", chart.len());
        format_last_candles(&mut out, &chart);
        Ok(out)
    }

    async fn get_intraday_data(&self, arguments: Value) -> Result<String, ToolError> {
        let request: IntradayDataRequest = parse_args(arguments)?;
        request.validate()?;
        let chart = self.api.intraday(&request).await?;
        if chart.is_empty() {
            return Ok("No intraday data found for the specified period".to_string());
        }
        let mut out = String::new();
        let _ = writeln!(out, "Intraday Data ({}):", request.security_id);
        let _ = writeln!(out, "Interval: {} minute(s)", request.interval.minutes());
        let _ = writeln!(out, "Period: {} to {}", request.from_date, request.to_date);
        let _ = writeln!(out, "Data Points: {}\n", chart.len());
        format_last_candles(&mut out, &chart);
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Instruments
    // -----------------------------------------------------------------------

    async fn get_instrument_master(&self, arguments: Value) -> Result<String, ToolError> {
        let request: InstrumentMasterRequest = parse_args(arguments)?;
        if let Some(segment) = request.exchange_segment {
            let instruments = self.api.instruments_by_segment(segment).await?;
            let mut out = String::new();
            let _ = writeln!(out, "Instrument Master for {}:", segment);
            let _ = writeln!(out, "Total Instruments: {}\n", instruments.len());
            for instrument in instruments.iter().take(10) {
                format_instrument(&mut out, instrument);
            }
            if instruments.len() > 10 {
                let _ = write!(out, "... and {} more instruments", instruments.len() - 10);
            }
            return Ok(out);
        }

        let url = if request.detailed {
            INSTRUMENT_MASTER_DETAILED_URL
        } else {
            INSTRUMENT_MASTER_COMPACT_URL
        };
        let csv = self.api.instrument_master_csv(request.detailed).await?;
        let lines: Vec<&str> = csv.lines().filter(|l| !l.trim().is_empty()).collect();
        let records = lines.len().saturating_sub(1);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "Complete Instrument Master ({}):",
            if request.detailed { "Detailed" } else { "Compact" }
        );
        let _ = writeln!(out, "Total Records: {}", records);
        let _ = writeln!(out, "Source: {}\n", url);
        let _ = writeln!(out, "Sample Data (First 5 records):");
        for (i, line) in lines.iter().take(6).enumerate() {
            if i == 0 {
                let _ = writeln!(out, "Headers: {}\n", line);
            } else {
                let _ = writeln!(out, "Record {}: {}", i, line);
            }
        }
        if records > 5 {
            let _ = writeln!(out, "\n... and {} more records", records - 5);
        }
        let _ = write!(out, "\nTo process this data, use the CSV URL: {}", url);
        Ok(out)
    }

    async fn search_instruments(&self, arguments: Value) -> Result<String, ToolError> {
        let request: InstrumentSearchRequest = parse_args(arguments)?;
        request.validate()?;
        let matches = self
            .instruments
            .search(
                self.api.as_ref(),
                &request.query,
                request.exchange_segment,
                request.instrument.as_deref(),
                request.limit,
            )
            .await?;
        if matches.is_empty() {
            return Ok(format!(
                "No instruments found matching '{}'",
                request.query
            ));
        }
        let mut out = String::new();
        let _ = writeln!(out, "Search Results for '{}':", request.query);
        let _ = writeln!(out, "Found {} matching instruments\n", matches.len());
        for instrument in &matches {
            format_instrument(&mut out, instrument);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    // Clients may omit `arguments` entirely; treat that as an empty object.
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::Arguments(e.to_string()))
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn format_instrument(out: &mut String, instrument: &InstrumentRecord) {
    let _ = writeln!(out, "Security ID: {}", instrument.security_id);
    let _ = writeln!(
        out,
        "Symbol: {}",
        instrument.custom_symbol.as_deref().unwrap_or("N/A")
    );
    let _ = writeln!(
        out,
        "Name: {}",
        instrument.symbol_name.as_deref().unwrap_or("N/A")
    );
    let _ = writeln!(out, "Exchange: {}", instrument.exchange);
    let _ = writeln!(
        out,
        "Instrument: {}",
        instrument.instrument_name.as_deref().unwrap_or("N/A")
    );
    let _ = writeln!(
        out,
        "Lot Size: {}\n",
        instrument.lot_units.as_deref().unwrap_or("N/A")
    );
}

/// Print the most recent candles, newest first.
fn format_last_candles(out: &mut String, chart: &ChartResponse) {
    let count = chart.len().min(5);
    for i in 0..count {
        let idx = chart.len() - 1 - i;
        let _ = writeln!(out, "Time: {} (epoch)", chart.timestamp[idx]);
        let _ = writeln!(
            out,
            "OHLC: O:₹{} H:₹{} L:₹{} C:₹{}",
            chart.open[idx], chart.high[idx], chart.low[idx], chart.close[idx]
        );
        let _ = writeln!(out, "Volume: {}\n", chart.volume[idx]);
    }
}
