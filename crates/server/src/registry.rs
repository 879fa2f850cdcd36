use crate::protocol::{ResourceDescriptor, ToolDescriptor};
use serde_json::{json, Value};

const ORDER_SEGMENTS: [&str; 7] = [
    "NSE_EQ", "NSE_FNO", "NSE_CURR", "BSE_EQ", "BSE_FNO", "BSE_CURR", "MCX_COMM",
];
const CHART_SEGMENTS: [&str; 5] = ["NSE_EQ", "NSE_FNO", "BSE_EQ", "BSE_FNO", "MCX_COMM"];
const DATE_PATTERN: &str = "^\\d{4}-\\d{2}-\\d{2}$";

/// Schema properties shared by order placement and slicing.
fn order_entry_properties() -> Value {
    json!({
        "dhanClientId": {
            "type": "string",
            "description": "User specific identification generated by Dhan"
        },
        "correlationId": {
            "type": "string",
            "description": "Caller-generated id for tracking the order back (optional)"
        },
        "transactionType": {
            "type": "string",
            "enum": ["BUY", "SELL"],
            "description": "The trading side of the transaction"
        },
        "exchangeSegment": {
            "type": "string",
            "enum": ORDER_SEGMENTS,
            "description": "Exchange segment"
        },
        "productType": {
            "type": "string",
            "enum": ["CNC", "INTRADAY", "MARGIN", "MTF", "CO", "BO"],
            "description": "Product type"
        },
        "orderType": {
            "type": "string",
            "enum": ["LIMIT", "MARKET", "STOP_LOSS", "STOP_LOSS_MARKET"],
            "description": "Order type"
        },
        "validity": {
            "type": "string",
            "enum": ["DAY", "IOC"],
            "description": "Validity of the order"
        },
        "securityId": {
            "type": "string",
            "description": "Exchange standard id for the scrip"
        },
        "quantity": {
            "type": "integer",
            "description": "Number of shares for the order"
        },
        "price": {
            "type": "number",
            "description": "Order price (required for LIMIT orders)"
        },
        "triggerPrice": {
            "type": "number",
            "description": "Trigger price (required for stop-loss orders)"
        },
        "disclosedQuantity": {
            "type": "integer",
            "description": "Number of shares visible to the market"
        },
        "afterMarketOrder": {
            "type": "boolean",
            "description": "Flag for orders placed after market hours",
            "default": false
        },
        "amoTime": {
            "type": "string",
            "enum": ["PRE_OPEN", "OPEN", "OPEN_30", "OPEN_60"],
            "description": "Timing slot for the after-market order"
        },
        "boProfitValue": {
            "type": "number",
            "description": "Bracket order target price change"
        },
        "boStopLossValue": {
            "type": "number",
            "description": "Bracket order stop-loss price change"
        }
    })
}

const ORDER_ENTRY_REQUIRED: [&str; 8] = [
    "dhanClientId",
    "transactionType",
    "exchangeSegment",
    "productType",
    "orderType",
    "validity",
    "securityId",
    "quantity",
];

fn instruments_by_segment_property() -> Value {
    json!({
        "instruments": {
            "type": "object",
            "description": "Security ids grouped by exchange segment, e.g. {\"NSE_EQ\": [\"1333\"]}",
            "additionalProperties": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "client_id": {
            "type": "string",
            "description": "User specific identification generated by Dhan"
        }
    })
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {}, "required": [] })
}

/// Every tool exposed over `tools/list`, with its input schema.
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "get_profile",
            description: "Get user profile and account information",
            input_schema: empty_schema(),
        },
        ToolDescriptor {
            name: "validate_token",
            description: "Validate the current access token",
            input_schema: empty_schema(),
        },
        ToolDescriptor {
            name: "place_order",
            description: "Place a new trading order",
            input_schema: json!({
                "type": "object",
                "properties": order_entry_properties(),
                "required": ORDER_ENTRY_REQUIRED,
            }),
        },
        ToolDescriptor {
            name: "modify_order",
            description: "Modify a pending order",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dhanClientId": {
                        "type": "string",
                        "description": "User specific identification generated by Dhan"
                    },
                    "orderId": {
                        "type": "string",
                        "description": "Order specific identification generated by Dhan"
                    },
                    "orderType": {
                        "type": "string",
                        "enum": ["LIMIT", "MARKET", "STOP_LOSS", "STOP_LOSS_MARKET"],
                        "description": "Order type"
                    },
                    "legName": {
                        "type": "string",
                        "enum": ["ENTRY_LEG", "TARGET_LEG", "STOP_LOSS_LEG"],
                        "description": "For BO and CO, which leg is modified"
                    },
                    "quantity": {
                        "type": "integer",
                        "description": "Quantity to be modified"
                    },
                    "price": {
                        "type": "number",
                        "description": "Price to be modified"
                    },
                    "disclosedQuantity": {
                        "type": "integer",
                        "description": "Number of shares visible to the market"
                    },
                    "triggerPrice": {
                        "type": "number",
                        "description": "Trigger price for stop-loss orders"
                    },
                    "validity": {
                        "type": "string",
                        "enum": ["DAY", "IOC"],
                        "description": "Validity of the order"
                    }
                },
                "required": ["dhanClientId", "orderId", "orderType", "validity"],
            }),
        },
        ToolDescriptor {
            name: "cancel_order",
            description: "Cancel a pending order",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "orderId": {
                        "type": "string",
                        "description": "Order specific identification generated by Dhan"
                    }
                },
                "required": ["orderId"],
            }),
        },
        ToolDescriptor {
            name: "slice_order",
            description: "Slice an order over the freeze limit into multiple legs",
            input_schema: json!({
                "type": "object",
                "properties": order_entry_properties(),
                "required": ORDER_ENTRY_REQUIRED,
            }),
        },
        ToolDescriptor {
            name: "get_orders",
            description: "Retrieve the list of all orders for the day",
            input_schema: empty_schema(),
        },
        ToolDescriptor {
            name: "get_order_by_id",
            description: "Retrieve the status of a specific order by order id",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "orderId": {
                        "type": "string",
                        "description": "Order specific identification generated by Dhan"
                    }
                },
                "required": ["orderId"],
            }),
        },
        ToolDescriptor {
            name: "get_order_by_correlation_id",
            description: "Retrieve the status of an order by correlation id",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "correlationId": {
                        "type": "string",
                        "description": "Caller-generated id the order was tagged with"
                    }
                },
                "required": ["correlationId"],
            }),
        },
        ToolDescriptor {
            name: "get_trades",
            description: "Retrieve the list of all trades for the day",
            input_schema: empty_schema(),
        },
        ToolDescriptor {
            name: "get_trades_by_order_id",
            description: "Retrieve trade details for a specific order id",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "orderId": {
                        "type": "string",
                        "description": "Order specific identification generated by Dhan"
                    }
                },
                "required": ["orderId"],
            }),
        },
        ToolDescriptor {
            name: "get_historical_trades",
            description: "Retrieve detailed historical trade data for a date range",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from_date": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format",
                        "pattern": DATE_PATTERN
                    },
                    "to_date": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format",
                        "pattern": DATE_PATTERN
                    },
                    "page": {
                        "type": "integer",
                        "description": "Page number (0 for the first page)",
                        "default": 0,
                        "minimum": 0
                    }
                },
                "required": ["from_date", "to_date"],
            }),
        },
        ToolDescriptor {
            name: "get_positions",
            description: "Retrieve open positions for the day",
            input_schema: empty_schema(),
        },
        ToolDescriptor {
            name: "get_holdings",
            description: "Retrieve long-term holdings in the demat account",
            input_schema: empty_schema(),
        },
        ToolDescriptor {
            name: "get_fund_limits",
            description: "Get trading account fund information including balance and margins",
            input_schema: empty_schema(),
        },
        ToolDescriptor {
            name: "calculate_margin",
            description: "Calculate the margin requirement for an order before placing it",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dhanClientId": {
                        "type": "string",
                        "description": "User specific identification generated by Dhan"
                    },
                    "exchangeSegment": {
                        "type": "string",
                        "enum": CHART_SEGMENTS,
                        "description": "Exchange segment"
                    },
                    "transactionType": {
                        "type": "string",
                        "enum": ["BUY", "SELL"],
                        "description": "The trading side of the transaction"
                    },
                    "quantity": {
                        "type": "integer",
                        "description": "Number of shares for the order"
                    },
                    "productType": {
                        "type": "string",
                        "enum": ["CNC", "INTRADAY", "MARGIN", "MTF", "CO", "BO"],
                        "description": "Product type"
                    },
                    "securityId": {
                        "type": "string",
                        "description": "Exchange standard id for the scrip"
                    },
                    "price": {
                        "type": "number",
                        "description": "Price at which the order would be placed"
                    },
                    "triggerPrice": {
                        "type": "number",
                        "description": "Trigger price (for stop-loss orders)"
                    }
                },
                "required": ["dhanClientId", "exchangeSegment", "transactionType", "quantity",
                             "productType", "securityId", "price"],
            }),
        },
        ToolDescriptor {
            name: "get_ledger",
            description: "Retrieve the trading account ledger with credit/debit details",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from_date": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format",
                        "pattern": DATE_PATTERN
                    },
                    "to_date": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format",
                        "pattern": DATE_PATTERN
                    }
                },
                "required": ["from_date", "to_date"],
            }),
        },
        ToolDescriptor {
            name: "get_market_ltp",
            description: "Get the last traded price for multiple instruments",
            input_schema: json!({
                "type": "object",
                "properties": instruments_by_segment_property(),
                "required": ["instruments", "client_id"],
            }),
        },
        ToolDescriptor {
            name: "get_market_ohlc",
            description: "Get OHLC data for multiple instruments",
            input_schema: json!({
                "type": "object",
                "properties": instruments_by_segment_property(),
                "required": ["instruments", "client_id"],
            }),
        },
        ToolDescriptor {
            name: "get_market_depth",
            description: "Get market depth with full quote data including the order book",
            input_schema: json!({
                "type": "object",
                "properties": instruments_by_segment_property(),
                "required": ["instruments", "client_id"],
            }),
        },
        ToolDescriptor {
            name: "get_historical_data",
            description: "Get daily historical OHLC data for an instrument",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "securityId": {
                        "type": "string",
                        "description": "Exchange standard id for the instrument"
                    },
                    "exchangeSegment": {
                        "type": "string",
                        "enum": CHART_SEGMENTS,
                        "description": "Exchange segment"
                    },
                    "instrument": {
                        "type": "string",
                        "enum": ["EQUITY", "DERIVATIVES"],
                        "description": "Instrument type"
                    },
                    "fromDate": {
                        "type": "string",
                        "description": "Start date in YYYY-MM-DD format",
                        "pattern": DATE_PATTERN
                    },
                    "toDate": {
                        "type": "string",
                        "description": "End date in YYYY-MM-DD format",
                        "pattern": DATE_PATTERN
                    },
                    "expiryCode": {
                        "type": "integer",
                        "description": "Expiry code for derivatives (optional)",
                        "default": 0
                    },
                    "oi": {
                        "type": "boolean",
                        "description": "Include open interest data",
                        "default": false
                    }
                },
                "required": ["securityId", "exchangeSegment", "instrument", "fromDate", "toDate"],
            }),
        },
        ToolDescriptor {
            name: "get_intraday_data",
            description: "Get intraday OHLC data with minute-level granularity",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "securityId": {
                        "type": "string",
                        "description": "Exchange standard id for the instrument"
                    },
                    "exchangeSegment": {
                        "type": "string",
                        "enum": CHART_SEGMENTS,
                        "description": "Exchange segment"
                    },
                    "instrument": {
                        "type": "string",
                        "enum": ["EQUITY", "DERIVATIVES"],
                        "description": "Instrument type"
                    },
                    "interval": {
                        "type": "string",
                        "enum": ["1", "5", "15", "25", "60"],
                        "description": "Minute interval (1, 5, 15, 25, 60)"
                    },
                    "fromDate": {
                        "type": "string",
                        "description": "Start datetime in YYYY-MM-DD HH:MM:SS format"
                    },
                    "toDate": {
                        "type": "string",
                        "description": "End datetime in YYYY-MM-DD HH:MM:SS format"
                    },
                    "oi": {
                        "type": "boolean",
                        "description": "Include open interest data",
                        "default": false
                    }
                },
                "required": ["securityId", "exchangeSegment", "instrument", "interval",
                             "fromDate", "toDate"],
            }),
        },
        ToolDescriptor {
            name: "get_instrument_master",
            description: "Get the complete instrument master or a segment-wise list",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "exchangeSegment": {
                        "type": "string",
                        "enum": ORDER_SEGMENTS,
                        "description": "Exchange segment (omit for the complete list)"
                    },
                    "detailed": {
                        "type": "boolean",
                        "description": "Fetch the detailed instrument list with all columns",
                        "default": false
                    }
                },
                "required": [],
            }),
        },
        ToolDescriptor {
            name: "search_instruments",
            description: "Search for instruments by symbol or company name",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (symbol, company name, ...)"
                    },
                    "exchangeSegment": {
                        "type": "string",
                        "enum": ORDER_SEGMENTS,
                        "description": "Filter by exchange segment (optional)"
                    },
                    "instrument": {
                        "type": "string",
                        "enum": ["EQUITY", "OPTIDX", "FUTIDX", "FUTSTK", "OPTSTK"],
                        "description": "Filter by instrument type (optional)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results to return",
                        "default": 20,
                        "maximum": 100
                    }
                },
                "required": ["query"],
            }),
        },
        ToolDescriptor {
            name: "get_ltp_by_symbol",
            description: "Fetch the last traded price by symbol or company name, using the cached instrument master",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Company symbol or name, e.g. 'Reliance'"
                    },
                    "exchangeSegment": {
                        "type": "string",
                        "enum": ["NSE_EQ", "BSE_EQ"],
                        "default": "NSE_EQ"
                    },
                    "client_id": {
                        "type": "string",
                        "description": "User specific identification generated by Dhan"
                    }
                },
                "required": ["query", "client_id"],
            }),
        },
    ]
}

/// Parameterless resources readable over `resources/read`.
pub fn resource_descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor {
            uri: "dhan://profile",
            name: "User Profile",
            description: "Current user profile and account information",
            mime_type: "application/json",
        },
        ResourceDescriptor {
            uri: "dhan://positions",
            name: "Trading Positions",
            description: "Current trading positions",
            mime_type: "application/json",
        },
        ResourceDescriptor {
            uri: "dhan://holdings",
            name: "Holdings",
            description: "Long-term holdings and investments",
            mime_type: "application/json",
        },
        ResourceDescriptor {
            uri: "dhan://orders",
            name: "Order History",
            description: "Trading order history and status for the day",
            mime_type: "application/json",
        },
        ResourceDescriptor {
            uri: "dhan://trades",
            name: "Trade History",
            description: "Executed trades for the day",
            mime_type: "application/json",
        },
        ResourceDescriptor {
            uri: "dhan://funds",
            name: "Account Funds",
            description: "Available funds and margin information",
            mime_type: "application/json",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_are_unique() {
        let tools = tool_descriptors();
        let names: HashSet<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_tool_surface_is_complete() {
        let tools = tool_descriptors();
        assert_eq!(tools.len(), 25);
        let names: Vec<_> = tools.iter().map(|t| t.name).collect();
        for expected in [
            "place_order",
            "slice_order",
            "get_positions",
            "get_holdings",
            "get_market_depth",
            "search_instruments",
            "get_ltp_by_symbol",
        ] {
            assert!(names.contains(&expected), "missing tool {}", expected);
        }
    }

    #[test]
    fn test_place_order_schema_requires_core_fields() {
        let tools = tool_descriptors();
        let place = tools.iter().find(|t| t.name == "place_order").unwrap();
        let required = place.input_schema["required"].as_array().unwrap();
        for field in ["dhanClientId", "orderType", "securityId", "quantity"] {
            assert!(required.iter().any(|v| v == field));
        }
        assert!(place.input_schema["properties"]["orderType"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "STOP_LOSS_MARKET"));
    }

    #[test]
    fn test_resource_uris() {
        let resources = resource_descriptors();
        assert_eq!(resources.len(), 6);
        assert!(resources.iter().all(|r| r.uri.starts_with("dhan://")));
        assert!(resources.iter().all(|r| r.mime_type == "application/json"));
    }
}
