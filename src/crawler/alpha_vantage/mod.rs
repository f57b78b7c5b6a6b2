//! # Alpha Vantage
//!
//! Quotes come from the `GLOBAL_QUOTE` function of the Alpha Vantage REST API,
//! which returns every number as a string keyed by a numbered label:
//!
//! ```json
//! { "Global Quote": { "01. symbol": "^BVSP", "05. price": "128431.2000", ... } }
//! ```
//!
//! Free keys are rate limited; an exhausted key answers `200 OK` with a
//! `Note` or `Information` object instead of a quote.

/// GLOBAL_QUOTE request and response parsing
pub mod price;

const HOST: &str = "www.alphavantage.co";

pub struct AlphaVantage {
    symbol: String,
    api_key: String,
}

impl AlphaVantage {
    pub fn new(symbol: &str, api_key: &str) -> Self {
        AlphaVantage {
            symbol: symbol.to_string(),
            api_key: api_key.to_string(),
        }
    }
}
