use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    crawler::{
        alpha_vantage::{AlphaVantage, HOST},
        QuoteSource,
    },
    declare::{Quote, QuoteDetail},
    error::FetchError,
    util::{self, text},
};

#[derive(Deserialize, Debug)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[async_trait]
impl QuoteSource for AlphaVantage {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    async fn fetch(&self) -> Result<Quote, FetchError> {
        let url = format!(
            "https://{host}/query?function=GLOBAL_QUOTE&symbol={symbol}&apikey={key}",
            host = HOST,
            symbol = urlencoding::encode(&self.symbol),
            key = urlencoding::encode(&self.api_key)
        );

        let (status, body) = util::http::get_with_status(&url, None)
            .await
            .map_err(|why| FetchError::Request {
                url: util::http::redact(&url),
                reason: format!("{:?}", why),
            })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                body,
            });
        }

        parse_global_quote(&body)
    }
}

/// Turns a `GLOBAL_QUOTE` body into a [`Quote`].
///
/// `05. price` is required; the remaining fields are carried along as
/// [`QuoteDetail`] when every one of them parses.
pub(crate) fn parse_global_quote(body: &str) -> Result<Quote, FetchError> {
    let response: GlobalQuoteResponse =
        serde_json::from_str(body).map_err(|why| FetchError::Malformed {
            reason: why.to_string(),
            body: body.to_string(),
        })?;

    let malformed = |reason: &str| FetchError::Malformed {
        reason: reason.to_string(),
        body: body.to_string(),
    };

    if let Some(msg) = response
        .error_message
        .or(response.note)
        .or(response.information)
    {
        return Err(malformed(&msg));
    }

    let fields = response
        .global_quote
        .filter(|q| !q.is_empty())
        .ok_or_else(|| malformed("empty 'Global Quote', unknown symbol?"))?;

    let symbol = field(&fields, "01. symbol", body)?.to_string();
    let value = number(&fields, "05. price", body)?;

    let quote = Quote::new(symbol, value);
    Ok(match parse_detail(&fields, body) {
        Ok(d) => quote.with_detail(d),
        Err(_) => quote,
    })
}

fn parse_detail(fields: &HashMap<String, String>, body: &str) -> Result<QuoteDetail, FetchError> {
    let volume = field(fields, "06. volume", body)?;

    Ok(QuoteDetail {
        open: number(fields, "02. open", body)?,
        high: number(fields, "03. high", body)?,
        low: number(fields, "04. low", body)?,
        volume: text::parse_i64(volume, None).map_err(|_| FetchError::NotNumeric {
            field: "06. volume".to_string(),
            raw: volume.to_string(),
        })?,
        latest_trading_day: field(fields, "07. latest trading day", body)
            .ok()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        previous_close: number(fields, "08. previous close", body)?,
        change: number(fields, "09. change", body)?,
        change_percent: number(fields, "10. change percent", body)?,
    })
}

fn field<'a>(
    fields: &'a HashMap<String, String>,
    key: &str,
    body: &str,
) -> Result<&'a str, FetchError> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| FetchError::Malformed {
            reason: format!("missing '{}'", key),
            body: body.to_string(),
        })
}

fn number(fields: &HashMap<String, String>, key: &str, body: &str) -> Result<f64, FetchError> {
    let raw = field(fields, key, body)?;
    text::parse_f64(raw, None).map_err(|_| FetchError::NotNumeric {
        field: key.to_string(),
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "Global Quote": {
            "01. symbol": "^BVSP",
            "02. open": "127900.0000",
            "03. high": "128650.3000",
            "04. low": "127512.1000",
            "05. price": "128431.2000",
            "06. volume": "8123400",
            "07. latest trading day": "2024-05-17",
            "08. previous close": "127855.7000",
            "09. change": "575.5000",
            "10. change percent": "0.4501%"
        }
    }"#;

    #[test]
    fn test_parse_global_quote() {
        let quote = parse_global_quote(BODY).unwrap();
        assert_eq!(quote.symbol, "^BVSP");
        assert_eq!(quote.value, 128431.2);

        let detail = quote.detail.expect("all fields present");
        assert_eq!(detail.open, 127900.0);
        assert_eq!(detail.volume, 8123400);
        assert_eq!(
            detail.latest_trading_day,
            NaiveDate::from_ymd_opt(2024, 5, 17)
        );
        assert_eq!(detail.change_percent, 0.4501);
    }

    #[test]
    fn test_price_only_still_yields_quote() {
        let quote =
            parse_global_quote(r#"{"Global Quote": {"01. symbol": "X", "05. price": "10.5"}}"#)
                .unwrap();
        assert_eq!(quote.value, 10.5);
        assert!(quote.detail.is_none());
    }

    #[test]
    fn test_non_numeric_price() {
        match parse_global_quote(r#"{"Global Quote": {"01. symbol": "X", "05. price": "-"}}"#) {
            Err(FetchError::NotNumeric { field, raw }) => {
                assert_eq!(field, "05. price");
                assert_eq!(raw, "-");
            }
            other => panic!("expected NotNumeric, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_limited() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        match parse_global_quote(body) {
            Err(FetchError::Malformed { reason, body: raw }) => {
                assert!(reason.contains("call frequency"));
                assert_eq!(raw, body);
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_symbol() {
        assert!(matches!(
            parse_global_quote(r#"{"Global Quote": {}}"#),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            parse_global_quote("<html>blocked</html>"),
            Err(FetchError::Malformed { .. })
        ));
    }
}
