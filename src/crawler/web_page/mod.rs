//! Reads the value from a quote page by CSS selector, for indices whose only
//! public source is a web page.

use async_trait::async_trait;
use scraper::Html;

use crate::{
    config,
    crawler::QuoteSource,
    declare::Quote,
    error::FetchError,
    util::{self, http::element, text},
};

pub struct WebPage {
    symbol: String,
    url: String,
    selector: String,
    element: String,
    decimal_comma: bool,
}

impl WebPage {
    pub fn new(symbol: &str, page: &config::WebPage) -> Self {
        WebPage {
            symbol: symbol.to_string(),
            url: page.url.clone(),
            selector: page.selector.clone(),
            element: page.element.clone(),
            decimal_comma: page.decimal_comma,
        }
    }

    fn parse(&self, body: &str) -> Result<Quote, FetchError> {
        let document = Html::parse_document(body);
        let raw = element::get_one_element(element::GetOneElementText {
            url: &self.url,
            selector: &self.selector,
            element: &self.element,
            document: &document,
        })
        .map_err(|why| FetchError::Malformed {
            reason: why.to_string(),
            body: excerpt(body),
        })?;

        let parsed = if self.decimal_comma {
            text::parse_f64(&text::decimal_comma_to_point(&raw), None)
        } else {
            text::parse_f64(&raw, None)
        };
        let value = parsed.map_err(|_| FetchError::NotNumeric {
            field: format!("{} {}", self.selector, self.element).trim().to_string(),
            raw,
        })?;

        Ok(Quote::new(self.symbol.clone(), value))
    }
}

#[async_trait]
impl QuoteSource for WebPage {
    fn name(&self) -> &str {
        "web_page"
    }

    async fn fetch(&self) -> Result<Quote, FetchError> {
        let (status, body) = util::http::get_with_status(&self.url, None)
            .await
            .map_err(|why| FetchError::Request {
                url: self.url.clone(),
                reason: format!("{:?}", why),
            })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                body: excerpt(&body),
            });
        }

        self.parse(&body)
    }
}

/// Pages are large; errors keep only the head of the body.
fn excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 512;
    match body.char_indices().nth(MAX_CHARS) {
        Some((i, _)) => format!("{}…", &body[..i]),
        None => body.to_string(),
    }
}
