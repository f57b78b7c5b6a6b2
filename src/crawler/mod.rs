use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    config::{App, Provider},
    crawler::{alpha_vantage::AlphaVantage, web_page::WebPage},
    declare::Quote,
    error::FetchError,
};

/// Alpha Vantage market data API
pub mod alpha_vantage;
/// Any HTML page that shows the value in a fixed element
pub mod web_page;

/// Where the tracked value comes from.
///
/// Implementations do one request per call and never retry; a failed fetch
/// simply makes the tracker skip that tick.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Quote, FetchError>;
}

/// Builds the source selected in the configuration.
pub fn from_config(app: &App) -> Result<Arc<dyn QuoteSource>> {
    let source: Arc<dyn QuoteSource> = match app.source.provider {
        Provider::AlphaVantage => Arc::new(AlphaVantage::new(
            &app.symbol,
            &app.source.alpha_vantage.api_key,
        )),
        Provider::WebPage => Arc::new(WebPage::new(&app.symbol, &app.source.web_page)),
    };

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_picks_provider() {
        let mut app = App::placeholder();
        assert_eq!(from_config(&app).unwrap().name(), "alpha_vantage");

        app.source.provider = Provider::WebPage;
        app.source.web_page.url = "https://example.com".to_string();
        app.source.web_page.selector = "span.price".to_string();
        assert_eq!(from_config(&app).unwrap().name(), "web_page");
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_from_configured_source() {
        dotenv::dotenv().ok();
        rustls::crypto::ring::default_provider()
            .install_default()
            .ok();

        let path = crate::config::config_path();
        if !path.exists() {
            return;
        }
        let app = App::load(&path).unwrap();

        match from_config(&app).unwrap().fetch().await {
            Ok(quote) => crate::logging::debug_file_async(format!("quote: {}", quote)),
            Err(why) => panic!("Failed to fetch because {:?}", why),
        }
    }
}
