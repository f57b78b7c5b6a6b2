use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;

use crate::logging::Logger;

pub mod element;
pub mod user_agent;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// Builds the shared client with `user_agent`, or a generated desktop one when empty.
///
/// Only the first call has any effect; later calls (and the lazy path in
/// [`get_client`]) reuse the client that already exists.
pub fn init(user_agent: &str) -> Result<()> {
    let ua = if user_agent.trim().is_empty() {
        user_agent::gen_desktop_ua()
    } else {
        user_agent.to_string()
    };

    CLIENT.get_or_try_init(|| build_client(&ua)).map(|_| ())
}

fn build_client(ua: &str) -> Result<Client> {
    Client::builder()
        // ===== 壓縮 =====
        .brotli(true)
        .gzip(true)
        .zstd(true)
        // ===== 超時設置 =====
        .connect_timeout(Duration::from_secs(8))
        .timeout(Duration::from_secs(15))
        // ===== 連接池 =====
        .tcp_keepalive(Duration::from_secs(60))
        .pool_idle_timeout(Duration::from_secs(90))
        // ===== Cookie 和重定向 =====
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(ua)
        .build()
        .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| build_client(&user_agent::gen_desktop_ua()))
}

/// Performs an HTTP GET request and returns the status together with the body,
/// whatever the status is.
pub async fn get_with_status(
    url: &str,
    headers: Option<header::HeaderMap>,
) -> Result<(StatusCode, String)> {
    let response = send(
        Method::GET,
        url,
        headers,
        None::<fn(RequestBuilder) -> RequestBuilder>,
    )
    .await?;
    read_with_status(response).await
}

/// Performs an HTTP POST request with a JSON body and returns the status
/// together with the response body.
pub async fn post_json_with_status<REQ>(
    url: &str,
    headers: Option<header::HeaderMap>,
    req: &REQ,
) -> Result<(StatusCode, String)>
where
    REQ: Serialize,
{
    let response = send(
        Method::POST,
        url,
        headers,
        Some(|rb: RequestBuilder| rb.json(req)),
    )
    .await?;

    read_with_status(response).await
}

async fn read_with_status(response: Response) -> Result<(StatusCode, String)> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| anyhow!("Error reading response body: {:?}", e))?;

    Ok((status, body))
}

/// Sends a single request. Retry policy belongs to the caller: the tracker
/// simply tries again on its next tick.
async fn send(
    method: Method,
    url: &str,
    headers: Option<header::HeaderMap>,
    body: Option<impl FnOnce(RequestBuilder) -> RequestBuilder>,
) -> Result<Response> {
    let visit_log = format!("{method}:{}", redact(url));
    let client = get_client()?;
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    if let Some(body_fn) = body {
        rb = body_fn(rb);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            LOGGER.debug(format!(
                "{} {} {} ms",
                visit_log,
                response.status().as_u16(),
                elapsed
            ));
            Ok(response)
        }
        Err(why) => {
            let why = why.without_url();
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(anyhow!("Failed to send request to {}: {}", redact(url), why))
        }
    }
}

/// Hides credentials that travel in the query string or path (`apikey=...`,
/// `/bot<token>/`) before a url is logged.
pub fn redact(url: &str) -> String {
    let mut out = match url.split_once('?') {
        Some((path, query)) => {
            let query = query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some((k, _)) if is_secret_key(k) => format!("{}=***", k),
                    _ => pair.to_string(),
                })
                .collect::<Vec<_>>()
                .join("&");
            format!("{}?{}", path, query)
        }
        None => url.to_string(),
    };

    if let Some(start) = out
        .find("api.telegram.org/bot")
        .map(|i| i + "api.telegram.org".len())
    {
        let token_start = start + "/bot".len();
        let token_end = out[token_start..]
            .find('/')
            .map_or(out.len(), |i| token_start + i);
        if token_end > token_start {
            out.replace_range(token_start..token_end, "***");
        }
    }

    out
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("key") || key.contains("token") || key.contains("secret")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("https://www.alphavantage.co/query?function=GLOBAL_QUOTE&symbol=^BVSP&apikey=abc"),
            "https://www.alphavantage.co/query?function=GLOBAL_QUOTE&symbol=^BVSP&apikey=***"
        );
        assert_eq!(
            redact("https://api.telegram.org/bot123:ABC/sendMessage"),
            "https://api.telegram.org/bot***/sendMessage"
        );
        assert_eq!(redact("https://example.com/quote"), "https://example.com/quote");
    }

    #[tokio::test]
    #[ignore]
    async fn test_get_with_status() {
        rustls::crypto::ring::default_provider()
            .install_default()
            .ok();
        match get_with_status("https://httpbin.org/user-agent", None).await {
            Ok((status, body)) => {
                assert!(status.is_success());
                assert!(body.contains("Mozilla/5.0"));
            }
            Err(why) => panic!("Failed to get because {:?}", why),
        }
    }
}
