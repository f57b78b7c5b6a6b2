use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    bot::{twitter::oauth::Credentials, NotificationSink},
    config,
    error::DeliverError,
    logging,
    util::http,
};

pub mod oauth;

const NAME: &str = "twitter";
const ME_URL: &str = "https://api.twitter.com/2/users/me";
const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";

/// Posts statuses on behalf of the configured account.
pub struct Twitter {
    credentials: Credentials,
    screen_name: String,
}

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
    detail: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: Option<String>,
    detail: Option<String>,
}

#[derive(Deserialize, Debug)]
struct User {
    username: String,
}

#[derive(Deserialize, Debug)]
struct Tweet {
    id: String,
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

impl Twitter {
    /// Verifies the credentials against the account endpoint. A sink that
    /// cannot authenticate is never handed out.
    pub async fn connect(cfg: &config::Twitter) -> Result<Self, DeliverError> {
        let credentials = Credentials {
            consumer_key: cfg.consumer_key.clone(),
            consumer_secret: cfg.consumer_secret.clone(),
            token: cfg.access_token.clone(),
            token_secret: cfg.access_secret.clone(),
        };

        let headers = auth_headers("GET", ME_URL, &credentials)?;
        let (status, body) = http::get_with_status(ME_URL, Some(headers))
            .await
            .map_err(|why| DeliverError::Request {
                sink: NAME.to_string(),
                reason: format!("{:?}", why),
            })?;

        let user: User = match read_envelope(status.as_u16(), &body) {
            Ok(user) => user,
            Err(DeliverError::Rejected { status, body, .. }) if status == 401 || status == 403 => {
                return Err(DeliverError::Unauthorized {
                    sink: NAME.to_string(),
                    reason: body,
                })
            }
            Err(why) => return Err(why),
        };

        logging::info_file_async(format!("Connected to twitter as @{}", user.username));

        Ok(Twitter {
            credentials,
            screen_name: user.username,
        })
    }
}

#[async_trait]
impl NotificationSink for Twitter {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, message: &str) -> Result<(), DeliverError> {
        let headers = auth_headers("POST", TWEETS_URL, &self.credentials)?;
        let (status, body) = http::post_json_with_status(
            TWEETS_URL,
            Some(headers),
            &CreateTweetRequest { text: message },
        )
        .await
        .map_err(|why| DeliverError::Request {
            sink: NAME.to_string(),
            reason: format!("{:?}", why),
        })?;

        let tweet: Tweet = read_envelope(status.as_u16(), &body)?;
        logging::info_file_async(format!(
            "Tweeted! https://twitter.com/{}/status/{}",
            self.screen_name, tweet.id
        ));

        Ok(())
    }
}

fn auth_headers(method: &str, url: &str, credentials: &Credentials) -> Result<HeaderMap, DeliverError> {
    let value = oauth::authorization_header(
        method,
        url,
        &[],
        credentials,
        &oauth::gen_nonce(),
        Utc::now().timestamp(),
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&value).map_err(|why| DeliverError::Unauthorized {
            sink: NAME.to_string(),
            reason: format!("credentials do not fit in a header: {}", why),
        })?,
    );

    Ok(headers)
}

/// Unwraps the `data` member of a v2 response, turning HTTP failures and
/// `errors` payloads into [`DeliverError::Rejected`].
fn read_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, DeliverError> {
    let rejected = |reason: String| DeliverError::Rejected {
        sink: NAME.to_string(),
        status,
        body: reason,
    };

    if !(200..300).contains(&status) {
        return Err(rejected(body.to_string()));
    }

    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|why| rejected(format!("{}: {}", why, body)))?;

    match envelope.data {
        Some(data) => Ok(data),
        None => {
            let reason = envelope
                .errors
                .iter()
                .filter_map(|e| e.detail.as_ref().or(e.message.as_ref()))
                .cloned()
                .chain(envelope.detail)
                .collect::<Vec<_>>()
                .join("; ");
            Err(rejected(if reason.is_empty() {
                body.to_string()
            } else {
                reason
            }))
        }
    }
}
