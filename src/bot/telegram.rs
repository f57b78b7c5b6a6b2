use std::str::FromStr;

use async_trait::async_trait;
use concat_string::concat_string;
use futures::future::join_all;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    bot::NotificationSink,
    config,
    error::DeliverError,
    logging,
    util::http,
};

const NAME: &str = "telegram";

/// Broadcasts every message to the chats listed in `bot.telegram.allowed`.
pub struct Telegram {
    api_url: String,
    chat_ids: Vec<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Response<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Serialize, Deserialize, Debug)]
struct User {
    username: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Message {
    message_id: i64,
}

#[derive(Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}

impl<'a> SendMessageRequest<'a> {
    pub fn new(chat_id: i64, text: &'a str) -> SendMessageRequest<'a> {
        SendMessageRequest { chat_id, text }
    }
}

impl Telegram {
    /// Checks the token with `getMe`. Chat ids that are not integers are
    /// skipped; at least one valid chat is required.
    pub async fn connect(cfg: &config::Telegram) -> Result<Self, DeliverError> {
        let chat_ids = chat_ids(cfg);
        if chat_ids.is_empty() {
            return Err(DeliverError::Unauthorized {
                sink: NAME.to_string(),
                reason: "no chat in 'allowed' to send to".to_string(),
            });
        }

        let telegram = Telegram {
            api_url: concat_string!("https://api.telegram.org/bot", cfg.token, "/"),
            chat_ids,
        };

        let url = concat_string!(telegram.api_url, "getMe");
        let (status, body) = http::get_with_status(&url, None)
            .await
            .map_err(|why| request_error(&why))?;

        let me: User = match check_response(status.as_u16(), &body) {
            Ok(me) => me,
            Err(DeliverError::Rejected { status, body, .. }) if status == 401 || status == 404 => {
                return Err(DeliverError::Unauthorized {
                    sink: NAME.to_string(),
                    reason: body,
                })
            }
            Err(why) => return Err(why),
        };

        logging::info_file_async(format!(
            "Connected to telegram as @{}, {} chat(s)",
            me.username.unwrap_or_default(),
            telegram.chat_ids.len()
        ));

        Ok(telegram)
    }

    async fn send_message(&self, payload: SendMessageRequest<'_>) -> Result<(), DeliverError> {
        let url = concat_string!(self.api_url, "sendMessage");
        let (status, body) = http::post_json_with_status(&url, None, &payload)
            .await
            .map_err(|why| request_error(&why))?;

        let message: Message = check_response(status.as_u16(), &body)?;
        logging::debug_file_async(format!(
            "telegram message {} sent to {}",
            message.message_id, payload.chat_id
        ));

        Ok(())
    }
}

#[async_trait]
impl NotificationSink for Telegram {
    fn name(&self) -> &str {
        NAME
    }

    /// Sends to all chats concurrently; the first failure, if any, is returned
    /// after every chat has been tried.
    async fn send(&self, message: &str) -> Result<(), DeliverError> {
        let futures: Vec<_> = self
            .chat_ids
            .iter()
            .map(|id| self.send_message(SendMessageRequest::new(*id, message)))
            .collect();

        join_all(futures)
            .await
            .into_iter()
            .find(|res| res.is_err())
            .unwrap_or(Ok(()))
    }
}

fn chat_ids(cfg: &config::Telegram) -> Vec<i64> {
    let mut ids: Vec<i64> = cfg
        .allowed
        .keys()
        .filter_map(|key| match i64::from_str(key.trim()) {
            Ok(id) => Some(id),
            Err(why) => {
                logging::warn_file_async(format!(
                    "Skip telegram chat '{}' because {:?}",
                    key, why
                ));
                None
            }
        })
        .collect();
    ids.sort_unstable();
    ids
}

fn request_error(why: &anyhow::Error) -> DeliverError {
    DeliverError::Request {
        sink: NAME.to_string(),
        reason: format!("{:?}", why),
    }
}

/// Bot API answers `{"ok": false, "description": ...}` on failure, often
/// with a 4xx status as well.
fn check_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, DeliverError> {
    let rejected = |reason: String| DeliverError::Rejected {
        sink: NAME.to_string(),
        status,
        body: reason,
    };

    let response: Response<T> = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(why) => return Err(rejected(format!("{}: {}", why, body))),
    };

    match response {
        Response {
            ok: true,
            result: Some(result),
            ..
        } if (200..300).contains(&status) => Ok(result),
        Response { description, .. } => {
            Err(rejected(description.unwrap_or_else(|| body.to_string())))
        }
    }
}
