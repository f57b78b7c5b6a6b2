use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::{config::App, error::DeliverError, logging};

/// Telegram Bot API
pub mod telegram;
/// Twitter v2 API, OAuth 1.0a user context
pub mod twitter;

/// A channel that receives change notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short stable name, also what the console `send` command matches on.
    fn name(&self) -> &str;
    async fn send(&self, message: &str) -> Result<(), DeliverError>;
}

/// Connects every enabled sink. A sink that cannot connect is logged and
/// left out; the others keep working.
pub async fn build_sinks(app: &App) -> Vec<Arc<dyn NotificationSink>> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();

    if app.bot.twitter.enabled {
        match twitter::Twitter::connect(&app.bot.twitter).await {
            Ok(t) => sinks.push(Arc::new(t)),
            Err(why) => logging::error_file_async(format!(
                "Failed to connect twitter because {:?}",
                why
            )),
        }
    }

    if app.bot.telegram.enabled {
        match telegram::Telegram::connect(&app.bot.telegram).await {
            Ok(t) => sinks.push(Arc::new(t)),
            Err(why) => logging::error_file_async(format!(
                "Failed to connect telegram because {:?}",
                why
            )),
        }
    }

    if sinks.is_empty() {
        logging::warn_file_async(
            "No notification sink is available, changes will only be logged".to_string(),
        );
    }

    sinks
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Sends `message` through every sink at once. Each failure is logged and
/// recorded; it never stops delivery through the other sinks.
pub async fn dispatch(sinks: &[Arc<dyn NotificationSink>], message: &str) -> Dispatch {
    let results = join_all(sinks.iter().map(|sink| async move {
        (sink.name().to_string(), sink.send(message).await)
    }))
    .await;

    let mut outcome = Dispatch::default();
    for (name, result) in results {
        match result {
            Ok(_) => outcome.delivered.push(name),
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to deliver through {} because {:?}",
                    name, why
                ));
                outcome.failed.push(name);
            }
        }
    }

    outcome
}

/// Looks a sink up by name, ignoring case.
pub fn find<'a>(
    sinks: &'a [Arc<dyn NotificationSink>],
    name: &str,
) -> Option<&'a Arc<dyn NotificationSink>> {
    sinks.iter().find(|s| s.name().eq_ignore_ascii_case(name))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records what it was asked to send; fails every send when `fail` is set.
    pub(crate) struct RecordingSink {
        pub name: &'static str,
        pub fail: bool,
        pub sent: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn new(name: &'static str) -> Arc<Self> {
            Arc::new(RecordingSink {
                name,
                fail: false,
                sent: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(RecordingSink {
                name,
                fail: true,
                sent: Mutex::new(Vec::new()),
            })
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, message: &str) -> Result<(), DeliverError> {
            self.sent.lock().unwrap().push(message.to_string());
            if self.fail {
                return Err(DeliverError::Rejected {
                    sink: self.name.to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_isolates_failures() {
        let ok = RecordingSink::new("telegram");
        let bad = RecordingSink::failing("twitter");
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![bad.clone(), ok.clone()];

        let outcome = dispatch(&sinks, "hello").await;

        assert_eq!(outcome.delivered, vec!["telegram".to_string()]);
        assert_eq!(outcome.failed, vec!["twitter".to_string()]);
        assert_eq!(ok.sent(), vec!["hello".to_string()]);
        assert_eq!(bad.sent(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_without_sinks() {
        assert_eq!(dispatch(&[], "hello").await, Dispatch::default());
    }

    #[test]
    fn test_find() {
        let sinks: Vec<Arc<dyn NotificationSink>> =
            vec![RecordingSink::new("twitter"), RecordingSink::new("telegram")];

        assert_eq!(find(&sinks, "Telegram").map(|s| s.name()), Some("telegram"));
        assert!(find(&sinks, "slack").is_none());
    }

    #[tokio::test]
    async fn test_build_sinks_skips_disabled() {
        let mut app = App::placeholder();
        app.bot.twitter.enabled = false;
        app.bot.telegram.enabled = false;

        assert!(build_sinks(&app).await.is_empty());
    }
}
