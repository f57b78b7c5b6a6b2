use std::{str::FromStr, sync::Arc};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{
    bot,
    error::ConsoleCommandError,
    event::trace::index_price::{Tick, Tracker},
    logging,
};

const HELP: &str = "commands:
  tweet <text>          post <text> through the twitter sink
  send <sink> <text>    post <text> through the named sink
  force_tweet_quote     fetch now and notify even if the value did not move
  status                show the tracker state and the last value
  help                  show this list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tweet(String),
    Send { sink: String, text: String },
    ForceTweetQuote,
    Status,
    Help,
}

impl FromStr for Command {
    type Err = ConsoleCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "tweet" => non_empty(rest, "text").map(|t| Command::Tweet(t.to_string())),
            "send" => {
                non_empty(rest, "sink")?;
                let (sink, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ConsoleCommandError::MissingArgument("text"))?;
                let sink = non_empty(sink, "sink")?;
                let text = non_empty(text.trim(), "text")?;
                Ok(Command::Send {
                    sink: sink.to_string(),
                    text: text.to_string(),
                })
            }
            "force_tweet_quote" => Ok(Command::ForceTweetQuote),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            _ => Err(ConsoleCommandError::Unknown(verb.to_string())),
        }
    }
}

fn non_empty<'a>(s: &'a str, what: &'static str) -> Result<&'a str, ConsoleCommandError> {
    if s.is_empty() {
        Err(ConsoleCommandError::MissingArgument(what))
    } else {
        Ok(s)
    }
}

/// Reads commands line by line until the input ends. A command that fails
/// is logged and the next line is read; only end of input or a read error
/// stops the console.
pub async fn run<R>(reader: R, tracker: Arc<Tracker>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                logging::info_file_async("Console input closed".to_string());
                return;
            }
            Err(why) => {
                logging::error_file_async(format!("Failed to read console because {:?}", why));
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let result = match Command::from_str(&line) {
            Ok(command) => execute(command, &tracker).await,
            Err(why) => Err(why),
        };

        match result {
            Ok(reply) => logging::info_file_async(reply),
            Err(why) => logging::error_file_async(format!("'{}' failed: {}", line.trim(), why)),
        }
    }
}

/// Carries out one command and returns what to tell the operator.
pub async fn execute(command: Command, tracker: &Tracker) -> Result<String, ConsoleCommandError> {
    match command {
        Command::Tweet(text) => send_raw(tracker, "twitter", &text).await,
        Command::Send { sink, text } => send_raw(tracker, &sink, &text).await,
        Command::ForceTweetQuote => match tracker.force().await? {
            Tick::Notified {
                previous,
                current,
                delivered,
                failed,
            } => Ok(format!(
                "Forced {} -> {}, delivered: [{}], failed: [{}]",
                previous,
                current,
                delivered.join(", "),
                failed.join(", ")
            )),
            Tick::Seeded(value) => Ok(format!("Seeded with {}, nothing sent", value)),
            other => Ok(format!("{:?}", other)),
        },
        Command::Status => {
            let last = match tracker.last_value().await? {
                Some(v) => v.to_string(),
                None => "none".to_string(),
            };
            let sinks = tracker
                .sinks()
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ");
            Ok(format!(
                "{}: {}, last value {}, sinks [{}]",
                tracker.label(),
                tracker.phase().await,
                last,
                sinks
            ))
        }
        Command::Help => Ok(HELP.to_string()),
    }
}

async fn send_raw(tracker: &Tracker, sink: &str, text: &str) -> Result<String, ConsoleCommandError> {
    let target = bot::find(tracker.sinks(), sink)
        .ok_or_else(|| ConsoleCommandError::SinkUnavailable(sink.to_string()))?;
    target.send(text).await?;

    Ok(format!("Sent through {}", target.name()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::BufReader;

    use super::*;
    use crate::{
        bot::{tests::RecordingSink, NotificationSink},
        crawler::QuoteSource,
        declare::Quote,
        error::FetchError,
        store::MemoryStore,
    };

    struct FixedSource(f64);

    #[async_trait]
    impl QuoteSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self) -> Result<Quote, FetchError> {
            Ok(Quote::new("^BVSP", self.0))
        }
    }

    fn tracker(value: f64, sinks: Vec<Arc<dyn NotificationSink>>) -> Arc<Tracker> {
        Arc::new(Tracker::new(
            Arc::new(FixedSource(value)),
            sinks,
            Box::new(MemoryStore {
                value: Some(100.0),
                ..Default::default()
            }),
            "Ibovespa",
            Duration::from_secs(180),
        ))
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Command::from_str("tweet Hello   world").unwrap(),
            Command::Tweet("Hello   world".to_string())
        );
        assert_eq!(
            Command::from_str("SEND telegram  ibov 128k").unwrap(),
            Command::Send {
                sink: "telegram".to_string(),
                text: "ibov 128k".to_string()
            }
        );
        assert_eq!(
            Command::from_str("  Force_Tweet_Quote ").unwrap(),
            Command::ForceTweetQuote
        );
        assert_eq!(Command::from_str("status").unwrap(), Command::Status);
        assert_eq!(Command::from_str("help").unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Command::from_str("tweet"),
            Err(ConsoleCommandError::MissingArgument("text"))
        ));
        assert!(matches!(
            Command::from_str("send telegram"),
            Err(ConsoleCommandError::MissingArgument("text"))
        ));
        assert!(matches!(
            Command::from_str("send"),
            Err(ConsoleCommandError::MissingArgument("sink"))
        ));
        assert!(matches!(
            Command::from_str("SEND   "),
            Err(ConsoleCommandError::MissingArgument("sink"))
        ));
        match Command::from_str("retweet now") {
            Err(ConsoleCommandError::Unknown(verb)) => assert_eq!(verb, "retweet"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_to_missing_sink() {
        let tracker = tracker(100.0, vec![RecordingSink::new("telegram")]);

        assert!(matches!(
            execute(Command::Tweet("hi".to_string()), &tracker).await,
            Err(ConsoleCommandError::SinkUnavailable(sink)) if sink == "twitter"
        ));
    }

    #[tokio::test]
    async fn test_status() {
        let tracker = tracker(100.0, vec![RecordingSink::new("twitter")]);

        let reply = execute(Command::Status, &tracker).await.unwrap();
        assert_eq!(
            reply,
            "Ibovespa: uninitialized, last value 100, sinks [twitter]"
        );
    }

    #[tokio::test]
    async fn test_run_keeps_going_after_errors() {
        let twitter = RecordingSink::new("twitter");
        let telegram = RecordingSink::failing("telegram");
        let tracker = tracker(100.0, vec![twitter.clone(), telegram.clone()]);

        let input = tokio_test::io::Builder::new()
            .read(b"tweet Hello Ladies + Gentlemen\n")
            .read(b"bogus\n\n")
            .read(b"send telegram still here\n")
            .read(b"send slack nobody\n")
            .read(b"force_tweet_quote\n")
            .build();

        run(BufReader::new(input), tracker.clone()).await;

        let tweets = twitter.sent();
        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0], "Hello Ladies + Gentlemen");
        assert!(tweets[1].starts_with("→ Ibovespa unchanged! 100 points - at "));
        assert_eq!(telegram.sent().len(), 2);
        assert_eq!(tracker.last_value().await.unwrap(), Some(100.0));
    }
}
