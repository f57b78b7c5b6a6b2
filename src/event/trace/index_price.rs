use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use tokio::{sync::Mutex, time};

use crate::{
    bot::{self, NotificationSink},
    crawler::QuoteSource,
    declare::Direction,
    error::{CycleError, PersistError},
    logging,
    store::LastValueStore,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// No baseline yet; the next successful fetch becomes it.
    Seeding,
    Polling,
    Notifying,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Seeding => "seeding",
            Phase::Polling => "polling",
            Phase::Notifying => "notifying",
        };
        f.write_str(s)
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// The first value was stored as the baseline, nothing was sent.
    Seeded(f64),
    Unchanged(f64),
    Notified {
        previous: f64,
        current: f64,
        delivered: Vec<String>,
        failed: Vec<String>,
    },
    /// Fetching or persisting failed; the last value is untouched.
    Failed,
}

struct Inner {
    store: Box<dyn LastValueStore>,
    phase: Phase,
}

/// Polls the source, compares against the last notified value and fans a
/// message out to every sink when it moved.
///
/// One instance is shared by the timer loop and the console. The store sits
/// behind a mutex that is held for the whole read, compare, notify and persist
/// sequence, so a forced cycle and a scheduled one never interleave.
pub struct Tracker {
    source: Arc<dyn QuoteSource>,
    sinks: Vec<Arc<dyn NotificationSink>>,
    inner: Mutex<Inner>,
    label: String,
    interval: Duration,
    clock: fn() -> DateTime<Local>,
}

impl Tracker {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        sinks: Vec<Arc<dyn NotificationSink>>,
        store: Box<dyn LastValueStore>,
        label: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Tracker {
            source,
            sinks,
            inner: Mutex::new(Inner {
                store,
                phase: Phase::Uninitialized,
            }),
            label: label.into(),
            interval,
            clock: Local::now,
        }
    }

    /// Replaces the wall clock used for message timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sinks(&self) -> &[Arc<dyn NotificationSink>] {
        &self.sinks
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    pub async fn last_value(&self) -> Result<Option<f64>, PersistError> {
        self.inner.lock().await.store.get().await
    }

    /// Makes sure a baseline exists before polling starts.
    ///
    /// An existing last value is kept as is. Otherwise one quote is fetched and
    /// stored without notifying. A fetch failure is not fatal: the tracker stays
    /// in [`Phase::Seeding`] and the first tick seeds instead. Storage failures
    /// are returned, since without a baseline there is nothing to compare to.
    pub async fn seed(&self) -> Result<Option<f64>, PersistError> {
        let mut inner = self.inner.lock().await;

        if let Some(value) = inner.store.get().await? {
            inner.phase = Phase::Polling;
            logging::info_file_async(format!("Resuming {} from {}", self.label, value));
            return Ok(Some(value));
        }

        inner.phase = Phase::Seeding;
        match self.source.fetch().await {
            Ok(quote) => {
                inner.store.set(quote.value).await?;
                inner.phase = Phase::Polling;
                logging::info_file_async(format!("Seeded {} with {}", self.label, quote));
                Ok(Some(quote.value))
            }
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to seed {} from {} because {:?}, retrying on the next tick",
                    self.label,
                    self.source.name(),
                    why
                ));
                Ok(None)
            }
        }
    }

    /// One scheduled cycle. Errors are logged and reported as [`Tick::Failed`].
    pub async fn tick(&self) -> Tick {
        match self.cycle(false).await {
            Ok(tick) => tick,
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to poll {} from {} because {:?}",
                    self.label,
                    self.source.name(),
                    why
                ));
                Tick::Failed
            }
        }
    }

    /// An out of band cycle that notifies even when the value did not move.
    pub async fn force(&self) -> Result<Tick, CycleError> {
        self.cycle(true).await
    }

    /// Runs [`Tracker::tick`] until the process ends. The first tick runs right
    /// away and every later one a full interval after the previous cycle has
    /// finished, whatever its outcome.
    pub async fn execute(&self) {
        loop {
            self.tick().await;
            time::sleep(self.interval).await;
        }
    }

    async fn cycle(&self, forced: bool) -> Result<Tick, CycleError> {
        let mut inner = self.inner.lock().await;

        let previous = inner.store.get().await?;
        let quote = self.source.fetch().await?;
        let current = quote.value;

        let previous = match previous {
            Some(previous) => previous,
            None => {
                inner.phase = Phase::Seeding;
                inner.store.set(current).await?;
                inner.phase = Phase::Polling;
                logging::info_file_async(format!("Seeded {} with {}", self.label, quote));
                return Ok(Tick::Seeded(current));
            }
        };

        inner.phase = Phase::Polling;

        if current == previous && !forced {
            logging::debug_file_async(format!("{} unchanged at {}", self.label, current));
            return Ok(Tick::Unchanged(current));
        }

        inner.phase = Phase::Notifying;
        logging::info_file_async(format!(
            "{} changed from {} to {}: {}",
            self.label, previous, current, quote
        ));

        // Stored first: a crash between the two steps may lose one message but
        // never repeats one.
        if let Err(why) = inner.store.set(current).await {
            logging::error_file_async(format!(
                "Failed to persist {} as the last value because {:?}",
                current, why
            ));
        }

        let message = format_message(&self.label, previous, current, (self.clock)());
        let outcome = bot::dispatch(&self.sinks, &message).await;
        inner.phase = Phase::Polling;

        Ok(Tick::Notified {
            previous,
            current,
            delivered: outcome.delivered,
            failed: outcome.failed,
        })
    }
}

/// `↗ Ibovespa up! 128431.2 points - at 14:07`
pub fn format_message(label: &str, previous: f64, current: f64, at: DateTime<Local>) -> String {
    let direction = Direction::between(previous, current);
    format!(
        "{} {} {}! {} points - at {}",
        direction.glyph(),
        label,
        direction.word(),
        current,
        at.format("%H:%M")
    )
}
