use std::{env, sync::Arc};

use anyhow::Result;
use tokio::{io::BufReader, task};

use crate::{console, event::trace::index_price::Tracker, logging};

/// 啟動排程
///
/// The poll loop and the console run as independent tasks. The loop never
/// returns; the console ends when stdin closes, which leaves the loop running.
pub async fn start(tracker: Arc<Tracker>) -> Result<()> {
    let poller = {
        let tracker = Arc::clone(&tracker);
        task::spawn(async move { tracker.execute().await })
    };

    let console = {
        let tracker = Arc::clone(&tracker);
        task::spawn(async move { console::run(BufReader::new(tokio::io::stdin()), tracker).await })
    };

    let msg = format!(
        "{} notifier started\r\nRust OS/Arch: {}/{}\r\n",
        tracker.label(),
        env::consts::OS,
        env::consts::ARCH
    );
    logging::info_file_async(msg);
    for sink in tracker.sinks() {
        logging::info_file_async(format!("Notifying through {}", sink.name()));
    }

    if let Err(why) = console.await {
        logging::error_file_async(format!("Console task failed because {:?}", why));
    }

    poller.await?;

    Ok(())
}
