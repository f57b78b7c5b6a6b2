use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};

use crate::{event::trace::index_price::Tracker, store::FileStore};

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod bot;
pub mod config;
pub mod console;
pub mod crawler;
pub mod declare;
pub mod error;
pub mod event;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod util;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        logging::warn_file_async("A rustls crypto provider is already installed".to_string());
    }

    let path = config::config_path();
    let app = match config::bootstrap(&path)? {
        Some(app) => app,
        None => return Ok(()),
    };

    util::http::init(&app.user_agent)?;

    let source = crawler::from_config(&app)?;
    let store = FileStore::new(&app.last_value_path);
    let sinks = bot::build_sinks(&app).await;

    let tracker = Arc::new(Tracker::new(
        source,
        sinks,
        Box::new(store),
        app.index_name.clone(),
        Duration::from_secs(app.poll_interval_secs),
    ));

    tracker
        .seed()
        .await
        .with_context(|| format!("Failed to seed the last value in {}", app.last_value_path))?;

    scheduler::start(tracker).await
}
