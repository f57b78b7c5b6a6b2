use std::{fmt::Write as _, thread};

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;

use crate::logging::rotate::Rotate;

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// Flushes once the pending batch grows past this many bytes.
const BATCH_SIZE: usize = 4096;

pub struct Logger {
    writer: Sender<LogMessage>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded::<LogMessage>();
        let pattern = format!("log/%Y-%m-%d-{}.log", log_name);

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(pattern);
            let mut batch = String::with_capacity(BATCH_SIZE);
            let mut batch_at = Local::now();

            for received in &rx {
                if batch.is_empty() {
                    batch_at = received.created_at;
                }

                if writeln!(
                    &mut batch,
                    "{} {} {}",
                    received.created_at.format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || batch.len() >= BATCH_SIZE {
                    if let Err(why) = rotate.write_msg(batch_at, batch.as_bytes()) {
                        error_console(format!("Failed to write log file because {:?}", why));
                        info_console(batch.clone());
                    }

                    rotate.flush();
                    batch.clear();
                }
            }
        });

        Logger { writer: tx }
    }

    pub fn info(&self, log: String) {
        self.send(log::Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(log::Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(log::Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(log::Level::Debug, log);
    }

    fn send(&self, level: log::Level, msg: String) {
        if level <= log::Level::Info {
            echo(level, &msg);
        }

        if let Err(why) = self.writer.send(LogMessage::new(level, msg)) {
            error_console(why.to_string());
        }
    }
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

fn echo(level: log::Level, msg: &str) {
    match level {
        log::Level::Error | log::Level::Warn => eprintln!(
            "{} {} {}",
            Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
            level,
            msg
        ),
        _ => println!(
            "{} {} {}",
            Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
            level,
            msg
        ),
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}
