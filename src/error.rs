use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure reaching a quote provider or making sense of what it returned.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("request is not OK! Code: {code} - Body: {body}")]
    Status { code: u16, body: String },
    #[error("malformed response ({reason}): {body}")]
    Malformed { reason: String, body: String },
    #[error("field '{field}' is not numeric: '{raw}'")]
    NotNumeric { field: String, raw: String },
}

/// Failure reading or writing the last value record.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} does not hold a number: '{content}'", path.display())]
    Corrupt { path: PathBuf, content: String },
}

/// Failure delivering a message through a single sink.
#[derive(Error, Debug)]
pub enum DeliverError {
    #[error("{sink}: request failed: {reason}")]
    Request { sink: String, reason: String },
    #[error("{sink}: rejected with status {status}: {body}")]
    Rejected {
        sink: String,
        status: u16,
        body: String,
    },
    #[error("{sink}: not authorized: {reason}")]
    Unauthorized { sink: String, reason: String },
}

/// Failure of one fetch-compare-notify cycle. Delivery failures are not part
/// of it; they are isolated per sink.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Failure while handling an operator command.
#[derive(Error, Debug)]
pub enum ConsoleCommandError {
    #[error("unknown command '{0}', type 'help' for the list")]
    Unknown(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("sink '{0}' is not available")]
    SinkUnavailable(String),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    Deliver(#[from] DeliverError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}
