use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::error::PersistError;

/// Durable home of the last notified value.
#[async_trait]
pub trait LastValueStore: Send + Sync {
    /// `None` only before the first value has ever been stored.
    async fn get(&self) -> Result<Option<f64>, PersistError>;
    async fn set(&mut self, value: f64) -> Result<(), PersistError>;
}

/// Keeps the value as a single float literal in a plain text file.
///
/// Until the first write every read goes to the file. From then on the value
/// is served from memory; when a write fails the cache still holds the new
/// value, so the running process keeps comparing against what it last
/// notified even though the file is stale.
pub struct FileStore {
    path: PathBuf,
    cached: Option<f64>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            cached: None,
        }
    }

    async fn read(&self) -> Result<Option<f64>, PersistError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(why) if why.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(PersistError::Corrupt {
                path: self.path.clone(),
                content: trimmed.to_string(),
            }),
        }
    }

    /// Writes next to the target and renames over it, so a crash mid-write
    /// never leaves a half written number behind.
    async fn write(&self, value: f64) -> Result<(), PersistError> {
        let io_err = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, format!("{}", value)).await.map_err(io_err)?;
        fs::rename(&tmp, &self.path).await.map_err(io_err)
    }
}

#[async_trait]
impl LastValueStore for FileStore {
    async fn get(&self) -> Result<Option<f64>, PersistError> {
        match self.cached {
            Some(v) => Ok(Some(v)),
            None => self.read().await,
        }
    }

    async fn set(&mut self, value: f64) -> Result<(), PersistError> {
        self.cached = Some(value);
        self.write(value).await
    }
}

/// In-memory store for tests, with an optional failure switch for writes.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    pub value: Option<f64>,
    pub fail_writes: bool,
    pub writes: usize,
}

#[cfg(test)]
#[async_trait]
impl LastValueStore for MemoryStore {
    async fn get(&self) -> Result<Option<f64>, PersistError> {
        Ok(self.value)
    }

    async fn set(&mut self, value: f64) -> Result<(), PersistError> {
        self.writes += 1;
        if self.fail_writes {
            return Err(PersistError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("disk full"),
            });
        }

        self.value = Some(value);
        Ok(())
    }
}
