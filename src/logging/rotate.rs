use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use rayon::prelude::*;

use crate::logging;

/// Default size of a single log file: 10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// Default retention: 7 days
const DEFAULT_MAX_AGE_DAYS: u64 = 7;

/// Daily log file writer that also rolls over by size.
///
/// The file name comes from a chrono pattern such as `log/%Y-%m-%d-default.log`.
/// When a file would grow past `max_size` the writer moves on to a new
/// generation (`2025-02-03-default.1.log`, `.2.log`, ...). Generations only
/// grow within a day, so nothing is ever overwritten.
pub struct Rotate {
    fn_pattern: String,
    /// Base file name of the current day, without generation.
    cur_base_fn: String,
    cur_fn: PathBuf,
    out: Option<BufWriter<File>>,
    generation: u32,
    max_size: u64,
    current_size: u64,
    max_age: Duration,
}

impl Rotate {
    pub fn new(fn_pattern: String) -> Self {
        Self::with_options(fn_pattern, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn with_options(fn_pattern: String, max_size: u64, max_age_days: u64) -> Self {
        Rotate {
            fn_pattern,
            cur_base_fn: String::new(),
            cur_fn: PathBuf::new(),
            out: None,
            generation: 0,
            max_size,
            current_size: 0,
            max_age: Duration::from_secs(max_age_days * 24 * 60 * 60),
        }
    }

    /// Appends `msg` to the file for `now`, switching files on a new day or
    /// when the size limit would be exceeded.
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.fn_pattern).to_string();

        if base_fn != self.cur_base_fn {
            self.cur_base_fn = base_fn;
            self.generation = 0;
            self.open()?;
            self.cleanup_old_files();
        } else if self.current_size > 0
            && self.current_size + msg.len() as u64 > self.max_size
        {
            self.generation += 1;
            self.open()?;
        }

        let out = self
            .out
            .as_mut()
            .ok_or_else(|| anyhow!("No log file is open for {}", self.cur_base_fn))?;
        out.write_all(msg)?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(out) = self.out.as_mut() {
            if let Err(why) = out.flush() {
                logging::error_console(format!(
                    "Failed to flush {} because {:?}",
                    self.cur_fn.display(),
                    why
                ));
            }
        }
    }

    #[cfg(test)]
    pub fn current_file(&self) -> &Path {
        &self.cur_fn
    }

    /// generation 0 keeps the base name, later ones insert the number before the extension.
    fn generation_fn(base_fn: &str, generation: u32) -> PathBuf {
        let path = Path::new(base_fn);
        if generation == 0 {
            return path.to_path_buf();
        }

        let parent = path.parent().unwrap_or(Path::new(""));
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

        parent.join(format!("{}.{}.{}", stem, generation, ext))
    }

    fn open(&mut self) -> Result<()> {
        self.flush();

        let filename = Self::generation_fn(&self.cur_base_fn, self.generation);
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)?;

        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out = Some(BufWriter::with_capacity(4096, file));
        self.cur_fn = filename;

        Ok(())
    }

    /// Removes files in the log directory that have not been touched within `max_age`.
    fn cleanup_old_files(&self) {
        let Some(cut_off) = SystemTime::now().checked_sub(self.max_age) else {
            return;
        };

        let stale = match Self::files_in_directory(&self.cur_fn) {
            Ok(files) => files
                .into_iter()
                .filter(|file| file != &self.cur_fn)
                .filter(|file| {
                    fs::metadata(file)
                        .and_then(|m| m.modified())
                        .map(|modified| modified <= cut_off)
                        .unwrap_or(false)
                })
                .collect::<Vec<PathBuf>>(),
            Err(why) => {
                logging::error_console(format!(
                    "Failed to list the log directory because {:?}",
                    why
                ));
                return;
            }
        };

        stale
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|unlink| {
                if let Err(why) = fs::remove_file(unlink) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        unlink.display(),
                        why
                    ));
                }
            });
    }

    fn files_in_directory(file_path: &Path) -> io::Result<Vec<PathBuf>> {
        let parent_dir = file_path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Parent directory not found"))?;

        let mut files = Vec::new();
        for entry in fs::read_dir(parent_dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }

        Ok(files)
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}
