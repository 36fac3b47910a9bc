//! Logger capability used by every component of the crate.
//!
//! Components never talk to a global logger; they hold an `Arc<dyn Log>` that
//! the embedding application hands in. Three sinks ship with the crate:
//!
//! - [`AsyncLogger`]: spawns a background task that receives records over an
//!   mpsc channel and appends them to a file without blocking async tasks.
//! - [`TracingLog`]: forwards every record to the `tracing` macros.
//! - [`MemoryLog`]: keeps records in memory, handy for assertions.
//!
//! Example
//! -------
//!
//! ```no_run
//! use marketwatch::utilities::logger::{init_file_logger, Log};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (logger, _task) = init_file_logger("marketwatch.log").await.expect("init logger");
//!     let log: Arc<dyn Log> = Arc::new(logger);
//!     log.info("monitor starting up...");
//! }
//! ```

use crate::err::{ErrorKind, Result};
use std::fmt;
use std::path::Path;
use std::sync::{LazyLock, Mutex};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub static DEBUG_MODE: LazyLock<bool> = LazyLock::new(|| {
    let env_var = std::env::var("DEBUG_MODE").unwrap_or_default();
    env_var == "1" || env_var == "true"
});

/// Log level for messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Logger capability. Implementations must not block the caller.
pub trait Log: Send + Sync {
    fn log(&self, level: LogLevel, msg: String);
}

impl dyn Log {
    pub fn trace<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Trace, msg.into());
    }
    pub fn debug<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Debug, msg.into());
    }
    pub fn info<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Info, msg.into());
    }
    pub fn warn<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Warn, msg.into());
    }
    pub fn error<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Error, msg.into());
    }
}

/// A simple async logger handle. Cloning creates another sender handle.
#[derive(Clone, Debug)]
pub struct AsyncLogger {
    tx: mpsc::Sender<LogRecord>,
}

impl AsyncLogger {
    /// Request the logger task to flush and shut down.
    pub async fn shutdown(&self) {
        // Ignore send error (e.g., task already closed)
        let _ = self.tx.send(LogRecord::Shutdown).await;
    }
}

impl Log for AsyncLogger {
    fn log(&self, level: LogLevel, msg: String) {
        if level == LogLevel::Debug && !*DEBUG_MODE {
            return;
        }
        if *DEBUG_MODE {
            println!("{}: {}", level, &msg);
        }
        if let Err(err) = self.tx.try_send(LogRecord::new(level, msg)) {
            eprintln!("Failed to send log message: {}", err);
        }
    }
}

#[derive(Debug)]
enum LogRecord {
    Message {
        level: LogLevel,
        msg: String,
        ts: chrono::DateTime<chrono::Utc>,
    },
    Shutdown,
}

impl LogRecord {
    fn new(level: LogLevel, msg: String) -> Self {
        Self::Message {
            level,
            msg,
            ts: chrono::Utc::now(),
        }
    }

    fn format_line(&self) -> Option<String> {
        match self {
            // Format: 2025-10-08T21:22:33.123Z [LEVEL] message\n
            LogRecord::Message { level, msg, ts } => Some(format!(
                "{} [{}] {}\n",
                ts.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                level,
                msg
            )),
            LogRecord::Shutdown => None,
        }
    }
}

/// Initialize a file-based async logger. Returns the logger handle and the background task handle.
/// Dropping the last logger handle will close the channel and allow the task to shut down.
pub async fn init_file_logger<P: AsRef<Path>>(path: P) -> Result<(AsyncLogger, JoinHandle<()>)> {
    // Keep a copy of the path so we can reopen the file if a writing error occurs.
    let path_buf = path.as_ref().to_path_buf();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path_buf)
        .await
        .map_err(|e| {
            monitor_error_with_source!(
                ErrorKind::Config,
                e,
                "unable to open log file {}",
                path_buf.display()
            )
        })?;

    let (tx, mut rx) = mpsc::channel::<LogRecord>(1024);
    let mut writer = BufWriter::new(file);

    let task = tokio::spawn(async move {
        while let Some(rec) = rx.recv().await {
            let Some(line) = rec.format_line() else {
                break;
            };
            if let Err(_e) = writer.write_all(line.as_bytes()).await {
                // Flush, reopen the file, swap the writer and retry once.
                let _ = writer.flush().await;
                match OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path_buf)
                    .await
                {
                    Ok(new_file) => {
                        writer = BufWriter::new(new_file);
                        let _ = writer.write_all(line.as_bytes()).await;
                    }
                    Err(_) => {
                        // Couldn't reopen. Drop the message and avoid a tight loop.
                        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    }
                }
            }
        }
        // Flush remaining data before exit
        let _ = writer.flush().await;
    });

    Ok((AsyncLogger { tx }, task))
}

/// Forwards records to `tracing`; the application installs the subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl Log for TracingLog {
    fn log(&self, level: LogLevel, msg: String) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", msg),
            LogLevel::Debug => tracing::debug!("{}", msg),
            LogLevel::Info => tracing::info!("{}", msg),
            LogLevel::Warn => tracing::warn!("{}", msg),
            LogLevel::Error => tracing::error!("{}", msg),
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(LogLevel, String)> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.records()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl Log for MemoryLog {
    fn log(&self, level: LogLevel, msg: String) {
        match self.records.lock() {
            Ok(mut records) => records.push((level, msg)),
            Err(poisoned) => poisoned.into_inner().push((level, msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, LogRecord, MemoryLog, init_file_logger, Log};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_path(name: &str) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let mut p = std::env::temp_dir();
        p.push(format!("{}_{}_{}.log", name, std::process::id(), millis));
        p
    }

    #[tokio::test]
    async fn test_file_logger_writes_lines() {
        let path = unique_temp_path("test_file_logger_writes_lines");
        let (logger, task) = init_file_logger(&path).await.expect("init logger");
        let log: Arc<dyn Log> = Arc::new(logger);

        log.info("hello info");
        log.warn("be careful");
        log.error("something went wrong");

        drop(log); // close channel
        task.await.expect("logger task join");

        let content = fs::read_to_string(&path).expect("read log file");

        assert!(content.contains("[INFO] hello info"), "content=\n{}", content);
        assert!(content.contains("[WARN] be careful"), "content=\n{}", content);
        assert!(
            content.contains("[ERROR] something went wrong"),
            "content=\n{}",
            content
        );
        assert!(
            content.ends_with('\n'),
            "log should end with newline; content=\n{}",
            content
        );

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_log_level_display_strings() {
        assert_eq!(format!("{}", LogLevel::Trace), "TRACE");
        assert_eq!(format!("{}", LogLevel::Debug), "DEBUG");
        assert_eq!(format!("{}", LogLevel::Info), "INFO");
        assert_eq!(format!("{}", LogLevel::Warn), "WARN");
        assert_eq!(format!("{}", LogLevel::Error), "ERROR");
    }

    #[test]
    fn test_format_line_with_fixed_timestamp() {
        let rec = LogRecord::Message {
            level: LogLevel::Warn,
            msg: "xyz".into(),
            ts: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        };
        let line = rec.format_line().expect("line should exist for Message");
        assert_eq!(line, "1970-01-01T00:00:00.000Z [WARN] xyz\n");
        assert!(LogRecord::Shutdown.format_line().is_none());
    }

    #[test]
    fn memory_log_counts_per_level() {
        let mem = Arc::new(MemoryLog::new());
        let log: Arc<dyn Log> = mem.clone();
        log.warn("first");
        log.warn(String::from("second"));
        log.info("third");
        assert_eq!(mem.count(LogLevel::Warn), 2);
        assert_eq!(mem.count(LogLevel::Info), 1);
        assert!(mem.contains(LogLevel::Warn, "sec"));
        assert!(!mem.contains(LogLevel::Error, "first"));
    }
}
