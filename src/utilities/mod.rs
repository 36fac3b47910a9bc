pub mod logger;

pub use logger::{AsyncLogger, Log, LogLevel, MemoryLog, TracingLog, init_file_logger};
