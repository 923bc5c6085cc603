//! Structured logging: leveled entries, JSON output in production,
//! human-readable output in development, daily files with size rotation,
//! and redaction of sensitive fields before anything hits disk.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Log levels following RFC 5424.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "DEBUG" | "TRACE" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("RUST_LOG")
            .map(|s| Self::parse(&s))
            .unwrap_or(LogLevel::Info)
    }
}

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub target: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub log_to_file: bool,
    pub log_to_stdout: bool,
    pub json_format: bool,
    pub max_file_size_mb: u64,
    pub max_log_files: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::from_env(),
            log_to_file: true,
            log_to_stdout: true,
            json_format: cfg!(not(debug_assertions)),
            max_file_size_mb: 10,
            max_log_files: 5,
        }
    }
}

pub struct Logger {
    config: LoggerConfig,
    log_dir: PathBuf,
    current_file: Mutex<Option<BufWriter<File>>>,
}

impl Logger {
    pub fn init(data_dir: &Path, config: LoggerConfig) -> Result<Self, String> {
        let log_dir = data_dir.join("logs");
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;

        let logger = Self {
            config,
            log_dir,
            current_file: Mutex::new(None),
        };
        logger.rotate_logs()?;
        Ok(logger)
    }

    fn log_file_path(&self) -> PathBuf {
        let date = Local::now().format("%Y-%m-%d");
        self.log_dir.join(format!("app-{}.log", date))
    }

    /// Shift `app-DATE.N.log` files up and re-open today's file when the
    /// current one exceeds the size limit.
    fn rotate_logs(&self) -> Result<(), String> {
        let log_path = self.log_file_path();
        let date = Local::now().format("%Y-%m-%d").to_string();

        if log_path.exists() {
            let size = std::fs::metadata(&log_path)
                .map_err(|e| format!("Failed to read log file metadata: {}", e))?
                .len();
            let max_size = self.config.max_file_size_mb * 1024 * 1024;

            if size >= max_size {
                for i in (1..self.config.max_log_files).rev() {
                    let old = self.log_dir.join(format!("app-{}.{}.log", date, i));
                    let new = self.log_dir.join(format!("app-{}.{}.log", date, i + 1));
                    if old.exists() {
                        let _ = std::fs::rename(&old, &new);
                    }
                }
                let first = self.log_dir.join(format!("app-{}.1.log", date));
                let _ = std::fs::rename(&log_path, &first);

                let oldest = self
                    .log_dir
                    .join(format!("app-{}.{}.log", date, self.config.max_log_files));
                if oldest.exists() {
                    let _ = std::fs::remove_file(&oldest);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        let mut guard = self
            .current_file
            .lock()
            .map_err(|_| "Failed to acquire log file lock".to_string())?;
        *guard = Some(BufWriter::new(file));
        Ok(())
    }

    fn write(&self, entry: &LogEntry) {
        if entry.level > self.config.level {
            return;
        }

        let line = if self.config.json_format {
            serde_json::to_string(entry).unwrap_or_else(|_| "{}".to_string())
        } else {
            format!(
                "{} [{}] [{}] {}{}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.level.as_str(),
                entry.target,
                entry.message,
                entry
                    .data
                    .as_ref()
                    .map(|d| format!(" | {}", d))
                    .unwrap_or_default(),
                entry
                    .error
                    .as_ref()
                    .map(|e| format!(" | error: {}", e))
                    .unwrap_or_default()
            )
        };

        if self.config.log_to_stdout {
            match entry.level {
                LogLevel::Error | LogLevel::Warn => eprintln!("{}", line),
                _ => println!("{}", line),
            }
        }

        if self.config.log_to_file {
            if let Ok(mut guard) = self.current_file.lock() {
                if let Some(writer) = guard.as_mut() {
                    let _ = writeln!(writer, "{}", line);
                    let _ = writer.flush();
                }
            }
        }
    }

    pub fn error(&self, target: &'static str, message: &str, error: Option<String>) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Error,
            target,
            message: message.to_string(),
            data: None,
            error,
        });
    }

    pub fn warn(&self, target: &'static str, message: &str) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Warn,
            target,
            message: message.to_string(),
            data: None,
            error: None,
        });
    }

    pub fn info(&self, target: &'static str, message: &str, data: Option<serde_json::Value>) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Info,
            target,
            message: message.to_string(),
            data: data.map(redact_sensitive),
            error: None,
        });
    }

    pub fn debug(&self, target: &'static str, message: &str, data: Option<serde_json::Value>) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Debug,
            target,
            message: message.to_string(),
            data: data.map(redact_sensitive),
            error: None,
        });
    }
}

/// Replace values of key/secret/password/token-ish fields before logging.
fn redact_sensitive(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) => {
            for (key, val) in map.iter_mut() {
                let lower = key.to_lowercase();
                if lower.contains("key")
                    || lower.contains("secret")
                    || lower.contains("password")
                    || lower.contains("token")
                {
                    *val = serde_json::Value::String("***REDACTED***".to_string());
                } else {
                    *val = redact_sensitive(val.clone());
                }
            }
            serde_json::Value::Object(map)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(redact_sensitive).collect())
        }
        _ => value,
    }
}

static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Build the logger from the frozen application config; `init_config`
/// must have run first.
pub fn init_global_logger(data_dir: &Path) -> Result<(), String> {
    let logging = &crate::config::get_config().logging;
    let config = LoggerConfig {
        level: LogLevel::parse(&logging.level),
        log_to_file: logging.log_to_file,
        log_to_stdout: logging.log_to_stdout,
        json_format: logging.json_format,
        max_file_size_mb: logging.max_file_size_mb,
        max_log_files: logging.max_log_files,
    };
    let logger = Logger::init(data_dir, config)?;
    GLOBAL_LOGGER
        .set(logger)
        .map_err(|_| "Logger already initialized".to_string())
}

pub fn get_logger() -> Option<&'static Logger> {
    GLOBAL_LOGGER.get()
}

#[macro_export]
macro_rules! log_error {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.error($target, $msg, None);
        }
    };
    ($target:expr, $msg:expr, $err:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.error($target, $msg, Some($err));
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.warn($target, $msg);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.info($target, $msg, None);
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.info($target, $msg, Some($data));
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.debug($target, $msg, None);
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.debug($target, $msg, Some($data));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_secret_fields() {
        let redacted = redact_sensitive(serde_json::json!({
            "api_key": "abc123",
            "nested": { "password": "hunter2" },
            "plain": "visible"
        }));
        assert_eq!(redacted["api_key"], "***REDACTED***");
        assert_eq!(redacted["nested"]["password"], "***REDACTED***");
        assert_eq!(redacted["plain"], "visible");
    }
}
