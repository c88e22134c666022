use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::ToonifyConfig;

static LOGGER: Lazy<ToonifyLogger> = Lazy::new(ToonifyLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::default())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let max_level = config.min_level.to_level_filter();
    LOGGER.configure(config)?;

    log::set_logger(&*LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    log::set_max_level(max_level);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "🎨",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }

    /// Accepts the usual `RUST_LOG`-style names, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub target: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            target: target.into(),
            file: None,
            line: None,
        }
    }

    pub fn with_location(mut self, file: Option<&str>, line: Option<u32>) -> Self {
        self.file = file.map(String::from);
        self.line = line;
        self
    }

    fn from_record(record: &Record) -> Self {
        LogEntry::new(
            record.level().into(),
            record.args().to_string(),
            record.target(),
        )
        .with_location(record.file(), record.line())
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_target: bool,
    pub show_file_location: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
    pub custom_prefix: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_target: true,
            show_file_location: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
            custom_prefix: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: impl Into<String>) -> Self {
        self.log_file_path = Some(path.into());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.custom_prefix = Some(prefix.into());
        self
    }

    /// Level from `TOONIFY_LOG`, keeping the current one if unset or unknown.
    pub fn with_env_level(self) -> Self {
        match std::env::var("TOONIFY_LOG").ok().as_deref().and_then(LogLevel::parse) {
            Some(level) => self.with_level(level),
            None => self,
        }
    }

    /// Preset chosen by `TOONIFY_LOG_FORMAT` (`json` selects production),
    /// with `TOONIFY_LOG_FILE` and `TOONIFY_LOG` applied on top.
    pub fn from_env() -> Self {
        Self::from_settings(
            std::env::var("TOONIFY_LOG_FORMAT").ok().as_deref(),
            std::env::var("TOONIFY_LOG_FILE").ok(),
        )
        .with_env_level()
    }

    pub fn from_settings(format: Option<&str>, file: Option<String>) -> Self {
        let config = match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => Self::production(),
            _ => Self::development(),
        };
        match file.filter(|path| !path.trim().is_empty()) {
            Some(path) => config.with_file_output(path),
            None => config,
        }
    }

    pub fn production() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: false,
            show_emojis: false,
            output_json: true,
            log_file_path: Some("toonify.log".to_string()),
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_file_location: true,
            ..Default::default()
        }
    }
}

pub struct ToonifyLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

impl Default for ToonifyLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ToonifyLogger {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    fn config(&self) -> MutexGuard<'_, LoggerConfig> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn log_file(&self) -> MutexGuard<'_, Option<File>> {
        self.log_file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn configure(&self, config: LoggerConfig) -> Result<(), String> {
        let file = match &config.log_file_path {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| format!("Failed to open log file {}: {}", path, e))?,
            ),
            None => None,
        };

        *self.log_file() = file;
        *self.config() = config;
        Ok(())
    }

    pub fn format_line(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        if config.output_json {
            return serde_json::to_string(entry).unwrap_or_default();
        }

        let paint = |text: String, style: fn(ColoredString) -> ColoredString| {
            if config.show_colors {
                style(text.normal()).to_string()
            } else {
                text
            }
        };

        let mut parts = Vec::new();
        if let Some(prefix) = &config.custom_prefix {
            parts.push(format!("[{}]", paint(prefix.clone(), |s| s.bright_white().bold())));
        }
        parts.push(paint(
            entry.timestamp.format(&config.timestamp_format).to_string(),
            |s| s.bright_black(),
        ));

        let level = if config.show_emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };
        let level = if config.show_colors {
            level.color(entry.level.color()).bold().to_string()
        } else {
            level
        };
        parts.push(format!("[{}]", level));

        let mut message = String::new();
        if config.show_target && !entry.target.is_empty() {
            message.push_str(&paint(format!("{}: ", entry.target), |s| s.bright_blue()));
        }
        message.push_str(&entry.message);
        parts.push(message);

        if config.show_file_location {
            if let (Some(file), Some(line)) = (&entry.file, entry.line) {
                parts.push(paint(format!("({}:{})", file, line), |s| s.bright_black()));
            }
        }

        parts.join(" ")
    }

    fn write_to_file(&self, line: &str) {
        if let Some(file) = self.log_file().as_mut() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl log::Log for ToonifyLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.config().min_level.to_level_filter()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::from_record(record);
        let config = self.config().clone();
        let line = self.format_line(&entry, &config);

        if entry.level >= LogLevel::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }

        if config.log_file_path.is_some() {
            let file_config = LoggerConfig {
                show_colors: false,
                ..config
            };
            self.write_to_file(&self.format_line(&entry, &file_config));
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Some(file) = self.log_file().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Logs how long an operation took when stopped or dropped.
pub struct Timer {
    start: Instant,
    name: String,
    stopped: bool,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stop(mut self) -> Duration {
        self.stopped = true;
        self.report()
    }

    fn report(&self) -> Duration {
        let elapsed = self.elapsed();
        log::info!("⏱️  {} took {}ms", self.name, elapsed.as_millis());
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            self.report();
        }
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_client_config(config: &ToonifyConfig) {
    log::info!("⚙️  Toonify client configuration:");
    log::info!("   API: {}", config.base_url());
    log::info!(
        "   Polling: every {}ms, up to {} attempts",
        config.poll.interval.as_millis(),
        config.poll.max_attempts
    );
    log::info!("   Request timeout: {}s", config.request_timeout.as_secs());
}
