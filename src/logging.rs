use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

// Stdout logger with colour, timestamps and per-topic debug filtering
#[derive(Debug)]
struct SumoLogger {
    level: LevelFilter,
    debug_filters: Option<HashSet<String>>,
}

impl SumoLogger {
    fn passes_filter(&self, metadata: &Metadata) -> bool {
        match &self.debug_filters {
            Some(filters)
                if metadata.level() == log::Level::Debug
                    || metadata.level() == log::Level::Trace =>
            {
                filters.contains(metadata.target())
                    || filters.iter().any(|f| metadata.target().starts_with(f.as_str()))
            }
            _ => true,
        }
    }
}

impl log::Log for SumoLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && self.passes_filter(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_color = match record.level() {
            log::Level::Error => "\x1B[31m", // Red
            log::Level::Warn => "\x1B[33m",  // Yellow
            log::Level::Info => "\x1B[32m",  // Green
            log::Level::Debug => "\x1B[36m", // Cyan
            log::Level::Trace => "\x1B[35m", // Magenta
        };
        let reset = "\x1B[0m";
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        let message = record.args().to_string();
        let context = robot_context(record.target(), &message)
            .map(|slot| format!("[R{:02}] ", slot))
            .unwrap_or_default();

        let output = format!(
            "{timestamp} {level_color}{level:5}{reset} {context}{target}: {message}",
            level = record.level(),
            target = record.target(),
        );

        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", output);
        let _ = stdout.flush();
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

/// Robot slot named by a `robot_N` target or a "Robot N" phrase in the message.
fn robot_context(target: &str, message: &str) -> Option<u32> {
    if let Some(id) = target.strip_prefix("robot_").and_then(|s| s.parse().ok()) {
        return Some(id);
    }
    let start = message.find("Robot ")? + "Robot ".len();
    let digits: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Map a `--log-level` argument to a filter, defaulting to Info.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

static LOGGER: OnceLock<SumoLogger> = OnceLock::new();

// Initialize the logger with optional comma-separated debug topics
pub fn init_logger(level: LevelFilter, debug_filter: Option<String>) -> Result<(), SetLoggerError> {
    let debug_filters = debug_filter.map(|filter_str| {
        filter_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<HashSet<String>>()
    });

    let logger = LOGGER.get_or_init(|| SumoLogger {
        level,
        debug_filters,
    });
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

// Helper macros for specific debug topics
#[macro_export]
macro_rules! debug_net {
    (robot: $slot:expr, $($arg:tt)*) => {
        log::debug!(target: "net", "[R{:02}] {}", $slot, format_args!($($arg)*))
    };
    ($($arg:tt)*) => {
        log::debug!(target: "net", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_sim {
    (robot: $slot:expr, $($arg:tt)*) => {
        log::debug!(target: "sim", "[R{:02}] {}", $slot, format_args!($($arg)*))
    };
    ($($arg:tt)*) => {
        log::debug!(target: "sim", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_sensor {
    (robot: $slot:expr, $($arg:tt)*) => {
        log::trace!(target: "sensor", "[R{:02}] {}", $slot, format_args!($($arg)*))
    };
    ($($arg:tt)*) => {
        log::trace!(target: "sensor", "{}", format_args!($($arg)*))
    };
}
