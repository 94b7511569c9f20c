//! Named loggers for processes and tracing setup for the binary.
//!
//! Every process logs through a [`Logger`] obtained from [`logger`]. Loggers
//! live in a process-wide registry keyed by name, so asking for the same name
//! twice returns the same instance and output is never duplicated.

use std::{
    collections::HashMap,
    fmt::{self, Display},
    io::Write,
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicU8, Ordering},
    },
};

use chrono::{DateTime, Local};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
}

impl Level {
    fn from_u8(value: u8) -> Self {
        match value {
            v if v <= Level::Debug as u8 => Level::Debug,
            v if v <= Level::Info as u8 => Level::Info,
            v if v <= Level::Warning as u8 => Level::Warning,
            _ => Level::Error,
        }
    }

    fn colored(self) -> colored::ColoredString {
        let label = self.to_string();
        match self {
            Level::Debug => label.dimmed(),
            Level::Info => label.blue().bold(),
            Level::Warning => label.yellow().bold(),
            Level::Error => label.red().bold(),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Renders one log line: `timestamp - name - LEVEL - message`.
pub fn format_record(
    timestamp: DateTime<Local>,
    name: &str,
    level: impl Display,
    message: impl Display,
) -> String {
    format!(
        "{} - {} - {} - {}",
        timestamp.format(TIMESTAMP_FORMAT),
        name,
        level,
        message
    )
}

/// A logger bound to one name. Writes to stderr.
#[derive(Debug)]
pub struct Logger {
    name: String,
    level: AtomicU8,
}

impl Logger {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            level: AtomicU8::new(Level::Info as u8),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    pub fn log(&self, level: Level, message: impl Display) {
        if !self.enabled(level) {
            return;
        }
        let line = format_record(Local::now(), &self.name, level.colored(), message);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    pub fn debug(&self, message: impl Display) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Display) {
        self.log(Level::Info, message);
    }

    pub fn warning(&self, message: impl Display) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: impl Display) {
        self.log(Level::Error, message);
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<Logger>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Logger>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the logger registered under `name`, creating it on first use.
pub fn logger(name: &str) -> Arc<Logger> {
    let mut loggers = registry()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(
        loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Logger::new(name))),
    )
}

/// Installs the global tracing subscriber used for library diagnostics.
///
/// Honors `RUST_LOG` and defaults to `warn`. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
