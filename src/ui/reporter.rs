//! Structured log events and the sinks that receive them

use crate::runner::Verbosity;
use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

/// Local time prefix printed on debug lines
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Severity of a log event, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Verbose,
    Debug,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Verbose => "VERBOSE",
            Level::Debug => "DEBUG",
        };
        f.write_str(s)
    }
}

/// A single engine log event
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Task name the event is attributed to
    pub phase: String,
    pub level: Level,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl LogEvent {
    pub fn new(phase: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        LogEvent {
            phase: phase.into(),
            level,
            message: message.into(),
            timestamp: Local::now(),
        }
    }
}

/// Receiver of engine log events
pub trait Reporter {
    fn emit(&self, event: LogEvent);

    fn error(&self, phase: &str, message: &str) {
        self.emit(LogEvent::new(phase, Level::Error, message));
    }

    fn warn(&self, phase: &str, message: &str) {
        self.emit(LogEvent::new(phase, Level::Warn, message));
    }

    fn info(&self, phase: &str, message: &str) {
        self.emit(LogEvent::new(phase, Level::Info, message));
    }

    fn verbose(&self, phase: &str, message: &str) {
        self.emit(LogEvent::new(phase, Level::Verbose, message));
    }

    fn debug(&self, phase: &str, message: &str) {
        self.emit(LogEvent::new(phase, Level::Debug, message));
    }
}

/// Writes `[phase] message` lines to stderr, filtered by verbosity
pub struct ConsoleReporter {
    verbosity: Verbosity,
    color: bool,
}

impl ConsoleReporter {
    pub fn new(verbosity: Verbosity) -> Self {
        let color = std::env::var_os("NO_COLOR").is_none()
            && colored::control::SHOULD_COLORIZE.should_colorize();
        ConsoleReporter { verbosity, color }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Render an event the way it is printed
    pub fn format_line(&self, event: &LogEvent) -> String {
        let mut line = String::new();
        if self.verbosity >= Verbosity::Debug {
            let stamp = format!(
                "{} {}",
                event.timestamp.format(TIMESTAMP_FORMAT),
                event.level
            );
            line.push_str(&format!("{} ", self.paint(stamp.dimmed())));
        }
        if !event.phase.is_empty() {
            let phase = format!("[{}]", event.phase);
            let phase = match event.level {
                Level::Error => phase.red().bold(),
                Level::Warn => phase.yellow().bold(),
                Level::Info => phase.cyan().bold(),
                Level::Verbose | Level::Debug => phase.dimmed(),
            };
            line.push_str(&format!("{} ", self.paint(phase)));
        }
        let message = match event.level {
            Level::Error => event.message.as_str().red(),
            Level::Warn => event.message.as_str().yellow(),
            Level::Info => event.message.as_str().normal(),
            Level::Verbose | Level::Debug => event.message.as_str().dimmed(),
        };
        line.push_str(&self.paint(message));
        line
    }

    fn paint(&self, text: ColoredString) -> String {
        if self.color {
            text.to_string()
        } else {
            text.clear().to_string()
        }
    }
}

impl Reporter for ConsoleReporter {
    fn emit(&self, event: LogEvent) {
        if !self.verbosity.allows(event.level) {
            return;
        }
        let line = self.format_line(&event);
        // A closed stderr is not worth failing a run over.
        let _ = writeln!(io::stderr().lock(), "{}", line);
    }
}

/// Records every event in memory
#[derive(Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<LogEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages recorded for one phase, in order
    pub fn messages_for(&self, phase: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.phase == phase)
            .map(|e| e.message)
            .collect()
    }

    /// Whether any event's message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.message.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, event: LogEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
