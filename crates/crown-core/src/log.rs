//! User-facing status output.
//!
//! The audit reports progress on four channels that can be silenced
//! independently. A [`Logger`] is built once from configuration and handed
//! to the engine by reference; where the lines end up is decided by the
//! [`LogSink`] behind it.
//!
//! Internal diagnostics do not go through here; they use `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Output channel of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Verbose,
    Info,
    Warn,
    Error,
}

impl Channel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Which channels are switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channels {
    pub verbose: bool,
    pub info: bool,
    pub warn: bool,
    pub error: bool,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            verbose: false,
            info: true,
            warn: true,
            error: true,
        }
    }
}

impl Channels {
    /// Every channel off.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            verbose: false,
            info: false,
            warn: false,
            error: false,
        }
    }

    /// Every channel on.
    #[must_use]
    pub fn all() -> Self {
        Self {
            verbose: true,
            info: true,
            warn: true,
            error: true,
        }
    }

    #[must_use]
    pub fn enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Verbose => self.verbose,
            Channel::Info => self.info,
            Channel::Warn => self.warn,
            Channel::Error => self.error,
        }
    }
}

/// Destination for status lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, channel: Channel, line: &str);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _channel: Channel, _line: &str) {}
}

/// Sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<(Channel, String)>>,
}

impl CaptureSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines in emission order.
    #[must_use]
    pub fn lines(&self) -> Vec<(Channel, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Captured lines of one channel.
    #[must_use]
    pub fn lines_on(&self, channel: Channel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, line)| line)
            .collect()
    }
}

impl LogSink for CaptureSink {
    fn emit(&self, channel: Channel, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((channel, line.to_string()));
        }
    }
}

/// Four-channel status logger.
#[derive(Clone)]
pub struct Logger {
    channels: Channels,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::silent()
    }
}

impl Logger {
    #[must_use]
    pub fn new(channels: Channels, sink: Arc<dyn LogSink>) -> Self {
        Self { channels, sink }
    }

    /// A logger that prints nothing.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(Channels::silent(), Arc::new(NullSink))
    }

    #[must_use]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn log(&self, channel: Channel, msg: impl fmt::Display) {
        if self.channels.enabled(channel) {
            self.sink.emit(channel, &msg.to_string());
        }
    }

    pub fn verbose(&self, msg: impl fmt::Display) {
        self.log(Channel::Verbose, msg);
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.log(Channel::Info, msg);
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.log(Channel::Warn, msg);
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.log(Channel::Error, msg);
    }
}
