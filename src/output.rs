//! User-facing output.
//!
//! Every component that talks to the user receives an [`OutputSink`]
//! instead of printing directly, so tests can capture what would have been
//! shown. Diagnostics for developers go through `tracing` instead.

use std::sync::Mutex;

/// Severity/tone of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn marker(&self) -> &'static str {
        match self {
            Tone::Info => "",
            Tone::Success => "✓ ",
            Tone::Warning => "! ",
            Tone::Error => "✗ ",
        }
    }
}

/// Destination for user-facing messages.
pub trait OutputSink: Send + Sync {
    fn emit(&self, tone: Tone, message: &str);

    fn info(&self, message: &str) {
        self.emit(Tone::Info, message);
    }

    fn success(&self, message: &str) {
        self.emit(Tone::Success, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Tone::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Tone::Error, message);
    }
}

/// Prints to the terminal: info and success on stdout, the rest on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn emit(&self, tone: Tone, message: &str) {
        match tone {
            Tone::Info | Tone::Success => println!("{}{}", tone.marker(), message),
            Tone::Warning | Tone::Error => eprintln!("{}{}", tone.marker(), message),
        }
    }
}

/// Records every message in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    messages: Mutex<Vec<(Tone, String)>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured messages in emission order.
    pub fn messages(&self) -> Vec<(Tone, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Captured messages of a single tone.
    pub fn with_tone(&self, tone: Tone) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(t, _)| *t == tone)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether any captured message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|(_, m)| m.contains(needle))
    }
}

impl OutputSink for CaptureSink {
    fn emit(&self, tone: Tone, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((tone, message.to_string()));
        }
    }
}
