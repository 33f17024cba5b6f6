//! Telemetry: tracing initialization and sink-facing event formatting.
//!
//! [`init_tracing`] wires the global subscriber once, honoring `RUST_LOG`.
//! The formatter types render [`Event`]s and [`ErrorEvent`]s for terminal
//! sinks; color is auto-detected unless forced.

use std::io::IsTerminal;
use std::sync::Once;

use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::channels::errors::ErrorEvent;
use crate::event_bus::Event;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta
pub const RESET_COLOR: &str = "\x1b[0m";

static INIT: Once = Once::new();

/// Install the global tracing subscriber: `RUST_LOG`-driven filter, fmt
/// output on stderr, and an `ErrorLayer` for span traces. Idempotent.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("claritas=info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(ErrorLayer::default())
            .init();
    });
}

/// Formatter color mode for telemetry output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    /// Auto-detect TTY capability (checks `stderr.is_terminal()`).
    #[default]
    Auto,
    /// Always include ANSI color codes.
    Colored,
    /// Never include ANSI color codes.
    Plain,
}

impl FormatterMode {
    pub fn auto_detect() -> Self {
        if std::io::stderr().is_terminal() {
            FormatterMode::Colored
        } else {
            FormatterMode::Plain
        }
    }

    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Rendered output for a telemetry item that can be consumed by sinks.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &Event) -> EventRender;
    fn render_errors(&self, errors: &[ErrorEvent]) -> Vec<EventRender>;
}

/// Plain text formatter with optional ANSI color codes.
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    pub fn new() -> Self {
        Self {
            mode: FormatterMode::Auto,
        }
    }

    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.mode.is_colored() {
            format!("{color}{text}{RESET_COLOR}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> EventRender {
        let context = match event {
            Event::Token(t) => format!("token:{}", t.node),
            Event::StepUpdate(u) => format!("update:{}", u.step),
            Event::Diagnostic(d) => d.scope.clone(),
            Event::RunEnded(r) => format!("run:{}", r.run_id),
        };
        EventRender {
            context: Some(self.paint(CONTEXT_COLOR, &context)),
            lines: vec![format!(
                "{} {}\n",
                self.paint(CONTEXT_COLOR, &format!("[{context}]")),
                event
            )],
        }
    }

    fn render_errors(&self, errors: &[ErrorEvent]) -> Vec<EventRender> {
        errors
            .iter()
            .map(|e| {
                let scope = e.scope.sort_key();
                let mut lines = vec![format!(
                    "{} {}\n",
                    self.paint(LINE_COLOR, &format!("[{scope}]")),
                    e.error
                )];
                let mut cause = e.error.cause.as_deref();
                while let Some(c) = cause {
                    lines.push(format!("  caused by: {}\n", c.message));
                    cause = c.cause.as_deref();
                }
                EventRender {
                    context: Some(scope),
                    lines,
                }
            })
            .collect()
    }
}

/// Format error events with explicit color mode control.
pub fn pretty_print_errors(events: &[ErrorEvent], mode: FormatterMode) -> String {
    let formatter = PlainFormatter::with_mode(mode);
    let renders = formatter.render_errors(events);
    let mut out = String::new();
    for (idx, render) in renders.into_iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        for line in render.lines {
            out.push_str(&line);
        }
    }
    out
}
