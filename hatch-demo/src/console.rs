//! Console log sink

use hatch_boot::logging::LogSink;

/// Writes log lines to standard error.
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write_str(&self, line: &str) {
        eprintln!("{line}");
    }
}

/// Process-wide sink instance
pub static CONSOLE: StderrSink = StderrSink;
