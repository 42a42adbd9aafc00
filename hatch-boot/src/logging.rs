//! Bootstrap logging
//!
//! Provides the diagnostics sink using the `log` crate.
//!
//! # Log Output
//!
//! Records are formatted as `[LEVEL] target: message` into a fixed stack
//! buffer (no allocation, no locks) and written to the [`LogSink`] installed
//! with [`init`]. Messages longer than the buffer are truncated.
//!
//! Until a sink is installed, log macros go nowhere.

use core::fmt::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Once;

/// Size of the formatting buffer for one record
pub const MESSAGE_BUFFER_SIZE: usize = 256;

/// Destination for formatted log lines.
pub trait LogSink: Sync {
    /// Write one formatted line (without trailing newline).
    fn write_str(&self, line: &str);
}

/// Stack buffer for formatting log messages
struct MessageBuffer {
    data: [u8; MESSAGE_BUFFER_SIZE],
    len: usize,
}

impl MessageBuffer {
    const fn new() -> Self {
        Self {
            data: [0u8; MESSAGE_BUFFER_SIZE],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        match core::str::from_utf8(&self.data[..self.len]) {
            Ok(s) => s,
            // Truncation may split a multi-byte character
            Err(e) => core::str::from_utf8(&self.data[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl Write for MessageBuffer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = MESSAGE_BUFFER_SIZE - self.len;
        let to_copy = bytes.len().min(remaining);
        self.data[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => " WARN",
        Level::Info => " INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Format one record the way the logger writes it.
fn format_record(buf: &mut MessageBuffer, record: &Record) {
    let _ = write!(
        buf,
        "[{}] {}: {}",
        level_str(record.level()),
        record.target(),
        record.args()
    );
}

/// Bootstrap logger implementation
struct BootLogger {
    sink: Once<&'static dyn LogSink>,
}

impl Log for BootLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.sink.is_completed() && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        let Some(sink) = self.sink.get() else {
            return;
        };
        if record.level() > log::max_level() {
            return;
        }
        let mut buf = MessageBuffer::new();
        format_record(&mut buf, record);
        sink.write_str(buf.as_str());
    }

    fn flush(&self) {}
}

/// Global logger instance
static LOGGER: BootLogger = BootLogger { sink: Once::new() };

/// Install `sink` as the log destination and set the maximum level.
///
/// Only the first call installs a sink; later calls only adjust the level.
pub fn init(sink: &'static dyn LogSink, level: LevelFilter) {
    LOGGER.sink.call_once(|| sink);
    log::set_logger(&LOGGER).ok();
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::string::String;
    use core::fmt::Write as _;

    use super::*;

    #[test]
    fn test_message_buffer_truncates() {
        let mut buf = MessageBuffer::new();
        for _ in 0..MESSAGE_BUFFER_SIZE {
            let _ = buf.write_str("ab");
        }
        assert_eq!(buf.as_str().len(), MESSAGE_BUFFER_SIZE);
    }

    #[test]
    fn test_message_buffer_split_char() {
        let mut buf = MessageBuffer::new();
        let mut filler = String::new();
        for _ in 0..MESSAGE_BUFFER_SIZE - 1 {
            filler.push('x');
        }
        let _ = buf.write_str(&filler);
        let _ = buf.write_str("\u{e9}");
        assert_eq!(buf.as_str(), filler.as_str());
    }

    #[test]
    fn test_record_format() {
        let mut buf = MessageBuffer::new();
        format_record(
            &mut buf,
            &Record::builder()
                .level(Level::Info)
                .target("hatch_boot::spawn")
                .args(format_args!("spawned {}", "thread_2"))
                .build(),
        );
        assert_eq!(buf.as_str(), "[ INFO] hatch_boot::spawn: spawned thread_2");
    }
}
