//! Human-readable, colorized single-line output.

use std::io::Write;
use std::sync::Mutex;

use console::Style;
use log_schema::{Level, LogEntry};

use crate::error::SinkWriteError;

/// Writes one colorized line per entry to a terminal-like stream.
///
/// Line shape:
///
/// ```text
/// 2026-10-16T09:30:00.123Z ERROR [usage] AUTH_001 (checkout) payment failed {"userId":"42"}
/// ```
///
/// A missing code or context is printed as `-`. Fields are appended as
/// compact JSON when present.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    colorize: bool,
}

impl ConsoleSink {
    /// Console sink on process stdout, colored when `colorize` is set.
    pub fn stdout(colorize: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), colorize)
    }

    pub fn new(out: Box<dyn Write + Send>, colorize: bool) -> Self {
        Self {
            out: Mutex::new(out),
            colorize,
        }
    }

    pub fn write(&self, entry: &LogEntry) -> Result<(), SinkWriteError> {
        let line = self.format(entry);
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        out.write_all(line.as_bytes()).map_err(SinkWriteError::Write)?;
        out.flush().map_err(SinkWriteError::Write)
    }

    fn format(&self, entry: &LogEntry) -> String {
        let timestamp = entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let level = level_style(entry.level)
            .force_styling(self.colorize)
            .apply_to(format!("{:<5}", entry.level.as_str().to_uppercase()));
        let dim = Style::new().dim().force_styling(self.colorize);

        let mut line = format!(
            "{} {} [{}] {} ({}) {}",
            dim.apply_to(timestamp),
            level,
            entry.category,
            entry.code.as_deref().unwrap_or("-"),
            entry.context.as_deref().unwrap_or("-"),
            entry.message,
        );
        if !entry.fields.is_empty() {
            line.push(' ');
            line.push_str(&serde_json::Value::Object(entry.fields.clone()).to_string());
        }
        line.push('\n');
        line
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Trace => Style::new().dim(),
        Level::Debug => Style::new().blue(),
        Level::Info => Style::new().green(),
        Level::Warn => Style::new().yellow(),
        Level::Error => Style::new().red(),
        Level::Fatal => Style::new().red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use log_schema::Category;
    use serde_json::json;

    use super::*;

    /// `Write` impl that appends into a shared buffer the test can inspect.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn plain_line_has_all_parts() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::new(Box::new(buf.clone()), false);

        let mut entry = LogEntry::new(Level::Error, Category::Usage, "payment failed");
        entry.code = Some("PAY_002".to_string());
        entry.context = Some("checkout".to_string());
        entry.fields.insert("userId".to_string(), json!("42"));
        sink.write(&entry).unwrap();

        let out = buf.contents();
        let expected_ts = entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        assert_eq!(
            out,
            format!("{expected_ts} ERROR [usage] PAY_002 (checkout) payment failed {{\"userId\":\"42\"}}\n")
        );
    }

    #[test]
    fn missing_code_and_context_print_dashes() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::new(Box::new(buf.clone()), false);
        sink.write(&LogEntry::new(Level::Info, Category::System, "started"))
            .unwrap();

        let out = buf.contents();
        assert!(out.ends_with(" INFO  [system] - (-) started\n"), "got: {out}");
    }

    #[test]
    fn colorized_line_contains_ansi_escapes() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::new(Box::new(buf.clone()), true);
        sink.write(&LogEntry::new(Level::Warn, Category::Validation, "slow"))
            .unwrap();

        assert!(buf.contents().contains("\u{1b}["));
    }
}
