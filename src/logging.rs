//! Logging bridged to the host application
//!
//! Engine code logs through the `log` facade. [`BridgeLogger`] prints each
//! record to stderr and forwards the message to the host's logger entry
//! points, one per severity.

use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::Error;

/// Host-side log entry points
pub trait LogSink: Send + Sync {
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);
    /// Debug and trace records; the host may ignore them
    fn debug(&self, _message: &str) {}
}

/// `log` backend forwarding to a [`LogSink`]
pub struct BridgeLogger {
    sink: Arc<dyn LogSink>,
    level: LevelFilter,
    echo: bool,
}

impl BridgeLogger {
    pub fn new(sink: Arc<dyn LogSink>, level: LevelFilter) -> Self {
        Self {
            sink,
            level,
            echo: true,
        }
    }

    /// Disable the stderr copy
    pub fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }
}

/// `[LEVEL] <unix seconds>.<millis>: message`
pub fn format_line(level: Level, message: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let tag = match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    };
    format!(
        "[{}] {}.{:03}: {}",
        tag,
        now.as_secs(),
        now.subsec_millis(),
        message
    )
}

impl Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();

        if self.echo {
            let _ = writeln!(std::io::stderr(), "{}", format_line(record.level(), &message));
        }

        match record.level() {
            Level::Error => self.sink.error(&message),
            Level::Warn => self.sink.warning(&message),
            Level::Info => self.sink.info(&message),
            Level::Debug | Level::Trace => self.sink.debug(&message),
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the bridge logger as the global `log` backend
pub fn init_logging(sink: Arc<dyn LogSink>, level: LevelFilter) -> Result<(), Error> {
    log::set_boxed_logger(Box::new(BridgeLogger::new(sink, level)))
        .map_err(|e| Error::Logging(e.to_string()))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect {
        lines: Mutex<Vec<(String, String)>>,
    }

    impl LogSink for Collect {
        fn error(&self, message: &str) {
            self.lines.lock().unwrap().push(("error".into(), message.into()));
        }
        fn warning(&self, message: &str) {
            self.lines.lock().unwrap().push(("warning".into(), message.into()));
        }
        fn info(&self, message: &str) {
            self.lines.lock().unwrap().push(("info".into(), message.into()));
        }
    }

    #[test]
    fn test_records_routed_by_severity() {
        let sink = Arc::new(Collect::default());
        let logger = BridgeLogger::new(sink.clone(), LevelFilter::Info).without_echo();

        for (level, text) in [(Level::Error, "e"), (Level::Warn, "w"), (Level::Info, "i"), (Level::Debug, "d")] {
            logger.log(
                &Record::builder()
                    .level(level)
                    .args(format_args!("{}", text))
                    .build(),
            );
        }

        let lines = sink.lines.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec![
                ("error".to_string(), "e".to_string()),
                ("warning".to_string(), "w".to_string()),
                ("info".to_string(), "i".to_string()),
            ]
        );
    }

    #[test]
    fn test_format_line_prefix() {
        let line = format_line(Level::Warn, "careful");
        assert!(line.starts_with("[WARN] "));
        assert!(line.ends_with(": careful"));
    }
}
